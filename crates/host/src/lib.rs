//! In-process document backend.
//!
//! [`DocumentHost`] is the authoritative side of the synchronization: it
//! tracks the selected document and its latest filled copy, performs every
//! read and write through a [`DocumentEngine`], and announces changes on a
//! [`Notifier`](formsync_notify::Notifier). It implements
//! [`RemoteGateway`](formsync_gateway::RemoteGateway), so the engine can
//! drive it directly.

#![warn(missing_docs)]

mod document;
mod host;
mod picker;

pub use document::{DocumentEngine, JsonDocumentEngine};
pub use host::DocumentHost;
pub use picker::{FilePicker, QueuedPicker};
