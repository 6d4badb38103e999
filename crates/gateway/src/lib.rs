//! The narrow interface between the synchronization engine and the backend
//! document engine.
//!
//! Every operation is a single async round trip with no caching. State
//! changes caused by an operation are announced through notifications, not
//! through return values.

#![warn(missing_docs)]

use std::path::PathBuf;

use async_trait::async_trait;
use formsync_model::{Form, Preview, PreviewError};
use thiserror::Error;

/// Errors from a gateway round trip.
#[derive(Debug, Error)]
pub enum GatewayError {
	/// No document has been selected yet.
	#[error("no file selected")]
	NoFileSelected,
	/// The document contains no form.
	#[error("{} doesn't contain a form", path.display())]
	FormNotFound {
		/// Document that was inspected.
		path: PathBuf,
	},
	/// Reading or writing a document failed.
	#[error("I/O error on {}: {error}", path.display())]
	Io {
		/// Path being accessed.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},
	/// A record could not be encoded or decoded.
	#[error("malformed record: {0}")]
	Serde(#[from] serde_json::Error),
	/// A preview payload could not be decoded.
	#[error(transparent)]
	Preview(#[from] PreviewError),
	/// A backend task failed before producing a result.
	#[error("backend task failed: {0}")]
	Task(String),
	/// The transport to the backend failed.
	#[error("transport error: {0}")]
	Transport(String),
}

impl GatewayError {
	/// Wraps an I/O error with the path it occurred on.
	pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
		Self::Io { path: path.into(), error }
	}
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Backend operations consumed by the synchronization engine.
///
/// `fetch_*` return `Ok(None)` when the backend has no active document.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
	/// Asks the host to pick a document. The switch, if any, is announced
	/// through notifications; cancellation is not an error.
	async fn request_open_file(&self) -> Result<()>;

	/// Current form of the active document.
	async fn fetch_form(&self) -> Result<Option<Form>>;

	/// Current preview of the active document.
	async fn fetch_preview(&self) -> Result<Option<Preview>>;

	/// Writes every field value of `form` into the active document.
	async fn push_form(&self, form: &Form) -> Result<()>;

	/// Fills every field of the active document with its own name.
	async fn push_form_with_auto_field_names(&self) -> Result<()>;
}
