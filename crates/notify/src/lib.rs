//! Backend-to-client change notifications.
//!
//! A notification is a bare signal on a [`Topic`]; it carries no payload and
//! is only a cue to refetch. The backend emits through a cloneable
//! [`Notifier`], the client registers at most one handler per topic on the
//! [`NotificationHub`] and then starts dispatch, after which no further
//! registrations are possible.

#![warn(missing_docs)]

mod hub;
mod topic;

use thiserror::Error;

pub use hub::{NotificationHub, Notifier, channel};
pub use topic::Topic;

/// Errors from subscribing to or emitting notifications.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
	/// A handler is already registered for the topic.
	#[error("topic {0} already has a handler")]
	AlreadySubscribed(Topic),
	/// The dispatcher has stopped.
	#[error("notification channel closed while emitting {0}")]
	Closed(Topic),
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
