//! Form-state synchronization engine.
//!
//! [`SyncEngine`] owns the cached [`Form`](formsync_model::Form) and
//! [`Preview`](formsync_model::Preview) of the active document and is their
//! only mutator:
//! - Notifications trigger a refetch that replaces a slot wholesale
//! - The display submits `(field key, value)` edits, applied locally
//! - Commits push the entire cached form, never a diff
//!
//! # Error Handling
//!
//! Gateway failures are logged and swallowed. A failed refresh keeps the
//! stale cache; a failed push leaves the edits uncommitted. Operations
//! report what happened through outcome enums instead of errors.

#![warn(missing_docs)]

mod engine;
mod slot;

use thiserror::Error;

pub use engine::SyncEngine;

/// Coarse engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
	/// Neither a form nor a preview is loaded.
	Empty,
	/// A form, a preview, or both are loaded.
	Loaded,
}

/// Result of a refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// The slot now holds the fetched value.
	Applied,
	/// The backend has no active document; the slot was emptied.
	Cleared,
	/// A newer fetch already landed; this response was discarded.
	Stale,
	/// The fetch failed; the previous value was kept.
	Failed,
}

/// Result of a request sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
	/// The backend accepted the request.
	Sent,
	/// Nothing to send.
	Skipped,
	/// The request failed and was logged.
	Failed,
}

/// Errors from submitting a field edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
	/// No form is loaded.
	#[error("no form loaded")]
	NoForm,
	/// No field in the cached form has this key.
	#[error("unknown field: {0}")]
	UnknownField(String),
}
