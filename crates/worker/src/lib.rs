//! Shared task spawning primitives.
//!
//! Every task spawned by formsync goes through this crate so it carries a
//! [`TaskClass`] for tracing, and lands on the ambient tokio runtime (or a
//! small fallback runtime when called outside one).

#![warn(missing_docs)]

mod class;
mod future;
mod join_set;
mod spawn;

pub use class::TaskClass;
pub use future::BoxFutureStatic;
pub use join_set::WorkerJoinSet;
pub use spawn::{spawn, spawn_blocking};

/// Extracts the panic message from a failed task, if it panicked.
///
/// Returns `None` for cancelled tasks.
pub fn join_error_panic_message(err: tokio::task::JoinError) -> Option<String> {
	let payload = err.try_into_panic().ok()?;
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		return Some((*msg).to_string());
	}
	if let Some(msg) = payload.downcast_ref::<String>() {
		return Some(msg.clone());
	}
	Some("non-string panic payload".to_string())
}
