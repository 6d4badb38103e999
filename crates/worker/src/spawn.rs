use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::TaskClass;

static FALLBACK: OnceLock<Runtime> = OnceLock::new();

/// Handle of the ambient runtime, or of a small process-wide fallback when
/// called from plain threads.
pub(crate) fn runtime_handle() -> Handle {
	Handle::try_current().unwrap_or_else(|_| {
		FALLBACK
			.get_or_init(|| {
				Builder::new_multi_thread()
					.enable_all()
					.worker_threads(2)
					.thread_name("formsync-fallback")
					.build()
					.expect("failed to build fallback tokio runtime")
			})
			.handle()
			.clone()
	})
}

/// Spawns an async task with worker classification metadata.
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn");
	runtime_handle().spawn(fut)
}

/// Spawns blocking work with worker classification metadata.
pub fn spawn_blocking<F, R>(class: TaskClass, f: F) -> JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn_blocking");
	runtime_handle().spawn_blocking(f)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn spawn_runs_on_current_runtime() {
		let out = spawn(TaskClass::Interactive, async { 40 + 2 }).await.unwrap();
		assert_eq!(out, 42);
	}

	#[tokio::test]
	async fn spawn_blocking_returns_value() {
		let out = spawn_blocking(TaskClass::IoBlocking, || "done").await.unwrap();
		assert_eq!(out, "done");
	}

	#[test]
	fn spawn_outside_runtime_uses_fallback() {
		let handle = spawn(TaskClass::Background, async { 7 });
		let (tx, rx) = std::sync::mpsc::channel();
		runtime_handle().spawn(async move {
			let _ = tx.send(handle.await.ok());
		});
		assert_eq!(rx.recv().unwrap(), Some(7));
	}
}
