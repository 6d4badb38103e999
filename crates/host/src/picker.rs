//! File selection seam.

use std::collections::VecDeque;
use std::path::PathBuf;

use async_trait::async_trait;
use formsync_config::DialogConfig;
use parking_lot::Mutex;

/// Host-provided file dialog.
#[async_trait]
pub trait FilePicker: Send + Sync {
	/// Lets the user pick one document. `None` means the dialog was dismissed.
	async fn pick_file(&self, filter: &DialogConfig) -> Option<PathBuf>;
}

/// Picker that hands out preselected paths in order.
///
/// Once the queue is empty every pick is a cancellation.
#[derive(Debug, Default)]
pub struct QueuedPicker {
	queue: Mutex<VecDeque<PathBuf>>,
}

impl QueuedPicker {
	/// Creates a picker that yields `paths` in order.
	pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
		Self {
			queue: Mutex::new(paths.into_iter().collect()),
		}
	}

	/// Queues another selection.
	pub fn push(&self, path: impl Into<PathBuf>) {
		self.queue.lock().push_back(path.into());
	}
}

#[async_trait]
impl FilePicker for QueuedPicker {
	async fn pick_file(&self, filter: &DialogConfig) -> Option<PathBuf> {
		let picked = self.queue.lock().pop_front();
		tracing::debug!(filter = %filter.pattern, picked = ?picked, "picker.pick_file");
		picked
	}
}
