use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use formsync_config::{Config, DialogConfig};
use formsync_gateway::{GatewayError, RemoteGateway, Result};
use formsync_model::{Form, Preview};
use formsync_notify::{Notifier, Topic};
use formsync_worker::TaskClass;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{DocumentEngine, FilePicker};

#[derive(Debug, Default)]
struct HostState {
	selected: Option<PathBuf>,
	generated: Option<PathBuf>,
	/// Last generation ticket handed out.
	issued: u64,
	/// Ticket of the installed copy; copies with older tickets are dropped.
	installed: u64,
}

impl HostState {
	fn preview_path(&self) -> Option<PathBuf> {
		self.generated.clone().or_else(|| self.selected.clone())
	}
}

/// The in-process backend.
///
/// Owns the selected document and the latest generated copy. Filled copies
/// are written to the scratch directory (the system temp dir by default)
/// and removed when superseded or when the host is dropped.
pub struct DocumentHost {
	app_name: String,
	dialog: DialogConfig,
	picker: Arc<dyn FilePicker>,
	documents: Arc<dyn DocumentEngine>,
	notifier: Notifier,
	scratch_dir: PathBuf,
	state: Mutex<HostState>,
}

impl std::fmt::Debug for DocumentHost {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DocumentHost")
			.field("app_name", &self.app_name)
			.field("scratch_dir", &self.scratch_dir)
			.field("state", &*self.state.lock())
			.finish()
	}
}

impl DocumentHost {
	/// Creates a host with nothing selected.
	pub fn new(config: &Config, picker: Arc<dyn FilePicker>, documents: Arc<dyn DocumentEngine>, notifier: Notifier) -> Self {
		Self {
			app_name: config.app_name.clone(),
			dialog: config.dialog.clone(),
			picker,
			documents,
			notifier,
			scratch_dir: std::env::temp_dir(),
			state: Mutex::new(HostState::default()),
		}
	}

	/// Writes generated copies under `dir` instead of the system temp dir.
	pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.scratch_dir = dir.into();
		self
	}

	/// The document picked by the user, if any.
	pub fn selected(&self) -> Option<PathBuf> {
		self.state.lock().selected.clone()
	}

	/// The latest filled copy, if any.
	pub fn generated(&self) -> Option<PathBuf> {
		self.state.lock().generated.clone()
	}

	/// Path previews and forms are read from: the generated copy when
	/// present, otherwise the selected document.
	pub fn preview_path(&self) -> Option<PathBuf> {
		self.state.lock().preview_path()
	}

	fn emit(&self, topics: &[Topic]) {
		for &topic in topics {
			if let Err(error) = self.notifier.emit(topic) {
				warn!(%error, "host.emit_failed");
			}
		}
	}

	/// Fills `source` into a fresh scratch file and makes it the generated
	/// copy. Returns false if a newer generation or a new selection landed
	/// while filling; the new copy is discarded in that case.
	async fn generate<F>(&self, source: PathBuf, fill: F) -> Result<bool>
	where
		F: FnOnce(&dyn DocumentEngine, &Path, &mut dyn Write) -> Result<()> + Send + 'static,
	{
		let ticket = {
			let mut state = self.state.lock();
			state.issued += 1;
			state.issued
		};
		let documents = Arc::clone(&self.documents);
		let scratch = self.scratch_dir.clone();
		let prefix = format!("{}-", self.app_name);
		let src = source.clone();
		let path = blocking(move || {
			let suffix = src.extension().map(|ext| format!(".{}", ext.to_string_lossy())).unwrap_or_default();
			let mut file = tempfile::Builder::new()
				.prefix(&prefix)
				.suffix(&suffix)
				.tempfile_in(&scratch)
				.map_err(|e| GatewayError::io(&scratch, e))?;
			fill(documents.as_ref(), &src, file.as_file_mut())?;
			let (_, path) = file.keep().map_err(|e| GatewayError::io(&scratch, e.error))?;
			Ok(path)
		})
		.await?;

		let (installed, superseded) = {
			let mut state = self.state.lock();
			if ticket > state.installed {
				state.installed = ticket;
				(true, state.generated.replace(path.clone()))
			} else {
				(false, Some(path.clone()))
			}
		};
		if let Some(stale) = superseded {
			remove_scratch(&stale);
		}

		if installed {
			debug!(ticket, source = %source.display(), generated = %path.display(), "host.generated");
		} else {
			debug!(ticket, source = %source.display(), "host.generated_stale");
		}
		Ok(installed)
	}

	fn require_selected(&self) -> Result<PathBuf> {
		self.selected().ok_or(GatewayError::NoFileSelected)
	}
}

impl Drop for DocumentHost {
	fn drop(&mut self) {
		if let Some(generated) = self.state.get_mut().generated.take() {
			remove_scratch(&generated);
		}
	}
}

#[async_trait]
impl RemoteGateway for DocumentHost {
	async fn request_open_file(&self) -> Result<()> {
		let Some(path) = self.picker.pick_file(&self.dialog).await else {
			debug!("host.open_cancelled");
			return Ok(());
		};

		let previous = {
			let mut state = self.state.lock();
			state.selected = Some(path.clone());
			// Copies still being filled belong to the old selection.
			state.installed = state.issued;
			state.generated.take()
		};
		if let Some(previous) = previous {
			remove_scratch(&previous);
		}

		info!(path = %path.display(), "host.file_selected");
		self.emit(&[Topic::ActiveFileChanged, Topic::PreviewChanged, Topic::FormChanged]);
		Ok(())
	}

	async fn fetch_form(&self) -> Result<Option<Form>> {
		let Some(path) = self.preview_path() else {
			return Ok(None);
		};
		let documents = Arc::clone(&self.documents);
		let mut form = blocking(move || documents.read_form(&path)).await?;
		form.sort_by_name();
		Ok(Some(form))
	}

	async fn fetch_preview(&self) -> Result<Option<Preview>> {
		let Some(path) = self.preview_path() else {
			return Ok(None);
		};
		let bytes = blocking(move || std::fs::read(&path).map_err(|e| GatewayError::io(&path, e))).await?;
		Ok(Some(Preview::from_bytes(&bytes)))
	}

	async fn push_form(&self, form: &Form) -> Result<()> {
		let source = self.require_selected()?;
		debug!(fields = form.len(), source = %source.display(), "host.push_form");
		let form = form.clone();
		if self
			.generate(source, move |documents, src, out| documents.fill_form(src, &form, out))
			.await?
		{
			self.emit(&[Topic::PreviewChanged]);
		}
		Ok(())
	}

	async fn push_form_with_auto_field_names(&self) -> Result<()> {
		let source = self.require_selected()?;
		debug!(source = %source.display(), "host.auto_fill");
		if self
			.generate(source, |documents, src, out| documents.fill_with_names(src, out))
			.await?
		{
			self.emit(&[Topic::PreviewChanged, Topic::FormChanged]);
		}
		Ok(())
	}
}

async fn blocking<R, F>(f: F) -> Result<R>
where
	F: FnOnce() -> Result<R> + Send + 'static,
	R: Send + 'static,
{
	formsync_worker::spawn_blocking(TaskClass::IoBlocking, f)
		.await
		.map_err(|e| GatewayError::Task(e.to_string()))?
}

fn remove_scratch(path: &Path) {
	if let Err(error) = std::fs::remove_file(path) {
		warn!(path = %path.display(), %error, "host.remove_generated_failed");
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use formsync_model::Field;
	use pretty_assertions::assert_eq;
	use tokio::sync::mpsc;

	use super::*;
	use crate::{JsonDocumentEngine, QueuedPicker};

	const DOC: &str = r#"{"textFields":[{"id":"2","name":"last"},{"id":"1","name":"first"}]}"#;

	struct Fixture {
		host: DocumentHost,
		picker: Arc<QueuedPicker>,
		topics: mpsc::UnboundedReceiver<Topic>,
		dir: tempfile::TempDir,
	}

	/// Json engine that stalls while filling a form whose `first` field holds
	/// `slow_value`.
	struct SlowFill {
		slow_value: &'static str,
		delay: Duration,
	}

	impl DocumentEngine for SlowFill {
		fn read_form(&self, source: &Path) -> Result<Form> {
			JsonDocumentEngine.read_form(source)
		}

		fn fill_form(&self, source: &Path, form: &Form, out: &mut dyn Write) -> Result<()> {
			if form.find_by_name("first").is_some_and(|f| f.value == self.slow_value) {
				std::thread::sleep(self.delay);
			}
			JsonDocumentEngine.fill_form(source, form, out)
		}
	}

	impl Fixture {
		fn new() -> Self {
			Self::with_documents(Arc::new(JsonDocumentEngine))
		}

		fn with_documents(documents: Arc<dyn DocumentEngine>) -> Self {
			let dir = tempfile::tempdir().unwrap();
			let (notifier, mut hub) = formsync_notify::channel();
			let (tx, topics) = mpsc::unbounded_channel();
			for topic in Topic::ALL {
				let tx = tx.clone();
				hub.subscribe(topic, move || {
					let _ = tx.send(topic);
					async {}
				})
				.unwrap();
			}
			hub.spawn();

			let picker = Arc::new(QueuedPicker::default());
			let host = DocumentHost::new(&Config::default(), picker.clone(), documents, notifier)
				.with_scratch_dir(dir.path().join("scratch"));
			std::fs::create_dir_all(dir.path().join("scratch")).unwrap();
			Self { host, picker, topics, dir }
		}

		fn document(&self, name: &str) -> PathBuf {
			let path = self.dir.path().join(name);
			std::fs::write(&path, DOC).unwrap();
			path
		}

		async fn drain_topics(&mut self, expected: usize) -> Vec<Topic> {
			let mut seen = Vec::new();
			while seen.len() < expected {
				let topic = tokio::time::timeout(Duration::from_secs(5), self.topics.recv())
					.await
					.unwrap()
					.unwrap();
				seen.push(topic);
			}
			seen.sort_by_key(|t| t.as_str());
			seen
		}

		fn scratch_files(&self) -> usize {
			std::fs::read_dir(self.dir.path().join("scratch")).unwrap().count()
		}
	}

	#[tokio::test]
	async fn nothing_selected() {
		let fx = Fixture::new();
		assert_eq!(fx.host.fetch_form().await.unwrap(), None);
		assert_eq!(fx.host.fetch_preview().await.unwrap(), None);
		assert!(matches!(
			fx.host.push_form(&Form::default()).await,
			Err(GatewayError::NoFileSelected)
		));
		assert!(matches!(
			fx.host.push_form_with_auto_field_names().await,
			Err(GatewayError::NoFileSelected)
		));
	}

	#[tokio::test]
	async fn open_selects_and_announces() {
		let mut fx = Fixture::new();
		let doc = fx.document("a.json");
		fx.picker.push(&doc);

		fx.host.request_open_file().await.unwrap();
		assert_eq!(fx.host.selected(), Some(doc.clone()));
		assert_eq!(fx.host.preview_path(), Some(doc));

		let mut expected = vec![Topic::ActiveFileChanged, Topic::FormChanged, Topic::PreviewChanged];
		expected.sort_by_key(|t| t.as_str());
		assert_eq!(fx.drain_topics(3).await, expected);

		let form = fx.host.fetch_form().await.unwrap().unwrap();
		let names: Vec<_> = form.iter().map(|f| f.name.as_str()).collect();
		assert_eq!(names, vec!["first", "last"]);
	}

	#[tokio::test]
	async fn cancelled_open_changes_nothing() {
		let mut fx = Fixture::new();
		fx.host.request_open_file().await.unwrap();
		assert_eq!(fx.host.selected(), None);
		assert!(
			tokio::time::timeout(Duration::from_millis(50), fx.topics.recv())
				.await
				.is_err()
		);
	}

	#[tokio::test]
	async fn push_replaces_generated_copy() {
		let mut fx = Fixture::new();
		let doc = fx.document("a.json");
		fx.picker.push(&doc);
		fx.host.request_open_file().await.unwrap();
		fx.drain_topics(3).await;

		let form = Form::new(vec![Field::new("first", "Ada").with_id("1")]);
		fx.host.push_form(&form).await.unwrap();
		assert_eq!(fx.drain_topics(1).await, vec![Topic::PreviewChanged]);
		let first = fx.host.generated().unwrap();
		assert!(first.file_name().unwrap().to_string_lossy().starts_with("formsync-"));
		assert_eq!(first.extension().unwrap(), "json");

		fx.host.push_form(&form).await.unwrap();
		fx.drain_topics(1).await;
		let second = fx.host.generated().unwrap();
		assert_ne!(first, second);
		assert!(!first.exists());
		assert_eq!(fx.scratch_files(), 1);
		assert_eq!(fx.host.preview_path(), Some(second));

		let form = fx.host.fetch_form().await.unwrap().unwrap();
		assert_eq!(form.field("1").unwrap().value, "Ada");
		// The selected document itself is never rewritten.
		assert_eq!(std::fs::read_to_string(&doc).unwrap(), DOC);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn slower_older_push_does_not_replace_newer_copy() {
		let mut fx = Fixture::with_documents(Arc::new(SlowFill {
			slow_value: "older",
			delay: Duration::from_millis(300),
		}));
		let doc = fx.document("a.json");
		fx.picker.push(&doc);
		fx.host.request_open_file().await.unwrap();
		fx.drain_topics(3).await;

		let older = Form::new(vec![Field::new("first", "older").with_id("1")]);
		let newer = Form::new(vec![Field::new("first", "newer").with_id("1")]);
		let (first, second) = tokio::join!(fx.host.push_form(&older), async {
			tokio::time::sleep(Duration::from_millis(50)).await;
			fx.host.push_form(&newer).await
		});
		first.unwrap();
		second.unwrap();

		assert_eq!(fx.drain_topics(1).await, vec![Topic::PreviewChanged]);
		assert!(
			tokio::time::timeout(Duration::from_millis(50), fx.topics.recv())
				.await
				.is_err()
		);
		let form = fx.host.fetch_form().await.unwrap().unwrap();
		assert_eq!(form.field("1").unwrap().value, "newer");
		assert_eq!(fx.scratch_files(), 1);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn copy_filled_for_previous_selection_is_dropped() {
		let mut fx = Fixture::with_documents(Arc::new(SlowFill {
			slow_value: "slow",
			delay: Duration::from_millis(300),
		}));
		let a = fx.document("a.json");
		let b = fx.document("b.json");
		fx.picker.push(&a);
		fx.picker.push(&b);
		fx.host.request_open_file().await.unwrap();

		let slow = Form::new(vec![Field::new("first", "slow")]);
		let (push, open) = tokio::join!(fx.host.push_form(&slow), async {
			tokio::time::sleep(Duration::from_millis(50)).await;
			fx.host.request_open_file().await
		});
		push.unwrap();
		open.unwrap();

		assert_eq!(fx.drain_topics(6).await.len(), 6);
		assert!(
			tokio::time::timeout(Duration::from_millis(50), fx.topics.recv())
				.await
				.is_err()
		);
		assert_eq!(fx.host.generated(), None);
		assert_eq!(fx.host.preview_path(), Some(b));
		assert_eq!(fx.scratch_files(), 0);
	}

	#[tokio::test]
	async fn auto_fill_announces_form_and_preview() {
		let mut fx = Fixture::new();
		let doc = fx.document("a.json");
		fx.picker.push(&doc);
		fx.host.request_open_file().await.unwrap();
		fx.drain_topics(3).await;

		fx.host.push_form_with_auto_field_names().await.unwrap();
		let mut expected = vec![Topic::FormChanged, Topic::PreviewChanged];
		expected.sort_by_key(|t| t.as_str());
		assert_eq!(fx.drain_topics(2).await, expected);

		let form = fx.host.fetch_form().await.unwrap().unwrap();
		assert!(form.iter().all(|f| f.value == f.name));
	}

	#[tokio::test]
	async fn reopening_drops_generated_copy() {
		let mut fx = Fixture::new();
		let a = fx.document("a.json");
		let b = fx.document("b.json");
		fx.picker.push(&a);
		fx.picker.push(&b);

		fx.host.request_open_file().await.unwrap();
		fx.host.push_form_with_auto_field_names().await.unwrap();
		let generated = fx.host.generated().unwrap();

		fx.host.request_open_file().await.unwrap();
		fx.drain_topics(8).await;
		assert_eq!(fx.host.generated(), None);
		assert!(!generated.exists());
		assert_eq!(fx.host.preview_path(), Some(b));
	}

	#[tokio::test]
	async fn preview_is_base64_of_file() {
		let fx = Fixture::new();
		let doc = fx.document("a.json");
		fx.picker.push(&doc);
		fx.host.request_open_file().await.unwrap();

		let preview = fx.host.fetch_preview().await.unwrap().unwrap();
		assert_eq!(preview.decode().unwrap(), DOC.as_bytes());
	}

	#[tokio::test]
	async fn missing_selection_is_io_error() {
		let fx = Fixture::new();
		fx.picker.push(fx.dir.path().join("gone.json"));
		fx.host.request_open_file().await.unwrap();
		assert!(matches!(fx.host.fetch_preview().await, Err(GatewayError::Io { .. })));
		assert!(matches!(fx.host.fetch_form().await, Err(GatewayError::Io { .. })));
	}

	#[tokio::test]
	async fn drop_removes_generated_copy() {
		let fx = Fixture::new();
		let doc = fx.document("a.json");
		fx.picker.push(&doc);
		fx.host.request_open_file().await.unwrap();
		fx.host.push_form_with_auto_field_names().await.unwrap();
		let generated = fx.host.generated().unwrap();

		let Fixture { host, dir, .. } = fx;
		drop(host);
		assert!(!generated.exists());
		drop(dir);
	}
}
