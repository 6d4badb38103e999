//! The engine proper: cache ownership, refresh handling and commits.

use std::sync::Arc;

use formsync_gateway::RemoteGateway;
use formsync_model::{Form, Preview};
use formsync_notify::{NotificationHub, Topic};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::slot::Slot;
use crate::{EditError, EngineState, RefreshOutcome, RequestOutcome};

/// Form slot plus edit bookkeeping.
///
/// `edit_seq` counts local edits; `committed_seq` is the highest edit count
/// the backend has accepted or a refresh has superseded.
#[derive(Debug, Default)]
struct FormCache {
	slot: Slot<Form>,
	edit_seq: u64,
	committed_seq: u64,
}

impl FormCache {
	fn has_uncommitted(&self) -> bool {
		self.edit_seq > self.committed_seq
	}
}

struct Inner {
	gateway: Arc<dyn RemoteGateway>,
	form: Mutex<FormCache>,
	preview: Mutex<Slot<Preview>>,
	/// Bumped on every cache change; the display re-renders on change.
	revision: watch::Sender<u64>,
}

/// Client-side owner of the active document's form and preview.
///
/// Cheap to clone; clones share the same cache. Locks are only held for
/// synchronous cache updates, never across a gateway call.
#[derive(Clone)]
pub struct SyncEngine {
	inner: Arc<Inner>,
}

impl std::fmt::Debug for SyncEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SyncEngine")
			.field("state", &self.state())
			.field("revision", &self.revision())
			.field("uncommitted", &self.has_uncommitted_edits())
			.finish()
	}
}

impl SyncEngine {
	/// Creates an empty engine talking to `gateway`.
	pub fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
		let (revision, _) = watch::channel(0);
		Self {
			inner: Arc::new(Inner {
				gateway,
				form: Mutex::new(FormCache::default()),
				preview: Mutex::new(Slot::default()),
				revision,
			}),
		}
	}

	/// Registers the engine's refresh handlers on `hub`.
	///
	/// `form changed` refetches the form, `preview changed` the preview, and
	/// `active file changed` both. Fails if any topic already has a handler.
	pub fn attach(&self, hub: &mut NotificationHub) -> formsync_notify::Result<()> {
		let engine = self.clone();
		hub.subscribe(Topic::FormChanged, move || {
			let engine = engine.clone();
			async move {
				engine.refresh_form().await;
			}
		})?;

		let engine = self.clone();
		hub.subscribe(Topic::PreviewChanged, move || {
			let engine = engine.clone();
			async move {
				engine.refresh_preview().await;
			}
		})?;

		let engine = self.clone();
		hub.subscribe(Topic::ActiveFileChanged, move || {
			let engine = engine.clone();
			async move {
				debug!("engine.active_file_changed");
				tokio::join!(engine.refresh_form(), engine.refresh_preview());
			}
		})?;

		Ok(())
	}

	/// Current coarse state.
	pub fn state(&self) -> EngineState {
		let has_form = self.inner.form.lock().slot.is_some();
		let has_preview = self.inner.preview.lock().is_some();
		if has_form || has_preview {
			EngineState::Loaded
		} else {
			EngineState::Empty
		}
	}

	/// Snapshot of the cached form.
	pub fn form(&self) -> Option<Form> {
		self.inner.form.lock().slot.value().cloned()
	}

	/// Snapshot of the cached preview.
	pub fn preview(&self) -> Option<Preview> {
		self.inner.preview.lock().value().cloned()
	}

	/// Base64 preview text; empty when nothing is loaded.
	pub fn preview_text(&self) -> String {
		self.inner.preview.lock().value().map(|p| p.data.clone()).unwrap_or_default()
	}

	/// Returns true if the cached form has edits the backend has not accepted.
	pub fn has_uncommitted_edits(&self) -> bool {
		self.inner.form.lock().has_uncommitted()
	}

	/// Current cache revision.
	pub fn revision(&self) -> u64 {
		*self.inner.revision.borrow()
	}

	/// Receiver that observes every cache revision.
	pub fn changes(&self) -> watch::Receiver<u64> {
		self.inner.revision.subscribe()
	}

	fn bump_revision(&self) {
		self.inner.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
	}

	/// Overwrites one field value in the cache.
	///
	/// Purely local; nothing is sent until [`Self::commit_form`]. The first
	/// field whose key matches is edited.
	pub fn edit_field(&self, key: &str, value: impl Into<String>) -> Result<(), EditError> {
		{
			let mut cache = self.inner.form.lock();
			let form = cache.slot.value_mut().ok_or(EditError::NoForm)?;
			if !form.set_value(key, value) {
				return Err(EditError::UnknownField(key.to_string()));
			}
			cache.edit_seq = cache.edit_seq.wrapping_add(1);
		}
		trace!(key, "engine.edit_field");
		self.bump_revision();
		Ok(())
	}

	/// Refetches the form and replaces the cached one.
	///
	/// Refresh always wins over uncommitted local edits; the discard is
	/// logged.
	pub async fn refresh_form(&self) -> RefreshOutcome {
		let ticket = self.inner.form.lock().slot.issue();
		let fetched = match self.inner.gateway.fetch_form().await {
			Ok(fetched) => fetched,
			Err(error) => {
				warn!(ticket, %error, "engine.fetch_form_failed");
				return RefreshOutcome::Failed;
			}
		};

		let outcome = {
			let mut cache = self.inner.form.lock();
			if !cache.slot.accepts(ticket) {
				debug!(ticket, "engine.fetch_form_stale");
				return RefreshOutcome::Stale;
			}
			if cache.has_uncommitted() {
				warn!(
					pending = cache.edit_seq - cache.committed_seq,
					"engine.refresh_discarded_uncommitted_edits"
				);
			}
			let outcome = if fetched.is_some() {
				RefreshOutcome::Applied
			} else {
				RefreshOutcome::Cleared
			};
			cache.slot.apply(ticket, fetched);
			cache.committed_seq = cache.edit_seq;
			outcome
		};

		debug!(ticket, ?outcome, "engine.form_refreshed");
		self.bump_revision();
		outcome
	}

	/// Refetches the preview and replaces the cached one.
	pub async fn refresh_preview(&self) -> RefreshOutcome {
		let ticket = self.inner.preview.lock().issue();
		let fetched = match self.inner.gateway.fetch_preview().await {
			Ok(fetched) => fetched,
			Err(error) => {
				warn!(ticket, %error, "engine.fetch_preview_failed");
				return RefreshOutcome::Failed;
			}
		};

		let outcome = if fetched.is_some() {
			RefreshOutcome::Applied
		} else {
			RefreshOutcome::Cleared
		};
		if !self.inner.preview.lock().apply(ticket, fetched) {
			debug!(ticket, "engine.fetch_preview_stale");
			return RefreshOutcome::Stale;
		}

		debug!(ticket, ?outcome, "engine.preview_refreshed");
		self.bump_revision();
		outcome
	}

	/// Pushes the entire cached form to the backend.
	pub async fn commit_form(&self) -> RequestOutcome {
		let (snapshot, seq) = {
			let cache = self.inner.form.lock();
			match cache.slot.value() {
				Some(form) => (form.clone(), cache.edit_seq),
				None => return RequestOutcome::Skipped,
			}
		};

		if let Err(error) = self.inner.gateway.push_form(&snapshot).await {
			warn!(%error, fields = snapshot.len(), "engine.push_form_failed");
			return RequestOutcome::Failed;
		}

		let mut cache = self.inner.form.lock();
		cache.committed_seq = cache.committed_seq.max(seq);
		debug!(fields = snapshot.len(), "engine.form_committed");
		RequestOutcome::Sent
	}

	/// Asks the backend to open a new document.
	///
	/// The cache is repopulated only through the notifications that follow.
	pub async fn open_file(&self) -> RequestOutcome {
		match self.inner.gateway.request_open_file().await {
			Ok(()) => RequestOutcome::Sent,
			Err(error) => {
				warn!(%error, "engine.open_file_failed");
				RequestOutcome::Failed
			}
		}
	}

	/// Asks the backend to fill every field with its own name.
	///
	/// Like [`Self::open_file`], the result arrives through notifications.
	pub async fn auto_fill_and_commit(&self) -> RequestOutcome {
		match self.inner.gateway.push_form_with_auto_field_names().await {
			Ok(()) => RequestOutcome::Sent,
			Err(error) => {
				warn!(%error, "engine.auto_fill_failed");
				RequestOutcome::Failed
			}
		}
	}
}
