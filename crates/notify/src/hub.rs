use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use formsync_worker::{BoxFutureStatic, TaskClass, WorkerJoinSet};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, trace, warn};

use crate::{NotifyError, Result, Topic};

type Handler = Arc<dyn Fn() -> BoxFutureStatic<()> + Send + Sync>;

/// Creates a connected notifier/hub pair.
pub fn channel() -> (Notifier, NotificationHub) {
	let (tx, rx) = mpsc::unbounded_channel();
	(
		Notifier { tx },
		NotificationHub {
			handlers: HashMap::new(),
			rx,
		},
	)
}

/// Emitting half, held by the backend.
#[derive(Debug, Clone)]
pub struct Notifier {
	tx: mpsc::UnboundedSender<Topic>,
}

impl Notifier {
	/// Signals that `topic` changed.
	pub fn emit(&self, topic: Topic) -> Result<()> {
		trace!(topic = topic.as_str(), "notify.emit");
		self.tx.send(topic).map_err(|_| NotifyError::Closed(topic))
	}
}

/// Receiving half: per-topic handler registry and dispatcher.
///
/// Handlers are registered before dispatch starts; [`Self::spawn`] and
/// [`Self::run`] consume the hub.
pub struct NotificationHub {
	handlers: HashMap<Topic, Handler>,
	rx: mpsc::UnboundedReceiver<Topic>,
}

impl std::fmt::Debug for NotificationHub {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NotificationHub")
			.field("topics", &self.handlers.keys().collect::<Vec<_>>())
			.finish()
	}
}

impl NotificationHub {
	/// Registers the handler for `topic`.
	///
	/// Each firing calls `handler` and runs the returned future as its own
	/// task, so handlers for different topics may be in flight together.
	pub fn subscribe<F, Fut>(&mut self, topic: Topic, handler: F) -> Result<()>
	where
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = ()> + Send + 'static,
	{
		if self.handlers.contains_key(&topic) {
			return Err(NotifyError::AlreadySubscribed(topic));
		}
		let handler: Handler = Arc::new(move || -> BoxFutureStatic<()> { Box::pin(handler()) });
		self.handlers.insert(topic, handler);
		debug!(topic = topic.as_str(), "notify.subscribe");
		Ok(())
	}

	/// Returns true if `topic` has a handler.
	pub fn is_subscribed(&self, topic: Topic) -> bool {
		self.handlers.contains_key(&topic)
	}

	/// Starts dispatch on a background task.
	pub fn spawn(self) -> JoinHandle<()> {
		formsync_worker::spawn(TaskClass::Background, self.run())
	}

	/// Dispatches notifications until every [`Notifier`] is dropped, then
	/// waits for in-flight handlers.
	pub async fn run(mut self) {
		let mut inflight = WorkerJoinSet::new(TaskClass::Interactive);
		loop {
			tokio::select! {
				topic = self.rx.recv() => match topic {
					Some(topic) => self.dispatch(topic, &mut inflight),
					None => break,
				},
				Some(res) = inflight.join_next(), if !inflight.is_empty() => reap(res),
			}
		}
		while let Some(res) = inflight.join_next().await {
			reap(res);
		}
		debug!("notify.dispatcher_stopped");
	}

	fn dispatch(&self, topic: Topic, inflight: &mut WorkerJoinSet<()>) {
		match self.handlers.get(&topic) {
			Some(handler) => {
				trace!(topic = topic.as_str(), pending = inflight.len(), "notify.dispatch");
				inflight.spawn(handler());
			}
			None => debug!(topic = topic.as_str(), "notify.unhandled"),
		}
	}
}

fn reap(res: std::result::Result<(), JoinError>) {
	let Err(err) = res else {
		return;
	};
	match formsync_worker::join_error_panic_message(err) {
		Some(msg) => error!(panic = %msg, "notify.handler_panicked"),
		None => warn!("notify.handler_cancelled"),
	}
}
