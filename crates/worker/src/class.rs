/// Execution class of a spawned task, recorded on its trace events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Refresh work whose result the user is waiting to see.
	Interactive,
	/// Async work nobody is waiting on.
	Background,
	/// Blocking I/O executed on the blocking pool.
	IoBlocking,
}

impl TaskClass {
	/// Stable name used in trace fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
			Self::IoBlocking => "io_blocking",
		}
	}
}
