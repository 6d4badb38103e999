use std::fmt;

/// Change topics emitted by the document backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
	/// The backend switched its active document.
	ActiveFileChanged,
	/// The active document's form fields changed.
	FormChanged,
	/// The active document's preview bytes changed.
	PreviewChanged,
}

impl Topic {
	/// All topics, in declaration order.
	pub const ALL: [Topic; 3] = [Topic::ActiveFileChanged, Topic::FormChanged, Topic::PreviewChanged];

	/// Wire name of the topic.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::ActiveFileChanged => "active_file_changed",
			Self::FormChanged => "form_content_updated",
			Self::PreviewChanged => "preview_file_content_updated",
		}
	}
}

impl fmt::Display for Topic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn displays_wire_names() {
		let names: Vec<_> = Topic::ALL.iter().map(ToString::to_string).collect();
		assert_eq!(
			names,
			vec!["active_file_changed", "form_content_updated", "preview_file_content_updated"]
		);
	}
}
