use serde::{Deserialize, Serialize};

/// A single fillable text field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Field {
	/// Backend identifier. May be empty when the document assigns none.
	pub id: String,
	/// Display name, used as label and as fallback key.
	pub name: String,
	/// Current value.
	pub value: String,
	/// Whether the field takes multi-line input.
	pub multiline: bool,
}

impl Field {
	/// Creates a single-line field with an empty identifier.
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			..Self::default()
		}
	}

	/// Sets the backend identifier.
	#[must_use]
	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = id.into();
		self
	}

	/// Marks the field as multi-line.
	#[must_use]
	pub fn multiline(mut self, multiline: bool) -> Self {
		self.multiline = multiline;
		self
	}

	/// Key used to address this field in edits.
	///
	/// The identifier when present, otherwise the display name.
	pub fn key(&self) -> &str {
		if self.id.is_empty() { &self.name } else { &self.id }
	}

	/// Returns true if the field holds a non-empty value.
	pub fn is_filled(&self) -> bool {
		!self.value.is_empty()
	}
}
