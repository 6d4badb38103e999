use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::Field;

/// Ordered collection of fields extracted from one document.
///
/// Order is backend-determined and is the render order. Duplicate names are
/// kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Form {
	/// Text fields in render order.
	#[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_empty")]
	pub text_fields: Vec<Field>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Field>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<Vec<Field>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Form {
	/// Creates a form from fields in the given order.
	pub fn new(text_fields: Vec<Field>) -> Self {
		Self { text_fields }
	}

	/// Number of fields.
	pub fn len(&self) -> usize {
		self.text_fields.len()
	}

	/// Returns true if the form has no fields.
	pub fn is_empty(&self) -> bool {
		self.text_fields.is_empty()
	}

	/// Iterates fields in render order.
	pub fn iter(&self) -> std::slice::Iter<'_, Field> {
		self.text_fields.iter()
	}

	/// First field whose [`Field::key`] equals `key`.
	pub fn field(&self, key: &str) -> Option<&Field> {
		self.text_fields.iter().find(|f| f.key() == key)
	}

	/// First field whose display name equals `name`.
	pub fn find_by_name(&self, name: &str) -> Option<&Field> {
		self.text_fields.iter().find(|f| f.name == name)
	}

	/// Overwrites the value of the first field keyed `key`.
	///
	/// Returns false if no field matches.
	pub fn set_value(&mut self, key: &str, value: impl Into<String>) -> bool {
		match self.text_fields.iter_mut().find(|f| f.key() == key) {
			Some(field) => {
				field.value = value.into();
				true
			}
			None => false,
		}
	}

	/// Sorts fields by display name. Stable, so duplicates keep their order.
	pub fn sort_by_name(&mut self) {
		self.text_fields.sort_by(|a, b| a.name.cmp(&b.name));
	}

	/// Fields holding a value.
	pub fn filled(&self) -> impl Iterator<Item = &Field> {
		self.text_fields.iter().filter(|f| f.is_filled())
	}

	/// Fields without a value.
	pub fn unfilled(&self) -> impl Iterator<Item = &Field> {
		self.text_fields.iter().filter(|f| !f.is_filled())
	}
}

impl<'a> IntoIterator for &'a Form {
	type Item = &'a Field;
	type IntoIter = std::slice::Iter<'a, Field>;

	fn into_iter(self) -> Self::IntoIter {
		self.text_fields.iter()
	}
}

impl fmt::Display for Form {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "filled:")?;
		for field in self.filled() {
			writeln!(f, "  {}: {}", field.name, field.value)?;
		}
		writeln!(f, "not filled:")?;
		for field in self.unfilled() {
			writeln!(f, "  {}", field.name)?;
		}
		Ok(())
	}
}
