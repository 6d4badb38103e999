//! Document engines: the parts that actually read and rewrite documents.

use std::io::Write;
use std::path::Path;

use formsync_gateway::{GatewayError, Result};
use formsync_model::{Field, Form};
use serde_json::Value;
use tracing::{debug, warn};

/// Reads form fields out of a document and writes filled copies.
///
/// Implementations are blocking; the host runs them on the blocking pool.
pub trait DocumentEngine: Send + Sync + 'static {
	/// Extracts the form of the document at `source`.
	fn read_form(&self, source: &Path) -> Result<Form>;

	/// Writes a copy of `source` to `out` with field values taken from
	/// `form`, matched by field name.
	fn fill_form(&self, source: &Path, form: &Form, out: &mut dyn Write) -> Result<()>;

	/// Writes a copy of `source` to `out` with every field set to its own
	/// name.
	fn fill_with_names(&self, source: &Path, out: &mut dyn Write) -> Result<()> {
		let mut form = self.read_form(source)?;
		for field in &mut form.text_fields {
			field.value = field.name.clone();
		}
		self.fill_form(source, &form, out)
	}
}

/// Engine for documents stored as JSON form records.
///
/// The document is a JSON object with a `textFields` array in the same shape
/// the gateway uses. Keys other than `textFields` are preserved on fill.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDocumentEngine;

const FIELDS_KEY: &str = "textFields";

impl JsonDocumentEngine {
	fn load(source: &Path) -> Result<serde_json::Map<String, Value>> {
		let bytes = std::fs::read(source).map_err(|e| GatewayError::io(source, e))?;
		match serde_json::from_slice::<Value>(&bytes)? {
			Value::Object(map) if map.contains_key(FIELDS_KEY) => Ok(map),
			_ => Err(GatewayError::FormNotFound {
				path: source.to_path_buf(),
			}),
		}
	}

	fn form_of(doc: &serde_json::Map<String, Value>) -> Result<Form> {
		let fields = doc.get(FIELDS_KEY).cloned().unwrap_or(Value::Null);
		Ok(Form::new(serde_json::from_value::<Option<Vec<Field>>>(fields)?.unwrap_or_default()))
	}
}

impl DocumentEngine for JsonDocumentEngine {
	fn read_form(&self, source: &Path) -> Result<Form> {
		let doc = Self::load(source)?;
		Self::form_of(&doc)
	}

	fn fill_form(&self, source: &Path, input: &Form, out: &mut dyn Write) -> Result<()> {
		let mut doc = Self::load(source)?;
		let mut form = Self::form_of(&doc)?;

		for field in &mut form.text_fields {
			match input.find_by_name(&field.name) {
				Some(filled) => field.value = filled.value.clone(),
				None => warn!(field = %field.name, source = %source.display(), "document.field_not_in_input"),
			}
		}
		for field in input.iter().filter(|f| form.find_by_name(&f.name).is_none()) {
			debug!(field = %field.name, "document.input_field_not_in_document");
		}

		doc.insert(FIELDS_KEY.to_string(), serde_json::to_value(&form.text_fields)?);
		serde_json::to_writer_pretty(&mut *out, &doc)?;
		out.flush().map_err(|e| GatewayError::io(source, e))?;
		Ok(())
	}
}
