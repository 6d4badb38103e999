use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Encoding of [`Preview::data`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewEncoding {
	/// Standard base64 with padding.
	#[default]
	Base64,
}

/// Errors decoding a preview payload.
#[derive(Debug, Error)]
pub enum PreviewError {
	/// The payload is not valid base64.
	#[error("invalid base64 preview payload: {0}")]
	Base64(#[from] base64::DecodeError),
}

/// Rendered document payload, treated as one atomic value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
	/// Payload encoding.
	pub encoding: PreviewEncoding,
	/// Encoded document bytes.
	pub data: String,
}

impl Preview {
	/// Encodes raw document bytes.
	pub fn from_bytes(bytes: &[u8]) -> Self {
		Self {
			encoding: PreviewEncoding::Base64,
			data: STANDARD.encode(bytes),
		}
	}

	/// Returns true if there is no payload.
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	/// Decodes the payload back into document bytes.
	pub fn decode(&self) -> Result<Vec<u8>, PreviewError> {
		match self.encoding {
			PreviewEncoding::Base64 => Ok(STANDARD.decode(&self.data)?),
		}
	}

	/// Data URL suitable for embedding the document in a viewer.
	pub fn data_url(&self) -> String {
		match self.encoding {
			PreviewEncoding::Base64 => format!("data:application/pdf;base64,{}", self.data),
		}
	}
}
