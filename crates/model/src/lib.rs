//! Value types for the client-side form mirror.
//!
//! * [`Field`]: one fillable slot of a document form
//! * [`Form`]: the ordered field list the backend extracted from a document
//! * [`Preview`]: an opaque, base64 encoded document payload
//!
//! Deserialization is deliberately lenient: absent properties take their
//! default value and an absent field list is an empty form.

#![warn(missing_docs)]

mod field;
mod form;
mod preview;

pub use field::Field;
pub use form::Form;
pub use preview::{Preview, PreviewEncoding, PreviewError};
