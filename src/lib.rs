//! Declarative HTML extraction into typed records
//!
//! A record describes each field once: a CSS selector, optionally an
//! attribute to read instead of the node text, and optional regex
//! `filter`/`extract` patterns. The walker resolves every field against a
//! parsed document and writes the results back in place:
//! - scalar fields take the first match
//! - optional fields take the first match or `None`
//! - sequence fields take every accepted match in document order
//! - nested records are walked against the same whole document

pub mod document;
pub mod error;
pub mod extract;
pub mod grabber;
pub mod schema;
pub mod tag;
pub mod walker;

pub use document::{parse_html, Document, Node};
pub use error::{FieldError, FieldErrorKind, FieldErrors, GrabError};
pub use extract::{Pattern, Processed, NO_MATCH};
pub use grabber::{grab, Grabber};
pub use schema::{FieldDescriptor, FieldShape, Fields, Record, Schema};
pub use tag::{Annotations, TagSpec};
pub use walker::{ErrorPolicy, Walk};
