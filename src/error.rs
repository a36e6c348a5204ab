//! Error types for schema building, fetching and field extraction

use std::fmt;

/// Top-level error returned by every grab entry point
#[derive(thiserror::Error, Debug)]
pub enum GrabError {
    /// A record's field table could not be built
    #[error("invalid schema for {record}: {reason}")]
    Schema { record: &'static str, reason: String },

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: ureq::Error,
    },

    #[error("failed to read body of {url}: {source}")]
    Read {
        url: String,
        #[source]
        source: ureq::Error,
    },

    /// One or more fields failed; every other field was still written
    #[error(transparent)]
    Fields(#[from] FieldErrors),
}

impl GrabError {
    /// Per-field failures, if this error carries any
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            GrabError::Fields(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Failure of a single field during a walk
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("field `{field}`: {kind}")]
pub struct FieldError {
    /// Dotted path of the field, e.g. `meta.keywords`
    pub field: String,
    pub kind: FieldErrorKind,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorKind {
    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("value does not match filter: {0}")]
    FilterRejected(String),

    #[error("invalid selector {selector}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("extract pattern has no capture group: {0}")]
    MissingCaptureGroup(String),

    #[error("cannot convert {value:?} into {target}: {reason}")]
    Coercion {
        value: String,
        target: &'static str,
        reason: String,
    },
}

/// Aggregate of all field failures from one walk, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// Look up the failure recorded for a field path
    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.0.iter().find(|e| e.field == field)
    }

    pub fn into_vec(self) -> Vec<FieldError> {
        self.0
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.len() {
            0 => write!(f, "no field errors"),
            1 => write!(f, "{}", self.0[0]),
            n => {
                write!(f, "{} fields failed: ", n)?;
                for (i, e) in self.0.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for FieldErrors {}

impl<'a> IntoIterator for &'a FieldErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_display() {
        let mut errors = FieldErrors::new();
        errors.push(FieldError {
            field: "title".to_string(),
            kind: FieldErrorKind::SelectorNotFound("h1.title".to_string()),
        });
        assert_eq!(
            errors.to_string(),
            "field `title`: selector not found: h1.title"
        );

        errors.push(FieldError {
            field: "meta.price".to_string(),
            kind: FieldErrorKind::FilterRejected(r"^\d+$".to_string()),
        });
        let fields: Vec<_> = errors.clone().into_vec().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["title", "meta.price"]);

        let text = GrabError::from(errors).to_string();
        assert!(text.starts_with("2 fields failed: "));
        assert!(text.contains("meta.price"));
    }
}
