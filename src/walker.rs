//! Depth-first field walker
//!
//! Fields are visited in declaration order. Nested records recurse with the
//! same document, so their selectors see the whole page rather than a
//! sub-tree.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::document::{Document, Node};
use crate::error::{FieldError, FieldErrorKind, FieldErrors};
use crate::extract::{extract_value, post_process, Processed};
use crate::schema::{FieldDescriptor, FieldKind, Schema};
use crate::tag::TagSpec;

/// What to do when a field fails. Applies to every field kind at every depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Record the failure, leave the field untouched, keep walking
    #[default]
    Continue,
    /// Stop at the first failure
    Abort,
}

/// Marker returned up the stack once an `Abort` policy stops the walk
#[derive(Debug)]
pub(crate) struct Aborted;

/// State of one walk over one document
pub struct Walk<'a> {
    document: &'a dyn Document,
    sentinel: &'a str,
    policy: ErrorPolicy,
    path: Vec<&'static str>,
    errors: FieldErrors,
}

impl<'a> Walk<'a> {
    /// Start a walk over `document` with the given sentinel and policy
    pub fn new(document: &'a dyn Document, sentinel: &'a str, policy: ErrorPolicy) -> Self {
        Self {
            document,
            sentinel,
            policy,
            path: Vec::new(),
            errors: FieldErrors::new(),
        }
    }

    /// Populate `record`. Fields that succeeded stay written even when
    /// errors are returned.
    pub fn run<R>(mut self, schema: &Schema<R>, record: &mut R) -> Result<(), FieldErrors> {
        // Aborting has already recorded its error
        let _ = self.walk(schema, record);

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    pub(crate) fn walk<R>(&mut self, schema: &Schema<R>, record: &mut R) -> Result<(), Aborted> {
        for field in schema.fields() {
            self.path.push(field.name());
            let outcome = self.walk_field(field, record);
            self.path.pop();
            outcome?;
        }
        Ok(())
    }

    fn walk_field<R>(&mut self, field: &FieldDescriptor<R>, record: &mut R) -> Result<(), Aborted> {
        let result = match &field.kind {
            FieldKind::Nested { walk } => return walk(record, self),
            FieldKind::Scalar { spec, .. }
            | FieldKind::Optional { spec, .. }
            | FieldKind::Sequence { spec, .. }
                if !spec.is_active() =>
            {
                trace!(field = %self.field_path(), "no selector, skipping");
                Ok(())
            }
            FieldKind::Scalar { spec, write } => {
                debug!(field = %self.field_path(), selector = %spec.selector, "walking scalar");
                self.first_value(spec).and_then(|found| match found {
                    None => Err(FieldErrorKind::SelectorNotFound(spec.selector.clone())),
                    Some(Processed::Rejected) => Err(FieldErrorKind::FilterRejected(
                        spec.filter
                            .as_ref()
                            .map(|f| f.as_str().to_string())
                            .unwrap_or_default(),
                    )),
                    Some(Processed::NoMatch) => write(record, self.sentinel),
                    Some(Processed::Value(value)) => write(record, value.as_str()),
                })
            }
            FieldKind::Optional { spec, write } => {
                debug!(field = %self.field_path(), selector = %spec.selector, "walking optional");
                self.first_value(spec).and_then(|found| match found {
                    Some(Processed::Value(value)) => write(record, Some(value.as_str())),
                    None | Some(Processed::Rejected) | Some(Processed::NoMatch) => {
                        write(record, None)
                    }
                })
            }
            FieldKind::Sequence { spec, write } => {
                debug!(field = %self.field_path(), selector = %spec.selector, "walking sequence");
                self.all_values(spec).and_then(|values| write(record, values))
            }
        };

        match result {
            Ok(()) => Ok(()),
            Err(kind) => self.fail(kind),
        }
    }

    /// First node's processed value, `None` when nothing matches
    fn first_value(&self, spec: &TagSpec) -> Result<Option<Processed>, FieldErrorKind> {
        let nodes = self.find(spec)?;
        let Some(node) = nodes.first() else {
            return Ok(None);
        };

        let raw = extract_value(node.as_ref(), spec.attribute.as_deref());
        trace!(field = %self.field_path(), raw = %raw, matches = nodes.len(), "first node");
        post_process(&raw, spec.extract.as_ref(), spec.filter.as_ref()).map(Some)
    }

    /// Accepted values of every matching node, in document order
    fn all_values(&self, spec: &TagSpec) -> Result<Vec<String>, FieldErrorKind> {
        let nodes = self.find(spec)?;
        let mut values = Vec::with_capacity(nodes.len());

        for node in &nodes {
            let raw = extract_value(node.as_ref(), spec.attribute.as_deref());
            let processed = post_process(&raw, spec.extract.as_ref(), spec.filter.as_ref())?;
            trace!(field = %self.field_path(), raw = %raw, ?processed, "node");
            if let Some(value) = processed.or_sentinel(self.sentinel) {
                values.push(value);
            }
        }

        Ok(values)
    }

    fn find(&self, spec: &TagSpec) -> Result<Vec<Box<dyn Node + 'a>>, FieldErrorKind> {
        self.document
            .find(&spec.selector)
            .map_err(|reason| FieldErrorKind::InvalidSelector {
                selector: spec.selector.clone(),
                reason,
            })
    }

    fn fail(&mut self, kind: FieldErrorKind) -> Result<(), Aborted> {
        let error = FieldError {
            field: self.field_path(),
            kind,
        };
        warn!(error = %error, policy = ?self.policy, "field failed");
        self.errors.push(error);

        match self.policy {
            ErrorPolicy::Continue => Ok(()),
            ErrorPolicy::Abort => Err(Aborted),
        }
    }

    fn field_path(&self) -> String {
        self.path.join(".")
    }
}
