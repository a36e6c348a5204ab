//! Field descriptor tables
//!
//! A record type lists its fields once through [`Fields`]; the resulting
//! [`Schema`] maps each field to its parsed [`TagSpec`] and a typed writer.
//! Schemas are built on first use and cached per type for the life of the
//! process.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Arc, OnceLock, RwLock};

use tracing::debug;

use crate::error::{FieldErrorKind, GrabError};
use crate::extract::{coerce, coerce_all};
use crate::tag::{Annotations, TagSpec};
use crate::walker::{Aborted, Walk};

/// A type whose fields can be populated from a document
///
/// ```ignore
/// #[derive(Default)]
/// struct Page {
///     title: String,
///     links: Vec<String>,
/// }
///
/// impl Record for Page {
///     fn describe(fields: &mut Fields<Self>) {
///         fields
///             .scalar("title", "title", |p| &mut p.title)
///             .sequence("links", "a[href],href", |p| &mut p.links);
///     }
/// }
/// ```
pub trait Record: Sized + 'static {
    /// Register fields in declaration order
    fn describe(fields: &mut Fields<Self>);
}

type NestedWalker<R> = Box<dyn Fn(&mut R, &mut Walk<'_>) -> Result<(), Aborted> + Send + Sync>;

pub(crate) enum FieldKind<R> {
    Scalar {
        spec: TagSpec,
        write: Box<dyn Fn(&mut R, &str) -> Result<(), FieldErrorKind> + Send + Sync>,
    },
    Optional {
        spec: TagSpec,
        write: Box<dyn Fn(&mut R, Option<&str>) -> Result<(), FieldErrorKind> + Send + Sync>,
    },
    Sequence {
        spec: TagSpec,
        write: Box<dyn Fn(&mut R, Vec<String>) -> Result<(), FieldErrorKind> + Send + Sync>,
    },
    Nested {
        walk: NestedWalker<R>,
    },
}

/// Shape of a registered field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// Exactly one value, `T: FromStr`
    Scalar,
    /// `Option<T>`, `None` when nothing usable was found
    Optional,
    /// `Vec<T>`, one entry per accepted node
    Sequence,
    /// Another record, resolved against the same document
    Nested,
}

pub struct FieldDescriptor<R> {
    name: &'static str,
    pub(crate) kind: FieldKind<R>,
}

impl<R> FieldDescriptor<R> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> FieldShape {
        match self.kind {
            FieldKind::Scalar { .. } => FieldShape::Scalar,
            FieldKind::Optional { .. } => FieldShape::Optional,
            FieldKind::Sequence { .. } => FieldShape::Sequence,
            FieldKind::Nested { .. } => FieldShape::Nested,
        }
    }

    /// Parsed annotations; nested records have none
    pub fn spec(&self) -> Option<&TagSpec> {
        match &self.kind {
            FieldKind::Scalar { spec, .. }
            | FieldKind::Optional { spec, .. }
            | FieldKind::Sequence { spec, .. } => Some(spec),
            FieldKind::Nested { .. } => None,
        }
    }
}

/// Builder handed to [`Record::describe`]
pub struct Fields<R> {
    fields: Vec<FieldDescriptor<R>>,
    errors: Vec<String>,
}

impl<R: Record> Fields<R> {
    fn new() -> Self {
        Self {
            fields: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// A single value taken from the first matching node
    pub fn scalar<T, F>(
        &mut self,
        name: &'static str,
        annotations: impl Into<Annotations>,
        access: F,
    ) -> &mut Self
    where
        T: FromStr + 'static,
        T::Err: Display,
        F: Fn(&mut R) -> &mut T + Send + Sync + 'static,
    {
        let Some(spec) = self.parse_spec(name, annotations.into()) else {
            return self;
        };
        let write = move |record: &mut R, raw: &str| -> Result<(), FieldErrorKind> {
            *access(record) = coerce::<T>(raw)?;
            Ok(())
        };
        self.push(name, FieldKind::Scalar {
            spec,
            write: Box::new(write),
        })
    }

    /// Like [`Fields::scalar`], but a miss or rejection writes `None`
    /// instead of failing the field
    pub fn optional<T, F>(
        &mut self,
        name: &'static str,
        annotations: impl Into<Annotations>,
        access: F,
    ) -> &mut Self
    where
        T: FromStr + 'static,
        T::Err: Display,
        F: Fn(&mut R) -> &mut Option<T> + Send + Sync + 'static,
    {
        let Some(spec) = self.parse_spec(name, annotations.into()) else {
            return self;
        };
        let write = move |record: &mut R, raw: Option<&str>| -> Result<(), FieldErrorKind> {
            *access(record) = raw.map(coerce::<T>).transpose()?;
            Ok(())
        };
        self.push(name, FieldKind::Optional {
            spec,
            write: Box::new(write),
        })
    }

    /// One value per matching node, in document order
    pub fn sequence<T, F>(
        &mut self,
        name: &'static str,
        annotations: impl Into<Annotations>,
        access: F,
    ) -> &mut Self
    where
        T: FromStr + 'static,
        T::Err: Display,
        F: Fn(&mut R) -> &mut Vec<T> + Send + Sync + 'static,
    {
        let Some(spec) = self.parse_spec(name, annotations.into()) else {
            return self;
        };
        let write = move |record: &mut R, raw: Vec<String>| -> Result<(), FieldErrorKind> {
            *access(record) = coerce_all::<T>(&raw)?;
            Ok(())
        };
        self.push(name, FieldKind::Sequence {
            spec,
            write: Box::new(write),
        })
    }

    /// A nested record, walked against the whole document
    pub fn nested<N, F>(&mut self, name: &'static str, access: F) -> &mut Self
    where
        N: Record,
        F: Fn(&mut R) -> &mut N + Send + Sync + 'static,
    {
        let schema = match Schema::<N>::load() {
            Ok(schema) => schema,
            Err(e) => {
                self.errors.push(format!("field `{}`: {}", name, e));
                return self;
            }
        };
        let walk = move |record: &mut R, walk: &mut Walk<'_>| -> Result<(), Aborted> {
            walk.walk(schema.as_ref(), access(record))
        };
        self.push(name, FieldKind::Nested {
            walk: Box::new(walk),
        })
    }

    fn parse_spec(&mut self, name: &'static str, annotations: Annotations) -> Option<TagSpec> {
        match TagSpec::parse(&annotations) {
            Ok(spec) => Some(spec),
            Err(reason) => {
                self.errors.push(format!("field `{}`: {}", name, reason));
                None
            }
        }
    }

    fn push(&mut self, name: &'static str, kind: FieldKind<R>) -> &mut Self {
        if self.fields.iter().any(|f| f.name == name) {
            self.errors
                .push(format!("field `{}` registered more than once", name));
        } else {
            self.fields.push(FieldDescriptor { name, kind });
        }
        self
    }
}

/// Descriptor table for one record type
pub struct Schema<R> {
    fields: Vec<FieldDescriptor<R>>,
}

impl<R: Record> Schema<R> {
    /// Build a fresh, uncached table
    pub fn build() -> Result<Self, GrabError> {
        let mut fields = Fields::<R>::new();
        R::describe(&mut fields);

        if !fields.errors.is_empty() {
            return Err(GrabError::Schema {
                record: type_name::<R>(),
                reason: fields.errors.join("; "),
            });
        }

        debug!(
            record = type_name::<R>(),
            fields = fields.fields.len(),
            "built schema"
        );
        Ok(Schema {
            fields: fields.fields,
        })
    }

    /// Cached table for `R`, built on first call. Failed builds are not cached.
    pub fn load() -> Result<Arc<Self>, GrabError> {
        let id = TypeId::of::<R>();

        if let Ok(cache) = schema_cache().read() {
            if let Some(cached) = cache.get(&id) {
                if let Ok(schema) = Arc::clone(cached).downcast::<Self>() {
                    return Ok(schema);
                }
            }
        }

        // Built outside the lock: nested records load their own schemas
        let built = Arc::new(Self::build()?);

        if let Ok(mut cache) = schema_cache().write() {
            let cached = cache
                .entry(id)
                .or_insert_with(|| Arc::clone(&built) as Arc<dyn Any + Send + Sync>);
            if let Ok(schema) = Arc::clone(cached).downcast::<Self>() {
                return Ok(schema);
            }
        }

        Ok(built)
    }
}

impl<R> Schema<R> {
    pub fn fields(&self) -> &[FieldDescriptor<R>] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor<R>> {
        self.fields.iter().find(|f| f.name == name)
    }
}

type SchemaCache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

fn schema_cache() -> &'static SchemaCache {
    static CACHE: OnceLock<SchemaCache> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Meta {
        keywords: String,
    }

    impl Record for Meta {
        fn describe(fields: &mut Fields<Self>) {
            fields.scalar("keywords", "meta[name=keywords],content", |m| &mut m.keywords);
        }
    }

    #[derive(Default)]
    struct Page {
        title: String,
        subtitle: Option<String>,
        links: Vec<String>,
        meta: Meta,
    }

    impl Record for Page {
        fn describe(fields: &mut Fields<Self>) {
            fields
                .scalar("title", "title", |p| &mut p.title)
                .optional("subtitle", "h2", |p| &mut p.subtitle)
                .sequence(
                    "links",
                    Annotations::new().selector("a").attribute("href"),
                    |p| &mut p.links,
                )
                .nested("meta", |p| &mut p.meta);
        }
    }

    #[test]
    fn test_fields_in_declaration_order() {
        let schema = Schema::<Page>::build().unwrap();
        let names: Vec<_> = schema.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["title", "subtitle", "links", "meta"]);

        let shapes: Vec<_> = schema.fields().iter().map(|f| f.shape()).collect();
        assert_eq!(
            shapes,
            vec![
                FieldShape::Scalar,
                FieldShape::Optional,
                FieldShape::Sequence,
                FieldShape::Nested
            ]
        );

        let links = schema.field("links").unwrap().spec().unwrap();
        assert_eq!(links.selector, "a");
        assert_eq!(links.attribute.as_deref(), Some("href"));
        assert!(schema.field("meta").unwrap().spec().is_none());
    }

    #[test]
    fn test_load_is_cached_per_type() {
        let first = Schema::<Page>::load().unwrap();
        let second = Schema::<Page>::load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    struct Broken {
        a: String,
        b: String,
    }

    impl Record for Broken {
        fn describe(fields: &mut Fields<Self>) {
            fields
                .scalar("a", Annotations::new().with("bogus", "x"), |r| &mut r.a)
                .scalar("b", "p", |r| &mut r.b)
                .scalar("b", "p", |r| &mut r.b);
        }
    }

    #[test]
    fn test_build_errors_are_reported_together() {
        let err = Schema::<Broken>::load().err().unwrap();
        let text = err.to_string();
        assert!(text.contains("unknown annotation key `bogus`"), "{}", text);
        assert!(text.contains("registered more than once"), "{}", text);

        // Not cached: the same error comes back
        assert!(Schema::<Broken>::load().is_err());
    }

    struct HasBrokenChild {
        child: Broken,
    }

    impl Record for HasBrokenChild {
        fn describe(fields: &mut Fields<Self>) {
            fields.nested("child", |r| &mut r.child);
        }
    }

    #[test]
    fn test_nested_build_error_propagates() {
        let err = Schema::<HasBrokenChild>::build().err().unwrap();
        assert!(err.to_string().contains("field `child`"));
    }
}
