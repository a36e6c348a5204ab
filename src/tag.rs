//! Field annotations and the tag specs parsed from them
//!
//! A field is annotated with string key/value pairs:
//! - `selector`: CSS selector, required to activate extraction
//! - `attribute`: attribute name, node text is used when absent
//! - `extract`: regex whose first capture group replaces the value
//! - `filter`: regex a value must match to be kept
//! - `grab`: legacy `selector[,attribute]` combined form

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::extract::Pattern;

pub const KEY_SELECTOR: &str = "selector";
pub const KEY_ATTRIBUTE: &str = "attribute";
pub const KEY_EXTRACT: &str = "extract";
pub const KEY_FILTER: &str = "filter";
pub const KEY_GRAB: &str = "grab";

/// Raw annotations attached to one field
///
/// Can be built in code, from pairs, or deserialized from a JSON object:
/// `{"selector": "meta[name=keywords]", "attribute": "content"}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<String, String>")]
pub struct Annotations {
    pairs: Vec<(String, String)>,
}

impl Annotations {
    /// Empty annotations; the field will not be extracted
    pub fn new() -> Self {
        Self::default()
    }

    /// Legacy combined form, `selector[,attribute]`
    pub fn grab(value: &str) -> Self {
        Self::new().with(KEY_GRAB, value)
    }

    /// Build from `(key, value)` pairs, in order
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Append a raw key/value pair
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// Set the CSS selector
    pub fn selector(self, selector: &str) -> Self {
        self.with(KEY_SELECTOR, selector)
    }

    /// Read this attribute instead of the node text
    pub fn attribute(self, attribute: &str) -> Self {
        self.with(KEY_ATTRIBUTE, attribute)
    }

    /// Replace the value with the first capture group of `pattern`
    pub fn extract(self, pattern: &str) -> Self {
        self.with(KEY_EXTRACT, pattern)
    }

    /// Keep only values matching `pattern`
    pub fn filter(self, pattern: &str) -> Self {
        self.with(KEY_FILTER, pattern)
    }

    /// Last value recorded for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether no annotations were given at all
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl From<BTreeMap<String, String>> for Annotations {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self::from_pairs(map)
    }
}

impl From<&str> for Annotations {
    fn from(combined: &str) -> Self {
        Self::grab(combined)
    }
}

/// Structured extraction configuration for one field
#[derive(Debug)]
pub struct TagSpec {
    /// Empty selector means the field is not extracted at all
    pub selector: String,
    pub attribute: Option<String>,
    pub extract: Option<Pattern>,
    pub filter: Option<Pattern>,
}

impl TagSpec {
    /// Parse annotations into a spec.
    ///
    /// Regex syntax is not checked here; patterns compile on first use.
    pub fn parse(annotations: &Annotations) -> Result<Self, String> {
        if let Some((key, _)) = annotations
            .pairs
            .iter()
            .find(|(k, _)| !is_known_key(k))
        {
            return Err(format!("unknown annotation key `{}`", key));
        }

        let (mut selector, mut attribute) = match annotations.get(KEY_GRAB) {
            Some(combined) => split_combined(combined),
            None => (String::new(), None),
        };

        if let Some(explicit) = annotations.get(KEY_SELECTOR) {
            let explicit = explicit.trim();
            if !selector.is_empty() && selector != explicit {
                return Err(format!(
                    "selector `{}` conflicts with combined form `{}`",
                    explicit, selector
                ));
            }
            selector = explicit.to_string();
        }

        if let Some(explicit) = annotations.get(KEY_ATTRIBUTE) {
            let explicit = explicit.trim();
            match attribute.as_deref() {
                Some(existing) if existing != explicit => {
                    return Err(format!(
                        "attribute `{}` conflicts with combined form `{}`",
                        explicit, existing
                    ));
                }
                _ => {}
            }
            attribute = non_empty(explicit);
        }

        Ok(TagSpec {
            selector,
            attribute,
            extract: annotations.get(KEY_EXTRACT).map(Pattern::new),
            filter: annotations.get(KEY_FILTER).map(Pattern::new),
        })
    }

    /// Whether this spec triggers extraction
    pub fn is_active(&self) -> bool {
        !self.selector.is_empty()
    }
}

fn is_known_key(key: &str) -> bool {
    matches!(
        key,
        KEY_SELECTOR | KEY_ATTRIBUTE | KEY_EXTRACT | KEY_FILTER | KEY_GRAB
    )
}

// "selector,attribute": anything after a second comma is ignored
fn split_combined(combined: &str) -> (String, Option<String>) {
    let mut parts = combined.split(',');
    let selector = parts.next().unwrap_or("").trim().to_string();
    let attribute = parts.next().and_then(|a| non_empty(a.trim()));
    (selector, attribute)
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
