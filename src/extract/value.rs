//! Raw value extraction from a matched node

use crate::document::Node;

/// Node text, or the named attribute (empty when the node lacks it).
/// No whitespace normalization happens here.
pub fn extract_value(node: &dyn Node, attribute: Option<&str>) -> String {
    match attribute {
        None => node.text(),
        Some(name) => node.attribute(name).unwrap_or_default(),
    }
}
