//! Regex filter/extract post-processing

use std::sync::OnceLock;

use regex::Regex;

use crate::error::FieldErrorKind;

/// Placeholder written when an extract pattern does not match and the
/// field has no way to represent absence
pub const NO_MATCH: &str = "(no match)";

/// A regex that is compiled the first time it is used
#[derive(Debug)]
pub struct Pattern {
    source: String,
    compiled: OnceLock<Regex>,
}

impl Pattern {
    /// Store `source` without compiling it
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            compiled: OnceLock::new(),
        }
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Compiled regex, compiling on first call
    pub fn regex(&self) -> Result<&Regex, FieldErrorKind> {
        if let Some(re) = self.compiled.get() {
            return Ok(re);
        }
        let re = Regex::new(&self.source).map_err(|e| FieldErrorKind::InvalidPattern {
            pattern: self.source.clone(),
            reason: e.to_string(),
        })?;
        Ok(self.compiled.get_or_init(|| re))
    }

    /// Whether `value` contains a match
    pub fn is_match(&self, value: &str) -> Result<bool, FieldErrorKind> {
        Ok(self.regex()?.is_match(value))
    }

    /// First capture group of the first match, `None` when nothing matches
    pub fn first_group<'v>(&self, value: &'v str) -> Result<Option<&'v str>, FieldErrorKind> {
        let re = self.regex()?;
        // captures_len counts the implicit whole-match group
        if re.captures_len() < 2 {
            return Err(FieldErrorKind::MissingCaptureGroup(self.source.clone()));
        }
        Ok(re
            .captures(value)
            .map(|caps| caps.get(1).map_or("", |m| m.as_str())))
    }
}

/// Outcome of post-processing one candidate value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    /// Failed the filter
    Rejected,
    /// Passed the filter but the extract pattern did not match
    NoMatch,
    Value(String),
}

impl Processed {
    /// The value, with `NoMatch` mapped to `sentinel`
    pub fn or_sentinel(self, sentinel: &str) -> Option<String> {
        match self {
            Processed::Rejected => None,
            Processed::NoMatch => Some(sentinel.to_string()),
            Processed::Value(v) => Some(v),
        }
    }
}

/// Filter first, then extract, then trim.
///
/// Errors only for broken patterns; a non-matching extract pattern yields
/// `Processed::NoMatch` instead.
pub fn post_process(
    value: &str,
    extract: Option<&Pattern>,
    filter: Option<&Pattern>,
) -> Result<Processed, FieldErrorKind> {
    if let Some(filter) = filter {
        if !filter.is_match(value)? {
            return Ok(Processed::Rejected);
        }
    }

    let value = match extract {
        Some(extract) => match extract.first_group(value)? {
            Some(group) => group,
            None => return Ok(Processed::NoMatch),
        },
        None => value,
    };

    Ok(Processed::Value(value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_first_group() {
        let extract = Pattern::new("(.+) - Suffix");
        assert_eq!(
            post_process("Example - Suffix", Some(&extract), None).unwrap(),
            Processed::Value("Example".to_string())
        );
        assert_eq!(
            post_process("NoMatch", Some(&extract), None).unwrap(),
            Processed::NoMatch
        );
        assert_eq!(
            Processed::NoMatch.or_sentinel(NO_MATCH).as_deref(),
            Some("(no match)")
        );
    }

    #[test]
    fn test_trims_after_extract() {
        let extract = Pattern::new(r"Price:(.*)EUR");
        assert_eq!(
            post_process("Price:  12.50 EUR", Some(&extract), None).unwrap(),
            Processed::Value("12.50".to_string())
        );
        assert_eq!(
            post_process("\n  plain \t", None, None).unwrap(),
            Processed::Value("plain".to_string())
        );
    }

    #[test]
    fn test_filter_rejects_before_extract() {
        let filter = Pattern::new(r".*\.html$");
        let extract = Pattern::new(r"(\w+)\.");
        assert_eq!(
            post_process("y.txt", Some(&extract), Some(&filter)).unwrap(),
            Processed::Rejected
        );
        assert_eq!(
            post_process("x.html", Some(&extract), Some(&filter)).unwrap(),
            Processed::Value("x".to_string())
        );
    }

    #[test]
    fn test_filter_is_idempotent() {
        let filter = Pattern::new(r"^\d+$");
        let values = ["1", "a", "22", "b3", "333"];
        let once: Vec<String> = values
            .iter()
            .filter_map(|v| post_process(v, None, Some(&filter)).unwrap().or_sentinel(NO_MATCH))
            .collect();
        let twice: Vec<String> = once
            .iter()
            .filter_map(|v| post_process(v, None, Some(&filter)).unwrap().or_sentinel(NO_MATCH))
            .collect();
        assert_eq!(once, vec!["1", "22", "333"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_invalid_pattern_surfaces_on_use() {
        let broken = Pattern::new("([unclosed");
        let err = post_process("anything", None, Some(&broken)).unwrap_err();
        assert!(matches!(err, FieldErrorKind::InvalidPattern { .. }));

        // Not touched when the stage is skipped
        assert!(post_process("anything", None, None).is_ok());
    }

    #[test]
    fn test_extract_requires_capture_group() {
        let no_group = Pattern::new(r"\d+");
        assert_eq!(
            post_process("42", Some(&no_group), None).unwrap_err(),
            FieldErrorKind::MissingCaptureGroup(r"\d+".to_string())
        );
    }

    #[test]
    fn test_compiled_once() {
        let pattern = Pattern::new("a+");
        let first = pattern.regex().unwrap() as *const Regex;
        let second = pattern.regex().unwrap() as *const Regex;
        assert_eq!(first, second);
    }
}
