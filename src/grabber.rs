//! Grabber configuration and entry points
//!
//! The core entry point is [`Grabber::grab_document`]; [`Grabber::grab`]
//! adds a blocking fetch in front of it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::document::{parse_html, Document};
use crate::error::GrabError;
use crate::extract::NO_MATCH;
use crate::schema::{Record, Schema};
use crate::walker::{ErrorPolicy, Walk};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; WebGrab/1.0;) Rust";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Grabber {
    /// Whole-request timeout in seconds, 0 disables it
    pub timeout: u64,
    /// Redirects followed before the last response is used as-is
    pub max_redirects: u32,
    pub user_agent: String,
    pub error_policy: ErrorPolicy,
    /// Written into non-optional fields when an extract pattern misses
    pub no_match: String,
}

impl Default for Grabber {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            error_policy: ErrorPolicy::default(),
            no_match: NO_MATCH.to_string(),
        }
    }
}

impl Grabber {
    /// Grabber with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from JSON; missing keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Replace the error policy
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Fetch `url` and populate `record` from the returned page
    pub fn grab<R: Record>(&self, url: &str, record: &mut R) -> Result<(), GrabError> {
        let html = self.fetch(url)?;
        self.grab_html(&html, record)
    }

    pub fn grab_html<R: Record>(&self, html: &str, record: &mut R) -> Result<(), GrabError> {
        let document = parse_html(html);
        self.grab_document(&document, record)
    }

    /// Populate `record` from an already parsed document.
    ///
    /// Under [`ErrorPolicy::Continue`] every field is attempted and the
    /// failures come back together as [`GrabError::Fields`]; fields that
    /// succeeded are written either way.
    pub fn grab_document<R: Record>(
        &self,
        document: &dyn Document,
        record: &mut R,
    ) -> Result<(), GrabError> {
        let schema = Schema::<R>::load()?;
        Walk::new(document, &self.no_match, self.error_policy).run(&schema, record)?;
        Ok(())
    }

    /// Blocking GET returning the response body
    pub fn fetch(&self, url: &str) -> Result<String, GrabError> {
        let parsed = url::Url::parse(url).map_err(|source| GrabError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        info!(url = %parsed, user_agent = %self.user_agent, "fetching document");
        let response = self
            .agent()
            .get(parsed.as_str())
            .call()
            .map_err(|source| GrabError::Fetch {
                url: url.to_string(),
                source,
            })?;

        response
            .into_body()
            .read_to_string()
            .map_err(|source| GrabError::Read {
                url: url.to_string(),
                source,
            })
    }

    fn agent(&self) -> ureq::Agent {
        let timeout = (self.timeout > 0).then(|| Duration::from_secs(self.timeout));
        ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .timeout_global(timeout)
                .max_redirects(self.max_redirects)
                .max_redirects_will_error(false)
                .user_agent(self.user_agent.as_str())
                .build(),
        )
    }
}

/// Build a default `R` and populate it using the default configuration
pub fn grab<R: Record + Default>(html: &str) -> Result<R, GrabError> {
    let mut record = R::default();
    Grabber::default().grab_html(html, &mut record)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let grabber = Grabber::new();
        assert_eq!(grabber.timeout, 10);
        assert_eq!(grabber.max_redirects, 10);
        assert!(grabber.user_agent.contains("WebGrab/1.0"));
        assert_eq!(grabber.error_policy, ErrorPolicy::Continue);
        assert_eq!(grabber.no_match, "(no match)");
    }

    #[test]
    fn test_from_json_keeps_defaults() {
        let grabber =
            Grabber::from_json(r#"{"timeout": 3, "error_policy": "abort"}"#).unwrap();
        assert_eq!(grabber.timeout, 3);
        assert_eq!(grabber.error_policy, ErrorPolicy::Abort);
        assert_eq!(grabber.max_redirects, DEFAULT_MAX_REDIRECTS);
        assert_eq!(grabber.user_agent, DEFAULT_USER_AGENT);

        assert!(Grabber::from_json(r#"{"error_policy": "explode"}"#).is_err());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let grabber = Grabber::new().with_policy(ErrorPolicy::Abort);
        let json = serde_json::to_string(&grabber).unwrap();
        assert!(json.contains(r#""error_policy":"abort""#));
        assert_eq!(Grabber::from_json(&json).unwrap(), grabber);
    }

    #[test]
    fn test_invalid_url() {
        let err = Grabber::new().fetch("not a url").unwrap_err();
        assert!(matches!(err, GrabError::InvalidUrl { .. }));
    }
}
