//! Match results - the outcome of checking one probe endpoint on one host

use crate::probe::Probe;
use crate::target::Host;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reason reported when every all-of token was found
pub const ALL_CONDITIONS_MATCHED: &str = "all conditions matched";

/// Reason reported for a negative verdict
pub const NOT_VULNERABLE: &str = "not vulnerable";

/// What made a probe fire
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MatchedBy {
    /// First any-of token found in the response
    Token(String),
    /// Every all-of token was found
    AllConditions,
}

impl std::fmt::Display for MatchedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchedBy::Token(token) => write!(f, "{}", token),
            MatchedBy::AllConditions => write!(f, "{}", ALL_CONDITIONS_MATCHED),
        }
    }
}

/// Outcome of evaluating a match expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Vulnerable { matched: MatchedBy },
    NotVulnerable,
}

impl Verdict {
    pub fn vulnerable_token(token: impl Into<String>) -> Self {
        Verdict::Vulnerable {
            matched: MatchedBy::Token(token.into()),
        }
    }

    pub fn all_conditions() -> Self {
        Verdict::Vulnerable {
            matched: MatchedBy::AllConditions,
        }
    }

    pub fn is_vulnerable(&self) -> bool {
        matches!(self, Verdict::Vulnerable { .. })
    }

    pub fn matched(&self) -> Option<&MatchedBy> {
        match self {
            Verdict::Vulnerable { matched } => Some(matched),
            Verdict::NotVulnerable => None,
        }
    }

    /// Matched token, the all-conditions reason, or "not vulnerable"
    pub fn reason(&self) -> String {
        match self {
            Verdict::Vulnerable { matched } => matched.to_string(),
            Verdict::NotVulnerable => NOT_VULNERABLE.to_string(),
        }
    }
}

/// Result of checking one endpoint of one probe against one host.
///
/// Produced per request and handed straight to the reporter; never stored.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub verdict: Verdict,
    /// Full request URL
    pub url: String,
    /// Endpoint path as declared on the probe
    pub endpoint: String,
    pub host: Host,
    pub probe: Arc<Probe>,
    pub detected_at: DateTime<Utc>,
}

impl MatchResult {
    pub fn new(
        verdict: Verdict,
        url: impl Into<String>,
        endpoint: impl Into<String>,
        host: Host,
        probe: Arc<Probe>,
    ) -> Self {
        Self {
            verdict,
            url: url.into(),
            endpoint: endpoint.into(),
            host,
            probe,
            detected_at: Utc::now(),
        }
    }

    pub fn is_vulnerable(&self) -> bool {
        self.verdict.is_vulnerable()
    }
}
