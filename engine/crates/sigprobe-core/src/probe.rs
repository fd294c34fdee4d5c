//! Probe definitions - declarative HTTP vulnerability checks

use crate::error::{Error, Result};
use crate::severity::Severity;
use serde::{Deserialize, Serialize};

/// Where in the response a probe looks for its match tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum CheckLocation {
    /// Response body text
    #[serde(rename = "responseBody")]
    ResponseBody,
    /// Response headers, one `Name: value` line each
    #[serde(rename = "responseHeaders")]
    ResponseHeaders,
}

impl CheckLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckLocation::ResponseBody => "responseBody",
            CheckLocation::ResponseHeaders => "responseHeaders",
        }
    }
}

impl TryFrom<String> for CheckLocation {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "responsebody" | "body" => Ok(CheckLocation::ResponseBody),
            "responseheaders" | "responseheader" | "headers" | "header" => {
                Ok(CheckLocation::ResponseHeaders)
            }
            other => Err(format!(
                "unknown check location '{}', expected responseBody or responseHeaders",
                other
            )),
        }
    }
}

impl std::fmt::Display for CheckLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single vulnerability probe.
///
/// Field names on disk follow the provider file format: `vulnerability`,
/// `color`, `endpoint`, `checkIn` and `checkFor`. The friendlier names
/// (`name`, `severity`, `endpoints`, `match`) are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    /// Human-readable name of the issue
    #[serde(rename = "vulnerability", alias = "name")]
    pub name: String,

    /// Severity tag, printed verbatim in reports
    #[serde(rename = "color", alias = "severity", default)]
    pub severity_tag: String,

    /// HTTP method
    #[serde(default = "default_method")]
    pub method: String,

    /// Request payload, may be empty
    #[serde(default)]
    pub body: String,

    /// Paths checked independently, in order
    #[serde(rename = "endpoint", alias = "endpoints")]
    pub endpoints: Vec<String>,

    /// Extra request headers as `[name, value]` pairs
    #[serde(default)]
    pub headers: Vec<(String, String)>,

    #[serde(rename = "checkIn", alias = "check_in")]
    pub check_location: CheckLocation,

    /// Match tokens joined by `&&&&` (all-of) or `||||` (any-of)
    #[serde(rename = "checkFor", alias = "match")]
    pub match_expression: String,
}

fn default_method() -> String {
    String::from("GET")
}

impl Probe {
    /// Severity level derived from the tag
    pub fn severity(&self) -> Severity {
        Severity::from_tag(&self.severity_tag)
    }

    /// Reject probes that could never produce a well-formed request
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(self.invalid("no endpoints declared"));
        }

        if !is_token(&self.method) {
            return Err(self.invalid(format!("invalid HTTP method '{}'", self.method)));
        }

        for (name, _) in &self.headers {
            if !is_token(name) {
                return Err(self.invalid(format!("invalid header name '{}'", name)));
            }
        }

        Ok(())
    }

    fn invalid(&self, message: impl Into<String>) -> Error {
        Error::InvalidProbe {
            name: self.name.clone(),
            message: message.into(),
        }
    }
}

/// RFC 7230 `token`: methods and header names
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^'
                        | b'_' | b'`' | b'|' | b'~'
                )
        })
}
