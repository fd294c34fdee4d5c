//! Scan target definitions

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// URL scheme used for every request in a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    /// Pick the scheme from the `https` run flag
    pub fn from_https_flag(https: bool) -> Self {
        if https {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bare domain or address to probe.
///
/// The scheme is not part of the host; it is a run-wide setting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Host(String);

impl Host {
    /// Parse one line of a host list.
    ///
    /// Returns `Ok(None)` for blank lines. A leading `http://`/`https://`
    /// and trailing slashes are stripped; embedded whitespace is rejected.
    pub fn parse_line(line: &str, line_no: usize) -> Result<Option<Self>> {
        let mut s = line.trim();
        if s.is_empty() {
            return Ok(None);
        }

        for prefix in ["http://", "https://"] {
            if let Some(rest) = s.strip_prefix(prefix) {
                s = rest;
            }
        }
        let s = s.trim_end_matches('/');

        if s.is_empty() {
            return Err(Error::InvalidHost {
                line: line_no,
                message: format!("'{}' has no host part", line.trim()),
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(Error::InvalidHost {
                line: line_no,
                message: format!("'{}' contains whitespace", s),
            });
        }

        Ok(Some(Host(s.to_string())))
    }

    /// Create a host from an already-clean string
    pub fn new(host: impl Into<String>) -> Self {
        Host(host.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Origin of this host under `scheme`, e.g. `https://example.com/`
    pub fn origin(&self, scheme: Scheme) -> String {
        format!("{}://{}/", scheme, self.0)
    }

    /// Full URL of `endpoint` on this host: `<scheme>://<host><endpoint>`
    pub fn endpoint_url(&self, scheme: Scheme, endpoint: &str) -> String {
        format!("{}://{}{}", scheme, self.0, endpoint)
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
