//! Severity levels for probes

use serde::{Deserialize, Serialize};

/// Severity level attached to a probe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, or a tag we don't recognise
    #[default]
    Info,
    /// Low severity, minimal risk
    Low,
    /// Medium severity, moderate risk
    Medium,
    /// High severity, significant risk
    High,
    /// Critical severity, immediate action required
    Critical,
}

impl Severity {
    /// Map a probe's severity tag to a level.
    ///
    /// Probe files carry either a severity name or a display color
    /// (`red`, `yellow`/`brown`, `blue`). Matching is case-insensitive.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" | "red" => Severity::High,
            "medium" | "yellow" | "brown" => Severity::Medium,
            "low" | "blue" => Severity::Low,
            _ => Severity::Info,
        }
    }

    /// Get display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_to_severity() {
        assert_eq!(Severity::from_tag("critical"), Severity::Critical);
        assert_eq!(Severity::from_tag("RED"), Severity::High);
        assert_eq!(Severity::from_tag("yellow"), Severity::Medium);
        assert_eq!(Severity::from_tag("brown"), Severity::Medium);
        assert_eq!(Severity::from_tag(" blue "), Severity::Low);
        assert_eq!(Severity::from_tag("purple"), Severity::Info);
        assert_eq!(Severity::from_tag(""), Severity::Info);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);
    }
}
