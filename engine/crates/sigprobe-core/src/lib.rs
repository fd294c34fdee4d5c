//! SigProbe Core - Foundation types and error handling
//!
//! This crate provides the core abstractions used throughout SigProbe:
//! - `Probe`: A declarative HTTP vulnerability check
//! - `Host`, `Scheme`: What to probe and how to reach it
//! - `MatchResult`, `Verdict`: The outcome of one probe endpoint on one host
//! - `Severity`: Probe severity levels

pub mod error;
pub mod finding;
pub mod probe;
pub mod severity;
pub mod target;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use finding::{MatchResult, MatchedBy, Verdict, ALL_CONDITIONS_MATCHED, NOT_VULNERABLE};
pub use probe::{CheckLocation, Probe};
pub use severity::Severity;
pub use target::{Host, Scheme};
