//! SigProbe Vuln - Match evaluation for probe responses
//!
//! This crate decides, from a response body or header blob, whether a
//! probe's match expression holds. It is pure and has no I/O.

pub mod matcher;

pub use matcher::{evaluate, MatchExpression, MatchMode, ALL_OF_SEPARATOR, ANY_OF_SEPARATOR};
