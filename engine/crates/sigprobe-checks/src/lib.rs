//! SigProbe Checks - Probe definition and host list loading
//!
//! This crate provides:
//! - `load_probes`: JSON/YAML probe files, or a directory of them
//! - `load_hosts`: newline-separated host lists

pub mod loader;

pub use loader::{load_hosts, load_probes};
