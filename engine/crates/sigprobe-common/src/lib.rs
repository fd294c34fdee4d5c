//! SigProbe Common - Shared utilities: logging and configuration
//!
//! This crate provides common functionality used across all SigProbe crates.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigBuilder, OutputConfig, OutputFormat, ScannerConfig};
pub use logging::{init_logging, LogConfig, LogFormat};
