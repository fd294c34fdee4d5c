//! Configuration management for SigProbe
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `SIGPROBE_*` environment variables, then command-line flags.

use serde::{Deserialize, Serialize};
use sigprobe_core::{Error, Result, Scheme};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Scan settings
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Report settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// TLS settings
    #[serde(default)]
    pub tls: TlsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config: {}", e)))
    }

    /// Create a configuration builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Merge with environment variables (SIGPROBE_ prefix)
    pub fn merge_env(mut self) -> Self {
        // Scanner settings
        if let Ok(val) = std::env::var("SIGPROBE_THREADS") {
            if let Ok(n) = val.parse() {
                self.scanner.workers = n;
            }
        }
        if let Ok(val) = std::env::var("SIGPROBE_TIMEOUT") {
            if let Ok(n) = val.parse() {
                self.scanner.timeout_seconds = n;
            }
        }
        if let Ok(val) = std::env::var("SIGPROBE_HTTPS") {
            if let Ok(b) = val.parse() {
                self.scanner.https = b;
            }
        }
        if let Ok(val) = std::env::var("SIGPROBE_PROBES") {
            self.scanner.probes = val;
        }
        if let Ok(val) = std::env::var("SIGPROBE_HOSTS") {
            self.scanner.hosts = val;
        }
        if let Ok(val) = std::env::var("SIGPROBE_USER_AGENT") {
            self.scanner.user_agent = Some(val);
        }

        // Logging
        if let Ok(val) = std::env::var("SIGPROBE_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("SIGPROBE_LOG_FORMAT") {
            self.logging.format = val;
        }

        self
    }

    /// Reject values that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.scanner.workers == 0 {
            return Err(Error::InvalidConfig {
                key: String::from("scanner.workers"),
                message: String::from("must be at least 1"),
            });
        }
        if self.scanner.timeout_seconds == 0 {
            return Err(Error::InvalidConfig {
                key: String::from("scanner.timeout_seconds"),
                message: String::from("must be at least 1"),
            });
        }
        if self.scanner.probes.trim().is_empty() {
            return Err(Error::InvalidConfig {
                key: String::from("scanner.probes"),
                message: String::from("probe file path is empty"),
            });
        }
        if self.scanner.hosts.trim().is_empty() {
            return Err(Error::InvalidConfig {
                key: String::from("scanner.hosts"),
                message: String::from("host list path is empty"),
            });
        }
        Ok(())
    }
}

/// Scanner-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Use https instead of http for every host
    #[serde(default)]
    pub https: bool,

    /// User agent override
    pub user_agent: Option<String>,

    /// Probe definition file or directory
    #[serde(default = "default_probes")]
    pub probes: String,

    /// Host list, one per line
    #[serde(default = "default_hosts")]
    pub hosts: String,
}

fn default_workers() -> usize {
    200
}

fn default_timeout() -> u64 {
    10
}

fn default_probes() -> String {
    String::from("provider.json")
}

fn default_hosts() -> String {
    String::from("domains.txt")
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout_seconds: default_timeout(),
            https: false,
            user_agent: None,
            probes: default_probes(),
            hosts: default_hosts(),
        }
    }
}

impl ScannerConfig {
    pub fn scheme(&self) -> Scheme {
        Scheme::from_https_flag(self.https)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// How findings are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One human-readable line per finding
    #[default]
    Text,
    /// One JSON object per finding
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(Error::InvalidConfig {
                key: String::from("output.format"),
                message: format!("unknown format '{}', expected text or json", other),
            }),
        }
    }
}

/// Report configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Print transport errors
    #[serde(default)]
    pub verbose: bool,

    /// Print findings only
    #[serde(default)]
    pub silent: bool,

    #[serde(default)]
    pub format: OutputFormat,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    String::from("warn")
}

fn default_log_format() -> String {
    String::from("pretty")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// TLS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Skip server certificate verification. Targets routinely present
    /// self-signed or mismatched certificates, so this is on by default.
    #[serde(default = "default_true")]
    pub insecure_skip_verify: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            insecure_skip_verify: true,
        }
    }
}

/// Builder for constructing Config
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.scanner.workers = workers;
        self
    }

    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.scanner.timeout_seconds = seconds;
        self
    }

    pub fn https(mut self, https: bool) -> Self {
        self.config.scanner.https = https;
        self
    }

    pub fn probes(mut self, path: impl Into<String>) -> Self {
        self.config.scanner.probes = path.into();
        self
    }

    pub fn hosts(mut self, path: impl Into<String>) -> Self {
        self.config.scanner.hosts = path.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.scanner.user_agent = Some(user_agent.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.output.verbose = verbose;
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.config.output.silent = silent;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output.format = format;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
