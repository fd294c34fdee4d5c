//! SigProbe Scanner - HTTP signature probe scanner
//!
//! Runs every probe from a provider file against every host in a domain list
//! and prints the pairs that look vulnerable.

use anyhow::{Context, Result};
use clap::Parser;
use sigprobe_common::{init_logging, Config, LogConfig, OutputFormat};
use sigprobe_core::Probe;
use sigprobe_engine::{Dispatcher, ReportSender, Reporter};
use sigprobe_http::{ClientConfig, HttpClient, ProbeRunner};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const DEFAULT_CONFIG_PATH: &str = "sigprobe.toml";

const BANNER: &str = r#"
     _       ____            _
 ___(_) __ _|  _ \ _ __ ___ | |__   ___
/ __| |/ _` | |_) | '__/ _ \| '_ \ / _ \
\__ \ | (_| |  __/| | | (_) | |_) |  __/
|___/_|\__, |_|   |_|  \___/|_.__/ \___|
       |___/
"#;

/// SigProbe HTTP signature scanner
#[derive(Parser, Debug)]
#[command(name = "sigprobe")]
#[command(version)]
#[command(about = "Checks hosts against HTTP vulnerability probes", long_about = None)]
struct Args {
    /// Number of concurrent workers
    #[arg(short = 't', long = "threads")]
    threads: Option<usize>,

    /// Probe definition file or directory
    #[arg(long)]
    provider: Option<String>,

    /// Host list, one domain per line
    #[arg(short = 'd', long)]
    domains: Option<String>,

    /// Print transport errors
    #[arg(short, long)]
    verbose: bool,

    /// Only print findings
    #[arg(long)]
    silent: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Use https instead of http
    #[arg(long)]
    https: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Report format (text, json)
    #[arg(long)]
    output: Option<OutputFormat>,

    /// User agent sent with every request
    #[arg(long)]
    user_agent: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (pretty, json, compact)
    #[arg(long)]
    log_format: Option<String>,
}

impl Args {
    /// Flags win over the file and environment
    fn apply(&self, mut config: Config) -> Config {
        if let Some(threads) = self.threads {
            config.scanner.workers = threads;
        }
        if let Some(provider) = &self.provider {
            config.scanner.probes = provider.clone();
        }
        if let Some(domains) = &self.domains {
            config.scanner.hosts = domains.clone();
        }
        if let Some(timeout) = self.timeout {
            config.scanner.timeout_seconds = timeout;
        }
        if let Some(user_agent) = &self.user_agent {
            config.scanner.user_agent = Some(user_agent.clone());
        }
        if self.https {
            config.scanner.https = true;
        }
        if self.verbose {
            config.output.verbose = true;
        }
        if self.silent {
            config.output.silent = true;
        }
        if let Some(format) = self.output {
            config.output.format = format;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
        config
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::from_file(DEFAULT_CONFIG_PATH)?,
        None => Config::default(),
    };

    let config = args.apply(config.merge_env());
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging(&LogConfig::from(&config.logging))?;

    info!("SigProbe starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let reporter = Reporter::stdout(&config.output);
    let result = run(&config, reporter.sender()).await;
    reporter.finish().await?;

    if let Err(e) = &result {
        if let Some(code) = error_code(e) {
            error!(code, "{:#}", e);
        }
    }
    result
}

/// Code of the SigProbe error behind `err`, if there is one
fn error_code(err: &anyhow::Error) -> Option<&'static str> {
    err.downcast_ref::<sigprobe_core::Error>()
        .map(sigprobe_core::Error::code)
}

async fn run(config: &Config, reports: ReportSender) -> Result<()> {
    reports.progress(BANNER).await;

    reports
        .progress(format!("Reading probes from {}", config.scanner.probes))
        .await;
    let probes: Vec<Arc<Probe>> = sigprobe_checks::load_probes(&config.scanner.probes)
        .context("failed to load probes")?
        .into_iter()
        .map(Arc::new)
        .collect();

    reports
        .progress(format!("Reading hosts from {}", config.scanner.hosts))
        .await;
    let hosts =
        sigprobe_checks::load_hosts(&config.scanner.hosts).context("failed to load hosts")?;

    let mut client_config = ClientConfig::default()
        .with_timeout(config.scanner.timeout())
        .with_accept_invalid_certs(config.tls.insecure_skip_verify);
    if let Some(user_agent) = &config.scanner.user_agent {
        client_config = client_config.with_user_agent(user_agent);
    }
    let client = HttpClient::new(&client_config)?;

    let runner = ProbeRunner::new(Arc::new(client), config.scanner.scheme());
    let dispatcher = Dispatcher::new(runner, config.scanner.workers, reports.clone())?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight work");
            trigger.cancel();
        }
    });

    reports
        .progress("Running probes against provided hosts ...")
        .await;
    let summary = dispatcher.run_with_cancel(&probes, &hosts, cancel).await;
    reports.summary(&summary).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_parse() {
        let args = Args::parse_from([
            "sigprobe",
            "-t",
            "50",
            "--provider",
            "probes/",
            "-d",
            "hosts.txt",
            "-v",
            "--https",
            "--output",
            "json",
        ]);

        assert_eq!(args.threads, Some(50));
        assert_eq!(args.provider.as_deref(), Some("probes/"));
        assert_eq!(args.domains.as_deref(), Some("hosts.txt"));
        assert!(args.verbose);
        assert!(!args.silent);
        assert!(args.https);
        assert_eq!(args.output, Some(OutputFormat::Json));
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from(["sigprobe", "--threads", "8", "--silent", "--timeout", "3"]);
        let config = args.apply(
            Config::builder()
                .workers(200)
                .timeout_seconds(10)
                .probes("provider.json")
                .build(),
        );

        assert_eq!(config.scanner.workers, 8);
        assert_eq!(config.scanner.timeout_seconds, 3);
        assert_eq!(config.scanner.probes, "provider.json");
        assert!(config.output.silent);
        assert!(!config.scanner.https);
    }

    #[test]
    fn test_error_code_through_context() {
        let err = Err::<(), _>(sigprobe_core::Error::NoProbes {
            path: "provider.json".to_string(),
        })
        .context("failed to load probes")
        .unwrap_err();
        assert_eq!(error_code(&err), Some("NO_PROBES"));

        assert_eq!(error_code(&anyhow::anyhow!("plain")), None);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let args = Args::parse_from(["sigprobe", "-t", "0"]);
        let config = args.apply(Config::default());
        assert!(config.validate().is_err());
    }
}
