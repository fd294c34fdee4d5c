//! Reporter - the single task that owns the output stream
//!
//! Workers hand outcomes to a `ReportSender`; only the reporter task writes,
//! so lines never interleave.

use crate::dispatcher::DispatchSummary;
use colored::Colorize;
use serde_json::json;
use sigprobe_common::{OutputConfig, OutputFormat};
use sigprobe_core::{Error, MatchResult, Result, Severity};
use sigprobe_http::{EndpointOutcome, TransportFailure};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

const REPORT_QUEUE_SIZE: usize = 1024;

/// Something the reporter may print
#[derive(Debug)]
pub enum ReportEvent {
    Outcome(EndpointOutcome),
    /// Banner and run milestones; dropped in silent mode
    Progress(String),
    Summary(DispatchSummary),
}

/// Cloneable handle for sending events to the reporter
#[derive(Clone)]
pub struct ReportSender {
    tx: mpsc::Sender<ReportEvent>,
}

impl ReportSender {
    pub(crate) fn from_channel(tx: mpsc::Sender<ReportEvent>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, event: ReportEvent) {
        if self.tx.send(event).await.is_err() {
            debug!("Reporter closed, event dropped");
        }
    }

    pub async fn outcome(&self, outcome: EndpointOutcome) {
        self.send(ReportEvent::Outcome(outcome)).await
    }

    pub async fn progress(&self, message: impl Into<String>) {
        self.send(ReportEvent::Progress(message.into())).await
    }

    pub async fn summary(&self, summary: &DispatchSummary) {
        self.send(ReportEvent::Summary(summary.clone())).await
    }
}

/// What the reporter wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportStats {
    pub lines_written: usize,
    pub findings_written: usize,
}

/// Destination of report lines
pub type ReportWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Running reporter task
pub struct Reporter {
    sender: ReportSender,
    handle: JoinHandle<std::io::Result<ReportStats>>,
}

impl Reporter {
    /// Spawn the writer task over `writer`
    pub fn spawn(options: &OutputConfig, writer: ReportWriter) -> Self {
        let (tx, rx) = mpsc::channel(REPORT_QUEUE_SIZE);
        let handle = tokio::spawn(write_loop(rx, options.clone(), writer));

        Self {
            sender: ReportSender::from_channel(tx),
            handle,
        }
    }

    /// Spawn the writer task over stdout
    pub fn stdout(options: &OutputConfig) -> Self {
        Self::spawn(options, Box::new(tokio::io::stdout()))
    }

    pub fn sender(&self) -> ReportSender {
        self.sender.clone()
    }

    /// Close this handle's sender and wait for the writer to drain.
    ///
    /// Returns once every other `ReportSender` clone is dropped too.
    pub async fn finish(self) -> Result<ReportStats> {
        drop(self.sender);
        match self.handle.await {
            Ok(written) => Ok(written?),
            Err(e) => Err(Error::WorkerFailed {
                worker: 0,
                message: format!("reporter: {}", e),
            }),
        }
    }
}

async fn write_loop(
    mut rx: mpsc::Receiver<ReportEvent>,
    options: OutputConfig,
    mut writer: ReportWriter,
) -> std::io::Result<ReportStats> {
    let mut stats = ReportStats::default();

    while let Some(event) = rx.recv().await {
        let Some(line) = render_event(&options, &event) else {
            continue;
        };

        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        stats.lines_written += 1;
        if matches!(&event, ReportEvent::Outcome(outcome) if outcome.is_vulnerable()) {
            stats.findings_written += 1;
        }
    }

    Ok(stats)
}

/// The line an event produces under `options`, if any.
///
/// Findings are always printed. Transport errors need `verbose`. Progress
/// and the summary are dropped when `silent`; in JSON output progress is
/// never printed.
pub fn render_event(options: &OutputConfig, event: &ReportEvent) -> Option<String> {
    match (event, options.format) {
        (ReportEvent::Outcome(EndpointOutcome::Checked(result)), format) => {
            if !result.is_vulnerable() {
                return None;
            }
            Some(match format {
                OutputFormat::Text => finding_line(result),
                OutputFormat::Json => finding_json(result),
            })
        }
        (ReportEvent::Outcome(EndpointOutcome::Failed(failure)), format) => {
            if !options.verbose {
                return None;
            }
            Some(match format {
                OutputFormat::Text => format!(
                    "Error: {} {} - {}",
                    failure.probe.method, failure.url, failure.message
                ),
                OutputFormat::Json => failure_json(failure),
            })
        }
        (ReportEvent::Progress(message), OutputFormat::Text) if !options.silent => {
            Some(message.clone())
        }
        (ReportEvent::Progress(_), _) => None,
        (ReportEvent::Summary(_), _) if options.silent => None,
        (ReportEvent::Summary(summary), OutputFormat::Text) => Some(summary.to_string()),
        (ReportEvent::Summary(summary), OutputFormat::Json) => Some(summary_json(summary)),
    }
}

fn finding_line(result: &MatchResult) -> String {
    let probe = &result.probe;
    let tag = if probe.severity_tag.is_empty() {
        String::new()
    } else {
        format!(" [{}]", probe.severity_tag)
    };

    format!(
        "Issue detected : {}{} Domain: {} response contains {} ; Endpoint: {} ; Method: {} ; Body: {}",
        paint(&probe.name, probe.severity()),
        tag,
        result.host,
        result.verdict.reason(),
        result.endpoint,
        probe.method,
        probe.body
    )
}

fn paint(text: &str, severity: Severity) -> String {
    match severity {
        Severity::Critical | Severity::High => text.red().bold().to_string(),
        Severity::Medium => text.yellow().to_string(),
        Severity::Low => text.blue().to_string(),
        Severity::Info => text.to_string(),
    }
}

fn finding_json(result: &MatchResult) -> String {
    let probe = &result.probe;
    json!({
        "type": "finding",
        "probe": probe.name,
        "severity": probe.severity(),
        "severity_tag": probe.severity_tag,
        "host": result.host,
        "url": result.url,
        "endpoint": result.endpoint,
        "method": probe.method,
        "body": probe.body,
        "check_in": probe.check_location,
        "matched": result.verdict.reason(),
        "detected_at": result.detected_at,
    })
    .to_string()
}

fn failure_json(failure: &TransportFailure) -> String {
    json!({
        "type": "error",
        "probe": failure.probe.name,
        "host": failure.host,
        "url": failure.url,
        "endpoint": failure.endpoint,
        "method": failure.probe.method,
        "message": failure.message,
    })
    .to_string()
}

fn summary_json(summary: &DispatchSummary) -> String {
    json!({
        "type": "summary",
        "items_total": summary.items_total,
        "items_processed": summary.items_processed,
        "items_skipped": summary.items_skipped,
        "endpoints_probed": summary.endpoints_probed,
        "findings": summary.findings,
        "transport_errors": summary.transport_failures.len(),
        "worker_failures": summary.worker_failures,
        "cancelled": summary.cancelled,
    })
    .to_string()
}
