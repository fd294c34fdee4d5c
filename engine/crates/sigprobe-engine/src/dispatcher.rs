//! Dispatcher - runs every work item on a fixed pool of workers
//!
//! Items travel as whole values over one bounded channel. Workers share the
//! receiving end, so each item is taken by exactly one worker. The producer
//! closes the channel after the last item; idle workers then see `None` and
//! exit.

use crate::report::ReportSender;
use crate::work::{work_item_count, work_items, WorkItem};
use sigprobe_core::{Error, Host, Probe, Result};
use sigprobe_http::{EndpointOutcome, ProbeRunner, TransportFailure};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Aggregate counts for one run
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    /// Items in the probe x host cross product
    pub items_total: usize,
    /// Items whose endpoints were all attempted
    pub items_processed: usize,
    /// Items never started or abandoned on cancellation
    pub items_skipped: usize,
    pub endpoints_probed: usize,
    /// Vulnerable endpoint results
    pub findings: usize,
    pub transport_failures: Vec<TransportFailure>,
    /// Workers that ended abnormally
    pub worker_failures: usize,
    pub cancelled: bool,
}

impl DispatchSummary {
    /// Every item was processed
    pub fn is_complete(&self) -> bool {
        self.items_processed == self.items_total
    }

    fn absorb(&mut self, stats: WorkerStats) {
        self.items_processed += stats.items_processed;
        self.endpoints_probed += stats.endpoints_probed;
        self.findings += stats.findings;
        self.transport_failures.extend(stats.transport_failures);
    }
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Completed: {}/{} checks, {} requests, {} issues, {} transport errors",
            self.items_processed,
            self.items_total,
            self.endpoints_probed,
            self.findings,
            self.transport_failures.len()
        )?;
        if self.items_skipped > 0 {
            write!(f, ", {} skipped", self.items_skipped)?;
        }
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct WorkerStats {
    items_processed: usize,
    endpoints_probed: usize,
    findings: usize,
    transport_failures: Vec<TransportFailure>,
}

/// Fixed-size worker pool over the probe x host cross product
pub struct Dispatcher {
    runner: ProbeRunner,
    workers: usize,
    reports: ReportSender,
}

impl Dispatcher {
    /// Create a dispatcher with `workers` concurrent workers. Zero is rejected.
    pub fn new(runner: ProbeRunner, workers: usize, reports: ReportSender) -> Result<Self> {
        if workers == 0 {
            return Err(Error::InvalidConfig {
                key: String::from("scanner.workers"),
                message: String::from("worker count must be at least 1"),
            });
        }

        Ok(Self {
            runner,
            workers,
            reports,
        })
    }

    /// Process every (probe, host) pair and wait for all workers to exit
    pub async fn run(&self, probes: &[Arc<Probe>], hosts: &[Host]) -> DispatchSummary {
        self.run_with_cancel(probes, hosts, CancellationToken::new())
            .await
    }

    /// Like `run`, stopping early once `cancel` fires.
    ///
    /// Cancellation is checked when a worker takes its next item and while a
    /// request is in flight. Items not finished are counted as skipped.
    pub async fn run_with_cancel(
        &self,
        probes: &[Arc<Probe>],
        hosts: &[Host],
        cancel: CancellationToken,
    ) -> DispatchSummary {
        let items_total = work_item_count(probes, hosts);
        info!(
            "Dispatching {} checks ({} probes x {} hosts) on {} workers",
            items_total,
            probes.len(),
            hosts.len(),
            self.workers
        );

        let (tx, rx) = mpsc::channel::<WorkItem>(self.workers);
        let rx = Arc::new(Mutex::new(rx));

        let mut pool = JoinSet::new();
        for worker_id in 0..self.workers {
            pool.spawn(worker_loop(
                worker_id,
                Arc::clone(&rx),
                self.runner.clone(),
                self.reports.clone(),
                cancel.clone(),
            ));
        }
        drop(rx);

        for item in work_items(probes, hosts) {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Cancelled while queueing work");
                    break;
                }
                sent = tx.send(item) => {
                    if sent.is_err() {
                        error!("All workers exited before the queue was drained");
                        break;
                    }
                }
            }
        }
        drop(tx);

        let mut summary = DispatchSummary {
            items_total,
            ..Default::default()
        };

        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(stats) => summary.absorb(stats),
                Err(e) => {
                    let failure = Error::WorkerFailed {
                        worker: summary.worker_failures,
                        message: e.to_string(),
                    };
                    error!("{}", failure);
                    summary.worker_failures += 1;
                }
            }
        }

        summary.items_skipped = items_total - summary.items_processed;
        summary.cancelled = cancel.is_cancelled();

        info!("{}", summary);
        summary
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    runner: ProbeRunner,
    reports: ReportSender,
    cancel: CancellationToken,
) -> WorkerStats {
    let mut stats = WorkerStats::default();

    loop {
        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = rx.recv() => item,
            }
        };
        let Some(item) = next else {
            break;
        };

        let outcomes = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcomes = runner.run(&item.host, &item.probe) => outcomes,
        };

        for outcome in outcomes {
            stats.endpoints_probed += 1;
            match &outcome {
                EndpointOutcome::Checked(result) if result.is_vulnerable() => stats.findings += 1,
                EndpointOutcome::Failed(failure) => stats.transport_failures.push(failure.clone()),
                EndpointOutcome::Checked(_) => {}
            }
            reports.outcome(outcome).await;
        }
        stats.items_processed += 1;
    }

    debug!("Worker {} done after {} items", worker_id, stats.items_processed);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Reporter;
    use async_trait::async_trait;
    use sigprobe_common::OutputConfig;
    use sigprobe_core::{CheckLocation, Scheme};
    use sigprobe_http::{ClientError, HttpResponse, ProbeRequest, Transport};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts requests per URL; `/down` endpoints fail
    #[derive(Default)]
    struct CountingTransport {
        hits: std::sync::Mutex<HashMap<String, usize>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        delay: Option<Duration>,
    }

    impl CountingTransport {
        fn with_delay(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Default::default()
            }
        }

        fn total(&self) -> usize {
            self.hits.lock().unwrap().values().sum()
        }
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn send(&self, request: ProbeRequest) -> std::result::Result<HttpResponse, ClientError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            *self.hits.lock().unwrap().entry(request.url.clone()).or_default() += 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if request.url.ends_with("/down") {
                return Err(ClientError::ConnectionRefused);
            }
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: format!("served {}", request.url),
            })
        }
    }

    fn probe(name: &str, endpoints: &[&str], expression: &str) -> Arc<Probe> {
        Arc::new(Probe {
            name: name.to_string(),
            severity_tag: "red".to_string(),
            method: "GET".to_string(),
            body: String::new(),
            endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
            headers: Vec::new(),
            check_location: CheckLocation::ResponseBody,
            match_expression: expression.to_string(),
        })
    }

    fn hosts(n: usize) -> Vec<Host> {
        (0..n).map(|i| Host::new(format!("host{}.test", i))).collect()
    }

    fn quiet_reporter() -> Reporter {
        let options = OutputConfig {
            silent: true,
            ..Default::default()
        };
        Reporter::spawn(&options, Box::new(tokio::io::sink()))
    }

    async fn dispatch(
        transport: Arc<CountingTransport>,
        workers: usize,
        probes: &[Arc<Probe>],
        hosts: &[Host],
    ) -> DispatchSummary {
        let reporter = quiet_reporter();
        let dispatcher = Dispatcher::new(
            ProbeRunner::new(transport, Scheme::Http),
            workers,
            reporter.sender(),
        )
        .unwrap();
        let summary = dispatcher.run(probes, hosts).await;
        drop(dispatcher);
        reporter.finish().await.unwrap();
        summary
    }

    #[test]
    fn test_zero_workers_rejected() {
        let reporter_tx = {
            let (tx, _rx) = mpsc::channel(1);
            ReportSender::from_channel(tx)
        };
        let runner = ProbeRunner::new(Arc::new(CountingTransport::default()), Scheme::Http);

        assert!(matches!(
            Dispatcher::new(runner, 0, reporter_tx),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_every_pair_processed_for_various_worker_counts() {
        let probes = vec![
            probe("p0", &["/a"], "nothing"),
            probe("p1", &["/b", "/c"], "nothing"),
            probe("p2", &["/d"], "nothing"),
        ];
        let hosts = hosts(7);

        for workers in [1, 2, 5, 21, 200] {
            let transport = Arc::new(CountingTransport::default());
            let summary = dispatch(Arc::clone(&transport), workers, &probes, &hosts).await;

            assert_eq!(summary.items_total, 21);
            assert_eq!(summary.items_processed, 21, "workers = {}", workers);
            assert_eq!(summary.items_skipped, 0);
            assert!(summary.is_complete());
            assert_eq!(summary.endpoints_probed, 28);
            assert_eq!(transport.total(), 28);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_each_pair_delivered_exactly_once() {
        let probes: Vec<_> = (0..4)
            .map(|i| probe(&format!("p{}", i), &[format!("/probe{}", i).as_str()], "nothing"))
            .collect();
        let hosts = hosts(25);
        let transport = Arc::new(CountingTransport::with_delay(Duration::from_millis(2)));

        let summary = dispatch(Arc::clone(&transport), 16, &probes, &hosts).await;
        assert_eq!(summary.items_processed, 100);

        let hits = transport.hits.lock().unwrap();
        assert_eq!(hits.len(), 100);
        for (p, h) in (0..4).flat_map(|p| (0..25).map(move |h| (p, h))) {
            let url = format!("http://host{}.test/probe{}", h, p);
            assert_eq!(hits.get(&url), Some(&1), "{}", url);
        }
        assert!(transport.peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_more_workers_than_items() {
        let probes = vec![probe("only", &["/x"], "nothing")];
        let hosts = hosts(2);
        let transport = Arc::new(CountingTransport::default());

        let summary = dispatch(Arc::clone(&transport), 50, &probes, &hosts).await;
        assert_eq!(summary.items_processed, 2);
        assert_eq!(summary.worker_failures, 0);
        assert_eq!(transport.total(), 2);
    }

    #[tokio::test]
    async fn test_empty_host_list_finishes() {
        let probes = vec![probe("only", &["/x"], "nothing")];
        let summary = dispatch(Arc::new(CountingTransport::default()), 4, &probes, &[]).await;

        assert_eq!(summary.items_total, 0);
        assert!(summary.is_complete());
    }

    #[tokio::test]
    async fn test_transport_failures_do_not_stop_the_run() {
        let probes = vec![probe("flaky", &["/down", "/up"], "served")];
        let hosts = hosts(3);
        let transport = Arc::new(CountingTransport::default());

        let summary = dispatch(Arc::clone(&transport), 2, &probes, &hosts).await;
        assert_eq!(summary.items_processed, 3);
        assert_eq!(summary.endpoints_probed, 6);
        assert_eq!(summary.transport_failures.len(), 3);
        assert_eq!(summary.findings, 3);
        assert!(summary
            .transport_failures
            .iter()
            .all(|f| f.endpoint == "/down"));
    }

    #[tokio::test]
    async fn test_cancelled_run_skips_remaining_items() {
        let probes = vec![probe("slow", &["/x"], "nothing")];
        let hosts = hosts(50);
        let transport = Arc::new(CountingTransport::with_delay(Duration::from_millis(20)));

        let reporter = quiet_reporter();
        let dispatcher = Dispatcher::new(
            ProbeRunner::new(transport, Scheme::Http),
            2,
            reporter.sender(),
        )
        .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let summary = dispatcher.run_with_cancel(&probes, &hosts, cancel).await;
        assert!(summary.cancelled);
        assert!(summary.items_processed < 50);
        assert_eq!(summary.items_processed + summary.items_skipped, 50);
    }
}
