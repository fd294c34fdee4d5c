//! Probe runner - checks one probe against one host
//!
//! Endpoints are requested one after another in declaration order. A failed
//! request becomes a `Failed` outcome and the next endpoint is still tried.

use crate::client::{ProbeRequest, Transport};
use sigprobe_core::{CheckLocation, Host, MatchResult, Probe, Scheme};
use sigprobe_vuln::MatchExpression;
use std::sync::Arc;
use tracing::{debug, warn};

/// A request that never produced a response
#[derive(Debug, Clone)]
pub struct TransportFailure {
    pub url: String,
    pub endpoint: String,
    pub host: Host,
    pub probe: Arc<Probe>,
    pub message: String,
}

/// Result of one endpoint
#[derive(Debug, Clone)]
pub enum EndpointOutcome {
    Checked(MatchResult),
    Failed(TransportFailure),
}

impl EndpointOutcome {
    pub fn is_vulnerable(&self) -> bool {
        matches!(self, EndpointOutcome::Checked(result) if result.is_vulnerable())
    }
}

/// Issues a probe's requests and evaluates its match expression
#[derive(Clone)]
pub struct ProbeRunner {
    transport: Arc<dyn Transport>,
    scheme: Scheme,
}

impl ProbeRunner {
    pub fn new(transport: Arc<dyn Transport>, scheme: Scheme) -> Self {
        Self { transport, scheme }
    }

    /// Run every endpoint of `probe` against `host`, one outcome per endpoint
    pub async fn run(&self, host: &Host, probe: &Arc<Probe>) -> Vec<EndpointOutcome> {
        let expression = MatchExpression::parse(&probe.match_expression);
        let mut outcomes = Vec::with_capacity(probe.endpoints.len());

        for endpoint in &probe.endpoints {
            let url = host.endpoint_url(self.scheme, endpoint);
            let request = self.build_request(host, probe, &url);

            let response = match self.transport.send(request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("{} {} failed: {}", probe.method, url, e);
                    outcomes.push(EndpointOutcome::Failed(TransportFailure {
                        url,
                        endpoint: endpoint.clone(),
                        host: host.clone(),
                        probe: Arc::clone(probe),
                        message: e.to_string(),
                    }));
                    continue;
                }
            };

            let verdict = match probe.check_location {
                CheckLocation::ResponseBody => expression.evaluate(&response.body),
                CheckLocation::ResponseHeaders => expression.evaluate(&response.header_blob()),
            };
            debug!(
                "{} on {}{}: {} ({})",
                probe.name,
                host,
                endpoint,
                verdict.reason(),
                response.status
            );

            outcomes.push(EndpointOutcome::Checked(MatchResult::new(
                verdict,
                url,
                endpoint.clone(),
                host.clone(),
                Arc::clone(probe),
            )));
        }

        outcomes
    }

    fn build_request(&self, host: &Host, probe: &Probe, url: &str) -> ProbeRequest {
        let mut headers = Vec::with_capacity(probe.headers.len() + 1);
        headers.push(("Referer".to_string(), host.origin(self.scheme)));
        headers.extend(probe.headers.iter().cloned());

        ProbeRequest {
            method: probe.method.clone(),
            url: url.to_string(),
            headers,
            body: (!probe.body.is_empty()).then(|| probe.body.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, HttpResponse};
    use async_trait::async_trait;
    use sigprobe_core::{MatchedBy, Verdict};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers from a fixed table keyed by URL; unknown URLs are refused
    #[derive(Default)]
    struct ScriptedTransport {
        responses: HashMap<String, HttpResponse>,
        sent: Mutex<Vec<ProbeRequest>>,
    }

    impl ScriptedTransport {
        fn with_response(mut self, url: &str, headers: &[(&str, &str)], body: &str) -> Self {
            self.responses.insert(
                url.to_string(),
                HttpResponse {
                    status: 200,
                    headers: headers
                        .iter()
                        .map(|(n, v)| (n.to_string(), v.to_string()))
                        .collect(),
                    body: body.to_string(),
                },
            );
            self
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: ProbeRequest) -> Result<HttpResponse, ClientError> {
            self.sent.lock().unwrap().push(request.clone());
            self.responses
                .get(&request.url)
                .cloned()
                .ok_or(ClientError::ConnectionRefused)
        }
    }

    fn probe(endpoints: &[&str], location: CheckLocation, expression: &str) -> Arc<Probe> {
        Arc::new(Probe {
            name: "Test probe".to_string(),
            severity_tag: "red".to_string(),
            method: "GET".to_string(),
            body: String::new(),
            endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
            headers: Vec::new(),
            check_location: location,
            match_expression: expression.to_string(),
        })
    }

    fn runner(transport: Arc<ScriptedTransport>, scheme: Scheme) -> ProbeRunner {
        ProbeRunner::new(transport, scheme)
    }

    #[tokio::test]
    async fn test_body_match_reports_token() {
        let transport = Arc::new(ScriptedTransport::default().with_response(
            "http://example.com/.git/config",
            &[],
            "[core]\n\trepositoryformatversion = 0",
        ));
        let probe = probe(&["/.git/config"], CheckLocation::ResponseBody, "[core]");

        let outcomes = runner(transport, Scheme::Http)
            .run(&Host::new("example.com"), &probe)
            .await;

        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            EndpointOutcome::Checked(result) => {
                assert_eq!(result.verdict, Verdict::vulnerable_token("[core]"));
                assert_eq!(result.url, "http://example.com/.git/config");
                assert_eq!(result.endpoint, "/.git/config");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_header_match_uses_header_blob() {
        let transport = Arc::new(ScriptedTransport::default().with_response(
            "https://example.com/",
            &[("Server", "Apache"), ("Date", "Mon, 01 Jan 2024 00:00:00 GMT")],
            "Server: nginx in the body",
        ));
        let probe = probe(
            &["/"],
            CheckLocation::ResponseHeaders,
            "X-Powered-By: PHP||||Server: Apache",
        );

        let outcomes = runner(transport, Scheme::Https)
            .run(&Host::new("example.com"), &probe)
            .await;

        match &outcomes[0] {
            EndpointOutcome::Checked(result) => assert_eq!(
                result.verdict.matched(),
                Some(&MatchedBy::Token("Server: Apache".to_string()))
            ),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_endpoints_in_order_and_failures_continue() {
        let transport = Arc::new(
            ScriptedTransport::default()
                .with_response("http://example.com/a", &[], "Welcome guest")
                .with_response("http://example.com/c", &[], "Welcome admin panel v2"),
        );
        let probe = probe(&["/a", "/b", "/c"], CheckLocation::ResponseBody, "admin&&&&panel");

        let outcomes = runner(Arc::clone(&transport), Scheme::Http)
            .run(&Host::new("example.com"), &probe)
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(matches!(&outcomes[0], EndpointOutcome::Checked(r) if !r.is_vulnerable()));
        assert!(matches!(&outcomes[1], EndpointOutcome::Failed(f) if f.endpoint == "/b"));
        assert!(outcomes[2].is_vulnerable());

        let urls: Vec<_> = transport
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect();
        assert_eq!(
            urls,
            vec![
                "http://example.com/a",
                "http://example.com/b",
                "http://example.com/c"
            ]
        );
    }

    #[tokio::test]
    async fn test_request_shape() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut with_body = (*probe(&["/login"], CheckLocation::ResponseBody, "x")).clone();
        with_body.method = "POST".to_string();
        with_body.body = "user=admin".to_string();
        with_body.headers = vec![("X-Forwarded-For".to_string(), "127.0.0.1".to_string())];

        let runner = runner(Arc::clone(&transport), Scheme::Https);
        runner
            .run(&Host::new("example.com"), &Arc::new(with_body))
            .await;
        runner
            .run(
                &Host::new("example.com"),
                &probe(&["/"], CheckLocation::ResponseBody, "x"),
            )
            .await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].method, "POST");
        assert_eq!(sent[0].body.as_deref(), Some("user=admin"));
        assert_eq!(
            sent[0].headers,
            vec![
                ("Referer".to_string(), "https://example.com/".to_string()),
                ("X-Forwarded-For".to_string(), "127.0.0.1".to_string()),
            ]
        );
        assert_eq!(sent[1].body, None);
    }
}
