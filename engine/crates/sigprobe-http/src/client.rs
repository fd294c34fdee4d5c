//! HTTP transport for probe requests

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Browser user agent sent with every probe unless overridden
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/70.0.3538.77 Safari/537.36";

/// HTTP client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Connection refused")]
    ConnectionRefused,

    #[error("Timeout after {0}s")]
    Timeout(u64),

    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

/// One outgoing probe request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub method: String,
    pub url: String,
    /// Applied in order; a later header replaces an earlier one of the same name
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// HTTP response wrapper
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Canonical header names with their first value, in transport order
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: String,
}

impl HttpResponse {
    /// Headers rendered as `Name: value` lines, each ending in a newline
    pub fn header_blob(&self) -> String {
        self.headers
            .iter()
            .map(|(name, value)| format!("{}: {}\n", name, value))
            .collect()
    }
}

/// Sends probe requests. `HttpClient` is the network implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ProbeRequest) -> Result<HttpResponse, ClientError>;
}

/// Client settings shared by every request of a run
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub accept_invalid_certs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_invalid_certs: true,
        }
    }
}

impl ClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

/// reqwest-backed transport
pub struct HttpClient {
    client: Client,
    timeout_seconds: u64,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            client,
            timeout_seconds: config.timeout.as_secs(),
        })
    }

    fn classify(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.timeout_seconds)
        } else if err.is_connect() {
            ClientError::ConnectionRefused
        } else {
            ClientError::Request(err)
        }
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn send(&self, request: ProbeRequest) -> Result<HttpResponse, ClientError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| ClientError::InvalidMethod(request.method.clone()))?;
        let url = Url::parse(&request.url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", request.url, e)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ClientError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| ClientError::InvalidHeader(format!("{}: {}", name, value)))?;
            headers.insert(header_name, header_value);
        }

        debug!("{} {}", method, url);

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();

        let headers = response
            .headers()
            .keys()
            .filter_map(|name| {
                response.headers().get(name).map(|value| {
                    (
                        canonical_header_name(name.as_str()),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
            })
            .collect();

        let body = response.text().await.map_err(|e| self.classify(e))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Canonical MIME form of a header name: `x-powered-by` -> `X-Powered-By`
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
