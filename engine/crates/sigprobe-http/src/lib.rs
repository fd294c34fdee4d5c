//! SigProbe HTTP - Probe transport and execution
//!
//! - `client`: the `Transport` seam and its reqwest implementation
//! - `runner`: runs one probe against one host, endpoint by endpoint

pub mod client;
pub mod runner;

pub use client::{
    canonical_header_name, ClientConfig, ClientError, HttpClient, HttpResponse, ProbeRequest,
    Transport, DEFAULT_USER_AGENT,
};
pub use runner::{EndpointOutcome, ProbeRunner, TransportFailure};
