//! Executing `HttpRequest`s.
//!
//! `Transport` is the seam between the pure request builders and the
//! network. `UreqTransport` runs a blocking `ureq` agent on tokio's blocking
//! pool so the awaiting task never blocks. HTTP status codes are not treated
//! as errors: feature services report failures inside the body, and the
//! normalizer decides from there.

use std::future::Future;

use tracing::debug;

use crate::http::{Exchange, HttpMethod, HttpRequest, HttpResponse, FORM_CONTENT_TYPE};

/// Executes one request and reports what happened.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> impl Future<Output = Exchange> + Send;
}

/// Response bodies are read in full unless a limit is set with
/// `UreqTransport::with_body_limit`.
pub const UNLIMITED_BODY: u64 = u64::MAX;

/// `Transport` backed by a shared `ureq::Agent`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self::with_agent(agent)
    }

    /// Use a preconfigured agent, e.g. one with timeouts or a proxy.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self {
            agent,
            body_limit: UNLIMITED_BODY,
        }
    }

    /// Cap the number of body bytes read per response. A larger body fails
    /// the exchange with a transport error.
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> Exchange {
        let agent = self.agent.clone();
        let body_limit = self.body_limit;
        match tokio::task::spawn_blocking(move || send(&agent, request, body_limit)).await {
            Ok(exchange) => exchange,
            Err(e) => Exchange::failed(format!("request task failed: {e}")),
        }
    }
}

fn send(agent: &ureq::Agent, request: HttpRequest, body_limit: u64) -> Exchange {
    let result = match (request.method, request.body) {
        (HttpMethod::Get, _) => agent.get(&request.url).call(),
        (HttpMethod::Post, Some(body)) => agent
            .post(&request.url)
            .content_type(FORM_CONTENT_TYPE)
            .send(body.as_bytes()),
        (HttpMethod::Post, None) => agent.post(&request.url).send_empty(),
    };

    let mut response = match result {
        Ok(response) => response,
        Err(e) => {
            debug!(url = %request.url, error = %e, "transport error");
            return Exchange::failed(e.to_string());
        }
    };

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();

    match response
        .body_mut()
        .with_config()
        .limit(body_limit)
        .read_to_string()
    {
        Ok(body) => {
            debug!(url = %request.url, status, "response received");
            Exchange::completed(HttpResponse {
                status,
                headers,
                body,
            })
        }
        Err(e) => Exchange::failed(e.to_string()),
    }
}
