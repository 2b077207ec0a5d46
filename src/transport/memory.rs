//! In-memory transport for testing and offline use
//!
//! Routes `(method, url)` pairs to scripted outcomes and records every
//! request it receives. Unrouted requests fail with a 404.

use super::Transport;
use crate::error::TransportError;
use crate::types::{HttpRequest, HttpResponse, Method};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

type Outcome = std::result::Result<HttpResponse, TransportError>;

/// Scripted transport
#[derive(Default)]
pub struct MemoryTransport {
    routes: RwLock<HashMap<(Method, String), Outcome>>,
    requests: RwLock<Vec<HttpRequest>>,
    latency: Option<Duration>,
}

impl MemoryTransport {
    /// Create a transport with no routes
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every answer by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer `method url` with a 200 carrying `data`
    pub fn respond(&self, method: Method, url: impl Into<String>, data: serde_json::Value) {
        self.route(method, url.into(), Ok(HttpResponse::ok(data)));
    }

    /// Answer `method url` with an explicit status; non-2xx becomes a failure
    pub fn respond_with_status(
        &self,
        method: Method,
        url: impl Into<String>,
        status: u16,
        data: serde_json::Value,
    ) {
        let outcome = if (200..300).contains(&status) {
            Ok(HttpResponse { status, data })
        } else {
            Err(TransportError::Status { status, body: data })
        };
        self.route(method, url.into(), outcome);
    }

    /// Fail `method url` with `error`
    pub fn fail(&self, method: Method, url: impl Into<String>, error: TransportError) {
        self.route(method, url.into(), Err(error));
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn route(&self, method: Method, url: String, outcome: Outcome) {
        self.routes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert((method, url), outcome);
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, request: HttpRequest) -> Outcome {
        let key = (request.method, request.url.clone());
        self.requests
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let outcome = self
            .routes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned();

        outcome.unwrap_or_else(|| {
            Err(TransportError::Status {
                status: 404,
                body: serde_json::json!({"error": format!("no route for {} {}", key.0, key.1)}),
            })
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}
