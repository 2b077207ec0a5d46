//! reqwest-backed transport

use super::{decode_body, Transport};
use crate::config::HttpConfig;
use crate::error::{AjaxError, Result, TransportError};
use crate::types::{HttpRequest, HttpResponse, Method};
use async_trait::async_trait;
use std::time::Duration;

/// HTTP transport over a shared `reqwest::Client`
///
/// Relative URLs are resolved against `HttpConfig::base_url`; default
/// headers are applied unless the request sets the same header itself.
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpConfig,
}

impl HttpTransport {
    /// Build a transport from a validated config
    pub fn new(config: HttpConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let client = builder
            .build()
            .map_err(|e| AjaxError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the transport configuration
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Turn an `HttpRequest` into the `reqwest::Request` that `send` executes
    pub fn build_request(
        &self,
        request: &HttpRequest,
    ) -> std::result::Result<reqwest::Request, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        let url = self.config.resolve_url(&request.url);

        let mut builder = self.client.request(method, url.as_str());
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        for (key, value) in &self.config.default_headers {
            if request.header(key).is_none() {
                builder = builder.header(key.as_str(), value.as_str());
            }
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        builder.build().map_err(|e| TransportError::Request {
            message: format!("{} {}: {}", request.method, url, e),
        })
    }
}

fn network_error(e: reqwest::Error) -> TransportError {
    TransportError::Network {
        message: e.to_string(),
        timeout: e.is_timeout(),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let built = self.build_request(&request)?;

        let response = self.client.execute(built).await.map_err(network_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(network_error)?;
        let data = decode_body(&text);

        if !(200..300).contains(&status) {
            return Err(TransportError::Status { status, body: data });
        }

        Ok(HttpResponse { status, data })
    }

    fn name(&self) -> &str {
        "http"
    }
}
