//! Request runner — issues HTTP calls and announces their lifecycle
//!
//! Every request is tagged with a caller-chosen context string. The runner
//! publishes `loading` when the request starts and exactly one of
//! `success` or `error` before the returned future resolves.
//!
//! Transport failures are announcements, not exceptions: the pending
//! future resolves with `None` and the failure detail is carried by the
//! `error` event. Code that needs to react to a failure subscribes to the
//! bus. The only error raised to the caller is an invalid context, which
//! is reported before anything is sent or broadcast.

use crate::coerce::coerce;
use crate::error::{AjaxError, Result, TransportError};
use crate::status::StatusBus;
use crate::transport::Transport;
use crate::types::{scalar_text, HttpRequest, Method, RequestConfig};
use futures::future::{self, BoxFuture};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Content type of `post` bodies
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A request in flight
///
/// Resolves with the coerced response body, or `None` if the transport
/// failed (see the `error` event on the bus for why).
pub type PendingResponse = BoxFuture<'static, Option<Value>>;

/// Issues requests over a `Transport` and reports them on a `StatusBus`
///
/// Cheap to clone; clones share the transport and the bus.
#[derive(Clone)]
pub struct RequestRunner {
    transport: Arc<dyn Transport>,
    bus: StatusBus,
}

impl RequestRunner {
    /// Create a runner publishing to `bus`
    pub fn new(transport: impl Transport + 'static, bus: StatusBus) -> Self {
        Self {
            transport: Arc::new(transport),
            bus,
        }
    }

    /// The bus this runner publishes to
    pub fn bus(&self) -> &StatusBus {
        &self.bus
    }

    /// Name of the underlying transport
    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Issue a GET request
    ///
    /// `url`, `params` and `headers` are passed to the transport as given;
    /// `data` is not sent. Nothing is broadcast or sent until the returned
    /// future is first polled.
    pub fn get(&self, context: &str, config: RequestConfig) -> Result<PendingResponse> {
        validate_context(context)?;

        let request = HttpRequest {
            method: Method::Get,
            url: config.url,
            params: query_pairs(&config.params),
            headers: config.headers.into_iter().collect(),
            body: None,
        };

        Ok(self.dispatch(context.to_string(), request))
    }

    /// Issue a POST request with `config.data` as a form-encoded body
    ///
    /// The `Content-Type` header is always `application/x-www-form-urlencoded`;
    /// other headers and query params pass through.
    pub fn post(&self, context: &str, config: RequestConfig) -> Result<PendingResponse> {
        validate_context(context)?;

        let mut headers: Vec<(String, String)> = config
            .headers
            .into_iter()
            .filter(|(key, _)| !key.eq_ignore_ascii_case("content-type"))
            .collect();
        headers.push(("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()));

        let request = HttpRequest {
            method: Method::Post,
            url: config.url,
            params: query_pairs(&config.params),
            headers,
            body: Some(form_url_encode(&config.data)),
        };

        Ok(self.dispatch(context.to_string(), request))
    }

    /// Wrap an already known value in a resolved future
    ///
    /// Returns the same `PendingResponse` type as `get` and `post`, so
    /// cached data and network data can be handled interchangeably. The
    /// future is ready on its first poll and yields `Some(value)` as is:
    /// no coercion, no status events.
    pub fn promisify(value: Value) -> PendingResponse {
        Box::pin(future::ready(Some(value)))
    }

    fn dispatch(&self, context: String, request: HttpRequest) -> PendingResponse {
        let transport = self.transport.clone();
        let bus = self.bus.clone();

        Box::pin(async move {
            let method = request.method;
            let url = request.url.clone();
            tracing::debug!(context = %context, method = %method, url = %url, "Request started");

            bus.broadcast_loading(&context);
            let mut in_flight = InFlight {
                bus: &bus,
                context: &context,
                settled: false,
            };

            let outcome = transport.send(request).await;
            in_flight.settled = true;

            match outcome {
                Ok(response) => {
                    tracing::debug!(
                        context = %context,
                        method = %method,
                        url = %url,
                        status = response.status,
                        "Request succeeded"
                    );
                    bus.broadcast_success(&context);
                    Some(coerce(response.data))
                }
                Err(error) => {
                    tracing::warn!(
                        context = %context,
                        method = %method,
                        url = %url,
                        error = %error,
                        "Request failed"
                    );
                    bus.broadcast_error(&context, error);
                    None
                }
            }
        })
    }
}

impl std::fmt::Debug for RequestRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestRunner")
            .field("transport", &self.transport.name())
            .field("bus", &self.bus)
            .finish()
    }
}

/// Announces `Aborted` if a request is dropped between `loading` and its
/// terminal event, so observers never see a lone `loading`
struct InFlight<'a> {
    bus: &'a StatusBus,
    context: &'a str,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(context = %self.context, "Request dropped before completion");
            self.bus.broadcast_error(self.context, TransportError::Aborted);
        }
    }
}

fn validate_context(context: &str) -> Result<()> {
    if context.is_empty() {
        return Err(AjaxError::InvalidArgument(
            "Request context must be a non-empty string".to_string(),
        ));
    }
    Ok(())
}

fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(key, value)| (key.clone(), scalar_text(value)))
        .collect()
}

/// Encode a flat mapping as an `application/x-www-form-urlencoded` body
///
/// Keys and values are percent-encoded independently and emitted in map
/// order. Non-string values use their JSON text (`1`, `true`, `null`).
pub fn form_url_encode(data: &Map<String, Value>) -> String {
    data.iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(&scalar_text(value))
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}
