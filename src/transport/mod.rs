//! Transport trait — the seam between the request runner and HTTP
//!
//! The runner never talks to the network directly. Anything that can turn
//! an `HttpRequest` into an `HttpResponse` (or a `TransportError`) can back
//! it: the bundled reqwest client, the in-memory transport used in tests,
//! or an application-specific adapter.

use crate::error::TransportError;
use crate::types::{HttpRequest, HttpResponse};
use async_trait::async_trait;

pub mod http;
pub mod memory;

pub use http::HttpTransport;
pub use memory::MemoryTransport;

/// Core trait for HTTP backends
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request
    ///
    /// Non-2xx answers are failures and must be reported as
    /// `TransportError::Status`.
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError>;

    /// Transport name (e.g., "http", "memory")
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Decode a response body the way browsers' XHR helpers do: empty is null,
/// JSON is parsed, anything else is kept as text
pub(crate) fn decode_body(text: &str) -> serde_json::Value {
    if text.trim().is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(""), serde_json::Value::Null);
        assert_eq!(decode_body("  \n"), serde_json::Value::Null);
        assert_eq!(decode_body(r#"{"a": "1"}"#), json!({"a": "1"}));
        assert_eq!(decode_body("42"), json!(42));
        assert_eq!(decode_body("<html>oops</html>"), json!("<html>oops</html>"));
    }
}
