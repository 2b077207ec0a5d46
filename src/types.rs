//! Core types for a3s-ajax
//!
//! All serializable types use camelCase JSON for wire compatibility.

use crate::error::TransportError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Lifecycle stage of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The request has been issued and is waiting on the transport
    Loading,
    /// The transport answered with a 2xx response
    Success,
    /// The transport failed
    Error,
}

impl Status {
    /// Whether this status ends a request's lifecycle
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Success | Status::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Loading => "loading",
            Status::Success => "success",
            Status::Error => "error",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single lifecycle notification published on the status bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    /// Lifecycle stage
    pub status: Status,

    /// Caller-chosen request identifier (opaque, not necessarily unique)
    pub context: String,

    /// Failure detail, present only for `Status::Error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<TransportError>,
}

impl StatusEvent {
    pub fn loading(context: impl Into<String>) -> Self {
        Self {
            status: Status::Loading,
            context: context.into(),
            info: None,
        }
    }

    pub fn success(context: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            context: context.into(),
            info: None,
        }
    }

    pub fn error(context: impl Into<String>, info: TransportError) -> Self {
        Self {
            status: Status::Error,
            context: context.into(),
            info: Some(info),
        }
    }
}

/// HTTP method issued by the request runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-facing request description
///
/// `params` and `data` keep insertion order, which is the order used for
/// the query string and the form-encoded body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    /// Absolute URL, or a path resolved by the transport
    pub url: String,

    /// Query string parameters
    #[serde(default)]
    pub params: Map<String, Value>,

    /// Extra request headers
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Form fields for POST requests (flat key/scalar mapping)
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl RequestConfig {
    /// Create a config for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Add a query string parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a request header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add a form field
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Fully resolved request handed to a `Transport`
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Look up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Successful transport answer
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,

    /// Decoded response body
    pub data: Value,
}

impl HttpResponse {
    /// A 200 response carrying `data`
    pub fn ok(data: Value) -> Self {
        Self { status: 200, data }
    }
}

/// Render a scalar as form/query text
///
/// Strings are used verbatim; other values use their JSON text, so
/// numbers and booleans read naturally and `null` becomes `"null"`.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
