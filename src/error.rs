//! Error types for a3s-ajax
//!
//! Two families: `AjaxError` is raised to the caller (programmer errors,
//! bad configuration), while `TransportError` is never raised through a
//! pending request. It travels on the status bus as the `info` of an
//! `error` event instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised directly to the caller
#[derive(Debug, Error)]
pub enum AjaxError {
    /// A caller-supplied argument is unusable (e.g. an empty request context)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for ajax operations
pub type Result<T> = std::result::Result<T, AjaxError>;

/// A failed HTTP call, as reported by a `Transport`
///
/// Carried as the payload of `error` status events. Serializable so that
/// observers can forward it verbatim.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TransportError {
    /// Connection, DNS, TLS or timeout failure
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[serde(default)]
        timeout: bool,
    },

    /// The server answered with a non-2xx status
    #[error("HTTP {status}")]
    Status {
        status: u16,
        #[serde(default)]
        body: serde_json::Value,
    },

    /// The request could not be built (bad URL, bad header, ...)
    #[error("Invalid request: {message}")]
    Request { message: String },

    /// The pending request was dropped before the transport answered
    #[error("Request aborted before completion")]
    Aborted,
}

impl TransportError {
    /// HTTP status code, when the server produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
