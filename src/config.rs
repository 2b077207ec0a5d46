//! Configuration for the reqwest-backed transport

use crate::error::{AjaxError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// HTTP transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    /// Base URL that relative request URLs are resolved against
    /// (e.g., `https://api.example.com/v1`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Whole-request timeout in milliseconds; `None` waits indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Headers added to every request (request headers win on conflict)
    #[serde(default)]
    pub default_headers: HashMap<String, String>,
}

fn default_user_agent() -> String {
    format!("a3s-ajax/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: None,
            user_agent: default_user_agent(),
            default_headers: HashMap::new(),
        }
    }
}

impl HttpConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Load a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AjaxError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: HttpConfig = serde_json::from_str(&json).map_err(|e| {
            AjaxError::Config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "HTTP config loaded");
        Ok(config)
    }

    /// Check the config for values the transport cannot use
    pub fn validate(&self) -> Result<()> {
        if let Some(base) = &self.base_url {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                return Err(AjaxError::Config(format!(
                    "Base URL must start with http:// or https://, got '{}'",
                    base
                )));
            }
        }
        if self.timeout_ms == Some(0) {
            return Err(AjaxError::Config(
                "Timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve a request URL against `base_url`
    ///
    /// URLs starting with `http://` or `https://` are returned unchanged.
    pub fn resolve_url(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if !has_http_scheme(url) => {
                format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
            }
            _ => url.to_string(),
        }
    }
}

fn has_http_scheme(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
