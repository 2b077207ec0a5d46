//! # a3s-ajax
//!
//! HTTP request helpers with numeric response coercion and a
//! request-lifecycle status bus.
//!
//! ## Overview
//!
//! `a3s-ajax` wraps outbound HTTP calls so that:
//!
//! - every request announces `loading`, then `success` or `error`, on a
//!   shared [`StatusBus`], tagged with a caller-chosen context string;
//! - successful response bodies pass through [`coerce`], which turns
//!   numeric-looking strings (`"42"`, `"3.14"`) back into numbers while
//!   leaving everything else (`"2018-04-01"`, `"1e5"`) untouched.
//!
//! Transport failures are not raised through the returned future; it
//! resolves with `None` and the failure is published as an `error` event.
//!
//! ## Quick Start
//!
//! ```rust
//! use a3s_ajax::{Method, MemoryTransport, RequestConfig, RequestRunner, Status, StatusBus};
//!
//! # async fn example() -> a3s_ajax::Result<()> {
//! let transport = MemoryTransport::new();
//! transport.respond(Method::Get, "/rates", serde_json::json!({"usd_cny": "7.35"}));
//!
//! let bus = StatusBus::new();
//! let _sub = bus.on_status(|event| {
//!     if event.status == Status::Error {
//!         eprintln!("{} failed: {:?}", event.context, event.info);
//!     }
//! });
//!
//! let runner = RequestRunner::new(transport, bus);
//! let rates = runner.get("rates", RequestConfig::new("/rates"))?.await;
//! assert_eq!(rates, Some(serde_json::json!({"usd_cny": 7.35})));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **coerce** — pure numeric coercion over `serde_json::Value`
//! - **StatusBus** — single `ajax:status` channel, synchronous delivery
//! - **RequestRunner** — GET/POST with lifecycle broadcasts, `promisify`
//! - **Transport** trait — `HttpTransport` (reqwest) and `MemoryTransport`

pub mod coerce;
pub mod config;
pub mod error;
pub mod runner;
pub mod status;
pub mod transport;
pub mod types;

// Re-export core types
pub use coerce::{coerce, coerce_in_place, parse_numeric};
pub use config::HttpConfig;
pub use error::{AjaxError, Result, TransportError};
pub use runner::{form_url_encode, PendingResponse, RequestRunner, FORM_CONTENT_TYPE};
pub use status::{StatusBus, StatusStream, Subscription, STATUS_CHANNEL};
pub use transport::{HttpTransport, MemoryTransport, Transport};
pub use types::{HttpRequest, HttpResponse, Method, RequestConfig, Status, StatusEvent};
