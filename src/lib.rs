//! # Outbound - fluent HTTP requests with structured log events
//!
//! Outbound builds a single outgoing HTTP request fluently (verb, URL, headers,
//! query string, JSON/XML/form bodies), sends it with `reqwest`, and decodes the
//! response. Each exchange can be reported to a pluggable [`EventSink`] as two
//! events: an [`OutgoingRequestEvent`] right before sending and a [`ResponseEvent`]
//! once the body has been read.
//!
//! ## Quick Start
//!
//! ```no_run
//! use outbound::{sink::TracingSink, Request};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Item {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), outbound::Error> {
//!     let logger = Arc::new(TracingSink::new());
//!
//!     let items: Vec<Item> = Request::new()
//!         .with_url("http://localhost:5001/api/v1/items?env=dev")
//!         .with_logger(logger.clone())
//!         .fetch_json()
//!         .await?;
//!
//!     let created = Request::new()
//!         .as_post()
//!         .with_url("http://localhost:5001/api/v1/items")
//!         .with_xml_body(&Item { id: 0, name: "widget".to_string() })
//!         .with_logger(logger)
//!         .fetch_xml_with_meta::<Item>()
//!         .await?;
//!
//!     println!("{} items, created {} ({})", items.len(), created.data.id, created.status());
//!     Ok(())
//! }
//! ```
//!
//! ## Log events
//!
//! Events are rendered either as text, with status codes styled by a
//! [`TextFormatter`](format::TextFormatter) passed in by the caller, or as JSON:
//!
//! ```text
//! {"flag":"request","ts":"2024-03-01T12:00:00Z","req":{"verb":"POST","url":"http://x/y","body":"e30="}}
//! {"flag":"request.response","ts":"...","req":{...},"res":{"status_code":200,"headers":{...}},"body":"W10="}
//! ```
//!
//! Bodies are raw bytes, so the JSON form carries them as standard padded base64.

mod error;
pub mod event;
pub mod format;
pub mod meta;
mod request;
mod response;
pub mod sink;

pub use error::{Error, Result};
pub use event::{Event, Flag, OutgoingRequestEvent, ResponseEvent};
pub use meta::{RequestMeta, ResponseMeta};
pub use request::Request;
pub use response::Response;
pub use sink::EventSink;
