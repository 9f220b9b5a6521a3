//! Log events for outgoing requests and received responses.
//!
//! Both event kinds are immutable values: they are created once at the matching
//! protocol moment (send or receive), handed to an [`EventSink`](crate::sink::EventSink)
//! and dropped. Sinks only ever see them through the [`Event`] trait.
//!
//! # Examples
//!
//! ```
//! use outbound::event::{Event, OutgoingRequestEvent};
//! use outbound::format::PlainFormatter;
//! use outbound::meta::RequestMeta;
//! use std::sync::Arc;
//!
//! let url = url::Url::parse("http://x/y").unwrap();
//! let req = Arc::new(RequestMeta::new("POST", Some(url)).with_body(br#"{"a":1}"#.to_vec()));
//! let event = OutgoingRequestEvent::now(req);
//!
//! let text = event.text(&PlainFormatter).unwrap();
//! assert_eq!(text, "POST http://x/y\nrequest body\n{\"a\":1}");
//! ```

use crate::format::TextFormatter;
use crate::meta::{serialize_bytes, RequestMeta, ResponseMeta};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// A classification tag used by sinks to filter and route events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Flag(&'static str);

impl Flag {
    /// Tag of [`OutgoingRequestEvent`].
    pub const REQUEST: Flag = Flag("request");

    /// Tag of [`ResponseEvent`].
    pub const RESPONSE: Flag = Flag("request.response");

    /// Creates a flag for a custom event kind.
    pub const fn new(name: &'static str) -> Self {
        Flag(name)
    }

    /// Returns the tag as a string.
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

/// The capability set every loggable event exposes.
pub trait Event: Send + Sync {
    /// The classification tag of this event kind.
    fn flag(&self) -> Flag;

    /// The wall-clock time captured when the event was created.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Writes a human readable rendering of the event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`](crate::Error::Write) if `out` rejects the bytes.
    fn write_text(&self, formatter: &dyn TextFormatter, out: &mut dyn Write) -> Result<()>;

    /// Returns the JSON form of the event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`](crate::Error::Serialization) if a field
    /// cannot be represented.
    fn to_json(&self) -> Result<serde_json::Value>;

    /// Renders the event as text into a fresh string.
    ///
    /// Body bytes that are not valid UTF-8 are replaced.
    fn text(&self, formatter: &dyn TextFormatter) -> Result<String> {
        let mut buf = Vec::new();
        self.write_text(formatter, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn write_body_section(out: &mut dyn Write, label: &str, body: &[u8]) -> Result<()> {
    if !body.is_empty() {
        out.write_all(b"\n")?;
        out.write_all(label.as_bytes())?;
        out.write_all(b"\n")?;
        out.write_all(body)?;
    }
    Ok(())
}

/// Logged right before a request is sent.
#[derive(Debug, Clone)]
pub struct OutgoingRequestEvent {
    ts: DateTime<Utc>,
    req: Arc<RequestMeta>,
}

impl OutgoingRequestEvent {
    /// Creates an event with an explicit timestamp.
    pub fn new(ts: DateTime<Utc>, req: Arc<RequestMeta>) -> Self {
        Self { ts, req }
    }

    /// Creates an event stamped with the current time.
    pub fn now(req: Arc<RequestMeta>) -> Self {
        Self::new(Utc::now(), req)
    }

    /// Returns the request metadata.
    pub fn request(&self) -> &Arc<RequestMeta> {
        &self.req
    }
}

impl Event for OutgoingRequestEvent {
    fn flag(&self) -> Flag {
        Flag::REQUEST
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.ts
    }

    fn write_text(&self, _formatter: &dyn TextFormatter, out: &mut dyn Write) -> Result<()> {
        write!(out, "{} {}", self.req.verb, self.req.url_string())?;
        write_body_section(out, "request body", self.req.body_bytes())
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Serialize for OutgoingRequestEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            flag: Flag,
            ts: &'a DateTime<Utc>,
            req: &'a RequestMeta,
        }

        Wire {
            flag: self.flag(),
            ts: &self.ts,
            req: &self.req,
        }
        .serialize(serializer)
    }
}

/// Logged once a response body has been fully read.
#[derive(Debug, Clone)]
pub struct ResponseEvent {
    ts: DateTime<Utc>,
    req: Arc<RequestMeta>,
    res: Arc<ResponseMeta>,
    body: Vec<u8>,
}

impl ResponseEvent {
    /// Creates an event with an explicit timestamp.
    pub fn new(
        ts: DateTime<Utc>,
        req: Arc<RequestMeta>,
        res: Arc<ResponseMeta>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            ts,
            req,
            res,
            body: body.into(),
        }
    }

    /// Creates an event stamped with the current time.
    pub fn now(req: Arc<RequestMeta>, res: Arc<ResponseMeta>, body: impl Into<Vec<u8>>) -> Self {
        Self::new(Utc::now(), req, res, body)
    }

    /// Returns the metadata of the request that produced this response.
    pub fn request(&self) -> &Arc<RequestMeta> {
        &self.req
    }

    /// Returns the response metadata.
    pub fn response(&self) -> &Arc<ResponseMeta> {
        &self.res
    }

    /// Returns the raw response body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl Event for ResponseEvent {
    fn flag(&self) -> Flag {
        Flag::RESPONSE
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.ts
    }

    fn write_text(&self, formatter: &dyn TextFormatter, out: &mut dyn Write) -> Result<()> {
        write!(
            out,
            "{} {} {}",
            formatter.colorize_status_code(self.res.status_code),
            self.req.verb,
            self.req.url_string()
        )?;
        write_body_section(out, "response body", &self.body)
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Serialize for ResponseEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            flag: Flag,
            ts: &'a DateTime<Utc>,
            req: &'a RequestMeta,
            res: &'a ResponseMeta,
            #[serde(serialize_with = "serialize_bytes")]
            body: &'a [u8],
        }

        Wire {
            flag: self.flag(),
            ts: &self.ts,
            req: &self.req,
            res: &self.res,
            body: &self.body,
        }
        .serialize(serializer)
    }
}
