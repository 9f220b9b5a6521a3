//! Request and response metadata captured by log events.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use http::HeaderMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use url::Url;

/// Metadata describing an outgoing request.
///
/// No validation is performed: an empty verb or a missing URL is kept as is and
/// simply rendered that way by the log events.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RequestMeta {
    /// The HTTP method, e.g. `GET`.
    pub verb: String,

    /// The full request URL, query string included.
    #[serde(serialize_with = "serialize_url")]
    pub url: Option<Url>,

    /// The raw request body, base64 encoded in JSON.
    #[serde(serialize_with = "serialize_optional_bytes")]
    pub body: Option<Vec<u8>>,
}

impl RequestMeta {
    /// Creates request metadata with no body.
    pub fn new(verb: impl Into<String>, url: Option<Url>) -> Self {
        Self {
            verb: verb.into(),
            url,
            body: None,
        }
    }

    /// Sets the raw request body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Returns the URL as a string, or an empty string when there is none.
    pub fn url_string(&self) -> String {
        self.url.as_ref().map(Url::to_string).unwrap_or_default()
    }

    /// Returns the body bytes, empty when no body was set.
    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or_default()
    }

    /// Returns the query parameters of the URL, grouped by key in first-seen order.
    pub fn query(&self) -> BTreeMap<String, Vec<String>> {
        let mut query: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if let Some(url) = &self.url {
            for (key, value) in url.query_pairs() {
                query
                    .entry(key.into_owned())
                    .or_default()
                    .push(value.into_owned());
            }
        }
        query
    }
}

/// Metadata describing a received response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResponseMeta {
    /// The numeric HTTP status code.
    pub status_code: u16,

    /// Response headers, keyed by lowercase name, values in received order.
    pub headers: BTreeMap<String, Vec<String>>,

    /// The declared `Content-Type`, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// The declared `Content-Length`, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
}

impl ResponseMeta {
    /// Creates response metadata with a status code and no headers.
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            ..Self::default()
        }
    }

    /// Builds response metadata from a status code and a header map.
    ///
    /// Header values that are not valid UTF-8 are converted lossily.
    pub fn from_parts(status_code: u16, header_map: &HeaderMap) -> Self {
        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in header_map {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        let content_type = headers
            .get("content-type")
            .and_then(|values| values.first())
            .cloned();
        let content_length = headers
            .get("content-length")
            .and_then(|values| values.first())
            .and_then(|value| value.parse().ok());

        Self {
            status_code,
            headers,
            content_type,
            content_length,
        }
    }

    /// Returns the first value of a header, matching the name case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns `true` for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

fn serialize_url<S: Serializer>(url: &Option<Url>, serializer: S) -> Result<S::Ok, S::Error> {
    match url {
        Some(url) => serializer.serialize_str(url.as_str()),
        None => serializer.serialize_none(),
    }
}

fn serialize_optional_bytes<S: Serializer>(
    bytes: &Option<Vec<u8>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(bytes) => serialize_bytes(bytes, serializer),
        None => serializer.serialize_none(),
    }
}

/// Serializes raw bytes as a standard, padded base64 string.
pub(crate) fn serialize_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}
