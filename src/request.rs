//! Fluent builder for a single outgoing HTTP request.
//!
//! [`Request`] collects the verb, URL parts, headers, query string and body, sends the
//! request once with `reqwest`, and reports both sides of the exchange to an optional
//! [`EventSink`].

use crate::{
    event::{Event, Flag, OutgoingRequestEvent, ResponseEvent},
    meta::{RequestMeta, ResponseMeta},
    sink::EventSink,
    Error, Response, Result,
};
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
const CONTENT_TYPE_XML: &str = "application/xml; charset=utf-8";
const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// Builder failures that are reported when the request is sent.
#[derive(Debug, Clone)]
enum Deferred {
    Url(url::ParseError),
    Body(String),
}

impl From<Deferred> for Error {
    fn from(deferred: Deferred) -> Self {
        match deferred {
            Deferred::Url(e) => Error::InvalidUrl(e),
            Deferred::Body(message) => Error::Serialization(message),
        }
    }
}

/// A single outgoing HTTP request.
///
/// Builder methods never fail. Problems such as an unparsable URL or a body that
/// cannot be encoded are kept and returned by the first `execute*`/`fetch*` call.
///
/// # Examples
///
/// ```no_run
/// use outbound::{Request, sink::TracingSink};
/// use serde::{Deserialize, Serialize};
/// use std::sync::Arc;
///
/// #[derive(Serialize)]
/// struct CreateUser { name: String }
///
/// #[derive(Deserialize)]
/// struct User { id: u64, name: String }
///
/// # async fn example() -> Result<(), outbound::Error> {
/// let created = Request::new()
///     .as_post()
///     .with_url("http://localhost:5001/api/v1/users?env=dev")
///     .with_header("X-Request-Id", "abc123")
///     .with_json_body(&CreateUser { name: "Alice".to_string() })
///     .with_logger(Arc::new(TracingSink::new()))
///     .fetch_json_with_meta::<User>()
///     .await?;
///
/// println!("{} -> {} ({})", created.data.id, created.data.name, created.status());
/// # Ok(())
/// # }
/// ```
pub struct Request {
    verb: String,
    scheme: String,
    host: String,
    path: String,
    query_string: BTreeMap<String, Vec<String>>,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    basic_auth: Option<(String, String)>,
    post_data: BTreeMap<String, Vec<String>>,
    body: Option<Vec<u8>>,
    content_type: Option<String>,
    timeout: Option<Duration>,
    logger: Option<Arc<dyn EventSink>>,
    client: Option<reqwest::Client>,
    deferred: Option<Deferred>,
}

impl Request {
    /// Creates a `GET` request over `http` with nothing else set.
    pub fn new() -> Self {
        Self {
            verb: Method::GET.to_string(),
            scheme: "http".to_string(),
            host: String::new(),
            path: String::new(),
            query_string: BTreeMap::new(),
            headers: Vec::new(),
            cookies: Vec::new(),
            basic_auth: None,
            post_data: BTreeMap::new(),
            body: None,
            content_type: None,
            timeout: None,
            logger: None,
            client: None,
            deferred: None,
        }
    }

    /// Sets scheme, host, path and query string from a full URL.
    ///
    /// Query parameters already added are replaced by the ones in `url`.
    pub fn with_url(mut self, url: impl AsRef<str>) -> Self {
        match Url::parse(url.as_ref()) {
            Ok(parsed) => {
                if matches!(self.deferred, Some(Deferred::Url(_))) {
                    self.deferred = None;
                }
                self.scheme = parsed.scheme().to_string();
                self.host = match (parsed.host_str(), parsed.port()) {
                    (Some(host), Some(port)) => format!("{}:{}", host, port),
                    (Some(host), None) => host.to_string(),
                    (None, _) => String::new(),
                };
                self.path = parsed.path().to_string();
                self.query_string.clear();
                for (key, value) in parsed.query_pairs() {
                    self.query_string
                        .entry(key.into_owned())
                        .or_default()
                        .push(value.into_owned());
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, url = url.as_ref(), "Invalid request URL");
                self.deferred = Some(Deferred::Url(e));
            }
        }
        self
    }

    /// Sets the URL scheme.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Sets the host, optionally with a `:port` suffix.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the URL path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the HTTP verb. It is upper-cased.
    pub fn with_verb(mut self, verb: impl AsRef<str>) -> Self {
        self.verb = verb.as_ref().to_ascii_uppercase();
        self
    }

    /// Sets the verb to `GET`.
    pub fn as_get(self) -> Self {
        self.with_verb(Method::GET.as_str())
    }

    /// Sets the verb to `POST`.
    pub fn as_post(self) -> Self {
        self.with_verb(Method::POST.as_str())
    }

    /// Sets the verb to `PUT`.
    pub fn as_put(self) -> Self {
        self.with_verb(Method::PUT.as_str())
    }

    /// Sets the verb to `PATCH`.
    pub fn as_patch(self) -> Self {
        self.with_verb(Method::PATCH.as_str())
    }

    /// Sets the verb to `DELETE`.
    pub fn as_delete(self) -> Self {
        self.with_verb(Method::DELETE.as_str())
    }

    /// Adds a header. Names and values are validated when the request is sent.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Appends a query string value for `key`.
    pub fn with_query_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_string
            .entry(key.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Appends a form field. Form fields become the body unless one is set explicitly.
    pub fn with_post_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.post_data
            .entry(key.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Adds a cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Sets basic auth credentials.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the `Content-Type` header.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the raw request body.
    pub fn with_raw_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.set_body(body.into());
        self
    }

    /// Sets the body to the JSON encoding of `value`.
    pub fn with_json_body<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => {
                self.set_body(body);
                self.content_type = Some(CONTENT_TYPE_JSON.to_string());
            }
            Err(e) => self.deferred = Some(Deferred::Body(e.to_string())),
        }
        self
    }

    /// Sets the body to the XML encoding of `value`.
    pub fn with_xml_body<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match quick_xml::se::to_string(value) {
            Ok(body) => {
                self.set_body(body.into_bytes());
                self.content_type = Some(CONTENT_TYPE_XML.to_string());
            }
            Err(e) => self.deferred = Some(Deferred::Body(e.to_string())),
        }
        self
    }

    /// Replaces the body, dropping any encoding failure left by an earlier body.
    fn set_body(&mut self, body: Vec<u8>) {
        if matches!(self.deferred, Some(Deferred::Body(_))) {
            self.deferred = None;
        }
        self.body = Some(body);
    }

    /// Sets the sink that receives the outgoing request and response events.
    pub fn with_logger(mut self, logger: Arc<dyn EventSink>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Uses `client` to send the request instead of a fresh one.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Returns the HTTP verb.
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Returns the URL scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns the host, including the port when one was given.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the URL path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the query string values by key.
    pub fn query_string(&self) -> &BTreeMap<String, Vec<String>> {
        &self.query_string
    }

    /// Returns the headers added with [`with_header`](Self::with_header).
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the configured `Content-Type`.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Assembles the full URL. Query keys are written in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the parts do not form a valid URL.
    pub fn url(&self) -> Result<Url> {
        if let Some(Deferred::Url(e)) = &self.deferred {
            return Err(Error::InvalidUrl(*e));
        }

        let mut url = Url::parse(&format!("{}://{}", self.scheme, self.host))?;
        url.set_path(&self.path);
        if !self.query_string.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, values) in &self.query_string {
                for value in values {
                    pairs.append_pair(key, value);
                }
            }
        }
        Ok(url)
    }

    /// Returns the metadata that log events would capture for this request.
    pub fn meta(&self) -> RequestMeta {
        RequestMeta {
            verb: self.verb.clone(),
            url: self.url().ok(),
            body: self.body_bytes(),
        }
    }

    fn body_bytes(&self) -> Option<Vec<u8>> {
        if self.body.is_some() {
            return self.body.clone();
        }
        if self.post_data.is_empty() {
            return None;
        }
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.post_data {
            for value in values {
                form.append_pair(key, value);
            }
        }
        Some(form.finish().into_bytes())
    }

    /// Sends the request and discards the response.
    pub async fn execute(&self) -> Result<()> {
        self.exchange().await.map(|_| ())
    }

    /// Sends the request and returns the response metadata.
    pub async fn execute_with_meta(&self) -> Result<ResponseMeta> {
        Ok(self.exchange().await?.meta)
    }

    /// Sends the request and returns the raw response body.
    pub async fn fetch_raw(&self) -> Result<Vec<u8>> {
        Ok(self.exchange().await?.body)
    }

    /// Sends the request and returns the raw response body with its metadata.
    pub async fn fetch_raw_with_meta(&self) -> Result<Response<Vec<u8>>> {
        let exchange = self.exchange().await?;
        let raw_body = String::from_utf8_lossy(&exchange.body).into_owned();
        Ok(Response::new(exchange.body, raw_body, exchange.meta, exchange.latency))
    }

    /// Sends the request and returns the response body as text.
    ///
    /// Invalid UTF-8 is replaced.
    pub async fn fetch_string(&self) -> Result<String> {
        Ok(self.fetch_string_with_meta().await?.data)
    }

    /// Sends the request and returns the response body as text with its metadata.
    pub async fn fetch_string_with_meta(&self) -> Result<Response<String>> {
        let exchange = self.exchange().await?;
        let raw_body = String::from_utf8_lossy(&exchange.body).into_owned();
        Ok(Response::new(raw_body.clone(), raw_body, exchange.meta, exchange.latency))
    }

    /// Sends the request and decodes a JSON response.
    pub async fn fetch_json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(self.fetch_json_with_meta().await?.data)
    }

    /// Sends the request and decodes a JSON response, keeping the metadata.
    pub async fn fetch_json_with_meta<T: DeserializeOwned>(&self) -> Result<Response<T>> {
        self.fetch_decoded(|raw| serde_json::from_str(raw)).await
    }

    /// Sends the request and decodes an XML response.
    pub async fn fetch_xml<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(self.fetch_xml_with_meta().await?.data)
    }

    /// Sends the request and decodes an XML response, keeping the metadata.
    pub async fn fetch_xml_with_meta<T: DeserializeOwned>(&self) -> Result<Response<T>> {
        self.fetch_decoded(|raw| quick_xml::de::from_str(raw)).await
    }

    async fn fetch_decoded<T, E, F>(&self, decode: F) -> Result<Response<T>>
    where
        E: fmt::Display,
        F: FnOnce(&str) -> std::result::Result<T, E>,
    {
        let exchange = self.exchange().await?;
        let raw_body = String::from_utf8_lossy(&exchange.body).into_owned();

        match decode(&raw_body) {
            Ok(data) => Ok(Response::new(data, raw_body, exchange.meta, exchange.latency)),
            Err(e) => {
                let status = StatusCode::from_u16(exchange.meta.status_code)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

                tracing::error!(
                    error = %e,
                    status = exchange.meta.status_code,
                    raw_response = %raw_body,
                    "Failed to deserialize response"
                );

                Err(Error::DeserializationFailed {
                    raw_response: raw_body,
                    serde_error: e.to_string(),
                    status,
                })
            }
        }
    }

    /// Collects the headers to send.
    ///
    /// Headers from [`with_header`](Self::with_header) keep every value. A content
    /// type set by a body setter, [`with_content_type`](Self::with_content_type) or
    /// form data replaces any `Content-Type` given through `with_header`.
    fn header_map(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        for (name, value) in &self.headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
            headers.append(name, value);
        }

        let content_type = match (&self.content_type, self.body.is_none() && !self.post_data.is_empty()) {
            (Some(content_type), _) => Some(content_type.as_str()),
            (None, true) => Some(CONTENT_TYPE_FORM),
            (None, false) => None,
        };
        if let Some(content_type) = content_type {
            let value = HeaderValue::try_from(content_type)
                .map_err(|e| Error::ConfigurationError(format!("Invalid content type: {}", e)))?;
            headers.insert(header::CONTENT_TYPE, value);
        }

        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            let value = HeaderValue::try_from(cookie)
                .map_err(|e| Error::ConfigurationError(format!("Invalid cookie: {}", e)))?;
            headers.insert(header::COOKIE, value);
        }

        Ok(headers)
    }

    /// Sends the request once and reads the whole response.
    async fn exchange(&self) -> Result<Exchange> {
        if let Some(deferred) = &self.deferred {
            return Err(deferred.clone().into());
        }

        let url = self.url()?;
        let method = Method::from_bytes(self.verb.as_bytes())
            .map_err(|e| Error::ConfigurationError(format!("Invalid verb {:?}: {}", self.verb, e)))?;
        let body = self.body_bytes();

        let req_meta = Arc::new(RequestMeta {
            verb: self.verb.clone(),
            url: Some(url.clone()),
            body: body.clone(),
        });

        tracing::debug!(
            method = %method,
            url = %url,
            "Executing HTTP request"
        );

        let client = match &self.client {
            Some(client) => client.clone(),
            None => reqwest::Client::builder().build().map_err(|e| {
                Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?,
        };

        let mut request = client.request(method, url);

        request = request.headers(self.header_map()?);

        if let Some((username, password)) = &self.basic_auth {
            request = request.basic_auth(username, Some(password));
        }

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        if let Some(body) = body {
            request = request.body(body);
        }

        self.emit(Flag::REQUEST, || OutgoingRequestEvent::now(req_meta.clone()));

        let start_time = Instant::now();
        let response = request.send().await?;
        let meta = ResponseMeta::from_parts(response.status().as_u16(), response.headers());
        let body = response.bytes().await?.to_vec();
        let latency = start_time.elapsed();

        tracing::info!(
            status = meta.status_code,
            latency_ms = latency.as_millis(),
            bytes = body.len(),
            "Received HTTP response"
        );

        self.emit(Flag::RESPONSE, || {
            ResponseEvent::now(req_meta.clone(), Arc::new(meta.clone()), body.clone())
        });

        Ok(Exchange {
            meta,
            body,
            latency,
        })
    }

    /// Hands an event to the logger if one is set and accepts `flag`.
    ///
    /// Sink failures are traced and do not fail the request.
    fn emit<E: Event>(&self, flag: Flag, build: impl FnOnce() -> E) {
        let Some(logger) = &self.logger else {
            return;
        };
        if !logger.enabled(&flag) {
            return;
        }
        if let Err(e) = logger.handle(&build()) {
            tracing::warn!(error = %e, flag = %flag, "Failed to log event");
        }
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("verb", &self.verb)
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("path", &self.path)
            .field("query_string", &self.query_string)
            .field("headers", &self.headers)
            .field("content_type", &self.content_type)
            .field("timeout", &self.timeout)
            .field("has_logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

struct Exchange {
    meta: ResponseMeta,
    body: Vec<u8>,
    latency: Duration,
}
