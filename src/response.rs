//! Response wrapper that keeps decoded data next to the raw exchange details.

use crate::meta::ResponseMeta;
use std::time::Duration;

/// A decoded HTTP response.
///
/// # Type Parameters
///
/// * `T` - The type of the decoded response data
///
/// # Examples
///
/// ```no_run
/// use outbound::Request;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), outbound::Error> {
/// let response = Request::new()
///     .with_url("http://localhost:5001/users/123")
///     .fetch_json_with_meta::<User>()
///     .await?;
///
/// println!("User: {}", response.data.name);
/// println!("Status: {}", response.status());
/// println!("Took {:?}", response.latency);
///
/// if !response.meta.is_success() {
///     println!("Error body: {}", response.raw_body);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded response data.
    pub data: T,

    /// The raw response body as text.
    pub raw_body: String,

    /// Status code and headers.
    pub meta: ResponseMeta,

    /// Time from sending the request until the body was fully read.
    pub latency: Duration,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(data: T, raw_body: String, meta: ResponseMeta, latency: Duration) -> Self {
        Self {
            data,
            raw_body,
            meta,
            latency,
        }
    }

    /// Maps the response data to a different type, keeping the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use outbound::{Response, meta::ResponseMeta};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     42,
    ///     "42".to_string(),
    ///     ResponseMeta::new(200),
    ///     Duration::from_millis(100),
    /// );
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            meta: self.meta,
            latency: self.latency,
        }
    }

    /// Returns the numeric status code.
    pub fn status(&self) -> u16 {
        self.meta.status_code
    }

    /// Returns the first value of a header by name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use outbound::{Response, meta::ResponseMeta};
    /// # use std::time::Duration;
    /// let mut meta = ResponseMeta::new(200);
    /// meta.headers.insert("content-type".to_string(), vec!["application/json".to_string()]);
    ///
    /// let response = Response::new((), String::new(), meta, Duration::from_millis(5));
    ///
    /// assert_eq!(response.header("Content-Type"), Some("application/json"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.meta.header(name)
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
