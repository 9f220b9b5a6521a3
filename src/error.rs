//! Error types for building, sending and logging HTTP requests.
//!
//! Errors carry as much context as is available at the point of failure. Decode
//! failures keep the raw response body and status so they can be inspected without
//! re-issuing the request.

use http::StatusCode;

/// The main error type for this crate.
///
/// # Examples
///
/// ```no_run
/// use outbound::{Error, Request};
///
/// # async fn example() -> Result<(), Error> {
/// match Request::new()
///     .with_url("http://localhost:5001/api/v1/users")
///     .fetch_json::<serde_json::Value>()
///     .await
/// {
///     Ok(users) => println!("users: {}", users),
///     Err(Error::DeserializationFailed { raw_response, serde_error, .. }) => {
///         eprintln!("bad payload {}: {}", raw_response, serde_error);
///     }
///     Err(e) => eprintln!("request failed: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection refused, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(reqwest::Error),

    /// The request exceeded its configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// An invalid URL was provided to the builder.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request was configured with invalid values (header names, verbs, ...).
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A value could not be encoded as JSON or XML.
    ///
    /// Covers both request bodies and the JSON form of log events.
    #[error("Failed to serialize: {0}")]
    Serialization(String),

    /// Failed to decode the response body into the expected type.
    ///
    /// # Fields
    ///
    /// * `raw_response` - The raw response body as a string
    /// * `serde_error` - The error message from the decoder
    /// * `status` - The HTTP status code of the response
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The decoder error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// A text rendering destination refused more bytes.
    #[error("Failed to write event: {0}")]
    Write(#[from] std::io::Error),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(e)
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::DeserializationFailed { status, .. } => Some(*status),
            Error::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns `true` if the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout)
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
