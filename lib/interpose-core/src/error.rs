//! Error types for interpose.

use bytes::Bytes;
use derive_more::{Display, Error, From};

use crate::Headers;

/// Main error type for interpose operations.
///
/// Every error travels through the interceptor chain as the terminal item of
/// an [`EventStream`](crate::EventStream); interceptors may observe it on the
/// way out and turn it into a successful event.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// The transport completed with a non-2xx status.
    #[display("HTTP failure response for {url}: {status} {status_text}")]
    #[from(skip)]
    Http {
        /// HTTP status code.
        status: u16,
        /// Reason phrase reported with the status.
        status_text: String,
        /// URL of the failed request.
        url: String,
        /// Response headers.
        headers: Headers,
        /// Raw response body, if any was received.
        #[error(not(source))]
        body: Option<Bytes>,
    },

    /// The response body could not be decoded as the requested response type.
    #[display("failed to parse response body from {url} ({status}): {message}")]
    #[from(skip)]
    Parse {
        /// HTTP status code of the original response.
        status: u16,
        /// URL of the request.
        url: String,
        /// Headers of the original response.
        headers: Headers,
        /// Decoder message.
        message: String,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// The transport gave up waiting for the response.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The request's abort signal fired before completion.
    #[display("request aborted")]
    #[from(skip)]
    Aborted,

    /// Failure raised by an interceptor.
    #[display("interceptor error: {_0}")]
    #[from(skip)]
    Interceptor(#[error(not(source))] String),

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an HTTP error from a status code and reason phrase.
    #[must_use]
    pub fn http(status: u16, status_text: impl Into<String>) -> Self {
        Self::Http {
            status,
            status_text: status_text.into(),
            url: String::new(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Create an HTTP error carrying the full response context.
    #[must_use]
    pub fn http_response(
        status: u16,
        status_text: impl Into<String>,
        url: impl Into<String>,
        headers: Headers,
        body: Option<Bytes>,
    ) -> Self {
        Self::Http {
            status,
            status_text: status_text.into(),
            url: url.into(),
            headers,
            body,
        }
    }

    /// Create a body-parse error that keeps the original response status and headers.
    #[must_use]
    pub fn parse(
        status: u16,
        url: impl Into<String>,
        headers: Headers,
        message: impl Into<String>,
    ) -> Self {
        Self::Parse {
            status,
            url: url.into(),
            headers,
            message: message.into(),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an interceptor error.
    #[must_use]
    pub fn interceptor(message: impl Into<String>) -> Self {
        Self::Interceptor(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the request was aborted.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Returns `true` if the body could not be decoded.
    #[must_use]
    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// Returns the HTTP status code carried by the error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Parse { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the response headers carried by the error, if any.
    #[must_use]
    pub const fn headers(&self) -> Option<&Headers> {
        match self {
            Self::Http { headers, .. } | Self::Parse { headers, .. } => Some(headers),
            _ => None,
        }
    }

    /// Returns the request URL carried by the error, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Http { url, .. } | Self::Parse { url, .. } if !url.is_empty() => {
                Some(url.as_str())
            }
            _ => None,
        }
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_some_and(|s| (500..600).contains(&s))
    }

    /// Returns the response body if this is an HTTP error with a body.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Self::Http { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Try to decode the HTTP error body as JSON.
    ///
    /// Returns `None` if there is no body or this is not an HTTP error.
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T>> {
        self.body().map(|body| crate::from_json(body))
    }

    const fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
