//! HTTP response handling.
//!
//! [`Response`] is the payload of the terminal [`HttpEvent::Response`](crate::HttpEvent)
//! event. Its body has already been decoded according to the request's
//! [`ResponseType`](crate::ResponseType).
//!
//! # Example
//!
//! ```ignore
//! let user: User = response.json()?;
//! ```

use url::Url;

use crate::{Headers, ResponseBody};

/// HTTP response with status, headers, and decoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: u16,
    status_text: String,
    headers: Headers,
    url: Option<Url>,
    body: ResponseBody,
}

impl Response {
    /// Creates a new response; the status text defaults to the canonical reason phrase.
    #[must_use]
    pub fn new(status: u16, headers: Headers, body: ResponseBody) -> Self {
        let status_text = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            status_text,
            headers,
            url: None,
            body,
        }
    }

    /// A `200 OK` response with the given body and no headers.
    #[must_use]
    pub fn ok(body: ResponseBody) -> Self {
        Self::new(200, Headers::new(), body)
    }

    /// Replaces the status text.
    #[must_use]
    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    /// Records the final URL the response came from.
    #[must_use]
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase.
    #[must_use]
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Single header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Final URL, when the backend reported one.
    #[must_use]
    pub const fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Decoded body.
    #[must_use]
    pub const fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Consume into body.
    #[must_use]
    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Deserialize the response body into `T`.
    ///
    /// JSON bodies are converted directly; text bodies are parsed as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the body does not match `T`.
    pub fn json<T: serde::de::DeserializeOwned>(self) -> crate::Result<T> {
        match self.body {
            ResponseBody::Json(value) => crate::from_value(value),
            ResponseBody::Empty => crate::from_value(serde_json::Value::Null),
            ResponseBody::Text(text) => crate::from_json(text.as_bytes()),
            ResponseBody::Binary(bytes) => crate::from_json(&bytes),
        }
    }

    /// The body as text, if it was decoded as text.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.body.as_text()
    }

    /// The raw body, if it was decoded as a blob or array buffer.
    #[must_use]
    pub const fn bytes(&self) -> Option<&bytes::Bytes> {
        self.body.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn response_basic() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "application/json");

        let response = Response::new(
            200,
            headers,
            ResponseBody::Json(serde_json::json!({"id": 1})),
        );

        check!(response.status() == 200);
        check!(response.status_text() == "OK");
        check!(response.header("content-type") == Some("application/json"));
        check!(response.is_success());
        check!(response.url().is_none());
    }

    #[test]
    fn status_text_defaults_and_overrides() {
        let response = Response::new(404, Headers::new(), ResponseBody::Empty);
        check!(response.status_text() == "Not Found");
        check!(!response.is_success());

        let response = response.with_status_text("Gone Fishing");
        check!(response.status_text() == "Gone Fishing");

        let response = Response::new(599, Headers::new(), ResponseBody::Empty);
        check!(response.status_text().is_empty());
    }

    #[test]
    fn response_json() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct User {
            id: u64,
            name: String,
        }

        let response = Response::ok(ResponseBody::Json(
            serde_json::json!({"id": 1, "name": "test"}),
        ));
        let user: User = response.json().expect("deserialize");
        check!(
            user == User {
                id: 1,
                name: "test".to_string()
            }
        );

        let response = Response::ok(ResponseBody::Text(r#"{"id":2,"name":"x"}"#.to_string()));
        let user: User = response.json().expect("deserialize text");
        check!(user.id == 2);
    }

    #[test]
    fn response_json_mismatch_reports_path() {
        #[derive(Debug, serde::Deserialize)]
        struct User {
            #[allow(dead_code)]
            id: u64,
        }

        let response = Response::ok(ResponseBody::Json(serde_json::json!({"id": "one"})));
        let_assert!(Err(crate::Error::JsonDeserialization { path, .. }) = response.json::<User>());
        check!(path == "id");
    }
}
