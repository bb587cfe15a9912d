//! Immutable HTTP request.
//!
//! A [`Request`] is never mutated once built. Interceptors that need a
//! different request derive one with [`Request::to_builder`]:
//!
//! ```
//! use interpose_core::{Request, Method};
//!
//! let original = Request::get("https://api.example.com/users".parse().unwrap()).build();
//! let signed = original.to_builder().set_header("Authorization", "Bearer t0ken").build();
//!
//! assert!(original.header("Authorization").is_none());
//! assert_eq!(signed.header("authorization"), Some("Bearer t0ken"));
//! assert_eq!(signed.method(), Method::GET);
//! ```

use bytes::Bytes;
use http::{Extensions, Method};
use url::Url;

use crate::{AbortSignal, Headers, ResponseType};

/// An outgoing HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<Bytes>,
    response_type: ResponseType,
    with_credentials: bool,
    report_progress: bool,
    abort_signal: Option<AbortSignal>,
    context: Extensions,
}

impl Request {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: Url) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// Starts a `GET` request.
    #[must_use]
    pub fn get(url: Url) -> RequestBuilder {
        RequestBuilder::new(Method::GET, url)
    }

    /// Starts a `POST` request.
    #[must_use]
    pub fn post(url: Url) -> RequestBuilder {
        RequestBuilder::new(Method::POST, url)
    }

    /// Starts a `PUT` request.
    #[must_use]
    pub fn put(url: Url) -> RequestBuilder {
        RequestBuilder::new(Method::PUT, url)
    }

    /// Starts a `DELETE` request.
    #[must_use]
    pub fn delete(url: Url) -> RequestBuilder {
        RequestBuilder::new(Method::DELETE, url)
    }

    /// Starts a clone-and-modify of this request.
    ///
    /// The original request is left untouched.
    #[must_use]
    pub fn to_builder(&self) -> RequestBuilder {
        RequestBuilder {
            request: self.clone(),
        }
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method.clone()
    }

    /// Request URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Single header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Requested response decoding.
    #[must_use]
    pub const fn response_type(&self) -> ResponseType {
        self.response_type
    }

    /// Whether credentials (cookies, auth) should be sent cross-origin.
    #[must_use]
    pub const fn with_credentials(&self) -> bool {
        self.with_credentials
    }

    /// Whether the backend should emit progress events.
    #[must_use]
    pub const fn report_progress(&self) -> bool {
        self.report_progress
    }

    /// Abort signal attached to this call, if any.
    #[must_use]
    pub const fn abort_signal(&self) -> Option<&AbortSignal> {
        self.abort_signal.as_ref()
    }

    /// Returns `true` if the attached abort signal has fired.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.abort_signal.as_ref().is_some_and(AbortSignal::is_aborted)
    }

    /// Typed context value attached by the caller or an upstream interceptor.
    #[must_use]
    pub fn context<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.context.get::<T>()
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            request: Request {
                method,
                url,
                headers: Headers::new(),
                body: None,
                response_type: ResponseType::default(),
                with_credentials: false,
                report_progress: false,
                abort_signal: None,
                context: Extensions::new(),
            },
        }
    }

    /// Replaces the method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.request.method = method;
        self
    }

    /// Replaces the URL.
    #[must_use]
    pub fn url(mut self, url: Url) -> Self {
        self.request.url = url;
        self
    }

    /// Appends a header value.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.append(name, value);
        self
    }

    /// Sets a header, replacing any previous values.
    #[must_use]
    pub fn set_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.set(name, value);
        self
    }

    /// Removes a header.
    #[must_use]
    pub fn remove_header(mut self, name: &str) -> Self {
        self.request.headers.remove(name);
        self
    }

    /// Appends multiple header values.
    #[must_use]
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.request.headers.extend(headers);
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.request.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.request.body = Some(body.into());
        self
    }

    /// Clears the request body.
    #[must_use]
    pub fn without_body(mut self) -> Self {
        self.request.body = None;
        self
    }

    /// Sets a plain-text body.
    #[must_use]
    pub fn text(self, text: impl Into<String>) -> Self {
        self.set_header("Content-Type", "text/plain")
            .body(text.into())
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json<T: serde::Serialize>(self, value: &T) -> crate::Result<Self> {
        let body = crate::to_json(value)?;
        Ok(self.set_header("Content-Type", "application/json").body(body))
    }

    /// Sets how the response body should be decoded.
    #[must_use]
    pub const fn response_type(mut self, response_type: ResponseType) -> Self {
        self.request.response_type = response_type;
        self
    }

    /// Sets the credentials flag.
    #[must_use]
    pub const fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.request.with_credentials = with_credentials;
        self
    }

    /// Asks the backend for progress events.
    #[must_use]
    pub const fn report_progress(mut self, report_progress: bool) -> Self {
        self.request.report_progress = report_progress;
        self
    }

    /// Attaches an abort signal to this call.
    #[must_use]
    pub fn abort_signal(mut self, signal: AbortSignal) -> Self {
        self.request.abort_signal = Some(signal);
        self
    }

    /// Attaches a typed context value, replacing any value of the same type.
    #[must_use]
    pub fn context<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.request.context.insert(value);
        self
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("https://api.example.com")
            .and_then(|base| base.join(path))
            .expect("valid URL")
    }

    #[test]
    fn request_builder_basic() {
        let request = Request::get(url("/users"))
            .header("Accept", "application/json")
            .build();

        check!(request.method() == Method::GET);
        check!(request.url().as_str() == "https://api.example.com/users");
        check!(request.header("accept") == Some("application/json"));
        check!(request.body().is_none());
        check!(request.response_type() == ResponseType::Json);
        check!(!request.with_credentials());
        check!(!request.report_progress());
    }

    #[test]
    fn request_builder_with_query() {
        let request = Request::get(url("/users"))
            .query("page", "1")
            .query("limit", "10")
            .build();

        check!(request.url().as_str() == "https://api.example.com/users?page=1&limit=10");
    }

    #[test]
    fn request_builder_json() {
        #[derive(serde::Serialize)]
        struct User {
            name: String,
        }

        let request = Request::post(url("/users"))
            .json(&User {
                name: "test".to_string(),
            })
            .expect("json")
            .build();

        check!(request.header("Content-Type") == Some("application/json"));
        check!(request.body().map(Bytes::as_ref) == Some(&br#"{"name":"test"}"#[..]));
    }

    #[test]
    fn clone_with_changes_leaves_original_untouched() {
        let original = Request::get(url("/users")).header("X-A", "1").build();
        let derived = original
            .to_builder()
            .set_header("X-A", "2")
            .header("X-B", "3")
            .method(Method::HEAD)
            .build();

        check!(original.header("X-A") == Some("1"));
        check!(original.header("X-B").is_none());
        check!(original.method() == Method::GET);
        check!(derived.header("x-a") == Some("2"));
        check!(derived.header("x-b") == Some("3"));
        check!(derived.method() == Method::HEAD);
    }

    #[test]
    fn context_travels_with_clones() {
        #[derive(Debug, Clone, PartialEq)]
        struct RequestTag(&'static str);

        let request = Request::get(url("/")).context(RequestTag("cache")).build();
        let clone = request.to_builder().remove_header("none").build();

        check!(clone.context::<RequestTag>() == Some(&RequestTag("cache")));
        check!(clone.context::<String>().is_none());
    }

    #[test]
    fn abort_signal_is_shared() {
        let signal = AbortSignal::new();
        let request = Request::get(url("/")).abort_signal(signal.clone()).build();
        let clone = request.to_builder().build();

        check!(!clone.is_aborted());
        signal.abort();
        check!(request.is_aborted());
        check!(clone.is_aborted());
    }
}
