//! Cross-site request forgery protection.
//!
//! Copies an anti-forgery token into a header of every mutating request sent
//! to the application's own origin. Reads (`GET`, `HEAD`) and requests to
//! any other origin never carry the token.

use std::sync::Arc;

use http::Method;
use url::{Origin, Url};

use crate::{EventStream, Interceptor, Next, Request};

/// Header used when none is configured.
const DEFAULT_HEADER_NAME: &str = "X-XSRF-TOKEN";

/// Supplies the current anti-forgery token, typically read from a cookie.
pub trait TokenSource: Send + Sync {
    /// The current token, if one is available.
    fn token(&self) -> Option<String>;
}

impl<F> TokenSource for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// Adds the anti-forgery token to mutating same-origin requests.
///
/// Only requests whose URL shares the scheme, host and port of the
/// configured origin get the token. A header already present on the request
/// is left untouched.
///
/// # Example
///
/// ```
/// use interpose::interceptors::Xsrf;
///
/// let origin = "https://app.example.com".parse().expect("valid url");
/// let xsrf = Xsrf::new(&origin, || Some("token-from-cookie".to_string()));
/// ```
#[derive(Clone)]
pub struct Xsrf {
    source: Arc<dyn TokenSource>,
    header_name: String,
    origin: Origin,
}

impl std::fmt::Debug for Xsrf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Xsrf")
            .field("header_name", &self.header_name)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl Xsrf {
    /// Create an interceptor for the application served at `origin`, reading
    /// tokens from `source`.
    pub fn new(origin: &Url, source: impl TokenSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            header_name: DEFAULT_HEADER_NAME.to_string(),
            origin: origin.origin(),
        }
    }

    /// Set the header carrying the token.
    #[must_use]
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    fn applies_to(&self, request: &Request) -> bool {
        let method = request.method();
        if method == Method::GET || method == Method::HEAD {
            return false;
        }
        if request.headers().contains(&self.header_name) {
            return false;
        }
        self.origin == request.url().origin()
    }
}

impl Interceptor for Xsrf {
    fn intercept(&self, request: Request, next: Next) -> EventStream {
        if !self.applies_to(&request) {
            return next.run(request);
        }
        match self.source.token() {
            Some(token) => next.run(
                request
                    .to_builder()
                    .set_header(self.header_name.as_str(), token)
                    .build(),
            ),
            None => next.run(request),
        }
    }
}
