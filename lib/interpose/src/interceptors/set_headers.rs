//! Fixed request headers.

use crate::{EventStream, Interceptor, Next, Request};

/// Sets a fixed list of headers on every request, replacing existing values.
///
/// The request is cloned with the new headers; the caller's value is left
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct SetHeaders {
    headers: Vec<(String, String)>,
}

impl SetHeaders {
    /// Creates an interceptor that sets nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header to set.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl Interceptor for SetHeaders {
    fn intercept(&self, request: Request, next: Next) -> EventStream {
        let request = self
            .headers
            .iter()
            .fold(request.to_builder(), |builder, (name, value)| {
                builder.set_header(name.as_str(), value.as_str())
            })
            .build();
        next.run(request)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert2::{check, let_assert};
    use futures_util::StreamExt;

    use super::*;
    use crate::{EchoBackend, HttpEvent};

    #[tokio::test]
    async fn replaces_existing_values() {
        let interceptor = SetHeaders::new().header("X-A", "1").header("Accept", "text/plain");
        let request = Request::get("https://api.example.com/".parse().expect("url"))
            .header("accept", "application/json")
            .build();

        let events: Vec<_> = interceptor
            .intercept(request.clone(), Next::backend(Arc::new(EchoBackend::new())))
            .collect()
            .await;

        let_assert!(Some(Ok(HttpEvent::Response(response))) = events.last());
        check!(
            response.body().as_json()
                == Some(&serde_json::json!({"accept": "text/plain", "X-A": "1"}))
        );
        check!(request.header("accept") == Some("application/json"));
    }
}
