//! Retry on transient failures.
//!
//! By default, retries:
//! - Connection errors and timeouts
//! - 5xx server errors
//! - 429 Too Many Requests

use futures_util::{StreamExt, stream};
use tracing::debug;

use crate::{Error, EventStream, HttpEvent, Interceptor, Next, Request, Response, Result};

/// Runs the rest of the chain again when it ends with a transient failure.
///
/// Events of a failed attempt that precede its terminal item (such as `Sent`)
/// are passed through as they arrive. Aborted requests are never retried.
#[derive(Debug, Clone, Copy)]
pub struct Retry {
    max_retries: u32,
}

impl Retry {
    /// Create a retry interceptor with the given maximum number of retries.
    #[must_use]
    pub const fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Returns `true` if the response should be retried.
    fn should_retry_response(response: &Response) -> bool {
        let status = response.status();
        status >= 500 || status == 429
    }

    /// Returns `true` if the error should be retried.
    fn should_retry_error(error: &Error) -> bool {
        error.is_connection()
            || error.is_timeout()
            || error.is_server_error()
            || error.status() == Some(429)
    }
}

struct Attempt {
    next: Next,
    request: Request,
    events: EventStream,
    remaining: u32,
}

impl Attempt {
    fn should_retry(&self, item: &Result<HttpEvent>) -> bool {
        if self.remaining == 0 || self.request.is_aborted() {
            return false;
        }
        match item {
            Ok(HttpEvent::Response(response)) => Retry::should_retry_response(response),
            Ok(_) => false,
            Err(error) => Retry::should_retry_error(error),
        }
    }
}

impl Interceptor for Retry {
    fn intercept(&self, request: Request, next: Next) -> EventStream {
        let attempt = Attempt {
            events: next.run(request.clone()),
            next,
            request,
            remaining: self.max_retries,
        };

        Box::pin(stream::unfold(Some(attempt), |attempt| async move {
            let mut attempt = attempt?;
            loop {
                let item = attempt.events.next().await?;
                if attempt.should_retry(&item) {
                    attempt.remaining -= 1;
                    debug!(remaining = attempt.remaining, "retrying request");
                    attempt.events = attempt.next.run(attempt.request.clone());
                    continue;
                }

                let terminal = match &item {
                    Ok(event) => event.is_terminal(),
                    Err(_) => true,
                };
                return Some((item, (!terminal).then_some(attempt)));
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use assert2::{check, let_assert};
    use interpose_core::{Headers, ResponseBody};

    use super::*;
    use crate::HttpBackend;

    /// Fails with `error` for the first `failures` calls, then succeeds.
    struct Flaky {
        calls: AtomicU32,
        failures: u32,
        error: fn() -> Error,
    }

    impl HttpBackend for Flaky {
        fn handle(&self, _request: Request) -> EventStream {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = if call < self.failures {
                Err((self.error)())
            } else {
                Ok(HttpEvent::Response(Response::ok(ResponseBody::Empty)))
            };
            Box::pin(stream::iter([Ok(HttpEvent::Sent), outcome]))
        }
    }

    fn flaky(failures: u32, error: fn() -> Error) -> Arc<Flaky> {
        Arc::new(Flaky {
            calls: AtomicU32::new(0),
            failures,
            error,
        })
    }

    fn request() -> Request {
        Request::get("https://api.example.com/".parse().expect("url")).build()
    }

    async fn run(retry: Retry, backend: &Arc<Flaky>) -> Vec<Result<HttpEvent>> {
        let next = Next::backend(Arc::clone(backend) as Arc<dyn HttpBackend>);
        retry.intercept(request(), next).collect().await
    }

    #[tokio::test]
    async fn retries_connection_errors_until_success() {
        let backend = flaky(2, || Error::connection("refused"));

        let events = run(Retry::new(3), &backend).await;

        check!(backend.calls.load(Ordering::SeqCst) == 3);
        let_assert!(Some(Ok(HttpEvent::Response(_))) = events.last());
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let backend = flaky(5, || Error::Timeout);

        let events = run(Retry::new(2), &backend).await;

        check!(backend.calls.load(Ordering::SeqCst) == 3);
        let_assert!(Some(Err(Error::Timeout)) = events.last());
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let backend = flaky(1, || {
            Error::http_response(404, "Not Found", "https://api.example.com/", Headers::new(), None)
        });

        let events = run(Retry::new(3), &backend).await;

        check!(backend.calls.load(Ordering::SeqCst) == 1);
        let_assert!(Some(Err(error)) = events.last());
        check!(error.status() == Some(404));
    }

    #[test]
    fn retryable_responses() {
        check!(Retry::should_retry_response(&Response::new(503, Headers::new(), ResponseBody::Empty)));
        check!(Retry::should_retry_response(&Response::new(429, Headers::new(), ResponseBody::Empty)));
        check!(!Retry::should_retry_response(&Response::new(404, Headers::new(), ResponseBody::Empty)));
        check!(!Retry::should_retry_response(&Response::ok(ResponseBody::Empty)));
    }

    #[test]
    fn retryable_errors() {
        check!(Retry::should_retry_error(&Error::connection("refused")));
        check!(Retry::should_retry_error(&Error::Timeout));
        check!(Retry::should_retry_error(&Error::http(502, "Bad Gateway")));
        check!(Retry::should_retry_error(&Error::http(429, "Too Many Requests")));
        check!(!Retry::should_retry_error(&Error::http(400, "Bad Request")));
        check!(!Retry::should_retry_error(&Error::Aborted));
    }
}
