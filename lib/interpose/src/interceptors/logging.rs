//! Request/response logging.
//!
//! This interceptor logs HTTP requests and their outcome using the `tracing` crate.

use std::time::Instant;

use futures_util::StreamExt;
use tracing::{Level, debug, info, span, warn};

use crate::{EventStream, HttpEvent, Interceptor, Next, Request};

/// Log level for the logging interceptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log at debug level (headers and intermediate events).
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

/// Logs each request and its terminal outcome.
///
/// Register it first to measure the whole chain, or last to measure the
/// backend alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor {
    level: LogLevel,
}

impl LoggingInterceptor {
    /// Create a new logging interceptor with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging interceptor that logs at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// The configured level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl Interceptor for LoggingInterceptor {
    fn intercept(&self, request: Request, next: Next) -> EventStream {
        let method = request.method();
        let url = request.url().to_string();
        let level = self.level;

        let span = span!(Level::INFO, "http_request", %method, %url);
        span.in_scope(|| match level {
            LogLevel::Debug => {
                debug!(
                    method = %method,
                    url = %url,
                    headers = ?request.headers(),
                    "sending request"
                );
            }
            LogLevel::Info => {
                info!(method = %method, url = %url, "sending request");
            }
        });

        let start = Instant::now();
        Box::pin(next.run(request).inspect(move |item| {
            let _entered = span.enter();
            // Saturating conversion to u64 (truncates after ~584 million years)
            let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            match item {
                Ok(HttpEvent::Response(response)) => {
                    let status = response.status();
                    if response.is_success() {
                        info!(status, elapsed_ms, "request completed");
                    } else {
                        warn!(status, elapsed_ms, "request completed with HTTP error");
                    }
                }
                Ok(event) => {
                    if level == LogLevel::Debug {
                        debug!(event = %event.event_type(), elapsed_ms, "event received");
                    }
                }
                Err(err) => {
                    warn!(error = %err, elapsed_ms, "request failed");
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures_util::StreamExt;

    use super::*;
    use crate::EchoBackend;

    #[test]
    fn logging_default() {
        let interceptor = LoggingInterceptor::new();
        assert_eq!(interceptor.level(), LogLevel::Info);
    }

    #[test]
    fn logging_debug() {
        let interceptor = LoggingInterceptor::debug();
        assert_eq!(interceptor.level(), LogLevel::Debug);
    }

    #[tokio::test]
    async fn events_pass_through_unchanged() {
        let request = Request::get("https://api.example.com/".parse().expect("url")).build();

        let events: Vec<_> = LoggingInterceptor::debug()
            .intercept(request, Next::backend(Arc::new(EchoBackend::new())))
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events.last(), Some(Ok(HttpEvent::Response(_)))));
    }
}
