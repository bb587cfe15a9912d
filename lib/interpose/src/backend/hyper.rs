//! Network backend using hyper-util.

use bytes::{Bytes, BytesMut};
use futures_util::stream;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tokio::time::Instant;
use tracing::{Instrument, debug, debug_span};

use crate::{
    BackendConfig, Error, EventStream, Headers, HttpBackend, HttpEvent, Request, Response,
    ResponseBody, Result,
};

use super::connector::https_connector;
use super::until_aborted;

type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Network backend with connection pooling and TLS.
///
/// The stream yields `Sent` once the request is dispatched. When the request
/// asks for progress it then yields `ResponseHeader` and one
/// `DownloadProgress` per body frame. It ends with the decoded `Response`
/// for a 2xx status, or an [`Error::Http`] carrying status, headers and raw
/// body otherwise.
///
/// # Example
///
/// ```no_run
/// use interpose::{HyperBackend, InterceptorHandler, Request};
///
/// # async fn run() -> interpose::Result<()> {
/// let handler = InterceptorHandler::builder(HyperBackend::new()).build();
/// let request = Request::get("https://api.example.com/users".parse()?).build();
/// let response = handler.send(request).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HyperBackend {
    client: HttpsClient,
    config: BackendConfig,
}

impl std::fmt::Debug for HyperBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for HyperBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperBackend {
    /// Create a new backend with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BackendConfig::default())
    }

    /// Create a new backend with custom configuration.
    #[must_use]
    pub fn with_config(config: BackendConfig) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(https_connector(&config));

        Self { client, config }
    }

    /// Get the backend configuration.
    #[must_use]
    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Build a hyper request from an interpose request.
    fn build_hyper_request(request: &Request) -> Result<http::Request<Full<Bytes>>> {
        let body = request.body().cloned().map_or_else(Full::default, Full::new);
        let mut http_request = http::Request::builder()
            .method(request.method())
            .uri(request.url().as_str())
            .body(body)
            .map_err(|e| Error::invalid_request(e.to_string()))?;

        *http_request.headers_mut() = request.headers().to_header_map()?;
        Ok(http_request)
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();

        if err.is_connect() {
            return Error::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl HttpBackend for HyperBackend {
    fn handle(&self, request: Request) -> EventStream {
        let span = debug_span!("http_backend", method = %request.method(), url = %request.url());
        let exchange = Exchange {
            backend: self.clone(),
            request: request.clone(),
        };

        let events = stream::unfold(Phase::Dispatch(exchange), move |phase| {
            phase.advance().instrument(span.clone())
        });
        until_aborted(&request, Box::pin(events))
    }

    fn is_server_capable(&self) -> bool {
        true
    }
}

// ============================================================================
// Exchange state machine
// ============================================================================

enum Phase {
    Dispatch(Exchange),
    Await(Exchange),
    Body(Box<Download>),
    Done,
}

impl Phase {
    async fn advance(self) -> Option<(Result<HttpEvent>, Self)> {
        match self {
            Self::Dispatch(exchange) => Some((Ok(HttpEvent::Sent), Self::Await(exchange))),
            Self::Await(exchange) => match exchange.send().await {
                Ok(download) if download.request.report_progress() => {
                    let event = download.header_event();
                    Some((Ok(event), Self::Body(Box::new(download))))
                }
                Ok(download) => Some(download.read().await),
                Err(error) => Some((Err(error), Self::Done)),
            },
            Self::Body(download) => Some((*download).read().await),
            Self::Done => None,
        }
    }
}

struct Exchange {
    backend: HyperBackend,
    request: Request,
}

impl Exchange {
    async fn send(self) -> Result<Download> {
        let deadline = Instant::now() + self.backend.config.timeout;
        let hyper_request = HyperBackend::build_hyper_request(&self.request)?;

        let response = tokio::time::timeout_at(deadline, self.backend.client.request(hyper_request))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(HyperBackend::map_hyper_error)?;

        let (parts, body) = response.into_parts();
        debug!(status = parts.status.as_u16(), "response headers received");

        let total = parts
            .headers
            .get(http::header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());

        Ok(Download {
            request: self.request,
            deadline,
            status: parts.status,
            headers: Headers::from(&parts.headers),
            body: body
                .map_err(|e| Error::connection(e.to_string()))
                .boxed_unsync(),
            buffer: BytesMut::new(),
            total,
        })
    }
}

struct Download {
    request: Request,
    deadline: Instant,
    status: http::StatusCode,
    headers: Headers,
    body: UnsyncBoxBody<Bytes, Error>,
    buffer: BytesMut,
    total: Option<u64>,
}

impl Download {
    fn header_event(&self) -> HttpEvent {
        HttpEvent::ResponseHeader {
            status: self.status.as_u16(),
            headers: self.headers.clone(),
            url: Some(self.request.url().clone()),
        }
    }

    /// Reads frames until the body ends, or until the next progress event.
    async fn read(mut self) -> (Result<HttpEvent>, Phase) {
        loop {
            let frame = match tokio::time::timeout_at(self.deadline, self.body.frame()).await {
                Err(_) => return (Err(Error::Timeout), Phase::Done),
                Ok(None) => return (self.finish(), Phase::Done),
                Ok(Some(Err(error))) => return (Err(error), Phase::Done),
                Ok(Some(Ok(frame))) => frame,
            };

            // Trailers carry no body bytes
            let Ok(data) = frame.into_data() else {
                continue;
            };
            self.buffer.extend_from_slice(&data);

            if self.request.report_progress() {
                let loaded = u64::try_from(self.buffer.len()).unwrap_or(u64::MAX);
                let event = HttpEvent::DownloadProgress {
                    loaded,
                    total: self.total,
                };
                return (Ok(event), Phase::Body(Box::new(self)));
            }
        }
    }

    fn finish(self) -> Result<HttpEvent> {
        let status = self.status.as_u16();
        let url = self.request.url();
        let bytes = self.buffer.freeze();

        if !self.status.is_success() {
            debug!(status, "request failed with HTTP error");
            return Err(Error::http_response(
                status,
                self.status.canonical_reason().unwrap_or_default(),
                url.as_str(),
                self.headers,
                (!bytes.is_empty()).then_some(bytes),
            ));
        }

        let body = ResponseBody::decode(&bytes, self.request.response_type()).map_err(|err| {
            Error::parse(status, url.as_str(), self.headers.clone(), err.to_string())
        })?;

        let response = Response::new(status, self.headers, body).with_url(url.clone());
        Ok(HttpEvent::Response(response))
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn backend_default_config() {
        let backend = HyperBackend::new();
        check!(backend.config().timeout == std::time::Duration::from_secs(30));
        check!(backend.is_server_capable());
        check!(format!("{backend:?}").contains("HyperBackend"));
    }

    #[test]
    fn builds_hyper_request() {
        let request = Request::post("https://api.example.com/users".parse().expect("url"))
            .header("X-Trace", "a")
            .header("X-Trace", "b")
            .text("hello")
            .build();

        let hyper_request = HyperBackend::build_hyper_request(&request).expect("valid request");

        check!(hyper_request.method() == http::Method::POST);
        check!(hyper_request.uri() == "https://api.example.com/users");
        let traces: Vec<_> = hyper_request.headers().get_all("x-trace").iter().collect();
        check!(traces == ["a", "b"]);
    }

    #[test]
    fn rejects_invalid_header_values() {
        let request = Request::get("https://api.example.com/".parse().expect("url"))
            .header("X-Bad", "line\nbreak")
            .build();

        let_assert!(Err(Error::InvalidRequest(_)) = HyperBackend::build_hyper_request(&request));
    }
}
