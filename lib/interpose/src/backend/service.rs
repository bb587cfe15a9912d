//! Tower service adapter.

use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use futures_util::{StreamExt, stream};
use tower::ServiceExt;
use tower_service::Service;
use url::Url;

use crate::{Error, EventStream, HttpBackend, HttpEvent, Request, Response, ResponseBody};

use super::until_aborted;

/// Adapts a Tower service into a terminal stage.
///
/// The stream yields `Sent`, then the service's outcome. A response with a
/// non-2xx status ends the stream with [`Error::Http`], as the network
/// backend does. The service is kept
/// behind a mutex and cloned per request, so services that are `Send` but not
/// `Sync` (such as `BoxCloneService`) can be used.
///
/// # Example
///
/// ```
/// use interpose::{Error, Request, Response, ResponseBody, ServiceBackend};
///
/// let backend = ServiceBackend::new(tower::service_fn(|_request: Request| async {
///     Ok::<_, Error>(Response::ok(ResponseBody::Empty))
/// }));
/// ```
pub struct ServiceBackend<S> {
    service: Arc<Mutex<S>>,
}

impl<S> std::fmt::Debug for ServiceBackend<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceBackend").finish_non_exhaustive()
    }
}

impl<S> Clone for ServiceBackend<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<S> ServiceBackend<S> {
    /// Wraps `service`.
    pub fn new(service: S) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
        }
    }
}

impl<S> HttpBackend for ServiceBackend<S>
where
    S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    fn handle(&self, request: Request) -> EventStream {
        // Lock, clone the service, and release the lock immediately
        let service = self
            .service
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let outcome = {
            let request = request.clone();
            async move {
                let url = request.url().clone();
                let response = service.oneshot(request).await?;
                if response.is_success() {
                    Ok::<_, Error>(HttpEvent::Response(response))
                } else {
                    Err(http_failure(&url, response))
                }
            }
        };
        let events = stream::once(async { Ok(HttpEvent::Sent) }).chain(stream::once(outcome));
        until_aborted(&request, Box::pin(events))
    }
}

/// Turns a non-2xx response into [`Error::Http`], keeping its context.
fn http_failure(request_url: &Url, response: Response) -> Error {
    let status = response.status();
    let status_text = response.status_text().to_string();
    let url = response.url().unwrap_or(request_url).to_string();
    let headers = response.headers().clone();
    let body = match response.into_body() {
        ResponseBody::Empty => None,
        ResponseBody::Json(value) => serde_json::to_vec(&value).ok().map(Bytes::from),
        ResponseBody::Text(text) => Some(Bytes::from(text)),
        ResponseBody::Binary(bytes) => Some(bytes),
    };
    Error::http_response(status, status_text, url, headers, body)
}
