//! Backend that echoes the request headers.

use futures_util::stream;
use interpose_core::ResponseBody;

use crate::{Error, EventStream, HttpBackend, HttpEvent, Request, Response};

use super::until_aborted;

/// Responds `200 OK` with the received headers as a JSON object.
///
/// Single-valued headers become strings, repeated ones arrays, so a request
/// carrying `X-A: 1` and `X-B: 2` yields `{"X-A":"1","X-B":"2"}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoBackend;

impl EchoBackend {
    /// Creates the backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HttpBackend for EchoBackend {
    fn handle(&self, request: Request) -> EventStream {
        let response = serde_json::to_value(request.headers())
            .map(|headers| {
                Response::ok(ResponseBody::Json(headers)).with_url(request.url().clone())
            })
            .map_err(Error::from);

        let events = stream::iter([Ok(HttpEvent::Sent), response.map(HttpEvent::Response)]);
        until_aborted(&request, Box::pin(events))
    }
}
