//! Events emitted while a request travels through the chain.
//!
//! A successful run emits zero or more non-terminal events followed by exactly
//! one [`HttpEvent::Response`]. A failed run ends with an `Err` item instead.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use derive_more::Display;
use url::Url;

use crate::{Headers, Response};

/// Discriminant of an [`HttpEvent`], handy for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum HttpEventType {
    /// The request has been handed to the transport.
    Sent,
    /// Upload progress.
    UploadProgress,
    /// Status and headers received, body still pending.
    ResponseHeader,
    /// Download progress.
    DownloadProgress,
    /// Final response.
    Response,
    /// User-defined event.
    User,
}

/// An event in a request's event stream.
#[derive(Debug, Clone)]
pub enum HttpEvent {
    /// The request has been dispatched.
    Sent,
    /// Bytes of the request body uploaded so far.
    UploadProgress {
        /// Bytes uploaded.
        loaded: u64,
        /// Total bytes, when known.
        total: Option<u64>,
    },
    /// Status line and headers have arrived.
    ResponseHeader {
        /// HTTP status code.
        status: u16,
        /// Response headers.
        headers: Headers,
        /// URL the response came from.
        url: Option<Url>,
    },
    /// Bytes of the response body downloaded so far.
    DownloadProgress {
        /// Bytes downloaded.
        loaded: u64,
        /// Total bytes, when known (from `Content-Length`).
        total: Option<u64>,
    },
    /// The final response. Terminal.
    Response(Response),
    /// An event injected by an interceptor.
    User(UserEvent),
}

impl HttpEvent {
    /// Returns `true` for the terminal [`HttpEvent::Response`].
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Response(_))
    }

    /// The event's discriminant.
    #[must_use]
    pub const fn event_type(&self) -> HttpEventType {
        match self {
            Self::Sent => HttpEventType::Sent,
            Self::UploadProgress { .. } => HttpEventType::UploadProgress,
            Self::ResponseHeader { .. } => HttpEventType::ResponseHeader,
            Self::DownloadProgress { .. } => HttpEventType::DownloadProgress,
            Self::Response(_) => HttpEventType::Response,
            Self::User(_) => HttpEventType::User,
        }
    }

    /// The response, if this is the terminal event.
    #[must_use]
    pub const fn as_response(&self) -> Option<&Response> {
        match self {
            Self::Response(response) => Some(response),
            _ => None,
        }
    }

    /// Consumes the event into its response, if terminal.
    #[must_use]
    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Response(response) => Some(response),
            _ => None,
        }
    }

    /// Wraps an arbitrary value into a [`HttpEvent::User`] event.
    #[must_use]
    pub fn user<T: Any + Send + Sync>(value: T) -> Self {
        Self::User(UserEvent::new(value))
    }
}

impl From<Response> for HttpEvent {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

/// Returns `true` if `item` ends an event stream: an error or the final response.
pub(crate) const fn ends_stream(item: &crate::Result<HttpEvent>) -> bool {
    matches!(item, Err(_) | Ok(HttpEvent::Response(_)))
}

/// Payload of a user-defined event.
#[derive(Clone)]
pub struct UserEvent {
    payload: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl UserEvent {
    /// Wraps `value`.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            payload: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrows the payload as `T`, if it has that type.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Returns `true` if the payload has type `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }
}

impl fmt::Debug for UserEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserEvent")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;
    use crate::ResponseBody;

    #[test]
    fn only_response_is_terminal() {
        check!(!HttpEvent::Sent.is_terminal());
        check!(
            !(HttpEvent::DownloadProgress {
                loaded: 1,
                total: None
            })
            .is_terminal()
        );
        check!(HttpEvent::from(Response::ok(ResponseBody::Empty)).is_terminal());
    }

    #[test]
    fn event_type_display() {
        check!(HttpEvent::Sent.event_type().to_string() == "Sent");
        check!(HttpEvent::user(1_u8).event_type() == HttpEventType::User);
    }

    #[test]
    fn user_event_downcast() {
        #[derive(Debug, PartialEq)]
        struct CacheHit(u32);

        let event = HttpEvent::user(CacheHit(3));
        let_assert!(HttpEvent::User(user) = event);
        check!(user.is::<CacheHit>());
        check!(user.downcast_ref::<CacheHit>() == Some(&CacheHit(3)));
        check!(user.downcast_ref::<String>().is_none());
        check!(format!("{user:?}").contains("CacheHit"));
    }
}
