//! Terminal stages.
//!
//! - [`HyperBackend`] - network transport over hyper-util and rustls
//! - [`ServiceBackend`] - adapts any Tower service
//! - [`EchoBackend`] - answers with the received headers, for tests and demos
//!
//! Every backend ends its stream with exactly one terminal item and goes
//! quiet as soon as the request's abort signal fires.

#[cfg(feature = "hyper-backend")]
mod connector;
mod echo;
#[cfg(feature = "hyper-backend")]
mod hyper;
mod service;

pub use echo::EchoBackend;
#[cfg(feature = "hyper-backend")]
pub use hyper::HyperBackend;
pub use service::ServiceBackend;

use futures_util::StreamExt;

use crate::{EventStream, Request};

/// Ends `events` without further items once `request`'s abort signal fires.
///
/// Dropping the inner stream cancels whatever transport work it was awaiting.
pub(crate) fn until_aborted(request: &Request, events: EventStream) -> EventStream {
    match request.abort_signal().cloned() {
        Some(signal) => Box::pin(events.take_until(async move { signal.aborted().await })),
        None => events,
    }
}
