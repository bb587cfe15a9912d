//! Handler protocol shared by every stage of the pipeline.
//!
//! - [`HttpBackend`] - terminal stage performing the actual exchange
//! - [`Interceptor`] - next-based stage returning an [`EventStream`]
//! - [`EventInterceptor`] - callback-based stage pushing events through an [`Emitter`]
//! - [`Next`] - continuation handed to both interceptor kinds

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::chain::{ChainFn, dispatch_from};
use crate::event::ends_stream;
use crate::{Error, HttpEvent, InterceptorEntry, Request, Result};

/// The events produced for one request.
///
/// Streams are cold: nothing runs until they are polled, and dropping one
/// cancels the work behind it.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<HttpEvent>> + Send>>;

/// Terminal stage that performs the network exchange.
///
/// Implementations must end every stream with exactly one terminal item
/// ([`HttpEvent::Response`] or an error), must not keep the request once it
/// has ended, and must stop emitting when the request's
/// [`AbortSignal`](crate::AbortSignal) fires.
pub trait HttpBackend: Send + Sync {
    /// Performs the request.
    fn handle(&self, request: Request) -> EventStream;

    /// Whether the backend is suitable for server-side environments.
    fn is_server_capable(&self) -> bool {
        false
    }
}

impl<B: HttpBackend + ?Sized> HttpBackend for Arc<B> {
    fn handle(&self, request: Request) -> EventStream {
        (**self).handle(request)
    }

    fn is_server_capable(&self) -> bool {
        (**self).is_server_capable()
    }
}

/// Next-based interceptor: `(request, next) -> events`.
///
/// An interceptor may forward the request unchanged, forward a derived
/// request, call `next` several times, or never call it at all, in which
/// case nothing downstream (including the backend) sees the request.
///
/// # Example
///
/// ```
/// use interpose_core::{EventStream, Interceptor, Next, Request};
///
/// struct ApiVersion;
///
/// impl Interceptor for ApiVersion {
///     fn intercept(&self, request: Request, next: Next) -> EventStream {
///         next.run(request.to_builder().set_header("X-Api-Version", "2").build())
///     }
/// }
/// ```
pub trait Interceptor: Send + Sync {
    /// Handles `request`, delegating to `next` as needed.
    fn intercept(&self, request: Request, next: Next) -> EventStream;
}

/// Callback-based interceptor: `(request, next, emitter)`.
///
/// Instead of returning a stream, the interceptor pushes events through the
/// [`Emitter`]. The stream seen upstream closes after the first terminal
/// event; anything emitted afterwards is dropped.
pub trait EventInterceptor: Send + Sync {
    /// Handles `request`, pushing events into `emitter`.
    ///
    /// The returned future is driven by the upstream consumer.
    fn intercept(&self, request: Request, next: Next, emitter: Emitter) -> BoxFuture<'static, ()>;
}

// ============================================================================
// Continuation
// ============================================================================

/// Entries walked on the caller's stack before the rest of the walk moves to
/// a task of its own. Keeps stack depth bounded for long chains.
pub(crate) const INLINE_DEPTH: usize = 32;

#[derive(Clone)]
enum Route {
    /// Continuation of a pre-folded chain.
    Folded {
        downstream: ChainFn,
        terminal: Arc<dyn HttpBackend>,
        position: usize,
    },
    /// Continuation of a cursor walk over the entry list.
    Cursor {
        entries: Arc<[InterceptorEntry]>,
        position: usize,
        terminal: Arc<dyn HttpBackend>,
    },
    /// Straight to the backend.
    Backend(Arc<dyn HttpBackend>),
}

/// Continuation handed to an interceptor.
///
/// Cloneable and re-invocable: each [`run`](Self::run) starts an independent
/// run of the rest of the chain.
///
/// Every 32 entries the rest of the chain runs on a spawned tokio task whose
/// events are relayed back, so longer chains must be polled from within a
/// tokio runtime.
#[derive(Clone)]
pub struct Next {
    route: Route,
}

impl Next {
    pub(crate) fn folded(
        downstream: ChainFn,
        terminal: Arc<dyn HttpBackend>,
        position: usize,
    ) -> Self {
        Self {
            route: Route::Folded {
                downstream,
                terminal,
                position,
            },
        }
    }

    pub(crate) fn cursor(
        entries: Arc<[InterceptorEntry]>,
        position: usize,
        terminal: Arc<dyn HttpBackend>,
    ) -> Self {
        Self {
            route: Route::Cursor {
                entries,
                position,
                terminal,
            },
        }
    }

    /// A continuation that goes straight to `backend`.
    ///
    /// Useful to exercise a single interceptor in isolation.
    #[must_use]
    pub fn backend(backend: Arc<dyn HttpBackend>) -> Self {
        Self {
            route: Route::Backend(backend),
        }
    }

    /// Index of the entry this continuation leads to.
    const fn position(&self) -> Option<usize> {
        match &self.route {
            Route::Folded { position, .. } | Route::Cursor { position, .. } => Some(*position),
            Route::Backend(_) => None,
        }
    }

    /// Runs the rest of the chain for `request`.
    #[must_use]
    pub fn run(&self, request: Request) -> EventStream {
        match self.position() {
            Some(position) if position % INLINE_DEPTH == 0 => {
                let next = self.clone();
                relay(move || next.run_inline(request))
            }
            _ => self.run_inline(request),
        }
    }

    fn run_inline(&self, request: Request) -> EventStream {
        match &self.route {
            Route::Folded {
                downstream,
                terminal,
                ..
            } => downstream(request, Arc::clone(terminal)),
            Route::Cursor {
                entries,
                position,
                terminal,
            } => dispatch_from(entries, *position, terminal, request),
            Route::Backend(backend) => backend.handle(request),
        }
    }
}

/// Runs `start` on a spawned task once polled, relaying its events.
///
/// The task stops after the first terminal item, and is aborted when the
/// relay is dropped.
fn relay(start: impl FnOnce() -> EventStream + Send + 'static) -> EventStream {
    let (sender, receiver) = mpsc::unbounded_channel();
    let forward = async move {
        let mut events = start();
        while let Some(item) = events.next().await {
            let terminal = ends_stream(&item);
            if sender.send(item).is_err() || terminal {
                break;
            }
        }
    };
    Box::pin(Relay {
        forward: Some(Box::pin(forward)),
        task: None,
        receiver,
    })
}

struct Relay {
    forward: Option<BoxFuture<'static, ()>>,
    task: Option<JoinHandle<()>>,
    receiver: mpsc::UnboundedReceiver<Result<HttpEvent>>,
}

impl Stream for Relay {
    type Item = Result<HttpEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(forward) = self.forward.take() {
            self.task = Some(tokio::spawn(forward));
        }
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let route = match &self.route {
            Route::Folded { .. } => "folded",
            Route::Cursor { .. } => "cursor",
            Route::Backend(_) => "backend",
        };
        f.debug_struct("Next").field("route", &route).finish()
    }
}

// ============================================================================
// Emitter
// ============================================================================

/// Event sink handed to an [`EventInterceptor`].
#[derive(Debug, Clone)]
pub struct Emitter {
    sender: mpsc::UnboundedSender<Result<HttpEvent>>,
}

impl Emitter {
    pub(crate) const fn new(sender: mpsc::UnboundedSender<Result<HttpEvent>>) -> Self {
        Self { sender }
    }

    /// Pushes an event upstream.
    ///
    /// Returns `false` if the upstream stream is already closed.
    pub fn emit(&self, event: HttpEvent) -> bool {
        self.sender.send(Ok(event)).is_ok()
    }

    /// Terminates the upstream stream with `error`.
    ///
    /// Returns `false` if the upstream stream is already closed.
    pub fn fail(&self, error: Error) -> bool {
        self.sender.send(Err(error)).is_ok()
    }

    /// Returns `true` once upstream stopped listening.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Pipes every item of `events` upstream, stopping after a terminal item.
    pub async fn forward(&self, mut events: EventStream) {
        while let Some(item) = events.next().await {
            let terminal = ends_stream(&item);
            if self.sender.send(item).is_err() || terminal {
                break;
            }
        }
    }
}
