//! Interceptor entries: the two calling conventions as one tagged variant.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

use crate::event::ends_stream;
use crate::{Emitter, EventInterceptor, EventStream, HttpEvent, Interceptor, Next, Request, Result};

/// One registered interceptor.
///
/// Equality is identity: two entries are equal when they wrap the very same
/// interceptor instance, which is what registry deduplication relies on.
#[derive(Clone)]
pub enum InterceptorEntry {
    /// `(request, next) -> events`.
    NextBased(Arc<dyn Interceptor>),
    /// `(request, next, emitter)`.
    EventBased(Arc<dyn EventInterceptor>),
}

impl InterceptorEntry {
    /// Wraps a next-based interceptor.
    pub fn next_based(interceptor: impl Interceptor + 'static) -> Self {
        Self::NextBased(Arc::new(interceptor))
    }

    /// Wraps a callback-based interceptor.
    pub fn event_based(interceptor: impl EventInterceptor + 'static) -> Self {
        Self::EventBased(Arc::new(interceptor))
    }

    /// Invokes the interceptor with its calling convention.
    #[must_use]
    pub fn dispatch(&self, request: Request, next: Next) -> EventStream {
        match self {
            Self::NextBased(interceptor) => interceptor.intercept(request, next),
            Self::EventBased(interceptor) => drive(Arc::clone(interceptor), request, next),
        }
    }

    fn address(&self) -> *const () {
        match self {
            Self::NextBased(interceptor) => Arc::as_ptr(interceptor).cast::<()>(),
            Self::EventBased(interceptor) => Arc::as_ptr(interceptor).cast::<()>(),
        }
    }
}

impl PartialEq for InterceptorEntry {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.address(), other.address())
    }
}

impl Eq for InterceptorEntry {}

impl fmt::Debug for InterceptorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::NextBased(_) => "NextBased",
            Self::EventBased(_) => "EventBased",
        };
        f.debug_tuple(kind).field(&self.address()).finish()
    }
}

impl<I: Interceptor + 'static> From<Arc<I>> for InterceptorEntry {
    fn from(interceptor: Arc<I>) -> Self {
        Self::NextBased(interceptor)
    }
}

// ============================================================================
// Closure adapters
// ============================================================================

struct FnInterceptor<F>(F);

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(Request, Next) -> EventStream + Send + Sync,
{
    fn intercept(&self, request: Request, next: Next) -> EventStream {
        (self.0)(request, next)
    }
}

struct FnEventInterceptor<F>(F);

impl<F, Fut> EventInterceptor for FnEventInterceptor<F>
where
    F: Fn(Request, Next, Emitter) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn intercept(&self, request: Request, next: Next, emitter: Emitter) -> BoxFuture<'static, ()> {
        (self.0)(request, next, emitter).boxed()
    }
}

/// Builds a next-based entry from a closure.
///
/// # Example
///
/// ```
/// use interpose_core::interceptor_fn;
///
/// let entry = interceptor_fn(|request, next| {
///     next.run(request.to_builder().set_header("X-A", "1").build())
/// });
/// ```
pub fn interceptor_fn<F>(f: F) -> InterceptorEntry
where
    F: Fn(Request, Next) -> EventStream + Send + Sync + 'static,
{
    InterceptorEntry::NextBased(Arc::new(FnInterceptor(f)))
}

/// Builds a callback-based entry from an async closure.
///
/// # Example
///
/// ```
/// use interpose_core::{HttpEvent, event_interceptor_fn};
///
/// let entry = event_interceptor_fn(|request, next, emitter| async move {
///     emitter.emit(HttpEvent::Sent);
///     emitter.forward(next.run(request)).await;
/// });
/// ```
pub fn event_interceptor_fn<F, Fut>(f: F) -> InterceptorEntry
where
    F: Fn(Request, Next, Emitter) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    InterceptorEntry::EventBased(Arc::new(FnEventInterceptor(f)))
}

// ============================================================================
// Event-driven stream
// ============================================================================

/// Runs a callback-based interceptor as an [`EventStream`].
///
/// The interceptor is only invoked when the stream is first polled. Its
/// future and the event queue are then polled together; the stream closes on
/// the first terminal item, or once the interceptor finished and every
/// emitter is gone.
fn drive(interceptor: Arc<dyn EventInterceptor>, request: Request, next: Next) -> EventStream {
    let (sender, receiver) = mpsc::unbounded_channel();
    Box::pin(EventDriven {
        start: Some(Start {
            interceptor,
            request,
            next,
            emitter: Emitter::new(sender),
        }),
        driver: None,
        receiver,
        closed: false,
    })
}

struct Start {
    interceptor: Arc<dyn EventInterceptor>,
    request: Request,
    next: Next,
    emitter: Emitter,
}

struct EventDriven {
    start: Option<Start>,
    driver: Option<BoxFuture<'static, ()>>,
    receiver: mpsc::UnboundedReceiver<Result<HttpEvent>>,
    closed: bool,
}

impl Stream for EventDriven {
    type Item = Result<HttpEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.closed {
            return Poll::Ready(None);
        }

        if let Some(start) = this.start.take() {
            this.driver = Some(
                start
                    .interceptor
                    .intercept(start.request, start.next, start.emitter),
            );
        }

        if let Some(driver) = this.driver.as_mut()
            && driver.poll_unpin(cx).is_ready()
        {
            this.driver = None;
        }

        match this.receiver.poll_recv(cx) {
            Poll::Ready(Some(item)) => {
                if ends_stream(&item) {
                    this.closed = true;
                    this.driver = None;
                    this.receiver.close();
                }
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => {
                this.closed = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
