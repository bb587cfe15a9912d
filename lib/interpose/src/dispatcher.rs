//! The interceptor dispatcher.
//!
//! [`InterceptorHandler`] owns the lazily built [`Chain`] and wraps every
//! dispatch with pending-task tracking. The chain is built on the first call
//! to [`handle`](InterceptorHandler::handle) from the registered sources as
//! they are at that moment, then reused for the lifetime of the handler:
//! entries registered afterwards are not picked up.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::{StreamExt, stream};
use tower_service::Service;
use tracing::{debug, trace, warn};

use crate::{
    Chain, DispatcherConfig, Error, EventStream, HttpBackend, HttpEvent, InterceptorEntry,
    InterceptorRegistry, PendingTask, PendingTasks, Request, Response, Result, SequentialHandler,
    merge_sources,
};

// ============================================================================
// Shared state
// ============================================================================

/// State shared by both dispatcher variants.
pub(crate) struct Dispatch {
    backend: Arc<dyn HttpBackend>,
    sources: Vec<InterceptorRegistry>,
    pending: PendingTasks,
    config: DispatcherConfig,
    backend_warned: AtomicBool,
}

impl Dispatch {
    /// Merged entries of every source, deduplicated.
    pub(crate) fn merged_entries(&self) -> Vec<InterceptorEntry> {
        merge_sources(&self.sources)
    }

    pub(crate) fn backend(&self) -> Arc<dyn HttpBackend> {
        Arc::clone(&self.backend)
    }

    /// Acquires a pending task if tracking is enabled.
    pub(crate) fn track(&self) -> Option<PendingTask> {
        self.config.track_pending.then(|| self.pending.add())
    }

    /// Warns once per handler when a non-server backend serves a server environment.
    pub(crate) fn check_backend(&self) {
        if self.config.server_environment
            && !self.backend.is_server_capable()
            && !self.backend_warned.swap(true, Ordering::Relaxed)
        {
            warn!(
                "the configured HTTP backend is not suited for server environments; \
                 prefer a server-capable backend such as `HyperBackend`"
            );
        }
    }

    pub(crate) fn backend_warned(&self) -> bool {
        self.backend_warned.load(Ordering::Relaxed)
    }

    pub(crate) fn reset_backend_warning(&self) {
        self.backend_warned.store(false, Ordering::Relaxed);
    }

    pub(crate) const fn pending(&self) -> &PendingTasks {
        &self.pending
    }

    pub(crate) const fn config(&self) -> &DispatcherConfig {
        &self.config
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`InterceptorHandler`] and [`SequentialHandler`].
///
/// # Example
///
/// ```
/// use interpose::{EchoBackend, InterceptorHandler, InterceptorRegistry};
/// use interpose::interceptors::SetHeaders;
///
/// let root = InterceptorRegistry::new();
/// root.register_interceptor(SetHeaders::new().header("X-A", "1"));
///
/// let handler = InterceptorHandler::builder(EchoBackend::new())
///     .interceptors(root)
///     .build();
/// assert!(!handler.is_built());
/// ```
pub struct HandlerBuilder {
    backend: Arc<dyn HttpBackend>,
    sources: Vec<InterceptorRegistry>,
    pending: Option<PendingTasks>,
    config: DispatcherConfig,
}

impl std::fmt::Debug for HandlerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerBuilder")
            .field("sources", &self.sources.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HandlerBuilder {
    /// Starts a builder around `backend`.
    #[must_use]
    pub fn new(backend: impl HttpBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            sources: Vec::new(),
            pending: None,
            config: DispatcherConfig::default(),
        }
    }

    /// Adds a provider source.
    ///
    /// Sources are merged in the order they are added, so add the root
    /// source first.
    #[must_use]
    pub fn interceptors(mut self, source: InterceptorRegistry) -> Self {
        self.sources.push(source);
        self
    }

    /// Adds `entries` as an anonymous source.
    #[must_use]
    pub fn entries(self, entries: impl IntoIterator<Item = InterceptorEntry>) -> Self {
        self.interceptors(entries.into_iter().collect())
    }

    /// Tracks requests in `pending` instead of a private registry.
    #[must_use]
    pub fn pending_tasks(mut self, pending: PendingTasks) -> Self {
        self.pending = Some(pending);
        self
    }

    /// Replaces the dispatcher configuration.
    #[must_use]
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Set whether requests are tracked as pending tasks.
    #[must_use]
    pub fn track_pending(mut self, track: bool) -> Self {
        self.config.track_pending = track;
        self
    }

    /// Set whether the handler runs in a server environment.
    #[must_use]
    pub fn server_environment(mut self, server: bool) -> Self {
        self.config.server_environment = server;
        self
    }

    fn into_dispatch(self) -> Dispatch {
        Dispatch {
            backend: self.backend,
            sources: self.sources,
            pending: self.pending.unwrap_or_default(),
            config: self.config,
            backend_warned: AtomicBool::new(false),
        }
    }

    /// Builds the stream dispatcher.
    #[must_use]
    pub fn build(self) -> InterceptorHandler {
        InterceptorHandler {
            inner: Arc::new(HandlerInner {
                dispatch: self.into_dispatch(),
                chain: OnceLock::new(),
            }),
        }
    }

    /// Builds the single-shot dispatcher.
    #[must_use]
    pub fn build_sequential(self) -> SequentialHandler {
        SequentialHandler::new(self.into_dispatch())
    }
}

// ============================================================================
// Stream dispatcher
// ============================================================================

struct HandlerInner {
    dispatch: Dispatch,
    chain: OnceLock<Chain>,
}

/// Stream dispatcher: runs each request through the cached chain.
///
/// Cheap to clone; clones share the chain, the pending-task registry and the
/// backend warning state.
#[derive(Clone)]
pub struct InterceptorHandler {
    inner: Arc<HandlerInner>,
}

impl std::fmt::Debug for InterceptorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorHandler")
            .field("config", self.inner.dispatch.config())
            .field("chain", &self.inner.chain.get())
            .finish_non_exhaustive()
    }
}

impl InterceptorHandler {
    /// Starts a builder around `backend`.
    #[must_use]
    pub fn builder(backend: impl HttpBackend + 'static) -> HandlerBuilder {
        HandlerBuilder::new(backend)
    }

    /// Runs `request` through the chain.
    ///
    /// The chain is built on the first call. The returned stream is cold:
    /// no interceptor runs before it is polled. When tracking is enabled a
    /// pending task is held from this call until the stream yields its
    /// terminal item, ends, or is dropped.
    #[must_use]
    pub fn handle(&self, request: Request) -> EventStream {
        let dispatch = &self.inner.dispatch;
        dispatch.check_backend();

        let chain = self.chain().clone();
        let terminal = dispatch.backend();
        let task = dispatch.track();
        trace!(method = %request.method(), url = %request.url(), "dispatching request");

        let events: EventStream =
            Box::pin(stream::once(async move { chain.call(request, terminal) }).flatten());
        Box::pin(Tracked { events, task })
    }

    /// Runs `request` and waits for its response.
    ///
    /// Non-terminal events are discarded.
    ///
    /// # Errors
    ///
    /// Returns the chain's error, or [`Error::Interceptor`] if the chain
    /// completed without producing a response.
    pub async fn send(&self, request: Request) -> Result<Response> {
        let mut events = self.handle(request);
        while let Some(item) = events.next().await {
            if let HttpEvent::Response(response) = item? {
                return Ok(response);
            }
        }
        Err(Error::interceptor("the chain completed without a response"))
    }

    /// The composed chain, built on first access.
    #[must_use]
    pub fn chain(&self) -> &Chain {
        self.inner.chain.get_or_init(|| {
            let entries = self.inner.dispatch.merged_entries();
            debug!(interceptors = entries.len(), "building interceptor chain");
            Chain::build(entries)
        })
    }

    /// Returns `true` once the chain has been built.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.inner.chain.get().is_some()
    }

    /// The registry tracking this handler's requests.
    #[must_use]
    pub fn pending_tasks(&self) -> &PendingTasks {
        self.inner.dispatch.pending()
    }

    /// Returns `true` once the backend warning has been emitted.
    #[must_use]
    pub fn backend_warning_emitted(&self) -> bool {
        self.inner.dispatch.backend_warned()
    }

    /// Re-arms the one-time backend warning.
    pub fn reset_backend_warning(&self) {
        self.inner.dispatch.reset_backend_warning();
    }
}

/// Holds a pending task until the wrapped stream terminates.
struct Tracked {
    events: EventStream,
    task: Option<PendingTask>,
}

impl Stream for Tracked {
    type Item = Result<HttpEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let item = std::task::ready!(self.events.poll_next_unpin(cx));
        let terminal = match &item {
            None | Some(Err(_)) => true,
            Some(Ok(event)) => event.is_terminal(),
        };
        if terminal {
            self.task = None;
        }
        Poll::Ready(item)
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

/// Future type for the Tower Service implementation.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

impl Service<Request> for InterceptorHandler {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { handler.send(request).await })
    }
}
