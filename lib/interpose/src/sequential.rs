//! Single-shot dispatcher.
//!
//! [`SequentialHandler`] walks the entry list with a cursor instead of a
//! pre-folded chain, and reports events through a callback. The call
//! completes once the terminal event has been delivered.

use std::sync::{Arc, OnceLock};

use futures_util::StreamExt;
use tracing::{debug, trace};

use crate::dispatcher::Dispatch;
use crate::{
    Error, HandlerBuilder, HttpBackend, HttpEvent, InterceptorEntry, PendingTasks, Request,
    Result, dispatch_sequential,
};

/// Single-shot dispatcher: `handle(request, on_event)` completes when the
/// request does.
#[derive(Clone)]
pub struct SequentialHandler {
    inner: Arc<SequentialInner>,
}

struct SequentialInner {
    dispatch: Dispatch,
    entries: OnceLock<Arc<[InterceptorEntry]>>,
}

impl std::fmt::Debug for SequentialHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialHandler")
            .field("config", self.inner.dispatch.config())
            .field("entries", &self.inner.entries.get())
            .finish_non_exhaustive()
    }
}

impl SequentialHandler {
    pub(crate) fn new(dispatch: Dispatch) -> Self {
        Self {
            inner: Arc::new(SequentialInner {
                dispatch,
                entries: OnceLock::new(),
            }),
        }
    }

    /// Starts a builder around `backend`; finish it with
    /// [`build_sequential`](HandlerBuilder::build_sequential).
    #[must_use]
    pub fn builder(backend: impl HttpBackend + 'static) -> HandlerBuilder {
        HandlerBuilder::new(backend)
    }

    /// Runs `request` through the entries, calling `on_event` for each event.
    ///
    /// Resolves after the terminal event has been delivered, or when the
    /// chain completes without one. If the request carries an
    /// [`AbortSignal`](crate::AbortSignal) that fires first, the run is
    /// dropped and no further event is delivered.
    ///
    /// # Errors
    ///
    /// Returns the chain's error, or [`Error::Aborted`] when the request's
    /// abort signal fired.
    pub async fn handle<F>(&self, request: Request, mut on_event: F) -> Result<()>
    where
        F: FnMut(HttpEvent) + Send,
    {
        let dispatch = &self.inner.dispatch;
        dispatch.check_backend();

        let _task = dispatch.track();
        let signal = request.abort_signal().cloned();
        trace!(method = %request.method(), url = %request.url(), "dispatching request");

        let mut events = dispatch_sequential(Arc::clone(self.entries()), dispatch.backend(), request);
        let run = async {
            while let Some(item) = events.next().await {
                let event = item?;
                let terminal = event.is_terminal();
                on_event(event);
                if terminal {
                    break;
                }
            }
            Ok(())
        };

        match signal {
            Some(signal) => tokio::select! {
                biased;
                () = signal.aborted() => Err(Error::Aborted),
                result = run => result,
            },
            None => run.await,
        }
    }

    /// The entry list, fixed on first access.
    #[must_use]
    pub fn entries(&self) -> &Arc<[InterceptorEntry]> {
        self.inner.entries.get_or_init(|| {
            let entries = self.inner.dispatch.merged_entries();
            debug!(interceptors = entries.len(), "fixing interceptor entries");
            entries.into()
        })
    }

    /// Returns `true` once the entry list has been fixed.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.inner.entries.get().is_some()
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

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use interpose_core::{HttpEventType, event_interceptor_fn};

    use super::*;
    use crate::{AbortSignal, EchoBackend};

    fn request() -> Request {
        Request::get("https://api.example.com/".parse().expect("url")).build()
    }

    #[tokio::test]
    async fn delivers_every_event_then_completes() {
        let handler = SequentialHandler::builder(EchoBackend::new()).build_sequential();

        let mut seen = Vec::new();
        handler
            .handle(request(), |event| seen.push(event.event_type()))
            .await
            .expect("completed");

        check!(seen == [HttpEventType::Sent, HttpEventType::Response]);
        check!(handler.pending_tasks().is_empty());
    }

    #[tokio::test]
    async fn errors_complete_the_call() {
        let handler = SequentialHandler::builder(EchoBackend::new())
            .entries([event_interceptor_fn(|_request, _next, emitter| async move {
                emitter.fail(Error::interceptor("rejected"));
            })])
            .build_sequential();

        let mut seen = 0;
        let result = handler.handle(request(), |_| seen += 1).await;

        let_assert!(Err(Error::Interceptor(message)) = result);
        check!(message == "rejected");
        check!(seen == 0);
        check!(handler.pending_tasks().is_empty());
    }

    #[tokio::test]
    async fn aborted_request_stops_without_events() {
        let handler = SequentialHandler::builder(EchoBackend::new()).build_sequential();
        let signal = AbortSignal::new();
        signal.abort();
        let request = request().to_builder().abort_signal(signal).build();

        let mut seen = 0;
        let result = handler.handle(request, |_| seen += 1).await;

        let_assert!(Err(Error::Aborted) = result);
        check!(seen == 0);
        check!(handler.pending_tasks().is_empty());
    }
}
