//! Chain construction.
//!
//! [`Chain::build`] folds an ordered entry list right-to-left into a single
//! function, so that at runtime `entries[0]` sees the request first and the
//! response last. [`dispatch_sequential`] walks the same list with a cursor
//! instead, one entry per step, without folding anything up front.

use std::fmt;
use std::sync::Arc;

use crate::{EventStream, HttpBackend, InterceptorEntry, Next, Request};

/// Composed handler: `(request, terminal) -> events`.
pub(crate) type ChainFn = Arc<dyn Fn(Request, Arc<dyn HttpBackend>) -> EventStream + Send + Sync>;

/// The composed interceptor chain.
///
/// Cheap to clone; clones share the same composed function.
#[derive(Clone)]
pub struct Chain {
    run: ChainFn,
    entries: Arc<[InterceptorEntry]>,
    // Every folded step, outermost first. Dropped after `run`, so the steps
    // are released one at a time instead of recursively.
    steps: Arc<[ChainFn]>,
}

impl Chain {
    /// Folds `entries` around a terminal pass-through.
    #[must_use]
    pub fn build(entries: impl Into<Arc<[InterceptorEntry]>>) -> Self {
        let entries = entries.into();
        let pass_through: ChainFn =
            Arc::new(|request: Request, terminal: Arc<dyn HttpBackend>| terminal.handle(request));

        let mut steps = Vec::with_capacity(entries.len());
        let run = entries
            .iter()
            .enumerate()
            .rev()
            .fold(pass_through, |downstream, (index, entry)| {
                let entry = entry.clone();
                let step: ChainFn = Arc::new(move |request, terminal| {
                    let next = Next::folded(Arc::clone(&downstream), terminal, index + 1);
                    entry.dispatch(request, next)
                });
                steps.push(Arc::clone(&step));
                step
            });
        steps.reverse();

        Self {
            run,
            entries,
            steps: steps.into(),
        }
    }

    /// Runs `request` through the chain, ending at `terminal`.
    ///
    /// Each call is an independent run; only the construction is shared.
    #[must_use]
    pub fn call(&self, request: Request, terminal: Arc<dyn HttpBackend>) -> EventStream {
        (self.run)(request, terminal)
    }

    /// The entries this chain was built from, outermost first.
    #[must_use]
    pub fn entries(&self) -> &[InterceptorEntry] {
        &self.entries
    }

    /// Number of interceptors in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the chain goes straight to the terminal handler.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if both chains share the same composed function.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
            && Arc::ptr_eq(&self.steps, &other.steps)
            && std::ptr::addr_eq(Arc::as_ptr(&self.run), Arc::as_ptr(&other.run))
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

/// Runs `request` through `entries` one step at a time, ending at `terminal`.
///
/// The cursor is the index of the next entry to run, starting at `0`. Each
/// continuation holds the following index, and reaching the end of the list
/// hands the request to `terminal`. Stack depth stays bounded however long
/// the list is: every 32 entries the walk continues on a spawned task.
#[must_use]
pub fn dispatch_sequential(
    entries: Arc<[InterceptorEntry]>,
    terminal: Arc<dyn HttpBackend>,
    request: Request,
) -> EventStream {
    dispatch_from(&entries, 0, &terminal, request)
}

pub(crate) fn dispatch_from(
    entries: &Arc<[InterceptorEntry]>,
    position: usize,
    terminal: &Arc<dyn HttpBackend>,
    request: Request,
) -> EventStream {
    match entries.get(position) {
        Some(entry) => entry.dispatch(
            request,
            Next::cursor(Arc::clone(entries), position + 1, Arc::clone(terminal)),
        ),
        None => terminal.handle(request),
    }
}
