//! Interceptor registration.
//!
//! An [`InterceptorRegistry`] is one provider source: a shared, ordered list
//! of entries that several parts of an application may append to. A
//! dispatcher reads its sources once, on first use, and merges them with
//! [`merge_sources`].

use std::sync::{Arc, PoisonError, RwLock};

use interpose_core::{EventInterceptor, Interceptor, InterceptorEntry};

/// A cloneable handle on an ordered list of interceptor entries.
#[derive(Debug, Clone, Default)]
pub struct InterceptorRegistry {
    entries: Arc<RwLock<Vec<InterceptorEntry>>>,
}

impl InterceptorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn register(&self, entry: InterceptorEntry) -> &Self {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
        self
    }

    /// Appends a next-based interceptor.
    pub fn register_interceptor(&self, interceptor: impl Interceptor + 'static) -> &Self {
        self.register(InterceptorEntry::next_based(interceptor))
    }

    /// Appends a callback-based interceptor.
    pub fn register_event_interceptor(
        &self,
        interceptor: impl EventInterceptor + 'static,
    ) -> &Self {
        self.register(InterceptorEntry::event_based(interceptor))
    }

    /// Appends every entry of `entries`, in order.
    pub fn extend(&self, entries: impl IntoIterator<Item = InterceptorEntry>) -> &Self {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(entries);
        self
    }

    /// Snapshot of the registered entries.
    #[must_use]
    pub fn entries(&self) -> Vec<InterceptorEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<InterceptorEntry> for InterceptorRegistry {
    fn from_iter<I: IntoIterator<Item = InterceptorEntry>>(iter: I) -> Self {
        let registry = Self::new();
        registry.extend(iter);
        registry
    }
}

/// Concatenates `sources` in order, dropping every entry already seen.
///
/// Entries are compared by identity, so the same interceptor registered
/// from two sources keeps only its first position.
#[must_use]
pub fn merge_sources(sources: &[InterceptorRegistry]) -> Vec<InterceptorEntry> {
    let mut merged: Vec<InterceptorEntry> = Vec::new();
    for entry in sources.iter().flat_map(InterceptorRegistry::entries) {
        if !merged.contains(&entry) {
            merged.push(entry);
        }
    }
    merged
}
