//! Per-request cancellation.

use tokio_util::sync::CancellationToken;

/// Cooperative cancellation handle attached to a [`Request`](crate::Request).
///
/// Clones share the same state: aborting any clone aborts them all. Backends
/// stop the underlying transport and emit no further events once the signal
/// fires; interceptors holding the request are expected to check it themselves.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    /// Creates a signal that has not fired yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal.
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// Returns `true` once [`abort`](Self::abort) has been called on any clone.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the signal fires.
    pub async fn aborted(&self) {
        self.token.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    #[test]
    fn clones_share_state() {
        let signal = AbortSignal::new();
        let clone = signal.clone();
        check!(!clone.is_aborted());

        signal.abort();
        check!(clone.is_aborted());
    }

    #[tokio::test]
    async fn aborted_completes_after_abort() {
        let signal = AbortSignal::new();
        let waiter = signal.clone();
        signal.abort();
        waiter.aborted().await;
        check!(waiter.is_aborted());
    }
}
