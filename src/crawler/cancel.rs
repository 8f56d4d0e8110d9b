//! Run-scoped cancellation broadcast

use tokio_util::sync::CancellationToken;

/// Receiving side of a run's cancellation broadcast
///
/// Handed to every task handler call. Handlers poll it cooperatively: either
/// check [`CancelSignal::is_cancelled`] or race their work against
/// [`CancelSignal::cancelled`].
#[derive(Debug, Clone)]
pub struct CancelSignal {
    token: CancellationToken,
}

impl CancelSignal {
    /// A signal that never fires, for calling handlers outside a pool
    pub fn never() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the run is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// Sending side, owned by the pool
#[derive(Debug, Default)]
pub(crate) struct CancelSource {
    token: CancellationToken,
}

impl CancelSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Child tokens fire with the run but cannot cancel it themselves
    pub(crate) fn signal(&self) -> CancelSignal {
        CancelSignal {
            token: self.token.child_token(),
        }
    }

    /// Fires the signal; returns false if it had already fired
    pub(crate) fn cancel(&self) -> bool {
        let first = !self.token.is_cancelled();
        self.token.cancel();
        first
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
