// ABOUTME: Close-once exit signal used to coordinate shutdown across tasks
// ABOUTME: Thin wrapper over a cancellation token; signalling twice is a no-op

use tokio_util::sync::CancellationToken;

/// Idempotent, close-once cancellation primitive.
///
/// Clones share the same underlying signal. Any number of tasks may call
/// [`ExitSignal::signal`] concurrently; only the first call has an effect.
#[derive(Debug, Clone, Default)]
pub struct ExitSignal {
    token: CancellationToken,
}

impl ExitSignal {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Fire the signal. Safe to call repeatedly and from racing tasks.
    pub fn signal(&self) {
        self.token.cancel();
    }

    /// Whether the signal has fired
    pub fn is_signaled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Suspend until the signal fires. Returns immediately if it already has.
    pub async fn wait(&self) {
        self.token.cancelled().await
    }
}
