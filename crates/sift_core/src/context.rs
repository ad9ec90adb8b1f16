//! Execution contexts
//!
//! An [`ExecutionContext`] is the lifetime of one logical request. It ends
//! exactly once, either cancelled or completed; dropping every handle counts as
//! completion. Work bound to a context observes the end through [`DoneSignal`],
//! which does not keep the context alive.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::watch;

/// Why an execution context ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Cancelled,
    Completed,
}

struct Inner {
    state: watch::Sender<Option<EndReason>>,
}

impl Inner {
    fn end(&self, reason: EndReason) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(reason);
            true
        })
    }
}

/// Cloneable handle to a request's execution context.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<Inner>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner { state }),
        }
    }

    /// End the context as cancelled. Has no effect if it already ended.
    pub fn cancel(&self) {
        if self.inner.end(EndReason::Cancelled) {
            tracing::debug!("execution context cancelled");
        }
    }

    /// End the context as completed. Has no effect if it already ended.
    pub fn complete(&self) {
        self.inner.end(EndReason::Completed);
    }

    pub fn is_done(&self) -> bool {
        self.inner.state.borrow().is_some()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        *self.inner.state.borrow()
    }

    /// Wait until the context ends.
    pub async fn done(&self) -> EndReason {
        self.signal().wait().await
    }

    /// A detached signal that resolves when this context ends.
    pub fn signal(&self) -> DoneSignal {
        DoneSignal {
            rx: self.inner.state.subscribe(),
        }
    }

    /// Cancel the context once `timeout` elapses.
    ///
    /// Must be called from within a tokio runtime. The timer holds only a weak
    /// reference, so it never extends the context's lifetime.
    pub fn cancel_after(&self, timeout: Duration) -> tokio::task::JoinHandle<()> {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = inner.upgrade() {
                if inner.end(EndReason::Cancelled) {
                    tracing::debug!(?timeout, "execution context timed out");
                }
            }
        })
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("end_reason", &self.end_reason())
            .finish()
    }
}

/// Observer for the end of an [`ExecutionContext`].
pub struct DoneSignal {
    rx: watch::Receiver<Option<EndReason>>,
}

impl DoneSignal {
    /// Resolve once the context ends. If every context handle was dropped
    /// without an explicit end, the context counts as completed.
    pub async fn wait(mut self) -> EndReason {
        let ended = self
            .rx
            .wait_for(|state| state.is_some())
            .await
            .ok()
            .and_then(|state| *state);
        ended.unwrap_or(EndReason::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_end_wins() {
        let ctx = ExecutionContext::new();
        assert!(!ctx.is_done());

        ctx.cancel();
        ctx.complete();
        assert_eq!(ctx.end_reason(), Some(EndReason::Cancelled));
    }

    #[tokio::test]
    async fn test_done_after_cancel() {
        let ctx = ExecutionContext::new();
        let signal = ctx.signal();

        let remote = ctx.clone();
        tokio::spawn(async move { remote.cancel() });

        assert_eq!(signal.wait().await, EndReason::Cancelled);
        assert_eq!(ctx.done().await, EndReason::Cancelled);
    }

    #[tokio::test]
    async fn test_drop_counts_as_completion() {
        let ctx = ExecutionContext::new();
        let signal = ctx.signal();
        drop(ctx);

        assert_eq!(signal.wait().await, EndReason::Completed);
    }

    #[tokio::test]
    async fn test_cancel_after() {
        let ctx = ExecutionContext::new();
        ctx.cancel_after(Duration::from_millis(10));

        assert_eq!(ctx.done().await, EndReason::Cancelled);
    }
}
