//! Cancellation watcher
//!
//! Bridges the end of an execution context into an interpreter's
//! [`InterruptChannel`]. Each interpreter owns exactly one watcher; it delivers
//! at most one directive and exits, or exits silently when its interpreter is
//! released first.

use std::sync::Arc;
use std::thread;

use sift_core::DoneSignal;
use tokio::runtime::{Builder, Handle, RuntimeFlavor};
use tokio::sync::oneshot;

use crate::engine::InterruptChannel;
use crate::ScriptError;

pub struct Watcher {
    release: oneshot::Sender<()>,
}

impl Watcher {
    /// Start watching `signal` on behalf of `channel`.
    ///
    /// Runs as a task on the current multi-thread tokio runtime. Outside
    /// tokio, or on a current-thread runtime whose only thread is about to
    /// block in the script, it runs on a dedicated thread with its own
    /// current-thread runtime.
    pub fn spawn(signal: DoneSignal, channel: Arc<InterruptChannel>) -> Result<Self, ScriptError> {
        let (release, released) = oneshot::channel();
        let task = watch(signal, channel, released);

        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() != RuntimeFlavor::CurrentThread => {
                handle.spawn(task);
            }
            _ => {
                let runtime = Builder::new_current_thread().build()?;
                thread::Builder::new()
                    .name("sift-watcher".into())
                    .spawn(move || runtime.block_on(task))?;
            }
        }

        Ok(Self { release })
    }

    /// Whether the watcher has exited (directive delivered or released).
    pub fn is_finished(&self) -> bool {
        self.release.is_closed()
    }
}

async fn watch(signal: DoneSignal, channel: Arc<InterruptChannel>, released: oneshot::Receiver<()>) {
    tokio::select! {
        biased;

        _ = released => {
            tracing::debug!("interpreter released, watcher exiting");
        }
        reason = signal.wait() => {
            tracing::debug!(?reason, "execution context ended, delivering abort directive");
            channel.deliver();
        }
    }
}
