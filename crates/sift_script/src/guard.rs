//! Panic guard
//!
//! Every public entry point runs inside [`guarded`]. Whatever happens inside,
//! the host gets a value back: cancellation is absorbed silently, errors are
//! logged through the scope with the operation name as prefix, and panics are
//! logged with the backtrace captured where they were raised.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use sift_core::{Scope, Value};

use crate::ScriptError;

thread_local! {
    static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_BACKTRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

/// Chain a panic hook that records a backtrace for panics raised inside a
/// guard and leaves every other panic to the previous hook.
fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARD_DEPTH.with(Cell::get) > 0 {
                let backtrace = Backtrace::force_capture();
                LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace));
            } else {
                previous(info);
            }
        }));
    });
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> Self {
        GUARD_DEPTH.with(|depth| depth.set(depth.get() + 1));
        DepthGuard
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        GUARD_DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

/// Run `f` for operation `op`, converting every failure into a log line and
/// [`Value::Null`].
pub fn guarded<F>(scope: &Scope, op: &str, f: F) -> Value
where
    F: FnOnce() -> Result<Value, ScriptError>,
{
    install_hook();

    let outcome = {
        let _depth = DepthGuard::enter();
        panic::catch_unwind(AssertUnwindSafe(f))
    };

    match outcome {
        Ok(Ok(value)) => value,
        Ok(Err(ScriptError::Cancelled)) => {
            tracing::debug!(op, "script cancelled");
            Value::Null
        }
        Ok(Err(err)) => {
            scope.log(format!("{op}: {err}"));
            Value::Null
        }
        Err(payload) => {
            let backtrace = LAST_BACKTRACE
                .with(|slot| slot.borrow_mut().take())
                .unwrap_or_else(Backtrace::force_capture);
            scope.log(format!(
                "PANIC {op}: {}\n{backtrace}",
                panic_message(payload.as_ref())
            ));
            Value::Null
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}
