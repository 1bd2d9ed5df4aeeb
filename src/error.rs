//! Structured errors and panic trapping.
//!
//! User-supplied props/render code runs behind `std::panic::catch_unwind`, logging through
//! `tracing` rather than propagating, at every point where user-authored closures run inside the
//! reactive core: watcher getters/callbacks and component lifecycle hooks.

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid watch path: {0:?}")]
    BadWatchPath(String),

    #[error("reactive API misused: {0}")]
    ReactiveMisuse(String),

    #[error("update loop exceeded the configured re-enqueue limit for watcher {watcher_id}")]
    UpdateLoopExceeded { watcher_id: u64 },

    #[error("hydration mismatch at {path}: {detail}")]
    HydrationMismatch { path: String, detail: String },

    #[error("user code panicked in {context}: {message}")]
    UserPanic { context: &'static str, message: String },
}

pub type GlobalErrorHandler = Rc<dyn Fn(&CoreError)>;

thread_local! {
    static HANDLER: RefCell<Option<GlobalErrorHandler>> = RefCell::new(None);
}

/// Installs a crate-wide handler invoked whenever [`trap_user`]/[`trap_render`] catch a panic, or
/// whenever any other part of the runtime reports a [`CoreError`] it can't return to a caller
/// (e.g. a scheduler invariant violation). Replacing the handler returns the previous one, if any.
pub fn set_global_error_handler(handler: GlobalErrorHandler) -> Option<GlobalErrorHandler> {
    HANDLER.with(|h| h.borrow_mut().replace(handler))
}

pub fn report(err: CoreError) {
    tracing::error!(%err, "core error reported");
    HANDLER.with(|h| {
        if let Some(handler) = &*h.borrow() {
            handler(&err);
        }
    });
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs `f`, catching any panic and routing it through [`report`] instead of unwinding past the
/// reactive core. Used for user watcher getters/callbacks, where a panic in one watcher must not
/// take down an unrelated flush.
pub fn trap_user<T>(context: &'static str, f: impl FnOnce() -> T) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            report(CoreError::UserPanic {
                context,
                message: panic_message(&payload),
            });
            None
        }
    }
}

/// Same as [`trap_user`] but for render functions and lifecycle hooks, which run far more often
/// per tick; kept as a separate name so call sites read as self-documenting about which kind of
/// user code is being trapped.
pub fn trap_render<T>(f: impl FnOnce() -> T) -> Option<T> {
    trap_user("render", f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn trap_user_catches_panics_and_returns_none() {
        let result = trap_user("test", || -> i32 { panic!("boom") });
        assert!(result.is_none());
    }

    #[test]
    fn trap_user_passes_through_successful_values() {
        let result = trap_user("test", || 42);
        assert_eq!(result, Some(42));
    }

    #[test]
    fn global_handler_is_invoked_on_panic() {
        thread_local! {
            static SEEN: Cell<bool> = Cell::new(false);
        }
        set_global_error_handler(Rc::new(|_err| SEEN.with(|s| s.set(true))));
        let _ = trap_user("test", || -> () { panic!("boom") });
        assert!(SEEN.with(|s| s.get()));
    }
}
