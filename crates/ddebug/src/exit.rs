//! Exit-hook registry
//!
//! Rust has no `atexit` in std. Cleanup that must run at normal process
//! exit (closing durable logs, replaying a deferred failure) is registered
//! here and runs when the [`ExitGuard`] held by `main` is dropped, or on an
//! explicit [`ExitHooks::run`]. Every hook runs at most once.

use ddebug_logging::{debug, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

type Hook = Box<dyn FnOnce() + Send>;

/// Named cleanup hooks, run last-registered first.
#[derive(Default)]
pub struct ExitHooks {
    hooks: Mutex<Vec<(String, Hook)>>,
}

impl ExitHooks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(String, Hook)>> {
        self.hooks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `hook` under `name`, replacing a pending hook with that name.
    pub fn register<F>(&self, name: impl Into<String>, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let name = name.into();
        let mut hooks = self.lock();
        hooks.retain(|(existing, _)| *existing != name);
        debug!(hook = %name, "Registered exit hook");
        hooks.push((name, Box::new(hook)));
    }

    /// Drop a pending hook without running it. Returns true if one was pending.
    pub fn remove(&self, name: &str) -> bool {
        let mut hooks = self.lock();
        let before = hooks.len();
        hooks.retain(|(existing, _)| existing != name);
        hooks.len() != before
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.lock().iter().any(|(existing, _)| existing == name)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run and drop every pending hook. Returns how many ran.
    ///
    /// A panicking hook is logged and the remaining hooks still run.
    pub fn run(&self) -> usize {
        let hooks = std::mem::take(&mut *self.lock());
        let count = hooks.len();
        for (name, hook) in hooks.into_iter().rev() {
            debug!(hook = %name, "Running exit hook");
            if catch_unwind(AssertUnwindSafe(hook)).is_err() {
                warn!(hook = %name, "Exit hook panicked");
            }
        }
        count
    }
}

/// Runs the registered exit hooks when dropped.
///
/// ```rust,ignore
/// fn main() {
///     let _exit = ddebug::dd().exit_guard();
///     // ...
/// } // logs closed, deferred failure rendered
/// ```
#[must_use = "exit hooks run when the guard is dropped"]
pub struct ExitGuard {
    hooks: Arc<ExitHooks>,
}

impl ExitGuard {
    pub(crate) fn new(hooks: Arc<ExitHooks>) -> Self {
        Self { hooks }
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.hooks.run();
    }
}
