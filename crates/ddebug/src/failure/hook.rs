//! Panic hook installation
//!
//! Two modes share the pipeline: `Immediate` renders inside the panic hook,
//! `AtExit` only records the failure and replays the last one from the
//! exit-hook registry.
//!
//! The hook runs before the panic unwinds, so it cannot know whether a
//! caller up the stack will stop it with `catch_unwind`. Caught panics are
//! rendered (or recorded) like any other; `uninstall` the hook around code
//! that uses panics for control flow. Panics raised on a renderer thread
//! while the pipeline is running go to the previous hook only.

use super::pipeline::{in_pipeline, FailurePipeline};
use super::{is_debugger_exit, FailureHook};
use crate::exit::ExitHooks;
use ddebug_core::{panic_message, FailureInfo, SourceLocation};
use ddebug_logging::{debug, info};
use std::backtrace::Backtrace;
use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, Weak};

/// Exit-hook name of the deferred failure replay.
pub const FAILURE_REPLAY_HOOK: &str = "failure-replay";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookMode {
    /// Render while the panic is being raised
    Immediate,
    /// Record the panic, render it when exit hooks run
    AtExit,
}

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static>;

/// A hook installed by one `Debugger`, with the hook it replaced.
pub(crate) struct InstalledHook {
    mode: HookMode,
    previous: Arc<PanicHook>,
}

impl InstalledHook {
    pub(crate) fn mode(&self) -> HookMode {
        self.mode
    }
}

/// Build a [`FailureInfo`] from a panic.
///
/// The scope of the location is taken from the first program frame of the
/// backtrace.
pub fn capture(info: &PanicHookInfo<'_>) -> FailureInfo {
    let location = info.location().map(SourceLocation::from);
    let thread = std::thread::current()
        .name()
        .unwrap_or("<unnamed>")
        .to_string();
    let mut failure = FailureInfo::panic(panic_message(info.payload()), location)
        .with_thread(thread)
        .with_backtrace(Backtrace::force_capture().to_string());

    if let Some(frame) = failure.user_frames().into_iter().next() {
        if let Some(loc) = failure.location.take() {
            failure.location = Some(loc.with_scope(frame.name));
        }
    }
    failure
}

/// Replace the process panic hook.
pub(crate) fn install(
    pipeline: &Arc<FailurePipeline>,
    exit: &ExitHooks,
    mode: HookMode,
    options: FailureHook,
) -> InstalledHook {
    pipeline.set_artifact_dir(options.artifact_dir.clone());

    let previous: Arc<PanicHook> = Arc::new(panic::take_hook());
    let chained = Arc::clone(&previous);
    let hooked = Arc::clone(pipeline);
    let call_previous = options.call_previous;

    panic::set_hook(Box::new(move |info| {
        if is_debugger_exit(info.payload()) {
            return;
        }
        if in_pipeline() {
            // a renderer panicked while handling a failure
            chained(info);
            return;
        }
        let failure = capture(info);
        match mode {
            HookMode::Immediate => {
                hooked.handle(failure);
            }
            HookMode::AtExit => hooked.record(failure),
        }
        if call_previous {
            chained(info);
        }
    }));

    if mode == HookMode::AtExit {
        let weak: Weak<FailurePipeline> = Arc::downgrade(pipeline);
        exit.register(FAILURE_REPLAY_HOOK, move || {
            if let Some(pipeline) = weak.upgrade() {
                pipeline.replay_last();
            }
        });
    }

    info!(?mode, artifacts = ?options.artifact_dir, "Failure hook installed");
    InstalledHook { mode, previous }
}

/// Put back the hook that was active before [`install`].
pub(crate) fn uninstall(installed: InstalledHook, exit: &ExitHooks) {
    // Dropping our hook releases its clone of `previous`.
    drop(panic::take_hook());
    if installed.mode == HookMode::AtExit {
        exit.remove(FAILURE_REPLAY_HOOK);
    }
    match Arc::try_unwrap(installed.previous) {
        Ok(previous) => panic::set_hook(previous),
        Err(shared) => panic::set_hook(Box::new(move |info| shared(info))),
    }
    debug!("Failure hook uninstalled");
}
