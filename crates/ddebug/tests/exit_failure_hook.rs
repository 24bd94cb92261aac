//! Exit-time failure hook
//!
//! The panic is only recorded; rendering and artifacts wait for the exit
//! hooks. Runs in its own test binary because it replaces the panic hook.

use ddebug::{Debugger, FailureHook, HookMode, Sink};
use ddebug_ports::{NoKeypress, NoPostMortem, NoSource};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

#[test]
fn test_failure_is_rendered_at_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let debugger = Debugger::builder()
        .source_provider(Arc::new(NoSource))
        .keypress(Arc::new(NoKeypress))
        .post_mortem(Arc::new(NoPostMortem))
        .build();
    let (sink, buffer) = Sink::memory();
    debugger.set_sink(sink);
    debugger.install_exit_failure_hook(FailureHook::new().artifact_dir(dir.path()));
    assert_eq!(debugger.failure_hook_mode(), Some(HookMode::AtExit));

    let first = catch_unwind(|| panic!("first failure"));
    let last = catch_unwind(AssertUnwindSafe(|| panic!("last failure")));
    assert!(first.is_err() && last.is_err());

    assert!(buffer.is_empty());
    assert!(!dir.path().join("error.txt").exists());
    assert!(debugger.pipeline().has_recorded());

    assert_eq!(debugger.shutdown(), 1);

    let shown = buffer.contents();
    assert!(shown.contains("last failure"));
    assert!(!shown.contains("first failure"));
    let combined = std::fs::read_to_string(dir.path().join("error.txt")).unwrap();
    assert!(combined.contains("last failure"));

    // exit hooks run once
    assert_eq!(debugger.shutdown(), 0);
    assert!(debugger.uninstall_failure_hook());
}
