//! Immediate failure hook
//!
//! Installs the process panic hook, so it runs in its own test binary with
//! a single test.

use ddebug::{Debugger, FailureHook, FsSourceProvider, HookMode, Sink};
use ddebug_ports::{NoKeypress, NoPostMortem};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

fn divide(numerator: i32) -> i32 {
    let zero = std::hint::black_box(0);
    numerator / zero
}

#[test]
fn test_panic_renders_and_writes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let debugger = Debugger::builder()
        .source_provider(Arc::new(FsSourceProvider::new()))
        .keypress(Arc::new(NoKeypress))
        .post_mortem(Arc::new(NoPostMortem))
        .build();
    let (sink, buffer) = Sink::memory();
    debugger.set_sink(sink);
    debugger.install_failure_hook(FailureHook::new().artifact_dir(dir.path()));
    assert_eq!(debugger.failure_hook_mode(), Some(HookMode::Immediate));

    let result = catch_unwind(AssertUnwindSafe(|| divide(10)));

    assert!(debugger.uninstall_failure_hook());
    assert!(result.is_err());

    let shown = buffer.contents();
    assert!(shown.contains("attempt to divide by zero"));

    let plain = std::fs::read_to_string(dir.path().join("error-plain.txt")).unwrap();
    assert!(plain.contains("numerator / zero"));
    assert!(plain.contains("failure_artifacts.rs"));

    let explanation = std::fs::read_to_string(dir.path().join("error-explanation.txt")).unwrap();
    assert!(explanation.contains("divid"));

    let combined = std::fs::read_to_string(dir.path().join("error.txt")).unwrap();
    assert!(combined.contains("numerator / zero"));
    assert!(combined.contains("divid"));
}
