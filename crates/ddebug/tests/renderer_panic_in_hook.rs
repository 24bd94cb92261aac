//! A renderer that panics while the panic hook is rendering
//!
//! The failing program runs in a child copy of this test binary: if the
//! hook double-panics, the child aborts and the parent test fails instead
//! of the whole harness going down.

use ddebug::failure::PlainRenderer;
use ddebug::{Debugger, FailureHook, FsSourceProvider, Sink};
use ddebug_core::{FailureInfo, Result};
use ddebug_ports::{FailureRenderer, NoKeypress, NoPostMortem, RenderContext};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

const ARTIFACT_DIR_ENV: &str = "DDEBUG_RENDERER_PANIC_DIR";
const TEST_NAME: &str = "test_panicking_renderer_does_not_abort_the_hook";

struct Exploding;

impl FailureRenderer for Exploding {
    fn render(&self, _f: &FailureInfo, _c: &RenderContext<'_>, _o: &mut String) -> Result<()> {
        panic!("renderer exploded")
    }

    fn name(&self) -> &str {
        "exploding"
    }
}

fn divide(numerator: i32) -> i32 {
    let zero = std::hint::black_box(0);
    numerator / zero
}

fn run_failing_program(dir: &Path) {
    let debugger = Debugger::builder()
        .source_provider(Arc::new(FsSourceProvider::new()))
        .renderers(vec![Arc::new(Exploding), Arc::new(PlainRenderer)])
        .keypress(Arc::new(NoKeypress))
        .post_mortem(Arc::new(NoPostMortem))
        .build();
    let (sink, buffer) = Sink::memory();
    debugger.set_sink(sink);
    debugger.install_failure_hook(FailureHook::new().artifact_dir(dir));

    let result = catch_unwind(AssertUnwindSafe(|| divide(10)));

    assert!(debugger.uninstall_failure_hook());
    assert!(result.is_err());
    assert!(buffer
        .contents()
        .contains("FATAL renderer 'exploding' failed: panicked: renderer exploded"));
}

#[test]
fn test_panicking_renderer_does_not_abort_the_hook() {
    if let Some(dir) = std::env::var_os(ARTIFACT_DIR_ENV) {
        run_failing_program(Path::new(&dir));
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(std::env::current_exe().unwrap())
        .args([TEST_NAME, "--exact", "--test-threads=1"])
        .env(ARTIFACT_DIR_ENV, dir.path())
        .output()
        .unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "child failed: {:?}\n{}", output.status, stderr);
    assert!(!stderr.contains("panicked while processing panic"));

    let plain = std::fs::read_to_string(dir.path().join("error-plain.txt")).unwrap();
    assert!(plain.contains("attempt to divide by zero"));
    assert!(plain.contains("numerator / zero"));
    assert!(!dir.path().join("error-exploding.txt").exists());
    let combined = std::fs::read_to_string(dir.path().join("error.txt")).unwrap();
    assert!(combined.contains("attempt to divide by zero"));
}
