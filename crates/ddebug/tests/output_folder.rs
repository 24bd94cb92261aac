//! Output folder and temporary file redirection
//!
//! `use_output_folder` installs a failure hook, so these tests live in
//! their own binary and run one after another behind a lock.

use ddebug::{dd, Category, Debugger, HookMode, OutputFolder, Sink};
use ddebug_ports::{NoKeypress, NoPostMortem, NoSource};
use std::sync::{Arc, Mutex};

static HOOK_LOCK: Mutex<()> = Mutex::new(());

// ============================================================================
// Helpers
// ============================================================================

fn debugger() -> Debugger {
    let debugger = Debugger::builder()
        .source_provider(Arc::new(NoSource))
        .keypress(Arc::new(NoKeypress))
        .post_mortem(Arc::new(NoPostMortem))
        .build();
    debugger.set_sink(Sink::null());
    debugger
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_output_folder_tees_each_category() {
    let _lock = HOOK_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("app_log");
    let debugger = debugger();
    let (live, buffer) = Sink::memory();
    debugger.set_category_sink(Category::Inspection, live);

    let used = debugger
        .use_output_folder(OutputFolder::new().path(&folder))
        .unwrap();
    dd!(using debugger; 40 + 2);
    let mut watched = debugger.watch(1, "w").unwrap();
    watched.set(2);
    debugger.shutdown();

    assert_eq!(used, folder);
    assert!(buffer.contents().contains("40 + 2: 42"));
    let inspection = std::fs::read_to_string(folder.join("inspection-log.txt")).unwrap();
    assert!(inspection.contains("40 + 2: 42"));
    let watch = std::fs::read_to_string(folder.join("watch-log.txt")).unwrap();
    assert!(watch.contains("w:was 1 is now 2"));
    assert_eq!(debugger.failure_hook_mode(), Some(HookMode::Immediate));
    assert!(debugger.uninstall_failure_hook());
}

#[test]
fn test_existing_folder_warns_and_second_hook_waits_for_exit() {
    let _lock = HOOK_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let debugger = debugger();
    let (live, buffer) = Sink::memory();
    debugger.set_category_sink(Category::Inspection, live);

    debugger
        .use_output_folder(OutputFolder::new().path(dir.path()))
        .unwrap();
    assert_eq!(debugger.failure_hook_mode(), Some(HookMode::Immediate));

    debugger
        .use_output_folder(OutputFolder::new().path(dir.path()))
        .unwrap();
    assert_eq!(debugger.failure_hook_mode(), Some(HookMode::AtExit));

    let warnings = buffer
        .lines()
        .into_iter()
        .filter(|line| line.starts_with("WARNING: the output folder"))
        .count();
    assert_eq!(warnings, 2);
    assert!(debugger.uninstall_failure_hook());
}

#[test]
fn test_output_folder_without_errors_installs_no_hook() {
    let _lock = HOOK_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let debugger = debugger();

    debugger
        .use_output_folder(OutputFolder::new().path(dir.path().join("quiet")).with_errors(false))
        .unwrap();

    assert_eq!(debugger.failure_hook_mode(), None);
    assert!(dir.path().join("quiet").join("rendering-log.txt").exists());
}

#[test]
fn test_live_output_continues_after_shutdown() {
    let _lock = HOOK_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("after_exit");
    let debugger = debugger();
    let (live, buffer) = Sink::memory();
    debugger.set_category_sink(Category::Inspection, live);

    debugger
        .use_output_folder(OutputFolder::new().path(&folder).with_errors(false))
        .unwrap();
    dd!(using debugger; 1);
    debugger.shutdown();
    dd!(using debugger; 2);

    assert_eq!(buffer.lines().len(), 2);
    assert!(!debugger.category_sink(Category::Inspection).is_closed());
    let inspection = std::fs::read_to_string(folder.join("inspection-log.txt")).unwrap();
    assert_eq!(inspection.lines().count(), 1);
}
