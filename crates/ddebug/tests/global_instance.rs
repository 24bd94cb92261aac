//! The process-wide debugger and the function-item form of `dd!`
//!
//! Only this binary touches `ddebug::dd()`, and it does so from a single
//! test so the shared sink is not raced.

use ddebug::{dd, step, trace_var, EventKind, EventRecorder, Sink};
use std::sync::Arc;

dd! {
    /// Sum two numbers, one step at a time.
    fn add(a: i32, b: i32) -> i32 {
        let sum = a + b;
        step!("summed {} and {}", a, b);
        trace_var!(sum);
        sum
    }
}

dd! {
    #[inline(never)]
    /// Count down to zero.
    pub(crate) fn countdown(from: u32) {
        let mut n = from;
        while n > 0 {
            step!("{} left", n);
            n -= 1;
        }
    }
}

#[test]
fn test_global_debugger() {
    let debugger = ddebug::dd();
    let (sink, buffer) = Sink::memory();
    let recorder = Arc::new(EventRecorder::default());
    debugger.set_enabled(true);
    debugger.set_sink(sink);
    debugger.add_listener(recorder.clone());
    assert!(std::ptr::eq(debugger, ddebug::dd()));

    let doubled = dd!(21 * 2);
    assert_eq!(doubled, 42);
    assert!(buffer.lines()[0].contains("in global_instance::test_global_debugger: 21 * 2: 42"));

    buffer.clear();
    assert_eq!(add(2, 3), 5);

    let lines = buffer.lines();
    assert!(lines[0].contains(">>> Call to global_instance::add from global_instance.rs:"));
    assert!(lines.iter().any(|line| line.ends_with("a = 2")));
    assert!(lines.iter().any(|line| line.ends_with("| summed 2 and 3")));
    assert!(lines.iter().any(|line| line.contains("sum = 5")));
    assert!(lines.iter().any(|line| line.ends_with("<<< Return value from add: 5")));
    assert_eq!(recorder.count(EventKind::Call), 1);

    buffer.clear();
    countdown(2);
    let lines = buffer.lines();
    assert!(lines[0].contains(">>> Call to global_instance::countdown from global_instance.rs:"));
    assert!(lines.iter().any(|line| line.ends_with("| 2 left")));
    assert!(lines.iter().any(|line| line.ends_with("<<< Return value from countdown: ()")));
    assert_eq!(recorder.count(EventKind::Call), 2);
}
