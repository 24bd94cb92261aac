//! Wrapped functions
//!
//! [`TracedFn`] records a full trace frame per call; [`AnnouncedFn`] prints
//! a single call-announce line. Both keep the wrapped function's
//! [`CallableMeta`] and return its result unchanged. Wrapping a wrapper is
//! allowed and nests the output.

use super::args::DebugTuple;
use super::meta::CallableMeta;
use super::tracer::{active_scope, Tracer};
use crate::inspect::Inspector;
use ddebug_core::SourceLocation;
use std::fmt::{self, Debug};

#[track_caller]
fn call_site() -> SourceLocation {
    let site = SourceLocation::caller();
    match active_scope() {
        Some(scope) => site.with_scope(scope),
        None => site,
    }
}

/// A function that records a trace frame on every call.
///
/// Arguments are passed as one tuple so each can be printed by name:
///
/// ```rust,ignore
/// let add = ddebug::dd().trace(CallableMeta::new("add").params(PARAMS), |(a, b): (i32, i32)| a + b);
/// assert_eq!(add.call((1, 2)), 3);
/// ```
pub struct TracedFn<F> {
    f: F,
    meta: CallableMeta,
    tracer: Tracer,
}

impl<F> TracedFn<F> {
    pub fn new(f: F, meta: CallableMeta, tracer: Tracer) -> Self {
        Self { f, meta, tracer }
    }

    pub fn meta(&self) -> &CallableMeta {
        &self.meta
    }

    pub fn name(&self) -> &str {
        self.meta.name()
    }

    pub fn doc(&self) -> Option<&str> {
        self.meta.doc_text()
    }

    pub fn inner(&self) -> &F {
        &self.f
    }

    pub fn into_inner(self) -> F {
        self.f
    }

    fn arg_lines<A: DebugTuple>(&self, args: &A) -> Vec<(String, String)> {
        if !self.tracer.is_active() {
            return Vec::new();
        }
        args.debug_values()
            .into_iter()
            .enumerate()
            .map(|(i, value)| (self.meta.param_name(i).into_owned(), self.tracer.repr(value)))
            .collect()
    }

    #[track_caller]
    pub fn call<A, R>(&self, args: A) -> R
    where
        F: Fn(A) -> R,
        A: DebugTuple,
        R: Debug,
    {
        let site = call_site();
        let lines = self.arg_lines(&args);
        let tracer = self.tracer.clone();
        self.tracer.run_frame(
            self.meta.qualified_name(),
            self.meta.name(),
            None,
            site,
            lines,
            || (self.f)(args),
            move |value| Some(tracer.repr(value)),
        )
    }

    #[track_caller]
    pub fn call_mut<A, R>(&mut self, args: A) -> R
    where
        F: FnMut(A) -> R,
        A: DebugTuple,
        R: Debug,
    {
        let site = call_site();
        let lines = self.arg_lines(&args);
        let tracer = self.tracer.clone();
        let f = &mut self.f;
        self.tracer.run_frame(
            self.meta.qualified_name(),
            self.meta.name(),
            None,
            site,
            lines,
            || f(args),
            move |value| Some(tracer.repr(value)),
        )
    }
}

impl<F> Debug for TracedFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedFn").field("meta", &self.meta).finish()
    }
}

/// A function that prints one call-announce line per call.
pub struct AnnouncedFn<F> {
    f: F,
    meta: CallableMeta,
    inspector: Inspector,
}

impl<F> AnnouncedFn<F> {
    pub fn new(f: F, meta: CallableMeta, inspector: Inspector) -> Self {
        Self { f, meta, inspector }
    }

    pub fn meta(&self) -> &CallableMeta {
        &self.meta
    }

    pub fn name(&self) -> &str {
        self.meta.name()
    }

    pub fn doc(&self) -> Option<&str> {
        self.meta.doc_text()
    }

    pub fn into_inner(self) -> F {
        self.f
    }

    #[track_caller]
    pub fn call<A, R>(&self, args: A) -> R
    where
        F: Fn(A) -> R,
    {
        self.inspector.announce_function(&call_site(), self.meta.name());
        (self.f)(args)
    }

    #[track_caller]
    pub fn call_mut<A, R>(&mut self, args: A) -> R
    where
        F: FnMut(A) -> R,
    {
        self.inspector.announce_function(&call_site(), self.meta.name());
        (self.f)(args)
    }
}

impl<F> Debug for AnnouncedFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnouncedFn").field("meta", &self.meta).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::ExitHooks;
    use crate::instrument::meta::ParamMeta;
    use crate::router::Router;
    use ddebug_config::{InspectConfig, TraceConfig};
    use ddebug_core::EventKind;
    use ddebug_output::{EventRecorder, MemoryBuffer, Sink};
    use std::sync::Arc;

    const PARAMS: &[ParamMeta] = &[ParamMeta::named("a"), ParamMeta::named("b")];

    fn setup() -> (Arc<Router>, MemoryBuffer, Arc<EventRecorder>) {
        let router = Arc::new(Router::new(Arc::new(ExitHooks::new())));
        let (sink, buffer) = Sink::memory();
        router.set_sink(sink);
        let recorder = Arc::new(EventRecorder::default());
        router.add_listener(recorder.clone());
        (router, buffer, recorder)
    }

    fn add_meta() -> CallableMeta {
        CallableMeta::new("add")
            .qualified("math::add")
            .doc("Add two numbers.")
            .params(PARAMS)
    }

    #[test]
    fn test_traced_call_returns_and_records() {
        let (router, buffer, recorder) = setup();
        let tracer = Tracer::new(router, TraceConfig::default().show_elapsed(false));
        let add = TracedFn::new(|(a, b): (i32, i32)| a + b, add_meta(), tracer);

        let line = line!() + 1;
        assert_eq!(add.call((1, 2)), 3);

        let lines = buffer.lines();
        assert_eq!(
            lines,
            vec![
                format!(">>> Call to math::add from function.rs:{}", line),
                "    a = 1".to_string(),
                "    b = 2".to_string(),
                "<<< Return value from add: 3".to_string(),
            ]
        );
        assert_eq!(recorder.count(EventKind::Call), 1);
    }

    #[test]
    fn test_metadata_is_preserved() {
        let (router, _, _) = setup();
        let add = TracedFn::new(
            |(a, b): (i32, i32)| a + b,
            add_meta(),
            Tracer::new(router, TraceConfig::default()),
        );
        assert_eq!(add.name(), "add");
        assert_eq!(add.meta().qualified_name(), "math::add");
        assert_eq!(add.doc(), Some("Add two numbers."));
        assert_eq!(add.meta().signature(), "add(a, b)");
    }

    #[test]
    fn test_err_values_pass_through() {
        const S: &[ParamMeta] = &[ParamMeta::named("s")];
        let (router, buffer, _) = setup();
        let tracer = Tracer::new(router, TraceConfig::default().show_elapsed(false));
        let parse = TracedFn::new(
            |(s,): (&str,)| s.parse::<i32>(),
            CallableMeta::new("parse").params(S),
            tracer,
        );
        assert!(parse.call(("x",)).is_err());
        assert!(buffer
            .lines()
            .last()
            .unwrap()
            .starts_with("<<< Return value from parse: Err("));
    }

    #[test]
    fn test_rewrapping_nests_frames() {
        let (router, buffer, _) = setup();
        let tracer = Tracer::new(router, TraceConfig::default().show_elapsed(false));
        let inner = TracedFn::new(|(a,): (i32,)| a * 2, CallableMeta::new("double"), tracer.clone());
        let outer = TracedFn::new(move |args: (i32,)| inner.call(args), CallableMeta::new("double"), tracer);

        assert_eq!(outer.call((4,)), 8);
        let calls = buffer
            .lines()
            .iter()
            .filter(|line| line.contains(">>> Call to double"))
            .count();
        assert_eq!(calls, 2);
        assert!(buffer.lines()[2].starts_with("    >>> Call to double"));
    }

    #[test]
    fn test_call_mut_keeps_state() {
        let (router, _, _) = setup();
        let mut total = 0;
        let mut acc = TracedFn::new(
            |(n,): (i32,)| {
                total += n;
                total
            },
            CallableMeta::new("acc"),
            Tracer::new(router, TraceConfig::default()),
        );
        acc.call_mut((2,));
        assert_eq!(acc.call_mut((3,)), 5);
    }

    #[test]
    fn test_announced_call_emits_one_event() {
        let (router, buffer, recorder) = setup();
        let inspector = Inspector::new(router, InspectConfig::default());
        let greet = AnnouncedFn::new(
            |name: &str| format!("hi {}", name),
            CallableMeta::new("greet"),
            inspector,
        );

        assert_eq!(greet.call("bob"), "hi bob");
        assert_eq!(recorder.count(EventKind::Call), 1);
        assert!(buffer.lines()[0].contains(": call function 'greet' +"));
    }
}
