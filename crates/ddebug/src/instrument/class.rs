//! Instrumented types
//!
//! Rust types cannot have their methods replaced, so an instrumented value
//! is a proxy: calls go through [`Instrumented::call`] or
//! [`Instrumented::call_mut`] with the method name and a closure invoking
//! the real method.
//!
//! ```rust,ignore
//! let counter = ddebug::dd().instrument(Counter::default(), ClassMeta::of::<Counter>());
//! let n = counter.call("foo", |c| c.foo(123));
//! ```
//!
//! Public methods (names not starting with `_`) report the call; the rest
//! are forwarded silently. When the [`ClassMeta`] lists methods, a name
//! missing from the list is forwarded silently too, with a warning. There is
//! no `Deref` to the wrapped value: raw access goes through
//! [`Instrumented::get`]. Results and panics pass through untouched.

use super::meta::{is_public_method, ClassMeta, ClassMode};
use super::tracer::{active_scope, Tracer};
use crate::inspect::Inspector;
use ddebug_core::SourceLocation;
use ddebug_logging::warn;
use std::fmt;

/// Proxy reporting method calls on the wrapped value.
pub struct Instrumented<T> {
    inner: T,
    meta: ClassMeta,
    inspector: Inspector,
    tracer: Tracer,
}

fn dispatch<R>(
    meta: &ClassMeta,
    inspector: &Inspector,
    tracer: &Tracer,
    site: SourceLocation,
    method: &str,
    f: impl FnOnce() -> R,
) -> R {
    if !is_public_method(method) {
        return f();
    }
    if !meta.declares(method) {
        warn!(class = %meta.name(), method, "Method is not in the class table, call not reported");
        return f();
    }
    let site = match active_scope() {
        Some(scope) => site.with_scope(scope),
        None => site,
    };
    match meta.class_mode() {
        ClassMode::Announce => {
            inspector.announce_method(&site, method, meta.name());
            f()
        }
        ClassMode::Trace => {
            let qualified = format!("{}::{}", meta.name(), method);
            tracer.run_frame(&qualified, method, Some(meta.name()), site, Vec::new(), f, |_| None)
        }
    }
}

impl<T> Instrumented<T> {
    pub fn new(inner: T, meta: ClassMeta, inspector: Inspector, tracer: Tracer) -> Self {
        Self {
            inner,
            meta,
            inspector,
            tracer,
        }
    }

    pub fn meta(&self) -> &ClassMeta {
        &self.meta
    }

    /// Direct access, bypassing instrumentation.
    pub fn get(&self) -> &T {
        &self.inner
    }

    /// Direct mutable access, bypassing instrumentation.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Call `method` through `f`, reporting it when public.
    #[track_caller]
    pub fn call<R>(&self, method: &str, f: impl FnOnce(&T) -> R) -> R {
        let site = SourceLocation::caller();
        let inner = &self.inner;
        dispatch(&self.meta, &self.inspector, &self.tracer, site, method, || f(inner))
    }

    #[track_caller]
    pub fn call_mut<R>(&mut self, method: &str, f: impl FnOnce(&mut T) -> R) -> R {
        let site = SourceLocation::caller();
        let inner = &mut self.inner;
        dispatch(&self.meta, &self.inspector, &self.tracer, site, method, || f(inner))
    }
}

impl<T: fmt::Debug> fmt::Debug for Instrumented<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrumented")
            .field("class", &self.meta.name())
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::ExitHooks;
    use crate::instrument::meta::MethodMeta;
    use crate::router::Router;
    use ddebug_config::{InspectConfig, TraceConfig};
    use ddebug_core::{EventKind, EventPayload};
    use ddebug_output::{EventRecorder, MemoryBuffer, Sink};
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct Counter {
        total: i64,
    }

    impl Counter {
        fn foo(&self, a: i64) -> i64 {
            a + 333
        }

        fn add(&mut self, n: i64) {
            self.total += n;
        }

        fn _reset(&mut self) {
            self.total = 0;
        }

        fn fail(&self) -> i64 {
            panic!("counter exploded")
        }
    }

    fn counter(mode: ClassMode) -> (Instrumented<Counter>, MemoryBuffer, Arc<EventRecorder>) {
        let router = Arc::new(Router::new(Arc::new(ExitHooks::new())));
        let (sink, buffer) = Sink::memory();
        router.set_sink(sink);
        let recorder = Arc::new(EventRecorder::default());
        router.add_listener(recorder.clone());
        let meta = ClassMeta::of::<Counter>()
            .method(MethodMeta::documented("foo", "Adds 333."))
            .method(MethodMeta::new("add"))
            .method(MethodMeta::new("_reset"))
            .method(MethodMeta::new("fail"))
            .mode(mode);
        let instrumented = Instrumented::new(
            Counter::default(),
            meta,
            Inspector::new(Arc::clone(&router), InspectConfig::default()),
            Tracer::new(router, TraceConfig::default().show_elapsed(false)),
        );
        (instrumented, buffer, recorder)
    }

    #[test]
    fn test_public_method_announced_once() {
        let (counter, buffer, recorder) = counter(ClassMode::Announce);

        assert_eq!(counter.call("foo", |c| c.foo(123)), 456);

        let calls = recorder.events_of(EventKind::Call);
        assert_eq!(calls.len(), 1);
        match &calls[0].payload {
            EventPayload::Call { callable, owner } => {
                assert_eq!(callable, "foo");
                assert_eq!(owner.as_deref(), Some("Counter"));
            }
            other => panic!("unexpected payload {:?}", other),
        }
        assert!(calls[0].location.file.ends_with("class.rs"));
        assert!(buffer.lines()[0].contains("call method 'foo' from class 'Counter'"));
    }

    #[test]
    fn test_private_method_is_silent() {
        let (mut counter, buffer, recorder) = counter(ClassMode::Announce);
        counter.call_mut("add", |c| c.add(5));
        counter.call_mut("_reset", |c| c._reset());

        assert_eq!(counter.get().total, 0);
        assert_eq!(recorder.count(EventKind::Call), 1);
        assert_eq!(buffer.lines().len(), 1);
    }

    #[test]
    fn test_undeclared_method_is_not_reported() {
        let (counter, buffer, recorder) = counter(ClassMode::Announce);

        assert_eq!(counter.call("bar", |c| c.foo(1)), 334);

        assert!(recorder.is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_empty_table_reports_every_public_method() {
        let router = Arc::new(Router::new(Arc::new(ExitHooks::new())));
        let recorder = Arc::new(EventRecorder::default());
        router.add_listener(recorder.clone());
        let mut counter = Instrumented::new(
            Counter::default(),
            ClassMeta::new("Counter"),
            Inspector::new(Arc::clone(&router), InspectConfig::default()),
            Tracer::new(router, TraceConfig::default()),
        );

        counter.call_mut("add", |c| c.add(2));
        counter.call("anything", |c| c.foo(0));

        assert_eq!(counter.get().total, 2);
        assert_eq!(recorder.count(EventKind::Call), 2);
    }

    #[test]
    fn test_panic_propagates_unchanged() {
        let (counter, _, recorder) = counter(ClassMode::Announce);
        let result = catch_unwind(AssertUnwindSafe(|| counter.call("fail", |c| c.fail())));
        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"counter exploded"));
        assert_eq!(recorder.count(EventKind::Call), 1);
    }

    #[test]
    fn test_trace_mode_opens_frame() {
        let (counter, buffer, _) = counter(ClassMode::Trace);
        assert_eq!(counter.call("foo", |c| c.foo(1)), 334);
        let lines = buffer.lines();
        assert!(lines[0].starts_with(">>> Call to Counter::foo from class.rs:"));
        assert_eq!(lines[1], "<<< Return from foo");
    }

    #[test]
    fn test_meta_and_access() {
        let (counter, _, _) = counter(ClassMode::Announce);
        assert_eq!(counter.meta().name(), "Counter");
        assert_eq!(
            counter.meta().find_method("foo").and_then(|m| m.doc.as_deref()),
            Some("Adds 333.")
        );
        assert_eq!(counter.into_inner().total, 0);
    }
}
