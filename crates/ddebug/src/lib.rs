//! ddebug
//!
//! Interactive diagnostics for running programs: print expressions with
//! their values, trace function calls step by step, report writes to
//! watched variables and render unhandled failures with several
//! independent renderers.
//!
//! # Quick Start
//!
//! ```no_run
//! use ddebug::dd;
//!
//! fn main() {
//!     let _exit = ddebug::dd().exit_guard();
//!
//!     let x = dd!(2 + 3);                 // dd| main.rs:6 in app::main: 2 + 3: 5 +0.000s
//!     let (a, b) = dd!(x, x * 2);         // dd| main.rs:7 in app::main: x: 5, x * 2: 10 +0.000s
//!
//!     let mut counter = ddebug::dd().watch(0, "counter").unwrap();
//!     counter.set(a + b);                 // counter:was 0 is now 15
//! }
//! ```
//!
//! # Architecture
//!
//! A [`Debugger`] owns the [`Router`] (enabled flags and sinks per
//! category) and injects it into:
//!
//! 1. **Inspector**: `dd!(...)` lines.
//! 2. **Tracer**: [`TracedFn`], [`Instrumented`], `step!`, `trace_var!`.
//! 3. **Watcher**: [`Watched`] values.
//! 4. **Failure pipeline**: renderers, artifacts, post-mortem session.
//!
//! Disabling the router makes every entry point silent.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod classifier;
pub mod debugger;
pub mod exit;
pub mod failure;
pub mod inspect;
pub mod instrument;
pub mod router;
pub mod source;
pub mod watch;

use std::sync::OnceLock;

pub use classifier::{classify, is_definition_line, ArgKind, CallKind, Classifier};
pub use debugger::{Debugger, DebuggerBuilder, OutputFolder};
pub use exit::{ExitGuard, ExitHooks};
pub use failure::{DebuggerExit, FailureHook, FailurePipeline, FailureReport, HookMode};
pub use inspect::{InspectArg, Inspector};
pub use instrument::{
    active_scope, descend, record_step, record_var, AnnouncedFn, CallableMeta, ClassMeta,
    ClassMode, DebugTuple, Instrumented, MethodMeta, ParamMeta, TracedFn, Tracer,
};
pub use router::{Router, RouterPhase};
pub use source::FsSourceProvider;
pub use watch::{WatchGuard, WatchRegistry, Watched};

pub use ddebug_config::{Config, PostMortemPolicy, TraceConfig};
pub use ddebug_core::{
    Category, DiagnosticEvent, Error, EventKind, EventPayload, Result, SourceLocation,
};
pub use ddebug_output::{EventRecorder, MemoryBuffer, Sink};

static DEFAULT: OnceLock<Debugger> = OnceLock::new();

/// The process-wide debugger.
///
/// Built on first use from the resolved config file (`DDEBUG_CONFIG`,
/// `./ddebug.toml`, user config dir) and environment overrides.
pub fn dd() -> &'static Debugger {
    DEFAULT.get_or_init(|| Debugger::from_config(ddebug_config::load_default_config()))
}

/// Install `tracing` output for ddebug's own diagnostics on stderr.
///
/// Returns false when the program already installed a subscriber.
pub fn init_logging(config: &Config) -> bool {
    ddebug_logging::init(ddebug_logging::LogConfig::from(&config.logging))
}

/// Join `#[doc]` lines the way rustdoc reads `///` comments.
#[doc(hidden)]
pub fn __doc_text(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|line| line.strip_prefix(' ').unwrap_or(*line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip the helper item and closure segments from a `type_name` path.
#[doc(hidden)]
pub fn __function_path(helper_path: &'static str) -> &'static str {
    let mut path = helper_path.strip_suffix("::__here").unwrap_or(helper_path);
    while let Some(stripped) = path.strip_suffix("::{{closure}}") {
        path = stripped;
    }
    path
}

/// Location of the macro call, scoped to the enclosing function.
#[macro_export]
macro_rules! call_site {
    () => {{
        fn __here() {}
        fn __type_name<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        $crate::SourceLocation::new(file!(), line!())
            .with_column(column!())
            .with_scope($crate::__function_path(__type_name(__here)))
    }};
}

/// Inspect expressions, or trace a function item.
///
/// - `dd!()` prints the call location.
/// - `dd!(expr)` prints `expr: value` and returns the value.
/// - `dd!(a, b, ...)` prints every pair and returns the values as a tuple.
/// - `dd!(using debugger; ...)` does the same on another [`Debugger`].
/// - `dd! { fn name(arg: Type, ...) -> Ret { ... } }` defines `name` so each
///   call records a trace frame. Arguments and the return type must be
///   `Debug`.
#[macro_export]
macro_rules! dd {
    (using $debugger:expr $(;)?) => {
        $debugger.inspect(&$crate::call_site!(), &[])
    };
    (using $debugger:expr; $value:expr $(,)?) => {
        match $value {
            value => {
                $debugger.inspect(
                    &$crate::call_site!(),
                    &[$crate::InspectArg::new(stringify!($value), &value)],
                );
                value
            }
        }
    };
    (using $debugger:expr; $($value:expr),+ $(,)?) => {
        match ($($value,)+) {
            values => {
                let exprs = [$(stringify!($value)),+];
                let args: ::std::vec::Vec<$crate::InspectArg<'_>> = exprs
                    .iter()
                    .zip($crate::DebugTuple::debug_values(&values))
                    .map(|(expr, value)| $crate::InspectArg::new(expr, value))
                    .collect();
                $debugger.inspect(&$crate::call_site!(), &args);
                values
            }
        }
    };
    (@fn [$($doc:literal)*] [$(#[$attr:meta])*] #[doc = $d:literal] $($rest:tt)*) => {
        $crate::dd!(@fn [$($doc)* $d] [$(#[$attr])*] $($rest)*);
    };
    (@fn [$($doc:literal)*] [$(#[$attr:meta])*] #[$a:meta] $($rest:tt)*) => {
        $crate::dd!(@fn [$($doc)*] [$(#[$attr])* #[$a]] $($rest)*);
    };
    (
        @fn [$($doc:literal)*] [$(#[$attr:meta])*]
        $vis:vis fn $name:ident($($arg:ident : $ty:ty),* $(,)?) $(-> $ret:ty)? $body:block
    ) => {
        $(#[doc = $doc])*
        $(#[$attr])*
        #[track_caller]
        $vis fn $name($($arg: $ty),*) $(-> $ret)? {
            let meta = $crate::__dd_meta!([$($doc)*] $name($($arg),*));
            $crate::dd()
                .trace(meta, |($($arg,)*): ($($ty,)*)| $(-> $ret)? { $body })
                .call(($($arg,)*))
        }
    };
    (#[$($attr:tt)*] $($rest:tt)*) => {
        $crate::dd!(@fn [] [] #[$($attr)*] $($rest)*);
    };
    ($vis:vis fn $($rest:tt)*) => {
        $crate::dd!(@fn [] [] $vis fn $($rest)*);
    };
    () => {
        $crate::dd!(using $crate::dd())
    };
    ($($value:expr),+ $(,)?) => {
        $crate::dd!(using $crate::dd(); $($value),+)
    };
}

/// Metadata of a function defined through `dd! { fn ... }`.
#[doc(hidden)]
#[macro_export]
macro_rules! __dd_meta {
    ([$($doc:literal)*] $name:ident($($arg:ident),*)) => {{
        const PARAMS: &[$crate::ParamMeta] = &[$($crate::ParamMeta::named(stringify!($arg))),*];
        $crate::CallableMeta::new(stringify!($name))
            .qualified(concat!(module_path!(), "::", stringify!($name)))
            .doc($crate::__doc_text(&[$($doc),*]))
            .params(PARAMS)
    }};
}

/// Record a step line in the active trace frame.
#[macro_export]
macro_rules! step {
    ($($fmt:tt)+) => {
        $crate::record_step($crate::call_site!(), &format!($($fmt)+))
    };
}

/// Record a variable value in the active trace frame.
#[macro_export]
macro_rules! trace_var {
    ($($var:ident),+ $(,)?) => {
        $($crate::record_var($crate::call_site!(), stringify!($var), &$var);)+
    };
}

/// Trace a nested call while the trace depth allows it.
#[macro_export]
macro_rules! descend {
    ($call:expr) => {
        $crate::descend(stringify!($call), $crate::call_site!(), || $call)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_path_strips_helpers() {
        assert_eq!(__function_path("app::run::__here"), "app::run");
        assert_eq!(__function_path("app::run::{{closure}}::__here"), "app::run");
        assert_eq!(__function_path("app::run"), "app::run");
    }

    #[test]
    fn test_call_site_names_enclosing_function() {
        let site = call_site!();
        assert_eq!(site.line, line!() - 1);
        assert!(site.file.ends_with("lib.rs"));
        assert_eq!(site.scope, "ddebug::tests::test_call_site_names_enclosing_function");
    }

    #[test]
    fn test_dd_macro_returns_values() {
        let debugger = Debugger::builder().build();
        let (sink, buffer) = Sink::memory();
        debugger.set_sink(sink);

        let x = dd!(using debugger; 2 + 3);
        let pair = dd!(using debugger; x, x * 2);
        dd!(using debugger);

        assert_eq!(x, 5);
        assert_eq!(pair, (5, 10));
        let lines = buffer.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains(": 2 + 3: 5 +"));
        assert!(lines[1].contains(": x: 5, x * 2: 10 +"));
        assert!(lines[2].starts_with("dd| lib.rs:"));
    }

    #[test]
    fn test_function_meta_keeps_docs() {
        let meta = __dd_meta!([" Scale a value." "" " Never negative."] scale(value, factor));
        assert_eq!(meta.name(), "scale");
        assert_eq!(meta.qualified_name(), "ddebug::tests::scale");
        assert_eq!(meta.doc_text(), Some("Scale a value.\n\nNever negative."));
        assert_eq!(meta.signature(), "scale(value, factor)");

        assert_eq!(__dd_meta!([] bare()).doc_text(), None);
    }

    #[test]
    fn test_dd_macro_passes_non_copy_values_through() {
        let debugger = Debugger::builder().build();
        debugger.set_sink(Sink::null());
        let owned = dd!(using debugger; String::from("kept"));
        assert_eq!(owned, "kept");
    }
}
