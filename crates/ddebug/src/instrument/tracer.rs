//! Step tracer
//!
//! A traced call opens a frame on a thread-local stack. While the frame is
//! active, `step!`, `trace_var!` and `descend!` record into it; outside any
//! frame they are no-ops. Output goes to the instrumentation category:
//!
//! ```text
//! >>> Call to app::add from main.rs:12
//!     a = 1
//!     b = 2
//!    14 | summing
//! .......... total = 3
//! <<< Return value from add: 3
//! Elapsed time: 12µs
//! ```

use crate::router::Router;
use ddebug_config::TraceConfig;
use ddebug_core::{
    format_duration, panic_message, truncate_repr, Category, DiagnosticEvent, SourceLocation,
};
use std::cell::RefCell;
use std::fmt::Debug;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use std::time::Instant;

const INDENT: &str = "    ";

struct Frame {
    tracer: Tracer,
    name: String,
    depth: usize,
}

thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Pops the frame it pushed, also while unwinding.
struct FrameGuard;

impl FrameGuard {
    fn push(frame: Frame) -> Self {
        FRAMES.with(|frames| frames.borrow_mut().push(frame));
        FrameGuard
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        FRAMES.with(|frames| {
            frames.borrow_mut().pop();
        });
    }
}

fn current_depth() -> usize {
    FRAMES.with(|frames| frames.borrow().len())
}

/// Tracer, indent and limits of the innermost active frame.
fn top_frame() -> Option<(Tracer, String, usize)> {
    FRAMES.with(|frames| {
        frames
            .borrow()
            .last()
            .map(|f| (f.tracer.clone(), f.name.clone(), f.depth))
    })
}

/// Name of the innermost traced frame on this thread.
pub fn active_scope() -> Option<String> {
    top_frame().map(|(_, name, _)| name)
}

fn indent(depth: usize) -> String {
    INDENT.repeat(depth.saturating_sub(1))
}

/// Shared step tracer of one `Debugger`.
#[derive(Clone)]
pub struct Tracer {
    router: Arc<Router>,
    config: Arc<RwLock<TraceConfig>>,
}

impl Tracer {
    pub fn new(router: Arc<Router>, config: TraceConfig) -> Self {
        Self {
            router,
            config: Arc::new(RwLock::new(config)),
        }
    }

    pub fn config(&self) -> TraceConfig {
        self.config.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn set_config(&self, config: TraceConfig) {
        *self.config.write().unwrap_or_else(|p| p.into_inner()) = config;
    }

    /// True when instrumentation output is enabled.
    pub fn is_active(&self) -> bool {
        self.router.is_category_enabled(Category::Instrumentation)
    }

    pub(crate) fn repr(&self, value: &dyn Debug) -> String {
        let repr = format!("{:?}", value);
        truncate_repr(&repr, self.config().max_repr_len).into_owned()
    }

    /// Frame body lines are plain sink output; only the call line is an event.
    fn line(&self, text: &str) {
        self.router.write_line(Category::Instrumentation, text);
    }

    /// Run `f` inside a new frame.
    ///
    /// `args` are `(name, repr)` pairs printed after the call line.
    /// `render_return` formats the return value; `None` prints a bare
    /// return line. A panic is reported and resumed with its payload.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn run_frame<R>(
        &self,
        qualified: &str,
        name: &str,
        owner: Option<&str>,
        site: SourceLocation,
        args: Vec<(String, String)>,
        f: impl FnOnce() -> R,
        render_return: impl FnOnce(&R) -> Option<String>,
    ) -> R {
        if !self.is_active() {
            return f();
        }
        let config = self.config();
        let depth = current_depth() + 1;
        let pad = indent(depth);

        let call_line = format!(
            "{}>>> Call to {} from {}:{}",
            pad,
            qualified,
            site.file_name(),
            site.line
        );
        let event = DiagnosticEvent::call(
            site.clone(),
            name,
            owner.map(str::to_string),
            call_line,
        );
        self.router.emit_to(Category::Instrumentation, &event);
        for (arg, repr) in args {
            self.line(&format!("{}{}{} = {}", pad, INDENT, arg, repr));
        }

        let guard = FrameGuard::push(Frame {
            tracer: self.clone(),
            name: qualified.to_string(),
            depth,
        });
        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(f));
        drop(guard);

        match outcome {
            Ok(value) => {
                let line = match render_return(&value) {
                    Some(repr) => format!("{}<<< Return value from {}: {}", pad, name, repr),
                    None => format!("{}<<< Return from {}", pad, name),
                };
                self.line(&line);
                if config.show_elapsed {
                    let elapsed = format_duration(started.elapsed());
                    self.line(&format!("{}Elapsed time: {}", pad, elapsed));
                }
                value
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.line(&format!("{}!!! {} panicked: {}", pad, name, message));
                resume_unwind(payload)
            }
        }
    }
}

/// Record a step line in the active frame.
pub fn record_step(site: SourceLocation, text: &str) {
    if let Some((tracer, _, depth)) = top_frame() {
        if tracer.is_active() {
            let line = format!("{}{:>5} | {}", indent(depth), site.line, text);
            tracer.line(&line);
        }
    }
}

/// Record a variable value in the active frame.
pub fn record_var(_site: SourceLocation, name: &str, value: &dyn Debug) {
    if let Some((tracer, _, depth)) = top_frame() {
        if tracer.is_active() {
            let line = format!("{}.......... {} = {}", indent(depth), name, tracer.repr(value));
            tracer.line(&line);
        }
    }
}

/// Trace a nested call while the active frame is shallower than the
/// configured depth; otherwise just run it.
pub fn descend<R: Debug>(name: &str, site: SourceLocation, f: impl FnOnce() -> R) -> R {
    match top_frame() {
        Some((tracer, _, depth)) if depth < tracer.config().depth => {
            let repr_tracer = tracer.clone();
            tracer.run_frame(name, name, None, site, Vec::new(), f, move |value| {
                Some(repr_tracer.repr(value))
            })
        }
        _ => f(),
    }
}
