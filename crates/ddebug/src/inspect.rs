//! Value Inspector
//!
//! Formats expressions and their values into one diagnostic line:
//!
//! ```text
//! dd| main.rs:12 in app::run: a: 1, b + 1: 3 +0.004s
//! ```
//!
//! Returning the inspected values is the macro's job (`dd!`); this module
//! only formats and routes. While the inspection category is disabled
//! nothing is formatted.

use crate::router::Router;
use ddebug_config::InspectConfig;
use ddebug_core::{
    format_elapsed, truncate_repr, Category, DiagnosticEvent, EventKind, InspectedValue,
    SourceLocation,
};
use std::fmt::Debug;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

/// Text of the degraded line printed when source text is unavailable.
pub const SOURCE_UNAVAILABLE: &str = "Error: failed to access the underlying source code for analysis";

/// One inspected value and the source text that produced it.
#[derive(Clone, Copy)]
pub struct InspectArg<'a> {
    pub expr: Option<&'a str>,
    pub value: &'a dyn Debug,
}

impl<'a> InspectArg<'a> {
    pub fn new(expr: &'a str, value: &'a dyn Debug) -> Self {
        Self {
            expr: Some(expr),
            value,
        }
    }

    /// A value whose source text could not be captured.
    pub fn anonymous(value: &'a dyn Debug) -> Self {
        Self { expr: None, value }
    }
}

struct InspectorState {
    config: RwLock<InspectConfig>,
    last: Mutex<Instant>,
}

/// Shared value inspector of one `Debugger`.
#[derive(Clone)]
pub struct Inspector {
    router: Arc<Router>,
    state: Arc<InspectorState>,
}

impl Inspector {
    pub fn new(router: Arc<Router>, config: InspectConfig) -> Self {
        Self {
            router,
            state: Arc::new(InspectorState {
                config: RwLock::new(config),
                last: Mutex::new(Instant::now()),
            }),
        }
    }

    pub fn config(&self) -> InspectConfig {
        self.state
            .config
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn set_config(&self, config: InspectConfig) {
        *self.state.config.write().unwrap_or_else(|p| p.into_inner()) = config;
    }

    pub fn set_include_context(&self, include: bool) {
        self.state
            .config
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .include_context = include;
    }

    pub fn is_active(&self) -> bool {
        self.router.is_category_enabled(Category::Inspection)
    }

    /// Time since the previous inspection line, as `+0.004s`.
    fn elapsed(&self) -> String {
        let mut last = self.state.last.lock().unwrap_or_else(|p| p.into_inner());
        let now = Instant::now();
        let elapsed = now.duration_since(*last);
        *last = now;
        format_elapsed(elapsed)
    }

    fn repr(config: &InspectConfig, value: &dyn Debug) -> String {
        let repr = if config.pretty {
            format!("{:#?}", value)
        } else {
            format!("{:?}", value)
        };
        truncate_repr(&repr, config.max_repr_len).into_owned()
    }

    /// `<prefix><location>` or just `<prefix>` without context.
    fn head(config: &InspectConfig, site: &SourceLocation) -> String {
        if config.include_context {
            format!("{}{}", config.prefix, site)
        } else {
            config.prefix.clone()
        }
    }

    /// Print one inspection line for `args`.
    ///
    /// An argument without source text degrades the whole line to the
    /// labeled source-unavailable error.
    pub fn inspect(&self, site: &SourceLocation, args: &[InspectArg<'_>]) {
        if !self.is_active() {
            return;
        }
        if args.iter().any(|arg| arg.expr.is_none()) {
            self.degraded(site);
            return;
        }

        let config = self.config();
        let values: Vec<InspectedValue> = args
            .iter()
            .map(|arg| {
                let repr = Self::repr(&config, arg.value);
                match arg.expr {
                    Some(expr) => InspectedValue::new(expr, repr),
                    None => InspectedValue::anonymous(repr),
                }
            })
            .collect();

        let pairs: Vec<String> = values
            .iter()
            .map(|value| match value.expr.as_deref() {
                Some(expr) if expr != value.repr => format!("{}: {}", expr, value.repr),
                _ => value.repr.clone(),
            })
            .collect();

        let head = Self::head(&config, site);
        let elapsed = self.elapsed();
        let text = match (pairs.is_empty(), config.include_context) {
            (true, _) => format!("{} {}", head, elapsed),
            (false, true) => format!("{}: {} {}", head, pairs.join(", "), elapsed),
            (false, false) => format!("{}{} {}", head, pairs.join(", "), elapsed),
        };

        let event = DiagnosticEvent::inspect(site.clone(), values, text);
        self.router.emit_to(Category::Inspection, &event);
    }

    /// Print the labeled source-unavailable line.
    pub fn degraded(&self, site: &SourceLocation) {
        if !self.is_active() {
            return;
        }
        let text = format!("{}{}", self.config().prefix, SOURCE_UNAVAILABLE);
        let event = DiagnosticEvent::text(EventKind::Inspect, site.clone(), text);
        self.router.emit_to(Category::Inspection, &event);
    }

    fn announce(&self, site: &SourceLocation, callable: &str, owner: Option<&str>) {
        if !self.is_active() {
            return;
        }
        let config = self.config();
        let what = match owner {
            Some(class) => format!("call method '{}' from class '{}'", callable, class),
            None => format!("call function '{}'", callable),
        };
        let head = Self::head(&config, site);
        let separator = if config.include_context { ": " } else { "" };
        let text = format!("{}{}{} {}", head, separator, what, self.elapsed());
        let event = DiagnosticEvent::call(site.clone(), callable, owner.map(str::to_string), text);
        self.router.emit_to(Category::Inspection, &event);
    }

    /// Call-announce line for a method of an instrumented type.
    pub fn announce_method(&self, site: &SourceLocation, method: &str, class: &str) {
        self.announce(site, method, Some(class));
    }

    /// Call-announce line for a free function.
    pub fn announce_function(&self, site: &SourceLocation, name: &str) {
        self.announce(site, name, None);
    }
}
