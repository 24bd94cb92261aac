//! Instrumentation Engine
//!
//! - `meta` - name, docs and parameters carried by wrappers
//! - `args` - per-argument formatting of call tuples
//! - `tracer` - trace frames and step records
//! - `function` - traced and call-announced functions
//! - `class` - instrumented values with a method dispatch table

pub mod args;
pub mod class;
pub mod function;
pub mod meta;
pub mod tracer;

pub use args::DebugTuple;
pub use class::Instrumented;
pub use function::{AnnouncedFn, TracedFn};
pub use meta::{CallableMeta, ClassMeta, ClassMode, MethodMeta, ParamMeta};
pub use tracer::{active_scope, descend, record_step, record_var, Tracer};
