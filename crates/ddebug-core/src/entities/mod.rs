//! Domain entities

mod event;
mod failure;
mod location;

pub use event::{Category, DiagnosticEvent, EventKind, EventPayload, InspectedValue};
pub use failure::{panic_message, parse_backtrace, FailureInfo, FailureOrigin, StackFrame};
pub use location::SourceLocation;
