//! Port trait definitions for ddebug
//!
//! Every collaborator the diagnostics core talks to is a trait here.
//! Implementations live in `ddebug-output` (streams, listeners) and in the
//! `ddebug` crate (watch registry, renderers, console session); programs and
//! tests can supply their own.
//!
//! # Port Types
//!
//! - **Output ports**: writable streams behind a sink
//! - **Listener ports**: alternate consumers of diagnostic events
//! - **Watch ports**: mutation-watch service
//! - **Source ports**: read source lines for call sites and tracebacks
//! - **Render ports**: independent failure renderers
//! - **Interaction ports**: keypress prompt and post-mortem session

mod interaction;
mod listener;
mod output;
mod renderer;
mod source;
mod watch;

pub use interaction::{KeypressSource, NoKeypress, NoPostMortem, PostMortem, SessionOutcome};
pub use listener::{EventListener, NullListener};
pub use output::{NullStream, OutputStream};
pub use renderer::{FailureRenderer, RenderContext};
pub use source::{NoSource, SourceProvider};
pub use watch::{
    UnavailableWatchService, WatchChange, WatchId, WatchService, MUTATION_WATCH_CAPABILITY,
};

use std::sync::Arc;

/// Thread-safe reference to an event listener
pub type EventListenerRef = Arc<dyn EventListener>;

/// Thread-safe reference to a watch service
pub type WatchServiceRef = Arc<dyn WatchService>;

/// Thread-safe reference to a source provider
pub type SourceProviderRef = Arc<dyn SourceProvider>;

/// Thread-safe reference to a failure renderer
pub type FailureRendererRef = Arc<dyn FailureRenderer>;

/// Thread-safe reference to a keypress source
pub type KeypressSourceRef = Arc<dyn KeypressSource>;

/// Thread-safe reference to a post-mortem session
pub type PostMortemRef = Arc<dyn PostMortem>;
