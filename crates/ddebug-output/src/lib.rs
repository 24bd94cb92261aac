//! ddebug Output Adapters
//!
//! Implements the `OutputStream` and `EventListener` ports from
//! `ddebug-ports` and the [`Sink`] handle every diagnostic component writes
//! through.
//!
//! # Features
//!
//! - **Standard streams**: stderr/stdout
//! - **Durable log**: file copy with terminal styling stripped, idempotent close
//! - **Tee**: live stream plus durable log
//! - **Memory**: in-process buffer for tests and captures
//! - **Recorder**: bounded in-memory event history

pub mod error;
pub mod file_log;
pub mod memory;
pub mod recorder;
pub mod sink;
pub mod std_stream;
pub mod tee;

pub use file_log::FileLog;
pub use memory::{MemoryBuffer, MemoryStream};
pub use recorder::{EventRecorder, DEFAULT_RECORDER_CAPACITY};
pub use sink::{Sink, SinkGuard};
pub use std_stream::{StdStream, StdTarget};
pub use tee::TeeStream;
