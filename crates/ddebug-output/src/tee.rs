//! Tee - live stream plus durable log
//!
//! Every write goes to both destinations. The live copy keeps its styling;
//! the durable copy is stripped by [`FileLog`](crate::FileLog). A failure on
//! one side does not stop the write to the other. Several tees may share one
//! durable log (single-file mode).

use crate::sink::Sink;
use ddebug_core::Result;
use ddebug_ports::OutputStream;

pub struct TeeStream {
    live: Sink,
    log: Sink,
    name: String,
}

impl TeeStream {
    pub fn new(live: Sink, log: Sink) -> Self {
        let name = format!("tee({}+{})", live.name(), log.name());
        Self { live, log, name }
    }

    pub fn live(&self) -> &Sink {
        &self.live
    }

    pub fn log(&self) -> &Sink {
        &self.log
    }
}

impl OutputStream for TeeStream {
    /// Once the durable log is closed, only the live side is written.
    fn write_str(&mut self, text: &str) -> Result<()> {
        let live = self.live.write_str(text);
        if self.log.is_closed() {
            return live;
        }
        let durable = self.log.write_str(text);
        live.and(durable)
    }

    fn flush(&mut self) -> Result<()> {
        let live = self.live.flush();
        let durable = self.log.flush();
        live.and(durable)
    }

    /// Closes the durable log only; the live sink belongs to others.
    fn close(&mut self) -> Result<()> {
        let live = self.live.flush();
        let durable = self.log.close();
        durable.and(live)
    }

    fn is_terminal(&self) -> bool {
        self.live.is_terminal()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
