//! Line-oriented post-mortem session
//!
//! Reads commands from an input stream and answers on a sink. The
//! session looks at a captured [`FailureInfo`]; it cannot resume or step
//! the program.

use ddebug_core::{FailureInfo, Result, SourceLocation};
use ddebug_logging::debug;
use ddebug_output::Sink;
use ddebug_ports::{PostMortem, SessionOutcome, SourceProviderRef};
use std::io::BufRead;
use std::sync::Mutex;

const PROMPT: &str = "(ddb) ";
const LIST_RADIUS: u32 = 5;

const HELP: &str = "\
Commands:
  where (w, bt)   show the failure location and program frames
  list (l)        show the source around the failure
  message (m)     show the failure message
  continue (c)    leave the session
  quit (q)        leave the session and stop the program
  help (h)        show this list";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Help,
    Where,
    List,
    Message,
    Continue,
    Quit,
    Empty,
    Unknown,
}

fn parse_command(line: &str) -> Command {
    match line.split_whitespace().next() {
        None => Command::Empty,
        Some("help" | "h" | "?") => Command::Help,
        Some("where" | "w" | "bt") => Command::Where,
        Some("list" | "l") => Command::List,
        Some("message" | "m") => Command::Message,
        Some("continue" | "c" | "cont") => Command::Continue,
        Some("quit" | "q" | "exit") => Command::Quit,
        Some(_) => Command::Unknown,
    }
}

pub struct ConsoleSession {
    input: Mutex<Box<dyn BufRead + Send>>,
    output: Sink,
    source: SourceProviderRef,
}

impl ConsoleSession {
    pub fn new(input: Box<dyn BufRead + Send>, output: Sink, source: SourceProviderRef) -> Self {
        Self {
            input: Mutex::new(input),
            output,
            source,
        }
    }

    /// Session on stdin, answering on stderr.
    pub fn stdio(source: SourceProviderRef) -> Self {
        Self::new(
            Box::new(std::io::BufReader::new(std::io::stdin())),
            Sink::stderr(),
            source,
        )
    }

    fn read_command(&self) -> Result<Option<String>> {
        self.output.write_str(PROMPT)?;
        self.output.flush()?;
        let mut line = String::new();
        let read = self
            .input
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .read_line(&mut line)?;
        Ok((read > 0).then_some(line))
    }

    fn show_where(&self, failure: &FailureInfo) -> Result<()> {
        match &failure.location {
            Some(loc) => self.output.write_line(&format!("> {}", describe(loc)))?,
            None => self.output.write_line("> location unknown")?,
        }
        for frame in failure.user_frames() {
            let place = match (&frame.file, frame.line) {
                (Some(file), Some(line)) => format!(" at {}:{}", file, line),
                _ => String::new(),
            };
            self.output
                .write_line(&format!("  #{} {}{}", frame.index, frame.name, place))?;
        }
        Ok(())
    }

    fn show_list(&self, failure: &FailureInfo) -> Result<()> {
        let Some(loc) = &failure.location else {
            return self.output.write_line("*** No location to list");
        };
        let start = loc.line.saturating_sub(LIST_RADIUS).max(1);
        let lines = self.source.lines(&loc.file, start, loc.line + LIST_RADIUS);
        if lines.is_empty() {
            return self
                .output
                .write_line(&format!("*** Source of {} is not available", loc.file));
        }
        for (number, text) in &lines {
            let number = *number;
            let marker = if number == loc.line { "->" } else { "  " };
            self.output
                .write_line(&format!("{:>4} {} {}", number, marker, text))?;
        }
        Ok(())
    }
}

fn describe(loc: &SourceLocation) -> String {
    format!("{}:{} in {}", loc.file, loc.line, loc.scope_name())
}

impl PostMortem for ConsoleSession {
    fn run(&self, failure: &FailureInfo) -> Result<SessionOutcome> {
        debug!(kind = %failure.kind, "Console session started");
        self.output.write_line(&failure.headline())?;
        self.output.write_line(&failure.message)?;

        loop {
            let Some(line) = self.read_command()? else {
                self.output.write_line("")?;
                return Ok(SessionOutcome::Continue);
            };
            match parse_command(&line) {
                Command::Empty => {}
                Command::Help => self.output.write_line(HELP)?,
                Command::Where => self.show_where(failure)?,
                Command::List => self.show_list(failure)?,
                Command::Message => self
                    .output
                    .write_line(&format!("{}: {}", failure.kind, failure.message))?,
                Command::Continue => return Ok(SessionOutcome::Continue),
                Command::Quit => return Ok(SessionOutcome::Quit),
                Command::Unknown => self
                    .output
                    .write_line(&format!("*** Unknown command: {}", line.trim()))?,
            }
        }
    }

    fn name(&self) -> &str {
        "console"
    }
}
