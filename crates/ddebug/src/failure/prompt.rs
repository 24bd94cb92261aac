//! Bounded wait-for-keypress on standard input
//!
//! A blocking read cannot be cancelled, so stdin is read by one dedicated
//! thread for the life of the process. A line that arrives after a prompt
//! timed out stays queued and answers the next prompt.

use ddebug_logging::{debug, warn};
use ddebug_ports::KeypressSource;
use std::io::{BufRead, BufReader, IsTerminal};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Lines read from one source by a dedicated thread.
pub struct LineFeed {
    lines: Mutex<UnboundedReceiver<String>>,
}

impl LineFeed {
    /// Start the reader thread. It stops at end of input or a read error.
    pub fn spawn<R>(reader: R) -> std::io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("ddebug-stdin".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Failed to read answer: {}", e);
                            break;
                        }
                    }
                }
                debug!("Prompt input closed");
            })?;
        Ok(Self {
            lines: Mutex::new(rx),
        })
    }

    /// Next queued line, waiting up to `timeout`.
    ///
    /// `None` on timeout, end of input, or when called from inside a tokio
    /// runtime (a nested runtime cannot be started there).
    pub fn next_line(&self, timeout: Duration) -> Option<String> {
        if tokio::runtime::Handle::try_current().is_ok() {
            debug!("Inside a tokio runtime, keypress prompt skipped");
            return None;
        }

        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                warn!("Failed to start prompt runtime: {}", e);
                return None;
            }
        };

        let mut lines = self.lines.lock().unwrap_or_else(|p| p.into_inner());
        rt.block_on(async {
            tokio::time::timeout(timeout, lines.recv())
                .await
                .ok()
                .flatten()
        })
    }
}

fn stdin_feed() -> Option<&'static LineFeed> {
    static STDIN: OnceLock<Option<LineFeed>> = OnceLock::new();
    STDIN
        .get_or_init(|| match LineFeed::spawn(BufReader::new(std::io::stdin())) {
            Ok(feed) => Some(feed),
            Err(e) => {
                warn!("Failed to start stdin reader: {}", e);
                None
            }
        })
        .as_ref()
}

/// Read one line from stdin, giving up after `timeout`.
///
/// The trailing newline is removed. See [`LineFeed::next_line`] for when
/// this returns `None`.
pub fn read_line_with_timeout(timeout: Duration) -> Option<String> {
    stdin_feed()?.next_line(timeout)
}

/// Keypress source reading the process's standard input.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalKeypress;

impl KeypressSource for TerminalKeypress {
    fn wait_for_line(&self, timeout: Duration) -> Option<String> {
        read_line_with_timeout(timeout)
    }

    fn is_interactive(&self) -> bool {
        std::io::stdin().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use std::sync::mpsc::{channel, Receiver};

    /// Blocks until the test hands it bytes; closed sender is end of input.
    struct Gate(Receiver<Vec<u8>>);

    impl Read for Gate {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.recv() {
                Ok(bytes) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Err(_) => Ok(0),
            }
        }
    }

    #[test]
    fn test_late_line_answers_next_prompt() {
        let (tx, rx) = channel();
        let feed = LineFeed::spawn(BufReader::new(Gate(rx))).unwrap();

        assert_eq!(feed.next_line(Duration::from_millis(20)), None);

        tx.send(b"yes\r\n".to_vec()).unwrap();
        assert_eq!(feed.next_line(Duration::from_secs(5)), Some("yes".to_string()));

        drop(tx);
        assert_eq!(feed.next_line(Duration::from_secs(5)), None);
    }

    #[test]
    fn test_queued_lines_come_in_order() {
        let feed = LineFeed::spawn(Cursor::new("first\nsecond\n")).unwrap();
        assert_eq!(feed.next_line(Duration::from_secs(5)), Some("first".to_string()));
        assert_eq!(feed.next_line(Duration::from_secs(5)), Some("second".to_string()));
        assert_eq!(feed.next_line(Duration::from_secs(5)), None);
    }

    #[tokio::test]
    async fn test_inside_runtime_returns_none() {
        let feed = LineFeed::spawn(Cursor::new("yes\n")).unwrap();
        assert_eq!(feed.next_line(Duration::from_millis(10)), None);
    }
}
