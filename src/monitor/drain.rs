//! Per-pipe stream drains and their non-blocking consumer facade.
//!
//! Each drain couples one background task, which performs all of the
//! blocking reads against the child's pipe, with an unbounded channel the
//! supervisor consumes from on a bounded timeout. The channel is the only
//! crossing point between the two; the consumer can never be blocked by a
//! stalled pipe.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

/// Outcome of one bounded read attempt against a drain.
#[derive(Debug, PartialEq, Eq)]
pub enum DrainRead {
    /// The next queued line, trailing newline stripped.
    Line(String),
    /// No line arrived within the timeout; the drain may still produce more.
    TimedOut,
    /// The drain has ended (pipe EOF or read error) and its queue is empty.
    Ended,
}

/// One stream drain: a background reader task plus the receiving end of
/// its line queue.
///
/// The worker ends exactly once, on EOF or on a read error, and never
/// restarts. A read error is logged at debug level and otherwise treated
/// like EOF; the consumer observes both as [`DrainRead::Ended`] once the
/// queue is empty.
pub struct StreamDrain {
    rx: mpsc::UnboundedReceiver<String>,
    label: &'static str,
    default_timeout: Duration,
    ended: bool,
}

impl StreamDrain {
    /// Spawn a worker draining `stream` line by line into the queue.
    pub fn spawn<R>(stream: R, label: &'static str, default_timeout: Duration) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stream);
            loop {
                let mut line = String::new();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.send(normalize_line(line)).is_err() {
                            // Consumer went away; nothing left to drain for.
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!("{} drain ended on read error: {}", label, e);
                        break;
                    }
                }
            }
        });
        Self {
            rx,
            label,
            default_timeout,
            ended: false,
        }
    }

    /// Bounded read: return a queued line immediately in FIFO order, else
    /// wait up to `timeout` for one. Never blocks past the timeout.
    pub async fn try_read_line(&mut self, timeout: Duration) -> DrainRead {
        if self.ended {
            return DrainRead::Ended;
        }
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(line)) => DrainRead::Line(line),
            Ok(None) => {
                tracing::debug!("{} drain ended", self.label);
                self.ended = true;
                DrainRead::Ended
            }
            Err(_) => DrainRead::TimedOut,
        }
    }

    /// Bounded read using the drain's default timeout.
    pub async fn next_line(&mut self) -> DrainRead {
        let timeout = self.default_timeout;
        self.try_read_line(timeout).await
    }

    /// True once the worker has ended and every queued line was consumed.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

/// Strip a single trailing `\n` or `\r\n`.
fn normalize_line(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}
