//! Interleaved, timestamped transcript of one captured execution.

use std::fmt;

use chrono::Local;

/// Tag for a transcript line: which stream it was dequeued from.
///
/// Pattern-matched stdout lines still carry `Info` here so a later
/// log-scraper does not re-flag tokens the classifier already counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamTag {
    Info,
    Error,
}

impl fmt::Display for StreamTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamTag::Info => write!(f, "INFO"),
            StreamTag::Error => write!(f, "ERROR"),
        }
    }
}

/// Append-only buffer of `YYYY-MM-DD HH:MM:SS.mmm (INFO|ERROR) : <line>`
/// records, in dequeue order. Within one stream the order matches the
/// stream's own output order; across streams only arrival order holds.
#[derive(Debug, Default)]
pub struct Transcript {
    buf: String,
    line_count: usize,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line, stamped with the current local time at millisecond
    /// resolution. `line` is expected to have its trailing newline already
    /// stripped by the drain.
    pub fn append(&mut self, tag: StreamTag, line: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        self.buf.push_str(&format!("{timestamp} ({tag}) : {line}\n"));
        self.line_count += 1;
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn is_empty(&self) -> bool {
        self.line_count == 0
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // "YYYY-MM-DD HH:MM:SS.mmm" is 23 bytes with fixed separators.
    fn assert_timestamp_shape(stamp: &str) {
        assert_eq!(stamp.len(), 23, "unexpected timestamp: {stamp:?}");
        let bytes = stamp.as_bytes();
        assert_eq!(bytes[4], b'-');
        assert_eq!(bytes[7], b'-');
        assert_eq!(bytes[10], b' ');
        assert_eq!(bytes[13], b':');
        assert_eq!(bytes[16], b':');
        assert_eq!(bytes[19], b'.');
    }

    #[test]
    fn formats_info_and_error_lines() {
        let mut transcript = Transcript::new();
        transcript.append(StreamTag::Info, "stdout line");
        transcript.append(StreamTag::Error, "stderr line");

        let text = transcript.into_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let (stamp, rest) = lines[0].split_at(23);
        assert_timestamp_shape(stamp);
        assert_eq!(rest, " (INFO) : stdout line");

        let (stamp, rest) = lines[1].split_at(23);
        assert_timestamp_shape(stamp);
        assert_eq!(rest, " (ERROR) : stderr line");
    }

    #[test]
    fn preserves_append_order() {
        let mut transcript = Transcript::new();
        for i in 0..5 {
            transcript.append(StreamTag::Info, &format!("line {i}"));
        }
        let text = transcript.into_string();
        let positions: Vec<usize> = (0..5)
            .map(|i| text.find(&format!("line {i}")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn starts_empty() {
        let transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert_eq!(transcript.line_count(), 0);
        assert_eq!(transcript.as_str(), "");
    }
}
