/// Errors surfaced by the execution monitor.
///
/// Only spawn-class failures are fatal to an invocation. Stream read
/// failures are absorbed by the drain that hit them, and an indeterminate
/// exit code degrades to a defaulted result rather than an error.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Empty command line")]
    EmptyCommand,

    #[error("Invalid command line: {0}")]
    Shell(#[from] shell_words::ParseError),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        source: std::io::Error,
    },

    #[error("Failed to capture {0} of child process")]
    StreamCapture(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
