//! Process supervisor: spawn, multiplex, flush, resolve the exit code.
//!
//! The supervisor owns the child handle and is the single consumer of both
//! stream drains. Its life cycle is `STARTING -> RUNNING -> DRAINING ->
//! EXIT_PENDING -> DONE`: spawn the child, loop over bounded stdout and
//! stderr reads while the child runs, flush whatever the drains still hold,
//! then poll for the exit code a bounded number of times.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};

use crate::error::MonitorError;
use crate::monitor::command::CapturedCommand;
use crate::monitor::drain::{DrainRead, StreamDrain};
use crate::monitor::patterns::PatternRegistry;
use crate::monitor::transcript::{StreamTag, Transcript};

/// Tuning knobs for one supervised execution.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Bounded-read timeout for the stdout drain. Tighter than stderr:
    /// stdout carries the bulk of the output.
    pub stdout_timeout: Duration,
    /// Bounded-read timeout for the stderr drain.
    pub stderr_timeout: Duration,
    /// Per-drain timeout for the final flush after the main loop exits.
    pub flush_timeout: Duration,
    /// Maximum number of exit-code poll attempts.
    pub poll_attempts: u32,
    /// Sleep between exit-code poll attempts.
    pub poll_interval: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            stdout_timeout: Duration::from_millis(50),
            stderr_timeout: Duration::from_millis(100),
            flush_timeout: Duration::from_millis(250),
            poll_attempts: 10,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Outcome of one supervised execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// The child's exit code, verbatim. A signal death maps to the negated
    /// signal number.
    pub exit_code: i32,
    /// The merged, timestamped transcript.
    pub transcript: String,
    /// True when exit-code polling exhausted its attempts and the code was
    /// defaulted to 0. Callers that treat 0 as success must check this:
    /// a defaulted 0 means "unknown", not "succeeded".
    pub exit_code_defaulted: bool,
}

/// Drives one captured execution at a time. Stateless between calls; every
/// handle, drain, and transcript lives inside a single `execute` call.
#[derive(Debug, Default)]
pub struct Supervisor {
    config: SupervisorConfig,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SupervisorConfig) -> Self {
        Self { config }
    }

    /// Run `command` to completion, feeding stdout through `registry` and
    /// assembling the interleaved transcript.
    ///
    /// A non-zero exit code is not an error here; it is returned verbatim
    /// for the caller to interpret alongside the registry's final counts.
    /// Only spawn-class failures return `Err`.
    pub async fn execute(
        &self,
        command: &CapturedCommand,
        registry: &mut PatternRegistry,
    ) -> Result<ExecutionResult, MonitorError> {
        // STARTING
        let mut child = self.spawn(command)?;

        let stdout = child
            .stdout
            .take()
            .ok_or(MonitorError::StreamCapture("stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or(MonitorError::StreamCapture("stderr"))?;

        let mut stdout_drain = StreamDrain::spawn(stdout, "stdout", self.config.stdout_timeout);
        let mut stderr_drain = StreamDrain::spawn(stderr, "stderr", self.config.stderr_timeout);

        // Stdin is fed from its own task, concurrently with the drains. A
        // payload larger than the pipe buffer would otherwise deadlock
        // against a child that fills stdout before consuming stdin.
        if let Some(payload) = command.stdin.clone() {
            if let Some(mut stdin) = child.stdin.take() {
                tokio::spawn(async move {
                    if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                        tracing::debug!("stdin write ended early: {}", e);
                    }
                    if let Err(e) = stdin.shutdown().await {
                        tracing::debug!("stdin close failed: {}", e);
                    }
                });
            }
        }

        let mut transcript = Transcript::new();
        let mut exit_status: Option<std::process::ExitStatus> = None;

        // RUNNING: one bounded stdout read then one bounded stderr read per
        // iteration, until the child reports a status or both drains end.
        while exit_status.is_none() && !(stdout_drain.is_ended() && stderr_drain.is_ended()) {
            match child.try_wait() {
                Ok(status) => exit_status = status,
                Err(e) => tracing::debug!("try_wait failed: {}", e),
            }

            if let DrainRead::Line(line) = stdout_drain.next_line().await {
                registry.classify(&line);
                transcript.append(StreamTag::Info, &line);
            }
            if let DrainRead::Line(line) = stderr_drain.next_line().await {
                transcript.append(StreamTag::Error, &line);
            }
        }

        // DRAINING: pick up whatever is still queued or in flight. Closed
        // pipes surface as Ended here, silence as TimedOut; both stop the
        // flush without failing the invocation.
        self.flush(&mut stdout_drain, registry, &mut transcript, StreamTag::Info)
            .await;
        self.flush(&mut stderr_drain, registry, &mut transcript, StreamTag::Error)
            .await;

        // EXIT_PENDING
        let (exit_code, exit_code_defaulted) = match exit_status {
            Some(status) => (exit_code_of(status), false),
            None => self.poll_exit_code(&mut child, command).await,
        };

        tracing::debug!(
            "'{}' finished with exit code {}{}",
            command.display(),
            exit_code,
            if exit_code_defaulted { " (defaulted)" } else { "" }
        );

        Ok(ExecutionResult {
            exit_code,
            transcript: transcript.into_string(),
            exit_code_defaulted,
        })
    }

    /// Spawn the child with piped stdout/stderr, the caller's working
    /// directory, and the inherited environment overlaid with the
    /// command's overrides. Stdin is piped when a payload was provided;
    /// writing it is the caller's job.
    fn spawn(&self, command: &CapturedCommand) -> Result<Child, MonitorError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        for (key, value) in &command.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(if command.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Executing captured: {}", command.display());
        if !command.env.is_empty() {
            tracing::trace!("Environment overrides: {:?}", command.env);
        }
        if let Some(dir) = &command.working_dir {
            tracing::trace!("Working directory: {:?}", dir);
        }

        cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MonitorError::CommandNotFound(command.program.clone())
            } else {
                MonitorError::SpawnFailed {
                    command: command.display(),
                    source: e,
                }
            }
        })
    }

    async fn flush(
        &self,
        drain: &mut StreamDrain,
        registry: &mut PatternRegistry,
        transcript: &mut Transcript,
        tag: StreamTag,
    ) {
        loop {
            match drain.try_read_line(self.config.flush_timeout).await {
                DrainRead::Line(line) => {
                    if tag == StreamTag::Info {
                        registry.classify(&line);
                    }
                    transcript.append(tag, &line);
                }
                DrainRead::TimedOut | DrainRead::Ended => break,
            }
        }
    }

    /// Bounded-retry exit-code polling. On exhaustion the code defaults to
    /// 0 with a warning; the flag in the returned pair lets callers tell
    /// that apart from a real success.
    async fn poll_exit_code(&self, child: &mut Child, command: &CapturedCommand) -> (i32, bool) {
        for attempt in 1..=self.config.poll_attempts {
            match child.try_wait() {
                Ok(Some(status)) => return (exit_code_of(status), false),
                Ok(None) => {
                    tracing::debug!(
                        "Exit code not yet available (attempt {}/{})",
                        attempt,
                        self.config.poll_attempts
                    );
                }
                Err(e) => tracing::debug!("try_wait failed while polling: {}", e),
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }

        tracing::warn!(
            "Could not determine return code for '{}' after {} attempts, defaulting to 0",
            command.display(),
            self.config.poll_attempts
        );
        (0, true)
    }
}

/// Map an exit status to the code the wrapped program reported. A Unix
/// signal death has no code; the negated signal number stands in for it.
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    signal_code(status)
}

#[cfg(unix)]
fn signal_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|signal| -signal).unwrap_or(-1)
}

#[cfg(not(unix))]
fn signal_code(_status: std::process::ExitStatus) -> i32 {
    -1
}
