//! # execmon
//!
//! Captured subprocess execution monitor: run an external program, drain
//! its stdout and stderr without blocking or deadlocking, classify output
//! lines against a registry of error/warning substring patterns in real
//! time, assemble one interleaved millisecond-timestamped transcript, and
//! determine the child's true exit status under unreliable polling
//! conditions.
//!
//! ## Modules
//!
//! - `monitor` - the supervisor, stream drains, pattern classifier, and
//!   transcript assembler
//! - `error` - the `MonitorError` taxonomy (spawn failures are the only
//!   fatal class)
//!
//! ## Example
//!
//! ```no_run
//! use execmon::{CapturedCommand, PatternRegistry, Supervisor};
//!
//! # async fn demo() -> Result<(), execmon::MonitorError> {
//! let command = CapturedCommand::parse("sh -c 'echo ok'")?.build();
//! let mut registry = PatternRegistry::new();
//! registry.watch("ERROR", "check the run log");
//!
//! let result = Supervisor::new().execute(&command, &mut registry).await?;
//! println!("exit code {}", result.exit_code);
//! print!("{}", result.transcript);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod monitor;

pub use error::MonitorError;
pub use monitor::{
    CapturedCommand, CapturedCommandBuilder, ExecutionResult, PatternEntry, PatternRegistry,
    Supervisor, SupervisorConfig,
};
