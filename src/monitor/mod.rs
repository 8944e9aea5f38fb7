//! Captured subprocess execution monitor.
//!
//! Launches an external program, drains its stdout and stderr through
//! per-pipe background tasks without blocking or deadlocking, classifies
//! stdout lines against a caller-supplied substring pattern registry,
//! assembles one interleaved timestamped transcript, and resolves the exit
//! code with bounded-retry polling.

pub mod command;
pub mod drain;
pub mod patterns;
pub mod supervisor;
pub mod transcript;


pub use command::{CapturedCommand, CapturedCommandBuilder};
pub use drain::{DrainRead, StreamDrain};
pub use patterns::{PatternEntry, PatternRegistry};
pub use supervisor::{ExecutionResult, Supervisor, SupervisorConfig};
pub use transcript::{StreamTag, Transcript};
