// src/engine/mod.rs

//! Output scheduling for one execution session.
//!
//! The session reacts to:
//! - activity from the stdout/stderr pumps
//! - the periodic flush timer
//! - the hard deadline
//! - process exit, then both pumps reaching end of stream
//!
//! The pure state machine lives in [`core`] (with the per-event rules in
//! [`event_handlers`]); the async/IO shell that owns the child process, the
//! timers and the emitter is [`runtime`].

use std::time::Duration;

use crate::config::ConfigFile;
use crate::types::StreamKind;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Process running; partial reports may be emitted.
    Running,
    /// Process exited; waiting for both pumps to hit end of stream.
    DrainingFinal,
    /// Terminal report emitted.
    Done,
}

/// Events flowing into the session core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A pump appended a line.
    Activity(StreamKind),
    /// The flush timer fired.
    FlushTimerElapsed,
    /// The hard deadline passed.
    DeadlineElapsed,
    /// The process exited with this code (`None` if killed or unknown).
    ProcessExited(Option<i32>),
    /// Both pumps observed end of stream.
    StreamsSettled,
}

/// Timing and batching knobs for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub flush_interval: Duration,
    pub batch_lines: usize,
    pub deadline: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&ConfigFile::default())
    }
}

impl From<&ConfigFile> for SessionOptions {
    fn from(cfg: &ConfigFile) -> Self {
        Self {
            flush_interval: cfg.output.flush_interval(),
            batch_lines: cfg.output.batch_lines,
            deadline: cfg.limits.exec_duration(),
        }
    }
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::SessionCore;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::{Session, SessionOutcome};
