// src/engine/event_handlers.rs

//! Per-event rules of the session core.

use crate::buffer::SessionBuffers;
use crate::report::Report;
use crate::types::StatusTag;

/// Command produced by the pure core, executed by the async shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send this report to the transport.
    Emit(Report),
    /// Restart the flush timer from now.
    ResetFlushTimer,
    /// Force-kill the sandbox process.
    KillProcess,
}

/// Decision returned by the core after handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    /// Commands to execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the shell loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn idle(keep_running: bool) -> Self {
        Self {
            commands: Vec::new(),
            keep_running,
        }
    }
}

/// New output arrived.
///
/// Nothing happens until one stream reaches `batch_lines`; then up to that
/// many lines are taken from each stream and sent as a partial report.
pub fn handle_activity(buffers: &SessionBuffers, batch_lines: usize) -> CoreStep {
    if !buffers.reached(batch_lines) {
        return CoreStep::idle(true);
    }

    let (stdout, stderr) = buffers.drain_batch(batch_lines);
    let mut commands = Vec::with_capacity(2);
    if let Some(report) = Report::partial(&stdout, &stderr) {
        commands.push(CoreCommand::Emit(report));
    }
    commands.push(CoreCommand::ResetFlushTimer);

    CoreStep {
        commands,
        keep_running: true,
    }
}

/// The flush timer fired: send whatever is buffered, if anything.
pub fn handle_flush_timer(buffers: &SessionBuffers) -> CoreStep {
    let (stdout, stderr) = buffers.drain_all();
    let mut commands = Vec::with_capacity(2);
    if let Some(report) = Report::partial(&stdout, &stderr) {
        commands.push(CoreCommand::Emit(report));
    }
    commands.push(CoreCommand::ResetFlushTimer);

    CoreStep {
        commands,
        keep_running: true,
    }
}

/// The deadline passed: kill if still running, then close with `TIMEOUT`.
pub fn handle_deadline(buffers: &SessionBuffers, process_running: bool) -> CoreStep {
    let mut commands = Vec::with_capacity(2);
    if process_running {
        commands.push(CoreCommand::KillProcess);
    }

    let (stdout, stderr) = buffers.drain_all();
    commands.push(CoreCommand::Emit(Report::terminal(
        StatusTag::Timeout,
        &stdout,
        &stderr,
    )));

    CoreStep {
        commands,
        keep_running: false,
    }
}

/// Both pumps are done after process exit: close with `FINISH`.
pub fn handle_streams_settled(buffers: &SessionBuffers) -> CoreStep {
    let (stdout, stderr) = buffers.drain_all();
    CoreStep {
        commands: vec![CoreCommand::Emit(Report::terminal(
            StatusTag::Finish,
            &stdout,
            &stderr,
        ))],
        keep_running: false,
    }
}
