// src/engine/core.rs

//! Pure session state machine.
//!
//! `SessionCore` consumes [`SessionEvent`]s and returns the commands the
//! async shell should run. It has no channels, timers or processes, so the
//! scheduling rules can be unit tested synchronously. The only shared state
//! it touches is the pair of line buffers the pumps append to.

use tracing::{debug, info, trace};

use crate::buffer::SessionBuffers;
use crate::engine::event_handlers::{
    CoreStep, handle_activity, handle_deadline, handle_flush_timer, handle_streams_settled,
};
use crate::engine::{SessionEvent, SessionState};
use crate::types::TerminationReason;

#[derive(Debug)]
pub struct SessionCore {
    buffers: SessionBuffers,
    batch_lines: usize,
    state: SessionState,
    termination: TerminationReason,
}

impl SessionCore {
    pub fn new(batch_lines: usize) -> Self {
        Self {
            buffers: SessionBuffers::new(),
            batch_lines: batch_lines.max(1),
            state: SessionState::Running,
            termination: TerminationReason::None,
        }
    }

    /// Handles for the pumps to append to.
    pub fn buffers(&self) -> SessionBuffers {
        self.buffers.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn termination(&self) -> TerminationReason {
        self.termination
    }

    pub fn is_done(&self) -> bool {
        self.state == SessionState::Done
    }

    /// Handle one event and return what the shell should do next.
    ///
    /// Exactly one terminal report is ever produced; once `Done`, every event
    /// is ignored.
    pub fn step(&mut self, event: SessionEvent) -> CoreStep {
        trace!(?event, state = ?self.state, "session event");

        match (self.state, event) {
            (SessionState::Done, _) => CoreStep::idle(false),

            (SessionState::Running, SessionEvent::Activity(_)) => {
                handle_activity(&self.buffers, self.batch_lines)
            }
            (SessionState::Running, SessionEvent::FlushTimerElapsed) => {
                handle_flush_timer(&self.buffers)
            }
            (SessionState::Running, SessionEvent::ProcessExited(code)) => {
                debug!(?code, "process exited; waiting for streams to settle");
                self.termination = TerminationReason::Exited(code);
                self.state = SessionState::DrainingFinal;
                CoreStep::idle(true)
            }

            (SessionState::Running | SessionState::DrainingFinal, SessionEvent::DeadlineElapsed) => {
                let running = self.state == SessionState::Running;
                info!(process_running = running, "deadline elapsed");
                self.termination = TerminationReason::TimedOut;
                self.state = SessionState::Done;
                handle_deadline(&self.buffers, running)
            }

            (SessionState::DrainingFinal, SessionEvent::StreamsSettled) => {
                self.state = SessionState::Done;
                handle_streams_settled(&self.buffers)
            }

            // Late or out-of-order signals: pumps may close before the
            // process exits, and activity after exit is folded into FINISH.
            (state, event) => {
                trace!(?event, ?state, "event ignored in this state");
                CoreStep::idle(true)
            }
        }
    }
}
