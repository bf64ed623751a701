// src/engine/runtime.rs

use std::fmt;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep, sleep_until, timeout};
use tracing::{debug, info, warn};

use crate::engine::core::SessionCore;
use crate::engine::{CoreCommand, SessionEvent, SessionOptions, SessionState};
use crate::exec::launcher::SpawnedProcess;
use crate::exec::pump::pump_lines;
use crate::message::Emitter;
use crate::types::{StreamKind, TerminationReason};

/// How long to wait for pumps and the stdin feeder after the terminal report
/// before abandoning them.
const REAP_GRACE: Duration = Duration::from_secs(5);

/// Stand-in for deadlines beyond what `Instant` can represent.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Summary of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub termination: TerminationReason,
    /// Partial reports accepted by the transport.
    pub partial_reports: usize,
    /// Whether the terminal report reached the transport.
    pub terminal_delivered: bool,
}

/// Drives one [`SessionCore`] against a live sandbox process.
///
/// The shell owns the child, the two pump tasks, the flush and deadline
/// timers and the emitter. Every decision is delegated to the core.
pub struct Session {
    core: SessionCore,
    emitter: Emitter,
    options: SessionOptions,
    partial_reports: usize,
    terminal_delivered: bool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("core", &self.core)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(emitter: Emitter, options: SessionOptions) -> Self {
        Self {
            core: SessionCore::new(options.batch_lines),
            emitter,
            options,
            partial_reports: 0,
            terminal_delivered: false,
        }
    }

    /// Run until the terminal report is sent and the process is reaped.
    ///
    /// Returns only after the process wait has completed and both pumps
    /// have finished (or were abandoned after [`REAP_GRACE`] following a
    /// timeout).
    pub async fn run(mut self, process: SpawnedProcess) -> SessionOutcome {
        let SpawnedProcess {
            mut child,
            stdout,
            stderr,
            mut stdin_feeder,
            started_at,
        } = process;

        let buffers = self.core.buffers();
        let (activity_tx, mut activity_rx) = mpsc::unbounded_channel::<StreamKind>();

        let mut pumps = JoinSet::new();
        pumps.spawn(pump_lines(
            stdout,
            StreamKind::Stdout,
            buffers.stdout.clone(),
            activity_tx.clone(),
        ));
        pumps.spawn(pump_lines(
            stderr,
            StreamKind::Stderr,
            buffers.stderr.clone(),
            activity_tx,
        ));

        let deadline = sleep_until(deadline_at(started_at, self.options.deadline));
        tokio::pin!(deadline);
        let flush = sleep(self.options.flush_interval);
        tokio::pin!(flush);

        let mut exited = false;

        info!(
            deadline_secs = self.options.deadline.as_secs(),
            flush_ms = self.options.flush_interval.as_millis() as u64,
            batch_lines = self.options.batch_lines,
            "session started"
        );

        while !self.core.is_done() {
            // Deadline first, then output before timers and exit, so lines
            // already signalled are batched before the process is seen gone.
            let event = match self.core.state() {
                SessionState::Running => tokio::select! {
                    biased;
                    _ = &mut deadline => SessionEvent::DeadlineElapsed,
                    Some(kind) = activity_rx.recv() => SessionEvent::Activity(kind),
                    _ = &mut flush => SessionEvent::FlushTimerElapsed,
                    status = child.wait() => {
                        exited = true;
                        SessionEvent::ProcessExited(exit_code(status))
                    }
                },
                SessionState::DrainingFinal => tokio::select! {
                    biased;
                    _ = &mut deadline => SessionEvent::DeadlineElapsed,
                    _ = join_pumps(&mut pumps) => SessionEvent::StreamsSettled,
                },
                SessionState::Done => break,
            };

            let step = self.core.step(event);
            for command in step.commands {
                match command {
                    CoreCommand::Emit(report) if report.tag().is_terminal() => {
                        let delivered = self.emitter.emit(&report).await;
                        self.terminal_delivered = delivered;
                        info!(tag = %report.tag(), delivered, "terminal report");
                    }
                    CoreCommand::Emit(report) => {
                        // A full outbound queue must not postpone the kill.
                        // The report is still delivered; TIMEOUT follows on
                        // the next turn since the deadline stays elapsed.
                        let send = self.emitter.emit(&report);
                        tokio::pin!(send);
                        let delivered = tokio::select! {
                            biased;
                            delivered = &mut send => delivered,
                            _ = &mut deadline => {
                                warn!("deadline passed while outbound queue is full; killing now");
                                if let Err(e) = child.start_kill() {
                                    debug!(error = %e, "kill failed");
                                }
                                send.await
                            }
                        };
                        if delivered {
                            self.partial_reports += 1;
                        }
                    }
                    CoreCommand::ResetFlushTimer => {
                        flush.as_mut().reset(Instant::now() + self.options.flush_interval);
                    }
                    CoreCommand::KillProcess => match child.start_kill() {
                        Ok(()) => info!("sandbox process killed"),
                        // Already gone; nothing to do.
                        Err(e) => debug!(error = %e, "kill failed"),
                    },
                }
            }

            if !step.keep_running {
                break;
            }
        }

        drop(activity_rx);
        self.reap(&mut child, exited, &mut pumps, &mut stdin_feeder)
            .await;

        let outcome = SessionOutcome {
            termination: self.core.termination(),
            partial_reports: self.partial_reports,
            terminal_delivered: self.terminal_delivered,
        };
        info!(?outcome, "session finished");
        outcome
    }

    async fn reap(
        &self,
        child: &mut tokio::process::Child,
        exited: bool,
        pumps: &mut JoinSet<usize>,
        stdin_feeder: &mut tokio::task::JoinHandle<()>,
    ) {
        if !exited {
            match child.wait().await {
                Ok(status) => debug!(%status, "sandbox process reaped"),
                Err(e) => warn!(error = %e, "waiting for killed process failed"),
            }
        }

        if timeout(REAP_GRACE, join_pumps(pumps)).await.is_err() {
            // Something outside the process still holds the pipes open.
            warn!("output streams still open after exit; abandoning pumps");
            pumps.abort_all();
            join_pumps(pumps).await;
        }

        if timeout(REAP_GRACE, &mut *stdin_feeder).await.is_err() {
            warn!("stdin feeder still blocked after exit; abandoning it");
            stdin_feeder.abort();
        }
    }
}

/// Wait until every pump in `pumps` has finished.
async fn join_pumps(pumps: &mut JoinSet<usize>) {
    while let Some(res) = pumps.join_next().await {
        match res {
            Ok(lines) => debug!(lines, "pump finished"),
            Err(e) if e.is_cancelled() => debug!("pump aborted"),
            Err(e) => warn!(error = %e, "pump task failed"),
        }
    }
}

/// `started_at + deadline`, saturating to a far-future instant.
fn deadline_at(started_at: Instant, deadline: Duration) -> Instant {
    started_at
        .checked_add(deadline)
        .unwrap_or_else(|| Instant::now() + FAR_FUTURE)
}

fn exit_code(status: io::Result<ExitStatus>) -> Option<i32> {
    match status {
        Ok(status) => {
            info!(%status, success = status.success(), "sandbox process exited");
            status.code()
        }
        Err(e) => {
            warn!(error = %e, "waiting for sandbox process failed");
            None
        }
    }
}
