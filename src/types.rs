// src/types.rs

use std::fmt;

/// Status attached to every outbound report.
///
/// `Partial` and `Download` may appear any number of times in a session;
/// exactly one of `Finish` / `Timeout` closes it. `Error` is only used when
/// the sandbox could not be started at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTag {
    Partial,
    Finish,
    Timeout,
    Download,
    Error,
}

impl StatusTag {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusTag::Partial => "PARTIAL",
            StatusTag::Finish => "FINISH",
            StatusTag::Timeout => "TIMEOUT",
            StatusTag::Download => "DOWNLOAD",
            StatusTag::Error => "ERROR",
        }
    }

    /// Whether this tag closes an execution session.
    pub fn is_terminal(self) -> bool {
        matches!(self, StatusTag::Finish | StatusTag::Timeout | StatusTag::Error)
    }
}

/// Renders as `(FINISH)`, the form used both in block headers and as the bare
/// body of an otherwise empty report.
impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.as_str())
    }
}

/// Which standard stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminationReason {
    /// Still running.
    #[default]
    None,
    /// The process exited on its own. `None` when no exit code is available
    /// (killed by a signal, or waiting failed).
    Exited(Option<i32>),
    /// The deadline elapsed and the process was killed.
    TimedOut,
}
