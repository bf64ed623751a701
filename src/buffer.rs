// src/buffer.rs

//! Shared FIFO of captured output lines.
//!
//! A `LineBuffer` is a cheap handle: clones share the same queue. The stream
//! pump for one stream appends to it while the session core drains it, so
//! every operation takes the inner lock for its whole duration.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, VecDeque<String>> {
        // A panicking appender cannot leave the queue half-written, so a
        // poisoned lock is still safe to use.
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one line at the back.
    pub fn push(&self, line: impl Into<String>) {
        self.guard().push_back(line.into());
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Remove and return at most `max` lines from the front.
    ///
    /// A buffer holding fewer than `max` lines is emptied.
    pub fn drain_up_to(&self, max: usize) -> Vec<String> {
        let mut lines = self.guard();
        let n = max.min(lines.len());
        lines.drain(..n).collect()
    }

    /// Remove and return every buffered line.
    pub fn drain_all(&self) -> Vec<String> {
        self.guard().drain(..).collect()
    }
}

/// The stdout/stderr buffer pair of one session.
#[derive(Debug, Clone, Default)]
pub struct SessionBuffers {
    pub stdout: LineBuffer,
    pub stderr: LineBuffer,
}

impl SessionBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if either stream holds at least `threshold` lines.
    pub fn reached(&self, threshold: usize) -> bool {
        self.stdout.len() >= threshold || self.stderr.len() >= threshold
    }

    /// Up to `max` lines from each stream, independently.
    pub fn drain_batch(&self, max: usize) -> (Vec<String>, Vec<String>) {
        (self.stdout.drain_up_to(max), self.stderr.drain_up_to(max))
    }

    pub fn drain_all(&self) -> (Vec<String>, Vec<String>) {
        (self.stdout.drain_all(), self.stderr.drain_all())
    }
}
