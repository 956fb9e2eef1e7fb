//! Virtual-time command scheduler.
//!
//! The session runs on a caller-supplied nanosecond clock. Commands that do
//! not apply immediately (speed-bumped order messages, timed auto-cancels,
//! batch clearing ticks) are parked here in a priority queue keyed by
//! `(apply_at, admission_seq)`. Draining the queue up to a deadline replays
//! them in exactly the order a real-time venue would have applied them:
//! effective apply time first, admission order as the tie-break.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::types::OrderCommand;

/// A command parked until its effective apply time.
#[derive(Debug, Clone)]
pub struct ScheduledCommand {
    /// Session-relative nanoseconds at which the command takes effect
    pub apply_at: u64,

    /// Admission order, breaks apply-time ties
    pub seq: u64,

    pub command: OrderCommand,
}

impl PartialEq for ScheduledCommand {
    fn eq(&self, other: &Self) -> bool {
        self.apply_at == other.apply_at && self.seq == other.seq
    }
}

impl Eq for ScheduledCommand {}

// BinaryHeap is a max-heap; invert so the earliest (apply_at, seq) pops first.
impl Ord for ScheduledCommand {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.apply_at, other.seq).cmp(&(self.apply_at, self.seq))
    }
}

impl PartialOrd for ScheduledCommand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue of deferred commands.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<ScheduledCommand>,
    seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            seq: 0,
        }
    }

    /// Park a command until `apply_at`.
    pub fn push(&mut self, apply_at: u64, command: OrderCommand) {
        let seq = self.seq;
        self.seq += 1;
        self.queue.push(ScheduledCommand {
            apply_at,
            seq,
            command,
        });
    }

    /// Earliest pending apply time, if any.
    pub fn next_due(&self) -> Option<u64> {
        self.queue.peek().map(|c| c.apply_at)
    }

    /// Pop the next command due at or before `deadline`.
    pub fn pop_due(&mut self, deadline: u64) -> Option<ScheduledCommand> {
        if self.queue.peek().is_some_and(|c| c.apply_at <= deadline) {
            self.queue.pop()
        } else {
            None
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Next exact multiple of `interval` strictly after `now`. Batch ticks are
/// aligned to the session epoch, so ticks never drift with processing time.
pub fn next_aligned_tick(now: u64, interval: u64) -> u64 {
    (now / interval + 1) * interval
}

// ============================================================================
// Unit Tests
// ============================================================================
