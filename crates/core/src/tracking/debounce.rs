//! Mutation-signal debouncing
//!
//! DOM mutation signals can arrive in bursts (one page render touches many
//! subtrees). The debouncer coalesces every signal inside a fixed window
//! into a single collection cycle, while interval ticks bypass it entirely.

use std::time::{Duration, Instant};

/// Coalesces rapidly repeated mutation signals into one delayed trigger.
///
/// Pure timing state; the scheduler loop feeds it `Instant`s so it stays
/// deterministic under test.
#[derive(Debug)]
pub struct MutationDebouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl MutationDebouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, deadline: None }
    }

    /// Record a mutation signal. Signals arriving while a window is already
    /// armed are absorbed into it; the pending cycle is not pushed back.
    pub fn signal(&mut self, now: Instant) {
        if self.deadline.is_none() {
            self.deadline = Some(now + self.window);
        }
    }

    /// The instant the pending trigger fires, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the armed window has elapsed. Consumes the trigger when due.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any armed trigger (an interval cycle just collected everything
    /// a pending mutation trigger would have).
    pub fn reset(&mut self) {
        self.deadline = None;
    }
}
