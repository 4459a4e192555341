//! Explicit poll-scheduling primitive.
//!
//! The poller never blocks between ticks; it holds a deadline. Parked means
//! no deadline at all (indefinite suspension), resuming sets the deadline to
//! `now` so the next tick fires immediately, and each tick hands back the
//! following fire time explicitly. Parking and resuming are the only gating
//! operations; there is no separate cancellation path.

use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// No tick scheduled; the poller is parked.
    Never,
    At(Instant),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PollTimer {
    next: Option<Instant>,
}

impl PollTimer {
    pub fn new() -> Self {
        Self { next: None }
    }

    pub fn next_fire(&self) -> Deadline {
        match self.next {
            Some(at) => Deadline::At(at),
            None => Deadline::Never,
        }
    }

    pub fn is_parked(&self) -> bool {
        self.next.is_none()
    }

    /// Suspend indefinitely.
    pub fn park(&mut self) {
        self.next = None;
    }

    /// Schedule an immediate tick.
    pub fn resume(&mut self, now: Instant) {
        self.next = Some(now);
    }

    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.next, Some(at) if at <= now)
    }

    /// Record the next fire time returned by a tick.
    pub fn reschedule(&mut self, at: Instant) {
        self.next = Some(at);
    }
}
