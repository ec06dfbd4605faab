//! Single-shot timers.
//!
//! Every timer the transport uses belongs to one [`TimerKind`]. At most one
//! timer per kind is outstanding: arming a kind replaces the pending one, and
//! a fire is only acted on if its [`TimerToken`] is still the armed one.

use std::collections::HashMap;
use std::time::Duration;

/// The timers the transport schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Backoff delay before the next connection attempt
    Reconnect,
    /// Quiet period after a surface size change
    ResizeDebounce,
    /// Delay before the redraw-kick restores the true geometry
    RedrawRestore,
}

/// Identifies one arming of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

/// Arm/cancel interface for single-shot timers.
pub trait Scheduler: Send {
    /// Arm `kind` to fire after `delay`, replacing any pending timer of that kind.
    fn arm(&mut self, kind: TimerKind, delay: Duration) -> TimerToken;

    /// Cancel the pending timer of `kind`, if any.
    fn cancel(&mut self, kind: TimerKind);

    /// Accept a fire of `kind`.
    ///
    /// Returns true only if `token` is the currently armed timer; the timer
    /// is then no longer pending. Fires of replaced or cancelled timers
    /// return false.
    fn claim(&mut self, kind: TimerKind, token: TimerToken) -> bool;

    /// Whether a timer of `kind` is pending.
    fn is_armed(&self, kind: TimerKind) -> bool;
}

/// Token bookkeeping shared by scheduler implementations.
#[derive(Debug, Default)]
pub struct TimerSlots {
    next: u64,
    armed: HashMap<TimerKind, TimerToken>,
}

impl TimerSlots {
    /// Create empty slots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token for `kind`, invalidating the previous one.
    pub fn arm(&mut self, kind: TimerKind) -> TimerToken {
        self.next += 1;
        let token = TimerToken(self.next);
        self.armed.insert(kind, token);
        token
    }

    /// Forget the pending token of `kind`.
    pub fn cancel(&mut self, kind: TimerKind) -> Option<TimerToken> {
        self.armed.remove(&kind)
    }

    /// Consume the pending token of `kind` if it equals `token`.
    pub fn claim(&mut self, kind: TimerKind, token: TimerToken) -> bool {
        if self.armed.get(&kind) == Some(&token) {
            self.armed.remove(&kind);
            true
        } else {
            false
        }
    }

    /// Pending token of `kind`.
    pub fn pending(&self, kind: TimerKind) -> Option<TimerToken> {
        self.armed.get(&kind).copied()
    }

    /// Whether `kind` has a pending token.
    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.contains_key(&kind)
    }

    /// Number of pending timers across all kinds.
    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }
}
