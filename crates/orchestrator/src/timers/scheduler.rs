//! Single-slot wake-up scheduling.
//!
//! Every actor owns one [`WakeSlot`]. Scheduling replaces the previous wake,
//! and each schedule bumps a generation so a timer message that was already
//! in flight when it got replaced is recognised as stale and dropped.

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;

/// Lifecycle of a wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeStatus {
    /// Nothing scheduled.
    Idle,
    /// Scheduled; the timer still has to be started.
    Pending,
    /// The timer task is running.
    Armed,
}

/// The one outstanding wake-up of an actor.
#[derive(Debug)]
pub struct WakeSlot {
    at: Option<DateTime<Utc>>,
    generation: u64,
    needs_arming: bool,
    timer: Option<AbortHandle>,
}

impl Default for WakeSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeSlot {
    /// An empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            at: None,
            generation: 0,
            needs_arming: false,
            timer: None,
        }
    }

    /// Schedule a wake at `at`, replacing any previous one.
    pub fn schedule(&mut self, at: DateTime<Utc>) -> u64 {
        self.cancel_timer();
        self.generation = self.generation.wrapping_add(1);
        self.at = Some(at);
        self.needs_arming = true;
        self.generation
    }

    /// Drop the pending wake, if any.
    pub fn clear(&mut self) {
        self.cancel_timer();
        self.generation = self.generation.wrapping_add(1);
        self.at = None;
        self.needs_arming = false;
    }

    /// Consume a fire of `generation`.
    ///
    /// Returns `true` exactly once per schedule; the slot is then empty
    /// until scheduled again.
    pub fn fire(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.at.is_none() {
            return false;
        }
        self.at = None;
        self.timer = None;
        self.needs_arming = false;
        true
    }

    /// Timestamp of the pending wake.
    #[must_use]
    pub const fn pending(&self) -> Option<DateTime<Utc>> {
        self.at
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn status(&self) -> WakeStatus {
        match (self.at, self.needs_arming) {
            (None, _) => WakeStatus::Idle,
            (Some(_), true) => WakeStatus::Pending,
            (Some(_), false) => WakeStatus::Armed,
        }
    }

    /// If a timer has to be started, the generation and instant to start it for.
    pub fn take_arm_request(&mut self) -> Option<(u64, DateTime<Utc>)> {
        if !self.needs_arming {
            return None;
        }
        self.needs_arming = false;
        self.at.map(|at| (self.generation, at))
    }

    /// Remember the running timer task so a later schedule can abort it.
    pub fn set_timer(&mut self, timer: AbortHandle) {
        self.cancel_timer();
        self.timer = Some(timer);
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for WakeSlot {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
