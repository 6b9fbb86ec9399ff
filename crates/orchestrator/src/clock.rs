//! Wall-clock abstraction.
//!
//! Actors never call `Utc::now()` directly. Production wiring uses
//! [`SystemClock`]; tests use [`AnchoredClock`], which advances with tokio's
//! clock so `tokio::time::pause` drives hour-scale schedules instantly.

use std::fmt;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Source of the current UTC instant.
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a UTC anchor that advances with tokio's monotonic clock.
#[derive(Debug, Clone)]
pub struct AnchoredClock {
    anchor_utc: DateTime<Utc>,
    anchor: Instant,
}

impl AnchoredClock {
    /// Create a clock that reads `anchor_utc` right now.
    #[must_use]
    pub fn new(anchor_utc: DateTime<Utc>) -> Self {
        Self {
            anchor_utc,
            anchor: Instant::now(),
        }
    }
}

impl Clock for AnchoredClock {
    fn now(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.anchor.elapsed())
            .ok()
            .and_then(|elapsed| self.anchor_utc.checked_add_signed(elapsed))
            .unwrap_or(self.anchor_utc)
    }
}
