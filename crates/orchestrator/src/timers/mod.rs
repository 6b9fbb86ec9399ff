//! Durable wake-ups for actors.
//!
//! Each actor holds at most one pending wake-up. The timestamp is persisted
//! with the actor's state and re-armed when the actor is reloaded, so a
//! restart neither loses nor duplicates a fire.
//!
//! # Key Types
//!
//! - `WakeSlot`: the single outstanding wake-up and its generation counter
//! - `WakeStatus`: idle, pending (not yet armed) or armed

mod scheduler;

pub use scheduler::{WakeSlot, WakeStatus};
