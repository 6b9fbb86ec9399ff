//! # Stand-up orchestrator
//!
//! Durable Reminder, Conversation and Brief actors that run recurring team
//! stand-ups asynchronously, plus the orchestrator that wires them per
//! meeting and the HTTP surface in front of it.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub use standup_core::{Error, Result};

/// Durable actors and their directory
pub mod actors;

/// HTTP API
pub mod api;

/// Wall clock abstraction
pub mod clock;

/// TOML configuration
pub mod config;

/// Meetings, participants and responses
pub mod domain;

/// Chat, work-log and store collaborators
pub mod integrations;

/// Meeting lifecycle and participant interactions
pub mod orchestrator;

/// SurrealDB and in-memory persistence
pub mod persistence;

/// Chat texts
pub mod render;

/// Local-time occurrence arithmetic
pub mod schedule;

/// Single-slot wake-ups
pub mod timers;

pub use actors::{ActorError, ActorRuntime};
pub use clock::{AnchoredClock, Clock, SystemClock};
pub use config::StandupConfig;
pub use orchestrator::{InteractionOutcome, MeetingOrchestrator, OrchestratorError};
