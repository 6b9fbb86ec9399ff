//! Actor-specific error types.
//!
//! These are business logic errors returned by handlers and RPC replies.
//! They are NOT actor crashes: the host logs them and the actor keeps
//! running.

use std::time::Duration;

use thiserror::Error;

use crate::integrations::IntegrationError;
use crate::persistence::PersistenceError;

/// Business logic errors of the stand-up actors.
#[derive(Debug, Error)]
pub enum ActorError {
    /// The actor received work before `initialize`.
    #[error("Actor not initialized: {0}")]
    NotInitialized(String),

    /// A payload failed validation. Nothing was mutated.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// A payload carried a tag the actor does not know.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// The participant is already in another conversation.
    #[error("Participant {participant} is busy in {holder}")]
    Busy { participant: String, holder: String },

    /// No occurrence could be computed for the schedule.
    #[error("Schedule error: {0}")]
    Schedule(String),

    /// RPC call timed out.
    #[error("RPC timeout after {0:?}")]
    RpcTimeout(Duration),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Failed to spawn an actor.
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),
}

impl ActorError {
    /// Create a not initialized error.
    pub fn not_initialized(name: impl Into<String>) -> Self {
        Self::NotInitialized(name.into())
    }

    /// Create a malformed message error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedMessage(msg.into())
    }

    /// Create a schedule error.
    pub fn schedule(msg: impl Into<String>) -> Self {
        Self::Schedule(msg.into())
    }

    /// Create an RPC timeout error.
    pub fn rpc_timeout(duration: Duration) -> Self {
        Self::RpcTimeout(duration)
    }

    /// Create a channel error.
    pub fn channel_error(msg: impl Into<String>) -> Self {
        Self::ChannelError(msg.into())
    }

    /// Create a spawn failed error.
    pub fn spawn_failed(msg: impl Into<String>) -> Self {
        Self::SpawnFailed(msg.into())
    }

    /// Classify a JSON decoding failure: unknown tags are `UnknownCommand`,
    /// anything else is `MalformedMessage`.
    #[must_use]
    pub fn from_payload_error(err: &serde_json::Error) -> Self {
        let msg = err.to_string();
        if msg.contains("unknown variant") {
            Self::UnknownCommand(msg)
        } else {
            Self::MalformedMessage(msg)
        }
    }
}
