//! Mailbox messages of the durable actor host.
//!
//! Design principles:
//! - Commands are fire-and-forget (`send_message`)
//! - Destroy and Snapshot are RPCs (`call`) so the caller can wait
//! - Business errors are logged by the host, NOT actor crashes

use chrono::{DateTime, Utc};
use ractor::RpcReplyPort;

/// Everything a durable actor's mailbox can hold.
#[derive(Debug)]
pub enum DurableMessage<C, S> {
    // ═══════════════════════════════════════════════════════════════════════
    // COMMANDS (fire-and-forget)
    // ═══════════════════════════════════════════════════════════════════════
    /// A behavior-specific command.
    Command(C),

    /// A timer fire; stale generations are dropped.
    Wake { generation: u64 },

    // ═══════════════════════════════════════════════════════════════════════
    // RPCS (request-response)
    // ═══════════════════════════════════════════════════════════════════════
    /// Clear persisted state, cancel the wake-up and stop.
    Destroy(RpcReplyPort<()>),

    /// Read the in-memory state and pending wake-up.
    Snapshot(RpcReplyPort<ActorSnapshot<S>>),
}

/// Point-in-time view of an actor, for tests and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorSnapshot<S> {
    pub state: Option<S>,
    pub wake_at: Option<DateTime<Utc>>,
}
