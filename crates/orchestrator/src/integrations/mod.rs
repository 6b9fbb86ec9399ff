//! External collaborators of the engine.
//!
//! - `ChatClient`: post, delete, open dialog
//! - `WorkLogClient`: issue-tracker work logs
//! - `MeetingStore`, `ResponseLog`, `ActiveConversationIndex`: the stores
//!
//! The actors reach all of them through one cloneable [`Integrations`]
//! bundle so tests can swap any piece.

pub mod chat;
pub mod error;
pub mod memory;
pub mod stores;
pub mod work_log;

use std::sync::Arc;

pub use chat::{
    ActionButton, ChatClient, ChatMessage, Dialog, LoggingChatClient, MessageReceipt, NudgeAction,
};
pub use error::{IntegrationError, IntegrationResult};
pub use memory::{
    ChatEvent, InMemoryActiveIndex, InMemoryMeetingStore, InMemoryResponseLog, RecordingChat,
    RecordingWorkLog,
};
pub use stores::{ActiveConversationIndex, ClaimOutcome, MeetingStore, ResponseLog};
pub use work_log::{DisabledWorkLogClient, HttpWorkLogClient, WorkLogClient};

/// The collaborators every actor can reach.
#[derive(Debug, Clone)]
pub struct Integrations {
    pub chat: Arc<dyn ChatClient>,
    pub work_log: Arc<dyn WorkLogClient>,
    pub meetings: Arc<dyn MeetingStore>,
    pub responses: Arc<dyn ResponseLog>,
    pub active: Arc<dyn ActiveConversationIndex>,
}
