//! Durable stand-up actors.
//!
//! Three actor kinds run on one generic ractor host ([`DurableActor`]):
//!
//! - **Reminder** (`"{meetingId}-{participantId}"`): nudges the participant
//! - **Conversation** (`"{meetingId}-{participantId}"`): asks the questions
//! - **Brief** (`"{meetingId}"`): collects responses and publishes the summary
//!
//! Each actor owns its state exclusively, handles one message or wake-up at
//! a time, and persists through the [`StateStore`](crate::persistence::StateStore)
//! so a restart resumes where it stopped. Actors are addressed by name
//! through the [`ActorRuntime`] directories.
//!
//! # Example
//!
//! ```ignore
//! let runtime = ActorRuntime::new(integrations, store, Arc::new(SystemClock), settings);
//!
//! let conversation = runtime.conversation("m1-U1").await?;
//! conversation.send(ConversationCommand::StartConversation)?;
//!
//! let snapshot = conversation.snapshot().await?;
//! println!("phase: {:?}", snapshot.state.map(|s| s.phase));
//! ```

pub mod brief;
pub mod conversation;
pub mod directory;
pub mod durable;
pub mod errors;
pub mod messages;
pub mod reminder;
pub mod runtime;

// Re-export main types for convenience
pub use brief::{Brief, BriefCommand, BriefDescriptor, BriefInit, BriefPhase, BriefState};
pub use conversation::{
    Conversation, ConversationCommand, ConversationDescriptor, ConversationInit,
    ConversationPhase, ConversationState,
};
pub use directory::{ActorDirectory, ActorHandle, RPC_TIMEOUT};
pub use durable::{ActorContext, Behavior, DurableActor, DurableArgs};
pub use errors::ActorError;
pub use messages::{ActorSnapshot, DurableMessage};
pub use reminder::{Reminder, ReminderCommand, ReminderDescriptor, ReminderInit, ReminderState};
pub use runtime::ActorRuntime;
