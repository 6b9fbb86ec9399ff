//! Persistence layer for the stand-up engine.
//!
//! This module provides:
//! - `StateStore`: durable actor records (state JSON + pending wake-up),
//!   with an in-memory and a SurrealDB implementation
//! - `SurrealStore`: opened from the `[store]` settings with its schema
//!   applied, plus SurrealDB implementations of the meeting store, the
//!   response audit log and the active-conversation index
//!
//! # Example
//!
//! ```ignore
//! use standup_orchestrator::persistence::{StateStore, SurrealStore};
//!
//! let store = SurrealStore::open(&config.store).await?;
//! let record = store.load("reminder", "m1-U1").await?;
//! ```

pub mod client;
pub mod error;
pub mod records;
pub mod state_store;

pub use client::SurrealStore;
pub use error::{PersistenceError, PersistenceResult};
pub use state_store::{InMemoryStateStore, StateStore, StoredActor};
