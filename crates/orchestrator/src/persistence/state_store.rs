//! Durable actor state records.
//!
//! Each actor kind owns a namespace (`reminder`, `conversation`, `brief`);
//! within it a record is keyed by the actor's stable name and holds the
//! serialized state plus the single pending wake-up.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;
use tokio::sync::RwLock;

use super::client::SurrealStore;
use super::error::{PersistenceResult, from_surrealdb_error};

/// What the store keeps for one actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredActor {
    /// State as a JSON string, `None` before `initialize`
    pub state: Option<String>,
    /// The one outstanding wake-up, if any
    pub wake_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl StoredActor {
    /// Encode a typed state.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if the state cannot be encoded.
    pub fn encode<S: Serialize>(
        state: Option<&S>,
        wake_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> PersistenceResult<Self> {
        let state = state.map(serde_json::to_string).transpose()?;
        Ok(Self {
            state,
            wake_at,
            updated_at,
        })
    }

    /// Decode the typed state.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if the stored JSON does not match `S`.
    pub fn decode<S: DeserializeOwned>(&self) -> PersistenceResult<Option<S>> {
        let state = self
            .state
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(state)
    }
}

/// Keyed storage for actor records.
#[async_trait]
pub trait StateStore: Send + Sync + fmt::Debug {
    /// Load the record for `name` in the `kind` namespace.
    async fn load(&self, kind: &str, name: &str) -> PersistenceResult<Option<StoredActor>>;

    /// Insert or replace the record.
    async fn save(&self, kind: &str, name: &str, record: StoredActor) -> PersistenceResult<()>;

    /// Remove the record. Removing a missing record is not an error.
    async fn delete(&self, kind: &str, name: &str) -> PersistenceResult<()>;

    /// Names in the `kind` namespace that have a pending wake-up.
    async fn scheduled(&self, kind: &str) -> PersistenceResult<Vec<String>>;
}

/// Process-local state store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    records: RwLock<HashMap<(String, String), StoredActor>>,
}

impl InMemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a record exists.
    pub async fn contains(&self, kind: &str, name: &str) -> bool {
        self.records
            .read()
            .await
            .contains_key(&(kind.to_string(), name.to_string()))
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self, kind: &str, name: &str) -> PersistenceResult<Option<StoredActor>> {
        Ok(self
            .records
            .read()
            .await
            .get(&(kind.to_string(), name.to_string()))
            .cloned())
    }

    async fn save(&self, kind: &str, name: &str, record: StoredActor) -> PersistenceResult<()> {
        self.records
            .write()
            .await
            .insert((kind.to_string(), name.to_string()), record);
        Ok(())
    }

    async fn delete(&self, kind: &str, name: &str) -> PersistenceResult<()> {
        self.records
            .write()
            .await
            .remove(&(kind.to_string(), name.to_string()));
        Ok(())
    }

    async fn scheduled(&self, kind: &str) -> PersistenceResult<Vec<String>> {
        let mut names: Vec<String> = self
            .records
            .read()
            .await
            .iter()
            .filter(|((k, _), record)| k == kind && record.wake_at.is_some())
            .map(|((_, name), _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Actor record as stored in SurrealDB.
///
/// The stable name is kept as a field as well so `scheduled` can return it
/// without parsing record ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ActorRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    #[serde(default)]
    name: String,
    state: Option<String>,
    wake_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ScheduledRow {
    name: String,
}

impl ActorRecord {
    fn new(name: &str, stored: StoredActor) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            state: stored.state,
            wake_at: stored.wake_at,
            updated_at: stored.updated_at,
        }
    }
}

impl From<ActorRecord> for StoredActor {
    fn from(record: ActorRecord) -> Self {
        Self {
            state: record.state,
            wake_at: record.wake_at,
            updated_at: record.updated_at,
        }
    }
}

#[async_trait]
impl StateStore for SurrealStore {
    async fn load(&self, kind: &str, name: &str) -> PersistenceResult<Option<StoredActor>> {
        let record: Option<ActorRecord> = self
            .db()
            .select((kind.to_string(), name.to_string()))
            .await
            .map_err(from_surrealdb_error)?;

        Ok(record.map(StoredActor::from))
    }

    async fn save(&self, kind: &str, name: &str, record: StoredActor) -> PersistenceResult<()> {
        let _: Option<ActorRecord> = self
            .db()
            .upsert((kind.to_string(), name.to_string()))
            .content(ActorRecord::new(name, record))
            .await
            .map_err(from_surrealdb_error)?;

        Ok(())
    }

    async fn delete(&self, kind: &str, name: &str) -> PersistenceResult<()> {
        let _: Option<ActorRecord> = self
            .db()
            .delete((kind.to_string(), name.to_string()))
            .await
            .map_err(from_surrealdb_error)?;

        Ok(())
    }

    async fn scheduled(&self, kind: &str) -> PersistenceResult<Vec<String>> {
        let mut response = self
            .db()
            .query(
                "SELECT name FROM type::table($table) \
                 WHERE wake_at != NONE AND wake_at != NULL ORDER BY name",
            )
            .bind(("table", kind.to_string()))
            .await
            .map_err(from_surrealdb_error)?;

        let rows: Vec<ScheduledRow> = response.take(0).map_err(from_surrealdb_error)?;
        Ok(rows.into_iter().map(|row| row.name).collect())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        hits: u32,
    }

    fn record() -> StoredActor {
        let at = Utc.with_ymd_and_hms(2024, 3, 4, 5, 0, 0).unwrap();
        StoredActor::encode(Some(&Counter { hits: 3 }), Some(at), at).unwrap()
    }

    async fn exercise(store: &dyn StateStore) {
        assert!(store.load("reminder", "m1-U1").await.unwrap().is_none());

        store.save("reminder", "m1-U1", record()).await.unwrap();
        let loaded = store.load("reminder", "m1-U1").await.unwrap().unwrap();
        assert_eq!(loaded.decode::<Counter>().unwrap(), Some(Counter { hits: 3 }));
        assert_eq!(loaded.wake_at, record().wake_at);

        // namespaces are separate
        assert!(store.load("conversation", "m1-U1").await.unwrap().is_none());

        store.delete("reminder", "m1-U1").await.unwrap();
        assert!(store.load("reminder", "m1-U1").await.unwrap().is_none());
        store.delete("reminder", "m1-U1").await.unwrap();
    }

    async fn exercise_scheduled(store: &dyn StateStore) {
        let idle = StoredActor::encode(Some(&Counter { hits: 0 }), None, Utc::now()).unwrap();
        store.save("brief", "m2", record()).await.unwrap();
        store.save("brief", "m1", record()).await.unwrap();
        store.save("brief", "m3", idle).await.unwrap();
        store.save("reminder", "m1-U1", record()).await.unwrap();

        assert_eq!(
            store.scheduled("brief").await.unwrap(),
            vec!["m1".to_string(), "m2".to_string()]
        );
    }

    #[tokio::test]
    async fn given_in_memory_store_when_saved_then_loaded_by_kind_and_name() {
        exercise(&InMemoryStateStore::new()).await;
    }

    #[tokio::test]
    async fn given_in_memory_records_when_listing_scheduled_then_only_pending_wakes() {
        exercise_scheduled(&InMemoryStateStore::new()).await;
    }

    #[tokio::test]
    async fn given_surreal_records_when_listing_scheduled_then_only_pending_wakes() {
        let store = SurrealStore::in_memory().await.unwrap();
        exercise_scheduled(&store).await;
    }

    #[tokio::test]
    async fn given_surreal_mem_store_when_saved_then_loaded_by_kind_and_name() {
        let store = SurrealStore::in_memory().await.unwrap();
        exercise(&store).await;
    }

    #[test]
    fn given_empty_state_when_encoded_then_decodes_to_none() {
        let stored = StoredActor::encode::<Counter>(None, None, Utc::now()).unwrap();
        assert_eq!(stored.decode::<Counter>().unwrap(), None);
    }
}
