//! SurrealDB bootstrap for the stand-up store.
//!
//! [`SurrealStore::open`] takes the `[store]` section of the service
//! configuration and returns a handle that is ready for the actors: the
//! connection is signed in, the namespace and database are selected, the
//! stand-up tables are defined and the database has answered a metadata query.

use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use tracing::{debug, info};

use super::error::{PersistenceResult, from_surrealdb_error};
use crate::config::StoreSettings;

/// Tables of the actor records, meetings, audit log and claims.
const SCHEMA: &str = include_str!("schema.surql");

/// Connection to the stand-up database.
///
/// One handle backs the actor state store, the meeting store, the response
/// audit log and the active-conversation index.
#[derive(Debug, Clone)]
pub struct SurrealStore {
    db: Arc<Surreal<Any>>,
}

impl SurrealStore {
    /// Connect with `settings` and prepare the database.
    ///
    /// Re-running against an existing database is safe; the schema only
    /// defines what is missing.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` if the engine cannot be reached or the
    /// credentials are rejected, and `QueryFailed` if the schema or the
    /// metadata query fails.
    pub async fn open(settings: &StoreSettings) -> PersistenceResult<Self> {
        let db = Surreal::<Any>::init();
        db.connect(settings.url.as_str())
            .await
            .map_err(from_surrealdb_error)?;

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            db.signin(Root { username, password })
                .await
                .map_err(from_surrealdb_error)?;
            debug!(username = %username, "Signed in to SurrealDB");
        }

        db.use_ns(settings.namespace.as_str())
            .use_db(settings.database.as_str())
            .await
            .map_err(from_surrealdb_error)?;

        let store = Self { db: Arc::new(db) };
        store.define_schema().await?;
        store.health_check().await?;

        info!(
            url = %settings.url,
            namespace = %settings.namespace,
            database = %settings.database,
            "Stand-up store ready"
        );
        Ok(store)
    }

    /// A fresh in-process database with the default namespace.
    ///
    /// # Errors
    ///
    /// See [`SurrealStore::open`].
    pub async fn in_memory() -> PersistenceResult<Self> {
        Self::open(&StoreSettings::default()).await
    }

    pub(crate) fn db(&self) -> &Surreal<Any> {
        &self.db
    }

    /// Check the database answers a metadata query.
    ///
    /// # Errors
    ///
    /// Returns the classified SurrealDB error.
    pub async fn health_check(&self) -> PersistenceResult<()> {
        self.db
            .query("INFO FOR DB")
            .await
            .map_err(from_surrealdb_error)?
            .check()
            .map_err(from_surrealdb_error)?;
        Ok(())
    }

    async fn define_schema(&self) -> PersistenceResult<()> {
        self.db
            .query(SCHEMA)
            .await
            .map_err(from_surrealdb_error)?
            .check()
            .map_err(from_surrealdb_error)?;
        debug!("Stand-up schema defined");
        Ok(())
    }
}
