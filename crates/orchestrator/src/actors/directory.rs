//! Name-to-actor directory.
//!
//! `resolve(name)` is idempotent: while an actor for `name` is alive every
//! caller gets the same instance, and once it has stopped the next resolve
//! spawns a fresh one that reloads the persisted record. The map is locked
//! while resolving a name, and while destroying one until the old instance
//! has fully stopped, so two instances of a name are never alive at once.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ractor::concurrency::JoinHandle;
use ractor::rpc::CallResult;
use ractor::{Actor, ActorRef, ActorStatus};
use tokio::sync::Mutex;
use tracing::debug;

use super::durable::{Behavior, DurableActor, DurableArgs};
use super::errors::ActorError;
use super::messages::{ActorSnapshot, DurableMessage};
use super::runtime::ActorRuntime;

/// Timeout for request-response calls into an actor.
pub const RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// Suffix of registry names. The ractor registry is process-wide, so it is
/// shared by every runtime.
static SPAWN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

type Mailbox<B> = ActorRef<DurableMessage<<B as Behavior>::Command, <B as Behavior>::State>>;

/// A spawned actor and the task that finishes when it stops.
struct Spawned<B: Behavior> {
    actor: Mailbox<B>,
    stopped: JoinHandle<()>,
}

/// Address of a live durable actor.
pub struct ActorHandle<B: Behavior> {
    name: String,
    actor: Mailbox<B>,
}

impl<B: Behavior> Clone for ActorHandle<B> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            actor: self.actor.clone(),
        }
    }
}

impl<B: Behavior> fmt::Debug for ActorHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorHandle")
            .field("kind", &B::KIND)
            .field("name", &self.name)
            .finish()
    }
}

impl<B: Behavior> ActorHandle<B> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fire-and-forget delivery of a command.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError` if the actor's mailbox is closed.
    pub fn send(&self, command: B::Command) -> Result<(), ActorError> {
        self.actor
            .send_message(DurableMessage::Command(command))
            .map_err(|_| ActorError::channel_error(format!("{}/{}: mailbox closed", B::KIND, self.name)))
    }

    /// Parse a JSON payload into a command and deliver it.
    ///
    /// Validation happens before delivery, so a rejected payload never
    /// reaches the actor.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCommand` for an unknown tag, `MalformedMessage` for
    /// any other decoding failure, or the errors of [`ActorHandle::send`].
    pub fn send_json(&self, payload: &str) -> Result<(), ActorError> {
        let command: B::Command =
            serde_json::from_str(payload).map_err(|e| ActorError::from_payload_error(&e))?;
        self.send(command)
    }

    /// Read the actor's in-memory state and pending wake-up.
    ///
    /// # Errors
    ///
    /// Returns `RpcTimeout` or `ChannelError` if the actor does not answer.
    pub async fn snapshot(&self) -> Result<ActorSnapshot<B::State>, ActorError> {
        let result = self
            .actor
            .call(DurableMessage::Snapshot, Some(RPC_TIMEOUT))
            .await
            .map_err(|_| ActorError::channel_error(format!("{}/{}: mailbox closed", B::KIND, self.name)))?;

        match result {
            CallResult::Success(snapshot) => Ok(snapshot),
            CallResult::Timeout => Err(ActorError::rpc_timeout(RPC_TIMEOUT)),
            CallResult::SenderError => Err(ActorError::channel_error(format!(
                "{}/{}: no reply",
                B::KIND,
                self.name
            ))),
        }
    }

    /// Waits as long as the handler in progress takes; destroy queues
    /// behind it and must not be abandoned half-way.
    async fn destroy(&self) -> Result<(), ActorError> {
        let result = self
            .actor
            .call(DurableMessage::Destroy, None)
            .await
            .map_err(|_| ActorError::channel_error(format!("{}/{}: mailbox closed", B::KIND, self.name)))?;

        match result {
            CallResult::Success(()) => Ok(()),
            CallResult::Timeout | CallResult::SenderError => Err(ActorError::channel_error(
                format!("{}/{}: destroy not acknowledged", B::KIND, self.name),
            )),
        }
    }
}

fn is_alive(status: ActorStatus) -> bool {
    matches!(
        status,
        ActorStatus::Starting | ActorStatus::Running | ActorStatus::Upgrading
    )
}

/// Directory of one actor kind.
pub struct ActorDirectory<B: Behavior> {
    actors: Mutex<HashMap<String, Spawned<B>>>,
}

impl<B: Behavior> Default for ActorDirectory<B> {
    fn default() -> Self {
        Self {
            actors: Mutex::new(HashMap::new()),
        }
    }
}

impl<B: Behavior> fmt::Debug for ActorDirectory<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorDirectory")
            .field("kind", &B::KIND)
            .finish_non_exhaustive()
    }
}

impl<B: Behavior> ActorDirectory<B> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name` to its actor, spawning and loading it if needed.
    ///
    /// # Errors
    ///
    /// Returns `SpawnFailed` if the actor cannot start, e.g. because its
    /// record cannot be loaded.
    pub async fn resolve(
        &self,
        name: &str,
        runtime: &Arc<ActorRuntime>,
    ) -> Result<ActorHandle<B>, ActorError> {
        let mut actors = self.actors.lock().await;
        let actor = self.resolve_locked(&mut actors, name, runtime).await?;
        Ok(ActorHandle {
            name: name.to_string(),
            actor,
        })
    }

    /// Destroy the actor for `name`: clear its record and cancel its wake.
    ///
    /// An actor that is not running is loaded first, so a record left by a
    /// previous process is cleared too. Returns once the instance has
    /// stopped; the entry stays in the map until then. Destroying a name
    /// that has no record is a no-op, so a failed teardown can be re-run.
    ///
    /// # Errors
    ///
    /// Returns `SpawnFailed` or `ChannelError`.
    pub async fn destroy(&self, name: &str, runtime: &Arc<ActorRuntime>) -> Result<(), ActorError> {
        let mut actors = self.actors.lock().await;
        let actor = self.resolve_locked(&mut actors, name, runtime).await?;

        let handle: ActorHandle<B> = ActorHandle {
            name: name.to_string(),
            actor,
        };
        if let Err(e) = handle.destroy().await {
            // The instance was already stopping on its own; destroy a fresh one.
            debug!(kind = B::KIND, actor = %name, error = %e, "Destroy raced a stop, retrying");
            Self::await_stop(&mut actors, name).await;
            let actor = self.resolve_locked(&mut actors, name, runtime).await?;
            let handle: ActorHandle<B> = ActorHandle {
                name: name.to_string(),
                actor,
            };
            handle.destroy().await?;
        }

        Self::await_stop(&mut actors, name).await;
        Ok(())
    }

    async fn await_stop(actors: &mut HashMap<String, Spawned<B>>, name: &str) {
        if let Some(spawned) = actors.remove(name) {
            if spawned.stopped.await.is_err() {
                debug!(kind = B::KIND, actor = %name, "Actor task aborted");
            }
        }
    }

    /// Number of live actors.
    pub async fn live_count(&self) -> usize {
        self.actors
            .lock()
            .await
            .values()
            .filter(|spawned| is_alive(spawned.actor.get_status()))
            .count()
    }

    /// Stop every actor without touching persisted state, and wait until
    /// they have stopped.
    pub async fn shutdown(&self) {
        let mut actors = self.actors.lock().await;
        let stopping: Vec<Spawned<B>> = actors.drain().map(|(_, spawned)| spawned).collect();
        for spawned in &stopping {
            spawned.actor.stop(Some("shutdown".to_string()));
        }
        for spawned in stopping {
            if spawned.stopped.await.is_err() {
                debug!(kind = B::KIND, "Actor task aborted during shutdown");
            }
        }
    }

    async fn resolve_locked(
        &self,
        actors: &mut HashMap<String, Spawned<B>>,
        name: &str,
        runtime: &Arc<ActorRuntime>,
    ) -> Result<Mailbox<B>, ActorError> {
        if let Some(spawned) = actors.get(name) {
            if is_alive(spawned.actor.get_status()) {
                return Ok(spawned.actor.clone());
            }
        }

        // Registry names must be unique even while a stopped instance of the
        // same stable name is still unregistering.
        let sequence = SPAWN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let actor_name = format!("{}/{}#{}", B::KIND, name, sequence);

        let (actor, stopped) = Actor::spawn(
            Some(actor_name.clone()),
            DurableActor::<B>::default(),
            DurableArgs {
                name: name.to_string(),
                runtime: Arc::clone(runtime),
            },
        )
        .await
        .map_err(|e| {
            ActorError::spawn_failed(format!(
                "Failed to spawn '{}' (actor: {}): {}",
                name, actor_name, e
            ))
        })?;

        debug!(kind = B::KIND, actor = %name, registry_name = %actor_name, "Actor spawned");
        actors.insert(
            name.to_string(),
            Spawned {
                actor: actor.clone(),
                stopped,
            },
        );
        Ok(actor)
    }
}
