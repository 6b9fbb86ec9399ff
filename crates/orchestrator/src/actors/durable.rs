//! Durable actor host.
//!
//! [`DurableActor`] is a generic ractor actor that gives any [`Behavior`]
//! persisted state and a single durable wake-up:
//!
//! - `pre_start` loads the stored record and re-arms the pending wake before
//!   the first message is handled
//! - commands and wake-ups go through the same mailbox, so they never run
//!   concurrently for one actor
//! - after every handler the state is flushed if it changed and the timer
//!   is (re)armed
//! - handler errors are logged; the actor keeps running

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::errors::ActorError;
use super::messages::{ActorSnapshot, DurableMessage};
use super::runtime::ActorRuntime;
use crate::config::ScheduleSettings;
use crate::integrations::Integrations;
use crate::persistence::StoredActor;
use crate::timers::WakeSlot;

/// The domain half of a durable actor.
#[async_trait]
pub trait Behavior: Default + Send + Sync + 'static {
    /// Namespace of this kind in the state store.
    const KIND: &'static str;

    type State: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static;

    /// Tagged command enum; unknown tags fail to parse.
    type Command: DeserializeOwned + fmt::Debug + Send + 'static;

    async fn handle(
        &self,
        ctx: &mut ActorContext<Self::State>,
        command: Self::Command,
    ) -> Result<(), ActorError>;

    /// Runs when the pending wake-up fires.
    async fn wake(&self, ctx: &mut ActorContext<Self::State>) -> Result<(), ActorError>;

    /// Runs before the record is deleted on `destroy`.
    async fn on_destroy(&self, _ctx: &mut ActorContext<Self::State>) -> Result<(), ActorError> {
        Ok(())
    }
}

/// What a behavior sees while handling one message.
pub struct ActorContext<S> {
    kind: &'static str,
    name: String,
    runtime: Arc<ActorRuntime>,
    state: Option<S>,
    wake: WakeSlot,
    dirty: bool,
    destroyed: bool,
}

impl<S> fmt::Debug for ActorContext<S>
where
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorContext")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("wake", &self.wake)
            .field("dirty", &self.dirty)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl<S> ActorContext<S>
where
    S: Serialize + Clone + Send + Sync,
{
    fn new(kind: &'static str, name: String, runtime: Arc<ActorRuntime>) -> Self {
        Self {
            kind,
            name,
            runtime,
            state: None,
            wake: WakeSlot::new(),
            dirty: false,
            destroyed: false,
        }
    }

    /// Stable name of this actor.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn runtime(&self) -> &Arc<ActorRuntime> {
        &self.runtime
    }

    #[must_use]
    pub fn integrations(&self) -> &Integrations {
        self.runtime.integrations()
    }

    #[must_use]
    pub fn settings(&self) -> &ScheduleSettings {
        self.runtime.settings()
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.runtime.now()
    }

    #[must_use]
    pub fn state(&self) -> Option<&S> {
        self.state.as_ref()
    }

    /// The state, or `NotInitialized`.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` before `initialize` has run.
    pub fn require_state(&self) -> Result<&S, ActorError> {
        self.state
            .as_ref()
            .ok_or_else(|| ActorError::not_initialized(self.qualified_name()))
    }

    /// Mutable state; marks the context dirty. A rejected call leaves the
    /// context clean, so nothing is written for an uninitialized actor.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` before `initialize` has run.
    pub fn require_state_mut(&mut self) -> Result<&mut S, ActorError> {
        match self.state.as_mut() {
            Some(state) => {
                self.dirty = true;
                Ok(state)
            }
            None => Err(ActorError::not_initialized(format!(
                "{}/{}",
                self.kind, self.name
            ))),
        }
    }

    pub fn replace_state(&mut self, state: S) {
        self.state = Some(state);
        self.dirty = true;
    }

    /// Replace the pending wake-up.
    pub fn schedule_wake_at(&mut self, at: DateTime<Utc>) {
        self.wake.schedule(at);
        self.dirty = true;
    }

    /// Schedule the wake-up `delay` from now.
    ///
    /// # Errors
    ///
    /// Returns `Schedule` if the instant overflows.
    pub fn schedule_wake_in(&mut self, delay: chrono::Duration) -> Result<DateTime<Utc>, ActorError> {
        let at = self
            .now()
            .checked_add_signed(delay)
            .ok_or_else(|| ActorError::schedule(format!("{delay} from now overflows")))?;
        self.schedule_wake_at(at);
        Ok(at)
    }

    /// Write state and pending wake to the store.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if encoding or the store fails.
    pub async fn persist(&mut self) -> Result<(), ActorError> {
        let record = StoredActor::encode(self.state.as_ref(), self.wake.pending(), self.now())?;
        self.runtime
            .store()
            .save(self.kind, &self.name, record)
            .await?;
        self.dirty = false;
        Ok(())
    }

    /// Delete the record and stop once the current handler returns.
    pub fn destroy(&mut self) {
        self.destroyed = true;
    }

    fn qualified_name(&self) -> String {
        format!("{}/{}", self.kind, self.name)
    }

    fn snapshot(&self) -> ActorSnapshot<S> {
        ActorSnapshot {
            state: self.state.clone(),
            wake_at: self.wake.pending(),
        }
    }
}

/// Spawn arguments of a durable actor.
#[derive(Debug, Clone)]
pub struct DurableArgs {
    pub name: String,
    pub runtime: Arc<ActorRuntime>,
}

/// The ractor actor hosting a [`Behavior`].
pub struct DurableActor<B> {
    behavior: B,
}

impl<B: Default> Default for DurableActor<B> {
    fn default() -> Self {
        Self {
            behavior: B::default(),
        }
    }
}

impl<B: Behavior> DurableActor<B> {
    fn report(ctx: &ActorContext<B::State>, phase: &'static str, result: Result<(), ActorError>) {
        if let Err(e) = result {
            warn!(
                kind = B::KIND,
                actor = %ctx.name,
                phase,
                error = %e,
                "Handler failed"
            );
        }
    }

    /// Apply destroy, flush dirty state and arm the timer.
    async fn settle(myself: &ActorRef<DurableMessage<B::Command, B::State>>, ctx: &mut ActorContext<B::State>) {
        if ctx.destroyed {
            ctx.wake.clear();
            ctx.state = None;
            if let Err(e) = ctx.runtime.store().delete(B::KIND, &ctx.name).await {
                warn!(kind = B::KIND, actor = %ctx.name, error = %e, "Failed to delete actor record");
            }
            info!(kind = B::KIND, actor = %ctx.name, "Actor destroyed");
            myself.stop(Some("destroyed".to_string()));
            return;
        }

        if ctx.dirty {
            if let Err(e) = ctx.persist().await {
                let retryable = matches!(&e, ActorError::Persistence(p) if p.is_retryable());
                warn!(kind = B::KIND, actor = %ctx.name, retryable, error = %e, "Failed to persist actor state");
            }
        }

        Self::arm(myself, ctx);
    }

    fn arm(myself: &ActorRef<DurableMessage<B::Command, B::State>>, ctx: &mut ActorContext<B::State>) {
        let Some((generation, at)) = ctx.wake.take_arm_request() else {
            return;
        };

        let delay = at
            .signed_duration_since(ctx.now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        debug!(kind = B::KIND, actor = %ctx.name, wake_at = %at, ?delay, "Wake armed");

        let actor = myself.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if actor
                .send_message(DurableMessage::Wake { generation })
                .is_err()
            {
                debug!(generation, "Wake dropped, actor stopped");
            }
        });
        ctx.wake.set_timer(timer.abort_handle());
    }
}

impl<B: Behavior> Actor for DurableActor<B> {
    type Msg = DurableMessage<B::Command, B::State>;
    type State = ActorContext<B::State>;
    type Arguments = DurableArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let DurableArgs { name, runtime } = args;
        let stored = runtime.store().load(B::KIND, &name).await?;

        let mut ctx = ActorContext::new(B::KIND, name, runtime);
        if let Some(stored) = stored {
            ctx.state = stored.decode()?;
            if let Some(at) = stored.wake_at {
                ctx.wake.schedule(at);
            }
        }

        debug!(
            kind = B::KIND,
            actor = %ctx.name,
            initialized = ctx.state.is_some(),
            wake_at = ?ctx.wake.pending(),
            wake = ?ctx.wake.status(),
            "Actor loaded"
        );

        Self::arm(&myself, &mut ctx);
        Ok(ctx)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        ctx: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DurableMessage::Command(command) => {
                debug!(kind = B::KIND, actor = %ctx.name, ?command, "Command received");
                let result = self.behavior.handle(ctx, command).await;
                Self::report(ctx, "command", result);
                Self::settle(&myself, ctx).await;
            }

            DurableMessage::Wake { generation } => {
                if !ctx.wake.fire(generation) {
                    debug!(kind = B::KIND, actor = %ctx.name, generation, "Stale wake ignored");
                    return Ok(());
                }
                ctx.dirty = true;
                let result = self.behavior.wake(ctx).await;
                Self::report(ctx, "wake", result);
                Self::settle(&myself, ctx).await;
            }

            DurableMessage::Destroy(reply) => {
                let result = self.behavior.on_destroy(ctx).await;
                Self::report(ctx, "destroy", result);
                ctx.destroy();
                Self::settle(&myself, ctx).await;
                if reply.send(()).is_err() {
                    debug!(kind = B::KIND, actor = %ctx.name, "Destroy caller went away");
                }
            }

            DurableMessage::Snapshot(reply) => {
                if reply.send(ctx.snapshot()).is_err() {
                    debug!(kind = B::KIND, actor = %ctx.name, "Snapshot caller went away");
                }
            }
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        ctx: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        ctx.wake.clear();
        Ok(())
    }
}
