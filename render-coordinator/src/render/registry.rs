//! Task registry - supervisors of one render pass, keyed by async render id
//!
//! Owned by exactly one phase controller at a time and moved by value from
//! collection to resolution. The owning controller is the only reader of the
//! coordinator's bus subscription; it feeds widget events through
//! [`TaskRegistry::observe`], which registers new ids and routes signals for
//! known ones to their supervisor.

use std::collections::HashMap;
use std::time::Duration;

use shared_types::{AsyncRenderId, RenderSummary};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::actors::event_bus::Event;
use crate::render::events::{decode_async_render, RenderSignal};
use crate::render::supervisor::{supervise, SupervisorOutcome};

/// What the registry did with an observed event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    /// First request for this id; a supervisor was spawned
    Registered(AsyncRenderId),
    /// Delivered to the id's running supervisor
    Forwarded,
    /// Unknown id or finished supervisor
    Dropped,
    /// Not an async render event
    Unrelated,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    stabilized: usize,
    retries_exhausted: usize,
    abandoned: usize,
}

pub struct TaskRegistry {
    routes: HashMap<AsyncRenderId, mpsc::UnboundedSender<RenderSignal>>,
    tasks: JoinSet<(AsyncRenderId, SupervisorOutcome)>,
    stabilization_window: Duration,
    tally: Tally,
}

impl TaskRegistry {
    pub fn new(stabilization_window: Duration) -> Self {
        Self {
            routes: HashMap::new(),
            tasks: JoinSet::new(),
            stabilization_window,
            tally: Tally::default(),
        }
    }

    /// Spawn a supervisor for `id` unless one was already registered.
    ///
    /// Ids stay registered after their supervisor returns, so a later request
    /// for a finished id does not restart tracking.
    pub fn register(&mut self, id: AsyncRenderId) -> bool {
        if self.routes.contains_key(&id) {
            return false;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.tasks
            .spawn(supervise(id.clone(), rx, self.stabilization_window));
        tracing::debug!(async_render_id = %id, "Registered async render");
        self.routes.insert(id, tx);
        true
    }

    /// Deliver a signal to the supervisor of `id`.
    pub fn route(&self, id: &AsyncRenderId, signal: RenderSignal) -> bool {
        match self.routes.get(id) {
            Some(tx) => tx.send(signal).is_ok(),
            None => false,
        }
    }

    pub fn observe(&mut self, event: &Event) -> Observed {
        let Some((id, signal)) = decode_async_render(event) else {
            return Observed::Unrelated;
        };

        if signal == RenderSignal::Requested && self.register(id.clone()) {
            return Observed::Registered(id);
        }

        if self.route(&id, signal) {
            Observed::Forwarded
        } else {
            tracing::trace!(
                async_render_id = %id,
                signal = ?signal,
                "Dropping signal for unknown or finished async render"
            );
            Observed::Dropped
        }
    }

    pub fn contains(&self, id: &AsyncRenderId) -> bool {
        self.routes.contains_key(id)
    }

    /// Distinct ids registered so far
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Wait for the next supervisor to return.
    ///
    /// Returns `false` immediately when no supervisor is left to wait on.
    pub async fn reap_next(&mut self) -> bool {
        match self.tasks.join_next().await {
            Some(joined) => {
                self.record(joined);
                true
            }
            None => false,
        }
    }

    /// Cancel every running supervisor and summarize the pass.
    pub async fn shutdown(mut self, deadline_reached: bool) -> RenderSummary {
        self.tasks.abort_all();
        while let Some(joined) = self.tasks.join_next().await {
            self.record(joined);
        }

        RenderSummary {
            registered: self.routes.len(),
            stabilized: self.tally.stabilized,
            retries_exhausted: self.tally.retries_exhausted,
            abandoned: self.tally.abandoned,
            deadline_reached,
            missed_events: 0,
        }
    }

    fn record(
        &mut self,
        joined: Result<(AsyncRenderId, SupervisorOutcome), tokio::task::JoinError>,
    ) {
        match joined {
            Ok((_, SupervisorOutcome::Stabilized { .. })) => self.tally.stabilized += 1,
            Ok((id, SupervisorOutcome::RetriesExhausted)) => {
                tracing::info!(
                    async_render_id = %id,
                    "Async render forced complete after repeated re-renders"
                );
                self.tally.retries_exhausted += 1;
            }
            Err(e) if e.is_cancelled() => self.tally.abandoned += 1,
            Err(e) => {
                tracing::error!(error = %e, "Task supervisor panicked");
                self.tally.abandoned += 1;
            }
        }
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("registered", &self.routes.len())
            .field("running", &self.tasks.len())
            .field("stabilization_window", &self.stabilization_window)
            .finish()
    }
}
