//! Render coordinator - sequences one full-dashboard render pass
//!
//! ```text
//! render.requested ─▶ dashboard.initialized ─▶ collect ─▶ resolve ─▶ render.resolved
//! ```
//!
//! The coordinator is best-effort instrumentation: a failure anywhere in the
//! pass is logged and absorbed, never returned to the caller, and the
//! execution flag is cleared on every exit.

use ractor::ActorRef;
use shared_types::{CorrelationId, RenderResolved};
use tokio::time::Instant;

use crate::actors::event_bus::{subscribe, EventBusMsg};
use crate::render::collection::collect;
use crate::render::config::CoordinatorConfig;
use crate::render::error::CoordinatorError;
use crate::render::events::{emit_render_requested, emit_render_resolved, is_dashboard_initialized};
use crate::render::execution::{ExecutionFlag, ExecutionGuard, ExecutionObserver};
use crate::render::resolution::resolve;

/// Dashboard the render pass belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardContext {
    pub dashboard_ref: String,
}

impl DashboardContext {
    pub fn new(dashboard_ref: impl Into<String>) -> Self {
        Self {
            dashboard_ref: dashboard_ref.into(),
        }
    }

    fn source(&self) -> String {
        format!("render_coordinator:{}", self.dashboard_ref)
    }
}

pub struct RenderCoordinator {
    event_bus: ActorRef<EventBusMsg>,
    execution: ExecutionFlag,
}

impl RenderCoordinator {
    pub fn new(event_bus: ActorRef<EventBusMsg>) -> Self {
        Self {
            event_bus,
            execution: ExecutionFlag::new(),
        }
    }

    /// Handle for components that must not act while a pass is running.
    pub fn execution_observer(&self) -> ExecutionObserver {
        self.execution.observer()
    }

    pub fn is_executing(&self) -> bool {
        self.execution.is_in_progress()
    }

    /// Run one render pass to completion.
    ///
    /// Returns the `render.resolved` payload that was emitted, or `None` when
    /// the pass failed (the failure is logged).
    pub async fn run(
        &mut self,
        context: &DashboardContext,
        config: &CoordinatorConfig,
    ) -> Option<RenderResolved> {
        let correlation_id = config.mint_correlation_id();
        let mut in_progress = self.execution.begin();

        tracing::info!(
            correlation_id = %correlation_id,
            dashboard = %context.dashboard_ref,
            is_export = config.is_export_run,
            "Render pass started"
        );

        let outcome = self
            .drive(&correlation_id, context, config, &mut in_progress)
            .await;
        in_progress.finish();

        match outcome {
            Ok(resolved) => Some(resolved),
            Err(e) => {
                tracing::error!(
                    correlation_id = %correlation_id,
                    dashboard = %context.dashboard_ref,
                    error = %e,
                    "Render pass failed"
                );
                None
            }
        }
    }

    /// One pass from announcement to `render.resolved`.
    ///
    /// Both phases share one absolute deadline, `dashboard.initialized` plus
    /// `max_total_window`. When collection runs its full window this leaves
    /// resolution exactly `max_total_window - collection_window`. When
    /// collection ends early on the expected count, resolution gets the rest
    /// of the budget instead, and when `max_total_window` is shorter than the
    /// collection window the pass still ends at `max_total_window`.
    async fn drive(
        &self,
        correlation_id: &CorrelationId,
        context: &DashboardContext,
        config: &CoordinatorConfig,
        in_progress: &mut ExecutionGuard<'_>,
    ) -> Result<RenderResolved, CoordinatorError> {
        let source = context.source();

        // Subscribe before announcing so nothing sent in reply is missed.
        let mut subscription = subscribe(&self.event_bus, "*").await.map_err(|e| {
            CoordinatorError::Subscribe {
                topic: "*".to_string(),
                reason: e.to_string(),
            }
        })?;
        emit_render_requested(&self.event_bus, correlation_id, &source).await?;

        subscription
            .next_matching(is_dashboard_initialized)
            .await
            .ok_or(CoordinatorError::BusClosed("dashboard initialization"))?;

        let started = Instant::now();
        let deadline = started + config.max_total_window;

        let (registry, report) = collect(&mut subscription, config, deadline).await?;
        tracing::debug!(correlation_id = %correlation_id, report = ?report, "Collection report");

        let mut summary = resolve(registry, &mut subscription, deadline).await?;
        summary.missed_events = subscription.skipped();
        if summary.missed_events > 0 {
            tracing::warn!(
                correlation_id = %correlation_id,
                pattern = %subscription.pattern(),
                missed_events = summary.missed_events,
                "Render pass subscription lagged; async render events may have been lost"
            );
        }

        in_progress.finish();

        let resolved = RenderResolved {
            correlation_id: correlation_id.clone(),
            config: config.snapshot(),
            summary,
        };
        emit_render_resolved(&self.event_bus, &resolved, &source).await?;

        tracing::info!(
            correlation_id = %correlation_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            registered = resolved.summary.registered,
            abandoned = resolved.summary.abandoned,
            deadline_reached = resolved.summary.deadline_reached,
            "Render pass resolved"
        );

        Ok(resolved)
    }
}

impl std::fmt::Debug for RenderCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCoordinator")
            .field("event_bus", &self.event_bus.get_id())
            .field("executing", &self.is_executing())
            .finish()
    }
}
