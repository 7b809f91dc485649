//! Scripted dashboard for exercising the coordinator without real widgets
//!
//! A widget plan is a comma-separated list of `id:render_ms[:rerenders]`
//! entries, e.g. `chart:120,table:300:2,kpi:40`. Each widget requests an
//! async render as soon as the dashboard is initialized, resolves after
//! `render_ms`, and then re-enters rendering `rerenders` times.

use std::time::Duration;

use anyhow::Context;
use ractor::ActorRef;
use shared_types::{AsyncRenderId, RenderResolved, EVENT_TOPIC_RENDER_REQUESTED};
use tokio::task::JoinSet;

use crate::actors::event_bus::{subscribe, EventBusMsg};
use crate::render::{
    emit_async_render_requested, emit_async_render_resolved, emit_dashboard_initialized,
    CoordinatorConfig, CoordinatorError, DashboardContext, RenderCoordinator,
};

pub const DEFAULT_WIDGET_PLAN: &str = "chart:120,table:300:1,kpi:40";

/// Pause between a resolution and the cascading re-request
pub const RERENDER_GAP: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetScript {
    pub id: AsyncRenderId,
    pub render_time: Duration,
    pub rerenders: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanParseError {
    #[error("invalid widget entry '{entry}': {reason}")]
    InvalidEntry { entry: String, reason: String },
}

pub fn parse_widget_plan(raw: &str) -> Result<Vec<WidgetScript>, PlanParseError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_entry)
        .collect()
}

fn parse_entry(entry: &str) -> Result<WidgetScript, PlanParseError> {
    let invalid = |reason: &str| PlanParseError::InvalidEntry {
        entry: entry.to_string(),
        reason: reason.to_string(),
    };

    let mut parts = entry.split(':');
    let id = parts.next().unwrap_or_default();
    let render_ms = parts
        .next()
        .ok_or_else(|| invalid("missing render time"))?
        .parse::<u64>()
        .map_err(|e| invalid(&e.to_string()))?;
    let rerenders = match parts.next() {
        Some(raw) => raw.parse::<u32>().map_err(|e| invalid(&e.to_string()))?,
        None => 0,
    };
    if parts.next().is_some() {
        return Err(invalid("too many fields"));
    }

    Ok(WidgetScript {
        id: AsyncRenderId::from(id),
        render_time: Duration::from_millis(render_ms),
        rerenders,
    })
}

/// Play one widget's request/resolve cycles onto the bus.
pub async fn play_widget(
    event_bus: ActorRef<EventBusMsg>,
    script: WidgetScript,
) -> Result<(), CoordinatorError> {
    let source = format!("widget:{}", script.id);

    for cycle in 0..=script.rerenders {
        if cycle > 0 {
            tokio::time::sleep(RERENDER_GAP).await;
        }
        emit_async_render_requested(&event_bus, script.id.clone(), &source).await?;
        tokio::time::sleep(script.render_time).await;
        emit_async_render_resolved(&event_bus, script.id.clone(), &source).await?;
    }
    Ok(())
}

/// Run one coordinated render pass against scripted widgets.
pub async fn simulate(
    event_bus: ActorRef<EventBusMsg>,
    plan: Vec<WidgetScript>,
    config: CoordinatorConfig,
) -> anyhow::Result<Option<RenderResolved>> {
    let mut started = subscribe(&event_bus, EVENT_TOPIC_RENDER_REQUESTED)
        .await
        .map_err(|e| anyhow::anyhow!("failed to subscribe to render events: {e}"))?;

    let mut coordinator = RenderCoordinator::new(event_bus.clone());
    let context = DashboardContext::new("render-sim");
    let pass = tokio::spawn(async move { coordinator.run(&context, &config).await });

    started
        .next()
        .await
        .context("event bus closed before the render pass started")?;
    emit_dashboard_initialized(&event_bus, "dashboard:render-sim").await?;

    let mut widgets = JoinSet::new();
    for script in plan {
        tracing::debug!(async_render_id = %script.id, rerenders = script.rerenders, "Starting widget");
        widgets.spawn(play_widget(event_bus.clone(), script));
    }

    let resolved = pass.await.context("render pass task panicked")?;

    widgets.abort_all();
    while let Some(joined) = widgets.join_next().await {
        if let Ok(Err(e)) = joined {
            tracing::warn!(error = %e, "Widget script failed");
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_widget_plan() {
        let plan = parse_widget_plan("chart:120, table:300:2 ,").unwrap();
        assert_eq!(
            plan,
            vec![
                WidgetScript {
                    id: AsyncRenderId::from("chart"),
                    render_time: Duration::from_millis(120),
                    rerenders: 0,
                },
                WidgetScript {
                    id: AsyncRenderId::from("table"),
                    render_time: Duration::from_millis(300),
                    rerenders: 2,
                },
            ]
        );
    }

    #[test]
    fn test_parse_widget_plan_rejects_bad_entries() {
        assert!(parse_widget_plan("chart").is_err());
        assert!(parse_widget_plan("chart:soon").is_err());
        assert!(parse_widget_plan("chart:1:2:3").is_err());
    }

    #[test]
    fn test_empty_plan_is_valid() {
        assert!(parse_widget_plan("").unwrap().is_empty());
    }

    #[test]
    fn test_default_plan_parses() {
        assert_eq!(parse_widget_plan(DEFAULT_WIDGET_PLAN).unwrap().len(), 3);
    }
}
