//! Collection phase - discovers the first wave of async renders
//!
//! Listens for `render.async.requested` during the collection window and
//! spawns one supervisor per distinct id. Ends early once the expected task
//! count is reached.

use shared_types::AsyncRenderId;
use tokio::time::Instant;

use crate::actors::event_bus::EventSubscription;
use crate::render::config::CoordinatorConfig;
use crate::render::error::CoordinatorError;
use crate::render::registry::{Observed, TaskRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    /// Distinct async render ids seen during collection
    pub registered: usize,
    pub expected: Option<usize>,
    /// Expected count reached before the window closed
    pub ended_early: bool,
    pub shortfall: Option<CollectionShortfall>,
}

/// Expected count configured but not reached when the window closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionShortfall {
    pub observed: usize,
    pub expected: usize,
}

/// Build the initial task registry.
///
/// The window is cut short by `deadline` (the absolute cap of the pass).
pub async fn collect(
    subscription: &mut EventSubscription,
    config: &CoordinatorConfig,
    deadline: Instant,
) -> Result<(TaskRegistry, CollectionReport), CoordinatorError> {
    let expected = config.expected_count();
    let window_end = (Instant::now() + config.effective_collection_window()).min(deadline);
    let countdown = tokio::time::sleep_until(window_end);
    tokio::pin!(countdown);

    let mut registry = TaskRegistry::new(config.stabilization_window);
    let mut ended_early = false;

    loop {
        if expected.is_some_and(|expected| registry.len() >= expected) {
            ended_early = true;
            break;
        }

        tokio::select! {
            biased;
            _ = &mut countdown => break,
            event = subscription.next() => {
                let event = event.ok_or(CoordinatorError::BusClosed("async render registrations"))?;
                if let Observed::Registered(id) = registry.observe(&event) {
                    log_registration(&id, registry.len(), expected);
                }
            }
        }
    }

    let shortfall = match expected {
        Some(expected) if registry.len() < expected => Some(CollectionShortfall {
            observed: registry.len(),
            expected,
        }),
        _ => None,
    };

    if let Some(shortfall) = shortfall {
        if config.is_export_run {
            // Export tooling only captures error-level output.
            tracing::error!(
                observed = shortfall.observed,
                expected = shortfall.expected,
                "Async render collection window closed before expected count was reached"
            );
        } else {
            tracing::debug!(
                observed = shortfall.observed,
                expected = shortfall.expected,
                "Async render collection shortfall"
            );
        }
    }

    tracing::info!(
        registered = registry.len(),
        ended_early,
        "Async render collection finished"
    );

    let report = CollectionReport {
        registered: registry.len(),
        expected,
        ended_early,
        shortfall,
    };
    Ok((registry, report))
}

fn log_registration(id: &AsyncRenderId, registered: usize, expected: Option<usize>) {
    tracing::debug!(
        async_render_id = %id,
        registered,
        expected = ?expected,
        "Collected async render"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::event_bus::{subscribe, EventBusActor, EventBusArguments, EventBusMsg};
    use crate::render::events::emit_async_render_requested;
    use ractor::{Actor, ActorRef};
    use std::time::Duration;

    async fn bus() -> (ActorRef<EventBusMsg>, EventSubscription) {
        let (bus, _handle) = Actor::spawn(None, EventBusActor, EventBusArguments::default())
            .await
            .unwrap();
        let sub = subscribe(&bus, "*").await.unwrap();
        (bus, sub)
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(3600)
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_dashboard_collects_nothing_after_window() {
        let (_bus, mut sub) = bus().await;
        let config = CoordinatorConfig::default();
        let started = Instant::now();

        let (registry, report) = collect(&mut sub, &config, far_deadline()).await.unwrap();

        assert!(registry.is_empty());
        assert!(!report.ended_early);
        assert_eq!(report.shortfall, None);
        assert!(started.elapsed() >= config.collection_window);
        assert!(started.elapsed() < config.collection_window + Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_ids_register_once() {
        let (bus, mut sub) = bus().await;
        for id in ["chart", "chart", "table", "chart"] {
            emit_async_render_requested(&bus, id, "widget").await.unwrap();
        }

        let config = CoordinatorConfig::default().with_collection_window(Duration::from_millis(200));
        let (registry, report) = collect(&mut sub, &config, far_deadline()).await.unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(report.registered, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expected_count_ends_collection_early() {
        let (bus, mut sub) = bus().await;
        let config = CoordinatorConfig::default().with_expected_task_count(2);
        let started = Instant::now();

        let widgets = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            emit_async_render_requested(&bus, "a", "widget").await.unwrap();
            tokio::time::sleep(Duration::from_millis(60)).await;
            emit_async_render_requested(&bus, "b", "widget").await.unwrap();
            bus
        });

        let (registry, report) = collect(&mut sub, &config, far_deadline()).await.unwrap();
        let _bus = widgets.await.unwrap();

        assert_eq!(registry.len(), 2);
        assert!(report.ended_early);
        assert!(started.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_run_reports_shortfall() {
        let (bus, mut sub) = bus().await;
        emit_async_render_requested(&bus, "only", "widget").await.unwrap();

        let config = CoordinatorConfig::default()
            .with_collection_window(Duration::from_millis(100))
            .with_expected_task_count(3)
            .with_export_run(true);
        let (_registry, report) = collect(&mut sub, &config, far_deadline()).await.unwrap();

        assert!(!report.ended_early);
        assert_eq!(
            report.shortfall,
            Some(CollectionShortfall {
                observed: 1,
                expected: 3
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_is_cut_by_deadline() {
        let (_bus, mut sub) = bus().await;
        let config = CoordinatorConfig::default();
        let started = Instant::now();

        collect(&mut sub, &config, started + Duration::from_millis(300))
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_millis(305));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_bus_is_an_error() {
        let (bus, mut sub) = bus().await;
        bus.stop(None);

        let config = CoordinatorConfig::default();
        let result = collect(&mut sub, &config, far_deadline()).await;
        assert!(matches!(result, Err(CoordinatorError::BusClosed(_))));
    }
}
