//! Resolution phase - drains the task registry within the remaining budget
//!
//! Waits until every registered supervisor has returned or the absolute
//! deadline passes, while still registering late async renders. Completion is
//! always re-checked against the registry as it is after the latest event, so
//! a widget that registers at the same moment the last known one finishes is
//! still waited on.

use shared_types::RenderSummary;
use tokio::time::Instant;

use crate::actors::event_bus::EventSubscription;
use crate::render::error::CoordinatorError;
use crate::render::registry::{Observed, TaskRegistry};

pub async fn resolve(
    mut registry: TaskRegistry,
    subscription: &mut EventSubscription,
    deadline: Instant,
) -> Result<RenderSummary, CoordinatorError> {
    let countdown = tokio::time::sleep_until(deadline);
    tokio::pin!(countdown);

    let mut deadline_reached = false;

    loop {
        tokio::select! {
            biased;
            _ = &mut countdown => {
                deadline_reached = true;
                break;
            }
            event = subscription.next() => {
                let Some(event) = event else {
                    registry.shutdown(false).await;
                    return Err(CoordinatorError::BusClosed("async render resolutions"));
                };
                if let Observed::Registered(id) = registry.observe(&event) {
                    tracing::info!(
                        async_render_id = %id,
                        registered = registry.len(),
                        "Late async render registered"
                    );
                }
            }
            more = registry.reap_next() => {
                if !more {
                    break;
                }
            }
        }
    }

    if deadline_reached {
        tracing::warn!(
            registered = registry.len(),
            "Render deadline reached; abandoning unfinished async renders"
        );
    }

    Ok(registry.shutdown(deadline_reached).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::event_bus::{subscribe, EventBusActor, EventBusArguments, EventBusMsg};
    use crate::render::events::{emit_async_render_requested, emit_async_render_resolved};
    use ractor::{Actor, ActorRef};
    use shared_types::AsyncRenderId;
    use std::time::Duration;

    const WINDOW: Duration = Duration::from_millis(100);

    async fn bus() -> (ActorRef<EventBusMsg>, EventSubscription) {
        let (bus, _handle) = Actor::spawn(None, EventBusActor, EventBusArguments::default())
            .await
            .unwrap();
        let sub = subscribe(&bus, "*").await.unwrap();
        (bus, sub)
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_registry_resolves_immediately() {
        let (_bus, mut sub) = bus().await;
        let started = Instant::now();

        let summary = resolve(
            TaskRegistry::new(WINDOW),
            &mut sub,
            started + Duration::from_secs(60),
        )
        .await
        .unwrap();

        assert_eq!(summary, RenderSummary::default());
        assert!(started.elapsed() < Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_all_registered_supervisors() {
        let (bus, mut sub) = bus().await;
        let mut registry = TaskRegistry::new(WINDOW);
        registry.register(AsyncRenderId::from("a"));
        registry.register(AsyncRenderId::from("b"));
        let started = Instant::now();

        let widgets = tokio::spawn(async move {
            emit_async_render_resolved(&bus, "a", "widget").await.unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
            emit_async_render_resolved(&bus, "b", "widget").await.unwrap();
            bus
        });

        let summary = resolve(registry, &mut sub, started + Duration::from_secs(60))
            .await
            .unwrap();
        let _bus = widgets.await.unwrap();

        assert_eq!(summary.registered, 2);
        assert_eq!(summary.stabilized, 2);
        assert!(!summary.deadline_reached);
        assert!(started.elapsed() >= Duration::from_millis(300) + WINDOW);
        assert!(started.elapsed() < Duration::from_millis(300) + WINDOW + Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_registration_is_waited_on() {
        let (bus, mut sub) = bus().await;
        let mut registry = TaskRegistry::new(WINDOW);
        registry.register(AsyncRenderId::from("early"));
        let started = Instant::now();

        let widgets = tokio::spawn(async move {
            emit_async_render_resolved(&bus, "early", "widget").await.unwrap();
            // Registers while "early" is still stabilizing.
            tokio::time::sleep(Duration::from_millis(50)).await;
            emit_async_render_requested(&bus, "late", "widget").await.unwrap();
            tokio::time::sleep(Duration::from_millis(1000)).await;
            emit_async_render_resolved(&bus, "late", "widget").await.unwrap();
            bus
        });

        let summary = resolve(registry, &mut sub, started + Duration::from_secs(60))
            .await
            .unwrap();
        let _bus = widgets.await.unwrap();

        assert_eq!(summary.registered, 2);
        assert_eq!(summary.stabilized, 2);
        assert!(started.elapsed() >= Duration::from_millis(1050) + WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_abandons_stuck_supervisor() {
        let (_bus, mut sub) = bus().await;
        let mut registry = TaskRegistry::new(WINDOW);
        registry.register(AsyncRenderId::from("stuck"));
        let started = Instant::now();

        let summary = resolve(registry, &mut sub, started + Duration::from_millis(1000))
            .await
            .unwrap();

        assert!(summary.deadline_reached);
        assert_eq!(summary.abandoned, 1);
        assert!(started.elapsed() >= Duration::from_millis(1000));
        assert!(started.elapsed() < Duration::from_millis(1005));
    }
}
