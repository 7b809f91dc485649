//! Render event emission and decoding
//!
//! Typed wrappers over the bus for the render topics. Widgets (and the
//! simulation) use the `emit_async_*` functions; the coordinator emits the
//! pass-level events and decodes widget events into [`RenderSignal`]s.

use ractor::ActorRef;
use serde::de::DeserializeOwned;
use shared_types::{
    AsyncRenderId, AsyncRenderRequested, AsyncRenderResolved, CorrelationId,
    DashboardInitialized, RenderRequested, RenderResolved, EVENT_TOPIC_DASHBOARD_INITIALIZED,
    EVENT_TOPIC_RENDER_ASYNC_REQUESTED, EVENT_TOPIC_RENDER_ASYNC_RESOLVED,
    EVENT_TOPIC_RENDER_REQUESTED, EVENT_TOPIC_RENDER_RESOLVED,
};

use crate::actors::event_bus::{publish_event, Event, EventBusMsg};
use crate::render::error::CoordinatorError;

/// Per-id widget signal routed to a task supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderSignal {
    Requested,
    Resolved,
}

/// Decode a widget async render event.
///
/// Returns `None` for other topics and for malformed payloads (logged).
pub fn decode_async_render(event: &Event) -> Option<(AsyncRenderId, RenderSignal)> {
    let decoded = match event.topic.as_str() {
        EVENT_TOPIC_RENDER_ASYNC_REQUESTED => decode_payload::<AsyncRenderRequested>(event)
            .map(|payload| (payload.id, RenderSignal::Requested)),
        EVENT_TOPIC_RENDER_ASYNC_RESOLVED => decode_payload::<AsyncRenderResolved>(event)
            .map(|payload| (payload.id, RenderSignal::Resolved)),
        _ => return None,
    };

    match decoded {
        Ok(signal) => Some(signal),
        Err(e) => {
            tracing::warn!(
                event_id = %event.id,
                source = %event.source,
                error = %e,
                "Ignoring malformed async render event"
            );
            None
        }
    }
}

/// Decode an event payload, naming the topic on failure.
pub fn decode_payload<T: DeserializeOwned>(event: &Event) -> Result<T, CoordinatorError> {
    event.decode().map_err(|source| CoordinatorError::Decode {
        topic: event.topic.clone(),
        source,
    })
}

async fn publish(event_bus: &ActorRef<EventBusMsg>, event: Event) -> Result<(), CoordinatorError> {
    let topic = event.topic.clone();
    publish_event(event_bus, event)
        .await
        .map_err(|e| CoordinatorError::Publish {
            topic,
            reason: e.to_string(),
        })
}

pub fn is_dashboard_initialized(event: &Event) -> bool {
    event.topic == EVENT_TOPIC_DASHBOARD_INITIALIZED
}

/// Emit the dashboard scaffolding readiness signal
pub async fn emit_dashboard_initialized(
    event_bus: &ActorRef<EventBusMsg>,
    source: &str,
) -> Result<(), CoordinatorError> {
    let event = Event::new(
        EVENT_TOPIC_DASHBOARD_INITIALIZED,
        DashboardInitialized::default(),
        source,
    )?;
    publish(event_bus, event).await
}

/// Emit render pass started
pub async fn emit_render_requested(
    event_bus: &ActorRef<EventBusMsg>,
    correlation_id: &CorrelationId,
    source: &str,
) -> Result<(), CoordinatorError> {
    let payload = RenderRequested {
        correlation_id: correlation_id.clone(),
    };
    let event = Event::new(EVENT_TOPIC_RENDER_REQUESTED, payload, source)?
        .with_correlation_id(correlation_id.as_str());
    publish(event_bus, event).await
}

/// Emit widget async render started
pub async fn emit_async_render_requested(
    event_bus: &ActorRef<EventBusMsg>,
    id: impl Into<AsyncRenderId>,
    source: &str,
) -> Result<(), CoordinatorError> {
    let event = Event::new(
        EVENT_TOPIC_RENDER_ASYNC_REQUESTED,
        AsyncRenderRequested { id: id.into() },
        source,
    )?;
    publish(event_bus, event).await
}

/// Emit widget async render finished
pub async fn emit_async_render_resolved(
    event_bus: &ActorRef<EventBusMsg>,
    id: impl Into<AsyncRenderId>,
    source: &str,
) -> Result<(), CoordinatorError> {
    let event = Event::new(
        EVENT_TOPIC_RENDER_ASYNC_RESOLVED,
        AsyncRenderResolved { id: id.into() },
        source,
    )?;
    publish(event_bus, event).await
}

/// Emit render pass finished
pub async fn emit_render_resolved(
    event_bus: &ActorRef<EventBusMsg>,
    payload: &RenderResolved,
    source: &str,
) -> Result<(), CoordinatorError> {
    let event = Event::new(EVENT_TOPIC_RENDER_RESOLVED, payload, source)?
        .with_correlation_id(payload.correlation_id.as_str());
    publish(event_bus, event).await
}
