//! EventBusActor - Pub/sub event distribution for dashboard render events
//!
//! This actor provides topic-based publish/subscribe functionality backed by a
//! `tokio::sync::broadcast` fan-out channel. Every subscriber owns its own
//! receiver and applies its own topic pattern (and optional predicate), which
//! is what the render coordinator needs to "wait for the next message
//! matching X" without a custom subscriber registry.
//!
//! # Architecture
//!
//! - One broadcast channel per bus; subscriptions are receivers handed out over RPC
//! - Supports wildcard topic patterns (e.g., "render.async.*")
//! - Maintains publish stats for monitoring/debugging
//!
//! # Example
//!
//! ```rust,ignore
//! let mut sub = subscribe(&event_bus, "render.*").await?;
//!
//! let event = Event::new("render.async.requested", payload, "widget:kpi-1")?;
//! publish_event(&event_bus, event).await?;
//!
//! let next = sub.next().await;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ractor::{cast, Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::broadcast;

// ============================================================================
// Data Types
// ============================================================================

/// Core event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Unique event identifier (ULID)
    pub id: String,

    /// Topic for routing (hierarchical, e.g., "render.async.resolved")
    pub topic: String,

    /// Event payload (JSON value)
    pub payload: serde_json::Value,

    /// Timestamp in UTC
    pub timestamp: DateTime<Utc>,

    /// Source widget, coordinator or dashboard identifier
    pub source: String,

    /// Optional correlation ID for render pass tracing
    pub correlation_id: Option<String>,
}

impl Event {
    /// Create a new event with auto-generated ID and timestamp
    pub fn new(
        topic: impl Into<String>,
        payload: impl Serialize,
        source: impl Into<String>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: ulid::Ulid::new().to_string(),
            topic: topic.into(),
            payload: serde_json::to_value(payload)?,
            timestamp: Utc::now(),
            source: source.into(),
            correlation_id: None,
        })
    }

    /// Check if this event matches a topic pattern
    /// Supports wildcards: "render.*" matches "render.requested", "render.async.resolved"
    pub fn matches_topic(&self, pattern: &str) -> bool {
        if pattern == "*" {
            return true;
        }

        if let Some(prefix) = pattern.strip_suffix(".*") {
            self.topic.starts_with(prefix)
                && (self.topic.len() == prefix.len()
                    || self.topic[prefix.len()..].starts_with('.'))
        } else {
            self.topic == pattern
        }
    }

    /// Set correlation ID (builder pattern)
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Decode the JSON payload into a typed value
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Receiving side of a topic subscription.
///
/// Each subscription sees every event published after it was created, in
/// publish order, filtered by its topic pattern.
#[derive(Debug)]
pub struct EventSubscription {
    pattern: String,
    rx: broadcast::Receiver<Event>,
    skipped: u64,
}

impl EventSubscription {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Events lost so far because this subscriber fell behind the buffer.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Wait for the next event matching the subscription pattern.
    ///
    /// Returns `None` once the bus has stopped.
    pub async fn next(&mut self) -> Option<Event> {
        self.next_matching(|_| true).await
    }

    /// Wait for the next event matching both the pattern and `predicate`.
    ///
    /// Cancel safe: dropping the future loses no matching event.
    pub async fn next_matching<F>(&mut self, mut predicate: F) -> Option<Event>
    where
        F: FnMut(&Event) -> bool,
    {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if event.matches_topic(&self.pattern) && predicate(&event) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    self.skipped += skipped;
                    tracing::warn!(
                        pattern = %self.pattern,
                        skipped,
                        "Event subscription lagged; events dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// ============================================================================
// EventBusActor
// ============================================================================

/// Messages handled by EventBusActor
#[derive(Debug)]
pub enum EventBusMsg {
    /// Publish an event to every live subscription
    Publish { event: Event },

    /// Open a subscription for a topic pattern
    Subscribe {
        topic: String,
        reply: RpcReplyPort<EventSubscription>,
    },

    /// Get publish/subscription counters (for debugging)
    GetStats { reply: RpcReplyPort<EventBusStats> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventBusStats {
    pub published: u64,
    pub undelivered: u64,
    pub live_subscriptions: usize,
}

/// Configuration for EventBusActor
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Maximum events buffered per slow subscriber before it lags
    pub max_buffer_size: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: 1024,
        }
    }
}

/// Arguments for spawning EventBusActor
#[derive(Debug, Clone, Default)]
pub struct EventBusArguments {
    pub config: EventBusConfig,
}

/// State for EventBusActor
pub struct EventBusState {
    sender: broadcast::Sender<Event>,
    stats: EventBusStats,
}

/// Actor that provides pub/sub event distribution
#[derive(Debug, Default)]
pub struct EventBusActor;

#[async_trait]
impl Actor for EventBusActor {
    type Msg = EventBusMsg;
    type State = EventBusState;
    type Arguments = EventBusArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(
            actor_id = %myself.get_id(),
            buffer = args.config.max_buffer_size,
            "EventBusActor starting"
        );

        let (sender, _) = broadcast::channel(args.config.max_buffer_size.max(1));
        Ok(EventBusState {
            sender,
            stats: EventBusStats::default(),
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            EventBusMsg::Publish { event } => self.handle_publish(event, state),
            EventBusMsg::Subscribe { topic, reply } => {
                tracing::debug!(topic = %topic, "Opening event subscription");
                let subscription = EventSubscription {
                    pattern: topic,
                    rx: state.sender.subscribe(),
                    skipped: 0,
                };
                // Caller may have timed out; nothing to clean up.
                let _ = reply.send(subscription);
            }
            EventBusMsg::GetStats { reply } => {
                let mut stats = state.stats.clone();
                stats.live_subscriptions = state.sender.receiver_count();
                let _ = reply.send(stats);
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        tracing::info!(
            actor_id = %myself.get_id(),
            published = state.stats.published,
            "EventBusActor stopped"
        );
        Ok(())
    }
}

impl EventBusActor {
    fn handle_publish(&self, event: Event, state: &mut EventBusState) {
        tracing::debug!(
            event_id = %event.id,
            topic = %event.topic,
            source = %event.source,
            "Publishing event"
        );

        state.stats.published += 1;
        if state.sender.send(event).is_err() {
            state.stats.undelivered += 1;
            tracing::trace!("Event dropped: no live subscriptions");
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Convenience function to publish an event
pub async fn publish_event(
    event_bus: &ActorRef<EventBusMsg>,
    event: Event,
) -> Result<(), ractor::RactorErr<EventBusMsg>> {
    cast!(event_bus, EventBusMsg::Publish { event })
}

/// Convenience function to open a subscription on a topic pattern
pub async fn subscribe(
    event_bus: &ActorRef<EventBusMsg>,
    topic: impl Into<String>,
) -> Result<EventSubscription, ractor::RactorErr<EventBusMsg>> {
    let topic = topic.into();
    ractor::call!(event_bus, |reply| EventBusMsg::Subscribe { topic, reply })
}

/// Convenience function to read bus counters
pub async fn stats(
    event_bus: &ActorRef<EventBusMsg>,
) -> Result<EventBusStats, ractor::RactorErr<EventBusMsg>> {
    ractor::call!(event_bus, |reply| EventBusMsg::GetStats { reply })
}

// ============================================================================
// Tests
// ============================================================================
