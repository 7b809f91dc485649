//! Shared types between the render coordinator and dashboard widgets
//!
//! These types are used by both:
//! - The render coordinator (native Rust)
//! - Widgets emitting async render events (TypeScript bindings)
//!
//! Serializable with serde for JSON over the event bus

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Event Topics
// ============================================================================

/// Readiness signal from the dashboard state machine (zero payload).
pub const EVENT_TOPIC_DASHBOARD_INITIALIZED: &str = "dashboard.initialized";
/// Emitted once by the coordinator when a render pass starts.
pub const EVENT_TOPIC_RENDER_REQUESTED: &str = "render.requested";
/// Emitted by a widget beginning asynchronous render work.
pub const EVENT_TOPIC_RENDER_ASYNC_REQUESTED: &str = "render.async.requested";
/// Emitted by a widget finishing asynchronous render work.
pub const EVENT_TOPIC_RENDER_ASYNC_RESOLVED: &str = "render.async.resolved";
/// Emitted once by the coordinator when the render pass is considered done.
pub const EVENT_TOPIC_RENDER_RESOLVED: &str = "render.resolved";

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque token tying together all events of one full-dashboard render pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[ts(export, export_to = "render-events.ts")]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier a widget picks for its own asynchronous render.
///
/// No validation beyond string equality: empty ids are valid keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, TS)]
#[ts(export, export_to = "render-events.ts")]
pub struct AsyncRenderId(pub String);

impl AsyncRenderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AsyncRenderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AsyncRenderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for AsyncRenderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Event Payloads
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "render-events.ts")]
pub struct DashboardInitialized {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "render-events.ts")]
pub struct RenderRequested {
    pub correlation_id: CorrelationId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "render-events.ts")]
pub struct AsyncRenderRequested {
    pub id: AsyncRenderId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "render-events.ts")]
pub struct AsyncRenderResolved {
    pub id: AsyncRenderId,
}

/// Data-only copy of the coordinator configuration.
///
/// The correlation id factory is not data and never appears here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "render-events.ts")]
pub struct RenderConfigSnapshot {
    #[ts(type = "number")]
    pub async_render_requested_timeout: u64,
    #[ts(type = "number")]
    pub async_render_resolved_timeout: u64,
    #[ts(type = "number")]
    pub max_timeout: u64,
    #[ts(type = "number | null")]
    pub async_render_expected_count: Option<usize>,
    pub is_export: bool,
}

/// How the registered async renders of one pass ended
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "render-events.ts")]
pub struct RenderSummary {
    #[ts(type = "number")]
    pub registered: usize,
    #[ts(type = "number")]
    pub stabilized: usize,
    #[ts(type = "number")]
    pub retries_exhausted: usize,
    /// Still running when the pass ended, cancelled by the coordinator.
    #[ts(type = "number")]
    pub abandoned: usize,
    pub deadline_reached: bool,
    /// Bus events the coordinator's subscription dropped by lagging.
    #[ts(type = "number")]
    pub missed_events: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "render-events.ts")]
pub struct RenderResolved {
    pub correlation_id: CorrelationId,
    pub config: RenderConfigSnapshot,
    pub summary: RenderSummary,
}

// ============================================================================
// Tests
// ============================================================================
