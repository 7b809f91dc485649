//! Render-completion coordination
//!
//! ## Architecture
//!
//! RenderCoordinator (one per render pass)
//! ├── collection phase ── builds the TaskRegistry
//! └── resolution phase ── drains it, still accepting late registrations
//!     └── task supervisor (one tokio task per async render id)
//!
//! Supervisors never touch the bus directly: the phase that currently owns
//! the registry reads the coordinator's subscription and routes per-id
//! signals to them.

pub mod collection;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod execution;
pub mod registry;
pub mod resolution;
pub mod supervisor;

pub use collection::{collect, CollectionReport, CollectionShortfall};
pub use config::{CoordinatorConfig, CorrelationIdFactory};
pub use coordinator::{DashboardContext, RenderCoordinator};
pub use error::CoordinatorError;
pub use events::{
    emit_async_render_requested, emit_async_render_resolved, emit_dashboard_initialized,
    RenderSignal,
};
pub use execution::{ExecutionFlag, ExecutionObserver};
pub use registry::{Observed, TaskRegistry};
pub use resolution::resolve;
pub use supervisor::{supervise, SupervisorOutcome, MAX_RERENDER_RETRIES};
