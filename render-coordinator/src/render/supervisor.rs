//! Task supervisor - completion detection for one async render
//!
//! A widget counts as done once it resolves and then stays quiet for the
//! stabilization window. A re-request inside the window means the widget
//! re-entered rendering (cascading re-execution), so the supervisor waits for
//! the next resolution. After [`MAX_RERENDER_RETRIES`] such cycles it gives
//! up waiting for a settled state and reports the widget as done anyway.
//!
//! The supervisor holds no external resources; aborting its task at any
//! await point is safe.

use std::time::Duration;

use shared_types::AsyncRenderId;
use tokio::sync::mpsc;

use crate::render::events::RenderSignal;

pub const MAX_RERENDER_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorOutcome {
    /// Quiet for a full stabilization window after resolving
    Stabilized { retries: u32 },
    /// Kept re-requesting; forced to completion
    RetriesExhausted,
}

/// Supervise one async render until it is stable or out of retries.
///
/// `signals` carries the routed events for `id` only.
pub async fn supervise(
    id: AsyncRenderId,
    mut signals: mpsc::UnboundedReceiver<RenderSignal>,
    stabilization_window: Duration,
) -> (AsyncRenderId, SupervisorOutcome) {
    let mut retries = 0;

    loop {
        if !next_signal(&mut signals, RenderSignal::Resolved).await {
            // Router dropped: the owning phase is shutting down.
            return (id, SupervisorOutcome::Stabilized { retries });
        }

        tracing::trace!(async_render_id = %id, retries, "Async render resolved");

        let rerequested = matches!(
            tokio::time::timeout(
                stabilization_window,
                next_signal(&mut signals, RenderSignal::Requested),
            )
            .await,
            Ok(true)
        );

        if !rerequested {
            tracing::debug!(async_render_id = %id, retries, "Async render stabilized");
            return (id, SupervisorOutcome::Stabilized { retries });
        }

        if retries >= MAX_RERENDER_RETRIES {
            tracing::debug!(
                async_render_id = %id,
                retries,
                "Async render keeps re-requesting; forcing completion"
            );
            return (id, SupervisorOutcome::RetriesExhausted);
        }

        retries += 1;
        tracing::debug!(async_render_id = %id, retries, "Async render re-requested");
    }
}

/// Wait for `wanted`, skipping other signals. `false` once the channel closes.
async fn next_signal(
    signals: &mut mpsc::UnboundedReceiver<RenderSignal>,
    wanted: RenderSignal,
) -> bool {
    while let Some(signal) = signals.recv().await {
        if signal == wanted {
            return true;
        }
    }
    false
}
