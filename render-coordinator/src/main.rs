use ractor::Actor;
use render_coordinator::actors::{EventBusActor, EventBusArguments};
use render_coordinator::render::CoordinatorConfig;
use render_coordinator::simulation::{self, DEFAULT_WIDGET_PLAN};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "render_coordinator=info,render_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Reads .env first, so RENDER_SIM_WIDGETS may live there too.
    let config = CoordinatorConfig::from_env()?;
    let raw_plan =
        std::env::var("RENDER_SIM_WIDGETS").unwrap_or_else(|_| DEFAULT_WIDGET_PLAN.to_string());
    let plan = simulation::parse_widget_plan(&raw_plan)?;

    tracing::info!(widgets = plan.len(), config = ?config, "Starting render simulation");

    let (event_bus, bus_handle) = Actor::spawn(
        Some("render_event_bus".to_string()),
        EventBusActor,
        EventBusArguments::default(),
    )
    .await
    .map_err(|e| anyhow::anyhow!("failed to start event bus: {e}"))?;

    let resolved = simulation::simulate(event_bus.clone(), plan, config).await;

    event_bus.stop(None);
    let _ = bus_handle.await;

    match resolved? {
        Some(resolved) => {
            println!("{}", serde_json::to_string_pretty(&resolved)?);
            Ok(())
        }
        None => anyhow::bail!("render pass failed; see logs"),
    }
}
