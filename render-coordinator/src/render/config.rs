//! Coordinator configuration
//!
//! Read once when a render pass starts and never mutated afterwards. Values
//! come from code (builder setters), the process environment, or TOML using
//! the option names widgets already know (`asyncRenderRequestedTimeout`, ...).

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use shared_types::{CorrelationId, RenderConfigSnapshot};

pub const DEFAULT_COLLECTION_WINDOW: Duration = Duration::from_millis(5_000);
pub const DEFAULT_STABILIZATION_WINDOW: Duration = Duration::from_millis(2_000);
pub const DEFAULT_MAX_TOTAL_WINDOW: Duration = Duration::from_millis(1_200_000);

/// Mints the correlation id of each render pass
pub type CorrelationIdFactory = Arc<dyn Fn() -> CorrelationId + Send + Sync>;

#[derive(Clone)]
pub struct CoordinatorConfig {
    /// How long to listen for the first wave of async render registrations
    pub collection_window: Duration,
    /// Quiet period after a widget resolves before it counts as stable
    pub stabilization_window: Duration,
    /// Absolute cap on collection plus resolution
    pub max_total_window: Duration,
    /// Early-exit hint for collection; zero behaves like unset
    pub expected_task_count: Option<usize>,
    /// Export runs log collection shortfalls at error level
    pub is_export_run: bool,
    pub correlation_id_factory: CorrelationIdFactory,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            collection_window: DEFAULT_COLLECTION_WINDOW,
            stabilization_window: DEFAULT_STABILIZATION_WINDOW,
            max_total_window: DEFAULT_MAX_TOTAL_WINDOW,
            expected_task_count: None,
            is_export_run: false,
            correlation_id_factory: Arc::new(CorrelationId::new),
        }
    }
}

impl std::fmt::Debug for CoordinatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorConfig")
            .field("collection_window", &self.collection_window)
            .field("stabilization_window", &self.stabilization_window)
            .field("max_total_window", &self.max_total_window)
            .field("expected_task_count", &self.expected_task_count)
            .field("is_export_run", &self.is_export_run)
            .finish_non_exhaustive()
    }
}

impl CoordinatorConfig {
    pub fn with_collection_window(mut self, window: Duration) -> Self {
        self.collection_window = window;
        self
    }

    pub fn with_stabilization_window(mut self, window: Duration) -> Self {
        self.stabilization_window = window;
        self
    }

    pub fn with_max_total_window(mut self, window: Duration) -> Self {
        self.max_total_window = window;
        self
    }

    pub fn with_expected_task_count(mut self, count: usize) -> Self {
        self.expected_task_count = Some(count);
        self
    }

    pub fn with_export_run(mut self, is_export_run: bool) -> Self {
        self.is_export_run = is_export_run;
        self
    }

    pub fn with_correlation_id_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> CorrelationId + Send + Sync + 'static,
    {
        self.correlation_id_factory = Arc::new(factory);
        self
    }

    /// Expected count that can actually end collection early
    pub fn expected_count(&self) -> Option<usize> {
        self.expected_task_count.filter(|count| *count > 0)
    }

    /// Collection never outlasts the absolute cap.
    pub fn effective_collection_window(&self) -> Duration {
        self.collection_window.min(self.max_total_window)
    }

    pub fn mint_correlation_id(&self) -> CorrelationId {
        (self.correlation_id_factory)()
    }

    /// Data-only copy carried on `render.resolved`
    pub fn snapshot(&self) -> RenderConfigSnapshot {
        RenderConfigSnapshot {
            async_render_requested_timeout: duration_ms(self.collection_window),
            async_render_resolved_timeout: duration_ms(self.stabilization_window),
            max_timeout: duration_ms(self.max_total_window),
            async_render_expected_count: self.expected_task_count,
            is_export: self.is_export_run,
        }
    }

    /// Load from `RENDER_*` environment variables (and `.env` if present).
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            collection_window: Duration::from_millis(env_parse(
                &lookup,
                "RENDER_ASYNC_REQUESTED_TIMEOUT_MS",
                duration_ms(defaults.collection_window),
            )?),
            stabilization_window: Duration::from_millis(env_parse(
                &lookup,
                "RENDER_ASYNC_RESOLVED_TIMEOUT_MS",
                duration_ms(defaults.stabilization_window),
            )?),
            max_total_window: Duration::from_millis(env_parse(
                &lookup,
                "RENDER_MAX_TIMEOUT_MS",
                duration_ms(defaults.max_total_window),
            )?),
            expected_task_count: env_parse_opt(&lookup, "RENDER_ASYNC_EXPECTED_COUNT")?,
            is_export_run: env_parse(&lookup, "RENDER_IS_EXPORT", false)?,
            correlation_id_factory: defaults.correlation_id_factory,
        })
    }

    /// Parse the camelCase option table widgets use, e.g.
    /// `asyncRenderRequestedTimeout = 3000`.
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let options: ConfigOptions = toml::from_str(raw)
            .map_err(|e| anyhow::anyhow!("Failed to parse render coordinator config: {e}"))?;
        Ok(options.into_config())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ConfigOptions {
    async_render_requested_timeout: Option<u64>,
    async_render_resolved_timeout: Option<u64>,
    max_timeout: Option<u64>,
    async_render_expected_count: Option<usize>,
    is_export: Option<bool>,
}

impl ConfigOptions {
    fn into_config(self) -> CoordinatorConfig {
        let mut config = CoordinatorConfig::default();
        if let Some(ms) = self.async_render_requested_timeout {
            config.collection_window = Duration::from_millis(ms);
        }
        if let Some(ms) = self.async_render_resolved_timeout {
            config.stabilization_window = Duration::from_millis(ms);
        }
        if let Some(ms) = self.max_timeout {
            config.max_total_window = Duration::from_millis(ms);
        }
        config.expected_task_count = self.async_render_expected_count;
        config.is_export_run = self.is_export.unwrap_or(false);
        config
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn env_parse<T, F>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match env_parse_opt(lookup, key)? {
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

fn env_parse_opt<T, F>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) if !val.trim().is_empty() => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        _ => Ok(None),
    }
}
