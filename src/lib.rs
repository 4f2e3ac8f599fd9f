pub mod error;
pub mod event;
pub mod handlers;
pub mod pipeline;
pub mod secrets;

use axum::{Router, routing};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::error::HandlerError;
use crate::handlers::{handle_webhook, root, status};
use crate::pipeline::PipelineClient;
use crate::secrets::SecretClient;

#[derive(Debug, Deserialize, Clone)]
pub struct HandlerConfig {
    pub bind_address: Option<String>,
    pub orchestrator: OrchestratorConfig,
    pub secrets: SecretsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OrchestratorConfig {
    pub base_url: String,
    /// Name of the long-lived pipeline cloned for each open pull request.
    pub template_pipeline: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecretsConfig {
    pub base_url: String,
    /// Name of the decrypted parameter holding the source-control credential.
    pub parameter_name: String,
}

/// Load and parse the configuration file, then apply environment overrides
/// for the two options recognized at runtime.
pub fn load_config(path: &str) -> Result<HandlerConfig, HandlerError> {
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        HandlerError::ConfigError(format!("Failed to read config file '{}': {}", path, e))
    })?;

    let mut config: HandlerConfig = toml::from_str(&config_str).map_err(|e| {
        HandlerError::ConfigError(format!("Failed to parse config file '{}': {}", path, e))
    })?;

    if let Ok(name) = std::env::var("TEMPLATE_PIPELINE_NAME") {
        config.orchestrator.template_pipeline = name;
    }
    if let Ok(name) = std::env::var("SECRET_PARAMETER_NAME") {
        config.secrets.parameter_name = name;
    }

    Ok(config)
}

/// Per-process counters for the dispatch outcomes, surfaced by /status.
/// Reset on restart; nothing is persisted between invocations.
#[derive(Debug, Default)]
pub struct ActionCounters {
    cloned: AtomicU64,
    destroyed: AtomicU64,
    noop: AtomicU64,
    failed: AtomicU64,
}

impl ActionCounters {
    pub fn record_cloned(&self) {
        self.cloned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_destroyed(&self) {
        self.destroyed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_noop(&self) {
        self.noop.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> (u64, u64, u64, u64) {
        (
            self.cloned.load(Ordering::Relaxed),
            self.destroyed.load(Ordering::Relaxed),
            self.noop.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

pub struct AppState {
    pub config: HandlerConfig,
    pub pipelines: PipelineClient,
    pub secrets: SecretClient,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
    pub counters: ActionCounters,
}

impl AppState {
    pub fn new(config: HandlerConfig) -> Self {
        let pipelines = PipelineClient::new(&config.orchestrator.base_url);
        let secrets = SecretClient::new(&config.secrets.base_url);
        Self {
            config,
            pipelines,
            secrets,
            start_time: Instant::now(),
            started_at: Utc::now(),
            counters: ActionCounters::default(),
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Build the application router. Kept out of `main` so integration tests can
/// drive the handlers through `tower::ServiceExt::oneshot`.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(root))
        .route("/webhook", routing::post(handle_webhook))
        .route("/status", routing::get(status))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        bind_address = "127.0.0.1:9999"

        [orchestrator]
        base_url = "http://localhost:9000/"
        template_pipeline = "web-app"

        [secrets]
        base_url = "http://localhost:9100"
        parameter_name = "github-oauth-token"
    "#;

    #[test]
    fn config_parses_all_sections() {
        let config: HandlerConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.bind_address.as_deref(), Some("127.0.0.1:9999"));
        assert_eq!(config.orchestrator.template_pipeline, "web-app");
        assert_eq!(config.secrets.parameter_name, "github-oauth-token");
    }

    #[test]
    fn bind_address_is_optional() {
        let trimmed = SAMPLE.replace("bind_address = \"127.0.0.1:9999\"", "");
        let config: HandlerConfig = toml::from_str(&trimmed).unwrap();
        assert!(config.bind_address.is_none());
    }

    #[test]
    fn counters_accumulate() {
        let counters = ActionCounters::default();
        counters.record_cloned();
        counters.record_cloned();
        counters.record_noop();
        counters.record_failed();
        assert_eq!(counters.snapshot(), (2, 0, 1, 1));
    }
}
