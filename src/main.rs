use pr_pipelines::{AppState, HandlerConfig, build_router, load_config};
use std::sync::Arc;
use tracing::{self, info};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8888";
const DEFAULT_CONFIG_PATH: &str = "pr_pipelines.toml";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config_path =
        std::env::var("PR_PIPELINES_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config: HandlerConfig = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let bind_address = std::env::var("BIND_ADDRESS")
        .ok()
        .or_else(|| config.bind_address.clone())
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

    let state = Arc::new(AppState::new(config));

    tracing_subscriber::fmt::init();
    let app = build_router(state.clone());

    info!("Listening on {}", bind_address);
    info!("Using config at {:?}", config_path);
    info!(
        "Template pipeline '{}', orchestrator at {}",
        state.config.orchestrator.template_pipeline,
        state.pipelines.base_url()
    );
    let listener = tokio::net::TcpListener::bind(bind_address).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
