//! HTTP handlers: the webhook dispatcher plus liveness and status endpoints.

use axum::{
    Json,
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, info};

use crate::SharedState;
use crate::error::{HandlerError, Result};
use crate::event::{
    DELIVERY_HEADER, EVENT_HEADER, PULL_REQUEST_EVENT, PullRequestEvent, PullRequestState,
};

pub async fn root() -> &'static str {
    "pr_pipelines"
}

/// Returns the current server status and dispatch counters
pub async fn status(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    let (cloned, destroyed, noop, failed) = state.counters.snapshot();

    Json(json!({
        "server": {
            "name": "pr_pipelines",
            "version": env!("CARGO_PKG_VERSION"),
            "started_at": state.started_at,
            "uptime_seconds": state.start_time.elapsed().as_secs(),
        },
        "pipelines": {
            "template": state.config.orchestrator.template_pipeline,
            "cloned": cloned,
            "destroyed": destroyed,
            "noop": noop,
            "failed": failed,
        }
    }))
}

/// What a dispatched event amounted to. Purely for logging and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Cloned,
    AlreadyPresent,
    Destroyed,
    AlreadyAbsent,
    Ignored,
}

/// Handles the pull-request webhook POST request.
///
/// The delivery identifier header, when present, is echoed unchanged on
/// every response so the sender can correlate and deduplicate.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery = headers.get(DELIVERY_HEADER).cloned();

    let mut response = match dispatch(&state, &headers, &body).await {
        Ok(outcome) => {
            info!("Webhook handled: {:?}", outcome);
            StatusCode::OK.into_response()
        }
        Err(e) => {
            error!("Webhook failed ({}): {}", e.code(), e);
            state.counters.record_failed();
            e.into_response()
        }
    };

    if let Some(value) = delivery {
        response.headers_mut().insert(DELIVERY_HEADER, value);
    }
    response
}

/// Maps an incoming event to one of {clone, destroy, no-op}.
///
/// Both paths are idempotent against duplicate deliveries: clone checks for
/// an existing pipeline first, destroy checks for a missing one. The check
/// and the action are not atomic; two concurrent "open" deliveries for the
/// same PR can race, in which case the second create fails at the service.
async fn dispatch(state: &SharedState, headers: &HeaderMap, body: &Bytes) -> Result<Outcome> {
    if body.is_empty() {
        return Err(HandlerError::InvalidRequest);
    }

    let event_type = headers.get(EVENT_HEADER).and_then(|v| v.to_str().ok());
    if event_type != Some(PULL_REQUEST_EVENT) {
        return Err(HandlerError::UnsupportedEvent(
            event_type.unwrap_or("(missing)").to_string(),
        ));
    }

    let event: PullRequestEvent = serde_json::from_slice(body)
        .map_err(|e| HandlerError::MalformedPayload(e.to_string()))?;
    let pipeline_name = event.pipeline_name();

    match event.pull_request.state {
        PullRequestState::Open => {
            if state.pipelines.exists(&pipeline_name).await? {
                info!(
                    "Pipeline '{}' already exists, nothing to clone.",
                    pipeline_name
                );
                state.counters.record_noop();
                return Ok(Outcome::AlreadyPresent);
            }

            let token = state
                .secrets
                .resolve(&state.config.secrets.parameter_name)
                .await?;
            state
                .pipelines
                .clone_from_template(
                    &state.config.orchestrator.template_pipeline,
                    &pipeline_name,
                    &event.pull_request.head.branch,
                    &token,
                )
                .await?;

            info!(
                "Cloned '{}' into '{}' tracking branch '{}'",
                state.config.orchestrator.template_pipeline,
                pipeline_name,
                event.pull_request.head.branch
            );
            state.counters.record_cloned();
            Ok(Outcome::Cloned)
        }
        PullRequestState::Closed => {
            if !state.pipelines.exists(&pipeline_name).await? {
                info!(
                    "Pipeline '{}' does not exist, nothing to destroy.",
                    pipeline_name
                );
                state.counters.record_noop();
                return Ok(Outcome::AlreadyAbsent);
            }

            state.pipelines.destroy(&pipeline_name).await?;
            info!("Destroyed pipeline '{}'", pipeline_name);
            state.counters.record_destroyed();
            Ok(Outcome::Destroyed)
        }
        PullRequestState::Other => {
            info!(
                "PR #{} in state we do not act on, skipping.",
                event.pull_request.number
            );
            state.counters.record_noop();
            Ok(Outcome::Ignored)
        }
    }
}
