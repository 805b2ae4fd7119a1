// ABOUTME: HTTP trigger route for externally-requested update passes.
// ABOUTME: POST /v1/update with a component-key to image-tag JSON mapping.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use futures::future::BoxFuture;
use tracing::{debug, error, info};

use super::gate::TriggerGate;

/// Mapping from well-known component keys (e.g. "aidriver", "daemon") to
/// image tag strings, as supplied by the trigger request body.
pub type TagOverrides = HashMap<String, String>;

/// The work a trigger runs while it holds the gate: one update pass with
/// the supplied tag overrides applied.
pub type UpdateFn = Arc<dyn Fn(TagOverrides) -> BoxFuture<'static, ()> + Send + Sync>;

/// Shared state behind the trigger route.
pub struct ApiState {
    gate: TriggerGate,
    update: UpdateFn,
}

impl ApiState {
    pub fn new(gate: TriggerGate, update: UpdateFn) -> Self {
        Self { gate, update }
    }
}

/// Create the trigger router.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/v1/update", post(trigger_update))
        .with_state(state)
}

/// Bind the trigger endpoint and serve until the task is aborted.
pub async fn serve(addr: SocketAddr, state: Arc<ApiState>) -> std::io::Result<()> {
    let app = router(state);

    info!(addr = %addr, "starting trigger endpoint");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn trigger_update(State(state): State<Arc<ApiState>>, body: String) -> Response {
    info!("update pass triggered by http api request");

    let tags: TagOverrides = match serde_json::from_str(&body) {
        Ok(tags) => tags,
        Err(e) => {
            error!(error = %e, "update skipped, request body did not decode");
            return (StatusCode::BAD_REQUEST, "failed to decode request body\n").into_response();
        }
    };

    match state.gate.try_enter() {
        Some(_guard) => {
            (state.update)(tags).await;
            StatusCode::OK.into_response()
        }
        None => {
            debug!("skipped, another update pass is already running");
            StatusCode::OK.into_response()
        }
    }
}
