use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::{net::TcpListener, sync::oneshot};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use benor_common::{BenOrError, NodeStateView, VoteMessage};
use benor_consensus::Process;

#[derive(Clone)]
pub struct AppState {
    pub process: Arc<Process>,
}

/// Maps process errors onto HTTP answers.
pub struct ApiError(pub BenOrError);

impl From<BenOrError> for ApiError {
    fn from(e: BenOrError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            BenOrError::FaultyRejection => (StatusCode::INTERNAL_SERVER_ERROR, "faulty".to_string()),
            BenOrError::StoppedRejection => (StatusCode::INTERNAL_SERVER_ERROR, "stopped".to_string()),
            BenOrError::MalformedVote(reason) => (StatusCode::BAD_REQUEST, format!("malformed vote: {reason}")),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };
        (status, body).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/message", post(receive_message))
        .route("/status", get(status))
        .route("/start", get(start))
        .route("/stop", get(stop))
        .route("/getState", get(get_state))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Serves one process until `shutdown` fires (or its sender is dropped).
pub async fn serve(listener: TcpListener, state: AppState, shutdown: oneshot::Receiver<()>) -> std::io::Result<()> {
    let id = state.process.id;
    if let Ok(addr) = listener.local_addr() {
        info!("Node {} is listening on {}", id, addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.await;
            debug!("Node {} shutting down", id);
        })
        .await
}

async fn receive_message(
    State(state): State<AppState>,
    payload: Result<Json<VoteMessage>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let Json(vote) = payload.map_err(|e| BenOrError::MalformedVote(e.body_text()))?;
    state.process.handle_vote(vote).await?;
    Ok("message")
}

async fn status(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    state.process.status()?;
    Ok("live")
}

async fn start(State(state): State<AppState>) -> &'static str {
    state.process.start().await;
    "started"
}

async fn stop(State(state): State<AppState>) -> &'static str {
    state.process.stop().await;
    "stopped"
}

async fn get_state(State(state): State<AppState>) -> Json<NodeStateView> {
    Json(state.process.inspect().await)
}
