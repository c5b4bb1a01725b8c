use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::stream::router::RouterState;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// `running`, `shutting_down`, or `stopped`.
    pub router: String,
    pub channels: usize,
    pub subscribers: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service status", body = HealthResponse)),
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.router.stats().await.unwrap_or_default();
    let router = state.router.state();
    Json(HealthResponse {
        status: if router == RouterState::Running { "ok" } else { "degraded" }.to_string(),
        router: router.as_str().to_string(),
        channels: stats.channels,
        subscribers: stats.subscribers,
    })
}
