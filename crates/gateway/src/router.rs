//! Axum router assembly for the orchestrator's two HTTP surfaces: the
//! `/ws/{session_id}` duplex channel and `/health`.

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::health;
use crate::state::AppState;
use crate::ws;

pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/ws/:session_id", get(ws::handler))
        .route("/health", get(health::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
