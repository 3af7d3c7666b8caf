//! `GET /health` (spec §6).

use axum::Json;
use serde_json::{json, Value};

pub async fn handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
