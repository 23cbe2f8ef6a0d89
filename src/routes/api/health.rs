use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::Ctx;

/// Liveness probe
/// GET /health
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Mount health routes
pub fn mount() -> Router<Ctx> {
    Router::new().route("/health", get(health))
}
