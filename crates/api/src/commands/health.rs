//! Liveness endpoint

use axum::Json;
use calmate_domain::constants::SERVICE_NAME;
use serde_json::{json, Value};

/// `GET /health`
///
/// # Example Response
/// ```json
/// { "status": "healthy", "service": "outlook-calendar-agent" }
/// ```
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}
