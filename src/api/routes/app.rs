use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// Response structure for service information
#[derive(Debug, Serialize)]
pub struct AppInfo {
    pub service: String,
    pub version: String,
}

/// GET /
pub async fn get_app_info() -> Json<AppInfo> {
    Json(AppInfo {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
