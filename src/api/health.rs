//! Health endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct NotifierHealth {
    pub success: bool,
    pub healthy: bool,
}

/// GET /health - Liveness.
pub async fn health_check() -> &'static str {
    "OK"
}

/// GET /health/notifications - Whether the role notification platform answers.
pub async fn notifier_health(State(state): State<AppState>) -> Json<NotifierHealth> {
    let healthy = state.slots.notifier_healthy().await;
    if !healthy {
        tracing::warn!("Role notification platform is unhealthy");
    }
    Json(NotifierHealth {
        success: true,
        healthy,
    })
}
