//! REST API module.
//!
//! Handlers translate HTTP requests into slot service calls and wrap the
//! results in the `{success, event, message}` envelope the web client expects.

mod events;
mod health;

pub use events::*;
pub use health::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::projection::EventView;

/// Success envelope carrying an event.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub success: bool,
    pub event: EventView,
    pub message: String,
}

impl EventResponse {
    pub fn new(event: EventView, message: impl Into<String>) -> Self {
        Self {
            success: true,
            event,
            message: message.into(),
        }
    }
}

impl IntoResponse for EventResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Success envelope without a payload.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

impl IntoResponse for MessageResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<T, AppError>;
