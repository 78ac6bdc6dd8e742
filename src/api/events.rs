//! Event API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{ApiResult, EventResponse, MessageResponse};
use crate::auth::Requester;
use crate::models::{CreateEventRequest, SlotRequest, UpdateEventRequest};
use crate::projection::EventView;
use crate::AppState;

/// GET /events - List all events.
pub async fn list_events(State(state): State<AppState>) -> ApiResult<Json<Vec<EventView>>> {
    Ok(Json(state.slots.list_events().await?))
}

/// GET /events/:event_id - Get a single event.
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> ApiResult<EventResponse> {
    let event = state.slots.get_event(&event_id).await?;
    Ok(EventResponse::new(event, "Event loaded"))
}

/// POST /events - Create a new event owned by the requester.
pub async fn create_event(
    State(state): State<AppState>,
    requester: Requester,
    Json(request): Json<CreateEventRequest>,
) -> ApiResult<EventResponse> {
    let event = state.slots.create_event(&requester, &request).await?;
    Ok(EventResponse::new(event, "Event created"))
}

/// PUT /events/:event_id - Edit event details.
pub async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    requester: Requester,
    Json(request): Json<UpdateEventRequest>,
) -> ApiResult<EventResponse> {
    let event = state
        .slots
        .update_event(&requester, &event_id, &request)
        .await?;
    Ok(EventResponse::new(event, "Event updated"))
}

/// POST /events/slot - Slot the requester into a role.
pub async fn slot(
    State(state): State<AppState>,
    requester: Requester,
    Json(request): Json<SlotRequest>,
) -> ApiResult<EventResponse> {
    let mutation = state
        .slots
        .slot(&requester, &request.event_id, &request.path)
        .await?;
    Ok(EventResponse::new(mutation.event, "Slotted successfully"))
}

/// POST /events/unslot - Remove the requester from a role.
pub async fn unslot(
    State(state): State<AppState>,
    requester: Requester,
    Json(request): Json<SlotRequest>,
) -> ApiResult<EventResponse> {
    let mutation = state
        .slots
        .unslot(&requester, &request.event_id, &request.path)
        .await?;
    Ok(EventResponse::new(mutation.event, "Unslotted successfully"))
}

/// POST /events/admin/kick - Remove any occupant from a role.
pub async fn kick(
    State(state): State<AppState>,
    requester: Requester,
    Json(request): Json<SlotRequest>,
) -> ApiResult<EventResponse> {
    let mutation = state
        .slots
        .kick(&requester, &request.event_id, &request.path)
        .await?;
    Ok(EventResponse::new(mutation.event, "User kicked from role"))
}

/// DELETE /events/:event_id - Delete an event.
pub async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    requester: Requester,
) -> ApiResult<MessageResponse> {
    state.slots.delete_event(&requester, &event_id).await?;
    Ok(MessageResponse::new("Event deleted"))
}
