//! services/api/src/web/bookings.rs
//!
//! Room-scoped machine bookings. Overlaps on the same machine are rejected
//! here first and again by the database's exclusion constraint.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use dormduty_core::{
    booking,
    domain::{Booking, Identity, NewBooking},
    membership::{ensure_member, resolve_room},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{
    middleware::load_caller,
    payload::RoomQuery,
    response::{ErrorBody, HttpError},
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[serde(default)]
    pub room_id: Option<Uuid>,
    pub machine: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// List the bookings of a room, earliest first.
#[utoipa::path(
    get,
    path = "/api/bookings",
    params(RoomQuery),
    responses(
        (status = 200, description = "Bookings of the room", body = [Booking]),
        (status = 403, description = "Not a member of the room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn list_bookings_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<RoomQuery>,
) -> Result<Json<Vec<Booking>>, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let room_id = resolve_room(&caller, query.room_id)?;
    Ok(Json(state.db.list_bookings(room_id).await?))
}

/// Book a machine for the half-open window `[start, end)`.
#[utoipa::path(
    post,
    path = "/api/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = Booking),
        (status = 400, description = "Empty machine name or window", body = ErrorBody),
        (status = 403, description = "Not a member of the room", body = ErrorBody),
        (status = 409, description = "Overlaps an existing booking", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn create_booking_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let room_id = resolve_room(&caller, req.room_id)?;

    let candidate = NewBooking {
        room_id,
        machine: req.machine.trim().to_string(),
        user_id: caller.id,
        start: req.start,
        end: req.end,
        notes: req.notes,
    };
    booking::validate(&candidate)?;

    let existing = state.db.list_bookings(room_id).await?;
    if let Some(clash) = booking::find_conflict(&candidate, &existing) {
        return Err(HttpError::conflict(format!(
            "{} is already booked from {} to {}",
            clash.machine, clash.start, clash.end
        )));
    }

    let created = state.db.create_booking(candidate).await?;
    info!("Booking {} created for {}", created.id, created.machine);
    Ok((StatusCode::CREATED, Json(created)))
}

/// Cancel a booking. Only the person who made it may cancel it.
#[utoipa::path(
    delete,
    path = "/api/bookings/{id}",
    params(("id" = Uuid, Path, description = "The booking to cancel")),
    responses(
        (status = 204, description = "Booking cancelled"),
        (status = 403, description = "Not your booking", body = ErrorBody),
        (status = 404, description = "Unknown booking", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn delete_booking_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(booking_id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let existing = state.db.get_booking(booking_id).await?;
    ensure_member(&caller, existing.room_id)?;
    if existing.user_id != caller.id {
        return Err(HttpError::forbidden("only the person who booked can cancel"));
    }
    state.db.delete_booking(booking_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
