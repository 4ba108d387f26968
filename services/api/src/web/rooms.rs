//! services/api/src/web/rooms.rs
//!
//! Room lookup, creation and renaming.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use dormduty_core::{
    domain::{Identity, Room, RoomDetails},
    membership::resolve_room,
    ports::PortError,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{
    middleware::load_caller,
    response::{ErrorBody, HttpError},
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub name: String,
    /// Must be the caller when present.
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenameRoomRequest {
    #[serde(default)]
    pub room_id: Option<Uuid>,
    pub name: String,
}

fn room_name(raw: &str) -> Result<&str, HttpError> {
    let name = raw.trim();
    if name.is_empty() {
        Err(HttpError::bad_request("room name is required"))
    } else {
        Ok(name)
    }
}

/// The caller's room together with its members.
#[utoipa::path(
    get,
    path = "/api/rooms",
    responses(
        (status = 200, description = "The caller's room", body = RoomDetails),
        (status = 404, description = "The caller has not joined a room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn get_room_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<RoomDetails>, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let room_id = caller
        .room_id
        .ok_or_else(|| PortError::NotFound("you have not joined a room".to_string()))?;
    let room = state.db.get_room(room_id).await?;
    let members = state.db.list_room_members(room_id).await?;
    Ok(Json(RoomDetails { room, members }))
}

/// Create a room and move the caller into it.
#[utoipa::path(
    post,
    path = "/api/rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 201, description = "Room created", body = Room),
        (status = 400, description = "Missing name", body = ErrorBody),
        (status = 409, description = "The caller already belongs to a room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn create_room_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    if req.created_by.is_some_and(|id| id != caller.id) {
        return Err(HttpError::forbidden("rooms can only be created for yourself"));
    }
    if caller.room_id.is_some() {
        return Err(HttpError::conflict("leave your current room before creating a new one"));
    }
    let name = room_name(&req.name)?;

    let room = state.db.create_room(name, caller.id).await?;
    info!("Room {} created by {}", room.id, caller.id);

    // Not compensated: the room survives if the assignment fails.
    if let Err(e) = state.db.set_user_room(caller.id, Some(room.id)).await {
        error!("Room {} created but assigning its creator failed: {:?}", room.id, e);
        return Err(e.into());
    }
    Ok((StatusCode::CREATED, Json(room)))
}

/// Rename a room. Only its creator may do this.
#[utoipa::path(
    put,
    path = "/api/rooms",
    request_body = RenameRoomRequest,
    responses(
        (status = 200, description = "Room renamed", body = Room),
        (status = 403, description = "Not the room creator", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn rename_room_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<RenameRoomRequest>,
) -> Result<Json<Room>, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let room_id = resolve_room(&caller, req.room_id)?;
    let name = room_name(&req.name)?;

    let room = state.db.get_room(room_id).await?;
    if room.created_by != caller.id {
        return Err(HttpError::forbidden("only the room creator can rename it"));
    }
    Ok(Json(state.db.rename_room(room_id, name).await?))
}
