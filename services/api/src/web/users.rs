//! services/api/src/web/users.rs
//!
//! Profile registration, aura adjustments and room reassignment.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use dormduty_core::{
    domain::{AuraEvent, Identity, User},
    ledger::LedgerAction,
    membership::ensure_member,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{
    ledger::load_ledger,
    middleware::load_caller,
    response::{ErrorBody, HttpError},
    state::AppState,
};

//=========================================================================================
// Request Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub user_id: Uuid,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuraAdjustmentRequest {
    pub user_id: Uuid,
    pub aura_change: i32,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoomRequest {
    /// `null` removes the user from their room.
    pub room_id: Option<Uuid>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Create the caller's profile, or return the existing one unchanged.
#[utoipa::path(
    post,
    path = "/api/registerUser",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Profile created", body = User),
        (status = 200, description = "Profile already existed", body = User),
        (status = 400, description = "Missing email", body = ErrorBody),
        (status = 403, description = "userId does not match the token", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn register_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<impl IntoResponse, HttpError> {
    if req.user_id != identity.user_id {
        return Err(HttpError::forbidden("userId does not match the signed-in user"));
    }
    let email = req.email.trim();
    if email.is_empty() {
        return Err(HttpError::bad_request("email is required"));
    }
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or(email));

    let registration = state.db.register_user(req.user_id, email, name).await?;
    let status = if registration.created {
        info!("Registered new user {}", registration.user.id);
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(registration.user)))
}

/// The caller's profile.
#[utoipa::path(
    get,
    path = "/api/user/me",
    responses(
        (status = 200, description = "The caller's profile", body = User),
        (status = 403, description = "Profile not registered", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<User>, HttpError> {
    Ok(Json(load_caller(&state, &identity).await?))
}

/// The caller's aura history, newest first.
#[utoipa::path(
    get,
    path = "/api/user/aura",
    responses((status = 200, description = "Aura events", body = [AuraEvent])),
    security(("bearer" = []))
)]
pub async fn aura_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<AuraEvent>>, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    Ok(Json(state.db.list_aura_events(caller.id).await?))
}

/// Manually adjust a roommate's aura balance.
#[utoipa::path(
    patch,
    path = "/api/user/aura",
    request_body = AuraAdjustmentRequest,
    responses(
        (status = 200, description = "Updated profile", body = User),
        (status = 400, description = "Zero change", body = ErrorBody),
        (status = 403, description = "Target is in another room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn adjust_aura_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<AuraAdjustmentRequest>,
) -> Result<Json<User>, HttpError> {
    if req.aura_change == 0 {
        return Err(HttpError::bad_request("auraChange must not be zero"));
    }
    let caller = load_caller(&state, &identity).await?;
    if req.user_id != caller.id {
        let target = state.db.get_user(req.user_id).await?;
        let target_room = target
            .room_id
            .ok_or_else(|| HttpError::forbidden("that user is not in your room"))?;
        ensure_member(&caller, target_room)?;
    }

    let reason = req
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("manual adjustment");
    let user = state.db.adjust_aura(req.user_id, req.aura_change, reason).await?;
    Ok(Json(user))
}

/// Move a user into another room, or out of their room.
///
/// Users may move themselves; the creator of a room may move its members.
/// A user with an unsettled balance cannot leave their room.
#[utoipa::path(
    put,
    path = "/api/user/{id}/room",
    params(("id" = Uuid, Path, description = "The user to reassign")),
    request_body = AssignRoomRequest,
    responses(
        (status = 200, description = "Updated profile", body = User),
        (status = 403, description = "Not allowed to move this user", body = ErrorBody),
        (status = 404, description = "Unknown user or room", body = ErrorBody),
        (status = 409, description = "Outstanding balance in the current room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn assign_room_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<AssignRoomRequest>,
) -> Result<Json<User>, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let target = if user_id == caller.id {
        caller.clone()
    } else {
        let target = state.db.get_user(user_id).await?;
        let managed_by_caller = match target.room_id {
            Some(room_id) => state.db.get_room(room_id).await?.created_by == caller.id,
            None => false,
        };
        if !managed_by_caller {
            return Err(HttpError::forbidden("only the room creator can move other members"));
        }
        target
    };

    if let Some(room_id) = req.room_id {
        state.db.get_room(room_id).await?;
    }

    if let Some(current) = target.room_id.filter(|r| Some(*r) != req.room_id) {
        let ledger = load_ledger(&state, current).await?;
        ledger.apply(LedgerAction::RemoveMember(target.id))?;
    }

    let user = state.db.set_user_room(target.id, req.room_id).await?;
    info!("User {} moved to room {:?}", user.id, user.room_id);
    Ok(Json(user))
}
