//! services/api/src/web/schedules.rs
//!
//! Weekly availability per roommate and the chore schedule optimizer.

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use dormduty_core::{
    domain::{Identity, OptimizedSchedule, Schedule, TimeSlot},
    membership::{resolve_room, room_of},
    schedule,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{
    middleware::load_caller,
    response::{ErrorBody, HttpError},
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveScheduleRequest {
    #[serde(default)]
    pub preferences: String,
    pub slots: Vec<TimeSlot>,
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRequest {
    #[serde(default)]
    pub room_id: Option<Uuid>,
}

/// The caller's saved weekly schedule.
#[utoipa::path(
    get,
    path = "/api/schedules",
    responses(
        (status = 200, description = "The caller's schedule", body = Schedule),
        (status = 404, description = "Nothing saved yet", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn get_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Schedule>, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    Ok(Json(state.db.get_schedule(caller.id).await?))
}

/// Replace the caller's weekly schedule.
#[utoipa::path(
    put,
    path = "/api/schedules",
    request_body = SaveScheduleRequest,
    responses(
        (status = 200, description = "Saved schedule", body = Schedule),
        (status = 400, description = "A slot ends before it starts", body = ErrorBody),
        (status = 403, description = "The caller has no room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn save_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SaveScheduleRequest>,
) -> Result<Json<Schedule>, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let room_id = room_of(&caller)?;
    if let Some(slot) = req.slots.iter().find(|s| s.end <= s.start) {
        return Err(HttpError::bad_request(format!(
            "slot on {} must end after {}",
            slot.day, slot.start
        )));
    }

    let saved = state
        .db
        .upsert_schedule(Schedule {
            user_id: caller.id,
            room_id,
            user_name: caller.name,
            preferences: req.preferences.trim().to_string(),
            slots: req.slots,
            updated_at: Utc::now(),
        })
        .await?;
    Ok(Json(saved))
}

/// Assign the room's open chores to roommates' free slots.
///
/// Uses the generative model when configured and falls back to a
/// deterministic round-robin on any failure.
#[utoipa::path(
    post,
    path = "/api/schedule/optimize",
    request_body = OptimizeRequest,
    responses(
        (status = 200, description = "Suggested assignments", body = OptimizedSchedule),
        (status = 403, description = "Not a member of the room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn optimize_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<OptimizedSchedule>, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let room_id = resolve_room(&caller, req.room_id)?;

    // Schedules outlive membership; only current roommates take chores.
    let members = state.db.list_room_members(room_id).await?;
    let mut schedules = state.db.list_room_schedules(room_id).await?;
    schedules.retain(|s| members.iter().any(|m| m.id == s.user_id));
    let tasks = state.db.list_tasks(room_id).await?;
    let optimized = schedule::optimize(state.optimizer.as_deref(), &schedules, &tasks).await;
    info!(
        "Optimized {} assignments for room {} ({:?})",
        optimized.assignments.len(),
        room_id,
        optimized.source
    );
    Ok(Json(optimized))
}
