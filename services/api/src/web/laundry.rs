//! services/api/src/web/laundry.rs
//!
//! Per-room washer/dryer state and the machine countdown timers.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use dormduty_core::{
    domain::{Identity, LaundryState, LaundryUpdate, Machine, UserId},
    membership::resolve_room,
    ports::PortError,
    timer::{TimerSnapshot, TimerStatus},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{
    middleware::load_caller,
    payload::{deserialize_some, RoomQuery},
    response::{ErrorBody, HttpError},
    state::AppState,
};

const MAX_TIMER_MINUTES: u32 = 240;

//=========================================================================================
// Request and Response Payloads
//=========================================================================================

#[derive(Deserialize, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LaundryChanges {
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<uuid::Uuid>)]
    pub washer_user_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<uuid::Uuid>)]
    pub dryer_user_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub washer_timer_end: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub dryer_timer_end: Option<Option<DateTime<Utc>>>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLaundryRequest {
    #[serde(default)]
    pub room_id: Option<Uuid>,
    pub updates: LaundryChanges,
}

/// A timer action for one machine, tagged by `action`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum TimerAction {
    Start { minutes: u32 },
    Pause,
    Resume,
    Extend { minutes: u32 },
    Finish,
    Reset,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LaundryTimerResponse {
    pub laundry: LaundryState,
    pub timer: TimerSnapshot,
}

fn parse_machine(raw: &str) -> Result<Machine, HttpError> {
    raw.parse::<Machine>().map_err(HttpError::bad_request)
}

fn check_minutes(minutes: u32) -> Result<(), HttpError> {
    if (1..=MAX_TIMER_MINUTES).contains(&minutes) {
        Ok(())
    } else {
        Err(HttpError::bad_request(format!(
            "minutes must be between 1 and {}",
            MAX_TIMER_MINUTES
        )))
    }
}

/// The wall-clock end of a running timer, `None` otherwise.
fn timer_end(snapshot: &TimerSnapshot, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    (snapshot.status == TimerStatus::Running)
        .then(|| now + Duration::seconds(snapshot.remaining_secs as i64))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// The laundry state of a room.
#[utoipa::path(
    get,
    path = "/api/laundry",
    params(RoomQuery),
    responses(
        (status = 200, description = "Laundry state", body = LaundryState),
        (status = 403, description = "Not a member of the room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn get_laundry_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<RoomQuery>,
) -> Result<Json<LaundryState>, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let room_id = resolve_room(&caller, query.room_id)?;
    Ok(Json(state.db.get_laundry(room_id).await?))
}

/// Set who is using each machine and until when.
#[utoipa::path(
    patch,
    path = "/api/laundry",
    request_body = UpdateLaundryRequest,
    responses(
        (status = 200, description = "Updated laundry state", body = LaundryState),
        (status = 400, description = "Machine user is not in the room", body = ErrorBody),
        (status = 403, description = "Not a member of the room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn update_laundry_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<UpdateLaundryRequest>,
) -> Result<Json<LaundryState>, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let room_id = resolve_room(&caller, req.room_id)?;
    let changes = req.updates;

    let users: Vec<UserId> = [changes.washer_user_id, changes.dryer_user_id]
        .into_iter()
        .flatten()
        .flatten()
        .collect();
    if !users.is_empty() {
        let members = state.db.list_room_members(room_id).await?;
        if users.iter().any(|u| !members.iter().any(|m| m.id == *u)) {
            return Err(HttpError::bad_request("machines can only be used by members of the room"));
        }
    }

    let update = LaundryUpdate {
        washer_user_id: changes.washer_user_id,
        dryer_user_id: changes.dryer_user_id,
        washer_timer_end: changes.washer_timer_end,
        dryer_timer_end: changes.dryer_timer_end,
    };
    Ok(Json(state.db.upsert_laundry(room_id, update).await?))
}

/// The countdown of one machine in the caller's room.
#[utoipa::path(
    get,
    path = "/api/laundry/{machine}/timer",
    params(("machine" = String, Path, description = "washer or dryer")),
    responses(
        (status = 200, description = "Timer state", body = TimerSnapshot),
        (status = 404, description = "No timer started", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn get_timer_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(machine): Path<String>,
) -> Result<Json<TimerSnapshot>, HttpError> {
    let machine = parse_machine(&machine)?;
    let caller = load_caller(&state, &identity).await?;
    let room_id = resolve_room(&caller, None)?;
    state
        .laundry_timers
        .snapshot(room_id, machine)
        .await
        .map(Json)
        .ok_or_else(|| PortError::NotFound(format!("No {} timer has been started", machine)).into())
}

/// Drive the countdown of one machine in the caller's room.
///
/// `start` claims the machine for the caller; when the countdown finishes the
/// machine is freed automatically.
#[utoipa::path(
    post,
    path = "/api/laundry/{machine}/timer",
    params(("machine" = String, Path, description = "washer or dryer")),
    request_body = TimerAction,
    responses(
        (status = 200, description = "Timer and laundry state", body = LaundryTimerResponse),
        (status = 400, description = "Invalid machine or duration", body = ErrorBody),
        (status = 404, description = "No timer started", body = ErrorBody),
        (status = 409, description = "Machine is in use by someone else", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn timer_action_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(machine): Path<String>,
    Json(action): Json<TimerAction>,
) -> Result<Json<LaundryTimerResponse>, HttpError> {
    let machine = parse_machine(&machine)?;
    let caller = load_caller(&state, &identity).await?;
    let room_id = resolve_room(&caller, None)?;
    let timers = &state.laundry_timers;
    let now = Utc::now();

    let (timer, update) = match action {
        TimerAction::Start { minutes } => {
            check_minutes(minutes)?;
            let current = state.db.get_laundry(room_id).await?;
            let (holder, end) = match machine {
                Machine::Washer => (current.washer_user_id, current.washer_timer_end),
                Machine::Dryer => (current.dryer_user_id, current.dryer_timer_end),
            };
            // A paused load still occupies the machine.
            let paused = timers
                .snapshot(room_id, machine)
                .await
                .is_some_and(|t| t.status == TimerStatus::Paused);
            let busy = paused || end.is_some_and(|end| end > now);
            if busy && holder.is_some_and(|h| h != caller.id) {
                return Err(HttpError::conflict(format!("the {} is in use", machine)));
            }
            // Claimed before the worker exists; its completion write must land last.
            let end = now + Duration::minutes(i64::from(minutes));
            let laundry = state
                .db
                .upsert_laundry(room_id, LaundryUpdate::machine(machine, Some(caller.id), Some(end)))
                .await?;
            let timer = timers.start(room_id, machine, minutes).await;
            info!("{} started a {} minute {} timer", caller.id, minutes, machine);
            return Ok(Json(LaundryTimerResponse { laundry, timer }));
        }
        TimerAction::Pause => {
            let timer = timers.pause(room_id, machine).await?;
            (timer, LaundryUpdate::timer_end(machine, None))
        }
        TimerAction::Resume => {
            let timer = timers.resume(room_id, machine).await?;
            (timer, LaundryUpdate::timer_end(machine, timer_end(&timer, now)))
        }
        TimerAction::Extend { minutes } => {
            check_minutes(minutes)?;
            let timer = timers.extend(room_id, machine, minutes).await?;
            (timer, LaundryUpdate::timer_end(machine, timer_end(&timer, now)))
        }
        TimerAction::Finish => {
            let timer = timers.finish(room_id, machine).await?;
            (timer, LaundryUpdate::clear(machine))
        }
        TimerAction::Reset => {
            let timer = timers.reset(room_id, machine).await?;
            (timer, LaundryUpdate::timer_end(machine, None))
        }
    };

    let laundry = state.db.upsert_laundry(room_id, update).await?;
    Ok(Json(LaundryTimerResponse { laundry, timer }))
}
