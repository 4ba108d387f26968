//! services/api/src/web/tasks.rs
//!
//! Chore CRUD. Completing or reopening an assigned task also moves aura points.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use dormduty_core::{
    aura::{self, DEFAULT_TASK_AURA},
    domain::{Identity, NewTask, RoomId, Task, TaskPriority, TaskUpdate, UserId},
    membership::{ensure_member, resolve_room},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::{
    middleware::load_caller,
    payload::{deserialize_some, RoomQuery},
    response::{ErrorBody, HttpError},
    state::AppState,
};

//=========================================================================================
// Request Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub room_id: Option<Uuid>,
    #[serde(alias = "title")]
    pub task_name: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assigned_user_id: Option<Uuid>,
    #[serde(default)]
    pub aura_points: Option<i32>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Fields to change. Absent fields are left alone; `null` clears nullable ones.
#[derive(Deserialize, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    #[serde(default, alias = "taskName")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Uuid>)]
    pub assigned_user_id: Option<Option<Uuid>>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub aura_points: Option<i32>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub task_id: Uuid,
    pub updates: TaskChanges,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TaskIdQuery {
    pub task_id: Uuid,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Rejects assignees that are not in `room_id`.
async fn check_assignee(state: &AppState, room_id: RoomId, assignee: Option<UserId>) -> Result<(), HttpError> {
    let Some(assignee) = assignee else {
        return Ok(());
    };
    let members = state.db.list_room_members(room_id).await?;
    if members.iter().any(|m| m.id == assignee) {
        Ok(())
    } else {
        Err(HttpError::bad_request("tasks can only be assigned to members of the room"))
    }
}

fn check_points(points: Option<i32>) -> Result<(), HttpError> {
    match points {
        Some(p) if p < 0 => Err(HttpError::bad_request("auraPoints must not be negative")),
        _ => Ok(()),
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the tasks of a room.
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(RoomQuery),
    responses(
        (status = 200, description = "Tasks of the room", body = [Task]),
        (status = 403, description = "Not a member of the room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<RoomQuery>,
) -> Result<Json<Vec<Task>>, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let room_id = resolve_room(&caller, query.room_id)?;
    Ok(Json(state.db.list_tasks(room_id).await?))
}

/// Create a task in a room.
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Invalid task", body = ErrorBody),
        (status = 403, description = "Not a member of the room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let room_id = resolve_room(&caller, req.room_id)?;

    let title = req.task_name.trim();
    if title.is_empty() {
        return Err(HttpError::bad_request("taskName is required"));
    }
    check_points(req.aura_points)?;
    check_assignee(&state, room_id, req.assigned_user_id).await?;

    let task = state
        .db
        .create_task(NewTask {
            room_id,
            title: title.to_string(),
            due_date: req.due_date,
            assigned_user_id: req.assigned_user_id,
            aura_points: req.aura_points.unwrap_or(DEFAULT_TASK_AURA),
            priority: req.priority.unwrap_or_default(),
            notes: req.notes,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Update a task. Toggling `completed` awards or revokes the assignee's aura.
#[utoipa::path(
    patch,
    path = "/api/tasks",
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Updated task", body = Task),
        (status = 400, description = "Invalid update", body = ErrorBody),
        (status = 403, description = "Task belongs to another room", body = ErrorBody),
        (status = 404, description = "Unknown task", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn update_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let task = state.db.get_task(req.task_id).await?;
    ensure_member(&caller, task.room_id)?;

    let changes = req.updates;
    let title = match changes.title.as_deref().map(str::trim) {
        Some("") => return Err(HttpError::bad_request("title must not be empty")),
        Some(t) => Some(t.to_string()),
        None => None,
    };
    check_points(changes.aura_points)?;
    if let Some(assignee) = changes.assigned_user_id {
        check_assignee(&state, task.room_id, assignee).await?;
    }

    let mut update = TaskUpdate {
        title,
        due_date: changes.due_date,
        assigned_user_id: changes.assigned_user_id,
        aura_points: changes.aura_points,
        priority: changes.priority,
        notes: changes.notes,
        ..Default::default()
    };

    let now = Utc::now();
    let aura_change = match changes.completed {
        Some(completed) if completed != task.completed => {
            // Completion pays out under the updated task; reopening takes back
            // what the stored completion paid.
            let mut basis = task.clone();
            if completed {
                update.apply_to(&mut basis);
            }
            update.completed = Some(completed);
            update.completed_at = Some(completed.then_some(now));
            aura::change_for_toggle(&basis, completed, now)
        }
        _ => None,
    };

    let updated = state.db.update_task(task.id, update).await?;

    if let Some(change) = aura_change {
        if let Err(e) = state.db.adjust_aura(change.user_id, change.delta, &change.reason).await {
            error!("Task {} updated but aura change for {} failed: {:?}", task.id, change.user_id, e);
            return Err(e.into());
        }
        info!("Aura {:+} for {} ({})", change.delta, change.user_id, change.reason);
    }
    Ok(Json(updated))
}

/// Delete a task.
#[utoipa::path(
    delete,
    path = "/api/tasks",
    params(TaskIdQuery),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Task belongs to another room", body = ErrorBody),
        (status = 404, description = "Unknown task", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<TaskIdQuery>,
) -> Result<StatusCode, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let task = state.db.get_task(query.task_id).await?;
    ensure_member(&caller, task.room_id)?;
    state.db.delete_task(task.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
