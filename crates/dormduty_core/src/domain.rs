//! crates/dormduty_core/src/domain.rs
//!
//! Defines the core data structures shared by the ledger, laundry, task and
//! schedule logic. They carry serde derives so the web layer can return them
//! as-is, but nothing in here knows about the database.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ledger::{Allocation, SplitStrategy};

// Schema-derived structs spell these fields as `Uuid`; utoipa cannot see through aliases.
pub type UserId = Uuid;
pub type RoomId = Uuid;

//=========================================================================================
// Users and Rooms
//=========================================================================================

/// A roommate's profile, mirrored from the hosted auth provider at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub aura: i32,
    pub room_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// The unit of roommate grouping. Members are derived from users pointing at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RoomDetails {
    #[serde(flatten)]
    pub room: Room,
    pub members: Vec<User>,
}

/// A single manual or automatic change to a user's aura balance.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AuraEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub change: i32,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u64,
    pub user_id: Uuid,
    pub name: String,
    pub aura: i32,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPage {
    pub entries: Vec<LeaderboardEntry>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

/// The verified identity behind a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: Option<String>,
}

//=========================================================================================
// Tasks
//=========================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            other => Err(format!("unknown task priority '{other}'")),
        }
    }
}

/// A chore belonging to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub room_id: Uuid,
    pub assigned_user_id: Option<Uuid>,
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub aura_points: i32,
    pub priority: TaskPriority,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub room_id: Uuid,
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_user_id: Option<Uuid>,
    pub aura_points: i32,
    pub priority: TaskPriority,
    pub notes: Option<String>,
}

/// A partial task update. `None` leaves a field untouched; `Some(None)` clears a
/// nullable column.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assigned_user_id: Option<Option<Uuid>>,
    pub completed: Option<bool>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub aura_points: Option<i32>,
    pub priority: Option<TaskPriority>,
    pub notes: Option<Option<String>>,
}

impl TaskUpdate {
    /// Applies the update to an in-memory task.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(assigned) = self.assigned_user_id {
            task.assigned_user_id = assigned;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(completed_at) = self.completed_at {
            task.completed_at = completed_at;
        }
        if let Some(points) = self.aura_points {
            task.aura_points = points;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(notes) = &self.notes {
            task.notes = notes.clone();
        }
    }
}

//=========================================================================================
// Laundry
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Machine {
    Washer,
    Dryer,
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Machine::Washer => f.write_str("washer"),
            Machine::Dryer => f.write_str("dryer"),
        }
    }
}

impl FromStr for Machine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "washer" => Ok(Machine::Washer),
            "dryer" => Ok(Machine::Dryer),
            other => Err(format!("unknown machine '{other}'")),
        }
    }
}

/// The per-room singleton holding who is using each machine and until when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LaundryState {
    pub room_id: Uuid,
    pub washer_user_id: Option<Uuid>,
    pub dryer_user_id: Option<Uuid>,
    pub washer_timer_end: Option<DateTime<Utc>>,
    pub dryer_timer_end: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl LaundryState {
    /// The state of a room whose laundry row has never been written.
    pub fn empty(room_id: RoomId) -> Self {
        Self {
            room_id,
            washer_user_id: None,
            dryer_user_id: None,
            washer_timer_end: None,
            dryer_timer_end: None,
            updated_at: None,
        }
    }
}

/// Partial laundry update with the same `Option<Option<_>>` convention as [`TaskUpdate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaundryUpdate {
    pub washer_user_id: Option<Option<Uuid>>,
    pub dryer_user_id: Option<Option<Uuid>>,
    pub washer_timer_end: Option<Option<DateTime<Utc>>>,
    pub dryer_timer_end: Option<Option<DateTime<Utc>>>,
}

impl LaundryUpdate {
    /// Sets the user and timer end of one machine.
    pub fn machine(machine: Machine, user: Option<UserId>, timer_end: Option<DateTime<Utc>>) -> Self {
        match machine {
            Machine::Washer => Self {
                washer_user_id: Some(user),
                washer_timer_end: Some(timer_end),
                ..Default::default()
            },
            Machine::Dryer => Self {
                dryer_user_id: Some(user),
                dryer_timer_end: Some(timer_end),
                ..Default::default()
            },
        }
    }

    /// Only touches the timer end of one machine.
    pub fn timer_end(machine: Machine, timer_end: Option<DateTime<Utc>>) -> Self {
        match machine {
            Machine::Washer => Self {
                washer_timer_end: Some(timer_end),
                ..Default::default()
            },
            Machine::Dryer => Self {
                dryer_timer_end: Some(timer_end),
                ..Default::default()
            },
        }
    }

    /// Frees a machine: no user, no timer.
    pub fn clear(machine: Machine) -> Self {
        Self::machine(machine, None, None)
    }

    pub fn apply_to(&self, state: &mut LaundryState) {
        if let Some(v) = self.washer_user_id {
            state.washer_user_id = v;
        }
        if let Some(v) = self.dryer_user_id {
            state.dryer_user_id = v;
        }
        if let Some(v) = self.washer_timer_end {
            state.washer_timer_end = v;
        }
        if let Some(v) = self.dryer_timer_end {
            state.dryer_timer_end = v;
        }
    }
}

//=========================================================================================
// Bookings
//=========================================================================================

/// A reservation of a named machine for the half-open window `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub room_id: Uuid,
    pub machine: String,
    pub user_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub room_id: Uuid,
    pub machine: String,
    pub user_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub notes: Option<String>,
}

//=========================================================================================
// Expenses and Payments
//=========================================================================================

/// A shared expense. The room acts as the splitting group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub room_id: Uuid,
    pub payer_id: Uuid,
    pub description: String,
    /// Total in minor currency units.
    pub amount: i64,
    pub currency: String,
    pub split: SplitStrategy,
    /// Per-participant owed amounts; always sums to `amount`.
    pub shares: Allocation,
    pub created_at: DateTime<Utc>,
}

/// A settlement from `from_user_id` (the payer) to `to_user_id` (the payee).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub room_id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub amount: i64,
    pub method: Option<String>,
    pub expense_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Schedules
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "Mon"))]
    pub day: Weekday,
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "09:00:00"))]
    pub start: NaiveTime,
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "10:00:00"))]
    pub end: NaiveTime,
    #[serde(default)]
    pub busy: bool,
    #[serde(default)]
    pub activity: Option<String>,
}

/// A user's weekly availability as input to the optimizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub user_name: String,
    pub preferences: String,
    pub slots: Vec<TimeSlot>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAssignment {
    pub task_id: Uuid,
    pub task_title: String,
    pub user_id: Uuid,
    pub user_name: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub day: Weekday,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub start: NaiveTime,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub end: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum AssignmentSource {
    Ai,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct OptimizedSchedule {
    pub assignments: Vec<ScheduleAssignment>,
    pub source: AssignmentSource,
}
