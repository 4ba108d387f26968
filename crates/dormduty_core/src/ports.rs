//! crates/dormduty_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core relies on.
//! The hosted database, the auth provider and the generative-text API all sit
//! behind these traits so the domain logic never touches them directly.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    AuraEvent, Booking, Expense, Identity, LaundryState, LaundryUpdate, NewBooking, NewTask,
    Payment, Room, RoomId, Schedule, Task, TaskUpdate, User, UserId,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// The web layer maps each variant onto one HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    Invalid(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Outcome of an idempotent registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: User,
    pub created: bool,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    async fn get_user(&self, user_id: UserId) -> PortResult<User>;

    /// Creates the profile if it does not exist; otherwise returns the stored one unchanged.
    async fn register_user(&self, user_id: UserId, email: &str, name: &str) -> PortResult<Registration>;

    /// Adds `change` to the user's aura balance and appends an [`AuraEvent`].
    async fn adjust_aura(&self, user_id: UserId, change: i32, reason: &str) -> PortResult<User>;

    async fn list_aura_events(&self, user_id: UserId) -> PortResult<Vec<AuraEvent>>;

    async fn set_user_room(&self, user_id: UserId, room_id: Option<RoomId>) -> PortResult<User>;

    async fn list_room_members(&self, room_id: RoomId) -> PortResult<Vec<User>>;

    /// Room members ordered by aura (descending), then name. Returns the page and the total.
    async fn leaderboard(&self, room_id: RoomId, limit: u32, offset: u64) -> PortResult<(Vec<User>, u64)>;

    // --- Rooms ---
    async fn create_room(&self, name: &str, created_by: UserId) -> PortResult<Room>;

    async fn get_room(&self, room_id: RoomId) -> PortResult<Room>;

    async fn rename_room(&self, room_id: RoomId, name: &str) -> PortResult<Room>;

    // --- Tasks ---
    async fn list_tasks(&self, room_id: RoomId) -> PortResult<Vec<Task>>;

    async fn get_task(&self, task_id: Uuid) -> PortResult<Task>;

    async fn create_task(&self, task: NewTask) -> PortResult<Task>;

    async fn update_task(&self, task_id: Uuid, update: TaskUpdate) -> PortResult<Task>;

    async fn delete_task(&self, task_id: Uuid) -> PortResult<()>;

    // --- Laundry ---
    /// Returns an empty state if the room has never written one.
    async fn get_laundry(&self, room_id: RoomId) -> PortResult<LaundryState>;

    async fn upsert_laundry(&self, room_id: RoomId, update: LaundryUpdate) -> PortResult<LaundryState>;

    // --- Bookings ---
    async fn list_bookings(&self, room_id: RoomId) -> PortResult<Vec<Booking>>;

    async fn get_booking(&self, booking_id: Uuid) -> PortResult<Booking>;

    /// Fails with [`PortError::Conflict`] when the store rejects an overlapping window.
    async fn create_booking(&self, booking: NewBooking) -> PortResult<Booking>;

    async fn delete_booking(&self, booking_id: Uuid) -> PortResult<()>;

    // --- Ledger ---
    async fn list_expenses(&self, room_id: RoomId) -> PortResult<Vec<Expense>>;

    async fn get_expense(&self, expense_id: Uuid) -> PortResult<Expense>;

    async fn save_expense(&self, expense: Expense) -> PortResult<()>;

    async fn delete_expense(&self, expense_id: Uuid) -> PortResult<()>;

    async fn list_payments(&self, room_id: RoomId) -> PortResult<Vec<Payment>>;

    async fn save_payment(&self, payment: Payment) -> PortResult<()>;

    // --- Schedules ---
    async fn get_schedule(&self, user_id: UserId) -> PortResult<Schedule>;

    async fn upsert_schedule(&self, schedule: Schedule) -> PortResult<Schedule>;

    async fn list_room_schedules(&self, room_id: RoomId) -> PortResult<Vec<Schedule>>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies a bearer token issued by the auth provider.
    async fn verify_token(&self, token: &str) -> PortResult<Identity>;
}

#[async_trait]
pub trait ScheduleOptimizerService: Send + Sync {
    /// Asks the generative model for task assignments and returns its raw text output.
    async fn suggest_assignments(&self, schedules: &[Schedule], tasks: &[Task]) -> PortResult<String>;
}
