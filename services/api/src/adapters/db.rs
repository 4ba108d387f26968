//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dormduty_core::domain::{
    AuraEvent, Booking, Expense, LaundryState, LaundryUpdate, NewBooking, NewTask, Payment, Room,
    RoomId, Schedule, Task, TaskUpdate, TimeSlot, User, UserId,
};
use dormduty_core::ledger::{Allocation, SplitStrategy};
use dormduty_core::ports::{DatabaseService, PortError, PortResult, Registration};
use sqlx::{types::Json, FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

/// Postgres SQLSTATE for an exclusion constraint violation.
const EXCLUSION_VIOLATION: &str = "23P01";

const USER_COLUMNS: &str = "id, name, email, aura, room_id, created_at";
const TASK_COLUMNS: &str = "id, room_id, assigned_user_id, title, due_date, completed, completed_at, aura_points, priority, notes, created_at";
const LAUNDRY_COLUMNS: &str = "room_id, washer_user_id, dryer_user_id, washer_timer_end, dryer_timer_end, updated_at";
const BOOKING_COLUMNS: &str = "id, room_id, machine, user_id, start_at, end_at, notes, created_at";
const EXPENSE_COLUMNS: &str = "id, room_id, payer_id, description, amount, currency, split, shares, created_at";
const PAYMENT_COLUMNS: &str = "id, room_id, from_user_id, to_user_id, amount, method, expense_id, created_at";
const SCHEDULE_COLUMNS: &str = "user_id, room_id, user_name, preferences, slots, updated_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: impl FnOnce() -> String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what()),
        other => unexpected(other),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    aura: i32,
    room_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            aura: self.aura,
            room_id: self.room_id,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct RoomRecord {
    id: Uuid,
    name: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}
impl RoomRecord {
    fn to_domain(self) -> Room {
        Room {
            id: self.id,
            name: self.name,
            created_by: self.created_by,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct AuraEventRecord {
    id: Uuid,
    user_id: Uuid,
    change: i32,
    reason: String,
    created_at: DateTime<Utc>,
}
impl AuraEventRecord {
    fn to_domain(self) -> AuraEvent {
        AuraEvent {
            id: self.id,
            user_id: self.user_id,
            change: self.change,
            reason: self.reason,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct TaskRecord {
    id: Uuid,
    room_id: Uuid,
    assigned_user_id: Option<Uuid>,
    title: String,
    due_date: Option<DateTime<Utc>>,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    aura_points: i32,
    priority: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}
impl TaskRecord {
    fn to_domain(self) -> Task {
        Task {
            id: self.id,
            room_id: self.room_id,
            assigned_user_id: self.assigned_user_id,
            title: self.title,
            due_date: self.due_date,
            completed: self.completed,
            completed_at: self.completed_at,
            aura_points: self.aura_points,
            priority: self.priority.parse().unwrap_or_default(),
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct LaundryRecord {
    room_id: Uuid,
    washer_user_id: Option<Uuid>,
    dryer_user_id: Option<Uuid>,
    washer_timer_end: Option<DateTime<Utc>>,
    dryer_timer_end: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}
impl LaundryRecord {
    fn to_domain(self) -> LaundryState {
        LaundryState {
            room_id: self.room_id,
            washer_user_id: self.washer_user_id,
            dryer_user_id: self.dryer_user_id,
            washer_timer_end: self.washer_timer_end,
            dryer_timer_end: self.dryer_timer_end,
            updated_at: Some(self.updated_at),
        }
    }
}

#[derive(FromRow)]
struct BookingRecord {
    id: Uuid,
    room_id: Uuid,
    machine: String,
    user_id: Uuid,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}
impl BookingRecord {
    fn to_domain(self) -> Booking {
        Booking {
            id: self.id,
            room_id: self.room_id,
            machine: self.machine,
            user_id: self.user_id,
            start: self.start_at,
            end: self.end_at,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ExpenseRecord {
    id: Uuid,
    room_id: Uuid,
    payer_id: Uuid,
    description: String,
    amount: i64,
    currency: String,
    split: Json<SplitStrategy>,
    shares: Json<Allocation>,
    created_at: DateTime<Utc>,
}
impl ExpenseRecord {
    fn to_domain(self) -> Expense {
        Expense {
            id: self.id,
            room_id: self.room_id,
            payer_id: self.payer_id,
            description: self.description,
            amount: self.amount,
            currency: self.currency,
            split: self.split.0,
            shares: self.shares.0,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct PaymentRecord {
    id: Uuid,
    room_id: Uuid,
    from_user_id: Uuid,
    to_user_id: Uuid,
    amount: i64,
    method: Option<String>,
    expense_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}
impl PaymentRecord {
    fn to_domain(self) -> Payment {
        Payment {
            id: self.id,
            room_id: self.room_id,
            from_user_id: self.from_user_id,
            to_user_id: self.to_user_id,
            amount: self.amount,
            method: self.method,
            expense_id: self.expense_id,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ScheduleRecord {
    user_id: Uuid,
    room_id: Uuid,
    user_name: String,
    preferences: String,
    slots: Json<Vec<TimeSlot>>,
    updated_at: DateTime<Utc>,
}
impl ScheduleRecord {
    fn to_domain(self) -> Schedule {
        Schedule {
            user_id: self.user_id,
            room_id: self.room_id,
            user_name: self.user_name,
            preferences: self.preferences,
            slots: self.slots.0,
            updated_at: self.updated_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Users ---

    async fn get_user(&self, user_id: UserId) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn register_user(&self, user_id: UserId, email: &str, name: &str) -> PortResult<Registration> {
        let inserted = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, name, email) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(name)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match inserted {
            Some(record) => Ok(Registration {
                user: record.to_domain(),
                created: true,
            }),
            None => Ok(Registration {
                user: self.get_user(user_id).await?,
                created: false,
            }),
        }
    }

    async fn adjust_aura(&self, user_id: UserId, change: i32, reason: &str) -> PortResult<User> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET aura = aura + $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(change)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("User {} not found", user_id)))?;

        sqlx::query("INSERT INTO aura_events (id, user_id, change, reason) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(change)
            .bind(reason)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_aura_events(&self, user_id: UserId) -> PortResult<Vec<AuraEvent>> {
        let records = sqlx::query_as::<_, AuraEventRecord>(
            "SELECT id, user_id, change, reason, created_at FROM aura_events WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn set_user_room(&self, user_id: UserId, room_id: Option<RoomId>) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET room_id = $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(room_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn list_room_members(&self, room_id: RoomId) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE room_id = $1 ORDER BY created_at ASC"
        ))
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn leaderboard(&self, room_id: RoomId, limit: u32, offset: u64) -> PortResult<(Vec<User>, u64)> {
        let offset = i64::try_from(offset)
            .map_err(|_| PortError::Invalid("page is out of range".to_string()))?;

        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE room_id = $1 ORDER BY aura DESC, name ASC LIMIT $2 OFFSET $3"
        ))
        .bind(room_id)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE room_id = $1")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok((
            records.into_iter().map(|r| r.to_domain()).collect(),
            total.max(0) as u64,
        ))
    }

    // --- Rooms ---

    async fn create_room(&self, name: &str, created_by: UserId) -> PortResult<Room> {
        let record = sqlx::query_as::<_, RoomRecord>(
            "INSERT INTO rooms (id, name, created_by) VALUES ($1, $2, $3) RETURNING id, name, created_by, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_room(&self, room_id: RoomId) -> PortResult<Room> {
        let record = sqlx::query_as::<_, RoomRecord>(
            "SELECT id, name, created_by, created_at FROM rooms WHERE id = $1",
        )
        .bind(room_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("Room {} not found", room_id)))?;
        Ok(record.to_domain())
    }

    async fn rename_room(&self, room_id: RoomId, name: &str) -> PortResult<Room> {
        let record = sqlx::query_as::<_, RoomRecord>(
            "UPDATE rooms SET name = $1 WHERE id = $2 RETURNING id, name, created_by, created_at",
        )
        .bind(name)
        .bind(room_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("Room {} not found", room_id)))?;
        Ok(record.to_domain())
    }

    // --- Tasks ---

    async fn list_tasks(&self, room_id: RoomId) -> PortResult<Vec<Task>> {
        let records = sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE room_id = $1 ORDER BY due_date ASC NULLS LAST, created_at ASC"
        ))
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_task(&self, task_id: Uuid) -> PortResult<Task> {
        let record = sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(task_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("Task {} not found", task_id)))?;
        Ok(record.to_domain())
    }

    async fn create_task(&self, task: NewTask) -> PortResult<Task> {
        let record = sqlx::query_as::<_, TaskRecord>(&format!(
            "INSERT INTO tasks (id, room_id, assigned_user_id, title, due_date, aura_points, priority, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {TASK_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(task.room_id)
        .bind(task.assigned_user_id)
        .bind(&task.title)
        .bind(task.due_date)
        .bind(task.aura_points)
        .bind(task.priority.as_str())
        .bind(&task.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_task(&self, task_id: Uuid, update: TaskUpdate) -> PortResult<Task> {
        let mut task = self.get_task(task_id).await?;
        update.apply_to(&mut task);

        let record = sqlx::query_as::<_, TaskRecord>(&format!(
            "UPDATE tasks SET assigned_user_id = $1, title = $2, due_date = $3, completed = $4, \
             completed_at = $5, aura_points = $6, priority = $7, notes = $8 \
             WHERE id = $9 RETURNING {TASK_COLUMNS}"
        ))
        .bind(task.assigned_user_id)
        .bind(&task.title)
        .bind(task.due_date)
        .bind(task.completed)
        .bind(task.completed_at)
        .bind(task.aura_points)
        .bind(task.priority.as_str())
        .bind(&task.notes)
        .bind(task_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("Task {} not found", task_id)))?;
        Ok(record.to_domain())
    }

    async fn delete_task(&self, task_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Task {} not found", task_id)));
        }
        Ok(())
    }

    // --- Laundry ---

    async fn get_laundry(&self, room_id: RoomId) -> PortResult<LaundryState> {
        let record = sqlx::query_as::<_, LaundryRecord>(&format!(
            "SELECT {LAUNDRY_COLUMNS} FROM laundry WHERE room_id = $1"
        ))
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record
            .map(LaundryRecord::to_domain)
            .unwrap_or_else(|| LaundryState::empty(room_id)))
    }

    async fn upsert_laundry(&self, room_id: RoomId, update: LaundryUpdate) -> PortResult<LaundryState> {
        let mut state = self.get_laundry(room_id).await?;
        update.apply_to(&mut state);
        debug!("Writing laundry state for room {}", room_id);

        let record = sqlx::query_as::<_, LaundryRecord>(&format!(
            "INSERT INTO laundry (room_id, washer_user_id, dryer_user_id, washer_timer_end, dryer_timer_end, updated_at) \
             VALUES ($1, $2, $3, $4, $5, now()) \
             ON CONFLICT (room_id) DO UPDATE SET washer_user_id = EXCLUDED.washer_user_id, \
             dryer_user_id = EXCLUDED.dryer_user_id, washer_timer_end = EXCLUDED.washer_timer_end, \
             dryer_timer_end = EXCLUDED.dryer_timer_end, updated_at = now() \
             RETURNING {LAUNDRY_COLUMNS}"
        ))
        .bind(room_id)
        .bind(state.washer_user_id)
        .bind(state.dryer_user_id)
        .bind(state.washer_timer_end)
        .bind(state.dryer_timer_end)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    // --- Bookings ---

    async fn list_bookings(&self, room_id: RoomId) -> PortResult<Vec<Booking>> {
        let records = sqlx::query_as::<_, BookingRecord>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE room_id = $1 ORDER BY start_at ASC"
        ))
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_booking(&self, booking_id: Uuid) -> PortResult<Booking> {
        let record = sqlx::query_as::<_, BookingRecord>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(booking_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("Booking {} not found", booking_id)))?;
        Ok(record.to_domain())
    }

    async fn create_booking(&self, booking: NewBooking) -> PortResult<Booking> {
        let record = sqlx::query_as::<_, BookingRecord>(&format!(
            "INSERT INTO bookings (id, room_id, machine, user_id, start_at, end_at, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(booking.room_id)
        .bind(booking.machine.trim())
        .bind(booking.user_id)
        .bind(booking.start)
        .bind(booking.end)
        .bind(&booking.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(EXCLUSION_VIOLATION) => {
                PortError::Conflict(format!(
                    "{} is already booked during that time",
                    booking.machine.trim()
                ))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn delete_booking(&self, booking_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(booking_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Booking {} not found", booking_id)));
        }
        Ok(())
    }

    // --- Ledger ---

    async fn list_expenses(&self, room_id: RoomId) -> PortResult<Vec<Expense>> {
        let records = sqlx::query_as::<_, ExpenseRecord>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE room_id = $1 ORDER BY created_at ASC"
        ))
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_expense(&self, expense_id: Uuid) -> PortResult<Expense> {
        let record = sqlx::query_as::<_, ExpenseRecord>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1"
        ))
        .bind(expense_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("Expense {} not found", expense_id)))?;
        Ok(record.to_domain())
    }

    async fn save_expense(&self, expense: Expense) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO expenses (id, room_id, payer_id, description, amount, currency, split, shares, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(expense.id)
        .bind(expense.room_id)
        .bind(expense.payer_id)
        .bind(&expense.description)
        .bind(expense.amount)
        .bind(&expense.currency)
        .bind(Json(&expense.split))
        .bind(Json(&expense.shares))
        .bind(expense.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn delete_expense(&self, expense_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(expense_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Expense {} not found", expense_id)));
        }
        Ok(())
    }

    async fn list_payments(&self, room_id: RoomId) -> PortResult<Vec<Payment>> {
        let records = sqlx::query_as::<_, PaymentRecord>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE room_id = $1 ORDER BY created_at ASC"
        ))
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn save_payment(&self, payment: Payment) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO payments (id, room_id, from_user_id, to_user_id, amount, method, expense_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(payment.id)
        .bind(payment.room_id)
        .bind(payment.from_user_id)
        .bind(payment.to_user_id)
        .bind(payment.amount)
        .bind(&payment.method)
        .bind(payment.expense_id)
        .bind(payment.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    // --- Schedules ---

    async fn get_schedule(&self, user_id: UserId) -> PortResult<Schedule> {
        let record = sqlx::query_as::<_, ScheduleRecord>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("No schedule saved for user {}", user_id)))?;
        Ok(record.to_domain())
    }

    async fn upsert_schedule(&self, schedule: Schedule) -> PortResult<Schedule> {
        let record = sqlx::query_as::<_, ScheduleRecord>(&format!(
            "INSERT INTO schedules (user_id, room_id, user_name, preferences, slots, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id) DO UPDATE SET room_id = EXCLUDED.room_id, user_name = EXCLUDED.user_name, \
             preferences = EXCLUDED.preferences, slots = EXCLUDED.slots, updated_at = EXCLUDED.updated_at \
             RETURNING {SCHEDULE_COLUMNS}"
        ))
        .bind(schedule.user_id)
        .bind(schedule.room_id)
        .bind(&schedule.user_name)
        .bind(&schedule.preferences)
        .bind(Json(&schedule.slots))
        .bind(schedule.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_room_schedules(&self, room_id: RoomId) -> PortResult<Vec<Schedule>> {
        let records = sqlx::query_as::<_, ScheduleRecord>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE room_id = $1 ORDER BY user_name ASC"
        ))
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
