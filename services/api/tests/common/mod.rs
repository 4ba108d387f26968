#![allow(dead_code)]

use api_lib::web::{laundry_task::LaundryTimers, router, state::AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use dormduty_core::{
    booking,
    domain::{
        AuraEvent, Booking, Expense, Identity, LaundryState, LaundryUpdate, NewBooking, NewTask,
        Payment, Room, RoomId, Schedule, Task, TaskUpdate, User, UserId,
    },
    ports::{
        DatabaseService, IdentityProvider, PortError, PortResult, Registration,
        ScheduleOptimizerService,
    },
};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};
use tower::ServiceExt;
use uuid::Uuid;

//=========================================================================================
// In-memory DatabaseService
//=========================================================================================

#[derive(Default)]
struct Store {
    users: Vec<User>,
    rooms: Vec<Room>,
    aura_events: Vec<AuraEvent>,
    tasks: Vec<Task>,
    laundry: HashMap<RoomId, LaundryState>,
    bookings: Vec<Booking>,
    expenses: Vec<Expense>,
    payments: Vec<Payment>,
    schedules: Vec<Schedule>,
}

/// A `DatabaseService` backed by plain vectors, mirroring the Postgres adapter's rules.
#[derive(Default)]
pub struct InMemoryDb {
    store: Mutex<Store>,
}

impl InMemoryDb {
    pub fn user(&self, user_id: UserId) -> User {
        self.store
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .expect("user exists")
    }

    pub fn user_count(&self) -> usize {
        self.store.lock().unwrap().users.len()
    }

    pub fn laundry(&self, room_id: RoomId) -> LaundryState {
        self.store
            .lock()
            .unwrap()
            .laundry
            .get(&room_id)
            .cloned()
            .unwrap_or_else(|| LaundryState::empty(room_id))
    }

    pub fn aura_events(&self, user_id: UserId) -> Vec<AuraEvent> {
        self.store
            .lock()
            .unwrap()
            .aura_events
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }
}

fn not_found(what: &str, id: Uuid) -> PortError {
    PortError::NotFound(format!("{} {} not found", what, id))
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn get_user(&self, user_id: UserId) -> PortResult<User> {
        let store = self.store.lock().unwrap();
        store
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| not_found("User", user_id))
    }

    async fn register_user(&self, user_id: UserId, email: &str, name: &str) -> PortResult<Registration> {
        let mut store = self.store.lock().unwrap();
        if let Some(existing) = store.users.iter().find(|u| u.id == user_id) {
            return Ok(Registration {
                user: existing.clone(),
                created: false,
            });
        }
        let user = User {
            id: user_id,
            name: name.to_string(),
            email: email.to_string(),
            aura: 0,
            room_id: None,
            created_at: Utc::now(),
        };
        store.users.push(user.clone());
        Ok(Registration { user, created: true })
    }

    async fn adjust_aura(&self, user_id: UserId, change: i32, reason: &str) -> PortResult<User> {
        let mut store = self.store.lock().unwrap();
        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| not_found("User", user_id))?;
        user.aura += change;
        let user = user.clone();
        store.aura_events.push(AuraEvent {
            id: Uuid::new_v4(),
            user_id,
            change,
            reason: reason.to_string(),
            created_at: Utc::now(),
        });
        Ok(user)
    }

    async fn list_aura_events(&self, user_id: UserId) -> PortResult<Vec<AuraEvent>> {
        Ok(self.aura_events(user_id).into_iter().rev().collect())
    }

    async fn set_user_room(&self, user_id: UserId, room_id: Option<RoomId>) -> PortResult<User> {
        let mut store = self.store.lock().unwrap();
        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| not_found("User", user_id))?;
        user.room_id = room_id;
        Ok(user.clone())
    }

    async fn list_room_members(&self, room_id: RoomId) -> PortResult<Vec<User>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .users
            .iter()
            .filter(|u| u.room_id == Some(room_id))
            .cloned()
            .collect())
    }

    async fn leaderboard(&self, room_id: RoomId, limit: u32, offset: u64) -> PortResult<(Vec<User>, u64)> {
        let mut members = self.list_room_members(room_id).await?;
        members.sort_by(|a, b| b.aura.cmp(&a.aura).then_with(|| a.name.cmp(&b.name)));
        let total = members.len() as u64;
        let page = members
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn create_room(&self, name: &str, created_by: UserId) -> PortResult<Room> {
        let room = Room {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_by,
            created_at: Utc::now(),
        };
        self.store.lock().unwrap().rooms.push(room.clone());
        Ok(room)
    }

    async fn get_room(&self, room_id: RoomId) -> PortResult<Room> {
        let store = self.store.lock().unwrap();
        store
            .rooms
            .iter()
            .find(|r| r.id == room_id)
            .cloned()
            .ok_or_else(|| not_found("Room", room_id))
    }

    async fn rename_room(&self, room_id: RoomId, name: &str) -> PortResult<Room> {
        let mut store = self.store.lock().unwrap();
        let room = store
            .rooms
            .iter_mut()
            .find(|r| r.id == room_id)
            .ok_or_else(|| not_found("Room", room_id))?;
        room.name = name.to_string();
        Ok(room.clone())
    }

    async fn list_tasks(&self, room_id: RoomId) -> PortResult<Vec<Task>> {
        let store = self.store.lock().unwrap();
        Ok(store.tasks.iter().filter(|t| t.room_id == room_id).cloned().collect())
    }

    async fn get_task(&self, task_id: Uuid) -> PortResult<Task> {
        let store = self.store.lock().unwrap();
        store
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
            .ok_or_else(|| not_found("Task", task_id))
    }

    async fn create_task(&self, task: NewTask) -> PortResult<Task> {
        let task = Task {
            id: Uuid::new_v4(),
            room_id: task.room_id,
            assigned_user_id: task.assigned_user_id,
            title: task.title,
            due_date: task.due_date,
            completed: false,
            completed_at: None,
            aura_points: task.aura_points,
            priority: task.priority,
            notes: task.notes,
            created_at: Utc::now(),
        };
        self.store.lock().unwrap().tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, task_id: Uuid, update: TaskUpdate) -> PortResult<Task> {
        let mut store = self.store.lock().unwrap();
        let task = store
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| not_found("Task", task_id))?;
        update.apply_to(task);
        Ok(task.clone())
    }

    async fn delete_task(&self, task_id: Uuid) -> PortResult<()> {
        let mut store = self.store.lock().unwrap();
        let before = store.tasks.len();
        store.tasks.retain(|t| t.id != task_id);
        if store.tasks.len() == before {
            return Err(not_found("Task", task_id));
        }
        Ok(())
    }

    async fn get_laundry(&self, room_id: RoomId) -> PortResult<LaundryState> {
        Ok(self.laundry(room_id))
    }

    async fn upsert_laundry(&self, room_id: RoomId, update: LaundryUpdate) -> PortResult<LaundryState> {
        let mut store = self.store.lock().unwrap();
        let state = store
            .laundry
            .entry(room_id)
            .or_insert_with(|| LaundryState::empty(room_id));
        update.apply_to(state);
        state.updated_at = Some(Utc::now());
        Ok(state.clone())
    }

    async fn list_bookings(&self, room_id: RoomId) -> PortResult<Vec<Booking>> {
        let store = self.store.lock().unwrap();
        let mut bookings: Vec<Booking> = store
            .bookings
            .iter()
            .filter(|b| b.room_id == room_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.start);
        Ok(bookings)
    }

    async fn get_booking(&self, booking_id: Uuid) -> PortResult<Booking> {
        let store = self.store.lock().unwrap();
        store
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .cloned()
            .ok_or_else(|| not_found("Booking", booking_id))
    }

    async fn create_booking(&self, new: NewBooking) -> PortResult<Booking> {
        let mut store = self.store.lock().unwrap();
        let same_room: Vec<Booking> = store
            .bookings
            .iter()
            .filter(|b| b.room_id == new.room_id)
            .cloned()
            .collect();
        if booking::has_conflict(&new, &same_room) {
            return Err(PortError::Conflict(format!("{} is already booked", new.machine)));
        }
        let created = Booking {
            id: Uuid::new_v4(),
            room_id: new.room_id,
            machine: new.machine,
            user_id: new.user_id,
            start: new.start,
            end: new.end,
            notes: new.notes,
            created_at: Utc::now(),
        };
        store.bookings.push(created.clone());
        Ok(created)
    }

    async fn delete_booking(&self, booking_id: Uuid) -> PortResult<()> {
        let mut store = self.store.lock().unwrap();
        let before = store.bookings.len();
        store.bookings.retain(|b| b.id != booking_id);
        if store.bookings.len() == before {
            return Err(not_found("Booking", booking_id));
        }
        Ok(())
    }

    async fn list_expenses(&self, room_id: RoomId) -> PortResult<Vec<Expense>> {
        let store = self.store.lock().unwrap();
        Ok(store.expenses.iter().filter(|e| e.room_id == room_id).cloned().collect())
    }

    async fn get_expense(&self, expense_id: Uuid) -> PortResult<Expense> {
        let store = self.store.lock().unwrap();
        store
            .expenses
            .iter()
            .find(|e| e.id == expense_id)
            .cloned()
            .ok_or_else(|| not_found("Expense", expense_id))
    }

    async fn save_expense(&self, expense: Expense) -> PortResult<()> {
        self.store.lock().unwrap().expenses.push(expense);
        Ok(())
    }

    async fn delete_expense(&self, expense_id: Uuid) -> PortResult<()> {
        let mut store = self.store.lock().unwrap();
        let before = store.expenses.len();
        store.expenses.retain(|e| e.id != expense_id);
        if store.expenses.len() == before {
            return Err(not_found("Expense", expense_id));
        }
        for payment in store.payments.iter_mut() {
            if payment.expense_id == Some(expense_id) {
                payment.expense_id = None;
            }
        }
        Ok(())
    }

    async fn list_payments(&self, room_id: RoomId) -> PortResult<Vec<Payment>> {
        let store = self.store.lock().unwrap();
        Ok(store.payments.iter().filter(|p| p.room_id == room_id).cloned().collect())
    }

    async fn save_payment(&self, payment: Payment) -> PortResult<()> {
        self.store.lock().unwrap().payments.push(payment);
        Ok(())
    }

    async fn get_schedule(&self, user_id: UserId) -> PortResult<Schedule> {
        let store = self.store.lock().unwrap();
        store
            .schedules
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("No schedule saved for user {}", user_id)))
    }

    async fn upsert_schedule(&self, schedule: Schedule) -> PortResult<Schedule> {
        let mut store = self.store.lock().unwrap();
        store.schedules.retain(|s| s.user_id != schedule.user_id);
        store.schedules.push(schedule.clone());
        Ok(schedule)
    }

    async fn list_room_schedules(&self, room_id: RoomId) -> PortResult<Vec<Schedule>> {
        let store = self.store.lock().unwrap();
        let mut schedules: Vec<Schedule> = store
            .schedules
            .iter()
            .filter(|s| s.room_id == room_id)
            .cloned()
            .collect();
        schedules.sort_by(|a, b| a.user_name.cmp(&b.user_name));
        Ok(schedules)
    }
}

//=========================================================================================
// Static IdentityProvider
//=========================================================================================

/// Accepts tokens of the form `user:<uuid>`.
pub struct StaticIdentity;

pub fn token_for(user_id: UserId) -> String {
    format!("user:{}", user_id)
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn verify_token(&self, token: &str) -> PortResult<Identity> {
        let user_id = token
            .strip_prefix("user:")
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or(PortError::Unauthorized)?;
        Ok(Identity {
            user_id,
            email: None,
        })
    }
}

//=========================================================================================
// Test application
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDb>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_optimizer(optimizer: Arc<dyn ScheduleOptimizerService>) -> Self {
        Self::build(Some(optimizer))
    }

    fn build(optimizer: Option<Arc<dyn ScheduleOptimizerService>>) -> Self {
        let db = Arc::new(InMemoryDb::default());
        let state = Arc::new(AppState {
            db: db.clone(),
            identity: Arc::new(StaticIdentity),
            optimizer,
            // One timer second per millisecond keeps countdown tests fast.
            laundry_timers: LaundryTimers::new(db.clone(), Duration::from_millis(1)),
        });
        Self {
            router: router(state),
            db,
        }
    }

    /// Sends a request and returns the status and the JSON body (`Null` when empty).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Option<UserId>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(user_id)));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, user: UserId) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(user), None).await
    }

    pub async fn post(&self, uri: &str, user: UserId, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(user), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: UserId, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(user), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: UserId, body: Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, uri, Some(user), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: UserId) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, Some(user), None).await
    }

    /// Registers a new user through the API and returns their id.
    pub async fn register(&self, name: &str) -> UserId {
        let user_id = Uuid::new_v4();
        let (status, _) = self
            .post(
                "/api/registerUser",
                user_id,
                serde_json::json!({
                    "userId": user_id,
                    "email": format!("{}@dorm.test", name.to_lowercase()),
                    "name": name,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        user_id
    }

    /// Creates a room owned by `owner` and returns its id.
    pub async fn create_room(&self, owner: UserId, name: &str) -> RoomId {
        let (status, body) = self
            .post("/api/rooms", owner, serde_json::json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        Uuid::parse_str(body["id"].as_str().unwrap()).unwrap()
    }

    /// Moves `user` into `room_id`.
    pub async fn join(&self, user: UserId, room_id: RoomId) {
        let (status, body) = self
            .put(
                &format!("/api/user/{}/room", user),
                user,
                serde_json::json!({ "roomId": room_id }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    /// Registers `names`, puts them all in one room created by the first, and
    /// returns the room id with the user ids in the same order.
    pub async fn room_with(&self, names: &[&str]) -> (RoomId, Vec<UserId>) {
        let mut users = Vec::new();
        for name in names {
            users.push(self.register(name).await);
        }
        let room_id = self.create_room(users[0], "Suite 4B").await;
        for user in &users[1..] {
            self.join(*user, room_id).await;
        }
        (room_id, users)
    }
}

pub fn id_of(value: &Value) -> Uuid {
    Uuid::parse_str(value["id"].as_str().expect("id field")).expect("uuid")
}
