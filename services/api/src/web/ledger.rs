//! services/api/src/web/ledger.rs
//!
//! Shared expenses, payments and balances. The room is the splitting group.
//! Every write is validated by applying it to a `Ledger` snapshot rebuilt from
//! the stored records before anything is persisted.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use dormduty_core::{
    domain::{Expense, Identity, Payment, RoomId},
    ledger::{
        Balance, ExpenseDraft, Ledger, LedgerAction, PaymentDraft, Settlement, SplitStrategy,
    },
    membership::{ensure_member, resolve_room},
    ports::PortError,
};
use serde::{Deserialize, Serialize};
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

const DEFAULT_CURRENCY: &str = "USD";

//=========================================================================================
// Request and Response Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    #[serde(default)]
    pub room_id: Option<Uuid>,
    pub description: String,
    /// Total in cents.
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    /// Defaults to the caller.
    #[serde(default)]
    pub payer_id: Option<Uuid>,
    /// Defaults to every member of the room, in join order.
    #[serde(default)]
    pub participants: Option<Vec<Uuid>>,
    #[serde(default = "equal_split")]
    pub split: SplitStrategy,
}

fn equal_split() -> SplitStrategy {
    SplitStrategy::Equal
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    #[serde(default)]
    pub room_id: Option<Uuid>,
    /// Defaults to the caller.
    #[serde(default)]
    pub from_user_id: Option<Uuid>,
    pub to_user_id: Uuid,
    /// Cents.
    pub amount: i64,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub expense_id: Option<Uuid>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalancesResponse {
    pub balances: Vec<Balance>,
    pub settlements: Vec<Settlement>,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Rebuilds the ledger of a room from the stored members, expenses and payments.
pub async fn load_ledger(state: &AppState, room_id: RoomId) -> Result<Ledger, PortError> {
    let members = state
        .db
        .list_room_members(room_id)
        .await?
        .into_iter()
        .map(|m| m.id)
        .collect();
    let expenses = state.db.list_expenses(room_id).await?;
    let payments = state.db.list_payments(room_id).await?;
    Ok(Ledger::from_parts(room_id, members, expenses, payments))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the expenses of a room.
#[utoipa::path(
    get,
    path = "/api/expenses",
    params(RoomQuery),
    responses(
        (status = 200, description = "Expenses of the room", body = [Expense]),
        (status = 403, description = "Not a member of the room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn list_expenses_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<RoomQuery>,
) -> Result<Json<Vec<Expense>>, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let room_id = resolve_room(&caller, query.room_id)?;
    Ok(Json(state.db.list_expenses(room_id).await?))
}

/// Record a shared expense and split it among the participants.
#[utoipa::path(
    post,
    path = "/api/expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense recorded with its computed shares", body = Expense),
        (status = 400, description = "Invalid split or participants", body = ErrorBody),
        (status = 403, description = "Not a member of the room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn create_expense_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateExpenseRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let room_id = resolve_room(&caller, req.room_id)?;
    let ledger = load_ledger(&state, room_id).await?;

    let participants = req
        .participants
        .unwrap_or_else(|| ledger.members().to_vec());
    let currency = req
        .currency
        .map(|c| c.trim().to_ascii_uppercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let next = ledger.apply(LedgerAction::AddExpense(ExpenseDraft {
        id: Uuid::new_v4(),
        payer_id: req.payer_id.unwrap_or(caller.id),
        description: req.description,
        amount: req.amount,
        currency,
        participants,
        split: req.split,
        created_at: Utc::now(),
    }))?;

    let expense = next
        .expenses()
        .last()
        .cloned()
        .ok_or_else(|| PortError::Unexpected("expense was not added to the ledger".to_string()))?;
    state.db.save_expense(expense.clone()).await?;
    info!(
        "Expense {} of {} cents split {} ways ({})",
        expense.id,
        expense.amount,
        expense.shares.len(),
        expense.split.kind()
    );
    Ok((StatusCode::CREATED, Json(expense)))
}

/// Delete an expense.
#[utoipa::path(
    delete,
    path = "/api/expenses/{id}",
    params(("id" = Uuid, Path, description = "The expense to delete")),
    responses(
        (status = 204, description = "Expense deleted"),
        (status = 403, description = "Expense belongs to another room", body = ErrorBody),
        (status = 404, description = "Unknown expense", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn delete_expense_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(expense_id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let expense = state.db.get_expense(expense_id).await?;
    ensure_member(&caller, expense.room_id)?;

    let ledger = load_ledger(&state, expense.room_id).await?;
    ledger.apply(LedgerAction::RemoveExpense(expense_id))?;
    state.db.delete_expense(expense_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the payments of a room.
#[utoipa::path(
    get,
    path = "/api/payments",
    params(RoomQuery),
    responses(
        (status = 200, description = "Payments of the room", body = [Payment]),
        (status = 403, description = "Not a member of the room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn list_payments_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<RoomQuery>,
) -> Result<Json<Vec<Payment>>, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let room_id = resolve_room(&caller, query.room_id)?;
    Ok(Json(state.db.list_payments(room_id).await?))
}

/// Record a settlement from one roommate to another.
#[utoipa::path(
    post,
    path = "/api/payments",
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = Payment),
        (status = 400, description = "Invalid amount or users", body = ErrorBody),
        (status = 403, description = "Not a member of the room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn create_payment_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<RecordPaymentRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let room_id = resolve_room(&caller, req.room_id)?;
    let ledger = load_ledger(&state, room_id).await?;

    let next = ledger.apply(LedgerAction::RecordPayment(PaymentDraft {
        id: Uuid::new_v4(),
        from_user_id: req.from_user_id.unwrap_or(caller.id),
        to_user_id: req.to_user_id,
        amount: req.amount,
        method: req.method,
        expense_id: req.expense_id,
        created_at: Utc::now(),
    }))?;

    let payment = next
        .payments()
        .last()
        .cloned()
        .ok_or_else(|| PortError::Unexpected("payment was not added to the ledger".to_string()))?;
    state.db.save_payment(payment.clone()).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Net balance per member plus a simplified list of transfers that settles them.
///
/// Positive balances are owed money. The settlement list comes from a greedy
/// heuristic and is not guaranteed to be the shortest possible.
#[utoipa::path(
    get,
    path = "/api/balances",
    params(RoomQuery),
    responses(
        (status = 200, description = "Balances and settlements", body = BalancesResponse),
        (status = 403, description = "Not a member of the room", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn balances_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<RoomQuery>,
) -> Result<Json<BalancesResponse>, HttpError> {
    let caller = load_caller(&state, &identity).await?;
    let room_id = resolve_room(&caller, query.room_id)?;
    let ledger = load_ledger(&state, room_id).await?;
    Ok(Json(BalancesResponse {
        balances: ledger.balances(),
        settlements: ledger.settlements(),
    }))
}
