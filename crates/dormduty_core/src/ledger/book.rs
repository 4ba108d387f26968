//! An immutable ledger snapshot driven by typed actions.
//!
//! `Ledger::apply` is a pure transition: it validates an action against the
//! current snapshot and returns the next one, leaving `self` untouched.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::balance::{balances, Balance};
use super::settle::{simplify, Settlement};
use super::split::{allocate, SplitError, SplitStrategy};
use crate::domain::{Expense, Payment, RoomId, UserId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error("{0} is not a member of this ledger")]
    NotMember(UserId),
    #[error("{0} is already a member of this ledger")]
    AlreadyMember(UserId),
    #[error("{0} still has an outstanding balance of {1}")]
    OutstandingBalance(UserId, i64),
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error("a payment needs two different users")]
    SelfPayment,
    #[error("expense {0} not found")]
    UnknownExpense(Uuid),
    #[error("payment {0} not found")]
    UnknownPayment(Uuid),
    #[error("description must not be empty")]
    EmptyDescription,
}

/// Everything needed to record a new expense; the split is computed on apply.
#[derive(Debug, Clone)]
pub struct ExpenseDraft {
    pub id: Uuid,
    pub payer_id: UserId,
    pub description: String,
    pub amount: i64,
    pub currency: String,
    pub participants: Vec<UserId>,
    pub split: SplitStrategy,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PaymentDraft {
    pub id: Uuid,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub amount: i64,
    pub method: Option<String>,
    pub expense_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum LedgerAction {
    AddMember(UserId),
    RemoveMember(UserId),
    AddExpense(ExpenseDraft),
    RemoveExpense(Uuid),
    RecordPayment(PaymentDraft),
    RemovePayment(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    room_id: RoomId,
    members: Vec<UserId>,
    expenses: Vec<Expense>,
    payments: Vec<Payment>,
}

impl Ledger {
    pub fn new(room_id: RoomId, members: Vec<UserId>) -> Self {
        Self {
            room_id,
            members,
            expenses: Vec::new(),
            payments: Vec::new(),
        }
    }

    /// Rebuilds a snapshot from stored records without re-validating them.
    pub fn from_parts(
        room_id: RoomId,
        members: Vec<UserId>,
        expenses: Vec<Expense>,
        payments: Vec<Payment>,
    ) -> Self {
        Self {
            room_id,
            members,
            expenses,
            payments,
        }
    }

    pub fn members(&self) -> &[UserId] {
        &self.members
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn balances(&self) -> Vec<Balance> {
        balances(&self.expenses, &self.payments, &self.members)
    }

    pub fn settlements(&self) -> Vec<Settlement> {
        simplify(&self.balances())
    }

    fn balance_of(&self, user_id: UserId) -> i64 {
        self.balances()
            .iter()
            .find(|b| b.user_id == user_id)
            .map(|b| b.amount)
            .unwrap_or(0)
    }

    fn require_member(&self, user_id: UserId) -> Result<(), LedgerError> {
        if self.members.contains(&user_id) {
            Ok(())
        } else {
            Err(LedgerError::NotMember(user_id))
        }
    }

    /// Returns the snapshot that results from `action`.
    pub fn apply(&self, action: LedgerAction) -> Result<Ledger, LedgerError> {
        let mut next = self.clone();
        match action {
            LedgerAction::AddMember(user_id) => {
                if self.members.contains(&user_id) {
                    return Err(LedgerError::AlreadyMember(user_id));
                }
                next.members.push(user_id);
            }
            LedgerAction::RemoveMember(user_id) => {
                self.require_member(user_id)?;
                let outstanding = self.balance_of(user_id);
                if outstanding != 0 {
                    return Err(LedgerError::OutstandingBalance(user_id, outstanding));
                }
                next.members.retain(|m| *m != user_id);
            }
            LedgerAction::AddExpense(draft) => {
                if draft.description.trim().is_empty() {
                    return Err(LedgerError::EmptyDescription);
                }
                self.require_member(draft.payer_id)?;
                for participant in &draft.participants {
                    self.require_member(*participant)?;
                }
                let shares = allocate(draft.amount, &draft.participants, &draft.split)?;
                next.expenses.push(Expense {
                    id: draft.id,
                    room_id: self.room_id,
                    payer_id: draft.payer_id,
                    description: draft.description.trim().to_string(),
                    amount: draft.amount,
                    currency: draft.currency,
                    split: draft.split,
                    shares,
                    created_at: draft.created_at,
                });
            }
            LedgerAction::RemoveExpense(expense_id) => {
                if !self.expenses.iter().any(|e| e.id == expense_id) {
                    return Err(LedgerError::UnknownExpense(expense_id));
                }
                next.expenses.retain(|e| e.id != expense_id);
            }
            LedgerAction::RecordPayment(draft) => {
                if draft.amount <= 0 {
                    return Err(LedgerError::NonPositiveAmount);
                }
                if draft.from_user_id == draft.to_user_id {
                    return Err(LedgerError::SelfPayment);
                }
                self.require_member(draft.from_user_id)?;
                self.require_member(draft.to_user_id)?;
                if let Some(expense_id) = draft.expense_id {
                    if !self.expenses.iter().any(|e| e.id == expense_id) {
                        return Err(LedgerError::UnknownExpense(expense_id));
                    }
                }
                next.payments.push(Payment {
                    id: draft.id,
                    room_id: self.room_id,
                    from_user_id: draft.from_user_id,
                    to_user_id: draft.to_user_id,
                    amount: draft.amount,
                    method: draft.method,
                    expense_id: draft.expense_id,
                    created_at: draft.created_at,
                });
            }
            LedgerAction::RemovePayment(payment_id) => {
                if !self.payments.iter().any(|p| p.id == payment_id) {
                    return Err(LedgerError::UnknownPayment(payment_id));
                }
                next.payments.retain(|p| p.id != payment_id);
            }
        }
        Ok(next)
    }
}
