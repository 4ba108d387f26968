//! Split-type allocator.
//!
//! Divides a total (in minor currency units) among an ordered participant list.
//! Every strategy reconciles its rounding residual onto the last participant so
//! the resulting [`Allocation`] always sums to the total exactly.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::domain::UserId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SplitError {
    #[error("an expense needs at least one participant")]
    NoParticipants,
    #[error("participant {0} is listed more than once")]
    DuplicateParticipant(UserId),
    #[error("{0} is not a participant of this expense")]
    UnknownParticipant(UserId),
    #[error("share counts add up to zero")]
    ZeroShares,
    #[error("line item '{0}' has no participants")]
    EmptyItem(String),
    #[error("percentage for {0} must be a finite number")]
    InvalidPercentage(UserId),
}

/// A fixed amount owed by one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Share {
    pub user_id: Uuid,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PercentageShare {
    pub user_id: Uuid,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ShareCount {
    pub user_id: Uuid,
    pub shares: u32,
}

/// One line of an itemized receipt, split equally among its own participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub amount: i64,
    pub participants: Vec<Uuid>,
}

/// How an expense is divided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SplitStrategy {
    Equal,
    SpecificAmount { amounts: Vec<Share> },
    Percentage { percentages: Vec<PercentageShare> },
    Shares { shares: Vec<ShareCount> },
    Itemized { items: Vec<LineItem> },
}

impl SplitStrategy {
    pub fn kind(&self) -> &'static str {
        match self {
            SplitStrategy::Equal => "equal",
            SplitStrategy::SpecificAmount { .. } => "specific_amount",
            SplitStrategy::Percentage { .. } => "percentage",
            SplitStrategy::Shares { .. } => "shares",
            SplitStrategy::Itemized { .. } => "itemized",
        }
    }
}

/// Per-participant owed amounts, in participant order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Allocation(Vec<Share>);

impl Allocation {
    pub fn get(&self, user_id: UserId) -> Option<i64> {
        self.0.iter().find(|s| s.user_id == user_id).map(|s| s.amount)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Share> {
        self.0.iter()
    }

    pub fn total(&self) -> i64 {
        self.0.iter().map(|s| s.amount).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn participants(&self) -> impl Iterator<Item = UserId> + '_ {
        self.0.iter().map(|s| s.user_id)
    }
}

impl From<Vec<Share>> for Allocation {
    fn from(shares: Vec<Share>) -> Self {
        Self(shares)
    }
}

/// Allocates `total` among `participants` according to `strategy`.
pub fn allocate(
    total: i64,
    participants: &[UserId],
    strategy: &SplitStrategy,
) -> Result<Allocation, SplitError> {
    if participants.is_empty() {
        return Err(SplitError::NoParticipants);
    }
    let mut seen = HashSet::with_capacity(participants.len());
    for id in participants {
        if !seen.insert(*id) {
            return Err(SplitError::DuplicateParticipant(*id));
        }
    }

    let amounts = match strategy {
        SplitStrategy::Equal => divide_equally(total, participants),
        SplitStrategy::SpecificAmount { amounts } => {
            let mut out = zeroed(participants);
            for share in amounts {
                *slot(&mut out, share.user_id)? += share.amount;
            }
            out
        }
        SplitStrategy::Percentage { percentages } => {
            let mut out = zeroed(participants);
            for p in percentages {
                if !p.percent.is_finite() {
                    return Err(SplitError::InvalidPercentage(p.user_id));
                }
                // f64 -> i64 saturates; realistic totals are far inside the range.
                let owed = (total as f64 * p.percent / 100.0).round() as i64;
                *slot(&mut out, p.user_id)? += owed;
            }
            out
        }
        SplitStrategy::Shares { shares } => {
            let count: u64 = shares.iter().map(|s| u64::from(s.shares)).sum();
            if count == 0 {
                return Err(SplitError::ZeroShares);
            }
            let mut out = zeroed(participants);
            for s in shares {
                let owed = div_round(i128::from(total) * i128::from(s.shares), i128::from(count));
                *slot(&mut out, s.user_id)? += owed as i64;
            }
            out
        }
        SplitStrategy::Itemized { items } => {
            let mut out = zeroed(participants);
            for item in items {
                if item.participants.is_empty() {
                    return Err(SplitError::EmptyItem(item.description.clone()));
                }
                for share in divide_equally(item.amount, &item.participants) {
                    *slot(&mut out, share.user_id)? += share.amount;
                }
            }
            out
        }
    };

    Ok(Allocation(reconcile(total, amounts)))
}

fn zeroed(participants: &[UserId]) -> Vec<Share> {
    participants
        .iter()
        .map(|id| Share { user_id: *id, amount: 0 })
        .collect()
}

fn slot(shares: &mut [Share], user_id: UserId) -> Result<&mut i64, SplitError> {
    shares
        .iter_mut()
        .find(|s| s.user_id == user_id)
        .map(|s| &mut s.amount)
        .ok_or(SplitError::UnknownParticipant(user_id))
}

/// Equal shares rounded to the cent, residual on the last participant.
fn divide_equally(total: i64, participants: &[UserId]) -> Vec<Share> {
    let n = participants.len() as i128;
    let each = div_round(i128::from(total), n) as i64;
    let shares = participants
        .iter()
        .map(|id| Share { user_id: *id, amount: each })
        .collect();
    reconcile(total, shares)
}

/// Moves whatever is needed onto the last share so the shares sum to `total`.
fn reconcile(total: i64, mut shares: Vec<Share>) -> Vec<Share> {
    let sum: i64 = shares.iter().map(|s| s.amount).sum();
    if let Some(last) = shares.last_mut() {
        last.amount += total - sum;
    }
    shares
}

/// Integer division rounding half away from zero. `den` must be positive.
fn div_round(num: i128, den: i128) -> i128 {
    let quotient = num / den;
    let remainder = num % den;
    if 2 * remainder.abs() >= den {
        quotient + num.signum()
    } else {
        quotient
    }
}
