//! Aura point rules for chore completion.
//!
//! On time (or no due date): the task's full `aura_points`. Late: half, rounded
//! down. Reopening a task takes back exactly what its completion gave.

use chrono::{DateTime, Utc};

use crate::domain::{Task, UserId};

pub const DEFAULT_TASK_AURA: i32 = 10;

/// A change to one user's aura balance caused by toggling a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuraChange {
    pub user_id: UserId,
    pub delta: i32,
    pub reason: String,
}

/// Points earned by completing `task` at `completed_at`.
pub fn completion_award(task: &Task, completed_at: DateTime<Utc>) -> i32 {
    match task.due_date {
        Some(due) if completed_at > due => task.aura_points / 2,
        _ => task.aura_points,
    }
}

/// The aura change caused by setting `task.completed` to `completed` at `now`.
/// `None` when nothing changes or nobody is assigned.
pub fn change_for_toggle(task: &Task, completed: bool, now: DateTime<Utc>) -> Option<AuraChange> {
    if task.completed == completed {
        return None;
    }
    let user_id = task.assigned_user_id?;
    let (delta, reason) = if completed {
        (completion_award(task, now), format!("completed '{}'", task.title))
    } else {
        let awarded_at = task.completed_at.unwrap_or(now);
        (-completion_award(task, awarded_at), format!("reopened '{}'", task.title))
    };
    if delta == 0 {
        return None;
    }
    Some(AuraChange {
        user_id,
        delta,
        reason,
    })
}
