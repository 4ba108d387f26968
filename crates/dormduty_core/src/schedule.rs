//! Weekly chore scheduling.
//!
//! The generative model is asked for assignments in JSON. Its reply is scanned
//! with a streaming `serde_json` deserializer for the first value that has the
//! assignment shape, so prose, code fences and trailing commentary around the
//! payload are tolerated. When anything goes wrong the deterministic
//! round-robin assignment is used instead.

use chrono::{NaiveTime, Weekday};
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{AssignmentSource, OptimizedSchedule, Schedule, ScheduleAssignment, Task, TimeSlot};
use crate::ports::ScheduleOptimizerService;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("no assignment payload found in model output")]
    NoPayload,
    #[error("model referenced unknown task {0}")]
    UnknownTask(Uuid),
    #[error("model referenced unknown user {0}")]
    UnknownUser(Uuid),
    #[error("model returned no assignments")]
    Empty,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    Wrapped { assignments: Vec<RawAssignment> },
    Bare(Vec<RawAssignment>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAssignment {
    #[serde(alias = "task_id")]
    task_id: Uuid,
    #[serde(alias = "user_id")]
    user_id: Uuid,
    day: Weekday,
    start: NaiveTime,
    end: NaiveTime,
}

/// Every complete JSON object or array embedded in `text`, in order of position.
fn json_candidates(text: &str) -> impl Iterator<Item = Value> + '_ {
    text.char_indices()
        .filter(|(_, c)| *c == '{' || *c == '[')
        .filter_map(move |(i, _)| {
            serde_json::Deserializer::from_str(&text[i..])
                .into_iter::<Value>()
                .next()
                .and_then(Result::ok)
        })
}

/// Parses model output into assignments, resolving names from the inputs.
pub fn parse_assignments(
    text: &str,
    schedules: &[Schedule],
    tasks: &[Task],
) -> Result<Vec<ScheduleAssignment>, ScheduleError> {
    let raw = json_candidates(text)
        .find_map(|value| match serde_json::from_value::<Payload>(value) {
            Ok(Payload::Wrapped { assignments }) | Ok(Payload::Bare(assignments)) => Some(assignments),
            Err(_) => None,
        })
        .ok_or(ScheduleError::NoPayload)?;

    if raw.is_empty() {
        return Err(ScheduleError::Empty);
    }

    raw.into_iter()
        .map(|a| {
            let task = tasks
                .iter()
                .find(|t| t.id == a.task_id)
                .ok_or(ScheduleError::UnknownTask(a.task_id))?;
            let schedule = schedules
                .iter()
                .find(|s| s.user_id == a.user_id)
                .ok_or(ScheduleError::UnknownUser(a.user_id))?;
            Ok(ScheduleAssignment {
                task_id: task.id,
                task_title: task.title.clone(),
                user_id: schedule.user_id,
                user_name: schedule.user_name.clone(),
                day: a.day,
                start: a.start,
                end: a.end,
            })
        })
        .collect()
}

fn free_slots(schedule: &Schedule) -> VecDeque<&TimeSlot> {
    let mut free: Vec<&TimeSlot> = schedule.slots.iter().filter(|s| !s.busy).collect();
    free.sort_by_key(|s| (s.day.num_days_from_monday(), s.start));
    free.into()
}

/// Cycles through users, giving each task the next user's earliest unused
/// free slot. Users without free slots are skipped; tasks left over once every
/// slot is used stay unassigned.
pub fn round_robin(schedules: &[Schedule], tasks: &[Task]) -> Vec<ScheduleAssignment> {
    let mut queues: Vec<(&Schedule, VecDeque<&TimeSlot>)> = schedules
        .iter()
        .map(|s| (s, free_slots(s)))
        .filter(|(_, slots)| !slots.is_empty())
        .collect();

    let mut assignments = Vec::new();
    let mut next = 0;
    for task in tasks.iter().filter(|t| !t.completed) {
        let n = queues.len();
        let picked = (0..n).find_map(|offset| {
            let idx = (next + offset) % n;
            let (schedule, slots) = &mut queues[idx];
            slots.pop_front().map(|slot| (idx, *schedule, slot))
        });
        let Some((idx, schedule, slot)) = picked else {
            break;
        };
        next = idx + 1;
        assignments.push(ScheduleAssignment {
            task_id: task.id,
            task_title: task.title.clone(),
            user_id: schedule.user_id,
            user_name: schedule.user_name.clone(),
            day: slot.day,
            start: slot.start,
            end: slot.end,
        });
    }
    assignments
}

/// Asks the optimizer for assignments and falls back to [`round_robin`] on any failure.
pub async fn optimize(
    optimizer: Option<&dyn ScheduleOptimizerService>,
    schedules: &[Schedule],
    tasks: &[Task],
) -> OptimizedSchedule {
    let open: Vec<Task> = tasks.iter().filter(|t| !t.completed).cloned().collect();

    match optimizer {
        Some(optimizer) if !open.is_empty() && !schedules.is_empty() => {
            match optimizer.suggest_assignments(schedules, &open).await {
                Ok(text) => match parse_assignments(&text, schedules, &open) {
                    Ok(assignments) => {
                        info!("Optimizer produced {} assignments.", assignments.len());
                        return OptimizedSchedule {
                            assignments,
                            source: AssignmentSource::Ai,
                        };
                    }
                    Err(e) => warn!("Discarding optimizer output: {}", e),
                },
                Err(e) => warn!("Optimizer request failed: {}", e),
            }
        }
        Some(_) => info!("Nothing to optimize; using round-robin."),
        None => info!("No optimizer configured; using round-robin."),
    }

    OptimizedSchedule {
        assignments: round_robin(schedules, &open),
        source: AssignmentSource::Fallback,
    }
}
