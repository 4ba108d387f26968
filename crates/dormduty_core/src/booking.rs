//! Machine booking overlap validation.
//!
//! Windows are half-open: `[start, end)`. Two bookings conflict only when they
//! name the same machine and their windows intersect; touching endpoints are fine.

use chrono::{DateTime, Utc};

use crate::domain::{Booking, NewBooking};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("machine name must not be empty")]
    EmptyMachine,
    #[error("booking must end after it starts")]
    EmptyWindow,
}

/// `[s1, e1)` and `[s2, e2)` intersect.
pub fn overlaps(
    s1: DateTime<Utc>,
    e1: DateTime<Utc>,
    s2: DateTime<Utc>,
    e2: DateTime<Utc>,
) -> bool {
    s1 < e2 && s2 < e1
}

fn same_machine(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// The first existing booking that clashes with `candidate`, if any.
pub fn find_conflict<'a>(candidate: &NewBooking, existing: &'a [Booking]) -> Option<&'a Booking> {
    existing.iter().find(|b| {
        same_machine(&b.machine, &candidate.machine)
            && overlaps(candidate.start, candidate.end, b.start, b.end)
    })
}

pub fn has_conflict(candidate: &NewBooking, existing: &[Booking]) -> bool {
    find_conflict(candidate, existing).is_some()
}

/// Checks the booking on its own, before looking at other bookings.
pub fn validate(candidate: &NewBooking) -> Result<(), BookingError> {
    if candidate.machine.trim().is_empty() {
        return Err(BookingError::EmptyMachine);
    }
    if candidate.end <= candidate.start {
        return Err(BookingError::EmptyWindow);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
    }

    fn existing(machine: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            room_id: Uuid::nil(),
            machine: machine.into(),
            user_id: Uuid::new_v4(),
            start,
            end,
            notes: None,
            created_at: start,
        }
    }

    fn candidate(machine: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> NewBooking {
        NewBooking {
            room_id: Uuid::nil(),
            machine: machine.into(),
            user_id: Uuid::new_v4(),
            start,
            end,
            notes: None,
        }
    }

    #[test]
    fn overlapping_windows_conflict() {
        let a = existing("Washer", at(10, 0), at(10, 45));
        let b = candidate("Washer", at(10, 30), at(11, 15));
        assert!(has_conflict(&b, &[a]));
    }

    #[test]
    fn touching_windows_do_not_conflict() {
        let a = existing("Washer", at(10, 0), at(10, 45));
        let c = candidate("Washer", at(10, 45), at(11, 30));
        assert!(!has_conflict(&c, &[a]));
    }

    #[test]
    fn other_machines_are_ignored() {
        let a = existing("Washer", at(10, 0), at(10, 45));
        let b = candidate("Dryer", at(10, 30), at(11, 15));
        assert!(!has_conflict(&b, &[a]));
    }

    #[test]
    fn machine_names_compare_loosely() {
        let a = existing("washer ", at(10, 0), at(10, 45));
        let b = candidate("WASHER", at(10, 10), at(10, 20));
        assert_eq!(find_conflict(&b, std::slice::from_ref(&a)), Some(&a));
    }

    #[test]
    fn enclosing_window_conflicts() {
        let a = existing("Washer", at(10, 0), at(10, 45));
        let b = candidate("Washer", at(9, 0), at(12, 0));
        assert!(has_conflict(&b, &[a]));
    }

    #[test]
    fn degenerate_windows_are_invalid() {
        assert_eq!(
            validate(&candidate("Washer", at(10, 0), at(10, 0))),
            Err(BookingError::EmptyWindow)
        );
        assert_eq!(
            validate(&candidate("  ", at(10, 0), at(11, 0))),
            Err(BookingError::EmptyMachine)
        );
        assert!(validate(&candidate("Washer", at(10, 0), at(11, 0))).is_ok());
    }
}
