//! Countdown timer state machine used for laundry machines.
//!
//! `Idle -> Running -> {Paused, Completed}`, `Paused -> Running`, and
//! `Completed -> Running` on restart. Time is counted in whole seconds and
//! advanced by the owner calling [`CountdownTimer::tick`] once per second.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub duration_secs: u64,
    pub remaining_secs: u64,
    pub status: TimerStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownTimer {
    duration: u64,
    remaining: u64,
    status: TimerStatus,
}

impl CountdownTimer {
    pub fn new(duration_secs: u64) -> Self {
        Self {
            duration: duration_secs,
            remaining: duration_secs,
            status: TimerStatus::Idle,
        }
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            duration_secs: self.duration,
            remaining_secs: self.remaining,
            status: self.status,
        }
    }

    /// Starts or resumes. A timer sitting at zero restarts from the full duration.
    pub fn start(&mut self) {
        if self.status == TimerStatus::Running {
            return;
        }
        if self.remaining == 0 {
            self.remaining = self.duration;
        }
        self.status = TimerStatus::Running;
    }

    pub fn pause(&mut self) {
        if self.status == TimerStatus::Running {
            self.status = TimerStatus::Paused;
        }
    }

    /// Back to the full duration, stopped.
    pub fn reset(&mut self) {
        self.remaining = self.duration;
        self.status = TimerStatus::Idle;
    }

    /// Extends both the remaining time and the total duration. A completed
    /// timer becomes paused with the extra time left on it.
    pub fn add_time(&mut self, secs: u64) {
        self.remaining = self.remaining.saturating_add(secs);
        self.duration = self.duration.saturating_add(secs);
        if self.status == TimerStatus::Completed && self.remaining > 0 {
            self.status = TimerStatus::Paused;
        }
    }

    /// Forces completion. Fires at most once per run.
    pub fn finish_now(&mut self) -> Option<TimerEvent> {
        if self.status == TimerStatus::Completed {
            return None;
        }
        self.remaining = 0;
        self.status = TimerStatus::Completed;
        Some(TimerEvent::Completed)
    }

    /// Advances one second. Returns the completion event on the tick that hits zero.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if self.status != TimerStatus::Running {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.status = TimerStatus::Completed;
            return Some(TimerEvent::Completed);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_minute_timer_completes_exactly_once() {
        let mut timer = CountdownTimer::new(300);
        timer.start();
        let fired = (0..300).filter_map(|_| timer.tick()).count();
        assert_eq!(fired, 1);
        assert_eq!(timer.remaining(), 0);
        assert_eq!(timer.status(), TimerStatus::Completed);
        assert_eq!(timer.tick(), None);
    }

    #[test]
    fn add_time_extends_remaining_and_total() {
        let mut timer = CountdownTimer::new(300);
        timer.start();
        for _ in 0..100 {
            timer.tick();
        }
        timer.add_time(300);
        assert_eq!(timer.remaining(), 500);
        assert_eq!(timer.duration(), 600);
        assert!(timer.is_running());
    }

    #[test]
    fn paused_timer_does_not_tick() {
        let mut timer = CountdownTimer::new(10);
        timer.start();
        timer.tick();
        timer.pause();
        assert_eq!(timer.tick(), None);
        assert_eq!(timer.remaining(), 9);
        timer.start();
        assert_eq!(timer.status(), TimerStatus::Running);
    }

    #[test]
    fn idle_timer_does_not_tick() {
        let mut timer = CountdownTimer::new(10);
        assert_eq!(timer.tick(), None);
        assert_eq!(timer.status(), TimerStatus::Idle);
    }

    #[test]
    fn finish_now_fires_once() {
        let mut timer = CountdownTimer::new(60);
        timer.start();
        assert_eq!(timer.finish_now(), Some(TimerEvent::Completed));
        assert_eq!(timer.finish_now(), None);
        assert_eq!(timer.remaining(), 0);
    }

    #[test]
    fn completed_timer_restarts_from_full_duration() {
        let mut timer = CountdownTimer::new(2);
        timer.start();
        timer.tick();
        timer.tick();
        assert_eq!(timer.status(), TimerStatus::Completed);
        timer.start();
        assert_eq!(timer.remaining(), 2);
        assert!(timer.is_running());
    }

    #[test]
    fn reset_stops_at_full_duration() {
        let mut timer = CountdownTimer::new(30);
        timer.start();
        timer.tick();
        timer.reset();
        assert_eq!(timer.snapshot(), TimerSnapshot {
            duration_secs: 30,
            remaining_secs: 30,
            status: TimerStatus::Idle,
        });
    }

    #[test]
    fn extending_a_completed_timer_pauses_it() {
        let mut timer = CountdownTimer::new(1);
        timer.start();
        timer.tick();
        timer.add_time(60);
        assert_eq!(timer.status(), TimerStatus::Paused);
        assert_eq!(timer.remaining(), 60);
    }
}
