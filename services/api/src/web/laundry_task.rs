//! services/api/src/web/laundry_task.rs
//!
//! Server-side countdown timers for the laundry machines. Every running timer
//! is driven by its own "worker" task that ticks it once per interval and frees
//! the machine in the room's laundry state when the countdown completes.

use dormduty_core::{
    domain::{LaundryUpdate, Machine, RoomId},
    ports::{DatabaseService, PortError, PortResult},
    timer::{CountdownTimer, TimerEvent, TimerSnapshot},
};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

type TimerKey = (RoomId, Machine);

struct ActiveTimer {
    timer: Arc<Mutex<CountdownTimer>>,
    /// Cancels the worker currently ticking `timer`, if one is running.
    worker: Option<CancellationToken>,
}

impl ActiveTimer {
    fn stop_worker(&mut self) {
        if let Some(token) = self.worker.take() {
            token.cancel();
        }
    }
}

/// Registry of the laundry timers of every room, keyed by room and machine.
#[derive(Clone)]
pub struct LaundryTimers {
    db: Arc<dyn DatabaseService>,
    tick: Duration,
    timers: Arc<Mutex<HashMap<TimerKey, ActiveTimer>>>,
}

impl LaundryTimers {
    /// `tick` is the wall-clock length of one timer second.
    pub fn new(db: Arc<dyn DatabaseService>, tick: Duration) -> Self {
        Self {
            db,
            tick,
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn snapshot(&self, room_id: RoomId, machine: Machine) -> Option<TimerSnapshot> {
        let timer = {
            let timers = self.timers.lock().await;
            timers.get(&(room_id, machine)).map(|t| t.timer.clone())
        }?;
        let snapshot = timer.lock().await.snapshot();
        Some(snapshot)
    }

    /// Starts a fresh countdown, replacing whatever timer the machine had.
    pub async fn start(&self, room_id: RoomId, machine: Machine, minutes: u32) -> TimerSnapshot {
        let mut countdown = CountdownTimer::new(u64::from(minutes) * 60);
        countdown.start();
        let snapshot = countdown.snapshot();
        let timer = Arc::new(Mutex::new(countdown));
        let worker = self.spawn_worker((room_id, machine), timer.clone());

        let mut timers = self.timers.lock().await;
        if let Some(mut previous) = timers.insert(
            (room_id, machine),
            ActiveTimer {
                timer,
                worker: Some(worker),
            },
        ) {
            previous.stop_worker();
        }
        snapshot
    }

    pub async fn pause(&self, room_id: RoomId, machine: Machine) -> PortResult<TimerSnapshot> {
        let mut timers = self.timers.lock().await;
        let active = lookup(&mut timers, room_id, machine)?;
        active.stop_worker();
        let mut timer = active.timer.lock().await;
        timer.pause();
        Ok(timer.snapshot())
    }

    pub async fn resume(&self, room_id: RoomId, machine: Machine) -> PortResult<TimerSnapshot> {
        let mut timers = self.timers.lock().await;
        let active = lookup(&mut timers, room_id, machine)?;
        let snapshot = {
            let mut timer = active.timer.lock().await;
            if timer.is_running() {
                return Ok(timer.snapshot());
            }
            timer.start();
            timer.snapshot()
        };
        active.stop_worker();
        active.worker = Some(self.spawn_worker((room_id, machine), active.timer.clone()));
        Ok(snapshot)
    }

    /// Adds time to both the remaining countdown and the total duration.
    pub async fn extend(&self, room_id: RoomId, machine: Machine, minutes: u32) -> PortResult<TimerSnapshot> {
        let mut timers = self.timers.lock().await;
        let active = lookup(&mut timers, room_id, machine)?;
        let mut timer = active.timer.lock().await;
        timer.add_time(u64::from(minutes) * 60);
        Ok(timer.snapshot())
    }

    pub async fn finish(&self, room_id: RoomId, machine: Machine) -> PortResult<TimerSnapshot> {
        let mut timers = self.timers.lock().await;
        let active = lookup(&mut timers, room_id, machine)?;
        active.stop_worker();
        let mut timer = active.timer.lock().await;
        timer.finish_now();
        Ok(timer.snapshot())
    }

    pub async fn reset(&self, room_id: RoomId, machine: Machine) -> PortResult<TimerSnapshot> {
        let mut timers = self.timers.lock().await;
        let active = lookup(&mut timers, room_id, machine)?;
        active.stop_worker();
        let mut timer = active.timer.lock().await;
        timer.reset();
        Ok(timer.snapshot())
    }

    fn spawn_worker(&self, key: TimerKey, timer: Arc<Mutex<CountdownTimer>>) -> CancellationToken {
        let token = CancellationToken::new();
        tokio::spawn(run_timer(
            self.db.clone(),
            key,
            timer,
            token.clone(),
            self.tick,
        ));
        token
    }
}

fn lookup(
    timers: &mut HashMap<TimerKey, ActiveTimer>,
    room_id: RoomId,
    machine: Machine,
) -> PortResult<&mut ActiveTimer> {
    timers
        .get_mut(&(room_id, machine))
        .ok_or_else(|| PortError::NotFound(format!("No {} timer has been started", machine)))
}

/// The worker loop. Ticks `timer` until it completes or `token` is cancelled.
async fn run_timer(
    db: Arc<dyn DatabaseService>,
    (room_id, machine): TimerKey,
    timer: Arc<Mutex<CountdownTimer>>,
    token: CancellationToken,
    tick: Duration,
) {
    info!("Laundry timer running for the {} in room {}.", machine, room_id);
    let mut interval = tokio::time::interval(tick);
    // The first tick of a tokio interval completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                info!("Laundry timer worker for the {} in room {} stopped.", machine, room_id);
                return;
            }
            _ = interval.tick() => {
                let (event, running) = {
                    let mut timer = timer.lock().await;
                    (timer.tick(), timer.is_running())
                };
                if event == Some(TimerEvent::Completed) {
                    info!("The {} in room {} is done; freeing it.", machine, room_id);
                    if let Err(e) = db.upsert_laundry(room_id, LaundryUpdate::clear(machine)).await {
                        error!("Failed to free the {} in room {}: {:?}", machine, room_id, e);
                    }
                    return;
                }
                if !running {
                    return;
                }
            }
        }
    }
}
