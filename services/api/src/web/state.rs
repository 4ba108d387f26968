//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::web::laundry_task::LaundryTimers;
use dormduty_core::ports::{DatabaseService, IdentityProvider, ScheduleOptimizerService};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub identity: Arc<dyn IdentityProvider>,
    /// `None` when no API key is configured; the optimizer then always falls back.
    pub optimizer: Option<Arc<dyn ScheduleOptimizerService>>,
    pub laundry_timers: LaundryTimers,
}
