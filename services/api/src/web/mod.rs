pub mod bookings;
pub mod laundry;
pub mod laundry_task;
pub mod leaderboard;
pub mod ledger;
pub mod middleware;
pub mod payload;
pub mod response;
pub mod rest;
pub mod rooms;
pub mod schedules;
pub mod state;
pub mod tasks;
pub mod users;

// Re-export what the binaries need to build the server.
pub use middleware::require_auth;
pub use rest::{router, ApiDoc};
