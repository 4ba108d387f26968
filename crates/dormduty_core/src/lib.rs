pub mod aura;
pub mod booking;
pub mod domain;
pub mod ledger;
pub mod membership;
pub mod ports;
pub mod schedule;
pub mod timer;

pub use domain::{
    AssignmentSource, AuraEvent, Booking, Expense, Identity, LaundryState, LaundryUpdate,
    LeaderboardEntry, LeaderboardPage, Machine, NewBooking, NewTask, OptimizedSchedule, Payment,
    Room, RoomDetails, RoomId, Schedule, ScheduleAssignment, Task, TaskPriority, TaskUpdate,
    TimeSlot, User, UserId,
};
pub use ports::{
    DatabaseService, IdentityProvider, PortError, PortResult, Registration,
    ScheduleOptimizerService,
};
