//! Recurring job scheduling.
//!
//! [`JobStore`] holds a connection's jobs behind one lock, and [`Scheduler`]
//! arms a timer per job, runs the transfer when it expires, and re-arms or
//! retires the job afterwards.

mod engine;
mod store;
mod types;

pub use engine::{JobContext, Scheduler};
pub use store::JobStore;
pub use types::{ArmOutcome, CancelOutcome, SchedulerError};
