//! Periodic driver for the matching jobs.
//!
//! Each job runs on its own interval behind a run-lock; a tick that fires
//! while the previous run of the same job is still in flight is skipped.
//! Cancelling the shutdown token stops the timers and waits for in-flight
//! runs to finish.

mod job;
mod periodic;
mod shutdown;

pub use job::{CycleJob, GuardedJob, TickOutcome};
pub use periodic::PeriodicDriver;
pub use shutdown::install_shutdown_handler;
