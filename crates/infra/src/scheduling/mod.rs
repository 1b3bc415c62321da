//! Scheduling infrastructure for the collection loop
//!
//! One scheduler owns the scraper cadence: fixed-interval collection cycles,
//! debounced mutation-triggered cycles, and session recovery attempts.
//!
//! Lifecycle rules:
//! - Explicit start/stop with join handles for spawned tasks
//! - Cancellation token support
//! - Bounded stop timeout

pub mod error;
pub mod poll_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use poll_scheduler::{PollScheduler, PollSchedulerConfig};
