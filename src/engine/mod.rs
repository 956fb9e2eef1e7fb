//! Session engine: command sequencing, order records, deferred execution.
//!
//! - [`session`]: [`MatchingSession`], the command/event boundary
//! - [`store`]: append-only per-token order records
//! - [`scheduler`]: virtual-time queue for speed-bumped commands, timed
//!   cancels, and batch ticks

pub mod scheduler;
pub mod session;
pub mod store;

pub use scheduler::{next_aligned_tick, ScheduledCommand, Scheduler};
pub use session::{Book, MatchingSession};
pub use store::{OrderStore, StoredOrder};
