//! Fetch coordination
//!
//! Owns the lifecycle of asynchronous fetches against the tracked
//! repository: at most one in flight, completion observed by polling,
//! status reported once per successful cycle.

mod core;
mod messages;

pub use core::FetchCoordinator;
pub use messages::{CheckOutcome, FetchState, PullOutcome, StatusEvent};
