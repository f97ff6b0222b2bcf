//! Message and state types for the fetch coordinator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::divergence::Divergence;

/// Lifecycle of one automatic fetch cycle
///
/// Only `Idle` may transition to `Fetching`. The terminal states are
/// transient: once observed and reported the machine returns to `Idle`
/// within the same cycle. There is no retry on `Failed`; the next
/// opportunity is the next scheduled cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Fetching,
    Succeeded,
    Failed,
}

/// Result of one `check_for_updates` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Fetch completed and divergence was evaluated and reported
    Completed(Divergence),

    /// The fetch subprocess failed; nothing was reported
    FetchFailed,

    /// A fetch was already in flight; no subprocess was spawned
    Skipped,
}

/// Result of one `pull` invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// Incoming log was displayed; the working tree was not touched
    LogShown,

    /// The local branch was fast-forwarded/merged to upstream
    Updated,
}

/// Status update emitted after each successful check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub divergence: Divergence,
    pub count: i64,
    pub message: String,
    #[serde(rename = "checked-at")]
    pub checked_at: DateTime<Utc>,
}
