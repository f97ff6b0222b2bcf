//! repowatch - upstream-divergence watcher for git checkouts
//!
//! Periodically checks whether a local clone has diverged from its upstream
//! remote, reports a tri-state status, and optionally synchronizes on user
//! request. One remote, one tracked branch; no merge resolution, no
//! credential handling.
//!
//! # Modules
//!
//! - [`gateway`] - subprocess seam over the `git` binary
//! - [`divergence`] - commit-delta evaluation against upstream
//! - [`coordinator`] - fetch lifecycle and the single-in-flight guarantee
//! - [`scheduler`] - the recurring automatic-check timer
//! - [`reporter`] - divergence-to-text rendering
//! - [`config`] - configuration types and loading
//! - [`collab`] - log-view and prompt collaborator seams

pub mod cli;
pub mod collab;
pub mod config;
pub mod coordinator;
pub mod divergence;
pub mod gateway;
pub mod reporter;
pub mod scheduler;

pub use collab::{GitLogView, LogView, PullChoice, PullPrompt, StdinPrompt};
pub use config::{Config, IntervalValue, RepoHandle};
pub use coordinator::{CheckOutcome, FetchCoordinator, FetchState, PullOutcome, StatusEvent};
pub use divergence::{Divergence, DivergenceError, Evaluator, NO_UPSTREAM_SENTINEL};
pub use gateway::{FetchProcess, GatewayError, GitGateway, VcsGateway};
pub use scheduler::{CheckRunner, Scheduler};
