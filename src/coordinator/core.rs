//! Fetch coordinator - lifecycle of asynchronous fetches
//!
//! The coordinator owns the single-in-flight guarantee: a cycle arriving
//! while a fetch is pending does not spawn a second subprocess, it no-ops
//! until the prior operation's completion has been observed. Completion is
//! observed by a cooperative poll loop on a short fixed period, never by a
//! blocking wait on the host's control path.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use eyre::{Context, Result, eyre};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::collab::LogView;
use crate::divergence::{Divergence, Evaluator};
use crate::gateway::{FetchProcess, VcsGateway};
use crate::reporter;

use super::messages::{CheckOutcome, FetchState, PullOutcome, StatusEvent};

/// One in-flight fetch: remote name plus the poll handle for its process
struct FetchOperation {
    remote: String,
    process: Box<dyn FetchProcess>,
}

/// Coordinates fetches against a single repository handle
pub struct FetchCoordinator {
    gateway: Arc<dyn VcsGateway>,
    evaluator: Evaluator,
    log_view: Arc<dyn LogView>,
    remote: String,
    poll_interval: Duration,
    state: Mutex<FetchState>,
    status_tx: mpsc::Sender<StatusEvent>,
}

impl FetchCoordinator {
    pub fn new(
        gateway: Arc<dyn VcsGateway>,
        log_view: Arc<dyn LogView>,
        remote: impl Into<String>,
        poll_interval: Duration,
        status_tx: mpsc::Sender<StatusEvent>,
    ) -> Self {
        let remote = remote.into();
        Self {
            evaluator: Evaluator::new(gateway.clone(), remote.clone()),
            gateway,
            log_view,
            remote,
            poll_interval,
            state: Mutex::new(FetchState::Idle),
            status_tx,
        }
    }

    /// Current state of the fetch cycle machine
    pub async fn state(&self) -> FetchState {
        *self.state.lock().await
    }

    /// Fetch from upstream and, on success, evaluate and report divergence.
    ///
    /// A fetch failure is silent at this layer: nothing is reported and the
    /// outcome is [`CheckOutcome::FetchFailed`]. If a fetch is already in
    /// flight no subprocess is spawned and the outcome is `Skipped`.
    pub async fn check_for_updates(&self) -> Result<CheckOutcome> {
        {
            let mut state = self.state.lock().await;
            if *state != FetchState::Idle {
                debug!(?state, "FetchCoordinator::check_for_updates: fetch already in flight, skipping");
                return Ok(CheckOutcome::Skipped);
            }
            *state = FetchState::Fetching;
        }

        let process = match self.gateway.begin_fetch(&self.remote).await {
            Ok(process) => process,
            Err(e) => {
                debug!(error = %e, "FetchCoordinator::check_for_updates: fetch spawn failed");
                *self.state.lock().await = FetchState::Idle;
                return Ok(CheckOutcome::FetchFailed);
            }
        };

        let mut operation = FetchOperation {
            remote: self.remote.clone(),
            process,
        };

        let exit_code = self.await_fetch(&mut operation).await;
        drop(operation);

        match exit_code {
            Some(0) => {
                *self.state.lock().await = FetchState::Succeeded;
                let divergence = match self.report_divergence().await {
                    Ok(d) => d,
                    Err(e) => {
                        *self.state.lock().await = FetchState::Idle;
                        return Err(e);
                    }
                };
                *self.state.lock().await = FetchState::Idle;
                Ok(CheckOutcome::Completed(divergence))
            }
            _ => {
                *self.state.lock().await = FetchState::Failed;
                debug!(code = ?exit_code, "FetchCoordinator::check_for_updates: fetch failed");
                *self.state.lock().await = FetchState::Idle;
                Ok(CheckOutcome::FetchFailed)
            }
        }
    }

    /// Pull from upstream, or only show the incoming log.
    ///
    /// With `confirm` false the working tree is never touched; the incoming
    /// log is displayed via the log-view collaborator. With `confirm` true
    /// the local branch is actually updated, which requires the same Idle
    /// precondition as starting a fetch.
    pub async fn pull(&self, confirm: bool) -> Result<PullOutcome> {
        if !confirm {
            self.log_view.show_incoming().await?;
            return Ok(PullOutcome::LogShown);
        }

        {
            let mut state = self.state.lock().await;
            if *state != FetchState::Idle {
                return Err(eyre!("a fetch is in flight; try again shortly"));
            }
            // Hold the slot so no automatic cycle fetches concurrently
            *state = FetchState::Fetching;
        }

        let result = self
            .gateway
            .run(&["pull", &self.remote])
            .await
            .context("Pull failed");

        *self.state.lock().await = FetchState::Idle;

        match result {
            Ok(_) => {
                info!(remote = %self.remote, "Pulled latest changes");
                Ok(PullOutcome::Updated)
            }
            Err(e) => Err(e),
        }
    }

    /// Poll the fetch subprocess until it reaches a terminal state.
    ///
    /// Returns the exit code, or `None` if polling itself failed. The loop
    /// is unbounded, matching the fetch itself having no imposed timeout.
    async fn await_fetch(&self, operation: &mut FetchOperation) -> Option<i32> {
        loop {
            match operation.process.try_status() {
                Ok(Some(code)) => {
                    debug!(remote = %operation.remote, code, "FetchCoordinator::await_fetch: fetch terminated");
                    return Some(code);
                }
                Ok(None) => tokio::time::sleep(self.poll_interval).await,
                Err(e) => {
                    warn!(error = %e, "FetchCoordinator::await_fetch: could not poll fetch process");
                    return None;
                }
            }
        }
    }

    async fn report_divergence(&self) -> Result<Divergence> {
        let divergence = self
            .evaluator
            .evaluate()
            .await
            .context("Failed to evaluate divergence after fetch")?;

        let count = divergence.as_count();
        let event = StatusEvent {
            divergence,
            count,
            message: reporter::render(count),
            checked_at: Utc::now(),
        };

        info!(count, message = %event.message, "Divergence status");

        // Receiver may be gone (e.g. one-shot CLI check already returned);
        // status still went to the log.
        if let Err(e) = self.status_tx.send(event).await {
            debug!(error = %e, "FetchCoordinator::report_divergence: status channel closed");
        }

        Ok(divergence)
    }
}

#[async_trait::async_trait]
impl crate::scheduler::CheckRunner for FetchCoordinator {
    async fn run_check(&self) -> Result<()> {
        self.check_for_updates().await.map(|_| ())
    }
}
