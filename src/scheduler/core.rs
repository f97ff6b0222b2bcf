//! Scheduler implementation
//!
//! One recurring timer drives automatic checks. The enabled flag and the
//! interval both live on watch channels: disable cancels only the pending
//! wait, and an interval change is picked up at the next re-arm.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Work the scheduler triggers each cycle
///
/// Implemented by the fetch coordinator; tests drive the timer with a
/// counting fake.
#[async_trait]
pub trait CheckRunner: Send + Sync + 'static {
    async fn run_check(&self) -> eyre::Result<()>;
}

/// Arms and re-arms the automatic check timer
///
/// Exactly one timer task is live while enabled: enabling twice is a
/// no-op, disabling cancels the next wait but lets an in-flight check
/// finish without re-arming.
pub struct Scheduler {
    runner: Arc<dyn CheckRunner>,
    enabled_tx: watch::Sender<bool>,
    interval_tx: watch::Sender<Duration>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(runner: Arc<dyn CheckRunner>, interval: Duration) -> Self {
        let (enabled_tx, _) = watch::channel(false);
        let (interval_tx, _) = watch::channel(interval);
        Self {
            runner,
            enabled_tx,
            interval_tx,
            task: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled_tx.borrow()
    }

    /// Change the interval; takes effect at the next re-arm.
    pub fn set_interval(&self, interval: Duration) {
        debug!(?interval, "Scheduler::set_interval: called");
        self.interval_tx.send_replace(interval);
    }

    /// Arm the recurring check cycle.
    pub async fn enable(&self) {
        let mut task = self.task.lock().await;
        if let Some(handle) = task.as_ref() {
            if !handle.is_finished() {
                debug!("Scheduler::enable: already enabled, ignoring");
                return;
            }
        }

        self.enabled_tx.send_replace(true);

        let runner = self.runner.clone();
        let mut enabled_rx = self.enabled_tx.subscribe();
        let interval_rx = self.interval_tx.subscribe();

        let interval = *interval_rx.borrow();
        info!(?interval, "Scheduler enabled");

        *task = Some(tokio::spawn(async move {
            loop {
                let interval = *interval_rx.borrow();

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    changed = enabled_rx.changed() => {
                        if changed.is_err() || !*enabled_rx.borrow() {
                            debug!("Scheduler: disabled during wait, stopping");
                            break;
                        }
                        continue;
                    }
                }

                // The flag may have flipped during the wait
                if !*enabled_rx.borrow() {
                    break;
                }

                if let Err(e) = runner.run_check().await {
                    // A failed check never stops future automatic checks
                    warn!(error = %e, "Scheduler: automatic check failed");
                }

                // Re-verify before re-arming
                if !*enabled_rx.borrow() {
                    debug!("Scheduler: disabled after check, not re-arming");
                    break;
                }
            }
        }));
    }

    /// Cancel the next pending wait.
    ///
    /// An in-flight check is allowed to complete and still reports, but it
    /// does not re-arm afterward.
    pub async fn disable(&self) {
        if !self.is_enabled() {
            return;
        }
        info!("Scheduler disabled");
        self.enabled_tx.send_replace(false);

        let mut task = self.task.lock().await;
        if let Some(handle) = task.take() {
            // The task exits on its own; await it so teardown is complete
            // before disable returns, without aborting an in-flight check.
            let _ = handle.await;
        }
    }
}
