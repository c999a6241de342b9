//! Run status poller
//!
//! Polls run snapshots at a fixed interval until the run is terminal. The
//! terminal snapshot is always delivered to the update callback before the
//! completion callback fires. Cancelling the poller stops polling only; it
//! never affects the run itself.

use std::time::Duration;

use ferry_core::domain::run::PipelineRun;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::FerryClient;
use crate::error::Result;

/// Lower bound on the polling interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Handle to a running poller. Dropping the handle does not stop polling;
/// call [`PollHandle::cancel`] to stop it.
pub struct PollHandle {
    cancel: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl PollHandle {
    /// Stops further polling. The run keeps executing.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the polling task to finish.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Fixed-interval status poller
pub struct RunPoller {
    interval: Duration,
    min_interval: Duration,
}

impl RunPoller {
    /// Creates a poller with the given interval, clamped to
    /// [`MIN_POLL_INTERVAL`].
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            min_interval: MIN_POLL_INTERVAL,
        }
    }

    /// Overrides the minimum interval. Intended for tests and trusted
    /// local setups.
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    /// Spawns the polling loop. Each fetched snapshot is passed to
    /// `on_update`; once a terminal snapshot is observed, `on_complete`
    /// fires exactly once, after that snapshot's update.
    pub fn spawn<F, Fut, U, C>(self, mut fetch: F, mut on_update: U, on_complete: C) -> PollHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<PipelineRun>> + Send,
        U: FnMut(&PipelineRun) + Send + 'static,
        C: FnOnce(&PipelineRun) + Send + 'static,
    {
        let interval = self.interval.max(self.min_interval);
        let (cancel_tx, mut cancel_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut on_complete = Some(on_complete);
            loop {
                if *cancel_rx.borrow() {
                    debug!("poller cancelled");
                    break;
                }

                match fetch().await {
                    Ok(run) => {
                        on_update(&run);
                        if run.is_terminal() {
                            if let Some(complete) = on_complete.take() {
                                complete(&run);
                            }
                            break;
                        }
                    }
                    // Transient fetch failures do not stop the loop.
                    Err(e) => warn!("failed to fetch run status: {e}"),
                }

                tokio::select! {
                    _ = time::sleep(interval) => {}
                    _ = cancel_rx.changed() => {}
                }
            }
        });

        PollHandle {
            cancel: cancel_tx,
            task,
        }
    }
}

impl FerryClient {
    /// Polls a run until it is terminal.
    pub fn poll_run<U, C>(
        &self,
        run_id: Uuid,
        interval: Duration,
        on_update: U,
        on_complete: C,
    ) -> PollHandle
    where
        U: FnMut(&PipelineRun) + Send + 'static,
        C: FnOnce(&PipelineRun) + Send + 'static,
    {
        let client = self.clone();
        RunPoller::new(interval).spawn(
            move || {
                let client = client.clone();
                async move { client.get_run(run_id).await }
            },
            on_update,
            on_complete,
        )
    }
}
