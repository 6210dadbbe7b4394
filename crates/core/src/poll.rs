use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};

use crate::{
    backend::JobBackend,
    error::{Result, SynopsisError},
    types::{JobStatus, Stage},
};

/// A status response tagged with the job it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub job_id: String,
    pub status: JobStatus,
}

/// Map a status response to the poll outcome: `failed` becomes an error.
pub fn check_status(job_id: &str, status: JobStatus) -> Result<JobStatus> {
    if status.stage == Stage::Failed {
        return Err(SynopsisError::JobFailed {
            job_id: job_id.to_string(),
            reason: status.failure_reason(),
        });
    }
    Ok(status)
}

/// Cancels a running poll chain. Cheap to clone.
#[derive(Clone)]
pub struct PollStopper {
    shutdown_tx: broadcast::Sender<()>,
}

impl PollStopper {
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// A running poll chain for one job.
///
/// The chain requests the job status, reports it, and sleeps for the poll
/// interval until the job completes, fails, a request errors, or it is
/// stopped. Dropping the handle stops the chain.
pub struct PollHandle {
    job_id: String,
    stopper: PollStopper,
    updates: mpsc::UnboundedReceiver<StatusUpdate>,
    task: Option<JoinHandle<Result<JobStatus>>>,
}

impl PollHandle {
    pub fn spawn(backend: Arc<dyn JobBackend>, job_id: impl Into<String>, interval: Duration) -> Self {
        let job_id = job_id.into();
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        let (updates_tx, updates) = mpsc::unbounded_channel();

        tracing::debug!(job_id = %job_id, interval_ms = interval.as_millis() as u64, "Starting poll chain");
        let task = tokio::spawn(poll_until_terminal(
            backend,
            job_id.clone(),
            interval,
            updates_tx,
            shutdown_rx,
        ));

        Self {
            job_id,
            stopper: PollStopper { shutdown_tx },
            updates,
            task: Some(task),
        }
    }

    pub fn stopper(&self) -> PollStopper {
        self.stopper.clone()
    }

    pub fn stop(&self) {
        self.stopper.stop();
    }

    /// Next status update, or `None` once the chain has ended and every
    /// update was delivered.
    pub async fn next_update(&mut self) -> Option<StatusUpdate> {
        self.updates.recv().await
    }

    /// Wait for the chain to end: the completed status, or the error that
    /// ended it.
    pub async fn join(mut self) -> Result<JobStatus> {
        let Some(task) = self.task.take() else {
            return Err(SynopsisError::Cancelled {
                job_id: self.job_id.clone(),
            });
        };

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(SynopsisError::PollFailed {
                job_id: self.job_id.clone(),
                reason: format!("poll task aborted: {e}"),
            }),
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stopper.stop();
    }
}

async fn poll_until_terminal(
    backend: Arc<dyn JobBackend>,
    job_id: String,
    interval: Duration,
    updates: mpsc::UnboundedSender<StatusUpdate>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<JobStatus> {
    let cancelled = || SynopsisError::Cancelled {
        job_id: job_id.clone(),
    };

    loop {
        let status = tokio::select! {
            biased;
            _ = shutdown.recv() => return Err(cancelled()),
            status = backend.status(&job_id) => status?,
        };

        tracing::debug!(job_id = %job_id, stage = %status.stage, progress = status.progress, "Polled job status");
        let _ = updates.send(StatusUpdate {
            job_id: job_id.clone(),
            status: status.clone(),
        });

        if status.stage.is_terminal() {
            return check_status(&job_id, status);
        }

        tokio::select! {
            biased;
            _ = shutdown.recv() => return Err(cancelled()),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
