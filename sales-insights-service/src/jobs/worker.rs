use super::queue::{EnqueueRequest, Job, JobHandler, JobQueue, QueueName};
use crate::config::QueueConfig;
use crate::services::metrics::{JOBS_TOTAL, JOB_DURATION};
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct QueuedJob {
    job: Job,
    timeout: Duration,
    enqueued_at: Instant,
}

/// Named in-memory queues, each drained by a bounded pool of workers.
pub struct InProcessQueue {
    senders: HashMap<QueueName, mpsc::Sender<QueuedJob>>,
    shutdown_token: CancellationToken,
}

impl InProcessQueue {
    /// Spawn one dispatcher per queue. Must be called inside a Tokio runtime.
    pub fn start(config: &QueueConfig, handler: Arc<dyn JobHandler>) -> Self {
        let shutdown_token = CancellationToken::new();
        let mut senders = HashMap::new();

        for queue in QueueName::ALL {
            let workers = match queue {
                QueueName::Short => config.short_workers,
                QueueName::Default => config.default_workers,
                QueueName::Long => config.long_workers,
            }
            .max(1);

            let (job_tx, job_rx) = mpsc::channel(config.capacity.max(1));
            tokio::spawn(dispatch(
                queue,
                job_rx,
                workers,
                handler.clone(),
                shutdown_token.clone(),
            ));
            senders.insert(queue, job_tx);

            tracing::info!(queue = %queue, workers = workers, "Job queue started");
        }

        Self {
            senders,
            shutdown_token,
        }
    }

    /// Stop accepting work. Running jobs finish or hit their timeout.
    pub fn shutdown(&self) {
        tracing::info!("Initiating job queue shutdown");
        self.shutdown_token.cancel();
    }
}

impl Drop for InProcessQueue {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

impl JobQueue for InProcessQueue {
    fn enqueue(&self, request: EnqueueRequest) -> Result<(), AppError> {
        let queue = request.queue;
        let method = request.job.method();

        let sender = self.senders.get(&queue).ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("Queue '{}' is not running", queue))
        })?;

        let queued = QueuedJob {
            job: request.job,
            timeout: request.timeout,
            enqueued_at: Instant::now(),
        };

        match sender.try_send(queued) {
            Ok(()) => {
                JOBS_TOTAL.with_label_values(&[queue.as_str(), "enqueued"]).inc();
                tracing::debug!(queue = %queue, method = method, "Job enqueued");
                Ok(())
            }
            Err(e) => {
                JOBS_TOTAL.with_label_values(&[queue.as_str(), "rejected"]).inc();
                let reason = match e {
                    TrySendError::Full(_) => "Job queue full",
                    TrySendError::Closed(_) => "Job queue closed",
                };
                Err(AppError::InternalError(anyhow::anyhow!(
                    "{}: {}",
                    reason,
                    queue
                )))
            }
        }
    }
}

async fn dispatch(
    queue: QueueName,
    mut job_rx: mpsc::Receiver<QueuedJob>,
    workers: usize,
    handler: Arc<dyn JobHandler>,
    shutdown: CancellationToken,
) {
    let permits = Arc::new(Semaphore::new(workers));

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!(queue = %queue, "Job dispatcher shutting down");
                break;
            }
            job = job_rx.recv() => {
                let Some(job) = job else {
                    tracing::info!(queue = %queue, "Channel closed, job dispatcher exiting");
                    break;
                };

                let Ok(permit) = permits.clone().acquire_owned().await else {
                    break;
                };

                let handler = handler.clone();
                tokio::spawn(async move {
                    run_job(queue, handler.as_ref(), job).await;
                    drop(permit);
                });
            }
        }
    }
}

async fn run_job(queue: QueueName, handler: &dyn JobHandler, queued: QueuedJob) {
    let method = queued.job.method();
    let start = Instant::now();

    tracing::info!(
        queue = %queue,
        method = method,
        waited_ms = queued.enqueued_at.elapsed().as_millis() as u64,
        "Job started"
    );

    let outcome = match tokio::time::timeout(queued.timeout, handler.handle(queued.job)).await {
        Ok(Ok(())) => {
            tracing::info!(
                queue = %queue,
                method = method,
                duration_ms = start.elapsed().as_millis() as u64,
                "Job succeeded"
            );
            "succeeded"
        }
        Ok(Err(e)) => {
            tracing::error!(queue = %queue, method = method, error = %e, "Job failed");
            "failed"
        }
        Err(_) => {
            tracing::warn!(
                queue = %queue,
                method = method,
                timeout_secs = queued.timeout.as_secs_f64(),
                "Job timed out"
            );
            "timed_out"
        }
    };

    JOBS_TOTAL.with_label_values(&[queue.as_str(), outcome]).inc();
    JOB_DURATION
        .with_label_values(&[queue.as_str()])
        .observe(start.elapsed().as_secs_f64());
}
