use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use crate::{Error, Result};

pub type Job = BoxFuture<'static, ()>;

/// Fixed set of workers draining a bounded queue. Submitting never waits:
/// a full queue rejects the job.
#[derive(Clone)]
pub struct WorkerPool {
    queue_tx: mpsc::Sender<Job>,
    size: usize,
}

impl WorkerPool {
    /// Spawns `size` workers. Must be called inside a tokio runtime.
    pub fn start(size: usize, capacity: usize) -> Self {
        let size = size.max(1);
        let (queue_tx, queue_rx) = mpsc::channel::<Job>(capacity.max(1));
        let queue_rx = Arc::new(Mutex::new(queue_rx));

        for worker in 0..size {
            let queue_rx = queue_rx.clone();
            tokio::spawn(async move {
                Self::worker_loop(worker, queue_rx).await;
            });
        }
        info!("Started worker pool with {} workers (queue capacity {})", size, capacity);

        Self { queue_tx, size }
    }

    async fn worker_loop(worker: usize, queue_rx: Arc<Mutex<mpsc::Receiver<Job>>>) {
        loop {
            // Hold the lock only while waiting for the next job.
            let job = { queue_rx.lock().await.recv().await };
            let Some(job) = job else {
                debug!(worker, "Queue closed, worker exiting");
                return;
            };
            // A panicking job must not take the worker down with it.
            if let Err(e) = tokio::spawn(job).await {
                error!(worker, "Remediation job aborted: {}", e);
            }
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn submit(&self, job: Job) -> Result<()> {
        self.queue_tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                Error::Internal("remediation queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                Error::Internal("remediation queue is closed".to_string())
            }
        })
    }
}
