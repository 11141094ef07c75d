//! Bounded worker pool
//!
//! Tasks are fed through a bounded channel to a fixed set of workers, so a
//! large task list never floods the runtime. Dropping the sender is the
//! shutdown signal: workers drain what is queued and exit. Workers live in a
//! [`JoinSet`], so a run that misses its deadline aborts them before it
//! returns and nothing keeps running in the background.

use crate::error::PoolError;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::Instant;

/// A fixed point in time by which a run must finish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    limit: Duration,
}

impl Deadline {
    /// Deadline `limit` from now
    pub fn after(limit: Duration) -> Self {
        Self {
            at: Instant::now() + limit,
            limit,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    fn exceeded(&self) -> PoolError {
        PoolError::DeadlineExceeded(self.limit)
    }
}

/// Fixed-size pool of async workers
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
    queue_depth: usize,
}

impl WorkerPool {
    /// Create a pool with `workers` workers and a queue of `queue_depth` tasks
    pub fn new(workers: usize, queue_depth: usize) -> Self {
        Self {
            workers: workers.max(1),
            queue_depth: queue_depth.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every task through `handler` and collect the results.
    ///
    /// Results come back in completion order. A task that panics is logged
    /// and contributes no result; the rest of the run is unaffected.
    ///
    /// When `deadline` passes, every worker is aborted and awaited before
    /// the error is returned. Tasks are only interrupted at await points.
    pub async fn run<T, R, F, Fut>(
        &self,
        tasks: Vec<T>,
        handler: F,
        deadline: Option<Deadline>,
    ) -> Result<Vec<R>, PoolError>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        if let Some(deadline) = deadline.filter(Deadline::is_expired) {
            return Err(deadline.exceeded());
        }
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let total = tasks.len();
        let (tx, rx) = mpsc::channel::<T>(self.queue_depth);
        let rx = Arc::new(Mutex::new(rx));
        let handler = Arc::new(handler);

        let mut workers = JoinSet::new();
        for worker in 0..self.workers.min(total) {
            let rx = rx.clone();
            let handler = handler.clone();

            workers.spawn(async move {
                let mut results = Vec::new();
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(task) = next else { break };

                    match AssertUnwindSafe(handler(task)).catch_unwind().await {
                        Ok(result) => results.push(result),
                        Err(_) => tracing::error!(worker, "Task panicked"),
                    }
                }
                tracing::trace!(worker, completed = results.len(), "Worker finished");
                results
            });
        }
        drop(rx);

        let drive = async {
            for task in tasks {
                if tx.send(task).await.is_err() {
                    tracing::error!("All workers exited before the queue was drained");
                    break;
                }
            }
            drop(tx);

            let mut results = Vec::with_capacity(total);
            while let Some(joined) = workers.join_next().await {
                match joined {
                    Ok(done) => results.extend(done),
                    Err(e) => tracing::error!("Worker failed: {}", e),
                }
            }
            results
        };

        let Some(deadline) = deadline else {
            return Ok(drive.await);
        };

        let outcome = tokio::time::timeout_at(deadline.at, drive).await;
        match outcome {
            Ok(results) => Ok(results),
            Err(_) => {
                tracing::warn!("Deadline of {:?} reached, stopping workers", deadline.limit);
                workers.shutdown().await;
                Err(deadline.exceeded())
            }
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        let workers = crate::config::default_workers();
        Self::new(workers, workers * 2)
    }
}
