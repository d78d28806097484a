//! Fixed-size worker pool draining a shared work queue

use crate::{DragError, Result};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Default number of concurrent workers
pub const DEFAULT_LIMIT: usize = 5;

/// Runs a job over every item with at most `limit` jobs in flight
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    limit: usize,
}

impl WorkerPool {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Process `items`, returning every job's output in completion order.
    ///
    /// A failing job does not stop the others; only a panicking worker
    /// turns into an error, after the remaining workers have drained.
    pub async fn run<T, O, F, Fut>(&self, items: Vec<T>, job: F) -> Result<Vec<O>>
    where
        T: Send + 'static,
        O: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
    {
        let total = items.len();
        let queue = Arc::new(Mutex::new(VecDeque::from(items)));
        let job = Arc::new(job);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut workers = JoinSet::new();
        for _ in 0..self.limit.min(total) {
            let queue = queue.clone();
            let job = job.clone();
            let tx = tx.clone();
            workers.spawn(async move {
                loop {
                    let next = match queue.lock() {
                        Ok(mut queue) => queue.pop_front(),
                        Err(_) => None,
                    };
                    let Some(item) = next else { break };
                    if tx.send(job(item).await).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        // single collector: completion order is recording order
        let mut results = Vec::with_capacity(total);
        while let Some(output) = rx.recv().await {
            results.push(output);
        }

        let mut panicked = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                panicked.get_or_insert_with(|| e.to_string());
            }
        }
        match panicked {
            Some(e) => Err(DragError::Worker(e)),
            None => Ok(results),
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}
