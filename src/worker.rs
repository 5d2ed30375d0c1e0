use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::{AppError, Result};

/// Bounded pool for blocking work.
///
/// Engine calls block for the whole plan execution, so running them on the
/// async runtime would stall request handling. Each call takes a permit and
/// runs on the blocking thread pool; the bound keeps a burst of requests
/// from spawning an unbounded pile of threads.
pub struct WorkerPool {
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(max_blocking: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_blocking)),
        }
    }

    /// Run `work` on the blocking pool and await its result.
    pub async fn run<F, T>(&self, work: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::Internal("worker pool closed".to_string()))?;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work()
        });

        handle
            .await
            .map_err(|e| AppError::Internal(format!("worker task panicked: {e}")))?
    }
}
