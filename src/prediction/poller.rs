use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};

use super::{JobStatus, PollResult, StatusSnapshot};

/// One status fetch against the remote job API. Implementations wrap
/// whatever transport the service uses; the poller only cares about the
/// returned snapshot. Transport errors propagate out of the poll loop.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch(&self, job_id: &str) -> Result<StatusSnapshot>;
}

/// Drives a submitted job to a terminal status with fixed-interval polling.
pub struct Poller {
    max_attempts: u32,
    delay: Duration,
}

impl Poller {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Poll until the job reaches a terminal status.
    ///
    /// Calls the fetcher exactly once per attempt and sleeps `delay` only
    /// between attempts. Non-terminal and unrecognized statuses keep the
    /// loop going; `failed`/`canceled` fail fast without further fetches.
    pub async fn poll<F: StatusFetcher + ?Sized>(
        &self,
        fetcher: &F,
        job_id: &str,
    ) -> Result<PollResult> {
        self.poll_with_cancel(fetcher, job_id, || std::future::ready(false))
            .await
    }

    /// Like [`poll`](Self::poll), with a cancellation check evaluated before
    /// each fetch so callers (e.g. a disconnected HTTP request) can abandon
    /// the job early.
    pub async fn poll_with_cancel<F, C, Fut>(
        &self,
        fetcher: &F,
        job_id: &str,
        is_cancelled: C,
    ) -> Result<PollResult>
    where
        F: StatusFetcher + ?Sized,
        C: Fn() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for attempt in 1..=self.max_attempts {
            if is_cancelled().await {
                tracing::info!(job_id, attempt, "Poll cancelled");
                return Err(AppError::Cancelled);
            }

            let snapshot = fetcher.fetch(job_id).await?;

            tracing::debug!(
                job_id,
                attempt,
                status = %snapshot.status,
                "Poll attempt"
            );

            match snapshot.status {
                JobStatus::Succeeded => {
                    let output = snapshot.output.unwrap_or_default();
                    if output.is_empty() {
                        // Legal but suspicious; callers must check length
                        tracing::warn!(job_id, "Job succeeded with empty output");
                    }
                    return Ok(PollResult {
                        status: JobStatus::Succeeded,
                        output,
                    });
                }
                JobStatus::Failed | JobStatus::Canceled => {
                    tracing::warn!(job_id, status = %snapshot.status, "Job reached failure status");
                    return Err(AppError::PollFailed {
                        status: snapshot.status.as_str().to_string(),
                    });
                }
                _ => {
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }

        tracing::warn!(
            job_id,
            attempts = self.max_attempts,
            "Gave up waiting for job to finish"
        );
        Err(AppError::PollTimeout {
            attempts: self.max_attempts,
        })
    }
}
