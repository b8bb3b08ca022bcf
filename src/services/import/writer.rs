use super::types::{ClientRecord, ImportBatchResult, PendingRecord};
use crate::services::client_store::ClientStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Bulk-insert retry schedule. Waits happen only between attempts:
/// `base`, `2 * base`, `4 * base`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// One attempt, straight to per-record fallback.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay after the failed `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Writes records in fixed-size, strictly sequential batches.
///
/// Partial failure is never an error: the returned tally says what landed.
pub struct BatchWriter {
    store: Arc<dyn ClientStore>,
    batch_size: usize,
    inter_batch_delay: Duration,
    retry: RetryPolicy,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn ClientStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            inter_batch_delay: Duration::ZERO,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay = delay;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn write(&self, records: &[PendingRecord]) -> ImportBatchResult {
        let mut result = ImportBatchResult::default();
        let total_batches = records.len().div_ceil(self.batch_size);

        for (idx, batch) in records.chunks(self.batch_size).enumerate() {
            if idx > 0 && !self.inter_batch_delay.is_zero() {
                sleep(self.inter_batch_delay).await;
            }

            let outcome = self.write_batch(batch).await;
            tracing::debug!(
                "💾 Batch {}/{}: {} saved, {} failed",
                idx + 1,
                total_batches,
                outcome.succeeded,
                outcome.failed
            );
            result.merge(outcome);
        }

        result
    }

    async fn write_batch(&self, batch: &[PendingRecord]) -> ImportBatchResult {
        let rows: Vec<ClientRecord> = batch.iter().map(|p| p.record.clone()).collect();

        let mut attempt = 1;
        loop {
            match self.store.insert_batch(&rows).await {
                Ok(()) => {
                    return ImportBatchResult {
                        succeeded: batch.len(),
                        ..Default::default()
                    };
                }
                Err(e) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    tracing::warn!(
                        "⚠️ Bulk insert attempt {}/{} failed: {:#}; retrying in {:?}",
                        attempt,
                        self.retry.max_attempts,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Bulk insert of {} record(s) failed: {:#}; inserting individually",
                        batch.len(),
                        e
                    );
                    break;
                }
            }
        }

        self.write_individually(batch).await
    }

    async fn write_individually(&self, batch: &[PendingRecord]) -> ImportBatchResult {
        let mut result = ImportBatchResult::default();
        for pending in batch {
            match self.store.insert_one(&pending.record).await {
                Ok(()) => result.succeeded += 1,
                Err(e) => {
                    tracing::error!(
                        "❌ Failed to save row {} ({:?}): {:#}",
                        pending.row,
                        pending.sheet,
                        e
                    );
                    result.record_failure(pending, format!("{:#}", e));
                }
            }
        }
        result
    }
}
