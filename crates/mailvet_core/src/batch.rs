//! Batch scheduling with bounded concurrency and inter-group pacing
//!
//! Addresses are partitioned into contiguous groups of `concurrent_limit`.
//! Every group after the first waits `rate_limit_delay` before dispatch, and
//! no address of group k+1 starts before every address of group k has
//! settled. The barrier plus delay is the backpressure contract that keeps
//! load on third-party mail exchangers below greylisting thresholds; a
//! refill-on-completion pool would exceed the concurrency bound at group
//! boundaries.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::stats::{BatchStatistics, StatsAggregator};
use crate::verifier::AddressVerifier;
use crate::{Result, Verdict, VerdictCategory, VerifierError, MAX_BATCH_SIZE};

/// Called once per address as its verdict lands: `(completed, total, verdict)`.
pub type ProgressHook = Box<dyn FnMut(usize, usize, &Verdict) + Send>;

/// Called with a statistics snapshot every 100 verdicts and once at the end.
pub type StatsHook = Box<dyn FnMut(&BatchStatistics) + Send>;

/// Optional observation hooks for a batch run
#[derive(Default)]
pub struct BatchHooks {
    pub on_progress: Option<ProgressHook>,
    pub on_stats: Option<StatsHook>,
}

/// Outcome of a batch run: verdicts in input order plus the final aggregate
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub results: Vec<Verdict>,
    pub statistics: BatchStatistics,
}

/// Scheduler dispatching a batch through one [`AddressVerifier`]
pub struct BatchScheduler {
    verifier: Arc<AddressVerifier>,
    concurrent_limit: usize,
    rate_limit_delay: Duration,
}

impl BatchScheduler {
    /// Build a scheduler; concurrency and pacing come from the verifier's
    /// configuration.
    pub fn new(verifier: Arc<AddressVerifier>) -> Self {
        let config = verifier.config();
        Self {
            concurrent_limit: config.concurrent_limit.max(1),
            rate_limit_delay: Duration::from_millis(config.rate_limit_delay_ms),
            verifier,
        }
    }

    /// Verify a batch of addresses.
    ///
    /// # Returns
    /// * `Ok(BatchReport)` - verdicts in input order plus final statistics
    /// * `Err(VerifierError)` - empty input, or more than [`MAX_BATCH_SIZE`]
    ///   addresses; both are rejected before any scheduling happens
    pub async fn run(&self, addresses: Vec<String>, hooks: BatchHooks) -> Result<BatchReport> {
        let verifier = Arc::clone(&self.verifier);
        self.dispatch(addresses, hooks, move |address| {
            let verifier = Arc::clone(&verifier);
            async move { verifier.verify(&address).await }
        })
        .await
    }

    /// Group dispatch shared by [`BatchScheduler::run`] and the tests;
    /// `verify` produces the future spawned for each address.
    async fn dispatch<F, Fut>(
        &self,
        addresses: Vec<String>,
        mut hooks: BatchHooks,
        verify: F,
    ) -> Result<BatchReport>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Verdict> + Send + 'static,
    {
        if addresses.is_empty() {
            return Err(VerifierError::EmptyBatch);
        }
        if addresses.len() > MAX_BATCH_SIZE {
            return Err(VerifierError::BatchTooLarge(addresses.len()));
        }

        let total = addresses.len();
        let mut results: Vec<Verdict> = Vec::with_capacity(total);
        let mut aggregator = StatsAggregator::new();
        let mut completed = 0usize;

        debug!(
            total,
            groups = total.div_ceil(self.concurrent_limit),
            "starting batch"
        );

        for (group_index, group) in addresses.chunks(self.concurrent_limit).enumerate() {
            if group_index > 0 {
                tokio::time::sleep(self.rate_limit_delay).await;
            }

            let handles: Vec<(String, JoinHandle<Verdict>)> = group
                .iter()
                .map(|address| (address.clone(), tokio::spawn(verify(address.clone()))))
                .collect();

            for (address, handle) in handles {
                let verdict = match handle.await {
                    Ok(verdict) => verdict,
                    Err(err) => {
                        // One failed address never aborts the batch.
                        warn!(%address, error = %err, "verification task failed");
                        Verdict::new(
                            address,
                            VerdictCategory::ProcessingError,
                            format!("verification failed unexpectedly: {err}"),
                        )
                    }
                };

                completed += 1;
                aggregator.record(&verdict);
                if let Some(on_progress) = hooks.on_progress.as_mut() {
                    on_progress(completed, total, &verdict);
                }
                if completed % 100 == 0 {
                    if let Some(on_stats) = hooks.on_stats.as_mut() {
                        on_stats(&aggregator.snapshot());
                    }
                }
                results.push(verdict);
            }
        }

        let statistics = aggregator.snapshot();
        if let Some(on_stats) = hooks.on_stats.as_mut() {
            on_stats(&statistics);
        }

        Ok(BatchReport {
            results,
            statistics,
        })
    }
}
