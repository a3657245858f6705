//! Bounded-concurrency extraction pipeline.
//!
//! Consumes one source's raw records, batches them, dispatches batches to
//! the extraction oracle with a bounded fan-out, and reconciles completions
//! as they land. Batches that fail - oracle error, empty output, or a
//! product with no real signal - are queued and given exactly one more pass;
//! records that fail twice are dropped and counted, never silently lost.
//!
//! Writes are append-only per destination, so completion-order
//! reconciliation is safe: no batch's output depends on another's.

use std::sync::Arc;
use std::time::Duration;

use dealscout_oracle::ProductExtractor;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::budget::DeadlineBudget;
use crate::error::RunError;
use crate::schema::DealRecord;
use crate::sink::DealSink;
use crate::RawRecord;

/// Pipeline tunables, copied out of [`crate::config::Settings`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub batch_size: usize,
    pub flush_threshold: usize,
    pub batch_time_estimate: Duration,
    pub reprocess_time_estimate: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        let settings = crate::config::Settings::default();
        Self {
            batch_size: settings.batch_size,
            flush_threshold: settings.flush_threshold,
            batch_time_estimate: settings.batch_time_estimate,
            reprocess_time_estimate: settings.reprocess_time_estimate,
        }
    }
}

/// Outcome summary of one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Canonical rows persisted (after brand fan-out).
    pub persisted: usize,
    /// Raw records that entered the reprocessing pass.
    pub reprocessed: usize,
    /// Raw records dropped after failing both passes.
    pub dropped: usize,
}

/// One source's extraction run.
pub struct ExtractionPipeline {
    source: String,
    extractor: ProductExtractor,
    sink: Arc<dyn DealSink>,
    budget: Arc<DeadlineBudget>,
    options: PipelineOptions,
}

impl ExtractionPipeline {
    pub fn new(
        source: impl Into<String>,
        extractor: ProductExtractor,
        sink: Arc<dyn DealSink>,
        budget: Arc<DeadlineBudget>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            source: source.into(),
            extractor,
            sink,
            budget,
            options,
        }
    }

    /// Runs extraction over `records` with at most `concurrency_limit`
    /// oracle calls in flight.
    ///
    /// Empty input is a no-op, not an error. Per-batch failures never abort
    /// the run; only caller-level cancellation does, in which case rows
    /// persisted so far remain valid.
    pub async fn run(
        &self,
        records: Vec<RawRecord>,
        concurrency_limit: usize,
    ) -> Result<PipelineReport, RunError> {
        if records.is_empty() {
            info!(source = %self.source, "no records to process");
            return Ok(PipelineReport::default());
        }

        self.sink.reset(&self.source).await?;
        info!(source = %self.source, records = records.len(), "processing records");

        let mut report = PipelineReport::default();
        let mut working = records;

        // First pass plus exactly one reprocessing pass; the loop bound is
        // the whole invariant.
        for pass in 0..=1u8 {
            let leftovers = self.run_pass(working, concurrency_limit, &mut report).await?;
            if leftovers.is_empty() {
                break;
            }
            if pass == 0 {
                info!(
                    source = %self.source,
                    count = leftovers.len(),
                    "reprocessing records that failed extraction"
                );
                report.reprocessed = leftovers.len();
                self.budget.shift(
                    self.options
                        .reprocess_time_estimate
                        .saturating_mul(leftovers.len() as u32),
                );
                working = leftovers;
            } else {
                report.dropped = leftovers.len();
                error!(
                    source = %self.source,
                    count = leftovers.len(),
                    "records failed extraction twice and were dropped"
                );
                break;
            }
        }

        self.sink.finalize(&self.source).await?;
        info!(
            source = %self.source,
            persisted = report.persisted,
            dropped = report.dropped,
            "finished processing"
        );
        Ok(report)
    }

    /// One pass: dispatch every batch, reconcile completions, return the
    /// records that need another attempt.
    async fn run_pass(
        &self,
        records: Vec<RawRecord>,
        concurrency_limit: usize,
        report: &mut PipelineReport,
    ) -> Result<Vec<RawRecord>, RunError> {
        let batches = chunk_records(records, self.options.batch_size.max(1));
        let semaphore = Arc::new(Semaphore::new(concurrency_limit.max(1)));
        let mut in_flight: JoinSet<(Vec<RawRecord>, Result<Vec<DealRecord>, String>)> =
            JoinSet::new();

        for batch in batches {
            if self.budget.expired() {
                // Cooperative cancellation: pending batches are not started.
                warn!(source = %self.source, "budget expired, not dispatching further batches");
                break;
            }
            // Account for the oracle latency this batch will add.
            self.budget.shift(self.options.batch_time_estimate);

            let semaphore = semaphore.clone();
            let extractor = self.extractor.clone();
            in_flight.spawn(async move {
                // The semaphore is never closed during a pass.
                let _permit = semaphore.acquire_owned().await.ok();
                let result = extractor
                    .extract_products(&batch)
                    .await
                    .map(|products| {
                        products
                            .into_iter()
                            .map(DealRecord::from_product)
                            .collect::<Result<Vec<_>, _>>()
                            .map_err(|e| format!("uncanonicalizable product: {e}"))
                    })
                    .map_err(|e| e.to_string())
                    .and_then(|inner| inner);
                (batch, result)
            });
        }

        let mut reprocess: Vec<RawRecord> = Vec::new();
        let mut pending_rows: Vec<DealRecord> = Vec::new();

        while let Some(joined) = in_flight.join_next().await {
            let (batch, result) = match joined {
                Ok(pair) => pair,
                Err(join_err) => {
                    error!(source = %self.source, error = %join_err, "extraction task died");
                    continue;
                }
            };
            // Completion took its share of the budget too.
            self.budget.shift(self.options.batch_time_estimate / 2);

            match result {
                Err(err) => {
                    warn!(
                        source = %self.source,
                        error = %err,
                        "batch extraction failed, queueing for reprocess"
                    );
                    reprocess.extend(batch);
                }
                Ok(products) if products.is_empty() => {
                    warn!(
                        source = %self.source,
                        "oracle found no products in batch, queueing for reprocess"
                    );
                    reprocess.extend(batch);
                }
                Ok(products) => {
                    // A no-signal product re-queues its originating batch,
                    // at most once per batch.
                    let mut requeued = false;
                    for product in products {
                        if product.is_placeholder_only() {
                            debug!(source = %self.source, "product carried no signal");
                            if !requeued {
                                reprocess.extend_from_slice(&batch);
                                requeued = true;
                            }
                            continue;
                        }
                        pending_rows.extend(product.fan_out_brands());
                        if pending_rows.len() >= self.options.flush_threshold {
                            self.flush(&mut pending_rows, report).await?;
                        }
                    }
                }
            }
        }

        self.flush(&mut pending_rows, report).await?;
        Ok(reprocess)
    }

    async fn flush(
        &self,
        pending_rows: &mut Vec<DealRecord>,
        report: &mut PipelineReport,
    ) -> Result<(), RunError> {
        if pending_rows.is_empty() {
            return Ok(());
        }
        self.sink.append_rows(&self.source, pending_rows).await?;
        report.persisted += pending_rows.len();
        pending_rows.clear();
        Ok(())
    }
}

fn chunk_records(records: Vec<RawRecord>, batch_size: usize) -> Vec<Vec<RawRecord>> {
    let mut batches = Vec::with_capacity(records.len().div_ceil(batch_size));
    let mut batch = Vec::with_capacity(batch_size);
    for record in records {
        batch.push(record);
        if batch.len() == batch_size {
            batches.push(std::mem::replace(&mut batch, Vec::with_capacity(batch_size)));
        }
    }
    if !batch.is_empty() {
        batches.push(batch);
    }
    batches
}
