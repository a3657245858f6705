//! Per-source run orchestration.
//!
//! Wraps "fetch raw records, run the extraction pipeline" in a deadline
//! budget and a single automatic retry. Sources run independently: one
//! source's failure, retry or deadline expiry never touches a sibling.

use std::sync::Arc;

use dealscout_oracle::ProductExtractor;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::budget::DeadlineBudget;
use crate::config::Settings;
use crate::error::RunError;
use crate::pipeline::{ExtractionPipeline, PipelineOptions, PipelineReport};
use crate::sink::DealSink;
use crate::source::SourceConnector;

/// What happened to one source.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOutcome {
    /// Present when a run completed; `None` means the source was skipped.
    pub report: Option<PipelineReport>,
    /// Whether the deadline forced a second attempt.
    pub retried: bool,
}

impl RunOutcome {
    pub fn skipped(&self) -> bool {
        self.report.is_none()
    }
}

/// Drives source runs.
pub struct RunOrchestrator {
    extractor: ProductExtractor,
    sink: Arc<dyn DealSink>,
    settings: Settings,
}

impl RunOrchestrator {
    pub fn new(extractor: ProductExtractor, sink: Arc<dyn DealSink>, settings: Settings) -> Self {
        Self {
            extractor,
            sink,
            settings,
        }
    }

    /// Runs one source to completion.
    ///
    /// Deadline expiry triggers exactly one retry from scratch with a fresh
    /// budget; a second expiry, or any other failure, is a logged skip.
    /// Never raises - per-source problems must not reach sibling runs.
    pub async fn run_source(&self, connector: &dyn SourceConnector) -> RunOutcome {
        let source = connector.name().to_string();

        for attempt in 0..=1u8 {
            let retried = attempt > 0;
            match self.run_once(connector).await {
                Ok(report) => {
                    info!(
                        source = %source,
                        persisted = report.persisted,
                        dropped = report.dropped,
                        retried,
                        "source run complete"
                    );
                    return RunOutcome {
                        report: Some(report),
                        retried,
                    };
                }
                Err(RunError::DeadlineExceeded(budget)) if attempt == 0 => {
                    warn!(
                        source = %source,
                        budget_secs = budget.as_secs(),
                        "run exceeded its deadline, retrying once from the start"
                    );
                }
                Err(RunError::DeadlineExceeded(_)) => {
                    error!(source = %source, "run exceeded its deadline on the retry, skipping");
                    return RunOutcome {
                        report: None,
                        retried: true,
                    };
                }
                Err(err) => {
                    error!(source = %source, error = %err, retried, "source run failed, skipping");
                    return RunOutcome {
                        report: None,
                        retried,
                    };
                }
            }
        }

        // Both attempts expired.
        RunOutcome {
            report: None,
            retried: true,
        }
    }

    async fn run_once(&self, connector: &dyn SourceConnector) -> Result<PipelineReport, RunError> {
        let budget = Arc::new(DeadlineBudget::new(self.settings.run_deadline));
        let pipeline = ExtractionPipeline::new(
            connector.name(),
            self.extractor.clone(),
            self.sink.clone(),
            budget.clone(),
            PipelineOptions {
                batch_size: self.settings.batch_size,
                flush_threshold: self.settings.flush_threshold,
                batch_time_estimate: self.settings.batch_time_estimate,
                reprocess_time_estimate: self.settings.reprocess_time_estimate,
            },
        );

        let work = async {
            debug!(source = connector.name(), "fetching raw records");
            let records = connector
                .fetch_raw_records()
                .await
                .map_err(RunError::Source)?;
            debug!(source = connector.name(), records = records.len(), "extracting");
            pipeline
                .run(records, self.settings.concurrency_limit)
                .await
        };

        // The budget is the sole cancellation signal: when it wins the
        // race, the in-flight work is dropped and pending batches never
        // start. Rows already persisted stay valid.
        tokio::select! {
            result = work => result,
            _ = budget.wait_expired() => Err(RunError::DeadlineExceeded(self.settings.run_deadline)),
        }
    }

    /// Runs every connector, at most `max_concurrent_sources` at a time.
    /// Returns one outcome per connector, in input order.
    pub async fn run_all(
        &self,
        connectors: &[Box<dyn SourceConnector>],
    ) -> Vec<(String, RunOutcome)> {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_sources.max(1)));

        let runs = connectors.iter().map(|connector| {
            let semaphore = semaphore.clone();
            async move {
                // Never closed while runs are pending.
                let _permit = semaphore.acquire().await.ok();
                let outcome = self.run_source(connector.as_ref()).await;
                (connector.name().to_string(), outcome)
            }
        });

        let outcomes = join_all(runs).await;

        let skipped = outcomes.iter().filter(|(_, o)| o.skipped()).count();
        info!(
            sources = outcomes.len(),
            skipped,
            "finished scraping sources"
        );
        outcomes
    }
}
