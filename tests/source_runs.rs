//! Run orchestration: deadlines, retries and per-source isolation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use dealscout::orchestrator::RunOrchestrator;
use dealscout::sink::MemorySink;
use dealscout::source::SourceConnector;
use dealscout::{ProductExtractor, RawRecord, Settings};
use dealscout_oracle::client::{OracleClient, ToolCallResult, ToolDefinition};
use dealscout_oracle::OracleError;

/// Oracle that answers every batch with one fixed product.
struct FixedOracle;

#[async_trait]
impl OracleClient for FixedOracle {
    async fn extract_with_tool(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        tool: &ToolDefinition,
    ) -> Result<ToolCallResult, OracleError> {
        Ok(ToolCallResult {
            tool_name: tool.name.clone(),
            arguments: json!({
                "products": [{ "brand_name": "Kraft", "product_name": "Cheese" }]
            }),
        })
    }

    fn model_name(&self) -> &str {
        "fixed"
    }

    fn provider_name(&self) -> &str {
        "Fixed"
    }
}

/// Connector that never finishes fetching.
struct StalledSource {
    attempts: AtomicUsize,
}

impl StalledSource {
    fn new() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SourceConnector for StalledSource {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn fetch_raw_records(&self) -> anyhow::Result<Vec<RawRecord>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

/// Connector that fails outright.
struct BrokenSource;

#[async_trait]
impl SourceConnector for BrokenSource {
    fn name(&self) -> &str {
        "broken"
    }

    async fn fetch_raw_records(&self) -> anyhow::Result<Vec<RawRecord>> {
        anyhow::bail!("circular endpoint moved")
    }
}

/// Healthy connector serving two records.
struct HealthySource;

#[async_trait]
impl SourceConnector for HealthySource {
    fn name(&self) -> &str {
        "healthy"
    }

    async fn fetch_raw_records(&self) -> anyhow::Result<Vec<RawRecord>> {
        let mut record = RawRecord::new();
        record.insert("name".into(), Value::String("Cheese $2.99".into()));
        Ok(vec![record.clone(), record])
    }
}

fn orchestrator(sink: Arc<MemorySink>, deadline: Duration) -> RunOrchestrator {
    let settings = Settings {
        run_deadline: deadline,
        ..Settings::default()
    };
    RunOrchestrator::new(ProductExtractor::new(Arc::new(FixedOracle)), sink, settings)
}

#[tokio::test(start_paused = true)]
async fn deadline_expiry_retries_once_then_skips() {
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(sink.clone(), Duration::from_secs(1));
    let source = StalledSource::new();

    let outcome = orchestrator.run_source(&source).await;

    assert!(outcome.skipped());
    assert!(outcome.retried);
    assert_eq!(source.attempts.load(Ordering::SeqCst), 2, "one retry, no more");
    assert!(sink.rows("stalled").is_empty());
}

#[tokio::test]
async fn connector_errors_skip_without_retry() {
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(sink, Duration::from_secs(240));

    let outcome = orchestrator.run_source(&BrokenSource).await;

    assert!(outcome.skipped());
    assert!(!outcome.retried);
}

#[tokio::test]
async fn healthy_source_completes_and_reports() {
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(sink.clone(), Duration::from_secs(240));

    let outcome = orchestrator.run_source(&HealthySource).await;

    let report = outcome.report.expect("completed run");
    assert!(!outcome.retried);
    assert_eq!(report.persisted, 1, "one batch, one product row");
    assert_eq!(sink.rows("healthy").len(), 1);
    assert!(sink.finalized("healthy"));
}

#[tokio::test(start_paused = true)]
async fn one_source_failing_never_touches_its_siblings() {
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(sink.clone(), Duration::from_secs(30));

    let connectors: Vec<Box<dyn SourceConnector>> = vec![
        Box::new(StalledSource::new()),
        Box::new(BrokenSource),
        Box::new(HealthySource),
    ];
    let outcomes = orchestrator.run_all(&connectors).await;

    assert_eq!(outcomes.len(), 3);
    let by_name = |name: &str| {
        outcomes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, o)| o)
            .expect("outcome")
    };
    assert!(by_name("stalled").skipped());
    assert!(by_name("broken").skipped());
    assert!(!by_name("healthy").skipped());
    assert_eq!(sink.rows("healthy").len(), 1);
}
