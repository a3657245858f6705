//! Command-line entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dealscout::schema::TextColumn;
use dealscout::sink::JsonlSink;
use dealscout::source::{FixtureSource, SourceRegistry};
use dealscout::{
    create_oracle_client, match_columns, ProductExtractor, RetryPolicy, RetryingTransport,
    RunOrchestrator, Settings,
};

#[derive(Parser)]
#[command(name = "dealscout", about = "Scrape deals, normalize them, match coupons")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape every configured source and persist canonical deal records.
    Run,
    /// Fuzzy-match two persisted record sets (coupons against deals).
    Match {
        /// JSONL file with the coupon-side records.
        coupons: PathBuf,
        /// JSONL file with the deal-side records.
        deals: PathBuf,
        /// Minimum similarity score (0-100, inclusive).
        #[arg(long, default_value_t = 90)]
        threshold: u32,
        /// Best matches kept per value; unbounded when omitted.
        #[arg(long)]
        limit: Option<usize>,
        /// Write match groups here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Run => run_sources().await,
        Command::Match {
            coupons,
            deals,
            threshold,
            limit,
            out,
        } => run_matchups(coupons, deals, threshold, limit, out).await,
    }
}

async fn run_sources() -> Result<()> {
    let settings = Settings::from_env().context("loading settings")?;
    if settings.included_sources.is_empty() {
        tracing::warn!("no sources configured - set DEALSCOUT_SOURCES");
        return Ok(());
    }

    let transport = Arc::new(RetryingTransport::new(
        reqwest::Client::new(),
        RetryPolicy::default().with_max_attempts(settings.max_attempts),
    ));
    let oracle = create_oracle_client(transport).context("constructing oracle client")?;
    let extractor = ProductExtractor::new(oracle);
    let sink = Arc::new(JsonlSink::new(settings.output_dir.clone()));

    let mut registry = SourceRegistry::new();
    for name in &settings.included_sources {
        let source_name = name.clone();
        registry.register(name, move |settings| {
            FixtureSource::from_settings(&source_name, settings)
        });
    }

    let connectors = registry.build_included(&settings);
    let orchestrator = RunOrchestrator::new(extractor, sink, settings);
    orchestrator.run_all(&connectors).await;
    Ok(())
}

async fn run_matchups(
    coupons: PathBuf,
    deals: PathBuf,
    threshold: u32,
    limit: Option<usize>,
    out: Option<PathBuf>,
) -> Result<()> {
    let coupon_records = load_records(&coupons).await?;
    let deal_records = load_records(&deals).await?;

    let columns = [
        TextColumn::BrandName,
        TextColumn::ProductName,
        TextColumn::ProductVariety,
    ];
    let groups = match_columns(
        &coupon_records,
        &deal_records,
        &columns,
        &columns,
        threshold,
        limit,
    )?;

    tracing::info!(
        coupons = coupon_records.len(),
        deals = deal_records.len(),
        groups = groups.len(),
        "matchups complete"
    );

    let rendered = serde_json::to_string_pretty(&groups)?;
    match out {
        Some(path) => tokio::fs::write(&path, rendered)
            .await
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}

async fn load_records(path: &PathBuf) -> Result<Vec<dealscout::DealRecord>> {
    let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .context("record file needs a name")?;
    let sink = JsonlSink::new(dir);
    sink.load(stem)
        .await
        .with_context(|| format!("loading {}", path.display()))
}
