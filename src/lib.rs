//! Promotional-deal aggregation.
//!
//! Scrapes deal and coupon records from heterogeneous sources, normalizes
//! them into a canonical schema through an LLM extraction oracle, and joins
//! deals against coupons with approximate string matching.
//!
//! ## Architecture
//!
//! ```text
//! SourceConnector → RawRecords → ExtractionPipeline ─→ DealSink
//!                                  (oracle batches,      │
//!                                   deadline budget)     ▼
//!                              FuzzyRecordMatcher ← canonical records
//! ```
//!
//! Everything network-bound goes through the shared retrying transport in
//! `dealscout-net`; oracle access lives in `dealscout-oracle`.

pub mod budget;
pub mod config;
pub mod error;
pub mod matching;
pub mod orchestrator;
pub mod pipeline;
pub mod schema;
pub mod sink;
pub mod source;

// Re-exports for convenience
pub use budget::DeadlineBudget;
pub use config::Settings;
pub use dealscout_net::{RetryPolicy, RetryingTransport, TransportError};
pub use dealscout_oracle::{
    create_oracle_client, OracleError, ProductExtractor, RawProduct, RawRecord,
};
pub use error::{ConfigError, MatchError, RunError, SinkError};
pub use matching::{match_columns, MatchGroup, MatchKey, MatchedRow};
pub use orchestrator::{RunOrchestrator, RunOutcome};
pub use pipeline::{ExtractionPipeline, PipelineOptions, PipelineReport};
pub use schema::{DealRecord, DealType, TextColumn, CANONICAL_COLUMNS};
pub use sink::{DealSink, JsonlSink, MemorySink};
pub use source::{FixtureSource, SourceConnector, SourceRegistry};
