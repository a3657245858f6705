//! Extraction-oracle clients.
//!
//! This crate turns batches of raw scraped records into structured product
//! rows by forcing an LLM function call (`extract_rows`). It has no pipeline
//! dependencies - batching, reprocessing and persistence stay in `dealscout`.
//!
//! ## Architecture
//!
//! ```text
//! RawRecord batch → prompt template → OracleClient (tool call) → products
//! ```
//!
//! ## Backend Selection
//!
//! Set the `ORACLE_BACKEND` environment variable:
//! - `gemini` (default): Google Gemini API (`GOOGLE_API_KEY`)
//! - `openai`: OpenAI API (`OPENAI_API_KEY`)

pub mod backend;
pub mod client;
pub mod client_factory;
pub mod error;
pub mod extract;
pub mod gemini_client;
pub mod openai_client;
pub mod prompt;
pub mod tool;

/// A raw scraped record: an open mapping with no fixed schema.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// A partial product row as returned by the oracle, prior to canonicalization.
pub type RawProduct = serde_json::Map<String, serde_json::Value>;

// Re-exports for convenience
pub use backend::OracleBackend;
pub use client::{OracleClient, ToolCallResult, ToolDefinition};
pub use client_factory::create_oracle_client;
pub use error::OracleError;
pub use extract::ProductExtractor;
