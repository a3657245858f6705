//! Destination store seam.
//!
//! Each source appends to its own destination; nothing else writes there.
//! The pipeline batches rows before calling [`DealSink::append_rows`], so
//! implementations only need sequential append semantics.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::SinkError;
use crate::schema::DealRecord;

/// Append-only, per-source tabular sink.
#[async_trait]
pub trait DealSink: Send + Sync {
    /// Clears any previous rows for `source` and prepares a fresh
    /// destination.
    async fn reset(&self, source: &str) -> Result<(), SinkError>;

    /// Appends a buffered block of rows.
    async fn append_rows(&self, source: &str, rows: &[DealRecord]) -> Result<(), SinkError>;

    /// Cosmetic normalization once a run finishes.
    async fn finalize(&self, source: &str) -> Result<(), SinkError>;
}

/// JSON-lines sink: one record per line in `<dir>/<source>.jsonl`.
pub struct JsonlSink {
    dir: PathBuf,
}

impl JsonlSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, source: &str) -> PathBuf {
        self.dir.join(format!("{source}.jsonl"))
    }

    /// Loads every persisted record for `source`.
    pub async fn load(&self, source: &str) -> Result<Vec<DealRecord>, SinkError> {
        let raw = tokio::fs::read_to_string(self.path_for(source)).await?;
        let mut records = Vec::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            records.push(serde_json::from_str(line)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl DealSink for JsonlSink {
    async fn reset(&self, source: &str) -> Result<(), SinkError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(source), b"").await?;
        Ok(())
    }

    async fn append_rows(&self, source: &str, rows: &[DealRecord]) -> Result<(), SinkError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(source))
            .await?;
        let mut buf = String::new();
        for row in rows {
            buf.push_str(&serde_json::to_string(row)?);
            buf.push('\n');
        }
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn finalize(&self, source: &str) -> Result<(), SinkError> {
        // Cosmetic pass: collapse stray whitespace in the text columns and
        // rewrite the file in one piece.
        let mut records = self.load(source).await?;
        for record in &mut records {
            for field in [
                &mut record.brand_name,
                &mut record.product_name,
                &mut record.product_variety,
                &mut record.description,
            ] {
                if let Some(text) = field.take() {
                    let cleaned = collapse_whitespace(&text);
                    if !cleaned.is_empty() {
                        *field = Some(cleaned);
                    }
                }
            }
        }
        let mut buf = String::new();
        for record in &records {
            buf.push_str(&serde_json::to_string(record)?);
            buf.push('\n');
        }
        tokio::fs::write(self.path_for(source), buf).await?;
        Ok(())
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// In-memory sink for tests and dry runs.
#[derive(Default)]
pub struct MemorySink {
    rows: Mutex<HashMap<String, Vec<DealRecord>>>,
    finalized: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, source: &str) -> Vec<DealRecord> {
        self.rows
            .lock()
            .expect("sink lock")
            .get(source)
            .cloned()
            .unwrap_or_default()
    }

    pub fn finalized(&self, source: &str) -> bool {
        self.finalized
            .lock()
            .expect("sink lock")
            .iter()
            .any(|s| s == source)
    }
}

#[async_trait]
impl DealSink for MemorySink {
    async fn reset(&self, source: &str) -> Result<(), SinkError> {
        self.rows
            .lock()
            .expect("sink lock")
            .insert(source.to_string(), Vec::new());
        Ok(())
    }

    async fn append_rows(&self, source: &str, rows: &[DealRecord]) -> Result<(), SinkError> {
        self.rows
            .lock()
            .expect("sink lock")
            .entry(source.to_string())
            .or_default()
            .extend_from_slice(rows);
        Ok(())
    }

    async fn finalize(&self, source: &str) -> Result<(), SinkError> {
        self.finalized
            .lock()
            .expect("sink lock")
            .push(source.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(brand: &str, product: &str) -> DealRecord {
        DealRecord {
            brand_name: Some(brand.to_string()),
            product_name: Some(product.to_string()),
            ..DealRecord::default()
        }
    }

    #[tokio::test]
    async fn jsonl_round_trip_and_reset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = JsonlSink::new(dir.path());

        sink.reset("kroger").await.expect("reset");
        sink.append_rows("kroger", &[record("Kraft", "Cheese"), record("Heinz", "Ketchup")])
            .await
            .expect("append");

        let rows = sink.load("kroger").await.expect("load");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].brand_name.as_deref(), Some("Kraft"));

        sink.reset("kroger").await.expect("reset");
        assert!(sink.load("kroger").await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn finalize_collapses_whitespace() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = JsonlSink::new(dir.path());

        sink.reset("publix").await.expect("reset");
        sink.append_rows("publix", &[record("Coca  Cola", "Soda   12pk")])
            .await
            .expect("append");
        sink.finalize("publix").await.expect("finalize");

        let rows = sink.load("publix").await.expect("load");
        assert_eq!(rows[0].brand_name.as_deref(), Some("Coca Cola"));
        assert_eq!(rows[0].product_name.as_deref(), Some("Soda 12pk"));
    }

    #[tokio::test]
    async fn jsonl_serialization_keeps_canonical_field_order() {
        let line = serde_json::to_string(&record("Kraft", "Cheese")).expect("json");
        let positions: Vec<usize> = crate::schema::CANONICAL_COLUMNS
            .iter()
            .map(|col| line.find(&format!("\"{col}\"")).expect("column present"))
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted, "columns serialize in canonical order");
    }

    #[tokio::test]
    async fn memory_sink_tracks_finalize() {
        let sink = MemorySink::new();
        sink.reset("heb").await.expect("reset");
        sink.append_rows("heb", &[record("HEB", "Tortillas")])
            .await
            .expect("append");
        assert_eq!(sink.rows("heb").len(), 1);
        assert!(!sink.finalized("heb"));
        sink.finalize("heb").await.expect("finalize");
        assert!(sink.finalized("heb"));
    }

    #[test]
    fn collapse_whitespace_examples() {
        assert_eq!(collapse_whitespace("  a \t b\n c "), "a b c");
    }
}
