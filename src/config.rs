//! Runtime tunables.
//!
//! Everything is environment-backed (`DEALSCOUT_*`), with defaults sized for
//! polite scraping: small oracle fan-out, small source fan-out, tiny
//! batches. A `.env` file is honored when present.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Source names to run, in registry order.
    pub included_sources: Vec<String>,
    /// Simultaneous in-flight oracle calls per source.
    pub concurrency_limit: usize,
    /// Simultaneous source runs.
    pub max_concurrent_sources: usize,
    /// Raw records per oracle batch.
    pub batch_size: usize,
    /// Buffered rows per physical sink write.
    pub flush_threshold: usize,
    /// Wall-clock ceiling per source run.
    pub run_deadline: Duration,
    /// Budget extension per dispatched oracle batch.
    pub batch_time_estimate: Duration,
    /// Budget extension per record queued for reprocessing.
    pub reprocess_time_estimate: Duration,
    /// Transport attempt ceiling.
    pub max_attempts: u32,
    /// Destination directory for persisted records.
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            included_sources: Vec::new(),
            concurrency_limit: 2,
            max_concurrent_sources: 2,
            batch_size: 2,
            flush_threshold: 30,
            run_deadline: Duration::from_secs(240),
            batch_time_estimate: Duration::from_secs(20),
            reprocess_time_estimate: Duration::from_secs(20),
            max_attempts: 10,
            output_dir: PathBuf::from("output/stores"),
        }
    }
}

impl Settings {
    /// Loads settings from the environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Ok(Self {
            included_sources: list_var("DEALSCOUT_SOURCES"),
            concurrency_limit: usize_var("DEALSCOUT_CONCURRENCY", defaults.concurrency_limit)?,
            max_concurrent_sources: usize_var(
                "DEALSCOUT_MAX_SOURCES",
                defaults.max_concurrent_sources,
            )?,
            batch_size: usize_var("DEALSCOUT_BATCH_SIZE", defaults.batch_size)?.max(1),
            flush_threshold: usize_var("DEALSCOUT_FLUSH_THRESHOLD", defaults.flush_threshold)?
                .max(1),
            run_deadline: secs_var("DEALSCOUT_RUN_DEADLINE_SECS", defaults.run_deadline)?,
            batch_time_estimate: secs_var(
                "DEALSCOUT_BATCH_ESTIMATE_SECS",
                defaults.batch_time_estimate,
            )?,
            reprocess_time_estimate: secs_var(
                "DEALSCOUT_REPROCESS_ESTIMATE_SECS",
                defaults.reprocess_time_estimate,
            )?,
            max_attempts: u32_var("DEALSCOUT_MAX_ATTEMPTS", defaults.max_attempts)?.max(1),
            output_dir: std::env::var("DEALSCOUT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        })
    }

    /// Per-source fixture path: `DEALSCOUT_SOURCE_<NAME>_PATH`.
    pub fn source_records_path(&self, source: &str) -> Option<PathBuf> {
        let key = format!(
            "DEALSCOUT_SOURCE_{}_PATH",
            source.to_ascii_uppercase().replace('-', "_")
        );
        std::env::var(key).ok().map(PathBuf::from)
    }
}

fn list_var(key: &str) -> Vec<String> {
    std::env::var(key)
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn usize_var(key: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            message: format!("expected an integer, got '{raw}'"),
        }),
        Err(_) => Ok(default),
    }
}

fn u32_var(key: &str, default: u32) -> Result<u32, ConfigError> {
    usize_var(key, default as usize).map(|v| v as u32)
}

fn secs_var(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    usize_var(key, default.as_secs() as usize).map(|secs| Duration::from_secs(secs as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_polite() {
        let settings = Settings::default();
        assert_eq!(settings.concurrency_limit, 2);
        assert_eq!(settings.batch_size, 2);
        assert_eq!(settings.flush_threshold, 30);
        assert_eq!(settings.run_deadline, Duration::from_secs(240));
    }

    #[test]
    fn list_parsing_trims_and_drops_empties() {
        std::env::set_var("DEALSCOUT_TEST_LIST", "kroger, publix , ,food-city");
        let parsed = list_var("DEALSCOUT_TEST_LIST");
        assert_eq!(parsed, vec!["kroger", "publix", "food-city"]);
        std::env::remove_var("DEALSCOUT_TEST_LIST");
    }
}
