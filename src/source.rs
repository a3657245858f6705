//! Source connectors and their registry.
//!
//! Connectors own all site-specific logic and only promise one thing: a
//! list of raw records. Which connectors run is decided by an explicit
//! name-to-factory registry populated at startup; a factory validates its
//! configuration up front so a misconfigured source is skipped before any
//! network activity.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::warn;

use crate::config::Settings;
use crate::error::ConfigError;
use crate::RawRecord;

/// A scraping integration for one source.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    fn name(&self) -> &str;

    /// Fetches every raw record currently advertised by the source.
    async fn fetch_raw_records(&self) -> anyhow::Result<Vec<RawRecord>>;
}

type Factory =
    Box<dyn Fn(&Settings) -> Result<Box<dyn SourceConnector>, ConfigError> + Send + Sync>;

/// Explicit name → connector-factory mapping.
#[derive(Default)]
pub struct SourceRegistry {
    factories: HashMap<String, Factory>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Settings) -> Result<Box<dyn SourceConnector>, ConfigError> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Builds the connector registered under `name`.
    pub fn build(
        &self,
        name: &str,
        settings: &Settings,
    ) -> Result<Box<dyn SourceConnector>, ConfigError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownSource(name.to_string()))?;
        factory(settings)
    }

    /// Builds every included source; misconfigured ones are logged and
    /// dropped here, before any network activity.
    pub fn build_included(&self, settings: &Settings) -> Vec<Box<dyn SourceConnector>> {
        let mut connectors = Vec::new();
        for name in &settings.included_sources {
            match self.build(name, settings) {
                Ok(connector) => connectors.push(connector),
                Err(err) => warn!(source = %name, error = %err, "skipping source"),
            }
        }
        connectors
    }
}

/// File-backed connector: reads a JSON array of raw records from disk.
///
/// Useful for replaying captured payloads and for end-to-end runs without
/// live site access. Configured via `DEALSCOUT_SOURCE_<NAME>_PATH`.
pub struct FixtureSource {
    name: String,
    path: PathBuf,
}

impl FixtureSource {
    /// Factory for the registry; errors when the source has no configured
    /// records path.
    pub fn from_settings(
        name: &str,
        settings: &Settings,
    ) -> Result<Box<dyn SourceConnector>, ConfigError> {
        let path = settings
            .source_records_path(name)
            .ok_or_else(|| ConfigError::MissingSource(name.to_string()))?;
        Ok(Box::new(Self {
            name: name.to_string(),
            path,
        }))
    }

    pub fn new(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl SourceConnector for FixtureSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_raw_records(&self) -> anyhow::Result<Vec<RawRecord>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let records: Vec<RawRecord> = serde_json::from_str(&raw)?;
        Ok(records)
    }
}
