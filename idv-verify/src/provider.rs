//! Identity data providers
//!
//! A provider delivers the complete batch of identities before any ranking
//! happens. The JSON file layout is the one written by the scraping tools:
//!
//! ```json
//! { "allData": [ { "observed": { ... }, "IRL_image": "...", "online": [ { ... } ] } ] }
//! ```

use crate::models::{IdentityEntry, IdentitySummary};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Data loading errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid identity data: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct DatasetFile {
    #[serde(rename = "allData")]
    all_data: Vec<IdentityEntry>,
}

/// Immutable batch of identities
#[derive(Debug, Clone, Default)]
pub struct IdentityDataset {
    identities: Vec<IdentityEntry>,
}

impl IdentityDataset {
    pub fn new(identities: Vec<IdentityEntry>) -> Self {
        Self { identities }
    }

    /// Parse the `{"allData": [...]}` document
    pub fn from_json_str(json: &str) -> Result<Self, ProviderError> {
        let file: DatasetFile = serde_json::from_str(json)?;
        Ok(Self::new(file.all_data))
    }

    pub fn get(&self, index: usize) -> Option<&IdentityEntry> {
        self.identities.get(index)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn summaries(&self) -> Vec<IdentitySummary> {
        self.identities
            .iter()
            .enumerate()
            .map(|(index, entry)| entry.summary(index))
            .collect()
    }
}

/// Source of identity batches
pub trait DataProvider {
    fn load(&self) -> Result<IdentityDataset, ProviderError>;
}

/// Reads the dataset from a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataProvider for JsonFileProvider {
    fn load(&self) -> Result<IdentityDataset, ProviderError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| ProviderError::Read {
            path: self.path.clone(),
            source,
        })?;
        let dataset = IdentityDataset::from_json_str(&content)?;
        tracing::info!(
            path = %self.path.display(),
            identities = dataset.len(),
            candidates = dataset.identities.iter().map(|e| e.candidates.len()).sum::<usize>(),
            "Identity data loaded"
        );
        Ok(dataset)
    }
}
