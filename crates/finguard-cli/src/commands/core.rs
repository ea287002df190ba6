//! Shared command utilities
//!
//! - `load_config` - Resolve the config file and command-line overrides
//! - `open_store` - Artifact store for the configured directory
//! - `build_record` - Transaction record from command-line fields

use std::path::Path;

use anyhow::{Context, Result};
use finguard_core::{ArtifactStore, FinguardConfig, TransactionRecord};
use tracing::debug;

/// Load the config file and apply `--artifacts-dir`
pub fn load_config(path: Option<&Path>, artifacts_dir: Option<&Path>) -> Result<FinguardConfig> {
    let mut config = FinguardConfig::load(path).context("Failed to load configuration")?;
    if let Some(dir) = artifacts_dir {
        config.artifacts_dir = dir.to_path_buf();
    }
    debug!(artifacts = %config.artifacts_dir.display(), policy = %config.policy, "Configuration loaded");
    Ok(config)
}

pub fn open_store(config: &FinguardConfig) -> ArtifactStore {
    ArtifactStore::new(&config.artifacts_dir)
}

pub fn build_record(
    amount: f64,
    category: Option<String>,
    transaction_type: Option<String>,
) -> TransactionRecord {
    TransactionRecord {
        amount: Some(amount),
        category,
        transaction_type,
    }
}

/// Format a probability as a percentage
pub fn percent(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}
