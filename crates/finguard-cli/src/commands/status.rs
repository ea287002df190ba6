//! Status and feature listing commands

use anyhow::{Context, Result};
use finguard_core::features::{vocabulary_hash, SCHEMA_VERSION};
use finguard_core::{feature_names, ArtifactStatus, FinguardConfig};

use super::{open_store, percent};

pub fn cmd_status(config: &FinguardConfig) -> Result<()> {
    let store = open_store(config);

    println!();
    println!("📊 Finguard Status");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Artifacts: {}", store.dir().display());
    println!("   Policy: {}", config.policy);

    match store.status().context("Failed to read artifact directory")? {
        ArtifactStatus::Untrained => {
            println!("   Model: (not trained)");
            println!();
            println!("   Run: finguard train --csv history.csv");
        }
        ArtifactStatus::Trained(manifest) => {
            println!("   Model: ✅ {}", manifest.version_tag);
            println!(
                "   Trained: {}",
                manifest.trained_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!(
                "   Records: {} ({} fraud)",
                manifest.report.total_records, manifest.report.fraud_before
            );
            if let Some(accuracy) = manifest.report.test_accuracy {
                println!("   Test accuracy: {}", percent(accuracy));
            }
        }
        ArtifactStatus::Invalid(reason) => {
            println!("   Model: ❌ {}", reason);
            println!();
            println!("   Retrain to replace the artifacts");
        }
    }

    println!();
    Ok(())
}

pub fn cmd_features() -> Result<()> {
    println!("Feature schema v{}", SCHEMA_VERSION);
    println!("Vocabulary hash: {}", vocabulary_hash());
    println!();
    for (i, name) in feature_names().iter().enumerate() {
        println!("  {:>2}  {}", i, name);
    }
    Ok(())
}
