//! Train command

use std::path::PathBuf;

use anyhow::{Context, Result};
use finguard_core::{CsvSource, Error, FinguardConfig, RecordSource, SqliteSource, Trainer};
use tracing::info;

use super::{open_store, percent};

/// Where labeled training records come from
pub enum TrainInput {
    Csv(PathBuf),
    Sqlite { path: PathBuf, table: Option<String> },
}

impl TrainInput {
    fn source(&self) -> Result<Box<dyn RecordSource>> {
        Ok(match self {
            TrainInput::Csv(path) => Box::new(CsvSource::new(path)),
            TrainInput::Sqlite { path, table } => Box::new(
                SqliteSource::open(path, table.as_deref()).context("Invalid SQLite source")?,
            ),
        })
    }
}

pub fn cmd_train(
    config: &FinguardConfig,
    input: TrainInput,
    break_lock: bool,
) -> Result<()> {
    let store = open_store(config);

    if break_lock && store.break_lock()? {
        println!("⚠️  Removed stale training lock");
    }
    let lock = match store.lock() {
        Ok(lock) => lock,
        Err(Error::Locked(path)) => anyhow::bail!(
            "Another training run holds {}. If it crashed, rerun with --break-lock",
            path
        ),
        Err(e) => return Err(e).context("Failed to lock artifact directory"),
    };

    let source = input.source()?;
    println!("📥 Loading records from {}...", source.describe());
    let records = source
        .load_labeled()
        .with_context(|| format!("Failed to read {}", source.describe()))?;
    println!("   Loaded {} labeled records", records.len());

    println!("🏋️  Training ({} trees)...", config.trainer.forest.n_estimators);
    let artifacts = Trainer::with_config(config.trainer.clone())
        .train(&records)
        .context("Training failed")?;

    let manifest = store
        .publish(&lock, &artifacts)
        .context("Failed to publish artifacts")?;
    info!(version = %manifest.version_tag, "Training run published");

    let report = &manifest.report;
    println!();
    println!("📊 Training Report");
    println!("   ─────────────────────────────────────────────");
    println!(
        "   Before balancing: {} fraud / {} legitimate",
        report.fraud_before, report.legit_before
    );
    println!(
        "   After balancing:  {} fraud / {} legitimate",
        report.fraud_after, report.legit_after
    );
    println!(
        "   Split:            {} train / {} test",
        report.train_size, report.test_size
    );
    match report.test_accuracy {
        Some(accuracy) => println!("   Test accuracy:    {}", percent(accuracy)),
        None => println!("   Test accuracy:    (no held-out rows)"),
    }
    println!();
    println!("✅ Published {} to {}", manifest.version_tag, store.dir().display());

    Ok(())
}
