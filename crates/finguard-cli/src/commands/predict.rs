//! Predict command

use anyhow::{Context, Result};
use finguard_core::{FinguardConfig, FraudVerdict, Predictor, TransactionRecord};

use super::{open_store, percent};

pub fn cmd_predict(config: &FinguardConfig, record: &TransactionRecord, json: bool) -> Result<()> {
    let verdict = score(config, record)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    match verdict {
        FraudVerdict::Scored {
            is_fraud,
            probability,
        } => {
            if is_fraud {
                println!("🚨 Likely fraud ({} probability)", percent(probability));
            } else {
                println!("✅ Looks legitimate ({} fraud probability)", percent(probability));
            }
        }
        FraudVerdict::Untrained => {
            println!("⚠️  No trained model in {}", config.artifacts_dir.display());
            println!("   Run: finguard train --csv history.csv");
        }
    }

    Ok(())
}

/// Load the current artifacts and score one record
pub fn score(config: &FinguardConfig, record: &TransactionRecord) -> Result<FraudVerdict> {
    let predictor = Predictor::load(open_store(config)).context("Failed to load model artifacts")?;
    predictor
        .predict(record)
        .context("Failed to score transaction")
}
