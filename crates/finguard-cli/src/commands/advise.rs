//! Advise command: model verdict + assistance heuristic

use anyhow::Result;
use finguard_core::policy::{recommendations, resolve};
use finguard_core::{
    Decision, DecisionSource, FinancialSnapshot, FinguardConfig, FraudVerdict, TransactionRecord,
};

use super::score;

/// Resolve the configured policy for a user
pub fn decide(
    config: &FinguardConfig,
    snapshot: &FinancialSnapshot,
    record: Option<&TransactionRecord>,
) -> Result<(Decision, FraudVerdict)> {
    let verdict = match record {
        Some(record) => score(config, record)?,
        None => FraudVerdict::Untrained,
    };
    let decision = resolve(config.policy, &config.heuristic, &verdict, snapshot);
    Ok((decision, verdict))
}

pub fn cmd_advise(
    config: &FinguardConfig,
    snapshot: &FinancialSnapshot,
    record: Option<&TransactionRecord>,
) -> Result<()> {
    let (decision, verdict) = decide(config, snapshot, record)?;

    println!();
    println!("   Net savings: {:.2}", snapshot.net_savings());
    println!("   Credit score: {:.0}", snapshot.credit_score);
    if let Some(probability) = verdict.probability() {
        println!("   Fraud probability: {}", super::percent(probability));
    } else if record.is_some() {
        println!("   Model: not trained, using heuristic");
    }

    let source = match decision.source {
        DecisionSource::Model => "model",
        DecisionSource::Heuristic => "heuristic",
        DecisionSource::Both => "model + heuristic",
    };
    println!();
    if decision.flagged {
        println!("⚠️  Assistance recommended (by {})", source);
    } else {
        println!("✅ No assistance needed (by {})", source);
    }

    println!();
    println!("💡 Recommendations:");
    for tip in recommendations(&config.heuristic, snapshot, decision.flagged) {
        println!("   - {}", tip);
    }
    println!();

    Ok(())
}
