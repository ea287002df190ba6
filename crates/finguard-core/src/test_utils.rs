//! Synthetic datasets and pre-trained artifacts for tests

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::forest::ForestConfig;
use crate::models::{LabeledRecord, TransactionRecord};
use crate::trainer::{TrainedArtifacts, Trainer, TrainerConfig};

/// Labeled records with clearly separated classes
///
/// Legitimate rows are small purchases and payments; fraudulent rows are
/// large transfers and withdrawals. Amounts stay within [10, 50000].
pub fn labeled_dataset(legit: usize, fraud: usize, seed: u64) -> Vec<LabeledRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(legit + fraud);

    for _ in 0..legit {
        let amount = rng.gen_range(10.0..500.0);
        let category = ["purchase", "payment"].choose(&mut rng).copied().unwrap_or("purchase");
        let ttype = ["credit", "debit"].choose(&mut rng).copied().unwrap_or("debit");
        records.push(LabeledRecord::new(
            TransactionRecord::new(amount, category, ttype),
            false,
        ));
    }
    for _ in 0..fraud {
        let amount = rng.gen_range(20_000.0..=50_000.0);
        let category = ["transfer", "withdrawal"]
            .choose(&mut rng)
            .copied()
            .unwrap_or("transfer");
        records.push(LabeledRecord::new(
            TransactionRecord::new(amount, category, "debit"),
            true,
        ));
    }

    records.shuffle(&mut rng);
    records
}

/// Small forest so tests stay fast
pub fn quick_config() -> TrainerConfig {
    TrainerConfig {
        forest: ForestConfig {
            n_estimators: 25,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn trained_artifacts() -> TrainedArtifacts {
    Trainer::with_config(quick_config())
        .train(&labeled_dataset(30, 10, 99))
        .unwrap()
}
