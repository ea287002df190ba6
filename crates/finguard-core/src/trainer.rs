//! Batch training of the scaler + classifier pair
//!
//! encode → fit scaler on `amount_log` → scale → SMOTE → stratified split →
//! fit forest → held-out accuracy.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::features::{encode, FeatureVector};
use crate::forest::{ForestConfig, RandomForest};
use crate::models::{LabeledRecord, TrainingReport};
use crate::scaler::StandardScaler;
use crate::smote::{self, DEFAULT_K_NEIGHBORS};

/// Training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Seed for oversampling and the train/test shuffle
    pub seed: u64,
    /// Fraction of the balanced data held out for accuracy reporting
    pub test_size: f64,
    pub k_neighbors: usize,
    pub forest: ForestConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_size: 0.2,
            k_neighbors: DEFAULT_K_NEIGHBORS,
            forest: ForestConfig::default(),
        }
    }
}

/// Output of a training run: the matched artifact pair plus its report
#[derive(Debug)]
pub struct TrainedArtifacts {
    pub scaler: StandardScaler,
    pub classifier: RandomForest,
    pub report: TrainingReport,
}

pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new() -> Self {
        Self::with_config(TrainerConfig::default())
    }

    pub fn with_config(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn train(&self, records: &[LabeledRecord]) -> Result<TrainedArtifacts> {
        if records.is_empty() {
            return Err(Error::EmptyDataset);
        }
        if !(0.0..1.0).contains(&self.config.test_size) {
            return Err(Error::Config(format!(
                "test_size must be in [0, 1), got {}",
                self.config.test_size
            )));
        }

        let mut samples: Vec<FeatureVector> =
            records.iter().map(|r| encode(&r.record)).collect();
        let labels: Vec<bool> = records.iter().map(|r| r.is_fraud).collect();

        let fraud_before = labels.iter().filter(|&&l| l).count();
        let legit_before = labels.len() - fraud_before;
        info!(
            records = records.len(),
            fraud = fraud_before,
            legit = legit_before,
            "Class distribution before balancing"
        );
        if fraud_before == 0 || legit_before == 0 {
            return Err(Error::SingleClass {
                fraud: fraud_before,
                legit: legit_before,
            });
        }

        let amount_logs: Vec<f64> = samples.iter().map(FeatureVector::amount_log).collect();
        let scaler = StandardScaler::fit(&amount_logs)?;
        for sample in &mut samples {
            scaler.transform(sample)?;
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let (balanced_samples, balanced_labels) =
            smote::oversample(&samples, &labels, self.config.k_neighbors, &mut rng)?;
        let balanced = Dataset::new(balanced_samples, balanced_labels);
        let (fraud_after, legit_after) = balanced.class_counts();
        info!(
            fraud = fraud_after,
            legit = legit_after,
            "Class distribution after balancing"
        );

        let (train, test) = balanced.stratified_split(self.config.test_size, &mut rng);

        let classifier = RandomForest::fit(&train, &self.config.forest)?;
        let test_accuracy = classifier.score(&test);

        match test_accuracy {
            Some(accuracy) => info!(
                train = train.len(),
                test = test.len(),
                accuracy = format!("{:.4}", accuracy),
                "Model training complete"
            ),
            None => info!(
                train = train.len(),
                "Model training complete (no held-out rows)"
            ),
        }

        Ok(TrainedArtifacts {
            scaler,
            classifier,
            report: TrainingReport {
                total_records: records.len(),
                fraud_before,
                legit_before,
                fraud_after,
                legit_after,
                train_size: train.len(),
                test_size: test.len(),
                test_accuracy,
            },
        })
    }
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new()
    }
}
