//! Finguard Core Library
//!
//! Transaction fraud scoring for the finguard tool:
//! - Deterministic feature encoding with a fixed category vocabulary
//! - Training: amount scaling, SMOTE oversampling, random forest fit
//! - Versioned artifact store pairing the scaler with its model
//! - Thread-safe predictor with reload on artifact change
//! - CSV and SQLite record sources
//! - Model vs. heuristic decision policy

pub mod artifacts;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod forest;
pub mod models;
pub mod policy;
pub mod predictor;
pub mod scaler;
pub mod smote;
pub mod source;
pub mod trainer;

#[cfg(test)]
mod test_utils;

#[cfg(test)]
mod tests;

pub use artifacts::{ArtifactManifest, ArtifactStatus, ArtifactStore, LoadedArtifacts, TrainLock};
pub use classifier::FraudClassifier;
pub use config::FinguardConfig;
pub use error::{Error, Result};
pub use features::{encode, feature_names, FeatureVector, FEATURE_COUNT};
pub use forest::{ForestConfig, RandomForest};
pub use models::{FraudVerdict, LabeledRecord, TrainingReport, TransactionRecord};
pub use policy::{
    AssistanceHeuristic, Decision, DecisionPolicy, DecisionSource, FinancialSnapshot,
};
pub use predictor::Predictor;
pub use scaler::StandardScaler;
pub use source::{CsvSource, RecordSource, SqliteSource};
pub use trainer::{TrainedArtifacts, Trainer, TrainerConfig};
