//! Random forest classifier
//!
//! Bagged linfa CART trees split on Gini impurity. Each member is fit on a
//! bootstrap sample of the rows and a random half of the feature columns.
//! The forest probability for a class is the fraction of members voting
//! for it.

use linfa::traits::{Fit, Predict};
use linfa::Dataset as LinfaDataset;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::{decision, FraudClassifier};
use crate::dataset::{feature_matrix, Dataset};
use crate::error::{Error, Result};
use crate::features::{FeatureVector, FEATURE_COUNT};

/// Hyperparameters for [`RandomForest::fit`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    /// `None` grows trees until leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

/// One bagged tree and the feature columns it was fit on
#[derive(Serialize, Deserialize)]
struct Member {
    features: Vec<usize>,
    /// Predicts an index into the forest's `classes`
    tree: DecisionTree<f64, usize>,
}

/// Bagged ensemble of linfa decision trees
#[derive(Serialize, Deserialize)]
pub struct RandomForest {
    classes: Vec<bool>,
    n_features: usize,
    members: Vec<Member>,
    config: ForestConfig,
}

impl RandomForest {
    pub fn fit(data: &Dataset, config: &ForestConfig) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::EmptyDataset);
        }
        if data.samples.len() != data.labels.len() {
            return Err(Error::InvalidData(format!(
                "{} samples but {} labels",
                data.samples.len(),
                data.labels.len()
            )));
        }
        if config.n_estimators == 0 {
            return Err(Error::Config("n_estimators must be at least 1".to_string()));
        }

        let data = data.to_linfa()?;
        let mut classes: Vec<bool> = data.targets.to_vec();
        classes.sort_unstable();
        classes.dedup();
        let targets: Array1<usize> = data
            .targets
            .mapv(|label| classes.iter().position(|c| *c == label).unwrap_or(0));

        let params = DecisionTree::<f64, usize>::params()
            .split_quality(SplitQuality::Gini)
            .max_depth(config.max_depth)
            .min_weight_split(config.min_samples_split.max(2) as f32)
            .min_weight_leaf(config.min_samples_leaf.max(1) as f32);

        let n_rows = data.records.nrows();
        let n_columns = subspace_size(FEATURE_COUNT);
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut members = Vec::with_capacity(config.n_estimators);
        for _ in 0..config.n_estimators {
            let mut tree_rng = StdRng::seed_from_u64(rng.gen());
            let rows: Vec<usize> = (0..n_rows).map(|_| tree_rng.gen_range(0..n_rows)).collect();
            let mut features = index::sample(&mut tree_rng, FEATURE_COUNT, n_columns).into_vec();
            features.sort_unstable();

            let bootstrap = LinfaDataset::new(
                data.records.select(Axis(0), &rows).select(Axis(1), &features),
                targets.select(Axis(0), &rows),
            );
            let tree = params
                .fit(&bootstrap)
                .map_err(|e| Error::Transform(format!("decision tree fit failed: {}", e)))?;
            members.push(Member { features, tree });
        }

        debug!(
            trees = members.len(),
            max_depth = members.iter().map(|m| m.tree.max_depth()).max().unwrap_or(0),
            "Random forest fit"
        );

        Ok(Self {
            classes,
            n_features: FEATURE_COUNT,
            members,
            config: config.clone(),
        })
    }

    /// Per-row class fractions, one column per entry of `classes`
    fn votes(&self, records: &Array2<f64>) -> Array2<f64> {
        let mut votes = Array2::<f64>::zeros((records.nrows(), self.classes.len()));
        for member in &self.members {
            let predicted: Array1<usize> = member
                .tree
                .predict(&records.select(Axis(1), &member.features));
            for (row, class) in predicted.iter().enumerate() {
                if *class < self.classes.len() {
                    votes[[row, *class]] += 1.0;
                }
            }
        }
        votes / self.members.len().max(1) as f64
    }

    /// Fraction of `data` whose predicted class matches its label
    pub fn score(&self, data: &Dataset) -> Option<f64> {
        if data.is_empty() || data.samples.len() != data.labels.len() {
            return None;
        }
        let records = feature_matrix(&data.samples).ok()?;
        let votes = self.votes(&records);
        let correct = votes
            .outer_iter()
            .zip(&data.labels)
            .filter(|(proba, label)| decision(&self.classes, &proba.to_vec()) == **label)
            .count();
        Some(correct as f64 / data.len() as f64)
    }

    pub fn n_trees(&self) -> usize {
        self.members.len()
    }

    /// Deepest member tree
    pub fn max_depth(&self) -> usize {
        self.members
            .iter()
            .map(|m| m.tree.max_depth())
            .max()
            .unwrap_or(0)
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Check a deserialized forest before trusting it for inference
    pub fn validate(&self) -> Result<()> {
        if self.classes.is_empty() || self.members.is_empty() {
            return Err(Error::ArtifactMismatch(
                "forest has no classes or no trees".to_string(),
            ));
        }
        if self.n_features != FEATURE_COUNT {
            return Err(Error::ArtifactMismatch(format!(
                "forest expects {} features, encoder produces {}",
                self.n_features, FEATURE_COUNT
            )));
        }
        for (i, member) in self.members.iter().enumerate() {
            if member.features.is_empty() || member.features.iter().any(|&f| f >= self.n_features)
            {
                return Err(Error::ArtifactMismatch(format!(
                    "tree {} reads columns {:?} outside the feature vector",
                    i, member.features
                )));
            }
            // Split indices are local to the member's column subset
            if let Some(bad) = member
                .tree
                .features()
                .into_iter()
                .find(|&f| f >= member.features.len())
            {
                return Err(Error::ArtifactMismatch(format!(
                    "tree {} splits on column {} of {}",
                    i,
                    bad,
                    member.features.len()
                )));
            }
        }
        Ok(())
    }
}

impl FraudClassifier for RandomForest {
    fn classes(&self) -> &[bool] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &FeatureVector) -> Vec<f64> {
        match feature_matrix(std::slice::from_ref(features)) {
            Ok(records) => self.votes(&records).row(0).to_vec(),
            Err(_) => vec![0.0; self.classes.len()],
        }
    }
}

impl std::fmt::Debug for RandomForest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomForest")
            .field("classes", &self.classes)
            .field("n_features", &self.n_features)
            .field("trees", &self.members.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Columns each member sees: half the features, rounded up
fn subspace_size(n_features: usize) -> usize {
    n_features.div_ceil(2).max(1)
}
