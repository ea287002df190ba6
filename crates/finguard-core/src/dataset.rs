//! Encoded training matrix and stratified splitting

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{Error, Result};
use crate::features::{FeatureVector, FEATURE_COUNT};

/// Stack encoded rows into the `n x FEATURE_COUNT` matrix linfa fits on
pub fn feature_matrix(samples: &[FeatureVector]) -> Result<Array2<f64>> {
    let flat: Vec<f64> = samples.iter().flat_map(|s| s.values().iter().copied()).collect();
    Array2::from_shape_vec((samples.len(), FEATURE_COUNT), flat)
        .map_err(|e| Error::InvalidData(format!("cannot build feature matrix: {}", e)))
}

/// Rows of encoded features with their labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub samples: Vec<FeatureVector>,
    pub labels: Vec<bool>,
}

impl Dataset {
    pub fn new(samples: Vec<FeatureVector>, labels: Vec<bool>) -> Self {
        debug_assert_eq!(samples.len(), labels.len());
        Self { samples, labels }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `(fraud, legit)` counts
    pub fn class_counts(&self) -> (usize, usize) {
        let fraud = self.labels.iter().filter(|&&l| l).count();
        (fraud, self.labels.len() - fraud)
    }

    /// Records and boolean targets as a linfa dataset
    pub fn to_linfa(&self) -> Result<linfa::Dataset<f64, bool, ndarray::Ix1>> {
        Ok(linfa::Dataset::new(
            feature_matrix(&self.samples)?,
            Array1::from(self.labels.clone()),
        ))
    }

    fn push(&mut self, sample: FeatureVector, label: bool) {
        self.samples.push(sample);
        self.labels.push(label);
    }

    /// Split into `(train, test)` keeping the class ratio in both halves
    ///
    /// Each class contributes `round(count * test_size)` rows to the test
    /// set, but always leaves at least one row for training.
    pub fn stratified_split(&self, test_size: f64, rng: &mut StdRng) -> (Dataset, Dataset) {
        let mut train = Dataset::default();
        let mut test = Dataset::default();

        for class in [false, true] {
            let mut rows: Vec<usize> = self
                .labels
                .iter()
                .enumerate()
                .filter(|(_, &l)| l == class)
                .map(|(i, _)| i)
                .collect();
            if rows.is_empty() {
                continue;
            }
            rows.shuffle(rng);

            let n_test = ((rows.len() as f64 * test_size).round() as usize).min(rows.len() - 1);
            for (position, &row) in rows.iter().enumerate() {
                if position < n_test {
                    test.push(self.samples[row], class);
                } else {
                    train.push(self.samples[row], class);
                }
            }
        }

        (train, test)
    }
}
