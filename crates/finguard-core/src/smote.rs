//! SMOTE oversampling for class balancing
//!
//! Synthesizes minority-class rows by interpolating between a minority row
//! and one of its nearest minority neighbours until both classes have the
//! same count.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::features::FeatureVector;

/// Default neighbourhood size
pub const DEFAULT_K_NEIGHBORS: usize = 5;

/// Balance `samples`/`labels` by oversampling the minority class
///
/// Returns the original rows followed by the synthetic ones. Already
/// balanced input is returned unchanged.
pub fn oversample(
    samples: &[FeatureVector],
    labels: &[bool],
    k_neighbors: usize,
    rng: &mut StdRng,
) -> Result<(Vec<FeatureVector>, Vec<bool>)> {
    if samples.len() != labels.len() {
        return Err(Error::InvalidData(format!(
            "{} samples but {} labels",
            samples.len(),
            labels.len()
        )));
    }

    let fraud = labels.iter().filter(|&&l| l).count();
    let legit = labels.len() - fraud;
    if fraud == 0 || legit == 0 {
        return Err(Error::SingleClass { fraud, legit });
    }

    let mut out_samples = samples.to_vec();
    let mut out_labels = labels.to_vec();
    if fraud == legit {
        return Ok((out_samples, out_labels));
    }

    let minority_label = fraud < legit;
    let minority: Vec<FeatureVector> = samples
        .iter()
        .zip(labels)
        .filter(|(_, &l)| l == minority_label)
        .map(|(s, _)| *s)
        .collect();
    let needed = fraud.abs_diff(legit);

    let k = k_neighbors.min(minority.len() - 1);
    if k == 0 {
        warn!(
            minority = minority.len(),
            "Not enough minority rows to interpolate, duplicating instead"
        );
        for _ in 0..needed {
            out_samples.push(minority[0]);
            out_labels.push(minority_label);
        }
        return Ok((out_samples, out_labels));
    }

    let neighbours: Vec<Vec<usize>> = (0..minority.len())
        .map(|i| nearest_neighbours(&minority, i, k))
        .collect();

    for _ in 0..needed {
        let i = rng.gen_range(0..minority.len());
        let j = neighbours[i][rng.gen_range(0..k)];
        let gap: f64 = rng.gen();
        out_samples.push(interpolate(&minority[i], &minority[j], gap));
        out_labels.push(minority_label);
    }

    debug!(
        synthesized = needed,
        k,
        minority_label,
        "SMOTE oversampling complete"
    );

    Ok((out_samples, out_labels))
}

/// Indices of the `k` rows closest to `rows[target]`, excluding itself
fn nearest_neighbours(rows: &[FeatureVector], target: usize, k: usize) -> Vec<usize> {
    let mut distances: Vec<(f64, usize)> = rows
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != target)
        .map(|(i, row)| (rows[target].distance_sq(row), i))
        .collect();
    distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    distances.into_iter().take(k).map(|(_, i)| i).collect()
}

fn interpolate(from: &FeatureVector, to: &FeatureVector, gap: f64) -> FeatureVector {
    let mut values = *from.values();
    for (v, t) in values.iter_mut().zip(to.values()) {
        *v += gap * (t - *v);
    }
    FeatureVector::from_values(values)
}
