//! Classifier seam used by the predictor

use crate::features::FeatureVector;

/// A fitted binary fraud classifier
///
/// `predict_proba` returns one probability per entry of `classes()`, in the
/// same order. Callers locate the fraud class with [`fraud_class_index`]
/// rather than assuming a position.
pub trait FraudClassifier: Send + Sync {
    /// Labels the classifier was fit on, sorted (`false` before `true`)
    fn classes(&self) -> &[bool];

    /// Width of the feature vectors the classifier expects
    fn n_features(&self) -> usize;

    fn predict_proba(&self, features: &FeatureVector) -> Vec<f64>;

    /// The classifier's own decision: the most probable class, ties going
    /// to the earlier class
    fn predict(&self, features: &FeatureVector) -> bool {
        decision(self.classes(), &self.predict_proba(features))
    }
}

/// Most probable class given `proba` aligned with `classes`
pub fn decision(classes: &[bool], proba: &[f64]) -> bool {
    let mut best = 0;
    for (i, p) in proba.iter().enumerate() {
        if *p > proba[best] {
            best = i;
        }
    }
    classes.get(best).copied().unwrap_or(false)
}

/// Position of the fraud class among the classifier's classes
pub fn fraud_class_index(classifier: &dyn FraudClassifier) -> Option<usize> {
    classifier.classes().iter().position(|&c| c)
}
