//! Serve-time fraud scoring
//!
//! A [`Predictor`] owns its scaler/classifier pair explicitly. When backed by
//! an [`ArtifactStore`] it caches the loaded pair and reloads when the
//! manifest's modification time changes or after [`Predictor::invalidate`].
//! The cached pair is immutable and shared through an `Arc`, so concurrent
//! callers can score against it without coordination.

use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use tracing::{debug, info};

use crate::artifacts::{ArtifactStore, LoadedArtifacts};
use crate::classifier::{decision, fraud_class_index, FraudClassifier};
use crate::error::{Error, Result};
use crate::features::{describe, encode, FEATURE_COUNT};
use crate::models::{FraudVerdict, TransactionRecord};
use crate::scaler::StandardScaler;

/// Scaler and classifier used together for one scoring call
pub struct ScoringPair {
    scaler: StandardScaler,
    classifier: Arc<dyn FraudClassifier>,
    version_tag: Option<String>,
}

impl ScoringPair {
    pub fn new(scaler: StandardScaler, classifier: Arc<dyn FraudClassifier>) -> Self {
        Self {
            scaler,
            classifier,
            version_tag: None,
        }
    }

    pub fn version_tag(&self) -> Option<&str> {
        self.version_tag.as_deref()
    }

    pub fn score(&self, record: &TransactionRecord) -> Result<FraudVerdict> {
        if self.classifier.n_features() != FEATURE_COUNT {
            return Err(Error::ArtifactMismatch(format!(
                "classifier expects {} features, encoder produces {}",
                self.classifier.n_features(),
                FEATURE_COUNT
            )));
        }
        if record.amount.is_none() {
            debug!("Record has no amount, scoring as 0");
        }

        let mut features = encode(record);
        self.scaler.transform(&mut features)?;
        debug!(features = %describe(&features), "Scoring transaction");

        let classes = self.classifier.classes();
        let proba = self.classifier.predict_proba(&features);
        if proba.len() != classes.len() {
            return Err(Error::Transform(format!(
                "classifier returned {} probabilities for {} classes",
                proba.len(),
                classes.len()
            )));
        }

        let probability = match fraud_class_index(self.classifier.as_ref()) {
            Some(index) => proba[index],
            // Never saw a fraud label during training
            None => 0.0,
        };
        if !probability.is_finite() {
            return Err(Error::Transform(format!(
                "classifier produced probability {}",
                probability
            )));
        }

        Ok(FraudVerdict::Scored {
            is_fraud: decision(classes, &proba),
            probability: probability.clamp(0.0, 1.0),
        })
    }
}

impl From<LoadedArtifacts> for ScoringPair {
    fn from(loaded: LoadedArtifacts) -> Self {
        Self {
            scaler: loaded.scaler,
            classifier: Arc::new(loaded.classifier),
            version_tag: Some(loaded.manifest.version_tag),
        }
    }
}

enum CacheState {
    /// Nothing loaded yet, or explicitly invalidated
    Stale,
    /// Result of the last load; `pair` is `None` when untrained
    Loaded {
        stamp: Option<SystemTime>,
        pair: Option<Arc<ScoringPair>>,
    },
}

pub struct Predictor {
    store: Option<ArtifactStore>,
    cache: RwLock<CacheState>,
}

impl Predictor {
    /// Load the current pair from `store`
    ///
    /// An empty store is fine (the predictor answers `Untrained`); an
    /// inconsistent one is an error.
    pub fn load(store: ArtifactStore) -> Result<Self> {
        let predictor = Self {
            store: Some(store),
            cache: RwLock::new(CacheState::Stale),
        };
        predictor.reload()?;
        Ok(predictor)
    }

    /// Use an in-memory pair that never reloads
    pub fn from_parts(scaler: StandardScaler, classifier: Arc<dyn FraudClassifier>) -> Self {
        Self {
            store: None,
            cache: RwLock::new(CacheState::Loaded {
                stamp: None,
                pair: Some(Arc::new(ScoringPair::new(scaler, classifier))),
            }),
        }
    }

    /// Force a reload on the next call (e.g. after a training run)
    pub fn invalidate(&self) {
        if self.store.is_none() {
            return;
        }
        if let Ok(mut cache) = self.cache.write() {
            *cache = CacheState::Stale;
        }
    }

    pub fn predict(&self, record: &TransactionRecord) -> Result<FraudVerdict> {
        match self.current()? {
            Some(pair) => pair.score(record),
            None => Ok(FraudVerdict::Untrained),
        }
    }

    pub fn is_trained(&self) -> Result<bool> {
        Ok(self.current()?.is_some())
    }

    /// Version tag of the pair currently in use
    pub fn version_tag(&self) -> Result<Option<String>> {
        Ok(self
            .current()?
            .and_then(|pair| pair.version_tag().map(str::to_string)))
    }

    fn current(&self) -> Result<Option<Arc<ScoringPair>>> {
        let stamp = match &self.store {
            Some(store) => store.manifest_modified()?,
            None => None,
        };

        {
            let cache = self
                .cache
                .read()
                .map_err(|_| Error::InvalidData("Failed to acquire predictor cache lock".into()))?;
            if let CacheState::Loaded {
                stamp: cached,
                pair,
            } = &*cache
            {
                if self.store.is_none() || *cached == stamp {
                    return Ok(pair.clone());
                }
            }
        }

        self.reload()
    }

    fn reload(&self) -> Result<Option<Arc<ScoringPair>>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };

        let mut cache = self
            .cache
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire predictor cache lock".into()))?;

        // Stamp first: a publish racing with the load just triggers another reload
        let stamp = store.manifest_modified()?;
        let pair = store.load()?.map(|loaded| Arc::new(ScoringPair::from(loaded)));

        match &pair {
            Some(p) => info!(
                dir = %store.dir().display(),
                version = p.version_tag().unwrap_or("unknown"),
                "Predictor loaded model artifacts"
            ),
            None => info!(dir = %store.dir().display(), "No model artifacts; predictor is untrained"),
        }

        *cache = CacheState::Loaded {
            stamp,
            pair: pair.clone(),
        };
        Ok(pair)
    }
}
