//! Standard scaler for the continuous feature column
//!
//! Wraps linfa's standard [`LinearScaler`], fit on the single `amount_log`
//! column. One-hot columns are never scaled.

use linfa::traits::{Fit, Transformer};
use linfa::DatasetBase;
use linfa_preprocessing::linear_scaling::LinearScaler;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::FeatureVector;

/// Zero-mean / unit-variance transform fit on `amount_log`
#[derive(Serialize, Deserialize)]
pub struct StandardScaler {
    inner: LinearScaler<f64>,
    samples_seen: usize,
}

impl StandardScaler {
    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::EmptyDataset);
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(Error::Transform(format!(
                "cannot fit scaler on non-finite value {}",
                bad
            )));
        }

        let column = Array2::from_shape_vec((values.len(), 1), values.to_vec())
            .map_err(|e| Error::Transform(format!("cannot shape scaler input: {}", e)))?;
        let inner = LinearScaler::standard()
            .fit(&DatasetBase::from(column))
            .map_err(|e| Error::Transform(format!("scaler fit failed: {}", e)))?;

        let scaler = Self::from_fitted(inner, values.len());
        scaler.check()?;
        Ok(scaler)
    }

    pub(crate) fn from_fitted(inner: LinearScaler<f64>, samples_seen: usize) -> Self {
        Self {
            inner,
            samples_seen,
        }
    }

    /// Column mean removed by the transform
    pub fn mean(&self) -> f64 {
        self.inner.offsets().get(0).copied().unwrap_or(f64::NAN)
    }

    /// Population standard deviation; 1.0 when the column is constant
    pub fn scale(&self) -> f64 {
        self.inner
            .scales()
            .get(0)
            .map(|factor| 1.0 / factor)
            .unwrap_or(f64::NAN)
    }

    pub fn samples_seen(&self) -> usize {
        self.samples_seen
    }

    /// Reject state that would scale into NaN or panic on width mismatch
    pub fn check(&self) -> Result<()> {
        let (offsets, scales) = (self.inner.offsets(), self.inner.scales());
        if offsets.len() != 1 || scales.len() != 1 {
            return Err(Error::Transform(format!(
                "scaler was fit on {} columns, expected 1",
                offsets.len()
            )));
        }
        if !self.mean().is_finite() || !scales[0].is_finite() || scales[0] <= 0.0 {
            return Err(Error::Transform(format!(
                "scaler state is invalid (mean={}, scale={})",
                self.mean(),
                self.scale()
            )));
        }
        Ok(())
    }

    pub fn transform_value(&self, value: f64) -> Result<f64> {
        self.check()?;
        let scaled = self
            .inner
            .transform(Array2::from_elem((1, 1), value))
            .get((0, 0))
            .copied()
            .unwrap_or(f64::NAN);
        if scaled.is_finite() {
            Ok(scaled)
        } else {
            Err(Error::Transform(format!(
                "scaling {} produced a non-finite value",
                value
            )))
        }
    }

    /// Scale the continuous column of `vector` in place
    pub fn transform(&self, vector: &mut FeatureVector) -> Result<()> {
        let scaled = self.transform_value(vector.amount_log())?;
        vector.set_amount_log(scaled);
        Ok(())
    }
}

impl std::fmt::Debug for StandardScaler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardScaler")
            .field("mean", &self.mean())
            .field("scale", &self.scale())
            .field("samples_seen", &self.samples_seen)
            .finish()
    }
}
