//! Feature encoding for fraud scoring
//!
//! Turns a [`TransactionRecord`] into a fixed-width [`FeatureVector`]. The
//! trainer and the predictor both go through [`encode`], so the feature
//! space at serve time is the one the model was fit on.
//!
//! ## Layout
//!
//! ```text
//! [amount_log,
//!  category_payment, category_purchase, category_withdrawal,
//!  category_transfer, category_uncategorized,
//!  transaction_type_credit, transaction_type_debit,
//!  transaction_type_uncategorized]
//! ```
//!
//! The vocabularies below are a schema contract. Changing either one changes
//! [`vocabulary_hash`], which invalidates every persisted artifact pair.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::models::TransactionRecord;

/// Bumped whenever the encoding rules change without a vocabulary change
pub const SCHEMA_VERSION: u32 = 1;

/// Value used when a categorical field is blank or missing
pub const UNCATEGORIZED: &str = "uncategorized";

/// Known category labels, in column order
pub const CATEGORY_VOCABULARY: [&str; 5] =
    ["payment", "purchase", "withdrawal", "transfer", UNCATEGORIZED];

/// Known transaction types, in column order
pub const TRANSACTION_TYPE_VOCABULARY: [&str; 3] = ["credit", "debit", UNCATEGORIZED];

/// Index of the only continuous column
pub const AMOUNT_LOG_INDEX: usize = 0;

const CATEGORY_OFFSET: usize = 1;
const TRANSACTION_TYPE_OFFSET: usize = CATEGORY_OFFSET + CATEGORY_VOCABULARY.len();

/// Total width of an encoded transaction
pub const FEATURE_COUNT: usize = TRANSACTION_TYPE_OFFSET + TRANSACTION_TYPE_VOCABULARY.len();

/// Encoded transaction, one value per entry of [`feature_names`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn get(&self, index: usize) -> f64 {
        self.0[index]
    }

    pub fn amount_log(&self) -> f64 {
        self.0[AMOUNT_LOG_INDEX]
    }

    pub fn set_amount_log(&mut self, value: f64) {
        self.0[AMOUNT_LOG_INDEX] = value;
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Squared Euclidean distance to another vector
    pub fn distance_sq(&self, other: &FeatureVector) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

/// Canonical feature names in column order
pub fn feature_names() -> Vec<String> {
    let mut names = Vec::with_capacity(FEATURE_COUNT);
    names.push("amount_log".to_string());
    for category in CATEGORY_VOCABULARY {
        names.push(format!("category_{}", category));
    }
    for transaction_type in TRANSACTION_TYPE_VOCABULARY {
        names.push(format!("transaction_type_{}", transaction_type));
    }
    names
}

/// SHA-256 over the schema version and the ordered feature names
///
/// Recorded in the artifact manifest; a mismatch at load time means the
/// artifacts were trained against a different feature layout.
pub fn vocabulary_hash() -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("finguard-features-v{}", SCHEMA_VERSION).as_bytes());
    for name in feature_names() {
        hasher.update(b"\n");
        hasher.update(name.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// `ln(1 + amount)`; invalid or negative amounts count as 0
pub fn amount_log(amount: f64) -> f64 {
    sanitize_amount(amount).ln_1p()
}

fn sanitize_amount(amount: f64) -> f64 {
    if amount.is_finite() && amount >= 0.0 {
        amount
    } else {
        warn!(amount, "Invalid amount, defaulting to 0");
        0.0
    }
}

/// Lower-cased, trimmed label; blank or missing becomes `uncategorized`
pub fn normalize_label(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_lowercase(),
        _ => UNCATEGORIZED.to_string(),
    }
}

/// Column of `label` within `vocabulary`, `None` for unseen values
fn vocabulary_index(vocabulary: &[&str], label: &str) -> Option<usize> {
    vocabulary.iter().position(|known| *known == label)
}

/// Encode a transaction into the canonical feature layout
///
/// Pure and total: unseen categories or types leave their indicator block
/// all zero instead of failing or widening the vector.
pub fn encode(record: &TransactionRecord) -> FeatureVector {
    let mut values = [0.0; FEATURE_COUNT];

    values[AMOUNT_LOG_INDEX] = amount_log(record.amount.unwrap_or(0.0));

    let category = normalize_label(record.category.as_deref());
    if let Some(index) = vocabulary_index(&CATEGORY_VOCABULARY, &category) {
        values[CATEGORY_OFFSET + index] = 1.0;
    }

    let transaction_type = normalize_label(record.transaction_type.as_deref());
    if let Some(index) = vocabulary_index(&TRANSACTION_TYPE_VOCABULARY, &transaction_type) {
        values[TRANSACTION_TYPE_OFFSET + index] = 1.0;
    }

    FeatureVector(values)
}

/// Render a vector as `name=value` pairs (debug output)
pub fn describe(vector: &FeatureVector) -> String {
    let mut out = String::new();
    for (name, value) in feature_names().iter().zip(vector.values()) {
        if !out.is_empty() {
            out.push_str(", ");
        }
        let _ = write!(out, "{}={:.4}", name, value);
    }
    out
}
