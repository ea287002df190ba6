//! Data models for the scoring pipeline

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// A transaction as seen by the scoring pipeline
///
/// Only the fields the encoder reads are carried. Everything is optional so
/// partially-filled records from the ingestion layer can still be scored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub transaction_type: Option<String>,
}

impl TransactionRecord {
    pub fn new(amount: f64, category: &str, transaction_type: &str) -> Self {
        Self {
            amount: Some(amount),
            category: Some(category.to_string()),
            transaction_type: Some(transaction_type.to_string()),
        }
    }

    /// Build a record from raw text fields
    ///
    /// An amount that cannot be parsed is dropped (the encoder then treats it
    /// as 0) and the coercion is logged.
    pub fn from_raw(
        amount: Option<&str>,
        category: Option<&str>,
        transaction_type: Option<&str>,
    ) -> Self {
        let amount = match amount.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => match parse_amount(raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(raw = %raw, error = %e, "Unparseable amount, defaulting to 0");
                    None
                }
            },
            None => None,
        };

        Self {
            amount,
            category: category.map(str::to_string),
            transaction_type: transaction_type.map(str::to_string),
        }
    }
}

/// Currency symbols and codes that may surround an amount
fn currency_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(?:rs|inr|usd|eur|gbp)\b\.?|[$₹€£]").expect("valid regex")
    })
}

/// A signed numeric run with optional thousands separators
fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(-)?(\d[\d,]*(?:\.\d+)?|\.\d+)").expect("valid regex")
    })
}

/// Parse a textual amount such as `"1,234.50"`, `"Rs. 1,200"` or `"(45.00)"`
///
/// Currency markers are stripped, then exactly one numeric run must remain.
/// Parentheses around the amount mean a negative value. Text with no
/// number, or with several, is rejected rather than guessed at.
pub fn parse_amount(raw: &str) -> Result<f64> {
    let stripped = currency_pattern().replace_all(raw, "");
    let stripped = stripped.trim();

    let mut runs = number_pattern().captures_iter(stripped);
    let Some(run) = runs.next() else {
        return Err(Error::Encoding(format!("no numeric content in {:?}", raw)));
    };
    if runs.next().is_some() {
        return Err(Error::Encoding(format!("ambiguous amount {:?}", raw)));
    }

    let digits = run.get(2).map_or("", |m| m.as_str()).replace(',', "");
    let value = digits
        .parse::<f64>()
        .map_err(|e| Error::Encoding(format!("invalid amount {:?}: {}", raw, e)))?;

    let parenthesized = stripped.starts_with('(') && stripped.ends_with(')');
    if run.get(1).is_some() || parenthesized {
        Ok(-value)
    } else {
        Ok(value)
    }
}

/// A historical transaction with its fraud label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledRecord {
    pub record: TransactionRecord,
    pub is_fraud: bool,
}

impl LabeledRecord {
    pub fn new(record: TransactionRecord, is_fraud: bool) -> Self {
        Self { record, is_fraud }
    }
}

/// Outcome of scoring a single transaction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FraudVerdict {
    /// The model scored the transaction
    Scored { is_fraud: bool, probability: f64 },
    /// No trained artifacts exist yet; callers fall back to heuristics
    Untrained,
}

impl FraudVerdict {
    pub fn is_scored(&self) -> bool {
        matches!(self, FraudVerdict::Scored { .. })
    }

    /// Fraud flag, `None` when untrained
    pub fn is_fraud(&self) -> Option<bool> {
        match self {
            FraudVerdict::Scored { is_fraud, .. } => Some(*is_fraud),
            FraudVerdict::Untrained => None,
        }
    }

    /// Fraud probability, `None` when untrained
    pub fn probability(&self) -> Option<f64> {
        match self {
            FraudVerdict::Scored { probability, .. } => Some(*probability),
            FraudVerdict::Untrained => None,
        }
    }
}

/// Summary of a training run (observability only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub total_records: usize,
    pub fraud_before: usize,
    pub legit_before: usize,
    pub fraud_after: usize,
    pub legit_after: usize,
    pub train_size: usize,
    pub test_size: usize,
    /// Held-out accuracy, `None` when the split left no test rows
    pub test_accuracy: Option<f64>,
}
