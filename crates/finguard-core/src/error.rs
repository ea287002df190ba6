//! Error types for finguard

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Training dataset is empty")]
    EmptyDataset,

    #[error("Training dataset has a single class ({fraud} fraud, {legit} legitimate records)")]
    SingleClass { fraud: usize, legit: usize },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Artifact mismatch: {0}")]
    ArtifactMismatch(String),

    #[error("Artifact directory is locked by another training run: {0}")]
    Locked(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;
