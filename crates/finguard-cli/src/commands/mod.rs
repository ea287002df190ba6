//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (config loading, artifact store, record building)
//! - `train` - Train on labeled history and publish artifacts
//! - `predict` - Score a single transaction
//! - `status` - Artifact directory state and feature listing
//! - `advise` - Assistance decision and recommendations

pub mod advise;
pub mod core;
pub mod predict;
pub mod status;
pub mod train;

// Re-export command functions for main.rs
pub use advise::*;
pub use self::core::*;
pub use predict::*;
pub use status::*;
pub use train::*;
