//! Configuration loading
//!
//! Defaults ship embedded in the binary. An explicit path, or the per-user
//! file under the local data directory, overrides individual keys.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::policy::{AssistanceHeuristic, DecisionPolicy};
use crate::trainer::TrainerConfig;

const DEFAULT_CONFIG: &str = include_str!("../../../config/finguard.toml");

/// Resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct FinguardConfig {
    pub artifacts_dir: PathBuf,
    pub trainer: TrainerConfig,
    pub policy: DecisionPolicy,
    pub heuristic: AssistanceHeuristic,
}

impl Default for FinguardConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: default_artifacts_dir(),
            trainer: TrainerConfig::default(),
            policy: DecisionPolicy::default(),
            heuristic: AssistanceHeuristic::default(),
        }
    }
}

impl FinguardConfig {
    /// Load configuration (explicit path, then per-user file, then defaults)
    ///
    /// An explicit path that does not exist is an error; a missing per-user
    /// file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                read_config(path)?
            }
            None => match default_config_path() {
                Some(default_path) if default_path.exists() => read_config(&default_path)?,
                _ => DEFAULT_CONFIG.to_string(),
            },
        };

        parse_config(&content)
    }
}

/// Per-user config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("finguard").join("config.toml"))
}

/// Artifact directory used when the config does not name one
pub fn default_artifacts_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("finguard").join("artifacts"))
        .unwrap_or_else(|| PathBuf::from("artifacts"))
}

fn read_config(path: &Path) -> Result<String> {
    debug!(path = %path.display(), "Reading config");
    fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    artifacts: Option<RawArtifacts>,
    training: Option<RawTraining>,
    forest: Option<RawForest>,
    policy: Option<RawPolicy>,
}

#[derive(Debug, Deserialize)]
struct RawArtifacts {
    dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawTraining {
    seed: Option<u64>,
    test_size: Option<f64>,
    k_neighbors: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawForest {
    n_estimators: Option<usize>,
    max_depth: Option<usize>,
    min_samples_split: Option<usize>,
    min_samples_leaf: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawPolicy {
    mode: Option<String>,
    max_net_savings: Option<f64>,
    min_credit_score: Option<f64>,
}

/// Parse config from TOML content on top of the built-in defaults
pub fn parse_config(content: &str) -> Result<FinguardConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = FinguardConfig::default();

    if let Some(dir) = raw.artifacts.and_then(|a| a.dir) {
        config.artifacts_dir = dir;
    }

    if let Some(training) = raw.training {
        if let Some(seed) = training.seed {
            config.trainer.seed = seed;
            config.trainer.forest.seed = seed;
        }
        if let Some(test_size) = training.test_size {
            if !(0.0..1.0).contains(&test_size) {
                return Err(Error::Config(format!(
                    "training.test_size must be in [0, 1), got {}",
                    test_size
                )));
            }
            config.trainer.test_size = test_size;
        }
        if let Some(k) = training.k_neighbors {
            if k == 0 {
                return Err(Error::Config("training.k_neighbors must be at least 1".into()));
            }
            config.trainer.k_neighbors = k;
        }
    }

    if let Some(forest) = raw.forest {
        if let Some(n) = forest.n_estimators {
            if n == 0 {
                return Err(Error::Config("forest.n_estimators must be at least 1".into()));
            }
            config.trainer.forest.n_estimators = n;
        }
        if let Some(depth) = forest.max_depth {
            // 0 means unlimited
            config.trainer.forest.max_depth = (depth > 0).then_some(depth);
        }
        if let Some(split) = forest.min_samples_split {
            config.trainer.forest.min_samples_split = split.max(2);
        }
        if let Some(leaf) = forest.min_samples_leaf {
            config.trainer.forest.min_samples_leaf = leaf.max(1);
        }
    }

    if let Some(policy) = raw.policy {
        if let Some(mode) = policy.mode {
            config.policy = mode.parse().map_err(Error::Config)?;
        }
        if let Some(savings) = policy.max_net_savings {
            config.heuristic.max_net_savings = savings;
        }
        if let Some(score) = policy.min_credit_score {
            config.heuristic.min_credit_score = score;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_config() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.trainer, TrainerConfig::default());
        assert_eq!(config.policy, DecisionPolicy::ModelFirst);
        assert_eq!(config.heuristic, AssistanceHeuristic::default());
        assert_eq!(config.artifacts_dir, default_artifacts_dir());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, FinguardConfig::default());
    }

    #[test]
    fn test_partial_overrides() {
        let config = parse_config(
            r#"
            [artifacts]
            dir = "/tmp/finguard-test"

            [training]
            seed = 7
            test_size = 0.25

            [forest]
            n_estimators = 10
            max_depth = 6

            [policy]
            mode = "either"
            min_credit_score = 650
            "#,
        )
        .unwrap();

        assert_eq!(config.artifacts_dir, PathBuf::from("/tmp/finguard-test"));
        assert_eq!(config.trainer.seed, 7);
        assert_eq!(config.trainer.forest.seed, 7);
        assert_eq!(config.trainer.test_size, 0.25);
        assert_eq!(config.trainer.k_neighbors, 5);
        assert_eq!(config.trainer.forest.n_estimators, 10);
        assert_eq!(config.trainer.forest.max_depth, Some(6));
        assert_eq!(config.policy, DecisionPolicy::Either);
        assert_eq!(config.heuristic.min_credit_score, 650.0);
        assert_eq!(config.heuristic.max_net_savings, 10_000.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        for content in [
            "[training]\ntest_size = 1.0",
            "[training]\ntest_size = -0.1",
            "[forest]\nn_estimators = 0",
            "[policy]\nmode = \"coin_flip\"",
            "[training\nseed = 1",
        ] {
            let err = parse_config(content).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{}", content);
        }
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finguard.toml");
        fs::write(&path, "[forest]\nn_estimators = 3\n").unwrap();

        let config = FinguardConfig::load(Some(&path)).unwrap();
        assert_eq!(config.trainer.forest.n_estimators, 3);

        let missing = FinguardConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(missing, Err(Error::Config(_))));
    }
}
