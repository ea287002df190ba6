//! Persisted scaler/classifier pairs
//!
//! An artifact directory holds:
//!
//! - `runs/<version_tag>/scaler.bin` - gzip-compressed JSON envelope around
//!   the [`StandardScaler`]
//! - `runs/<version_tag>/model.bin` - gzip-compressed JSON envelope around
//!   the [`RandomForest`]
//! - `manifest.json` - vocabulary hash, version tag, checksums, training report
//!
//! Both envelopes carry the run's version tag and vocabulary hash. On load
//! the manifest is checked against the current encoder and against each
//! artifact, so a pair trained under a different feature layout is rejected
//! instead of scored.
//!
//! # Publishing
//!
//! A run is written into a `.staging-*` directory inside the artifact
//! directory, which is renamed to `runs/<version_tag>` once every write
//! succeeded. Replacing `manifest.json` is the single commit point: until
//! it is renamed into place, readers keep loading the previous run, and a
//! run directory no manifest names is ignored. Older runs are removed after
//! the commit. Publishing requires a [`TrainLock`], which serializes
//! training runs against the same directory.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::features::{feature_names, vocabulary_hash, SCHEMA_VERSION};
use crate::forest::RandomForest;
use crate::models::TrainingReport;
use crate::scaler::StandardScaler;
use crate::trainer::TrainedArtifacts;

pub const SCALER_FILE: &str = "scaler.bin";
pub const MODEL_FILE: &str = "model.bin";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const RUNS_DIR: &str = "runs";
const LOCK_FILE: &str = ".train.lock";

const SCALER_KIND: &str = "standard_scaler";
const MODEL_KIND: &str = "random_forest";

/// Metadata written alongside every published pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub schema_version: u32,
    pub vocabulary_hash: String,
    pub feature_names: Vec<String>,
    /// Shared by both artifacts of one training run; names its run directory
    pub version_tag: String,
    pub trained_at: DateTime<Utc>,
    pub scaler_sha256: String,
    pub model_sha256: String,
    pub report: TrainingReport,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    kind: String,
    version_tag: String,
    vocabulary_hash: String,
    payload: T,
}

/// A validated pair ready for inference
#[derive(Debug)]
pub struct LoadedArtifacts {
    pub scaler: StandardScaler,
    pub classifier: RandomForest,
    pub manifest: ArtifactManifest,
}

/// What is currently on disk
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactStatus {
    Untrained,
    Trained(ArtifactManifest),
    /// Artifacts exist but cannot be trusted
    Invalid(String),
}

/// Outcome of reading the run a manifest points at
enum RunRead {
    Loaded(LoadedArtifacts),
    Missing(&'static str),
}

/// Exclusive training lock on an artifact directory, released on drop
///
/// The lock file records the owning process id and a random token. Drop
/// only removes the file while it still carries this guard's token, so a
/// run whose lock was broken cannot release the lock of the run that
/// replaced it.
#[derive(Debug)]
pub struct TrainLock {
    path: PathBuf,
    token: String,
}

impl TrainLock {
    /// Whether the lock file on disk is still this guard's
    pub fn is_held(&self) -> bool {
        match fs::read_to_string(&self.path) {
            Ok(contents) => lock_token(&contents) == Some(self.token.as_str()),
            Err(_) => false,
        }
    }
}

impl Drop for TrainLock {
    fn drop(&mut self) {
        if !self.is_held() {
            warn!(
                path = %self.path.display(),
                "Training lock was broken or taken over; leaving it in place"
            );
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to release training lock");
        }
    }
}

fn lock_token(contents: &str) -> Option<&str> {
    contents.split_whitespace().nth(1)
}

/// Artifact directory on disk
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Directory holding the scaler and model of one run
    pub fn run_dir(&self, version_tag: &str) -> PathBuf {
        self.dir.join(RUNS_DIR).join(version_tag)
    }

    /// Take the training lock, creating the directory if needed
    pub fn lock(&self) -> Result<TrainLock> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(LOCK_FILE);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let token = format!("{:016x}", rand::random::<u64>());
                writeln!(file, "{} {}", std::process::id(), token)?;
                file.sync_all()?;
                debug!(path = %path.display(), "Acquired training lock");
                Ok(TrainLock { path, token })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(Error::Locked(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a lock left behind by a crashed run
    pub fn break_lock(&self) -> Result<bool> {
        let path = self.dir.join(LOCK_FILE);
        let owner = fs::read_to_string(&path).unwrap_or_default();
        match fs::remove_file(&path) {
            Ok(()) => {
                warn!(
                    path = %path.display(),
                    owner_pid = owner.split_whitespace().next().unwrap_or("unknown"),
                    "Removed stale training lock"
                );
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a trained pair and its manifest, replacing the current pair
    pub fn publish(&self, lock: &TrainLock, artifacts: &TrainedArtifacts) -> Result<ArtifactManifest> {
        let manifest = self.stage_run(lock, artifacts)?;
        self.commit(&manifest)?;
        self.prune_runs(&manifest.version_tag);

        info!(
            dir = %self.dir.display(),
            version = %manifest.version_tag,
            "Published model artifacts"
        );
        Ok(manifest)
    }

    /// Write a complete run directory without making it current
    fn stage_run(&self, lock: &TrainLock, artifacts: &TrainedArtifacts) -> Result<ArtifactManifest> {
        if lock.path.parent() != Some(self.dir.as_path()) {
            return Err(Error::Locked(format!(
                "lock {} does not belong to {}",
                lock.path.display(),
                self.dir.display()
            )));
        }
        if !lock.is_held() {
            return Err(Error::Locked(format!(
                "training lock {} was broken by another run",
                lock.path.display()
            )));
        }

        let trained_at = Utc::now();
        let vocabulary_hash = vocabulary_hash();
        let version_tag = version_tag(trained_at, &vocabulary_hash, artifacts)?;

        let scaler_bytes = encode_envelope(&Envelope {
            kind: SCALER_KIND.to_string(),
            version_tag: version_tag.clone(),
            vocabulary_hash: vocabulary_hash.clone(),
            payload: &artifacts.scaler,
        })?;
        let model_bytes = encode_envelope(&Envelope {
            kind: MODEL_KIND.to_string(),
            version_tag: version_tag.clone(),
            vocabulary_hash: vocabulary_hash.clone(),
            payload: &artifacts.classifier,
        })?;

        let manifest = ArtifactManifest {
            schema_version: SCHEMA_VERSION,
            vocabulary_hash,
            feature_names: feature_names(),
            version_tag,
            trained_at,
            scaler_sha256: sha256_hex(&scaler_bytes),
            model_sha256: sha256_hex(&model_bytes),
            report: artifacts.report.clone(),
        };

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.dir)?;
        write_synced(&staging.path().join(SCALER_FILE), &scaler_bytes)?;
        write_synced(&staging.path().join(MODEL_FILE), &model_bytes)?;

        fs::create_dir_all(self.dir.join(RUNS_DIR))?;
        let run_dir = self.run_dir(&manifest.version_tag);
        fs::rename(staging.path(), &run_dir)?;
        debug!(run = %run_dir.display(), "Staged training run");
        Ok(manifest)
    }

    /// Point the manifest at a staged run
    fn commit(&self, manifest: &ArtifactManifest) -> Result<()> {
        let mut pending = tempfile::Builder::new()
            .prefix(".manifest-")
            .tempfile_in(&self.dir)?;
        pending.write_all(&serde_json::to_vec_pretty(manifest)?)?;
        pending.as_file().sync_all()?;
        pending
            .persist(self.manifest_path())
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Best-effort removal of every run other than `current`, and of
    /// staging leftovers from crashed publishes
    fn prune_runs(&self, current: &str) {
        let debris = fs::read_dir(&self.dir).into_iter().flatten().flatten().filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(".staging-") || name.starts_with(".manifest-")
        });
        let old_runs = fs::read_dir(self.dir.join(RUNS_DIR))
            .into_iter()
            .flatten()
            .flatten()
            .filter(|entry| entry.file_name().to_string_lossy() != current);

        for entry in debris.chain(old_runs) {
            let path = entry.path();
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(e) = removed {
                warn!(path = %path.display(), error = %e, "Failed to remove old training run");
            }
        }
    }

    /// Load and validate the current pair
    ///
    /// `Ok(None)` means no manifest has been committed yet. A manifest whose
    /// run is incomplete or inconsistent is an [`Error::ArtifactMismatch`].
    pub fn load(&self) -> Result<Option<LoadedArtifacts>> {
        let mut retried = false;
        loop {
            let Some(manifest) = self.read_manifest()? else {
                return Ok(None);
            };
            match self.read_run(manifest)? {
                RunRead::Loaded(loaded) => {
                    debug!(version = %loaded.manifest.version_tag, "Loaded model artifacts");
                    return Ok(Some(loaded));
                }
                // A publish may have committed and pruned between reading
                // the manifest and reading its run
                RunRead::Missing(_) if !retried => {
                    debug!("Run vanished during load, re-reading manifest");
                    retried = true;
                }
                RunRead::Missing(name) => {
                    return Err(Error::ArtifactMismatch(format!(
                        "incomplete artifact set in {}: missing {}",
                        self.dir.display(),
                        name
                    )));
                }
            }
        }
    }

    fn read_manifest(&self) -> Result<Option<ArtifactManifest>> {
        let bytes = match fs::read(self.manifest_path()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let manifest: ArtifactManifest = serde_json::from_slice(&bytes)?;
        check_manifest(&manifest)?;
        Ok(Some(manifest))
    }

    fn read_run(&self, manifest: ArtifactManifest) -> Result<RunRead> {
        let run_dir = self.run_dir(&manifest.version_tag);
        let Some(scaler_bytes) = read_if_present(&run_dir.join(SCALER_FILE))? else {
            return Ok(RunRead::Missing(SCALER_FILE));
        };
        let Some(model_bytes) = read_if_present(&run_dir.join(MODEL_FILE))? else {
            return Ok(RunRead::Missing(MODEL_FILE));
        };

        let scaler: StandardScaler = open_artifact(
            SCALER_FILE,
            &scaler_bytes,
            SCALER_KIND,
            &manifest.scaler_sha256,
            &manifest,
        )?;
        scaler.check().map_err(|e| Error::ArtifactMismatch(e.to_string()))?;
        let classifier: RandomForest = open_artifact(
            MODEL_FILE,
            &model_bytes,
            MODEL_KIND,
            &manifest.model_sha256,
            &manifest,
        )?;
        classifier.validate()?;

        Ok(RunRead::Loaded(LoadedArtifacts {
            scaler,
            classifier,
            manifest,
        }))
    }

    pub fn status(&self) -> Result<ArtifactStatus> {
        match self.load() {
            Ok(None) => Ok(ArtifactStatus::Untrained),
            Ok(Some(loaded)) => Ok(ArtifactStatus::Trained(loaded.manifest)),
            Err(Error::ArtifactMismatch(reason)) => Ok(ArtifactStatus::Invalid(reason)),
            Err(Error::Json(e)) => Ok(ArtifactStatus::Invalid(format!("unreadable artifact: {}", e))),
            Err(e) => Err(e),
        }
    }

    /// Modification time of the manifest, used for cache invalidation
    pub fn manifest_modified(&self) -> Result<Option<SystemTime>> {
        match fs::metadata(self.manifest_path()) {
            Ok(meta) => Ok(Some(meta.modified()?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn read_if_present(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn open_artifact<T: DeserializeOwned>(
    name: &str,
    bytes: &[u8],
    kind: &str,
    expected_sha256: &str,
    manifest: &ArtifactManifest,
) -> Result<T> {
    if sha256_hex(bytes) != expected_sha256 {
        return Err(Error::ArtifactMismatch(format!(
            "{} checksum does not match the manifest",
            name
        )));
    }

    let envelope: Envelope<T> = decode_envelope(bytes)?;
    if envelope.kind != kind {
        return Err(Error::ArtifactMismatch(format!(
            "{} holds a {}, expected {}",
            name, envelope.kind, kind
        )));
    }
    if envelope.version_tag != manifest.version_tag {
        return Err(Error::ArtifactMismatch(format!(
            "{} is from run {}, manifest is for run {}",
            name, envelope.version_tag, manifest.version_tag
        )));
    }
    if envelope.vocabulary_hash != manifest.vocabulary_hash {
        return Err(Error::ArtifactMismatch(format!(
            "{} was trained with a different feature vocabulary",
            name
        )));
    }
    Ok(envelope.payload)
}

fn check_manifest(manifest: &ArtifactManifest) -> Result<()> {
    if manifest.schema_version != SCHEMA_VERSION {
        return Err(Error::ArtifactMismatch(format!(
            "artifacts use feature schema v{}, encoder is v{}",
            manifest.schema_version, SCHEMA_VERSION
        )));
    }
    let tag = &manifest.version_tag;
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(Error::ArtifactMismatch(format!(
            "manifest names an invalid run {:?}",
            tag
        )));
    }
    if manifest.vocabulary_hash != vocabulary_hash() || manifest.feature_names != feature_names() {
        return Err(Error::ArtifactMismatch(
            "artifacts were trained with a different feature vocabulary; retrain required"
                .to_string(),
        ));
    }
    Ok(())
}

fn version_tag(
    trained_at: DateTime<Utc>,
    vocabulary_hash: &str,
    artifacts: &TrainedArtifacts,
) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(trained_at.to_rfc3339().as_bytes());
    hasher.update(vocabulary_hash.as_bytes());
    hasher.update(serde_json::to_vec(&artifacts.scaler)?);
    hasher.update(serde_json::to_vec(&artifacts.classifier)?);
    let digest = hex::encode(hasher.finalize());
    Ok(format!("{}-{}", trained_at.format("%Y%m%dT%H%M%SZ"), &digest[..12]))
}

fn encode_envelope<T: Serialize>(envelope: &Envelope<T>) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(envelope)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

fn decode_envelope<T: DeserializeOwned>(bytes: &[u8]) -> Result<Envelope<T>> {
    let mut json = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut json)
        .map_err(|e| Error::ArtifactMismatch(format!("artifact is not a valid archive: {}", e)))?;
    Ok(serde_json::from_slice(&json)?)
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FraudClassifier;
    use crate::features::encode;
    use crate::models::TransactionRecord;
    use crate::predictor::Predictor;
    use crate::test_utils::{labeled_dataset, quick_config, trained_artifacts};
    use crate::trainer::Trainer;

    fn published_store() -> (tempfile::TempDir, ArtifactStore, ArtifactManifest) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("artifacts"));
        let lock = store.lock().unwrap();
        let manifest = store.publish(&lock, &trained_artifacts()).unwrap();
        (dir, store, manifest)
    }

    fn run_names(store: &ArtifactStore) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(store.dir().join(RUNS_DIR))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_empty_directory_is_untrained() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(store.load().unwrap().is_none());
        assert_eq!(store.status().unwrap(), ArtifactStatus::Untrained);
        assert_eq!(store.manifest_modified().unwrap(), None);

        let missing = ArtifactStore::new(dir.path().join("does-not-exist"));
        assert!(missing.load().unwrap().is_none());
    }

    #[test]
    fn test_round_trip_preserves_transforms() {
        let trained = trained_artifacts();
        let (_dir, store, manifest) = published_store();
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(loaded.manifest, manifest);
        assert_eq!(loaded.scaler.mean().to_bits(), trained.scaler.mean().to_bits());
        assert_eq!(loaded.scaler.scale().to_bits(), trained.scaler.scale().to_bits());
        // Every split threshold must survive the JSON text exactly
        assert_eq!(
            serde_json::to_string(&loaded.classifier).unwrap(),
            serde_json::to_string(&trained.classifier).unwrap()
        );

        for (amount, category) in [(1234.0, "transfer"), (15.5, "purchase"), (48_000.0, "withdrawal")] {
            let record = TransactionRecord::new(amount, category, "debit");
            let mut before = encode(&record);
            let mut after = before;
            trained.scaler.transform(&mut before).unwrap();
            loaded.scaler.transform(&mut after).unwrap();
            assert_eq!(before, after);
            assert_eq!(
                trained.classifier.predict_proba(&before),
                loaded.classifier.predict_proba(&after)
            );
        }
    }

    #[test]
    fn test_manifest_contents() {
        let (_dir, store, manifest) = published_store();
        assert_eq!(manifest.schema_version, SCHEMA_VERSION);
        assert_eq!(manifest.vocabulary_hash, vocabulary_hash());
        assert_eq!(manifest.feature_names, feature_names());
        assert_eq!(manifest.scaler_sha256.len(), 64);
        assert!(store.run_dir(&manifest.version_tag).join(MODEL_FILE).is_file());

        // No staging directories, pending manifests or lock left behind
        let leftovers: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with('.'))
            .collect();
        assert!(leftovers.is_empty(), "leftover files: {:?}", leftovers);
    }

    #[test]
    fn test_missing_model_is_mismatch() {
        let (_dir, store, manifest) = published_store();
        fs::remove_file(store.run_dir(&manifest.version_tag).join(MODEL_FILE)).unwrap();
        let err = store.load().unwrap_err();
        assert!(matches!(err, Error::ArtifactMismatch(_)));
        assert!(err.to_string().contains(MODEL_FILE));
        assert!(matches!(store.status().unwrap(), ArtifactStatus::Invalid(_)));
    }

    #[test]
    fn test_mixed_runs_are_rejected() {
        let (_dir_a, store_a, run_a) = published_store();
        let (_dir_b, store_b, run_b) = published_store();

        // Scaler from run B next to the model and manifest of run A
        fs::copy(
            store_b.run_dir(&run_b.version_tag).join(SCALER_FILE),
            store_a.run_dir(&run_a.version_tag).join(SCALER_FILE),
        )
        .unwrap();
        assert!(matches!(store_a.load(), Err(Error::ArtifactMismatch(_))));
    }

    #[test]
    fn test_foreign_vocabulary_rejected() {
        let (_dir, store, mut manifest) = published_store();
        manifest.vocabulary_hash = "0".repeat(64);
        fs::write(
            store.manifest_path(),
            serde_json::to_vec_pretty(&manifest).unwrap(),
        )
        .unwrap();
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("vocabulary"));
    }

    #[test]
    fn test_manifest_cannot_point_outside_runs() {
        let (_dir, store, mut manifest) = published_store();
        manifest.version_tag = "../../elsewhere".to_string();
        fs::write(
            store.manifest_path(),
            serde_json::to_vec_pretty(&manifest).unwrap(),
        )
        .unwrap();
        assert!(matches!(store.load(), Err(Error::ArtifactMismatch(_))));
    }

    #[test]
    fn test_tampered_artifact_rejected() {
        let (_dir, store, manifest) = published_store();
        fs::write(
            store.run_dir(&manifest.version_tag).join(SCALER_FILE),
            b"garbage",
        )
        .unwrap();
        assert!(matches!(store.load(), Err(Error::ArtifactMismatch(_))));
    }

    #[test]
    fn test_crash_before_commit_keeps_serving_previous_run() {
        let (_dir, store, first) = published_store();
        let predictor = Predictor::load(store.clone()).unwrap();
        let record = TransactionRecord::new(30_000.0, "transfer", "debit");
        let before = predictor.predict(&record).unwrap();

        // Second run fully staged, then the process dies before the
        // manifest is replaced
        let second = Trainer::with_config(quick_config())
            .train(&labeled_dataset(25, 15, 7))
            .unwrap();
        let lock = store.lock().unwrap();
        let staged = store.stage_run(&lock, &second).unwrap();
        drop(lock);
        assert!(store.run_dir(&staged.version_tag).is_dir());

        // A half-written third run and an abandoned pending manifest
        let partial = store.run_dir("20240101T000000Z-000000000000");
        fs::create_dir_all(&partial).unwrap();
        fs::write(partial.join(SCALER_FILE), b"partial").unwrap();
        fs::write(store.dir().join(".manifest-abandoned"), b"{").unwrap();

        let fresh = store.load().unwrap().unwrap();
        assert_eq!(fresh.manifest, first);
        assert_eq!(store.status().unwrap(), ArtifactStatus::Trained(first.clone()));

        predictor.invalidate();
        assert_eq!(predictor.version_tag().unwrap(), Some(first.version_tag.clone()));
        assert_eq!(predictor.predict(&record).unwrap(), before);

        // The next successful publish supersedes and prunes the debris
        let lock = store.lock().unwrap();
        let third = store.publish(&lock, &second).unwrap();
        assert_eq!(run_names(&store), vec![third.version_tag.clone()]);
        assert!(!store.dir().join(".manifest-abandoned").exists());
        assert_eq!(store.load().unwrap().unwrap().manifest, third);
    }

    #[test]
    fn test_crash_before_first_commit_is_untrained() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let lock = store.lock().unwrap();
        store.stage_run(&lock, &trained_artifacts()).unwrap();
        assert!(store.load().unwrap().is_none());
        assert_eq!(store.status().unwrap(), ArtifactStatus::Untrained);
    }

    #[test]
    fn test_commit_switches_runs_atomically() {
        let (_dir, store, first) = published_store();
        let lock = store.lock().unwrap();
        let staged = store.stage_run(&lock, &trained_artifacts()).unwrap();

        // Both runs coexist until the manifest moves
        assert_eq!(store.load().unwrap().unwrap().manifest, first);
        store.commit(&staged).unwrap();
        assert_eq!(store.load().unwrap().unwrap().manifest, staged);

        // Crash before pruning: the stale run is harmless
        assert_eq!(run_names(&store).len(), 2);
        assert_eq!(store.load().unwrap().unwrap().manifest, staged);
    }

    #[test]
    fn test_lock_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let lock = store.lock().unwrap();
        assert!(lock.is_held());
        assert!(matches!(store.lock(), Err(Error::Locked(_))));
        drop(lock);
        assert!(store.lock().is_ok());
    }

    #[test]
    fn test_break_stale_lock() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let lock = store.lock().unwrap();
        std::mem::forget(lock);

        assert!(store.break_lock().unwrap());
        assert!(!store.break_lock().unwrap());
        assert!(store.lock().is_ok());
    }

    #[test]
    fn test_broken_lock_owner_leaves_new_lock_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let old = store.lock().unwrap();
        assert!(store.break_lock().unwrap());
        let new = store.lock().unwrap();
        assert!(!old.is_held());

        // The superseded run can neither publish nor release the new lock
        assert!(matches!(
            store.publish(&old, &trained_artifacts()),
            Err(Error::Locked(_))
        ));
        drop(old);
        assert!(new.is_held());
        assert!(matches!(store.lock(), Err(Error::Locked(_))));

        drop(new);
        assert!(store.lock().is_ok());
    }

    #[test]
    fn test_publish_requires_own_lock() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("a"));
        let other = ArtifactStore::new(dir.path().join("b"));
        let foreign = other.lock().unwrap();
        let err = store.publish(&foreign, &trained_artifacts()).unwrap_err();
        assert!(matches!(err, Error::Locked(_)));
    }

    #[test]
    fn test_republish_replaces_pair() {
        let (_dir, store, first) = published_store();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let lock = store.lock().unwrap();
        let second = store.publish(&lock, &trained_artifacts()).unwrap();
        assert_ne!(first.version_tag, second.version_tag);
        assert_eq!(store.load().unwrap().unwrap().manifest, second);
        assert_eq!(run_names(&store), vec![second.version_tag]);
    }
}
