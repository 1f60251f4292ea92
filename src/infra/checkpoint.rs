// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores the best model of a run, keyed by the run's
// hyperparameter signature.
//
// File layout:
//   checkpoints/
//     rs=512,nl=2,es=128,dir=bi,kp=0.75,th=0.95/
//       model.mpk           ← CompactRecorder weights
//       checkpoint.json     ← CheckpointMeta (signature, vocabulary, loss)
//       train_config.json   ← full TrainConfig of the run
//       metrics.csv         ← one row per evaluation
//
// Write order on every new record:
//   1. weights → model-staging.mpk, metadata → NamedTempFile
//   2. previous model.mpk → model-backup.mpk
//   3. model-staging.mpk → model.mpk
//   4. metadata temp file → checkpoint.json
//   5. model-backup.mpk removed
// Nothing is renamed until both new files are complete. If step 3
// or 4 fails the backup is moved back, so a failed save leaves the
// previous best checkpoint in place.
//
// Loading goes the other way: the metadata is read first and its
// signature compared against the one requested, and only then are
// the weights pulled into a freshly initialised model.

use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use burn::{
    prelude::*,
    record::{CompactRecorder, FileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::application::train_use_case::TrainConfig;
use crate::data::vocabulary::VocabularyRecord;
use crate::domain::error::SpellError;
use crate::domain::signature::HyperSignature;
use crate::ml::model::Seq2SeqModel;

/// Bumped whenever the on-disk layout changes.
pub const FORMAT_VERSION: u32 = 1;

const MODEL_STEM:   &str = "model";
const STAGING_STEM: &str = "model-staging";
const BACKUP_STEM:  &str = "model-backup";
const META_FILE:    &str = "checkpoint.json";
const CONFIG_FILE:  &str = "train_config.json";

/// Everything besides the weights needed to reuse a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub format_version: u32,
    pub signature:      HyperSignature,
    pub vocabulary:     VocabularyRecord,
    /// Total test loss of the evaluation that produced this checkpoint
    pub test_loss:      f64,
    pub iteration:      usize,
    pub epoch:          usize,
}

impl CheckpointMeta {
    pub fn new(
        signature:  HyperSignature,
        vocabulary: VocabularyRecord,
        test_loss:  f64,
        iteration:  usize,
        epoch:      usize,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            signature,
            vocabulary,
            test_loss,
            iteration,
            epoch,
        }
    }
}

pub struct CheckpointManager {
    root: PathBuf,
}

impl CheckpointManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding every artefact of the run with `signature`.
    pub fn run_dir(&self, signature: &HyperSignature) -> PathBuf {
        self.root.join(signature.key())
    }

    /// Create the run directory if needed and return it.
    pub fn prepare(&self, signature: &HyperSignature) -> Result<PathBuf, SpellError> {
        let dir = self.run_dir(signature);
        fs::create_dir_all(&dir).map_err(|e| SpellError::checkpoint_io(&dir, e))?;
        Ok(dir)
    }

    /// Persist `model` as the new best checkpoint for `meta.signature`.
    /// On error the previous checkpoint, if any, is left untouched.
    pub fn save<B: Backend>(
        &self,
        model: &Seq2SeqModel<B>,
        meta:  &CheckpointMeta,
    ) -> Result<PathBuf, SpellError> {
        let dir       = self.prepare(&meta.signature)?;
        let target    = with_recorder_extension::<B>(&dir.join(MODEL_STEM));
        let backup    = with_recorder_extension::<B>(&dir.join(BACKUP_STEM));
        let meta_path = dir.join(META_FILE);

        // ── 1. stage weights and metadata ─────────────────────────────────────
        let staging = dir.join(STAGING_STEM);
        CompactRecorder::new()
            .record(model.clone().into_record(), staging.clone())
            .map_err(|e| SpellError::checkpoint_io(&staging, e))?;
        let staged = with_recorder_extension::<B>(&staging);

        let meta_temp = match stage_json(&meta_path, meta) {
            Ok(temp) => temp,
            Err(e) => {
                discard(&staged);
                return Err(e);
            }
        };

        // ── 2. previous best aside ────────────────────────────────────────────
        let had_previous = target.exists();
        if had_previous {
            if let Err(e) = fs::rename(&target, &backup) {
                discard(&staged);
                return Err(SpellError::checkpoint_io(&backup, e));
            }
        }

        // ── 3. new weights in ─────────────────────────────────────────────────
        if let Err(e) = fs::rename(&staged, &target) {
            discard(&staged);
            if had_previous {
                restore(&backup, &target);
            }
            return Err(SpellError::checkpoint_io(&target, e));
        }

        // ── 4. metadata in ────────────────────────────────────────────────────
        if let Err(e) = meta_temp.persist(&meta_path) {
            if had_previous {
                restore(&backup, &target);
            } else {
                discard(&target);
            }
            return Err(SpellError::checkpoint_io(&meta_path, e.error));
        }

        // ── 5. backup out ─────────────────────────────────────────────────────
        if had_previous {
            discard(&backup);
        }

        tracing::debug!("Saved checkpoint '{}' (test loss {:.4})", dir.display(), meta.test_loss);
        Ok(dir)
    }

    /// Read and validate the metadata of the checkpoint for `signature`.
    pub fn load_meta(&self, signature: &HyperSignature) -> Result<CheckpointMeta, SpellError> {
        let path = self.run_dir(signature).join(META_FILE);
        let json = fs::read_to_string(&path).map_err(|e| {
            SpellError::checkpoint_io(&path, format!("{e}; has this configuration been trained?"))
        })?;
        let meta: CheckpointMeta =
            serde_json::from_str(&json).map_err(|e| SpellError::checkpoint_io(&path, e))?;

        if meta.format_version != FORMAT_VERSION {
            return Err(SpellError::checkpoint_io(
                &path,
                format!(
                    "format version {} is not supported (expected {FORMAT_VERSION})",
                    meta.format_version
                ),
            ));
        }
        if meta.signature != *signature {
            return Err(SpellError::IncompatibleCheckpoint {
                expected: *signature,
                found:    meta.signature,
            });
        }
        Ok(meta)
    }

    /// Load the saved weights into `model`, which must have the same architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:     Seq2SeqModel<B>,
        signature: &HyperSignature,
        device:    &B::Device,
    ) -> Result<Seq2SeqModel<B>, SpellError> {
        let path = self.run_dir(signature).join(MODEL_STEM);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .map_err(|e| SpellError::checkpoint_io(&path, e))?;

        Ok(model.load_record(record))
    }

    /// Write the run's configuration next to its checkpoint.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<(), SpellError> {
        let dir = self.prepare(&cfg.signature())?;
        write_json_atomic(&dir.join(CONFIG_FILE), cfg)?;
        tracing::debug!("Saved training config to '{}'", dir.display());
        Ok(())
    }

    pub fn load_config(&self, signature: &HyperSignature) -> Result<TrainConfig, SpellError> {
        let path = self.run_dir(signature).join(CONFIG_FILE);
        let json = fs::read_to_string(&path).map_err(|e| SpellError::checkpoint_io(&path, e))?;
        serde_json::from_str(&json).map_err(|e| SpellError::checkpoint_io(&path, e))
    }
}

fn with_recorder_extension<B: Backend>(stem: &Path) -> PathBuf {
    stem.with_extension(<CompactRecorder as FileRecorder<B>>::file_extension())
}

/// Serialise to a temp file in the target's directory. Nothing is
/// visible at `path` until the returned file is persisted.
fn stage_json<T: Serialize>(path: &Path, value: &T) -> Result<NamedTempFile, SpellError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let temp = NamedTempFile::new_in(dir).map_err(|e| SpellError::checkpoint_io(path, e))?;
    {
        let mut writer = BufWriter::new(&temp);
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| SpellError::checkpoint_io(path, e))?;
        writer.flush().map_err(|e| SpellError::checkpoint_io(path, e))?;
    }
    Ok(temp)
}

/// Serialise to a temp file in the target's directory, then rename into place.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), SpellError> {
    stage_json(path, value)?
        .persist(path)
        .map_err(|e| SpellError::checkpoint_io(path, e.error))?;
    Ok(())
}

/// Move the previous weights back after a failed save.
fn restore(backup: &Path, target: &Path) {
    if let Err(e) = fs::rename(backup, target) {
        tracing::error!(
            "Could not restore '{}' from '{}': {e}",
            target.display(),
            backup.display()
        );
    }
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!("Could not remove '{}': {e}", path.display());
    }
}
