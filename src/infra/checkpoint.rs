// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores PGL-SUM weights with Burn's named
// MessagePack recorder at full precision.
//
// What gets saved:
//   1. last_epoch.mpk      — model weights, overwritten every epoch
//   2. latest_epoch.json   — index of the epoch those weights are from
//   3. train_config.json   — hyperparameters, written before training
//
// The config is needed to rebuild the exact architecture
// (input_size, heads, segments, fusion, ...) before the weights
// can be loaded into it.
//
// File layout:
//   <save_dir>/
//     last_epoch.mpk
//     latest_epoch.json
//     train_config.json
//
// The directory is created on first save if it is missing.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::PglSum;

/// Checkpoint file stem; the recorder appends `.mpk`.
pub const CHECKPOINT_STEM: &str = "last_epoch";

type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Manages the checkpoint files of one run.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the weights file, extension included.
    pub fn model_path(&self) -> PathBuf {
        self.dir.join(format!("{CHECKPOINT_STEM}.mpk"))
    }

    /// Overwrite `last_epoch.mpk` with the current weights and record
    /// which epoch they belong to.
    pub fn save_model<B: Backend>(&self, model: &PglSum<B>, epoch: usize) -> Result<PathBuf> {
        self.ensure_dir()?;
        let stem = self.dir.join(CHECKPOINT_STEM);

        CheckpointRecorder::new()
            .record(model.clone().into_record(), stem.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", stem.display()))?;

        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", latest_path.display()))?;

        let path = self.model_path();
        tracing::info!("Save parameters at {}", path.display());
        Ok(path)
    }

    /// Load `last_epoch.mpk` into a model of the same architecture.
    pub fn load_model<B: Backend>(&self, model: PglSum<B>, device: &B::Device) -> Result<PglSum<B>> {
        let stem = self.dir.join(CHECKPOINT_STEM);

        let record = CheckpointRecorder::new()
            .load(stem.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    stem.display())
            })?;

        Ok(model.load_record(record))
    }

    /// Epoch index of the saved weights.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Have you run 'train' first?", path.display()))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'evaluate'.",
                    path.display()
                )
            })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Cannot parse config '{}'", path.display()))
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", self.dir.display()))
    }
}
