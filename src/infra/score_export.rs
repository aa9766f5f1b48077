// ============================================================
// Layer 6 — Score Export
// ============================================================
// Writes the per-step importance scores of the held-out videos
// after every evaluation pass:
//
//   <score_dir>/<dataset>_<epoch>.json   { "video_7": [0.41, ...], ... }
//
// and, when enabled, the global attention matrices:
//
//   <score_dir>/weights.json             { "video_7": [[...], ...], ... }
//
// Attention matrices are n_steps² per video, so they are opt-in
// and the file is overwritten by each pass.

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

pub struct ScoreExporter {
    dir:     PathBuf,
    dataset: String,
}

impl ScoreExporter {
    pub fn new(dir: impl Into<PathBuf>, dataset: impl Into<String>) -> Self {
        Self { dir: dir.into(), dataset: dataset.into() }
    }

    pub fn scores_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("{}_{epoch}.json", self.dataset))
    }

    pub fn weights_path(&self) -> PathBuf {
        self.dir.join("weights.json")
    }

    pub fn save_scores(&self, epoch: usize, scores: &BTreeMap<String, Vec<f32>>) -> Result<PathBuf> {
        let path = self.scores_path(epoch);
        self.write(&path, scores)?;
        tracing::debug!("Exported scores of {} videos to '{}'", scores.len(), path.display());
        Ok(path)
    }

    pub fn save_attention(&self, weights: &BTreeMap<String, Vec<Vec<f32>>>) -> Result<PathBuf> {
        let path = self.weights_path();
        self.write(&path, weights)?;
        Ok(path)
    }

    fn write<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create score directory '{}'", self.dir.display()))?;
        let json = serde_json::to_string(value)?;
        fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))
    }
}
