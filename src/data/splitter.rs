// ============================================================
// Layer 4 — Train/Test Splitter
// ============================================================
// Decides which videos are used for training and which are
// held out.
//
// Two sources:
//   1. A splits file — the standard protocol for SumMe/TVSum,
//      a JSON array of folds:
//        [ { "train_keys": ["video_1", ...],
//            "test_keys":  ["video_7", ...] }, ... ]
//      The configured split index selects one fold.
//   2. No splits file — shuffle the keys with the run seed and
//      cut at `train_fraction`.
//
// Shuffling is seeded so a run is reproducible.
//
// Reference: rand crate documentation (SliceRandom, StdRng)

use anyhow::{Context, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::error::SolverError;

/// One fold of a splits file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub train_keys: Vec<String>,
    pub test_keys:  Vec<String>,
}

/// Read fold `index` from a splits file.
pub fn load_split(path: impl AsRef<Path>, index: usize) -> Result<Split> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read splits file '{}'", path.display()))?;
    let mut folds: Vec<Split> = serde_json::from_str(&json)
        .with_context(|| format!("Cannot parse splits file '{}'", path.display()))?;

    if index >= folds.len() {
        return Err(SolverError::InvalidConfig(format!(
            "split index {index} out of range ({} folds in '{}')",
            folds.len(),
            path.display()
        ))
        .into());
    }
    Ok(folds.swap_remove(index))
}

/// Shuffle `samples` with `seed` and split into (train, test).
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction).round() as usize;
    let split_at = split_at.min(total);

    // After split_off: samples = [0..split_at], held_out = [split_at..total]
    let held_out = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} held out",
        samples.len(),
        held_out.len(),
    );

    (samples, held_out)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, test)     = split_train_val(items, 0.8, 7);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(),  20);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, test)     = split_train_val(items, 0.7, 7);
        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_train_val((0..30).collect::<Vec<usize>>(), 0.5, 12345);
        let b = split_train_val((0..30).collect::<Vec<usize>>(), 0.5, 12345);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let items: Vec<usize> = Vec::new();
        let (train, test)     = split_train_val(items, 0.8, 1);
        assert!(train.is_empty());
        assert!(test.is_empty());
    }

    #[test]
    fn test_load_split_picks_fold() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("splits.json");
        std::fs::write(&path, r#"[
            {"train_keys": ["video_1"], "test_keys": ["video_2"]},
            {"train_keys": ["video_2"], "test_keys": ["video_1"]}
        ]"#).unwrap();

        let fold = load_split(&path, 1).unwrap();
        assert_eq!(fold.train_keys, vec!["video_2"]);
        assert!(load_split(&path, 2).is_err());
    }
}
