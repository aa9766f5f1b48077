// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the annotated videos   (Layer 4 - data)
//   Step 2: Choose train / test keys    (Layer 4 - data)
//   Step 3: Build datasets              (Layer 4 - data)
//   Step 4: Save config                 (Layer 6 - infra)
//   Step 5: Run training loop           (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};

use crate::data::{
    dataset::{VideoDataset, VideoSample},
    loader::JsonVideoSource,
    splitter::{load_split, split_train_val},
};
use crate::domain::{
    error::SolverError,
    policy::{DeviceKind, EvalMethod, FusionMode, InitPolicy, Mode, PositionalEncoding},
    traits::VideoSource,
    video::VideoRecord,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    model::PglSumConfig,
    trainer::{run_training, TrainReport},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Every hyperparameter and path of a run. Built once from the
// CLI, never mutated afterwards, and saved next to the checkpoint
// so `evaluate` can rebuild the same model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub mode:           Mode,
    pub dataset_path:   String,
    pub splits_path:    Option<String>,
    pub split_index:    usize,
    pub train_fraction: f64,
    pub save_dir:       String,
    pub log_dir:        String,
    pub score_dir:      String,
    pub seed:           u64,
    pub device:         DeviceKind,
    pub input_size:     usize,
    pub n_segments:     Option<usize>,
    pub heads:          usize,
    pub fusion:         FusionMode,
    pub pos_enc:        Option<PositionalEncoding>,
    pub init_type:      Option<InitPolicy>,
    pub init_gain:      f64,
    pub lr:             f64,
    pub l2_req:         f64,
    pub n_epochs:       usize,
    pub batch_size:     usize,
    pub clip:           f64,
    pub eval_method:    EvalMethod,
    pub verbose:        bool,
    pub save_weights:   bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            mode:           Mode::Train,
            dataset_path:   "data/summe.json".to_string(),
            splits_path:    None,
            split_index:    0,
            train_fraction: 0.8,
            save_dir:       "checkpoints".to_string(),
            log_dir:        "logs".to_string(),
            score_dir:      "scores".to_string(),
            seed:           12345,
            device:         DeviceKind::Gpu,
            input_size:     1024,
            n_segments:     Some(4),
            heads:          8,
            fusion:         FusionMode::Add,
            pos_enc:        Some(PositionalEncoding::Absolute),
            init_type:      Some(InitPolicy::Xavier),
            init_gain:      std::f64::consts::SQRT_2,
            lr:             5e-5,
            l2_req:         1e-5,
            n_epochs:       200,
            batch_size:     20,
            clip:           5.0,
            eval_method:    EvalMethod::Max,
            verbose:        false,
            save_weights:   false,
        }
    }
}

impl TrainConfig {
    /// Checks that do not need the dataset.
    pub fn validate(&self) -> Result<(), SolverError> {
        if self.batch_size == 0 {
            return Err(SolverError::InvalidConfig("batch_size must be at least 1".into()));
        }
        if !(self.clip.is_finite() && self.clip > 0.0) {
            return Err(SolverError::InvalidConfig(format!("clip must be positive, got {}", self.clip)));
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(SolverError::InvalidConfig(format!("lr must be positive, got {}", self.lr)));
        }
        if !(self.train_fraction > 0.0 && self.train_fraction <= 1.0) {
            return Err(SolverError::InvalidConfig(format!(
                "train_fraction must be in (0, 1], got {}", self.train_fraction
            )));
        }
        Ok(())
    }

    pub fn model_config(&self) -> PglSumConfig {
        PglSumConfig::new(self.input_size)
            .with_num_segments(self.n_segments)
            .with_heads(self.heads)
            .with_fusion(self.fusion)
            .with_pos_enc(self.pos_enc)
    }

    /// Dataset file stem, used to name exported score files.
    pub fn dataset_name(&self) -> String {
        Path::new(&self.dataset_path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".to_string())
    }
}

// ─── Dataset assembly ────────────────────────────────────────────────────────
/// Load the dataset and split it into (train, test) per the config.
pub fn load_datasets(cfg: &TrainConfig) -> Result<(VideoDataset, VideoDataset)> {
    let records: BTreeMap<String, VideoRecord> =
        JsonVideoSource::new(&cfg.dataset_path).load_all()?.into_iter().collect();

    if let Some((key, record)) = records.iter().find(|(_, r)| r.input_size() != cfg.input_size) {
        return Err(SolverError::InvalidConfig(format!(
            "'{key}' has {} features per step but input_size is {}",
            record.input_size(), cfg.input_size
        ))
        .into());
    }

    let (train_keys, test_keys) = match &cfg.splits_path {
        Some(path) => {
            let split = load_split(path, cfg.split_index)?;
            tracing::info!("Using split {} of '{}'", cfg.split_index, path);
            (split.train_keys, split.test_keys)
        }
        None => split_train_val(records.keys().cloned().collect(), cfg.train_fraction, cfg.seed),
    };

    Ok((
        dataset_from_keys(&train_keys, &records)?,
        dataset_from_keys(&test_keys, &records)?,
    ))
}

fn dataset_from_keys(keys: &[String], records: &BTreeMap<String, VideoRecord>) -> Result<VideoDataset> {
    let samples = keys
        .iter()
        .map(|key| {
            records
                .get(key)
                .map(|record| VideoSample::from_record(key.as_str(), record))
                .ok_or_else(|| SolverError::MissingVideo(key.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(VideoDataset::new(samples))
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1–3: Load, split and build datasets ──────────────────────────
        tracing::info!("Loading dataset from '{}'", cfg.dataset_path);
        let (train, test) = load_datasets(cfg)?;
        tracing::info!("Split: {} train, {} test", train.len(), test.len());

        // ── Step 4: Save config for evaluation ────────────────────────────────
        CheckpointManager::new(&cfg.save_dir).save_config(cfg)?;

        // ── Step 5: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, &train, &test)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backend_rng_lock;
    use crate::application::evaluate_use_case::{EvalOverrides, EvaluateUseCase};
    use crate::ml::early_stopping::LoopOutcome;
    use std::fs;

    /// Writes `n` videos of `steps` steps with 8 features each.
    fn write_dataset(path: &Path, n: usize, steps: usize) {
        let mut videos = serde_json::Map::new();
        for v in 0..n {
            let n_frames = steps * 4;
            let features: Vec<Vec<f32>> = (0..steps)
                .map(|s| (0..8).map(|d| ((v * 31 + s * 7 + d) % 11) as f32 / 11.0).collect())
                .collect();
            let gtscore: Vec<f32> = (0..steps).map(|s| ((s + v) % 3) as f32 / 2.0).collect();
            let picks: Vec<usize> = (0..steps).map(|s| s * 4).collect();
            let change_points: Vec<[usize; 2]> = (0..steps / 2).map(|c| [c * 8, c * 8 + 7]).collect();
            let user: Vec<u8> = (0..n_frames).map(|f| u8::from(f % 8 < 2)).collect();
            videos.insert(
                format!("video_{}", v + 1),
                serde_json::json!({
                    "features": features, "gtscore": gtscore, "change_points": change_points,
                    "n_frames": n_frames, "picks": picks, "user_summary": [user],
                }),
            );
        }
        fs::write(path, serde_json::Value::Object(videos).to_string()).unwrap();
    }

    fn config(dir: &Path) -> TrainConfig {
        TrainConfig {
            dataset_path: dir.join("tiny.json").display().to_string(),
            save_dir:     dir.join("ckpt").display().to_string(),
            log_dir:      dir.join("logs").display().to_string(),
            score_dir:    dir.join("scores").display().to_string(),
            device:       DeviceKind::Cpu,
            input_size:   8,
            n_segments:   Some(2),
            heads:        2,
            batch_size:   2,
            n_epochs:     2,
            lr:           1e-3,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(TrainConfig { batch_size: 0, ..TrainConfig::default() }.validate().is_err());
        assert!(TrainConfig { clip: 0.0, ..TrainConfig::default() }.validate().is_err());
        assert!(TrainConfig { train_fraction: 0.0, ..TrainConfig::default() }.validate().is_err());
        assert!(TrainConfig::default().validate().is_ok());
    }

    #[test]
    fn test_dataset_name_is_file_stem() {
        let cfg = TrainConfig { dataset_path: "data/eccv16_summe.json".into(), ..TrainConfig::default() };
        assert_eq!(cfg.dataset_name(), "eccv16_summe");
    }

    #[test]
    fn test_load_datasets_with_random_split() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(&dir.path().join("tiny.json"), 5, 4);
        let (train, test) = load_datasets(&config(dir.path())).unwrap();
        assert_eq!((train.len(), test.len()), (4, 1));
    }

    #[test]
    fn test_splits_file_with_unknown_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(&dir.path().join("tiny.json"), 2, 4);
        let splits = dir.path().join("splits.json");
        fs::write(&splits, r#"[{"train_keys": ["video_1"], "test_keys": ["video_9"]}]"#).unwrap();

        let cfg = TrainConfig { splits_path: Some(splits.display().to_string()), ..config(dir.path()) };
        let err = load_datasets(&cfg).unwrap_err();
        assert!(matches!(err.downcast_ref::<SolverError>(), Some(SolverError::MissingVideo(_))));
    }

    #[test]
    fn test_input_size_mismatch_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(&dir.path().join("tiny.json"), 2, 4);
        let cfg = TrainConfig { input_size: 16, ..config(dir.path()) };
        assert!(load_datasets(&cfg).is_err());
    }

    #[test]
    fn test_end_to_end_training_on_cpu() {
        let _rng = backend_rng_lock();
        let dir = tempfile::tempdir().unwrap();
        write_dataset(&dir.path().join("tiny.json"), 5, 6);
        let cfg = config(dir.path());

        let report = TrainUseCase::new(cfg.clone()).execute().unwrap();

        let completed = match report.outcome {
            LoopOutcome::Completed { epochs } => epochs,
            LoopOutcome::Stopped { epoch }    => epoch,
        };
        let log = fs::read_to_string(dir.path().join("logs").join("trainlog.txt")).unwrap();
        assert!((1..=2).contains(&log.lines().count()));
        assert!(log.lines().count() <= completed);
        assert!(log.starts_with("epoch:0 loss:"));

        assert!(dir.path().join("ckpt").join("last_epoch.mpk").exists());
        assert!(dir.path().join("ckpt").join("train_config.json").exists());
        assert!(dir.path().join("scores").join("tiny_0.json").exists());

        let eval = report.last_eval.unwrap();
        assert!((0.0..=100.0).contains(&eval.f1_test));

        // the saved checkpoint reproduces the last evaluation
        let ckpt = dir.path().join("ckpt").display().to_string();
        let (epoch, again) = EvaluateUseCase::new(&ckpt, EvalOverrides::default())
            .unwrap()
            .execute()
            .unwrap();
        assert_eq!(epoch + 1, log.lines().count());
        assert!((again.f1_test - eval.f1_test).abs() < 1e-9);
        assert!((again.f1_train - eval.f1_train).abs() < 1e-9);
    }
}
