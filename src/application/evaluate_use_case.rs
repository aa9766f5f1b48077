// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores a trained checkpoint without training:
//
//   Step 1: Load train_config.json from the checkpoint dir
//   Step 2: Rebuild the same train / test split
//   Step 3: Load last_epoch.mpk and run one evaluation pass
//
// The saved config is authoritative for the architecture and the
// split; the caller may only override the evaluation method, the
// device and where scores are written.

use anyhow::Result;
use burn::data::dataset::Dataset;

use crate::application::train_use_case::{load_datasets, TrainConfig};
use crate::domain::policy::{DeviceKind, EvalMethod, Mode};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{evaluator::EvalReport, trainer::run_evaluation};

/// Settings the caller may change at evaluation time.
#[derive(Debug, Clone, Default)]
pub struct EvalOverrides {
    pub eval_method:  Option<EvalMethod>,
    pub device:       Option<DeviceKind>,
    pub score_dir:    Option<String>,
    pub save_weights: bool,
}

pub struct EvaluateUseCase {
    config: TrainConfig,
}

impl EvaluateUseCase {
    pub fn new(checkpoint_dir: &str, overrides: EvalOverrides) -> Result<Self> {
        let mut config = CheckpointManager::new(checkpoint_dir).load_config()?;
        config.mode     = Mode::Test;
        config.save_dir = checkpoint_dir.to_string();
        if let Some(method) = overrides.eval_method {
            config.eval_method = method;
        }
        if let Some(device) = overrides.device {
            config.device = device;
        }
        if let Some(dir) = overrides.score_dir {
            config.score_dir = dir;
        }
        config.save_weights |= overrides.save_weights;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Returns the checkpoint epoch and its F-scores.
    pub fn execute(&self) -> Result<(usize, EvalReport)> {
        let (train, test) = load_datasets(&self.config)?;
        tracing::info!("Evaluating on {} test and {} train videos", test.len(), train.len());
        run_evaluation(&self.config, &test, &train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_checkpoint_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nothing").display().to_string();
        assert!(EvaluateUseCase::new(&missing, EvalOverrides::default()).is_err());
    }

    #[test]
    fn test_overrides_apply_on_top_of_saved_config() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = dir.path().display().to_string();
        CheckpointManager::new(&ckpt).save_config(&TrainConfig::default()).unwrap();

        let overrides = EvalOverrides {
            eval_method: Some(EvalMethod::Avg),
            device:      Some(DeviceKind::Cpu),
            ..EvalOverrides::default()
        };
        let uc = EvaluateUseCase::new(&ckpt, overrides).unwrap();
        assert_eq!(uc.config().mode, Mode::Test);
        assert_eq!(uc.config().eval_method, EvalMethod::Avg);
        assert_eq!(uc.config().device, DeviceKind::Cpu);
        assert_eq!(uc.config().save_dir, ckpt);
    }
}
