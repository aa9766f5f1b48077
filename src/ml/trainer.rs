// ============================================================
// Layer 5 — Solver (Training Loop)
// ============================================================
// Builds the PGL-SUM model and trains it video by video.
//
//   build():  model ─► weight initializer ─► checkpoint manager,
//             metrics logger, evaluator
//
//   train():  for epoch in 0..n_epochs
//               shuffle training order (seeded)
//               for batch in 0..len / batch_size
//                 fresh gradient accumulator
//                 for video in batch
//                   scores = model(features)
//                   loss   = MSE(scores, gtscore)
//                   grads += ∂loss
//                 clip global grad norm to `clip`
//                 Adam step (lr, weight decay l2_req)
//             mean loss ─► early stopping ─► checkpoint,
//             evaluate, log
//
// Key Burn 0.20 insight:
//   - Training runs on an Autodiff<…> backend
//   - model.valid() returns the model on the inner backend,
//     which is what the evaluation pass receives
//   - One loss.backward() per video, summed with a
//     GradientsAccumulator, gives the same update as
//     back-propagating every video before a single step
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataset::Dataset,
    module::AutodiffModule,
    nn::loss::{MseLoss, Reduction},
    optim::{
        decay::WeightDecayConfig, AdamConfig, GradientsAccumulator, GradientsParams, Optimizer,
    },
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::VideoBatcher, dataset::VideoDataset};
use crate::domain::{
    error::SolverError,
    metric::{evaluate_summary, mean_finite},
    policy::{DeviceKind, EvalMethod, Mode},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger, TAG_F1_TEST, TAG_F1_TRAIN, TAG_LOSS},
    score_export::ScoreExporter,
};
use crate::ml::{
    clip::clip_grad_norm,
    early_stopping::{drive_epochs, EpochRunner, EpochTrend, LoopOutcome},
    evaluator::{to_host, EvalReport, Evaluator},
    init::WeightInitializer,
    model::PglSum,
};

type GpuBackend = burn::backend::Autodiff<burn::backend::Wgpu>;
type CpuBackend = burn::backend::Autodiff<burn::backend::NdArray>;

/// Build a solver on the configured device and train it.
pub fn run_training(cfg: &TrainConfig, train: &VideoDataset, test: &VideoDataset) -> Result<TrainReport> {
    match cfg.device {
        DeviceKind::Gpu => {
            let device = burn::backend::wgpu::WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", device);
            Solver::<GpuBackend>::build(cfg.clone(), device)?.train(train, test)
        }
        DeviceKind::Cpu => {
            tracing::info!("Using ndarray CPU backend");
            Solver::<CpuBackend>::build(cfg.clone(), Default::default())?.train(train, test)
        }
    }
}

/// Rebuild the model from the checkpoint and run one evaluation pass.
/// Returns the checkpoint's epoch with the report.
pub fn run_evaluation(
    cfg:         &TrainConfig,
    test:        &VideoDataset,
    train_infer: &VideoDataset,
) -> Result<(usize, EvalReport)> {
    fn evaluate<B: AutodiffBackend>(
        cfg:         &TrainConfig,
        device:      B::Device,
        test:        &VideoDataset,
        train_infer: &VideoDataset,
    ) -> Result<(usize, EvalReport)> {
        let mut solver = Solver::<B>::build(cfg.clone(), device)?;
        let epoch  = solver.load_checkpoint()?;
        let report = solver.evaluate(test, train_infer, epoch)?;
        Ok((epoch, report))
    }

    match cfg.device {
        DeviceKind::Gpu => evaluate::<GpuBackend>(cfg, Default::default(), test, train_infer),
        DeviceKind::Cpu => evaluate::<CpuBackend>(cfg, Default::default(), test, train_infer),
    }
}

/// Threshold that turns scores and targets into 0/1 selections for
/// the training-time F-score.
pub const TRAIN_F1_THRESHOLD: f32 = 0.5;

/// Result of a finished `train()` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainReport {
    pub outcome:   LoopOutcome,
    /// Scores of the last evaluated epoch, if any epoch completed
    pub last_eval: Option<EvalReport>,
}

pub struct Solver<B: AutodiffBackend> {
    config:      TrainConfig,
    seed:        u64,
    model:       PglSum<B>,
    device:      B::Device,
    checkpoints: CheckpointManager,
    /// Only built in `Mode::Train`
    metrics:     Option<MetricsLogger>,
    evaluator:   Evaluator,
}

impl<B: AutodiffBackend> Solver<B> {
    pub fn build(config: TrainConfig, device: B::Device) -> Result<Self> {
        config.validate()?;
        let seed = config.seed;
        // dropout masks and default weights are drawn on the backend
        B::seed(&device, seed);

        // ── Model ─────────────────────────────────────────────────────────────
        let model_cfg = config.model_config();
        model_cfg.validate()?;
        let mut model: PglSum<B> = model_cfg.init(&device);

        if let Some(policy) = config.init_type {
            WeightInitializer::new(policy, config.init_gain, seed).apply(&mut model)?;
        }
        tracing::info!(
            "Model ready: input_size={}, heads={}, segments={:?}, fusion={:?}, pos_enc={:?}",
            config.input_size, config.heads, config.n_segments, config.fusion, config.pos_enc,
        );

        // ── Collaborators ─────────────────────────────────────────────────────
        let checkpoints = CheckpointManager::new(&config.save_dir);
        let metrics     = match config.mode {
            Mode::Train => Some(MetricsLogger::new(&config.log_dir)?),
            Mode::Test  => None,
        };
        let exporter    = ScoreExporter::new(&config.score_dir, config.dataset_name());
        let evaluator   = Evaluator::new(
            &config.dataset_path, config.eval_method, exporter, config.save_weights,
        );

        Ok(Self { config, seed, model, device, checkpoints, metrics, evaluator })
    }

    pub fn model(&self) -> &PglSum<B> {
        &self.model
    }

    /// Replace the weights with the saved checkpoint; returns the epoch
    /// the checkpoint was written at.
    pub fn load_checkpoint(&mut self) -> Result<usize> {
        let epoch = self.checkpoints.latest_epoch()?;
        self.model = self.checkpoints.load_model(self.model.clone(), &self.device)?;
        tracing::info!("Loaded checkpoint of epoch {} from '{}'", epoch, self.checkpoints.dir().display());
        Ok(epoch)
    }

    /// One evaluation pass with the current weights.
    pub fn evaluate(&self, test: &VideoDataset, train_infer: &VideoDataset, epoch: usize) -> Result<EvalReport> {
        let valid = self.model.valid();
        self.evaluator.evaluate(&valid, &self.device, test, train_infer, epoch)
    }

    /// Train on `train`, evaluating on `test` (and re-scoring `train`)
    /// after every completed epoch.
    pub fn train(self, train: &VideoDataset, test: &VideoDataset) -> Result<TrainReport> {
        let Some(metrics) = self.metrics.as_ref() else {
            return Err(SolverError::InvalidConfig("train() needs a solver built in train mode".into()).into());
        };
        let batch_size = self.config.batch_size;
        if train.len() < batch_size {
            return Err(SolverError::InvalidConfig(format!(
                "training set has {} videos, fewer than one batch of {batch_size}",
                train.len()
            ))
            .into());
        }

        // m = β1·m + (1−β1)·g,  v = β2·v + (1−β2)·g²,  θ ← θ − lr·m̂/(√v̂ + ε)
        // plus L2 weight decay g ← g + l2_req·θ
        let optim = AdamConfig::new()
            .with_weight_decay(Some(WeightDecayConfig::new(self.config.l2_req as f32)))
            .init::<B, PglSum<B>>();

        tracing::info!(
            "Training on {} videos ({} batches of {}), evaluating on {}",
            train.len(), train.len() / batch_size, batch_size, test.len(),
        );

        let mut run = TrainingRun {
            batcher:   VideoBatcher::new(self.device.clone()),
            order:     (0..train.len()).collect(),
            rng:       StdRng::seed_from_u64(self.seed),
            model:     self.model,
            optim,
            last_eval: None,
            config:    &self.config,
            device:    &self.device,
            checkpoints: &self.checkpoints,
            metrics,
            evaluator: &self.evaluator,
            train,
            test,
        };

        let outcome = drive_epochs(self.config.n_epochs, &mut run)?;
        tracing::info!("Training finished: {:?}", outcome);
        Ok(TrainReport { outcome, last_eval: run.last_eval })
    }
}

/// Mutable state of one `train()` call.
struct TrainingRun<'a, B: AutodiffBackend, O> {
    config:      &'a TrainConfig,
    device:      &'a B::Device,
    model:       PglSum<B>,
    optim:       O,
    batcher:     VideoBatcher<B>,
    order:       Vec<usize>,
    rng:         StdRng,
    train:       &'a VideoDataset,
    test:        &'a VideoDataset,
    checkpoints: &'a CheckpointManager,
    metrics:     &'a MetricsLogger,
    evaluator:   &'a Evaluator,
    last_eval:   Option<EvalReport>,
}

impl<B, O> EpochRunner for TrainingRun<'_, B, O>
where
    B: AutodiffBackend,
    O: Optimizer<PglSum<B>, B>,
{
    type Error = anyhow::Error;

    fn run_epoch(&mut self, epoch: usize) -> Result<f64> {
        let cfg = self.config;
        let mse = MseLoss::new();
        self.order.shuffle(&mut self.rng);

        let mut losses   = Vec::with_capacity(self.order.len());
        let mut f1_train = Vec::with_capacity(self.order.len());

        // a trailing partial batch is skipped
        for chunk in self.order.chunks_exact(cfg.batch_size) {
            let mut accumulator = GradientsAccumulator::new();

            for &idx in chunk {
                let Some(sample) = self.train.get(idx) else { continue };
                let batch  = self.batcher.batch(&sample);
                let output = self.model.forward(batch.features);
                let loss   = mse.forward(output.scores.clone(), batch.target, Reduction::Mean);
                let value  = loss.clone().into_scalar().elem::<f64>();

                let f1 = binary_f1(&to_host(output.scores)?, &sample.gtscore);
                if f1.is_finite() {
                    f1_train.push(f1);
                }

                if cfg.verbose {
                    tracing::info!("[{}] {} loss: {}", epoch, sample.name, value);
                } else {
                    tracing::debug!("[{}] {} loss: {}", epoch, sample.name, value);
                }

                let grads = GradientsParams::from_grads(loss.backward(), &self.model);
                accumulator.accumulate(&self.model, grads);
                losses.push(value);
            }

            let mut grads = accumulator.grads();
            let norm = clip_grad_norm(&self.model, &mut grads, cfg.clip);
            tracing::debug!("[{}] gradient norm {:.4}", epoch, norm);
            self.model = self.optim.step(cfg.lr, self.model.clone(), grads);
        }

        let mean = if losses.is_empty() {
            f64::NAN
        } else {
            losses.iter().sum::<f64>() / losses.len() as f64
        };
        if !mean.is_finite() {
            return Err(SolverError::NonFiniteLoss { epoch }.into());
        }
        tracing::debug!("[{}] mean train-time F1 {:.2}", epoch, mean_finite(&f1_train));
        Ok(mean)
    }

    fn after_epoch(&mut self, epoch: usize, loss: f64, trend: EpochTrend) -> Result<()> {
        self.metrics.update(TAG_LOSS, epoch, loss)?;
        self.checkpoints.save_model(&self.model, epoch)?;

        let valid  = self.model.valid();
        let report = self.evaluator.evaluate(&valid, self.device, self.test, self.train, epoch)?;

        self.metrics.update(TAG_F1_TRAIN, epoch, report.f1_train)?;
        self.metrics.update(TAG_F1_TEST, epoch, report.f1_test)?;
        self.metrics.log_epoch(&EpochMetrics {
            epoch,
            loss,
            diff:     trend.diff,
            f1_train: report.f1_train,
            f1_test:  report.f1_test,
        })?;

        self.last_eval = Some(report);
        Ok(())
    }
}

/// F-score of thresholded scores against the thresholded target, used
/// only to monitor training.
fn binary_f1(scores: &[f32], target: &[f32]) -> f64 {
    let binarize = |v: &[f32]| -> Vec<u8> { v.iter().map(|&x| u8::from(x >= TRAIN_F1_THRESHOLD)).collect() };
    evaluate_summary(&binarize(scores), &[binarize(target)], EvalMethod::Max)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backend_rng_lock;
    use crate::data::dataset::VideoSample;
    use crate::domain::policy::InitPolicy;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn config(dir: &std::path::Path) -> TrainConfig {
        TrainConfig {
            dataset_path: dir.join("tiny.json").display().to_string(),
            save_dir:     dir.join("ckpt").display().to_string(),
            log_dir:      dir.join("logs").display().to_string(),
            score_dir:    dir.join("scores").display().to_string(),
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
    fn test_binary_f1_thresholds_both_sides() {
        assert_eq!(binary_f1(&[0.9, 0.1], &[0.7, 0.2]), 100.0);
        assert_eq!(binary_f1(&[0.1, 0.9], &[0.7, 0.2]), 0.0);
        // nothing above the threshold on either side
        assert_eq!(binary_f1(&[0.1, 0.2], &[0.3, 0.4]), 0.0);
    }

    #[test]
    fn test_build_rejects_invalid_init_gain() {
        let _rng = backend_rng_lock();
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { init_gain: f64::NAN, init_type: Some(InitPolicy::Normal), ..config(dir.path()) };
        let err = Solver::<TestBackend>::build(cfg, Default::default()).err().unwrap();
        match err.downcast_ref::<SolverError>() {
            Some(SolverError::InvalidConfig(msg)) => assert!(msg.contains("gain"), "{msg}"),
            other => panic!("expected an invalid gain, got {other:?}"),
        }
    }

    #[test]
    fn test_train_rejects_set_smaller_than_batch() {
        let _rng = backend_rng_lock();
        let dir = tempfile::tempdir().unwrap();
        let solver = Solver::<TestBackend>::build(config(dir.path()), Default::default()).unwrap();
        let one = VideoDataset::new(vec![VideoSample {
            name: "video_1".into(), features: vec![0.0; 16], gtscore: vec![0.5; 2], n_steps: 2, input_size: 8,
        }]);
        let err = solver.train(&one, &one).unwrap_err();
        assert!(matches!(err.downcast_ref::<SolverError>(), Some(SolverError::InvalidConfig(_))));
        assert!(!dir.path().join("ckpt").join("last_epoch.mpk").exists());
    }

    #[test]
    fn test_solver_in_test_mode_refuses_to_train() {
        let _rng = backend_rng_lock();
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { mode: Mode::Test, ..config(dir.path()) };
        let solver = Solver::<TestBackend>::build(cfg, Default::default()).unwrap();
        let empty = VideoDataset::new(Vec::new());
        assert!(solver.train(&empty, &empty).is_err());
        assert!(!dir.path().join("logs").exists());
    }

    #[test]
    fn test_bias_is_point_one_after_build() {
        let _rng = backend_rng_lock();
        let dir = tempfile::tempdir().unwrap();
        let solver = Solver::<TestBackend>::build(config(dir.path()), Default::default()).unwrap();
        let bias = solver.model().linear_1.bias.as_ref().unwrap().val();
        let values = bias.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|&b| (b - 0.1).abs() < 1e-7));
    }

    /// Two videos of three steps, written to `tiny.json` in `dir`.
    fn tiny_dataset(dir: &std::path::Path) -> VideoDataset {
        let mut records = serde_json::Map::new();
        let mut samples = Vec::new();
        for v in 1..=2usize {
            let features: Vec<Vec<f32>> = (0..3)
                .map(|s| (0..8).map(|d| ((v * 5 + s * 3 + d) % 7) as f32 / 7.0).collect())
                .collect();
            let gtscore = vec![0.2, 0.9, 0.4];
            records.insert(
                format!("video_{v}"),
                serde_json::json!({
                    "features": features, "gtscore": gtscore,
                    "change_points": [[0, 3], [4, 7], [8, 11]], "n_frames": 12, "picks": [0, 4, 8],
                    "user_summary": [[1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]],
                }),
            );
            samples.push(VideoSample {
                name:       format!("video_{v}"),
                features:   features.concat(),
                gtscore,
                n_steps:    3,
                input_size: 8,
            });
        }
        std::fs::write(dir.join("tiny.json"), serde_json::Value::Object(records).to_string()).unwrap();
        VideoDataset::new(samples)
    }

    #[test]
    fn test_same_seed_trains_identical_weights() {
        let _rng = backend_rng_lock();
        let run = |dir: &std::path::Path| {
            let videos = tiny_dataset(dir);
            let cfg = TrainConfig { seed: 7, n_epochs: 1, ..config(dir) };
            let report = Solver::<TestBackend>::build(cfg, Default::default())
                .unwrap()
                .train(&videos, &videos)
                .unwrap();
            let weights = std::fs::read(dir.join("ckpt").join("last_epoch.mpk")).unwrap();
            (report, weights)
        };

        let (a, b) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
        let (report_a, weights_a) = run(a.path());
        let (report_b, weights_b) = run(b.path());
        assert_eq!(report_a, report_b);
        assert!(weights_a == weights_b, "same seed produced different trained weights");
    }
}
