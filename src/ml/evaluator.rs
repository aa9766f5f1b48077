// ============================================================
// Layer 5 — Evaluation Pass
// ============================================================
// Runs the model in inference mode over the held-out videos and
// over the training videos, and reports the mean summary F-score
// of each set:
//
//   for every video:
//     scores   = model(features)                  [n_steps]
//     summary  = generate_summary(change_points, scores, n_frames, picks)
//     f1       = evaluate_summary(summary, user_summary, method)
//
// The annotation store is opened once at the start of a pass and
// dropped when the pass returns. Held-out scores are exported to
// <score_dir>/<dataset>_<epoch>.json; attention matrices only when
// `save_weights` is set.
//
// The caller passes a model on a plain (non-autodiff) backend,
// i.e. `model.valid()`, so dropout is off and no graph is built.
//
// Reference: Burn Book §5 (Inference)

use anyhow::{anyhow, Result};
use burn::{data::dataset::Dataset, prelude::*};
use std::{collections::BTreeMap, path::PathBuf};

use crate::data::{
    batcher::VideoBatcher,
    dataset::VideoDataset,
    loader::AnnotationStore,
};
use crate::domain::{
    metric::{evaluate_summary, mean_finite},
    policy::EvalMethod,
    summary::generate_summary,
    traits::AnnotationLookup,
    video::video_index,
};
use crate::infra::score_export::ScoreExporter;
use crate::ml::model::PglSum;

/// Mean F-scores of one evaluation pass, in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    pub f1_train: f64,
    pub f1_test:  f64,
}

/// Per-video results of one set.
#[derive(Default)]
struct SetResult {
    f1:        Vec<f64>,
    scores:    BTreeMap<String, Vec<f32>>,
    attention: BTreeMap<String, Vec<Vec<f32>>>,
}

pub struct Evaluator {
    dataset_path: PathBuf,
    method:       EvalMethod,
    exporter:     ScoreExporter,
    save_weights: bool,
}

impl Evaluator {
    pub fn new(
        dataset_path: impl Into<PathBuf>,
        method:       EvalMethod,
        exporter:     ScoreExporter,
        save_weights: bool,
    ) -> Self {
        Self { dataset_path: dataset_path.into(), method, exporter, save_weights }
    }

    /// Score both sets, export the held-out scores and return the
    /// mean F-scores.
    pub fn evaluate<B: Backend>(
        &self,
        model:       &PglSum<B>,
        device:      &B::Device,
        test:        &VideoDataset,
        train_infer: &VideoDataset,
        epoch:       usize,
    ) -> Result<EvalReport> {
        let store   = AnnotationStore::open(&self.dataset_path)?;
        let batcher = VideoBatcher::<B>::new(device.clone());

        let test_set  = self.score_set(model, &batcher, &store, test, self.save_weights)?;
        let train_set = self.score_set(model, &batcher, &store, train_infer, false)?;
        drop(store);

        self.exporter.save_scores(epoch, &test_set.scores)?;
        if self.save_weights {
            self.exporter.save_attention(&test_set.attention)?;
        }

        let report = EvalReport {
            f1_train: mean_finite(&train_set.f1),
            f1_test:  mean_finite(&test_set.f1),
        };
        tracing::debug!(
            "Evaluation epoch {}: f1_train={:.2} f1_test={:.2} ({} / {} videos)",
            epoch, report.f1_train, report.f1_test, train_set.f1.len(), test_set.f1.len(),
        );
        Ok(report)
    }

    fn score_set<B: Backend>(
        &self,
        model:        &PglSum<B>,
        batcher:      &VideoBatcher<B>,
        store:        &impl AnnotationLookup,
        videos:       &VideoDataset,
        keep_weights: bool,
    ) -> Result<SetResult> {
        let mut result = SetResult::default();

        for sample in videos.iter() {
            let batch  = batcher.batch(&sample);
            let output = model.forward(batch.features);
            let scores = to_host(output.scores)?;

            result.f1.push(self.video_f1(store, &sample.name, &scores)?);

            if keep_weights {
                let n = sample.n_steps;
                let flat = to_host(output.attention)?;
                result.attention.insert(
                    sample.name.clone(),
                    flat.chunks(n.max(1)).map(<[f32]>::to_vec).collect(),
                );
            }
            result.scores.insert(sample.name, scores);
        }
        Ok(result)
    }

    /// Summary F-score of one video's step scores against its user
    /// summaries, looked up by the index in `name`.
    fn video_f1(&self, store: &impl AnnotationLookup, name: &str, scores: &[f32]) -> Result<f64> {
        let ann     = store.annotations(video_index(name)?)?;
        let summary = generate_summary(&ann.change_points, scores, ann.n_frames, &ann.picks);
        Ok(evaluate_summary(&summary, &ann.user_summary, self.method))
    }
}

/// Copy a float tensor back to the host.
pub fn to_host<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read tensor back to host: {e:?}"))
}
