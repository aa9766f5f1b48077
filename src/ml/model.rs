// ============================================================
// Layer 5 — PGL-SUM Model
// ============================================================
// Frame-importance scorer built from multi-head self-attention
// over the whole video (global) plus self-attention inside each
// of `num_segments` equal chunks (local). The two views are
// L2-normalised and fused, added back to the input, and passed
// through a small regressor:
//
//   x ──► global attention ──┐
//   │                        ├─ fuse per segment ─► + x ─► drop ─► norm_y
//   └──► local attention  ───┘
//     ─► linear_1 ─► relu ─► drop ─► norm_linear ─► linear_2 ─► sigmoid
//
// Input  [n_steps, input_size]
// Output scores [n_steps] in (0, 1), attention weights [n_steps, n_steps]
//
// Reference: Apostolidis et al. (2021) Combining Global and
//            Local Attention with Positional Encoding for Video
//            Summarization
//            Vaswani et al. (2017) Attention Is All You Need

use burn::{
    module::Ignored,
    nn::{Dropout, DropoutConfig, LayerNorm, LayerNormConfig, Linear, LinearConfig},
    prelude::*,
    tensor::{
        activation::{relu, sigmoid, softmax},
        TensorData,
    },
};

use crate::domain::error::SolverError;
use crate::domain::policy::{FusionMode, PositionalEncoding};
use crate::ml::params::{join, NamedParameters, ParamMut, ParamRef};

/// Heads used by every local (per-segment) attention block.
pub const LOCAL_HEADS: usize = 4;

const NORM_EPS: f64 = 1e-6;

#[derive(Config, Debug)]
pub struct PglSumConfig {
    pub input_size:   usize,
    /// Local attention is enabled when set (must be ≥ 2)
    pub num_segments: Option<usize>,
    #[config(default = 8)]
    pub heads:        usize,
    #[config(default = "FusionMode::Add")]
    pub fusion:       FusionMode,
    pub pos_enc:      Option<PositionalEncoding>,
    #[config(default = 10000.0)]
    pub freq:         f64,
    #[config(default = 0.5)]
    pub dropout:      f64,
}

impl PglSumConfig {
    /// Reject shapes the attention blocks cannot be built with.
    pub fn validate(&self) -> Result<(), SolverError> {
        if self.input_size == 0 {
            return Err(SolverError::InvalidConfig("input_size must be positive".into()));
        }
        if self.heads == 0 || self.input_size % self.heads != 0 {
            return Err(SolverError::InvalidConfig(format!(
                "input_size {} is not divisible into {} heads", self.input_size, self.heads
            )));
        }
        if let Some(n) = self.num_segments {
            if n < 2 {
                return Err(SolverError::InvalidConfig(format!(
                    "num_segments must be at least 2, got {n}"
                )));
            }
            if self.input_size % (n * LOCAL_HEADS) != 0 {
                return Err(SolverError::InvalidConfig(format!(
                    "input_size {} is not divisible into {n} segments of {LOCAL_HEADS} heads",
                    self.input_size
                )));
            }
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> PglSum<B> {
        let local = self
            .num_segments
            .map(|n| {
                (0..n)
                    .map(|_| self.attention_block(self.input_size / n, LOCAL_HEADS, device))
                    .collect()
            })
            .unwrap_or_default();

        let attention = MultiAttention {
            global: self.attention_block(self.input_size, self.heads, device),
            local,
            fusion: Ignored(self.fusion),
        };

        PglSum {
            attention,
            linear_1:    LinearConfig::new(self.input_size, self.input_size).init(device),
            linear_2:    LinearConfig::new(self.input_size, 1).init(device),
            norm_y:      LayerNormConfig::new(self.input_size).with_epsilon(NORM_EPS).init(device),
            norm_linear: LayerNormConfig::new(self.input_size).with_epsilon(NORM_EPS).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }

    fn attention_block<B: Backend>(
        &self,
        output_size: usize,
        heads:       usize,
        device:      &B::Device,
    ) -> SelfAttention<B> {
        let head_size = output_size / heads;
        let projection = || -> Vec<Linear<B>> {
            (0..heads)
                .map(|_| {
                    LinearConfig::new(self.input_size, head_size)
                        .with_bias(false)
                        .init(device)
                })
                .collect()
        };
        SelfAttention {
            keys:    projection(),
            queries: projection(),
            values:  projection(),
            out:     LinearConfig::new(head_size * heads, self.input_size)
                .with_bias(false)
                .init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            pos_enc: Ignored(self.pos_enc),
            freq:    self.freq,
            input_size: self.input_size,
        }
    }
}

// ─── SelfAttention ────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct SelfAttention<B: Backend> {
    pub keys:       Vec<Linear<B>>,
    pub queries:    Vec<Linear<B>>,
    pub values:     Vec<Linear<B>>,
    pub out:        Linear<B>,
    pub dropout:    Dropout,
    pub pos_enc:    Ignored<Option<PositionalEncoding>>,
    pub freq:       f64,
    pub input_size: usize,
}

impl<B: Backend> SelfAttention<B> {
    /// x: [n, input_size] → (y: [n, input_size], weights of the last head: [n, n])
    pub fn forward(&self, x: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [n, _] = x.dims();
        let position = self.pos_enc.0.map(|kind| {
            let values = match kind {
                PositionalEncoding::Absolute => absolute_position(n, self.freq, self.input_size),
                PositionalEncoding::Relative => relative_position(n, self.freq),
            };
            Tensor::<B, 2>::from_data(TensorData::new(values, [n, n]), &x.device())
        });

        let mut outputs = Vec::with_capacity(self.keys.len());
        let mut weights = None;
        for ((wk, wq), wv) in self.keys.iter().zip(&self.queries).zip(&self.values) {
            let k = wk.forward(x.clone());
            let q = wq.forward(x.clone());
            let v = wv.forward(x.clone());

            let mut energies = q.matmul(k.transpose()); // [n, n]
            if let Some(p) = &position {
                energies = energies + p.clone();
            }
            let att = softmax(energies, 1);
            outputs.push(self.dropout.forward(att.clone()).matmul(v));
            weights = Some(att);
        }

        let y = self.out.forward(Tensor::cat(outputs, 1));
        let weights = weights.unwrap_or_else(|| Tensor::zeros([n, n], &y.device()));
        (y, weights)
    }
}

impl<B: Backend> NamedParameters<B> for SelfAttention<B> {
    fn visit_named(&self, prefix: &str, f: &mut dyn FnMut(&str, ParamRef<'_, B>)) {
        self.keys.visit_named(&join(prefix, "keys"), f);
        self.queries.visit_named(&join(prefix, "queries"), f);
        self.values.visit_named(&join(prefix, "values"), f);
        self.out.visit_named(&join(prefix, "out"), f);
    }

    fn visit_named_mut(&mut self, prefix: &str, f: &mut dyn FnMut(&str, ParamMut<'_, B>)) {
        self.keys.visit_named_mut(&join(prefix, "keys"), f);
        self.queries.visit_named_mut(&join(prefix, "queries"), f);
        self.values.visit_named_mut(&join(prefix, "values"), f);
        self.out.visit_named_mut(&join(prefix, "out"), f);
    }
}

/// Sinusoidal absolute positions added to the attention energies.
/// Row p, columns 2i / 2i+1 hold sin / cos(p / freq^(2i / d)).
fn absolute_position(n: usize, freq: f64, d: usize) -> Vec<f32> {
    let mut ap = vec![0.0f32; n * n];
    for pos in 0..n {
        for i in 0..n / 2 {
            let angle = pos as f64 / freq.powf((2 * i) as f64 / d as f64);
            ap[pos * n + 2 * i]     = angle.sin() as f32;
            ap[pos * n + 2 * i + 1] = angle.cos() as f32;
        }
    }
    ap
}

/// Sinusoidal encoding of the signed distance j - i between steps.
fn relative_position(n: usize, freq: f64) -> Vec<f32> {
    let d        = (2 * n) as f64;
    let min_rpos = -(n as f64 - 1.0);
    let mut rp   = vec![0.0f32; n * n];
    for i in 0..n {
        for j in 0..2 * (n / 2) {
            let r_pos = j as f64 - i as f64 - min_rpos;
            let angle = r_pos / freq.powf((i + j) as f64 / d);
            rp[i * n + j] = if j % 2 == 0 { angle.sin() } else { angle.cos() } as f32;
        }
    }
    rp
}

// ─── MultiAttention ───────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct MultiAttention<B: Backend> {
    pub global: SelfAttention<B>,
    /// One block per segment; empty when local attention is off
    pub local:  Vec<SelfAttention<B>>,
    pub fusion: Ignored<FusionMode>,
}

impl<B: Backend> MultiAttention<B> {
    pub fn forward(&self, x: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let (weighted, weights) = self.global.forward(x.clone());
        if self.local.is_empty() {
            return (weighted, weights);
        }

        let [n, d]       = x.dims();
        let segment_size = n.div_ceil(self.local.len());
        let mut fused    = Vec::with_capacity(self.local.len());

        for (segment, block) in self.local.iter().enumerate() {
            let left  = segment * segment_size;
            let right = ((segment + 1) * segment_size).min(n);
            if left >= right {
                continue;
            }
            let (local, _) = block.forward(x.clone().slice([left..right, 0..d]));
            let global = l2_normalize(weighted.clone().slice([left..right, 0..d]));
            let local  = l2_normalize(local);

            fused.push(match self.fusion.0 {
                FusionMode::Add  => global + local,
                FusionMode::Mult => global * local,
                FusionMode::Avg  => (global + local).div_scalar(2.0),
                FusionMode::Max  => global.max_pair(local),
            });
        }

        (Tensor::cat(fused, 0), weights)
    }
}

impl<B: Backend> NamedParameters<B> for MultiAttention<B> {
    fn visit_named(&self, prefix: &str, f: &mut dyn FnMut(&str, ParamRef<'_, B>)) {
        self.global.visit_named(&join(prefix, "global"), f);
        self.local.visit_named(&join(prefix, "local"), f);
    }

    fn visit_named_mut(&mut self, prefix: &str, f: &mut dyn FnMut(&str, ParamMut<'_, B>)) {
        self.global.visit_named_mut(&join(prefix, "global"), f);
        self.local.visit_named_mut(&join(prefix, "local"), f);
    }
}

fn l2_normalize<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 2> {
    let norm = x.clone().powf_scalar(2.0).sum_dim(1).sqrt().clamp_min(1e-12);
    x / norm
}

// ─── PglSum ───────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct PglSum<B: Backend> {
    pub attention:   MultiAttention<B>,
    pub linear_1:    Linear<B>,
    pub linear_2:    Linear<B>,
    pub norm_y:      LayerNorm<B>,
    pub norm_linear: LayerNorm<B>,
    pub dropout:     Dropout,
}

pub struct ModelOutput<B: Backend> {
    /// Importance per step — shape: [n_steps]
    pub scores:    Tensor<B, 1>,
    /// Attention of the global block — shape: [n_steps, n_steps]
    pub attention: Tensor<B, 2>,
}

impl<B: Backend> PglSum<B> {
    /// frame_features: [n_steps, input_size]
    pub fn forward(&self, frame_features: Tensor<B, 2>) -> ModelOutput<B> {
        let [n, _] = frame_features.dims();
        let residual = frame_features.clone();
        let (weighted, attention) = self.attention.forward(frame_features);

        let y = self.dropout.forward(weighted + residual);
        let y = self.norm_y.forward(y);

        let y = relu(self.linear_1.forward(y));
        let y = self.dropout.forward(y);
        let y = self.norm_linear.forward(y);

        let y = sigmoid(self.linear_2.forward(y)); // [n, 1]
        ModelOutput { scores: y.reshape([n]), attention }
    }
}

impl<B: Backend> NamedParameters<B> for PglSum<B> {
    fn visit_named(&self, prefix: &str, f: &mut dyn FnMut(&str, ParamRef<'_, B>)) {
        self.attention.visit_named(&join(prefix, "attention"), f);
        self.linear_1.visit_named(&join(prefix, "linear_1"), f);
        self.linear_2.visit_named(&join(prefix, "linear_2"), f);
        self.norm_y.visit_named(&join(prefix, "norm_y"), f);
        self.norm_linear.visit_named(&join(prefix, "norm_linear"), f);
    }

    fn visit_named_mut(&mut self, prefix: &str, f: &mut dyn FnMut(&str, ParamMut<'_, B>)) {
        self.attention.visit_named_mut(&join(prefix, "attention"), f);
        self.linear_1.visit_named_mut(&join(prefix, "linear_1"), f);
        self.linear_2.visit_named_mut(&join(prefix, "linear_2"), f);
        self.norm_y.visit_named_mut(&join(prefix, "norm_y"), f);
        self.norm_linear.visit_named_mut(&join(prefix, "norm_linear"), f);
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backend_rng_lock;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn features(n: usize, d: usize) -> Tensor<TestBackend, 2> {
        let values: Vec<f32> = (0..n * d).map(|i| ((i % 13) as f32 - 6.0) / 6.0).collect();
        Tensor::from_data(TensorData::new(values, [n, d]), &Default::default())
    }

    fn config() -> PglSumConfig {
        PglSumConfig::new(16).with_num_segments(Some(2)).with_heads(2)
    }

    #[test]
    fn test_forward_shapes_and_range() {
        let _rng = backend_rng_lock();
        let model: PglSum<TestBackend> = config().init(&Default::default());
        let out = model.forward(features(7, 16));
        assert_eq!(out.scores.dims(), [7]);
        assert_eq!(out.attention.dims(), [7, 7]);

        let scores = out.scores.into_data().to_vec::<f32>().unwrap();
        assert!(scores.iter().all(|&s| s > 0.0 && s < 1.0));
    }

    #[test]
    fn test_attention_rows_sum_to_one() {
        let _rng = backend_rng_lock();
        let model: PglSum<TestBackend> = config()
            .with_pos_enc(Some(PositionalEncoding::Absolute))
            .init(&Default::default());
        let out  = model.forward(features(5, 16));
        let rows = out.attention.sum_dim(1).into_data().to_vec::<f32>().unwrap();
        assert!(rows.iter().all(|r| (r - 1.0).abs() < 1e-4));
    }

    #[test]
    fn test_every_fusion_mode_runs_with_fewer_steps_than_segments() {
        let _rng = backend_rng_lock();
        for fusion in [FusionMode::Add, FusionMode::Mult, FusionMode::Avg, FusionMode::Max] {
            let model: PglSum<TestBackend> = PglSumConfig::new(16)
                .with_num_segments(Some(4))
                .with_heads(4)
                .with_fusion(fusion)
                .with_pos_enc(Some(PositionalEncoding::Relative))
                .init(&Default::default());
            let out = model.forward(features(3, 16));
            assert_eq!(out.scores.dims(), [3]);
        }
    }

    #[test]
    fn test_parameter_names() {
        let _rng = backend_rng_lock();
        let model: PglSum<TestBackend> = config().init(&Default::default());
        let names: Vec<String> = model.named_parameters().into_iter().map(|p| p.name).collect();

        assert!(names.contains(&"attention.global.keys.0.weight".to_string()));
        assert!(names.contains(&"attention.local.1.out.weight".to_string()));
        assert!(names.contains(&"linear_1.bias".to_string()));
        assert!(names.contains(&"norm_y.weight".to_string()));
        assert!(names.contains(&"norm_linear.bias".to_string()));
        // attention projections carry no bias
        assert!(!names.iter().any(|n| n.starts_with("attention") && n.ends_with("bias")));
    }

    #[test]
    fn test_validate_rejects_bad_head_split() {
        assert!(PglSumConfig::new(10).with_heads(3).validate().is_err());
        assert!(PglSumConfig::new(16).with_heads(2).with_num_segments(Some(1)).validate().is_err());
        assert!(PglSumConfig::new(16).with_heads(2).with_num_segments(Some(3)).validate().is_err());
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_absolute_position_layout() {
        let ap = absolute_position(4, 10000.0, 4);
        // row 0: sin(0) = 0, cos(0) = 1
        assert_eq!(ap[0], 0.0);
        assert_eq!(ap[1], 1.0);
        // row 1, column 0: sin(1)
        assert!((ap[4] - 1f32.sin()).abs() < 1e-6);
    }
}
