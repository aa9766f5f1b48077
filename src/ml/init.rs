// ============================================================
// Layer 5 — Weight Initializer
// ============================================================
// Re-initialises the model's parameters before training.
//
//   name contains "weight" and not "norm" → configured policy
//   name contains "bias"                  → constant 0.1
//   anything else                         → framework default
//
// Policies (Burn stores Linear weights as [d_input, d_output],
// so fan_in = dims[0] and fan_out = dims[1]):
//
//   normal      w ~ N(0, gain)
//   xavier      w ~ U(-b, b),  b = √2 · √(6 / (fan_in + fan_out))
//   kaiming     w ~ U(-b, b),  b = √2 · √(3 / fan_in)   (ReLU, fan-in)
//   orthogonal  w = √2 · Q,    Q with orthonormal rows or columns
//
// Only `normal` reads the configured gain; the other three use
// the ReLU gain √2.
//
// Every parameter is checked first and only then mutated, so a
// rejected configuration leaves the model untouched.
//
// Samples come from a seeded StdRng on the host and are then
// uploaded, so a seed fixes the initial weights on every backend.
//
// Reference: Glorot & Bengio (2010), He et al. (2015),
//            Saxe et al. (2014) Exact solutions to the nonlinear
//            dynamics of learning in deep linear networks

use burn::{module::Param, prelude::*, tensor::TensorData};
use rand::{distributions::Uniform, rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal, StandardNormal};

use crate::domain::error::SolverError;
use crate::domain::policy::InitPolicy;
use crate::ml::params::{NamedParameters, ParamMut};

/// Constant every bias starts from.
pub const BIAS_INIT: f32 = 0.1;

const RELU_GAIN: f64 = std::f64::consts::SQRT_2;

/// What happens to one named parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Policy,
    Bias,
    Keep,
}

fn classify(name: &str) -> Action {
    if name.contains("weight") && !name.contains("norm") {
        Action::Policy
    } else if name.contains("bias") {
        Action::Bias
    } else {
        Action::Keep
    }
}

pub struct WeightInitializer {
    policy: InitPolicy,
    gain:   f64,
    rng:    StdRng,
}

impl WeightInitializer {
    pub fn new(policy: InitPolicy, gain: f64, seed: u64) -> Self {
        Self { policy, gain, rng: StdRng::seed_from_u64(seed) }
    }

    /// Check every parameter, then initialise them all.
    pub fn apply<B: Backend, M: NamedParameters<B>>(&mut self, model: &mut M) -> Result<(), SolverError> {
        self.validate(model)?;

        let mut touched = 0usize;
        let policy = self.policy;
        let gain   = self.gain;
        let rng    = &mut self.rng;

        model.visit_named_mut("", &mut |name, param| match (classify(name), param) {
            (Action::Policy, ParamMut::Matrix(p)) => {
                let device = p.val().device();
                let [rows, cols] = p.val().dims();
                let values = sample_matrix(policy, gain, rows, cols, rng);
                *p = Param::from_tensor(Tensor::from_data(TensorData::new(values, [rows, cols]), &device));
                touched += 1;
            }
            (Action::Policy, ParamMut::Vector(p)) => {
                // only `normal` reaches here; validate() rejected the rest
                let device = p.val().device();
                let [n] = p.val().dims();
                let values = sample_normal(gain, n, rng);
                *p = Param::from_tensor(Tensor::from_data(TensorData::new(values, [n]), &device));
                touched += 1;
            }
            (Action::Bias, ParamMut::Vector(p)) => {
                let device = p.val().device();
                let [n] = p.val().dims();
                *p = Param::from_tensor(Tensor::full([n], BIAS_INIT, &device));
                touched += 1;
            }
            (Action::Bias, ParamMut::Matrix(p)) => {
                let device = p.val().device();
                let dims = p.val().dims();
                *p = Param::from_tensor(Tensor::full(dims, BIAS_INIT, &device));
                touched += 1;
            }
            (Action::Keep, _) => {}
        });

        tracing::info!("Initialised {} parameters with '{}' (gain {})", touched, self.policy, self.gain);
        Ok(())
    }

    fn validate<B: Backend, M: NamedParameters<B>>(&self, model: &M) -> Result<(), SolverError> {
        if self.policy == InitPolicy::Normal && !(self.gain.is_finite() && self.gain >= 0.0) {
            return Err(SolverError::InvalidConfig(format!(
                "init gain must be a finite non-negative number, got {}", self.gain
            )));
        }

        for info in model.named_parameters() {
            let rank = info.dims.len();
            if classify(&info.name) == Action::Policy && rank < 2 && self.policy != InitPolicy::Normal {
                return Err(SolverError::UnsupportedInitShape {
                    name:   info.name,
                    rank,
                    policy: self.policy.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn sample_normal(std: f64, n: usize, rng: &mut StdRng) -> Vec<f32> {
    match Normal::new(0.0, std) {
        Ok(dist) => (0..n).map(|_| dist.sample(rng) as f32).collect(),
        // std == 0 or rejected by rand_distr: every draw is the mean
        Err(_) => vec![0.0; n],
    }
}

fn sample_uniform(bound: f64, n: usize, rng: &mut StdRng) -> Vec<f32> {
    if bound <= 0.0 {
        return vec![0.0; n];
    }
    let dist = Uniform::new_inclusive(-bound, bound);
    (0..n).map(|_| rng.sample(dist) as f32).collect()
}

fn sample_matrix(policy: InitPolicy, gain: f64, rows: usize, cols: usize, rng: &mut StdRng) -> Vec<f32> {
    let (fan_in, fan_out) = (rows as f64, cols as f64);
    match policy {
        InitPolicy::Normal => sample_normal(gain, rows * cols, rng),
        InitPolicy::Xavier => {
            let bound = RELU_GAIN * (6.0 / (fan_in + fan_out)).sqrt();
            sample_uniform(bound, rows * cols, rng)
        }
        InitPolicy::Kaiming => {
            let bound = RELU_GAIN * (3.0 / fan_in).sqrt();
            sample_uniform(bound, rows * cols, rng)
        }
        InitPolicy::Orthogonal => orthogonal(rows, cols, RELU_GAIN, rng),
    }
}

/// Row-major [rows, cols] matrix whose shorter side is orthonormal,
/// scaled by `gain`.
fn orthogonal(rows: usize, cols: usize, gain: f64, rng: &mut StdRng) -> Vec<f32> {
    let (count, len) = (rows.min(cols), rows.max(cols));

    // Gram-Schmidt over `count` random vectors of length `len`
    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(count);
    while basis.len() < count {
        let mut v: Vec<f64> = (0..len).map(|_| rng.sample(StandardNormal)).collect();
        for q in &basis {
            let dot: f64 = v.iter().zip(q).map(|(a, b)| a * b).sum();
            v.iter_mut().zip(q).for_each(|(a, b)| *a -= dot * b);
        }
        let norm = v.iter().map(|a| a * a).sum::<f64>().sqrt();
        if norm > 1e-10 {
            v.iter_mut().for_each(|a| *a /= norm);
            basis.push(v);
        }
    }

    let mut out = vec![0.0f32; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            let value = if rows <= cols { basis[r][c] } else { basis[c][r] };
            out[r * cols + c] = (gain * value) as f32;
        }
    }
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backend_rng_lock;
    use crate::ml::model::{PglSum, PglSumConfig};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn model() -> PglSum<TestBackend> {
        PglSumConfig::new(16)
            .with_num_segments(Some(2))
            .with_heads(2)
            .init(&Default::default())
    }

    fn values(model: &PglSum<TestBackend>, wanted: &str) -> Vec<f32> {
        let mut out = Vec::new();
        model.visit_named("", &mut |name, p| {
            if name == wanted {
                out = match p {
                    crate::ml::params::ParamRef::Matrix(p) => p.val().into_data().to_vec::<f32>().unwrap(),
                    crate::ml::params::ParamRef::Vector(p) => p.val().into_data().to_vec::<f32>().unwrap(),
                };
            }
        });
        out
    }

    #[test]
    fn test_every_bias_is_point_one() {
        let _rng = backend_rng_lock();
        for policy in [InitPolicy::Normal, InitPolicy::Xavier, InitPolicy::Kaiming, InitPolicy::Orthogonal] {
            let mut m = model();
            WeightInitializer::new(policy, 1.0, 3).apply(&mut m).unwrap();

            let mut biases = Vec::new();
            m.visit_named("", &mut |name, p| {
                if name.contains("bias") {
                    if let crate::ml::params::ParamRef::Vector(p) = p {
                        biases.extend(p.val().into_data().to_vec::<f32>().unwrap());
                    }
                }
            });
            assert!(!biases.is_empty());
            assert!(biases.iter().all(|&b| (b - BIAS_INIT).abs() < 1e-7), "{policy}");
        }
    }

    #[test]
    fn test_norm_weights_keep_default() {
        let _rng = backend_rng_lock();
        let mut m = model();
        WeightInitializer::new(InitPolicy::Xavier, 1.0, 3).apply(&mut m).unwrap();
        assert!(values(&m, "norm_y.weight").iter().all(|&g| g == 1.0));
    }

    #[test]
    fn test_xavier_respects_bound() {
        let _rng = backend_rng_lock();
        let mut m = model();
        WeightInitializer::new(InitPolicy::Xavier, 1.0, 3).apply(&mut m).unwrap();
        // linear_1: [16, 16]
        let bound = (RELU_GAIN * (6.0f64 / 32.0).sqrt()) as f32;
        let w = values(&m, "linear_1.weight");
        assert_eq!(w.len(), 256);
        assert!(w.iter().all(|v| v.abs() <= bound + 1e-6));
    }

    #[test]
    fn test_same_seed_same_weights() {
        let _rng = backend_rng_lock();
        let mut a = model();
        let mut b = model();
        WeightInitializer::new(InitPolicy::Kaiming, 1.0, 9).apply(&mut a).unwrap();
        WeightInitializer::new(InitPolicy::Kaiming, 1.0, 9).apply(&mut b).unwrap();
        assert_eq!(values(&a, "linear_2.weight"), values(&b, "linear_2.weight"));
    }

    #[test]
    fn test_orthogonal_rows_are_orthonormal() {
        let mut rng = StdRng::seed_from_u64(1);
        let q = orthogonal(3, 5, 1.0, &mut rng);
        for i in 0..3 {
            for j in 0..3 {
                let dot: f32 = (0..5).map(|c| q[i * 5 + c] * q[j * 5 + c]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_invalid_gain_leaves_model_untouched() {
        let _rng = backend_rng_lock();
        let mut m = model();
        let before = values(&m, "linear_1.bias");
        let err = WeightInitializer::new(InitPolicy::Normal, f64::NAN, 3).apply(&mut m);
        assert!(matches!(err, Err(SolverError::InvalidConfig(_))));
        assert_eq!(values(&m, "linear_1.bias"), before);
    }

    #[test]
    fn test_classify_names() {
        assert_eq!(classify("attention.global.keys.0.weight"), Action::Policy);
        assert_eq!(classify("norm_y.weight"), Action::Keep);
        assert_eq!(classify("norm_y.bias"), Action::Bias);
        assert_eq!(classify("linear_1.bias"), Action::Bias);
    }
}
