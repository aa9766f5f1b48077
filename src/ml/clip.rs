// ============================================================
// Layer 5 — Global Gradient-Norm Clipping
// ============================================================
// Burn's optimiser-level clipping works parameter by parameter.
// The solver clips the norm of ALL gradients taken together:
//
//   total = √( Σ_p ‖g_p‖² )
//   if total > max_norm:  g_p ← g_p · max_norm / (total + 1e-6)
//
// so the update direction is preserved and only its length
// shrinks.
//
// Reference: Pascanu et al. (2013) On the difficulty of training
//            recurrent neural networks

use burn::{
    module::ParamId,
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::ml::params::{NamedParameters, ParamInfo};

const CLIP_EPS: f64 = 1e-6;

/// Clip the gradients of `model` in place; returns the norm measured
/// before clipping.
pub fn clip_grad_norm<B, M>(model: &M, grads: &mut GradientsParams, max_norm: f64) -> f64
where
    B: AutodiffBackend,
    M: NamedParameters<B>,
{
    let params = model.named_parameters();

    let total = params
        .iter()
        .map(|p| match p.dims.len() {
            1 => squared_norm::<B::InnerBackend, 1>(grads, &p.id),
            _ => squared_norm::<B::InnerBackend, 2>(grads, &p.id),
        })
        .sum::<f64>()
        .sqrt();

    if total > max_norm {
        let coef = max_norm / (total + CLIP_EPS);
        for ParamInfo { id, dims, .. } in params {
            match dims.len() {
                1 => scale::<B::InnerBackend, 1>(grads, id, coef),
                _ => scale::<B::InnerBackend, 2>(grads, id, coef),
            }
        }
        tracing::debug!("Clipped gradient norm {:.4} → {:.4}", total, max_norm);
    }
    total
}

fn squared_norm<B: Backend, const D: usize>(grads: &GradientsParams, id: &ParamId) -> f64 {
    grads
        .get::<B, D>(id.clone())
        .map_or(0.0, |g| g.powf_scalar(2.0).sum().into_scalar().elem::<f64>())
}

fn scale<B: Backend, const D: usize>(grads: &mut GradientsParams, id: ParamId, coef: f64) {
    if let Some(g) = grads.remove::<B, D>(id.clone()) {
        grads.register::<B, D>(id, g.mul_scalar(coef));
    }
}
