// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn-specific model and training code.
// The data layer only builds tensors from samples and the infra
// layer only records modules; everything that runs a forward or
// backward pass lives here.
//
// What's in this layer:
//
//   model.rs          — PGL-SUM: global + per-segment multi-head
//                       self-attention, fusion, regressor head
//
//   params.rs         — Dotted parameter names ("linear_1.bias")
//                       over the model's Burn parameters
//
//   init.rs           — Weight initialization policies
//
//   clip.rs           — Global gradient-norm clipping
//
//   early_stopping.rs — Loss trend, stop rule, epoch driver
//
//   trainer.rs        — The Solver: build + training loop
//
//   evaluator.rs      — Inference pass, summary F-score,
//                       score export
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Apostolidis et al. (2021) PGL-SUM

/// PGL-SUM attention model
pub mod model;

/// Named access to the model's parameters
pub mod params;

/// Seeded weight initialization
pub mod init;

/// Gradient clipping over all parameters
pub mod clip;

/// Early stopping and the epoch state machine
pub mod early_stopping;

/// Full training loop with checkpointing and evaluation
pub mod trainer;

/// Evaluation pass over held-out and training videos
pub mod evaluator;

/// Serialises tests that draw from the process-wide ndarray RNG, so
/// a seeded run is not interleaved with draws from another test.
#[cfg(test)]
pub(crate) fn backend_rng_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
