// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence that several layers use:
//
//   checkpoint.rs   — Model weights (Burn named MessagePack
//                     recorder) plus the TrainConfig as JSON, so
//                     `evaluate` can rebuild the same model.
//
//   metrics.rs      — Scalar stream (metrics.csv) and the
//                     per-epoch training log (trainlog.txt).
//
//   score_export.rs — Per-video importance scores and, on
//                     request, attention matrices as JSON.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics logger
pub mod metrics;

/// Score and attention export
pub mod score_export;
