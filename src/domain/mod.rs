// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and pure functions: no Burn, no file I/O.
//
//   video.rs    — annotated video records and key helpers
//   policy.rs   — closed enums for every configurable switch
//   metric.rs   — keyshot F-score against human summaries
//   summary.rs  — scores + change points → binary summary
//   traits.rs   — storage abstractions the solver depends on
//   error.rs    — typed solver errors
//
// Everything here is testable without a GPU.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

pub mod error;
pub mod metric;
pub mod policy;
pub mod summary;
pub mod traits;
pub mod video;
