// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the dataset file to per-video tensors:
//
//   dataset .json
//       │
//       ▼
//   JsonVideoSource   → reads and validates every record
//       │
//       ▼
//   splitter          → train / test keys (splits file or seeded cut)
//       │
//       ▼
//   VideoDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   VideoBatcher      → one video → [n_steps, input_size] tensor
//
// AnnotationStore reads the same file again, annotations only,
// once per evaluation pass.
//
// Reference: Burn Book §4 (Datasets)

/// Reads the JSON dataset (records and annotation view)
pub mod loader;

/// Implements Burn's Dataset trait for video samples
pub mod dataset;

/// Turns a video sample into device tensors
pub mod batcher;

/// Train/test key selection
pub mod splitter;
