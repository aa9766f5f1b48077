// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The solver only needs two things from storage: a way to list
// training records, and a way to look up the annotations of one
// video while scoring. The JSON dataset file implements both;
// an HDF5 or database backend would only have to implement
// these traits.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::video::{VideoAnnotations, VideoRecord};

// ─── VideoSource ──────────────────────────────────────────────────────────────
/// Anything that can produce keyed video records.
pub trait VideoSource {
    /// Load every record as (key, record), sorted by key.
    fn load_all(&self) -> Result<Vec<(String, VideoRecord)>>;
}

// ─── AnnotationLookup ─────────────────────────────────────────────────────────
/// Read access to ground truth and segment metadata by video index
/// (the suffix of `video_<index>`).
pub trait AnnotationLookup {
    fn annotations(&self, video_index: &str) -> Result<&VideoAnnotations>;
}
