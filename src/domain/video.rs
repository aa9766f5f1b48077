// ============================================================
// Layer 3 — Video Domain Types
// ============================================================
// One annotated video as stored in the dataset file, plus the
// annotation-only view the evaluation pass needs.
//
// Shapes (n_steps = number of sampled frames):
//   features       [n_steps][input_size]
//   gtscore        [n_steps]
//   picks          [n_steps]     frame index of every step
//   change_points  [n_segments]  inclusive (start, end) frames
//   user_summary   [annotators][n_frames]  0/1
//
// Reference: Rust Book §5 (Structs)

use serde::{Deserialize, Serialize};

use crate::domain::error::SolverError;

/// Prefix every dataset key carries. The suffix is the video index.
pub const VIDEO_KEY_PREFIX: &str = "video_";

/// A fully annotated video record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub features:      Vec<Vec<f32>>,
    pub gtscore:       Vec<f32>,
    #[serde(flatten)]
    pub annotations:   VideoAnnotations,
    /// Human-readable title, if the dataset carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_name:    Option<String>,
}

/// The ground truth and segment metadata used to rebuild and score
/// a summary. Deserialising only this view skips the features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAnnotations {
    pub change_points: Vec<[usize; 2]>,
    pub n_frames:      usize,
    pub picks:         Vec<usize>,
    pub user_summary:  Vec<Vec<u8>>,
}

impl VideoRecord {
    pub fn n_steps(&self) -> usize {
        self.features.len()
    }

    pub fn input_size(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    /// Check the per-video shape invariants.
    pub fn validate(&self, key: &str) -> Result<(), SolverError> {
        let n = self.n_steps();
        if self.gtscore.len() != n {
            return Err(SolverError::LengthMismatch {
                key: key.to_string(), what: "gtscore", found: self.gtscore.len(), expected: n,
            });
        }
        if self.annotations.picks.len() != n {
            return Err(SolverError::LengthMismatch {
                key: key.to_string(), what: "picks", found: self.annotations.picks.len(), expected: n,
            });
        }
        let width = self.input_size();
        if let Some(row) = self.features.iter().find(|row| row.len() != width) {
            return Err(SolverError::LengthMismatch {
                key: key.to_string(), what: "feature row", found: row.len(), expected: width,
            });
        }
        Ok(())
    }
}

/// Extract the index suffix from a `video_<index>` name.
pub fn video_index(name: &str) -> Result<&str, SolverError> {
    match name.strip_prefix(VIDEO_KEY_PREFIX) {
        Some(idx) if !idx.is_empty() => Ok(idx),
        _ => Err(SolverError::MalformedVideoName(name.to_string())),
    }
}

/// Build the dataset key for a video index.
pub fn video_key(index: &str) -> String {
    format!("{VIDEO_KEY_PREFIX}{index}")
}
