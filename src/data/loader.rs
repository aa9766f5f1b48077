// ============================================================
// Layer 4 — Dataset Loader
// ============================================================
// Reads the annotated dataset file.
//
// File layout (JSON object keyed by "video_<index>"):
//
//   {
//     "video_1": {
//       "features":      [[f32; input_size]; n_steps],
//       "gtscore":       [f32; n_steps],
//       "change_points": [[start, end], ...],
//       "n_frames":      4494,
//       "picks":         [0, 15, 30, ...],
//       "user_summary":  [[0/1; n_frames]; annotators],
//       "video_name":    "Air_Force_One"        (optional)
//     },
//     ...
//   }
//
// Two readers over the same file:
//   JsonVideoSource  — full records, used once to build datasets
//   AnnotationStore  — annotations only, opened per evaluation
//                      pass and dropped when the pass ends
//
// Reference: serde_json documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use crate::domain::error::SolverError;
use crate::domain::traits::{AnnotationLookup, VideoSource};
use crate::domain::video::{video_key, VideoAnnotations, VideoRecord};

/// Loads every video record from a JSON dataset file.
/// Implements the VideoSource trait from Layer 3.
pub struct JsonVideoSource {
    path: PathBuf,
}

impl JsonVideoSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl VideoSource for JsonVideoSource {
    fn load_all(&self) -> Result<Vec<(String, VideoRecord)>> {
        let records: BTreeMap<String, VideoRecord> = read_json(&self.path)?;

        for (key, record) in &records {
            record.validate(key)?;
        }

        tracing::info!(
            "Loaded {} videos from '{}'",
            records.len(),
            self.path.display()
        );
        Ok(records.into_iter().collect())
    }
}

/// Annotation view of the dataset, held for the duration of one
/// evaluation pass.
#[derive(Debug)]
pub struct AnnotationStore {
    entries: BTreeMap<String, VideoAnnotations>,
}

impl AnnotationStore {
    /// Open the dataset file and keep only the annotation fields.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path    = path.as_ref();
        let entries: BTreeMap<String, VideoAnnotations> = read_json(path)?;
        tracing::debug!("Opened annotation store '{}' ({} videos)", path.display(), entries.len());
        Ok(Self { entries })
    }
}

impl AnnotationLookup for AnnotationStore {
    fn annotations(&self, video_index: &str) -> Result<&VideoAnnotations> {
        let key = video_key(video_index);
        self.entries
            .get(&key)
            .ok_or_else(|| SolverError::MissingVideo(key).into())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open dataset '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Cannot parse dataset '{}'", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"{
        "video_2": {
            "features": [[0.1, 0.2], [0.3, 0.4]], "gtscore": [0.2, 0.8],
            "change_points": [[0, 3], [4, 7]], "n_frames": 8, "picks": [0, 4],
            "user_summary": [[0, 0, 0, 0, 1, 1, 1, 1]]
        },
        "video_1": {
            "features": [[1.0, 1.0]], "gtscore": [0.5],
            "change_points": [[0, 1]], "n_frames": 2, "picks": [0],
            "user_summary": [[1, 1]], "video_name": "Bike Polo"
        }
    }"#;

    fn write_dataset(contents: &str) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_all_sorted_by_key() {
        let f = write_dataset(DATASET);
        let records = JsonVideoSource::new(f.path()).load_all().unwrap();
        let keys: Vec<&str> = records.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["video_1", "video_2"]);
        assert_eq!(records[0].1.video_name.as_deref(), Some("Bike Polo"));
        assert_eq!(records[1].1.n_steps(), 2);
    }

    #[test]
    fn test_load_all_rejects_inconsistent_record() {
        let broken = DATASET.replace("\"gtscore\": [0.2, 0.8]", "\"gtscore\": [0.2]");
        let f = write_dataset(&broken);
        assert!(JsonVideoSource::new(f.path()).load_all().is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = JsonVideoSource::new("/definitely/not/here.json").load_all().unwrap_err();
        assert!(err.to_string().contains("Cannot open dataset"));
    }

    #[test]
    fn test_annotation_store_lookup_by_index() {
        let f = write_dataset(DATASET);
        let store = AnnotationStore::open(f.path()).unwrap();
        let ann = store.annotations("2").unwrap();
        assert_eq!(ann.change_points, vec![[0, 3], [4, 7]]);
        assert_eq!(store.annotations("1").unwrap().n_frames, 2);
        assert!(store.annotations("9").is_err());
    }
}
