use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::video::VideoRecord;

/// One video as a training/evaluation example: the whole frame
/// sequence is a single sample (no mini-sequence chunking).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSample {
    /// Dataset key, `video_<index>`
    pub name:       String,
    /// Row-major `[n_steps, input_size]`
    pub features:   Vec<f32>,
    pub gtscore:    Vec<f32>,
    pub n_steps:    usize,
    pub input_size: usize,
}

impl VideoSample {
    pub fn from_record(name: impl Into<String>, record: &VideoRecord) -> Self {
        Self {
            name:       name.into(),
            features:   record.features.iter().flatten().copied().collect(),
            gtscore:    record.gtscore.clone(),
            n_steps:    record.n_steps(),
            input_size: record.input_size(),
        }
    }
}

#[derive(Debug)]
pub struct VideoDataset {
    samples: Vec<VideoSample>,
}

impl VideoDataset {
    pub fn new(samples: Vec<VideoSample>) -> Self { Self { samples } }
}

impl Dataset<VideoSample> for VideoDataset {
    fn get(&self, index: usize) -> Option<VideoSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
