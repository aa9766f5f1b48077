// ============================================================
// Layer 4 — Video Batcher
// ============================================================
// Converts one VideoSample into tensors on the target device.
//
// A "batch" in this solver is a single video: sequences have
// different lengths and the model attends over the whole
// sequence, so samples are never padded or stacked. Gradient
// accumulation over `batch_size` videos happens in the trainer.
//
//   features  Vec<f32> (n_steps · input_size) → [n_steps, input_size]
//   gtscore   Vec<f32> (n_steps)              → [n_steps]
//
// Reference: Burn Book §4 (Batcher)

use burn::{prelude::*, tensor::TensorData};

use crate::data::dataset::VideoSample;

/// Tensors for one video.
#[derive(Debug, Clone)]
pub struct VideoBatch<B: Backend> {
    /// Frame features — shape: [n_steps, input_size]
    pub features: Tensor<B, 2>,

    /// Target importance — shape: [n_steps]
    pub target: Tensor<B, 1>,
}

/// Holds the device so tensors are created on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct VideoBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> VideoBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn batch(&self, sample: &VideoSample) -> VideoBatch<B> {
        let features = Tensor::<B, 2>::from_data(
            TensorData::new(sample.features.clone(), [sample.n_steps, sample.input_size]),
            &self.device,
        );
        let target = Tensor::<B, 1>::from_data(
            TensorData::new(sample.gtscore.clone(), [sample.n_steps]),
            &self.device,
        );

        VideoBatch { features, target }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_batch_shapes() {
        let sample = VideoSample {
            name:       "video_3".into(),
            features:   vec![0.0; 12],
            gtscore:    vec![0.5; 4],
            n_steps:    4,
            input_size: 3,
        };
        let batch = VideoBatcher::<NdArray>::new(Default::default()).batch(&sample);
        assert_eq!(batch.features.dims(), [4, 3]);
        assert_eq!(batch.target.dims(), [4]);
    }
}
