use ndarray::{Array, IxDyn};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "ort-backend")]
pub mod ort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Cpu,
    Cuda,
}

impl FromStr for ExecutionProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(format!(
                "{} is not a supported execution provider. Use either `cpu` or `cuda`.",
                other
            )),
        }
    }
}

impl fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionProvider::Cpu => f.write_str("cpu"),
            ExecutionProvider::Cuda => f.write_str("cuda"),
        }
    }
}

/// Runs a loaded detection model on a preprocessed NCHW tensor.
pub trait InferenceBackend {
    fn load_model(path: &str, provider: ExecutionProvider) -> anyhow::Result<Self>
    where
        Self: Sized;

    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;
}

pub struct InferenceOutput {
    /// YOLOv8 head: [1, 4 + num_classes, anchors], boxes as cxcywh in input pixels
    pub predictions: ndarray::ArrayD<f32>,
}
