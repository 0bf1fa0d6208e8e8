pub mod backend;
pub mod config;
pub mod detector;
pub mod processing;

pub use backend::{ExecutionProvider, InferenceBackend, InferenceOutput};
pub use config::InferenceConfig;
pub use detector::{Detector, YoloDetector};
#[cfg(feature = "ort-backend")]
pub use detector::OrtDetector;
pub use schema::Detection;
