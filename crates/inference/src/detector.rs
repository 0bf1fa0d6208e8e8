use crate::{
    backend::InferenceBackend,
    config::InferenceConfig,
    processing::{PostProcessor, PreProcessor},
};
use schema::{Detection, Frame};

/// Turns one frame into zero or more detections. Blocking; any error is
/// treated as fatal by callers.
pub trait Detector {
    fn detect(&mut self, frame: &Frame) -> anyhow::Result<Vec<Detection>>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: &Frame) -> anyhow::Result<Vec<Detection>> {
        (**self).detect(frame)
    }
}

/// YOLOv8 pipeline: letterbox, run the backend, decode + NMS.
pub struct YoloDetector<B: InferenceBackend> {
    backend: B,
    preprocessor: PreProcessor,
    postprocessor: PostProcessor,
}

#[cfg(feature = "ort-backend")]
pub type OrtDetector = YoloDetector<crate::backend::ort::OrtBackend>;

impl<B: InferenceBackend> YoloDetector<B> {
    pub fn new(backend: B, config: &InferenceConfig) -> Self {
        Self {
            backend,
            preprocessor: PreProcessor::new(config.input_size),
            postprocessor: PostProcessor::new(
                config.confidence_floor,
                config.iou_threshold,
                config.max_detections,
            ),
        }
    }

    /// Load the model named by `config` and wrap it in a detector.
    pub fn load(config: &InferenceConfig) -> anyhow::Result<Self> {
        tracing::info!(
            model_path = %config.model_path,
            provider = %config.execution_provider,
            "Loading detection model"
        );
        let backend = B::load_model(&config.model_path, config.execution_provider)?;
        Ok(Self::new(backend, config))
    }
}

impl<B: InferenceBackend> Detector for YoloDetector<B> {
    #[tracing::instrument(skip_all, fields(sequence = frame.sequence()))]
    fn detect(&mut self, frame: &Frame) -> anyhow::Result<Vec<Detection>> {
        let (images, letterbox) = self.preprocessor.preprocess_frame(frame)?;
        let output = self.backend.infer(&images)?;
        let detections = self
            .postprocessor
            .parse_detections(&output.predictions.view(), &letterbox)?;

        tracing::debug!(count = detections.len(), "Frame inferred");
        Ok(detections)
    }
}
