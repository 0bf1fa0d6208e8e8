use crate::backend::ExecutionProvider;
use crate::processing::pre::DEFAULT_INPUT_SIZE;
use anyhow::Context;
use common::{env_or, env_string};

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub model_path: String,
    pub execution_provider: ExecutionProvider,
    pub input_size: (u32, u32),
    /// Model-level candidate floor, applied before NMS.
    pub confidence_floor: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl InferenceConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let model_path = env_string("MODEL_PATH", "yolov8n.onnx");

        let execution_provider = env_string("EXECUTION_PROVIDER", "cpu")
            .parse::<ExecutionProvider>()
            .map_err(anyhow::Error::msg)
            .context("Invalid EXECUTION_PROVIDER")?;

        let input_width = env_or("INPUT_WIDTH", DEFAULT_INPUT_SIZE.0);
        let input_height = env_or("INPUT_HEIGHT", DEFAULT_INPUT_SIZE.1);

        let config = Self {
            model_path,
            execution_provider,
            input_size: (input_width, input_height),
            confidence_floor: env_or("MODEL_CONFIDENCE_FLOOR", 0.25),
            iou_threshold: env_or("NMS_IOU_THRESHOLD", 0.7),
            max_detections: env_or("MAX_DETECTIONS", 300),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let (width, height) = self.input_size;
        anyhow::ensure!(
            width > 0 && height > 0,
            "INPUT_WIDTH/INPUT_HEIGHT must be non-zero, got {}x{}",
            width,
            height
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.confidence_floor),
            "MODEL_CONFIDENCE_FLOOR must be within [0, 1], got {}",
            self.confidence_floor
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.iou_threshold),
            "NMS_IOU_THRESHOLD must be within [0, 1], got {}",
            self.iou_threshold
        );
        anyhow::ensure!(self.max_detections > 0, "MAX_DETECTIONS must be non-zero");
        Ok(())
    }

    /// Create default configuration for testing
    pub fn test_default() -> Self {
        Self {
            model_path: "yolov8n.onnx".to_string(),
            execution_provider: ExecutionProvider::Cpu,
            input_size: DEFAULT_INPUT_SIZE,
            confidence_floor: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const VARS: [&str; 7] = [
        "MODEL_PATH",
        "EXECUTION_PROVIDER",
        "INPUT_WIDTH",
        "INPUT_HEIGHT",
        "MODEL_CONFIDENCE_FLOOR",
        "NMS_IOU_THRESHOLD",
        "MAX_DETECTIONS",
    ];

    fn clear_env() {
        for var in VARS {
            // SAFETY: env tests are serialized.
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = InferenceConfig::from_env().unwrap();
        assert_eq!(config.model_path, "yolov8n.onnx");
        assert_eq!(config.execution_provider, ExecutionProvider::Cpu);
        assert_eq!(config.input_size, (640, 640));
        assert_eq!(config.confidence_floor, 0.25);
        assert_eq!(config.iou_threshold, 0.7);
        assert_eq!(config.max_detections, 300);
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        unsafe {
            env::set_var("MODEL_PATH", "/models/yolov8s.onnx");
            env::set_var("EXECUTION_PROVIDER", "cuda");
            env::set_var("MODEL_CONFIDENCE_FLOOR", "0.4");
            env::set_var("NMS_IOU_THRESHOLD", "bogus");
        }
        let config = InferenceConfig::from_env().unwrap();
        assert_eq!(config.model_path, "/models/yolov8s.onnx");
        assert_eq!(config.execution_provider, ExecutionProvider::Cuda);
        assert_eq!(config.confidence_floor, 0.4);
        assert_eq!(config.iou_threshold, 0.7, "Invalid values fall back");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_unknown_provider_is_an_error() {
        clear_env();
        unsafe { env::set_var("EXECUTION_PROVIDER", "tensorrt") };
        let err = InferenceConfig::from_env().unwrap_err();
        assert!(format!("{:#}", err).contains("tensorrt"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_zero_input_size_is_an_error() {
        clear_env();
        unsafe { env::set_var("INPUT_WIDTH", "0") };
        let err = InferenceConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("INPUT_WIDTH"));

        clear_env();
        unsafe { env::set_var("INPUT_HEIGHT", "0") };
        assert!(InferenceConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_thresholds_must_be_probabilities() {
        for (var, value) in [
            ("MODEL_CONFIDENCE_FLOOR", "NaN"),
            ("MODEL_CONFIDENCE_FLOOR", "1.5"),
            ("NMS_IOU_THRESHOLD", "-0.1"),
            ("NMS_IOU_THRESHOLD", "inf"),
        ] {
            clear_env();
            unsafe { env::set_var(var, value) };
            let err = InferenceConfig::from_env().unwrap_err();
            assert!(err.to_string().contains(var), "{}={} accepted", var, value);
        }

        clear_env();
        unsafe { env::set_var("MAX_DETECTIONS", "0") };
        assert!(InferenceConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(InferenceConfig::test_default().validate().is_ok());
    }
}
