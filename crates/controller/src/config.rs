use anyhow::{Context, Result};
use capture::SourceSpec;
use common::{Environment, env_or, env_string};
use inference::InferenceConfig;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub environment: Environment,
    pub otel_endpoint: Option<String>,
    pub source: SourceSpec,
    pub frame_width: u32,
    pub frame_height: u32,
    pub inference: InferenceConfig,
    pub person_class_id: u32,
    /// Strict lower bound on a person's confidence.
    pub presence_threshold: f32,
    pub serial_port: String,
    pub serial_baud_rate: u32,
    pub serial_settle: Duration,
    pub serial_poll_interval_ms: u64,
    pub acquire_retry_delay: Duration,
    pub snapshot_path: Option<PathBuf>,
    pub stop_file: Option<PathBuf>,
    pub font_path: PathBuf,
}

impl ControllerConfig {
    pub fn from_env() -> Result<Self> {
        let source = SourceSpec::parse(&env_string("VIDEO_SOURCE", "0"))
            .map_err(anyhow::Error::msg)
            .context("Invalid VIDEO_SOURCE")?;

        let snapshot_path = env::var("SNAPSHOT_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let stop_file = env::var("STOP_FILE")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let config = Self {
            environment: Environment::from_env(),
            otel_endpoint: env::var(common::telemetry::OTLP_ENDPOINT_VAR)
                .ok()
                .filter(|e| !e.is_empty()),
            source,
            frame_width: env_or("FRAME_WIDTH", 480),
            frame_height: env_or("FRAME_HEIGHT", 360),
            inference: InferenceConfig::from_env()?,
            person_class_id: env_or("PERSON_CLASS_ID", 0),
            presence_threshold: env_or("PRESENCE_THRESHOLD", 0.5),
            serial_port: env_string("SERIAL_PORT", "/dev/ttyACM0"),
            serial_baud_rate: env_or("SERIAL_BAUD_RATE", 9600),
            serial_settle: Duration::from_millis(env_or("SERIAL_SETTLE_MS", 2000)),
            serial_poll_interval_ms: env_or("SERIAL_POLL_INTERVAL_MS", 1000),
            acquire_retry_delay: Duration::from_millis(env_or("ACQUIRE_RETRY_DELAY_MS", 0)),
            snapshot_path,
            stop_file,
            font_path: PathBuf::from(env_string(
                "FONT_PATH",
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            )),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would only fail later, on the loop thread.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.frame_width > 0 && self.frame_height > 0,
            "FRAME_WIDTH/FRAME_HEIGHT must be non-zero, got {}x{}",
            self.frame_width,
            self.frame_height
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.presence_threshold),
            "PRESENCE_THRESHOLD must be within [0, 1], got {}",
            self.presence_threshold
        );
        self.inference.validate()
    }

    /// Create default configuration for testing
    pub fn test_default() -> Self {
        Self {
            environment: Environment::Development,
            otel_endpoint: None,
            source: SourceSpec::Camera(0),
            frame_width: 480,
            frame_height: 360,
            inference: InferenceConfig::test_default(),
            person_class_id: 0,
            presence_threshold: 0.5,
            serial_port: "/dev/ttyACM0".to_string(),
            serial_baud_rate: 9600,
            serial_settle: Duration::from_millis(2000),
            serial_poll_interval_ms: 1000,
            acquire_retry_delay: Duration::ZERO,
            snapshot_path: None,
            stop_file: None,
            font_path: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 13] = [
        "VIDEO_SOURCE",
        "FRAME_WIDTH",
        "FRAME_HEIGHT",
        "PERSON_CLASS_ID",
        "PRESENCE_THRESHOLD",
        "SERIAL_PORT",
        "SERIAL_BAUD_RATE",
        "SERIAL_SETTLE_MS",
        "ACQUIRE_RETRY_DELAY_MS",
        "SNAPSHOT_PATH",
        "STOP_FILE",
        "EXECUTION_PROVIDER",
        "OTEL_EXPORTER_OTLP_ENDPOINT",
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
        let config = ControllerConfig::from_env().unwrap();

        assert_eq!(config.source, SourceSpec::Camera(0));
        assert_eq!((config.frame_width, config.frame_height), (480, 360));
        assert_eq!(config.person_class_id, 0);
        assert_eq!(config.presence_threshold, 0.5);
        assert_eq!(config.serial_port, "/dev/ttyACM0");
        assert_eq!(config.serial_baud_rate, 9600);
        assert_eq!(config.serial_settle, Duration::from_secs(2));
        assert_eq!(config.acquire_retry_delay, Duration::ZERO);
        assert!(config.snapshot_path.is_none());
        assert!(config.otel_endpoint.is_none());
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        unsafe {
            env::set_var("VIDEO_SOURCE", "http://192.168.1.20:8080/shot.jpg");
            env::set_var("PRESENCE_THRESHOLD", "0.65");
            env::set_var("SERIAL_PORT", "/dev/ttyUSB1");
            env::set_var("SERIAL_BAUD_RATE", "115200");
            env::set_var("ACQUIRE_RETRY_DELAY_MS", "250");
            env::set_var("SNAPSHOT_PATH", "/tmp/latest.jpg");
        }
        let config = ControllerConfig::from_env().unwrap();

        assert_eq!(
            config.source,
            SourceSpec::Snapshot("http://192.168.1.20:8080/shot.jpg".to_string())
        );
        assert_eq!(config.presence_threshold, 0.65);
        assert_eq!(config.serial_port, "/dev/ttyUSB1");
        assert_eq!(config.serial_baud_rate, 115200);
        assert_eq!(config.acquire_retry_delay, Duration::from_millis(250));
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/latest.jpg")));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_numbers_fall_back() {
        clear_env();
        unsafe {
            env::set_var("FRAME_WIDTH", "wide");
            env::set_var("PRESENCE_THRESHOLD", "");
        }
        let config = ControllerConfig::from_env().unwrap();
        assert_eq!(config.frame_width, 480);
        assert_eq!(config.presence_threshold, 0.5);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_source_is_an_error() {
        clear_env();
        unsafe { env::set_var("VIDEO_SOURCE", "ftp://camera") };
        assert!(ControllerConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_zero_frame_size_is_an_error() {
        clear_env();
        unsafe { env::set_var("FRAME_WIDTH", "0") };
        let err = ControllerConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("FRAME_WIDTH"));

        clear_env();
        unsafe { env::set_var("FRAME_HEIGHT", "0") };
        assert!(ControllerConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_presence_threshold_must_be_a_probability() {
        for value in ["NaN", "inf", "-0.2", "1.01"] {
            clear_env();
            unsafe { env::set_var("PRESENCE_THRESHOLD", value) };
            let err = ControllerConfig::from_env().unwrap_err();
            assert!(
                err.to_string().contains("PRESENCE_THRESHOLD"),
                "PRESENCE_THRESHOLD={} accepted",
                value
            );
        }

        clear_env();
        unsafe { env::set_var("PRESENCE_THRESHOLD", "1.0") };
        assert_eq!(ControllerConfig::from_env().unwrap().presence_threshold, 1.0);
        clear_env();
    }

    #[test]
    fn test_default_config_is_valid() {
        let mut config = ControllerConfig::test_default();
        assert!(config.validate().is_ok());

        config.inference.input_size = (0, 640);
        assert!(config.validate().is_err());
    }
}
