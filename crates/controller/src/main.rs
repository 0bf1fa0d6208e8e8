use actuator::SerialActuator;
use anyhow::Context;
use capture::open_source;
use common::{init_observability, wait_for_resource};
use controller::{
    ControllerConfig, DetectionLoop, FrameSink, HeadlessSink, LoopSettings, PresenceRule,
    SnapshotSink, StopFile, StopHandle, annotate::Annotator,
};
use inference::{OrtDetector, YoloDetector};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};

fn main() -> anyhow::Result<()> {
    let config = ControllerConfig::from_env()?;

    // Flushes spans and metrics on exit when OTLP export is enabled.
    let _telemetry = init_observability(
        "controller",
        config.otel_endpoint.as_deref(),
        config.environment,
    )?;

    tracing::info!("Controller starting with config: {:?}", config);

    let stop = StopHandle::new();
    flag::register(SIGTERM, stop.flag())?;
    flag::register(SIGINT, stop.flag())?;
    tracing::info!("Signal handlers registered (SIGTERM, SIGINT)");

    let source = open_source(&config.source, (config.frame_width, config.frame_height))
        .with_context(|| format!("Failed to open video source {}", config.source))?;

    let detector: OrtDetector = YoloDetector::load(&config.inference)
        .context("Failed to load detection model")?;

    let Some(actuator) = wait_for_resource(
        || {
            SerialActuator::open(
                &config.serial_port,
                config.serial_baud_rate,
                config.serial_settle,
            )
        },
        config.serial_poll_interval_ms,
        "Serial port",
        &stop.flag(),
    ) else {
        tracing::info!("Shutdown requested before the actuator was available");
        return Ok(());
    };

    let stop_file = config.stop_file.as_ref().map(StopFile::new);
    let sink: Box<dyn FrameSink + Send> = match &config.snapshot_path {
        Some(path) => Box::new(SnapshotSink::new(path, stop_file)),
        None => Box::new(HeadlessSink::new(stop_file)),
    };

    let settings = LoopSettings {
        presence: PresenceRule::new(config.person_class_id, config.presence_threshold),
        frame_size: (config.frame_width, config.frame_height),
        acquire_retry_delay: config.acquire_retry_delay,
    };

    let mut detection_loop =
        DetectionLoop::new(source, detector, actuator, sink, settings).with_stop_handle(stop);
    if config.snapshot_path.is_some() {
        detection_loop =
            detection_loop.with_annotator(Annotator::load(&config.font_path, "Person"));
    }

    let handle = detection_loop
        .spawn()
        .context("Failed to start detection loop thread")?;

    match handle.join() {
        Ok(summary) => {
            tracing::info!(
                final_state = ?summary.final_state,
                "Controller stopped gracefully"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Controller failed: {:#}", e);
            Err(e)
        }
    }
}
