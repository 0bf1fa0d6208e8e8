use crate::{
    annotate::Annotator,
    display::FrameSink,
    handle::{LoopHandle, PresenceMirror, StopHandle},
    presence::PresenceRule,
    state_machine::{PresenceState, PresenceTracker, Transition},
};
use actuator::Actuator;
use anyhow::Context;
use capture::{CaptureError, FrameResizer, FrameSource};
use inference::Detector;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use schema::Frame;
use std::io;
use std::thread;
use std::time::{Duration, Instant};

const STATUS_EVERY_FRAMES: u64 = 30;
const FAILURE_SUMMARY_EVERY: u64 = 30;

/// Tunables of the detection loop.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub presence: PresenceRule,
    pub frame_size: (u32, u32),
    /// Pause after a failed acquisition. Zero retries immediately.
    pub acquire_retry_delay: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            presence: PresenceRule::default(),
            frame_size: (480, 360),
            acquire_retry_delay: Duration::ZERO,
        }
    }
}

/// What a finished loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames_processed: u64,
    pub acquisition_failures: u64,
    pub activations: u64,
    pub deactivations: u64,
    pub actuator_failures: u64,
    pub final_state: PresenceState,
}

struct LoopMetrics {
    frames: Counter<u64>,
    acquisition_failures: Counter<u64>,
    transitions: Counter<u64>,
    actuator_failures: Counter<u64>,
    inference_duration: Histogram<f64>,
}

impl LoopMetrics {
    fn init(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.005, 0.01, 0.02, 0.03, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 1.0, 2.0,
        ];
        Self {
            frames: meter
                .u64_counter("controller_frames_total")
                .with_description("Frames that went through inference")
                .build(),
            acquisition_failures: meter
                .u64_counter("controller_acquisition_failures_total")
                .with_description("Failed frame acquisitions (retried)")
                .build(),
            transitions: meter
                .u64_counter("controller_transitions_total")
                .with_description("Presence state transitions")
                .build(),
            actuator_failures: meter
                .u64_counter("controller_actuator_failures_total")
                .with_description("Commands that could not be written to the actuator")
                .build(),
            inference_duration: meter
                .f64_histogram("controller_inference_duration_seconds")
                .with_description("Time to run detection on one frame")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
        }
    }
}

/// Acquire, detect, reduce, signal, display. Owns its source, actuator and
/// sink; all three are dropped when `run` returns.
pub struct DetectionLoop<S, D, A, K> {
    source: S,
    detector: D,
    actuator: A,
    sink: K,
    annotator: Option<Annotator>,
    resizer: FrameResizer,
    settings: LoopSettings,
    tracker: PresenceTracker,
    stop: StopHandle,
    presence: PresenceMirror,
    metrics: LoopMetrics,
    summary: LoopSummary,
    consecutive_failures: u64,
}

impl<S, D, A, K> DetectionLoop<S, D, A, K>
where
    S: FrameSource,
    D: Detector,
    A: Actuator,
    K: FrameSink,
{
    pub fn new(source: S, detector: D, actuator: A, sink: K, settings: LoopSettings) -> Self {
        let (width, height) = settings.frame_size;
        Self {
            source,
            detector,
            actuator,
            sink,
            annotator: None,
            resizer: FrameResizer::new(width, height),
            settings,
            tracker: PresenceTracker::new(),
            stop: StopHandle::new(),
            presence: PresenceMirror::default(),
            metrics: LoopMetrics::init("controller"),
            summary: LoopSummary {
                frames_processed: 0,
                acquisition_failures: 0,
                activations: 0,
                deactivations: 0,
                actuator_failures: 0,
                final_state: PresenceState::Absent,
            },
            consecutive_failures: 0,
        }
    }

    pub fn with_annotator(mut self, annotator: Annotator) -> Self {
        self.annotator = Some(annotator);
        self
    }

    /// Share an existing stop flag (e.g. one already wired to signals).
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn presence(&self) -> PresenceMirror {
        self.presence.clone()
    }

    /// Run on the calling thread until stopped, cancelled, or inference fails.
    pub fn run(mut self) -> anyhow::Result<LoopSummary> {
        tracing::info!(
            source = %self.source.describe(),
            frame_width = self.settings.frame_size.0,
            frame_height = self.settings.frame_size.1,
            person_class_id = self.settings.presence.class_id,
            presence_threshold = self.settings.presence.threshold,
            "Detection loop starting"
        );

        let result = self.run_until_stopped();

        self.summary.final_state = self.tracker.current_state();
        tracing::info!(
            "Shutdown: {} frames processed, {} acquisition failures, {} activations, {} deactivations, {} actuator failures",
            self.summary.frames_processed,
            self.summary.acquisition_failures,
            self.summary.activations,
            self.summary.deactivations,
            self.summary.actuator_failures,
        );

        result.map(|()| self.summary.clone())
    }

    /// Start the loop on a dedicated `detection-loop` thread.
    pub fn spawn(self) -> io::Result<LoopHandle>
    where
        S: Send + 'static,
        D: Send + 'static,
        A: Send + 'static,
        K: Send + 'static,
    {
        let stop = self.stop.clone();
        let presence = self.presence.clone();
        let thread = thread::Builder::new()
            .name("detection-loop".to_string())
            .spawn(move || self.run())?;
        Ok(LoopHandle::new(thread, stop, presence))
    }

    fn run_until_stopped(&mut self) -> anyhow::Result<()> {
        loop {
            if self.stop.is_stopped() {
                tracing::info!("Stop requested");
                return Ok(());
            }

            let mut frame = match self.acquire() {
                Ok(frame) => frame,
                Err(e) => {
                    self.on_acquisition_failure(&e);
                    continue;
                }
            };
            self.consecutive_failures = 0;

            let detections = self.infer(&frame)?;
            let present = self.settings.presence.is_present(&detections);

            let show = self.sink.wants_frames();
            if show && let Some(annotator) = &self.annotator {
                annotator.annotate(
                    frame.image_mut(),
                    self.settings.presence.qualifying(&detections),
                );
            }

            if let Some(transition) = self.tracker.update(present) {
                self.signal(transition);
            }

            if show && let Err(e) = self.sink.show(&frame) {
                tracing::warn!(error = %e, "Failed to display frame");
            }

            self.summary.frames_processed += 1;
            self.metrics.frames.add(1, &[]);
            if self.summary.frames_processed.is_multiple_of(STATUS_EVERY_FRAMES) {
                tracing::debug!(
                    frames_processed = self.summary.frames_processed,
                    current_state = ?self.tracker.current_state(),
                    detections = detections.len(),
                    present,
                    "Detection loop status"
                );
            }

            if self.sink.cancel_requested() {
                tracing::info!("Cancel requested by display");
                return Ok(());
            }
        }
    }

    fn acquire(&mut self) -> Result<Frame, CaptureError> {
        let frame = self.source.next_frame()?;
        self.resizer.normalize(frame)
    }

    fn on_acquisition_failure(&mut self, error: &CaptureError) {
        self.consecutive_failures += 1;
        self.summary.acquisition_failures += 1;
        self.metrics.acquisition_failures.add(1, &[]);

        tracing::warn!(error = %error, "Failed to acquire frame");
        if self.consecutive_failures.is_multiple_of(FAILURE_SUMMARY_EVERY) {
            tracing::warn!(
                consecutive_failures = self.consecutive_failures,
                source = %self.source.describe(),
                "Frame source keeps failing"
            );
        }

        if !self.settings.acquire_retry_delay.is_zero() {
            thread::sleep(self.settings.acquire_retry_delay);
        }
    }

    fn infer(&mut self, frame: &Frame) -> anyhow::Result<Vec<schema::Detection>> {
        let started = Instant::now();
        let detections = self.detector.detect(frame).map_err(|e| {
            tracing::error!(error = %e, sequence = frame.sequence(), "Inference failed");
            e
        });
        self.metrics
            .inference_duration
            .record(started.elapsed().as_secs_f64(), &[]);

        detections.with_context(|| format!("Inference failed on frame {}", frame.sequence()))
    }

    fn signal(&mut self, transition: Transition) {
        let command = transition.command();
        let write = self.actuator.send(command);

        match transition {
            Transition::Appeared => {
                self.summary.activations += 1;
                tracing::info!("Person detected - actuator activated");
            }
            Transition::Vanished => {
                self.summary.deactivations += 1;
                tracing::info!("No person - actuator deactivated");
            }
        }
        self.presence.set(self.tracker.current_state().is_present());
        self.metrics.transitions.add(
            1,
            &[KeyValue::new(
                "to",
                if transition == Transition::Appeared {
                    "present"
                } else {
                    "absent"
                },
            )],
        );

        if let Err(e) = write {
            self.summary.actuator_failures += 1;
            self.metrics.actuator_failures.add(1, &[]);
            tracing::error!(error = %e, %command, "Failed to send actuator command");
        }
    }
}
