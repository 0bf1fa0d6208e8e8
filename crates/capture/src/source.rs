use crate::error::CaptureError;
use crate::snapshot::SnapshotSource;
use schema::Frame;
use std::fmt;

/// Anything that can hand out the next frame, blocking until one is ready.
///
/// An `Err` means "no frame this time"; callers treat it as transient.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Human readable identification for logs.
    fn describe(&self) -> String {
        "frame source".to_string()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        (**self).next_frame()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Where frames come from, parsed from the `VIDEO_SOURCE` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// Local V4L2 device index (`/dev/videoN`).
    Camera(usize),
    /// HTTP(S) URL returning one JPEG per request.
    Snapshot(String),
}

impl SourceSpec {
    pub fn parse(value: &str) -> Result<Self, String> {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            return Ok(SourceSpec::Snapshot(value.to_string()));
        }
        let index = value
            .strip_prefix("/dev/video")
            .unwrap_or(value)
            .parse::<usize>()
            .map_err(|_| {
                format!(
                    "{} is not a supported video source. Use a camera index, /dev/videoN or an http(s) URL.",
                    value
                )
            })?;
        Ok(SourceSpec::Camera(index))
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Camera(index) => write!(f, "/dev/video{}", index),
            SourceSpec::Snapshot(url) => f.write_str(url),
        }
    }
}

/// Open the source described by `spec`. Cameras are asked for
/// `frame_size`; snapshot endpoints deliver whatever size they serve.
pub fn open_source(
    spec: &SourceSpec,
    frame_size: (u32, u32),
) -> anyhow::Result<Box<dyn FrameSource + Send>> {
    match spec {
        #[cfg(feature = "v4l2")]
        SourceSpec::Camera(index) => Ok(Box::new(crate::camera::CameraSource::open(
            *index, frame_size,
        )?)),
        #[cfg(not(feature = "v4l2"))]
        SourceSpec::Camera(index) => anyhow::bail!(
            "camera source /dev/video{} requested but the `v4l2` feature is disabled",
            index
        ),
        SourceSpec::Snapshot(url) => Ok(Box::new(SnapshotSource::new(url.clone())?)),
    }
}
