use anyhow::Context;
use image::codecs::jpeg::JpegEncoder;
use schema::Frame;
use std::fs;
use std::path::PathBuf;

const JPEG_QUALITY: u8 = 85;

/// Where annotated frames are shown. Best-effort: errors are logged by the
/// loop and never stop it.
pub trait FrameSink {
    fn show(&mut self, frame: &Frame) -> anyhow::Result<()>;

    /// Whether the operator asked to quit through this surface.
    fn cancel_requested(&mut self) -> bool {
        false
    }

    /// `false` lets the loop skip annotation entirely.
    fn wants_frames(&self) -> bool {
        true
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn show(&mut self, frame: &Frame) -> anyhow::Result<()> {
        (**self).show(frame)
    }

    fn cancel_requested(&mut self) -> bool {
        (**self).cancel_requested()
    }

    fn wants_frames(&self) -> bool {
        (**self).wants_frames()
    }
}

/// Quit request signalled by creating a file. The file is consumed when seen.
#[derive(Debug, Clone)]
pub struct StopFile {
    path: PathBuf,
}

impl StopFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn triggered(&self) -> bool {
        if !self.path.exists() {
            return false;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove stop file");
        }
        tracing::info!(path = %self.path.display(), "Stop file found");
        true
    }
}

/// No display at all.
#[derive(Debug, Default)]
pub struct HeadlessSink {
    stop_file: Option<StopFile>,
}

impl HeadlessSink {
    pub fn new(stop_file: Option<StopFile>) -> Self {
        Self { stop_file }
    }
}

impl FrameSink for HeadlessSink {
    fn show(&mut self, _frame: &Frame) -> anyhow::Result<()> {
        Ok(())
    }

    fn cancel_requested(&mut self) -> bool {
        self.stop_file.as_ref().is_some_and(StopFile::triggered)
    }

    fn wants_frames(&self) -> bool {
        false
    }
}

/// Keeps the latest annotated frame as a JPEG on disk. Written to a temp
/// file and renamed so readers never see a partial image.
pub struct SnapshotSink {
    path: PathBuf,
    tmp_path: PathBuf,
    stop_file: Option<StopFile>,
    frames_written: u64,
}

impl SnapshotSink {
    pub fn new(path: impl Into<PathBuf>, stop_file: Option<StopFile>) -> Self {
        let path = path.into();
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        tracing::info!(path = %path.display(), "Writing annotated frames to snapshot file");
        Self {
            path,
            tmp_path,
            stop_file,
            frames_written: 0,
        }
    }

    fn write_jpeg(&self, frame: &Frame) -> anyhow::Result<()> {
        let mut jpeg = Vec::with_capacity(frame.pixels().len() / 8);
        JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
            .encode_image(frame.image())
            .context("Failed to encode snapshot")?;

        fs::write(&self.tmp_path, &jpeg)
            .with_context(|| format!("Failed to write {}", self.tmp_path.display()))?;

        fs::rename(&self.tmp_path, &self.path)
            .with_context(|| format!("Failed to move snapshot to {}", self.path.display()))?;
        Ok(())
    }
}

impl FrameSink for SnapshotSink {
    fn show(&mut self, frame: &Frame) -> anyhow::Result<()> {
        let _s = common::span_debug!("snapshot_write");
        self.write_jpeg(frame)?;
        self.frames_written += 1;
        Ok(())
    }

    fn cancel_requested(&mut self) -> bool {
        self.stop_file.as_ref().is_some_and(StopFile::triggered)
    }
}

impl Drop for SnapshotSink {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.tmp_path);
        tracing::info!(
            path = %self.path.display(),
            frames_written = self.frames_written,
            "Snapshot sink closed"
        );
    }
}
