use crate::decoder::{FrameDecoder, MjpegDecoder, YuyvDecoder};
use crate::device::{CameraDevice, PixelFormat};
use crate::error::CaptureError;
use crate::source::FrameSource;
use anyhow::{Context, Result};
use schema::Frame;
use v4l::{
    Device,
    buffer::Type,
    io::{mmap::Stream, traits::CaptureStream},
};

const BUFFER_COUNT: u32 = 4;

/// Local V4L2 camera. The device and its mmap stream are released on drop.
pub struct CameraSource {
    // Declared before `device` so the stream is torn down first.
    stream: Stream<'static>,
    decoder: Box<dyn FrameDecoder>,
    device: Device,
    index: usize,
    width: u32,
    height: u32,
    frame_count: u64,
    dropped_frames: u64,
}

impl CameraSource {
    /// Open `/dev/video<index>` (or the first usable camera) asking the driver
    /// for `requested` (width, height).
    pub fn open(index: usize, requested: (u32, u32)) -> Result<Self> {
        let CameraDevice {
            device,
            index,
            width,
            height,
            pixel_format,
        } = CameraDevice::open(index, requested)?;

        let decoder: Box<dyn FrameDecoder> = match pixel_format {
            PixelFormat::Yuyv => Box::new(YuyvDecoder::new()),
            PixelFormat::Mjpeg => Box::new(MjpegDecoder::new()?),
        };

        let stream = Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .context("Failed to create capture stream")?;

        tracing::info!(index, width, height, "Camera stream started");

        Ok(Self {
            stream,
            decoder,
            device,
            index,
            width,
            height,
            frame_count: 0,
            dropped_frames: 0,
        })
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        let (buf, _meta) = self.stream.next()?;
        let decoded = self.decoder.decode(buf, self.width, self.height)?;
        let frame = Frame::from_rgb(
            decoded.width,
            decoded.height,
            decoded.pixels.to_vec(),
            self.frame_count,
        )
        .ok_or(CaptureError::SizeMismatch {
            expected: (decoded.width * decoded.height * 3) as usize,
            actual: decoded.pixels.len(),
        })?;
        self.frame_count += 1;
        Ok(frame)
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        self.capture().inspect_err(|_| self.dropped_frames += 1)
    }

    fn describe(&self) -> String {
        format!("camera /dev/video{}", self.index)
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        let card = self
            .device
            .query_caps()
            .map(|caps| caps.card)
            .unwrap_or_default();
        tracing::info!(
            card = %card,
            frames = self.frame_count,
            dropped = self.dropped_frames,
            "Camera released"
        );
    }
}
