use crate::decoder::{FrameDecoder, MjpegDecoder};
use crate::error::CaptureError;
use crate::source::FrameSource;
use schema::Frame;
use std::io::Read;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_SNAPSHOT_BYTES: u64 = 16 * 1024 * 1024;

/// Network still-image endpoint (e.g. an IP camera app serving `/shot.jpg`).
/// Every call fetches one JPEG and decodes it.
pub struct SnapshotSource {
    agent: ureq::Agent,
    url: String,
    decoder: MjpegDecoder,
    body: Vec<u8>,
    frame_count: u64,
}

impl SnapshotSource {
    pub fn new(url: impl Into<String>) -> Result<Self, CaptureError> {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        let url = url.into();
        tracing::info!(url = %url, "Using HTTP snapshot source");
        Ok(Self {
            agent,
            url,
            decoder: MjpegDecoder::new()?,
            body: Vec::new(),
            frame_count: 0,
        })
    }

    fn fetch(&mut self) -> Result<(), CaptureError> {
        let response = self.agent.get(&self.url).call()?;
        self.body.clear();
        response
            .into_reader()
            .take(MAX_SNAPSHOT_BYTES)
            .read_to_end(&mut self.body)?;
        if self.body.is_empty() {
            return Err(CaptureError::NoFrame);
        }
        Ok(())
    }
}

impl FrameSource for SnapshotSource {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        self.fetch()?;
        let decoded = self.decoder.decode(&self.body, 0, 0)?;
        let frame = Frame::from_rgb(
            decoded.width,
            decoded.height,
            decoded.pixels.to_vec(),
            self.frame_count,
        )
        .ok_or(CaptureError::NoFrame)?;
        self.frame_count += 1;
        Ok(frame)
    }

    fn describe(&self) -> String {
        format!("snapshot {}", self.url)
    }
}

impl Drop for SnapshotSource {
    fn drop(&mut self) {
        tracing::info!(url = %self.url, frames = self.frame_count, "Snapshot source released");
    }
}
