use anyhow::{Context, Result, anyhow};
use common::retry_with_backoff;
use v4l::{Device, FourCC, capability::Flags, video::Capture};

pub(crate) const FOURCC_YUYV: FourCC = FourCC { repr: *b"YUYV" };
pub(crate) const FOURCC_MJPG: FourCC = FourCC { repr: *b"MJPG" };

const OPEN_RETRIES: u32 = 10;
const OPEN_BASE_DELAY_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Yuyv,
    Mjpeg,
}

impl PixelFormat {
    fn fourcc(self) -> FourCC {
        match self {
            PixelFormat::Yuyv => FOURCC_YUYV,
            PixelFormat::Mjpeg => FOURCC_MJPG,
        }
    }
}

/// Prefer YUYV (no entropy decoding), fall back to MJPEG.
pub(crate) fn select_format(fourccs: &[FourCC]) -> Result<PixelFormat> {
    [PixelFormat::Yuyv, PixelFormat::Mjpeg]
        .into_iter()
        .find(|format| fourccs.contains(&format.fourcc()))
        .ok_or_else(|| anyhow!("Camera offers neither YUYV nor MJPEG (has {:?})", fourccs))
}

fn can_capture(device: &Device) -> bool {
    device
        .query_caps()
        .is_ok_and(|caps| caps.capabilities.contains(Flags::VIDEO_CAPTURE))
}

/// Open `/dev/video<index>`; if it is busy or not a capture node, take the
/// first device that can capture.
fn open_capture_device(index: usize) -> Result<(Device, usize)> {
    if let Ok(device) = Device::new(index)
        && can_capture(&device)
    {
        return Ok((device, index));
    }

    tracing::debug!(index, "Requested camera unusable, scanning /dev/video*");

    v4l::context::enum_devices()
        .into_iter()
        .map(|node| node.index())
        .filter(|candidate| *candidate != index)
        .find_map(|candidate| {
            Device::new(candidate)
                .ok()
                .filter(can_capture)
                .map(|device| (device, candidate))
        })
        .ok_or_else(|| anyhow!("No video capture device available"))
}

/// An opened V4L2 capture device with its negotiated format.
pub struct CameraDevice {
    pub device: Device,
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

impl CameraDevice {
    /// Open the camera and negotiate a format as close as the driver allows
    /// to `requested` (width, height).
    pub fn open(index: usize, requested: (u32, u32)) -> Result<Self> {
        let (device, index) = retry_with_backoff(
            || open_capture_device(index),
            OPEN_RETRIES,
            OPEN_BASE_DELAY_MS,
            "Camera open",
        )?;

        let caps = device.query_caps()?;
        tracing::info!(index, card = %caps.card, driver = %caps.driver, "Camera opened");

        let fourccs: Vec<FourCC> = device
            .enum_formats()
            .context("Failed to list camera formats")?
            .iter()
            .map(|f| f.fourcc)
            .collect();
        let pixel_format = select_format(&fourccs)?;

        let mut format = device.format()?;
        format.fourcc = pixel_format.fourcc();
        format.width = requested.0;
        format.height = requested.1;
        let format = device
            .set_format(&format)
            .context("Failed to set capture format")?;

        if format.fourcc != pixel_format.fourcc() {
            return Err(anyhow!(
                "Driver replaced {:?} with {:?}",
                pixel_format,
                format.fourcc
            ));
        }

        tracing::info!(
            width = format.width,
            height = format.height,
            ?pixel_format,
            "Capture format negotiated"
        );

        Ok(Self {
            device,
            index,
            width: format.width,
            height: format.height,
            pixel_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_format_prefers_yuyv() {
        let formats = [FOURCC_MJPG, FOURCC_YUYV];
        assert_eq!(select_format(&formats).unwrap(), PixelFormat::Yuyv);
    }

    #[test]
    fn select_format_falls_back_to_mjpeg() {
        let formats = [FourCC::new(b"GREY"), FOURCC_MJPG];
        assert_eq!(select_format(&formats).unwrap(), PixelFormat::Mjpeg);
    }

    #[test]
    fn select_format_rejects_unknown_formats() {
        let formats = [FourCC::new(b"GREY")];
        assert!(select_format(&formats).is_err());
    }
}
