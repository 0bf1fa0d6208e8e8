use crate::error::CaptureError;
use common::span_debug;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use schema::Frame;

/// Scales every frame to one fixed working resolution before inference.
pub struct FrameResizer {
    width: u32,
    height: u32,
    resizer: Resizer,
    options: ResizeOptions,
}

impl FrameResizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            resizer: Resizer::new(),
            options: ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        }
    }

    /// Resize `frame` to the target resolution. Frames already at the target
    /// size are passed through untouched.
    pub fn normalize(&mut self, frame: Frame) -> Result<Frame, CaptureError> {
        if frame.width() == self.width && frame.height() == self.height {
            return Ok(frame);
        }

        let _s = span_debug!("resize_frame");

        let sequence = frame.sequence();
        let (src_width, src_height) = (frame.width(), frame.height());
        let src = Image::from_vec_u8(
            src_width,
            src_height,
            frame.into_image().into_raw(),
            PixelType::U8x3,
        )
        .map_err(|e| CaptureError::Resize(e.to_string()))?;

        let mut dst = Image::new(self.width, self.height, PixelType::U8x3);

        self.resizer
            .resize(&src, &mut dst, &self.options)
            .map_err(|e| CaptureError::Resize(e.to_string()))?;

        Frame::from_rgb(self.width, self.height, dst.into_vec(), sequence).ok_or(
            CaptureError::SizeMismatch {
                expected: (self.width * self.height * 3) as usize,
                actual: 0,
            },
        )
    }
}
