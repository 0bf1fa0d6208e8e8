use crate::error::CaptureError;
use common::span;

/// RGB pixels produced by a decoder, borrowed from its internal buffer.
#[derive(Debug)]
pub struct DecodedImage<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
}

/// Trait for decoding raw camera frames to RGB.
pub trait FrameDecoder: Send {
    /// Decode raw frame data to RGB (3 bytes per pixel).
    ///
    /// `width`/`height` are the negotiated capture dimensions; decoders that
    /// carry their own header (MJPEG) report the decoded size instead.
    fn decode(
        &mut self,
        raw: &[u8],
        width: u32,
        height: u32,
    ) -> Result<DecodedImage<'_>, CaptureError>;
}

/// YUYV (YUV 4:2:2) decoder.
///
/// YUYV packs 2 pixels in 4 bytes: [Y0, U, Y1, V]
pub struct YuyvDecoder {
    rgb_buffer: Vec<u8>,
}

impl Default for YuyvDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl YuyvDecoder {
    pub fn new() -> Self {
        Self {
            rgb_buffer: Vec::with_capacity(1920 * 1080 * 3),
        }
    }
}

impl FrameDecoder for YuyvDecoder {
    fn decode(
        &mut self,
        raw: &[u8],
        width: u32,
        height: u32,
    ) -> Result<DecodedImage<'_>, CaptureError> {
        let _s = span!("decode_yuyv");

        let rgb_size = (width * height * 3) as usize;
        let bytes_per_row = (width * 2) as usize;
        let expected = bytes_per_row * height as usize;

        if height == 0 || raw.len() < expected {
            return Err(CaptureError::SizeMismatch {
                expected,
                actual: raw.len(),
            });
        }

        self.rgb_buffer.resize(rgb_size, 0);

        // Drivers may pad rows; derive the real stride from the buffer.
        let stride = raw.len() / height as usize;

        let mut out_idx = 0;
        for row in 0..height as usize {
            let row_start = row * stride;
            let row_data = &raw[row_start..row_start + bytes_per_row];

            for chunk in row_data.chunks_exact(4) {
                let y0 = chunk[0] as i32;
                let u = chunk[1] as i32 - 128;
                let y1 = chunk[2] as i32;
                let v = chunk[3] as i32 - 128;

                // BT.601 fixed-point coefficients (8-bit fraction)
                // R = Y + 1.402*V  -> Y + (359*V >> 8)
                // G = Y - 0.344*U - 0.714*V -> Y - ((88*U + 183*V) >> 8)
                // B = Y + 1.772*U -> Y + (454*U >> 8)
                let rv = (359 * v) >> 8;
                let gu = (88 * u + 183 * v) >> 8;
                let bu = (454 * u) >> 8;

                for y in [y0, y1] {
                    self.rgb_buffer[out_idx] = (y + rv).clamp(0, 255) as u8;
                    self.rgb_buffer[out_idx + 1] = (y - gu).clamp(0, 255) as u8;
                    self.rgb_buffer[out_idx + 2] = (y + bu).clamp(0, 255) as u8;
                    out_idx += 3;
                }
            }
        }

        Ok(DecodedImage {
            pixels: &self.rgb_buffer[..rgb_size],
            width,
            height,
        })
    }
}

/// JPEG decoder using turbojpeg (libjpeg-turbo). Used for MJPEG camera
/// streams and for HTTP snapshot endpoints.
pub struct MjpegDecoder {
    decompressor: turbojpeg::Decompressor,
    rgb_buffer: Vec<u8>,
}

impl MjpegDecoder {
    pub fn new() -> Result<Self, CaptureError> {
        Ok(Self {
            decompressor: turbojpeg::Decompressor::new()?,
            rgb_buffer: Vec::with_capacity(1920 * 1080 * 3),
        })
    }
}

impl FrameDecoder for MjpegDecoder {
    fn decode(
        &mut self,
        raw: &[u8],
        _width: u32,
        _height: u32,
    ) -> Result<DecodedImage<'_>, CaptureError> {
        let _s = span!("decode_mjpeg");

        let header = self.decompressor.read_header(raw)?;
        let width = header.width;
        let height = header.height;
        let rgb_size = width * height * 3;

        self.rgb_buffer.resize(rgb_size, 0);

        let output = turbojpeg::Image {
            pixels: &mut self.rgb_buffer[..rgb_size],
            width,
            pitch: width * 3,
            height,
            format: turbojpeg::PixelFormat::RGB,
        };

        self.decompressor.decompress(raw, output)?;

        Ok(DecodedImage {
            pixels: &self.rgb_buffer[..rgb_size],
            width: width as u32,
            height: height as u32,
        })
    }
}
