use common::span;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use ndarray::{Array, IxDyn};
use schema::Frame;

pub const DEFAULT_INPUT_SIZE: (u32, u32) = (640, 640);
const LETTERBOX_COLOR: u8 = 114;

/// Geometry of a letterbox transform, needed to map boxes back to the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub orig_width: u32,
    pub orig_height: u32,
    pub input_width: u32,
    pub input_height: u32,
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Letterbox {
    pub fn fit(orig_width: u32, orig_height: u32, input_size: (u32, u32)) -> anyhow::Result<Self> {
        let (input_width, input_height) = input_size;
        if orig_width == 0 || orig_height == 0 {
            anyhow::bail!("Cannot letterbox empty frame {}x{}", orig_width, orig_height);
        }
        if input_width == 0 || input_height == 0 {
            anyhow::bail!("Invalid model input size {}x{}", input_width, input_height);
        }

        let scale = (input_width as f32 / orig_width as f32)
            .min(input_height as f32 / orig_height as f32);
        let (new_width, new_height) = scaled_size(orig_width, orig_height, scale, input_size);

        Ok(Self {
            orig_width,
            orig_height,
            input_width,
            input_height,
            scale,
            offset_x: ((input_width - new_width) / 2) as f32,
            offset_y: ((input_height - new_height) / 2) as f32,
        })
    }

    /// Map a point from model input space back to frame pixels, clamped.
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        let fx = ((x - self.offset_x) / self.scale).clamp(0.0, self.orig_width as f32);
        let fy = ((y - self.offset_y) / self.scale).clamp(0.0, self.orig_height as f32);
        (fx, fy)
    }
}

fn scaled_size(width: u32, height: u32, scale: f32, input_size: (u32, u32)) -> (u32, u32) {
    let new_width = ((width as f32 * scale).round() as u32).clamp(1, input_size.0);
    let new_height = ((height as f32 * scale).round() as u32).clamp(1, input_size.1);
    (new_width, new_height)
}

/// Letterbox + normalize frames into the YOLOv8 input tensor
/// (`[1, 3, H, W]`, RGB, values in `[0, 1]`).
pub struct PreProcessor {
    pub input_size: (u32, u32),
    resizer: Resizer,
    letterboxed_buffer: Vec<u8>,
}

impl PreProcessor {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self {
            input_size,
            resizer: Resizer::new(),
            letterboxed_buffer: vec![LETTERBOX_COLOR; (input_size.0 * input_size.1 * 3) as usize],
        }
    }

    pub fn preprocess_frame(
        &mut self,
        frame: &Frame,
    ) -> anyhow::Result<(Array<f32, IxDyn>, Letterbox)> {
        let _s = span!("preprocess_frame");

        let (width, height) = (frame.width(), frame.height());
        if width == 0 || height == 0 {
            anyhow::bail!("Cannot preprocess empty frame {}x{}", width, height);
        }

        tracing::trace!(width, height, "Preprocessing frame dimensions");

        let letterbox = Letterbox::fit(width, height, self.input_size)?;
        self.resize_into_letterbox(frame, &letterbox)?;

        Ok((self.normalize()?, letterbox))
    }

    fn resize_into_letterbox(&mut self, frame: &Frame, letterbox: &Letterbox) -> anyhow::Result<()> {
        let _s = span!("resize_and_letterbox");

        let (new_width, new_height) =
            scaled_size(frame.width(), frame.height(), letterbox.scale, self.input_size);

        let src = ImageRef::new(frame.width(), frame.height(), frame.pixels(), PixelType::U8x3)?;
        let mut resized = Image::new(new_width, new_height, PixelType::U8x3);

        self.resizer.resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        self.letterboxed_buffer.fill(LETTERBOX_COLOR);

        let resized_data = resized.buffer();
        let stride = (self.input_size.0 * 3) as usize;
        let row_bytes = (new_width * 3) as usize;
        let offset_x = letterbox.offset_x as usize;
        let offset_y = letterbox.offset_y as usize;

        for y in 0..new_height as usize {
            let src_row = y * row_bytes;
            let dst_row = (y + offset_y) * stride + offset_x * 3;
            self.letterboxed_buffer[dst_row..dst_row + row_bytes]
                .copy_from_slice(&resized_data[src_row..src_row + row_bytes]);
        }

        Ok(())
    }

    fn normalize(&self) -> anyhow::Result<Array<f32, IxDyn>> {
        let _s = span!("normalize");

        let (width, height) = (self.input_size.0 as usize, self.input_size.1 as usize);
        let spatial = width * height;
        let mut output = vec![0.0f32; 3 * spatial];

        for (i, px) in self.letterboxed_buffer.chunks_exact(3).enumerate() {
            output[i] = px[0] as f32 / 255.0;
            output[i + spatial] = px[1] as f32 / 255.0;
            output[i + 2 * spatial] = px[2] as f32 / 255.0;
        }

        Ok(Array::from_shape_vec(IxDyn(&[1, 3, height, width]), output)?)
    }
}

impl Default for PreProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let pixels = (0..width * height).flat_map(|_| rgb).collect();
        Frame::from_rgb(width, height, pixels, 0).unwrap()
    }

    #[test]
    fn test_output_shape_is_nchw() {
        let mut preprocessor = PreProcessor::default();
        let (output, _) = preprocessor
            .preprocess_frame(&solid_frame(2, 2, [255, 0, 0]))
            .unwrap();
        assert_eq!(output.shape(), &[1, 3, 640, 640]);
    }

    /// 480x360 working frames land in the middle of the 640x640 input
    #[test]
    fn test_letterboxing_preserves_aspect_ratio() {
        let mut preprocessor = PreProcessor::default();
        let (output, letterbox) = preprocessor
            .preprocess_frame(&solid_frame(480, 360, [255, 255, 255]))
            .unwrap();

        // scale = min(640/480, 640/360) = 1.333..; resized to 640x480
        assert!((letterbox.scale - 640.0 / 480.0).abs() < 1e-6);
        assert_eq!(letterbox.offset_x, 0.0);
        assert_eq!(letterbox.offset_y, 80.0);

        // Padding rows keep the letterbox grey, content rows are white
        let pad = LETTERBOX_COLOR as f32 / 255.0;
        assert!((output[[0, 0, 10, 320]] - pad).abs() < 1e-6);
        assert!((output[[0, 0, 320, 320]] - 1.0).abs() < 1e-6);
        assert!((output[[0, 2, 630, 320]] - pad).abs() < 1e-6);
    }

    #[test]
    fn test_channels_are_split_in_rgb_order() {
        let mut preprocessor = PreProcessor::new((4, 4));
        let (output, _) = preprocessor
            .preprocess_frame(&solid_frame(4, 4, [255, 0, 51]))
            .unwrap();
        assert!((output[[0, 0, 1, 1]] - 1.0).abs() < 1e-6);
        assert!(output[[0, 1, 1, 1]].abs() < 1e-6);
        assert!((output[[0, 2, 1, 1]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_letterbox_maps_back_to_frame() {
        let letterbox = Letterbox::fit(480, 360, (640, 640)).unwrap();
        let (x, y) = letterbox.to_frame(320.0, 320.0);
        assert!((x - 240.0).abs() < 1e-3);
        assert!((y - 180.0).abs() < 1e-3);

        // Points in the padding clamp to the frame edge
        let (x, y) = letterbox.to_frame(-50.0, 10.0);
        assert_eq!((x, y), (0.0, 0.0));
        let (x, y) = letterbox.to_frame(700.0, 639.0);
        assert_eq!((x, y), (480.0, 360.0));
    }

    #[test]
    fn test_empty_frame_is_rejected() {
        let frame = Frame::from_rgb(0, 0, vec![], 0).unwrap();
        let mut preprocessor = PreProcessor::default();
        assert!(preprocessor.preprocess_frame(&frame).is_err());
    }

    #[test]
    fn test_zero_input_size_is_an_error() {
        assert!(Letterbox::fit(480, 360, (0, 640)).is_err());
        assert!(Letterbox::fit(480, 360, (640, 0)).is_err());

        let mut preprocessor = PreProcessor::new((0, 640));
        let err = preprocessor
            .preprocess_frame(&solid_frame(480, 360, [0, 0, 0]))
            .unwrap_err();
        assert!(err.to_string().contains("0x640"));
    }
}
