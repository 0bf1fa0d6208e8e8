use image::RgbImage;

/// One RGB8 image sample from a video source.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
    sequence: u64,
}

impl Frame {
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self { image, sequence }
    }

    /// Build a frame from tightly packed RGB bytes. Returns `None` when the
    /// buffer length does not match `width * height * 3`.
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>, sequence: u64) -> Option<Self> {
        RgbImage::from_raw(width, height, pixels).map(|image| Self { image, sequence })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}
