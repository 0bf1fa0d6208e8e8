use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use schema::Detection;
use std::path::Path;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: i32 = 2;
const LABEL_SCALE: f32 = 18.0;
const LABEL_GAP: i32 = 4;

/// Draws boxes and `"Person 0.87"` labels for qualifying detections.
pub struct Annotator {
    font: Option<FontVec>,
    label: String,
}

impl Annotator {
    /// Load the label font from `font_path`. A missing or invalid font only
    /// disables labels; boxes are still drawn.
    pub fn load(font_path: &Path, label: &str) -> Self {
        let font = match std::fs::read(font_path) {
            Ok(bytes) => match FontVec::try_from_vec(bytes) {
                Ok(font) => Some(font),
                Err(e) => {
                    tracing::warn!(path = %font_path.display(), error = %e, "Invalid label font, labels disabled");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(path = %font_path.display(), error = %e, "Label font not found, labels disabled");
                None
            }
        };
        Self::with_font(font, label)
    }

    pub fn with_font(font: Option<FontVec>, label: &str) -> Self {
        Self {
            font,
            label: label.to_string(),
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn label_for(&self, detection: &Detection) -> String {
        format!("{} {:.2}", self.label, detection.confidence)
    }

    pub fn annotate<'a>(
        &self,
        image: &mut RgbImage,
        detections: impl IntoIterator<Item = &'a Detection>,
    ) {
        for detection in detections {
            let Some(rect) = box_rect(detection, image.width(), image.height()) else {
                continue;
            };

            for inset in 0..BOX_THICKNESS {
                let width = rect.width() as i32 - 2 * inset;
                let height = rect.height() as i32 - 2 * inset;
                if width <= 0 || height <= 0 {
                    break;
                }
                draw_hollow_rect_mut(
                    image,
                    Rect::at(rect.left() + inset, rect.top() + inset)
                        .of_size(width as u32, height as u32),
                    BOX_COLOR,
                );
            }

            if let Some(font) = &self.font {
                let text = self.label_for(detection);
                let scale = PxScale::from(LABEL_SCALE);
                let (_, text_height) = text_size(scale, font, &text);
                let y = (rect.top() - text_height as i32 - LABEL_GAP).max(0);
                draw_text_mut(image, BOX_COLOR, rect.left(), y, scale, font, &text);
            }
        }
    }
}

/// Integer rectangle for a detection, clipped to the image. `None` when the
/// box has no visible area.
fn box_rect(detection: &Detection, width: u32, height: u32) -> Option<Rect> {
    let b = detection.bbox;
    let x1 = (b.x1.round() as i32).clamp(0, width as i32 - 1);
    let y1 = (b.y1.round() as i32).clamp(0, height as i32 - 1);
    let x2 = (b.x2.round() as i32).clamp(0, width as i32 - 1);
    let y2 = (b.y2.round() as i32).clamp(0, height as i32 - 1);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(Rect::at(x1, y1).of_size((x2 - x1 + 1) as u32, (y2 - y1 + 1) as u32))
}
