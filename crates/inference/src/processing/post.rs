use super::pre::Letterbox;
use schema::{BoundingBox, Detection};

const BOX_FEATURES: usize = 4;

pub struct PostProcessor {
    /// Candidates below this score are dropped before NMS.
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32, iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
            max_detections,
        }
    }

    /// Decode a YOLOv8 detection head into frame-space detections.
    ///
    /// Accepts `[1, 4 + nc, anchors]` (the Ultralytics export layout) or its
    /// transpose `[1, anchors, 4 + nc]`. Boxes are cxcywh in model input pixels;
    /// class scores are already sigmoid-activated.
    #[tracing::instrument(skip_all)]
    pub fn parse_detections(
        &self,
        predictions: &ndarray::ArrayViewD<f32>,
        letterbox: &Letterbox,
    ) -> anyhow::Result<Vec<Detection>> {
        let shape = predictions.shape();
        if shape.len() != 3 || shape[0] != 1 {
            anyhow::bail!("Unexpected YOLO output shape {:?}", shape);
        }

        // Anchors outnumber features for real exports (8400 vs 84); an empty
        // anchor axis keeps the export layout.
        let channels_first = shape[1] <= shape[2] || shape[2] <= BOX_FEATURES;
        let (features, anchors) = if channels_first {
            (shape[1], shape[2])
        } else {
            (shape[2], shape[1])
        };

        if features <= BOX_FEATURES {
            anyhow::bail!("YOLO output has no class scores: shape {:?}", shape);
        }

        let value = |feature: usize, anchor: usize| {
            if channels_first {
                predictions[[0, feature, anchor]]
            } else {
                predictions[[0, anchor, feature]]
            }
        };

        let mut candidates = Vec::new();

        for a in 0..anchors {
            let (class_idx, confidence) = (BOX_FEATURES..features)
                .map(|f| (f - BOX_FEATURES, value(f, a)))
                .fold((0usize, f32::NEG_INFINITY), |best, cur| {
                    if cur.1 > best.1 { cur } else { best }
                });

            if confidence < self.confidence_threshold {
                continue;
            }

            let (x1, y1, x2, y2) =
                cxcywh_to_xyxy(value(0, a), value(1, a), value(2, a), value(3, a));
            let (x1, y1) = letterbox.to_frame(x1, y1);
            let (x2, y2) = letterbox.to_frame(x2, y2);

            candidates.push(Detection::new(
                BoundingBox::new(x1, y1, x2, y2),
                class_idx as u32,
                confidence,
            ));
        }

        let mut detections = non_max_suppression(candidates, self.iou_threshold);
        detections.truncate(self.max_detections);

        tracing::trace!(count = detections.len(), "Detections after NMS");
        Ok(detections)
    }
}

/// Class-aware greedy NMS. Output is sorted by descending confidence.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept = 0;
    for index in 0..detections.len() {
        let candidate = detections[index];
        let suppressed = detections[..kept].iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            detections.swap(kept, index);
            kept += 1;
        }
    }
    detections.truncate(kept);
    detections
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    (cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
}
