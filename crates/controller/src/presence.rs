use schema::Detection;

/// Which detections count as "a person is here".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresenceRule {
    pub class_id: u32,
    /// Confidence must be strictly greater than this.
    pub threshold: f32,
}

impl PresenceRule {
    pub fn new(class_id: u32, threshold: f32) -> Self {
        Self {
            class_id,
            threshold,
        }
    }

    pub fn qualifies(&self, detection: &Detection) -> bool {
        detection.class_id == self.class_id && detection.confidence > self.threshold
    }

    pub fn qualifying<'a>(
        &'a self,
        detections: &'a [Detection],
    ) -> impl Iterator<Item = &'a Detection> + 'a {
        detections.iter().filter(|d| self.qualifies(d))
    }

    /// Reduce one frame's detections to a single boolean.
    pub fn is_present(&self, detections: &[Detection]) -> bool {
        detections.iter().any(|d| self.qualifies(d))
    }
}

impl Default for PresenceRule {
    fn default() -> Self {
        Self::new(0, 0.5)
    }
}
