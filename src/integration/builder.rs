//! Builder for creating Detection objects from various input formats.

use crate::tracker::Detection;

/// Builder for creating `Detection` objects from various input formats.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
    label: i32,
    detection_id: Option<i64>,
}

impl DetectionBuilder {
    /// Create a new detection builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.x1 = cx - w / 2.0;
        self.y1 = cy - h / 2.0;
        self.x2 = cx + w / 2.0;
        self.y2 = cy + h / 2.0;
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.x1 = x;
        self.y1 = y;
        self.x2 = x + w;
        self.y2 = y + h;
        self
    }

    /// Set the confidence score in [0, 1].
    pub fn score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Set the confidence from a percentage, as region metadata carries it.
    pub fn confidence_percent(mut self, percent: f64) -> Self {
        self.score = (percent / 100.0) as f32;
        self
    }

    pub fn label(mut self, label: i32) -> Self {
        self.label = label;
        self
    }

    /// Set the correlation id echoed back on the matching track.
    pub fn detection_id(mut self, detection_id: i64) -> Self {
        self.detection_id = Some(detection_id);
        self
    }

    /// Build the final `Detection`.
    pub fn build(self) -> Detection {
        let det = Detection::new(self.x1, self.y1, self.x2, self.y2, self.score).with_label(self.label);
        match self.detection_id {
            Some(id) => det.with_detection_id(id),
            None => det,
        }
    }
}
