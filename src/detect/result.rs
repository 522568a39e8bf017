use serde::{Deserialize, Serialize};

/// One labeled detection produced by a model for a single frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label as named by the model taxonomy (e.g. "closed eyes").
    pub label: String,
    /// Confidence in 0..=1.
    pub confidence: f32,
    /// Box in frame pixel coordinates.
    #[serde(default)]
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox: BoundingBox::default(),
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = bbox;
        self
    }
}

/// Axis-aligned box, top-left origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Clip the box to a `width` x `height` frame.
    pub fn clamp_to(self, width: u32, height: u32) -> Self {
        let (fw, fh) = (width as f32, height as f32);
        let x = self.x.clamp(0.0, fw);
        let y = self.y.clamp(0.0, fh);
        let right = (self.x + self.w).clamp(0.0, fw);
        let bottom = (self.y + self.h).clamp(0.0, fh);
        Self {
            x,
            y,
            w: (right - x).max(0.0),
            h: (bottom - y).max(0.0),
        }
    }

    pub fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    /// Intersection over union; 0 when either box is empty.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.w).min(other.x + other.w);
        let bottom = (self.y + self.h).min(other.y + other.h);
        let intersection = (right - left).max(0.0) * (bottom - top).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// Greedy non-maximum suppression within each label.
///
/// Keeps the most confident detection and drops any later detection of the
/// same label whose box overlaps a kept one by more than `iou_threshold`.
/// The result is ordered by descending confidence.
pub fn non_max_suppression(detections: &mut Vec<Detection>, iou_threshold: f32) {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept = 0;
    for index in 0..detections.len() {
        let overlaps = (0..kept).any(|prev| {
            detections[prev].label == detections[index].label
                && detections[prev].bbox.iou(&detections[index].bbox) > iou_threshold
        });
        if !overlaps {
            detections.swap(kept, index);
            kept += 1;
        }
    }
    detections.truncate(kept);
}
