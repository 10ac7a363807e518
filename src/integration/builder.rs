//! Builder for creating Detection objects from various box formats.

use crate::tracker::Detection;

/// Builder for creating `Detection` objects from detector outputs.
///
/// Box formats are reduced to their centroid, which is all the stabilizer
/// uses.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    frame_id: u64,
    class_id: i64,
    cx: f64,
    cy: f64,
    extras: Vec<String>,
}

impl DetectionBuilder {
    /// Create a new detection builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the frame index.
    pub fn frame(mut self, frame_id: u64) -> Self {
        self.frame_id = frame_id;
        self
    }

    /// Set the detector class label.
    pub fn class(mut self, class_id: i64) -> Self {
        self.class_id = class_id;
        self
    }

    /// Set the centroid directly.
    pub fn centroid(mut self, x: f64, y: f64) -> Self {
        self.cx = x;
        self.cy = y;
        self
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        self.cx = (x1 + x2) / 2.0;
        self.cy = (y1 + y2) / 2.0;
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f64, cy: f64, _w: f64, _h: f64) -> Self {
        self.cx = cx;
        self.cy = cy;
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, l: f64, t: f64, w: f64, h: f64) -> Self {
        self.cx = l + w / 2.0;
        self.cy = t + h / 2.0;
        self
    }

    /// Append a passthrough value.
    pub fn extra(mut self, value: impl Into<String>) -> Self {
        self.extras.push(value.into());
        self
    }

    /// Build the final `Detection`.
    pub fn build(self) -> Detection {
        Detection::new(self.frame_id, self.class_id, self.cx, self.cy).with_extras(self.extras)
    }
}
