//! Detection rows consumed by the stabilizer.

use nalgebra::Point2;

/// One detector output row: a centroid observed in a frame.
///
/// Detections carry no cross-frame identity. The `row` index records the
/// position of the detection in its source table and is used only as a
/// deterministic tie-break.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Frame ordering key
    pub frame_id: u64,
    /// Detector class label
    pub class_id: i64,
    /// Centroid in image coordinates
    pub position: Point2<f64>,
    /// Row index in the source table
    pub row: usize,
    /// Passthrough values, aligned with the table's extra columns
    pub extras: Vec<String>,
}

impl Detection {
    pub fn new(frame_id: u64, class_id: i64, x: f64, y: f64) -> Self {
        Self {
            frame_id,
            class_id,
            position: Point2::new(x, y),
            row: 0,
            extras: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = row;
        self
    }

    pub fn with_extras(mut self, extras: Vec<String>) -> Self {
        self.extras = extras;
        self
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.position.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.position.y
    }
}
