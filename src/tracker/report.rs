//! Diagnostic counters collected during a stabilization run.

use std::fmt;

/// Summary of what the stabilizer did to a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StabilizationReport {
    /// Rows in the input table
    pub input_rows: usize,
    /// Rows removed by the class filter
    pub filtered_rows: usize,
    /// Frames in the dense output range
    pub frames_in_range: usize,
    /// Frames with at least one non-feeder detection
    pub frames_with_detections: usize,
    /// Detections that received an identity
    pub assigned_detections: usize,
    /// Detections dropped because no identity was free for them
    pub dropped_detections: usize,
    /// Output cells taken from an assigned detection
    pub observed_cells: usize,
    /// Output cells linearly interpolated between observations
    pub interpolated_cells: usize,
    /// Output cells held from the nearest observation at either end
    pub held_cells: usize,
    /// Output cells of identities that were never observed
    pub placeholder_cells: usize,
    /// Identities that never received a detection
    pub unobserved_identities: Vec<u32>,
}

impl StabilizationReport {
    pub fn filled_cells(&self) -> usize {
        self.interpolated_cells + self.held_cells + self.placeholder_cells
    }

    pub fn total_cells(&self) -> usize {
        self.observed_cells + self.filled_cells()
    }
}

impl fmt::Display for StabilizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} input rows ({} filtered), {} frames ({} with detections), \
             {} assigned, {} dropped, {} of {} cells filled \
             ({} interpolated, {} held, {} placeholder)",
            self.input_rows,
            self.filtered_rows,
            self.frames_in_range,
            self.frames_with_detections,
            self.assigned_detections,
            self.dropped_detections,
            self.filled_cells(),
            self.total_cells(),
            self.interpolated_cells,
            self.held_cells,
            self.placeholder_cells,
        )?;
        if !self.unobserved_identities.is_empty() {
            write!(f, ", unobserved identities {:?}", self.unobserved_identities)?;
        }
        Ok(())
    }
}
