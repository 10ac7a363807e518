//! Identity stabilization: per-frame assignment followed by gap filling.

use std::collections::BTreeMap;

use nalgebra::Point2;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::integration::{DetectionTable, StabilizedTable, TableSchema};
use crate::tracker::config::{MatchingStrategy, StabilizerConfig, UnobservedPolicy};
use crate::tracker::detection::Detection;
use crate::tracker::gap_fill::{self, FillKind, StabilizedRow};
use crate::tracker::identity_state::IdentityState;
use crate::tracker::matching::{self, AssignmentResult};
use crate::tracker::report::StabilizationReport;

/// Remove every detection of the feeder class. Row order is preserved.
pub fn filter_out_feeder(table: &DetectionTable, feeder_class_id: i64) -> DetectionTable {
    table.without_class(feeder_class_id)
}

/// Stabilize `table` into `num_objects` identities with default settings.
pub fn fix_ids(table: &DetectionTable, num_objects: usize) -> Result<StabilizedTable> {
    IdentityStabilizer::new(StabilizerConfig::new(num_objects))?.run(table)
}

/// Group detections by frame, ascending. Input order is kept within a frame.
pub fn group_by_frame(detections: Vec<Detection>) -> BTreeMap<u64, Vec<Detection>> {
    let mut frames: BTreeMap<u64, Vec<Detection>> = BTreeMap::new();
    for det in detections {
        frames.entry(det.frame_id).or_default().push(det);
    }
    frames
}

/// Outcome of assigning one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameAssignment {
    /// (identity index, detection) pairs, ordered by identity
    pub matched: Vec<(usize, Detection)>,
    /// Detections left without an identity
    pub dropped: usize,
}

/// Batch identity stabilizer.
///
/// Runs in two passes: [`assign_all_frames`](Self::assign_all_frames) walks
/// the frames in ascending order and labels detections, then
/// [`SparseAssignments::fill_gaps`] completes the grid.
#[derive(Debug, Clone)]
pub struct IdentityStabilizer {
    config: StabilizerConfig,
}

impl IdentityStabilizer {
    pub fn new(config: StabilizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    /// Assign, fill and assemble in one call.
    pub fn run(&self, table: &DetectionTable) -> Result<StabilizedTable> {
        Ok(self.assign_all_frames(table)?.fill_gaps()?.assemble())
    }

    /// First pass: filter the feeder class and assign identities frame by frame.
    pub fn assign_all_frames(&self, table: &DetectionTable) -> Result<SparseAssignments> {
        let num_objects = self.num_objects();
        let filtered = filter_out_feeder(table, self.config.feeder_class_id);

        let mut report = StabilizationReport {
            input_rows: table.len(),
            filtered_rows: table.len() - filtered.len(),
            ..Default::default()
        };

        // The range covers feeder-only frames too, so no input frame is lost.
        let frame_range = if filtered.is_empty() {
            None
        } else {
            table.frame_range()
        };

        let frames = group_by_frame(filtered.into_detections());
        report.frames_with_detections = frames.len();

        let mut state = IdentityState::new(num_objects);
        let mut tracks: Vec<Vec<Detection>> = vec![Vec::new(); num_objects as usize];

        for (frame_id, detections) in frames {
            let FrameAssignment { matched, dropped } =
                self.assign_frame(&mut state, frame_id, detections);

            if dropped > 0 {
                debug!(frame_id, dropped, "dropped detections without a free identity");
            }
            report.dropped_detections += dropped;
            report.assigned_detections += matched.len();

            for (index, det) in matched {
                tracks[index].push(det);
            }
        }

        Ok(SparseAssignments {
            num_objects: num_objects as usize,
            unobserved_policy: self.config.unobserved_policy,
            schema: table.schema().clone(),
            frame_range,
            tracks,
            report,
        })
    }

    /// Assign one frame's detections and record the matches in `state`.
    ///
    /// `detections` must be in input row order; equally good matches go to
    /// the lower identity and the earlier row.
    pub fn assign_frame(
        &self,
        state: &mut IdentityState,
        frame_id: u64,
        detections: Vec<Detection>,
    ) -> FrameAssignment {
        let num_detections = detections.len();
        let mut pending: Vec<Option<Detection>> = detections.into_iter().map(Some).collect();
        let mut pairs: Vec<(usize, usize)> = Vec::new();

        if !state.any_observed() {
            // No spatial prior yet: fill identities in input order.
            pairs.extend((0..state.len().min(num_detections)).map(|i| (i, i)));
        } else {
            let observed = state.observed_indices();
            let positions = state.positions(&observed);
            let centroids: Vec<Point2<f64>> = pending
                .iter()
                .flatten()
                .map(|d| d.position)
                .collect();
            let cost = matching::euclidean_distance(&positions, &centroids);

            let AssignmentResult {
                matches,
                unmatched_cols,
                ..
            } = self.solve(&cost, frame_id);

            pairs.extend(matches.into_iter().map(|(row, col)| (observed[row], col)));

            if self.config.activate_late_identities {
                let late = state.unobserved_indices().into_iter().zip(unmatched_cols);
                pairs.extend(late);
            }
        }

        pairs.sort_unstable();

        let mut matched = Vec::with_capacity(pairs.len());
        for (index, col) in pairs {
            if let Some(det) = pending[col].take() {
                state.record(index, det.position, frame_id);
                matched.push((index, det));
            }
        }

        FrameAssignment {
            dropped: num_detections - matched.len(),
            matched,
        }
    }

    fn solve(&self, cost: &ndarray::Array2<f64>, frame_id: u64) -> AssignmentResult {
        match self.config.matching {
            MatchingStrategy::Greedy => matching::greedy_assignment(cost),
            MatchingStrategy::Optimal => matching::linear_assignment(cost).unwrap_or_else(|| {
                warn!(frame_id, "linear assignment failed, falling back to greedy matching");
                matching::greedy_assignment(cost)
            }),
        }
    }

    fn num_objects(&self) -> u32 {
        // Bounded by validate().
        self.config.num_objects as u32
    }
}

/// Result of the assignment pass: per-identity observations, not yet dense.
#[derive(Debug, Clone)]
pub struct SparseAssignments {
    num_objects: usize,
    unobserved_policy: UnobservedPolicy,
    schema: TableSchema,
    frame_range: Option<(u64, u64)>,
    tracks: Vec<Vec<Detection>>,
    report: StabilizationReport,
}

impl SparseAssignments {
    pub fn num_objects(&self) -> usize {
        self.num_objects
    }

    /// Dense output range, `None` when no detection survived filtering.
    pub fn frame_range(&self) -> Option<(u64, u64)> {
        self.frame_range
    }

    /// Detections assigned to `stable_id`, ascending by frame.
    pub fn observations(&self, stable_id: u32) -> &[Detection] {
        (stable_id as usize)
            .checked_sub(1)
            .and_then(|i| self.tracks.get(i))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn report(&self) -> &StabilizationReport {
        &self.report
    }

    /// Second pass: fill every missing (frame, identity) cell.
    pub fn fill_gaps(self) -> Result<DenseTrajectories> {
        let Self {
            num_objects,
            unobserved_policy,
            schema,
            frame_range,
            tracks,
            mut report,
        } = self;

        let Some((first, last)) = frame_range else {
            info!("no detections after class filtering, returning an empty table");
            return Ok(DenseTrajectories {
                schema,
                rows: Vec::new(),
                report,
            });
        };

        report.frames_in_range = (last - first + 1) as usize;
        let extra_columns = schema.extra_columns().len();
        let mut rows = Vec::with_capacity(report.frames_in_range * num_objects);

        for (index, observations) in tracks.iter().enumerate() {
            let stable_id = index as u32 + 1;
            if observations.is_empty() {
                match unobserved_policy {
                    UnobservedPolicy::Fail => return Err(Error::UnobservedIdentity { stable_id }),
                    UnobservedPolicy::Placeholder => {
                        warn!(stable_id, "identity never observed, emitting NaN positions");
                        report.unobserved_identities.push(stable_id);
                        rows.extend(gap_fill::placeholder_rows(stable_id, first, last, extra_columns));
                    }
                }
                continue;
            }
            rows.extend(gap_fill::fill_identity(stable_id, observations, first, last));
        }

        gap_fill::check_density(&rows, num_objects, first, last)?;

        for row in &rows {
            match row.fill {
                FillKind::Observed => report.observed_cells += 1,
                FillKind::Interpolated => report.interpolated_cells += 1,
                FillKind::HeldBackward | FillKind::HeldForward => report.held_cells += 1,
                FillKind::Placeholder => report.placeholder_cells += 1,
            }
        }

        Ok(DenseTrajectories {
            schema,
            rows,
            report,
        })
    }
}

/// Result of the gap-filling pass: a complete grid, not yet ordered.
#[derive(Debug, Clone)]
pub struct DenseTrajectories {
    schema: TableSchema,
    rows: Vec<StabilizedRow>,
    report: StabilizationReport,
}

impl DenseTrajectories {
    /// Rows grouped by identity, each identity ascending by frame.
    pub fn rows(&self) -> &[StabilizedRow] {
        &self.rows
    }

    pub fn report(&self) -> &StabilizationReport {
        &self.report
    }

    /// Order the grid by `(frame_id, stable_id)`.
    pub fn assemble(self) -> StabilizedTable {
        info!(report = %self.report, "identity stabilization finished");
        if self.report.total_cells() > 0 && self.report.filled_cells() * 2 > self.report.total_cells() {
            warn!(
                filled = self.report.filled_cells(),
                total = self.report.total_cells(),
                "more than half of the output cells are filled, check num_objects"
            );
        }
        StabilizedTable::new(self.schema, self.rows, self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(frame_id: u64, x: f64, y: f64) -> Detection {
        Detection::new(frame_id, 2, x, y)
    }

    fn stabilizer(num_objects: usize) -> IdentityStabilizer {
        IdentityStabilizer::new(StabilizerConfig::new(num_objects)).unwrap()
    }

    #[test]
    fn test_first_frame_assigns_in_input_order() {
        let s = stabilizer(2);
        let mut state = IdentityState::new(2);
        let out = s.assign_frame(
            &mut state,
            0,
            vec![det(0, 5.0, 5.0), det(0, 1.0, 1.0), det(0, 9.0, 9.0)],
        );

        assert_eq!(out.dropped, 1);
        let labels: Vec<(usize, f64)> = out.matched.iter().map(|(i, d)| (*i, d.x())).collect();
        assert_eq!(labels, vec![(0, 5.0), (1, 1.0)]);
        assert_eq!(state.slot(1).unwrap().last_observed_frame, Some(0));
    }

    #[test]
    fn test_later_frames_match_by_distance() {
        let s = stabilizer(2);
        let mut state = IdentityState::new(2);
        s.assign_frame(&mut state, 0, vec![det(0, 0.0, 0.0), det(0, 10.0, 10.0)]);
        let out = s.assign_frame(&mut state, 1, vec![det(1, 9.0, 9.5), det(1, 0.5, 0.0)]);

        let labels: Vec<(usize, f64)> = out.matched.iter().map(|(i, d)| (*i, d.x())).collect();
        assert_eq!(labels, vec![(0, 0.5), (1, 9.0)]);
        assert_eq!(out.dropped, 0);
    }

    #[test]
    fn test_overflow_keeps_nearest() {
        let s = stabilizer(1);
        let mut state = IdentityState::new(1);
        s.assign_frame(&mut state, 0, vec![det(0, 0.0, 0.0)]);
        let out = s.assign_frame(&mut state, 1, vec![det(1, 50.0, 50.0), det(1, 1.0, 1.0)]);

        assert_eq!(out.dropped, 1);
        assert_eq!(out.matched[0].1.x(), 1.0);
        assert_eq!(
            state.slot(0).unwrap().last_known_position,
            Some(Point2::new(1.0, 1.0))
        );
    }

    #[test]
    fn test_unobserved_identity_stays_free_by_default() {
        let s = stabilizer(2);
        let mut state = IdentityState::new(2);
        s.assign_frame(&mut state, 0, vec![det(0, 0.0, 0.0)]);
        let out = s.assign_frame(&mut state, 1, vec![det(1, 0.0, 0.0), det(1, 30.0, 30.0)]);

        assert_eq!(out.matched.len(), 1);
        assert_eq!(out.dropped, 1);
        assert!(!state.slot(1).unwrap().is_observed());
    }

    #[test]
    fn test_late_activation() {
        let mut config = StabilizerConfig::new(3);
        config.activate_late_identities = true;
        let s = IdentityStabilizer::new(config).unwrap();
        let mut state = IdentityState::new(3);
        s.assign_frame(&mut state, 0, vec![det(0, 0.0, 0.0)]);
        let out = s.assign_frame(
            &mut state,
            1,
            vec![det(1, 40.0, 40.0), det(1, 0.0, 1.0), det(1, 20.0, 20.0)],
        );

        let labels: Vec<(usize, f64)> = out.matched.iter().map(|(i, d)| (*i, d.x())).collect();
        assert_eq!(labels, vec![(0, 0.0), (1, 40.0), (2, 20.0)]);
        assert_eq!(out.dropped, 0);
    }

    #[test]
    fn test_greedy_strategy() {
        let mut config = StabilizerConfig::new(2);
        config.matching = MatchingStrategy::Greedy;
        let s = IdentityStabilizer::new(config).unwrap();
        let mut state = IdentityState::new(2);
        s.assign_frame(&mut state, 0, vec![det(0, 0.0, 0.0), det(0, 10.0, 0.0)]);
        let out = s.assign_frame(&mut state, 1, vec![det(1, 10.0, 1.0), det(1, 0.0, 1.0)]);

        let labels: Vec<(usize, f64)> = out.matched.iter().map(|(i, d)| (*i, d.x())).collect();
        assert_eq!(labels, vec![(0, 0.0), (1, 10.0)]);
    }

    #[test]
    fn test_equidistant_detections_keep_earlier_row() {
        for matching in [MatchingStrategy::Optimal, MatchingStrategy::Greedy] {
            let mut config = StabilizerConfig::new(1);
            config.matching = matching;
            let s = IdentityStabilizer::new(config).unwrap();
            let mut state = IdentityState::new(1);
            s.assign_frame(&mut state, 0, vec![det(0, 0.0, 0.0)]);
            let out = s.assign_frame(&mut state, 1, vec![det(1, 1.0, 0.0), det(1, -1.0, 0.0)]);

            assert_eq!(out.matched[0].1.x(), 1.0, "{matching:?}");
            assert_eq!(out.dropped, 1);
        }
    }

    #[test]
    fn test_group_by_frame_orders_frames() {
        let frames = group_by_frame(vec![det(3, 0.0, 0.0), det(1, 1.0, 0.0), det(3, 2.0, 0.0)]);
        let keys: Vec<u64> = frames.keys().copied().collect();
        assert_eq!(keys, vec![1, 3]);
        assert_eq!(frames[&3][1].x(), 2.0);
    }

    #[test]
    fn test_sparse_then_dense() {
        let table = DetectionTable::new(vec![
            det(0, 0.0, 0.0),
            det(0, 10.0, 10.0),
            det(2, 2.0, 2.0),
            det(2, 10.0, 12.0),
        ]);
        let sparse = stabilizer(2).assign_all_frames(&table).unwrap();
        assert_eq!(sparse.frame_range(), Some((0, 2)));
        assert_eq!(sparse.observations(1).len(), 2);
        assert!(sparse.observations(3).is_empty());

        let dense = sparse.fill_gaps().unwrap();
        assert_eq!(dense.rows().len(), 6);
        assert_eq!(dense.report().interpolated_cells, 2);

        let table = dense.assemble();
        let mid = table.get(1, 2).unwrap();
        assert_eq!(mid.fill, FillKind::Interpolated);
        assert_eq!(mid.position, Point2::new(10.0, 11.0));
    }

    #[test]
    fn test_fail_policy() {
        let mut config = StabilizerConfig::new(3);
        config.unobserved_policy = UnobservedPolicy::Fail;
        let table = DetectionTable::new(vec![det(0, 0.0, 0.0), det(0, 1.0, 1.0)]);
        let err = IdentityStabilizer::new(config).unwrap().run(&table).unwrap_err();
        assert!(matches!(err, Error::UnobservedIdentity { stable_id: 3 }));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            IdentityStabilizer::new(StabilizerConfig::new(0)),
            Err(Error::InvalidConfig(_))
        ));
    }
}
