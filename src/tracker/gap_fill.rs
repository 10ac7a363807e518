//! Reconstruction of the dense (frame × identity) grid from sparse
//! per-identity observations.

use nalgebra::Point2;

use crate::error::{Error, Result};
use crate::tracker::detection::Detection;

/// Origin of a cell in the stabilized grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillKind {
    /// Taken from the detection assigned in this frame
    Observed,
    /// Linear in frame number between two observations
    Interpolated,
    /// Before the first observation, held at that observation
    HeldBackward,
    /// After the last observation, held at that observation
    HeldForward,
    /// Identity never observed; position is NaN
    Placeholder,
}

/// One output row: an identity's position in a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilizedRow {
    pub frame_id: u64,
    pub stable_id: u32,
    pub position: Point2<f64>,
    /// `None` only for placeholder rows
    pub class_id: Option<i64>,
    /// Passthrough values, aligned with the table's extra columns
    pub extras: Vec<String>,
    pub fill: FillKind,
}

impl StabilizedRow {
    fn from_detection(det: &Detection, frame_id: u64, stable_id: u32, fill: FillKind) -> Self {
        Self {
            frame_id,
            stable_id,
            position: det.position,
            class_id: Some(det.class_id),
            extras: det.extras.clone(),
            fill,
        }
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.position.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn is_filled(&self) -> bool {
        self.fill != FillKind::Observed
    }
}

/// Fill every frame in `first..=last` for one identity.
///
/// `observations` must be sorted by frame, at most one per frame, and lie
/// inside the range. Interior gaps copy class and passthrough values from the
/// earlier bounding observation.
pub fn fill_identity(
    stable_id: u32,
    observations: &[Detection],
    first: u64,
    last: u64,
) -> Vec<StabilizedRow> {
    let Some((head, tail)) = observations.first().zip(observations.last()) else {
        return Vec::new();
    };

    let mut rows = Vec::with_capacity((last - first + 1) as usize);
    let mut next = 0;

    for frame_id in first..=last {
        let row = if next < observations.len() && observations[next].frame_id == frame_id {
            next += 1;
            StabilizedRow::from_detection(
                &observations[next - 1],
                frame_id,
                stable_id,
                FillKind::Observed,
            )
        } else if next == 0 {
            StabilizedRow::from_detection(head, frame_id, stable_id, FillKind::HeldBackward)
        } else if next == observations.len() {
            StabilizedRow::from_detection(tail, frame_id, stable_id, FillKind::HeldForward)
        } else {
            let before = &observations[next - 1];
            let after = &observations[next];
            let mut row =
                StabilizedRow::from_detection(before, frame_id, stable_id, FillKind::Interpolated);
            row.position = interpolate(before, after, frame_id);
            row
        };
        rows.push(row);
    }

    rows
}

/// Rows for an identity with no observations at all.
pub fn placeholder_rows(stable_id: u32, first: u64, last: u64, extra_columns: usize) -> Vec<StabilizedRow> {
    (first..=last)
        .map(|frame_id| StabilizedRow {
            frame_id,
            stable_id,
            position: Point2::new(f64::NAN, f64::NAN),
            class_id: None,
            extras: vec![String::new(); extra_columns],
            fill: FillKind::Placeholder,
        })
        .collect()
}

fn interpolate(before: &Detection, after: &Detection, frame_id: u64) -> Point2<f64> {
    let span = (after.frame_id - before.frame_id) as f64;
    let t = (frame_id - before.frame_id) as f64 / span;
    before.position + (after.position - before.position) * t
}

/// Check that every frame in `first..=last` holds each identity exactly once.
pub fn check_density(rows: &[StabilizedRow], num_objects: usize, first: u64, last: u64) -> Result<()> {
    let frames = (last - first + 1) as usize;
    let mut counts = vec![0usize; frames];
    let mut seen = vec![false; frames * num_objects];

    for row in rows {
        let in_range = row.frame_id >= first && row.frame_id <= last;
        let valid_id = row.stable_id >= 1 && (row.stable_id as usize) <= num_objects;
        if !in_range || !valid_id {
            return Err(Error::DensityViolation {
                frame_id: row.frame_id,
                found: usize::MAX,
                expected: num_objects,
            });
        }
        let frame = (row.frame_id - first) as usize;
        let cell = frame * num_objects + row.stable_id as usize - 1;
        counts[frame] += 1;
        if seen[cell] {
            return Err(Error::DensityViolation {
                frame_id: row.frame_id,
                found: counts[frame],
                expected: num_objects,
            });
        }
        seen[cell] = true;
    }

    match counts.iter().position(|&c| c != num_objects) {
        Some(frame) => Err(Error::DensityViolation {
            frame_id: first + frame as u64,
            found: counts[frame],
            expected: num_objects,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(frame_id: u64, x: f64, y: f64) -> Detection {
        Detection::new(frame_id, 2, x, y)
    }

    #[test]
    fn test_interior_gap_is_linear_in_frames() {
        let observations = vec![obs(0, 0.0, 0.0), obs(4, 8.0, -4.0)];
        let rows = fill_identity(1, &observations, 0, 4);

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].fill, FillKind::Observed);
        assert_eq!(rows[4].fill, FillKind::Observed);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.frame_id, i as u64);
            assert!((row.x() - 2.0 * i as f64).abs() < 1e-12);
            assert!((row.y() + i as f64).abs() < 1e-12);
        }
        assert_eq!(rows[2].fill, FillKind::Interpolated);
    }

    #[test]
    fn test_edges_are_held() {
        let observations = vec![obs(2, 1.0, 1.0), obs(3, 5.0, 5.0)];
        let rows = fill_identity(3, &observations, 0, 5);

        let kinds: Vec<FillKind> = rows.iter().map(|r| r.fill).collect();
        assert_eq!(
            kinds,
            vec![
                FillKind::HeldBackward,
                FillKind::HeldBackward,
                FillKind::Observed,
                FillKind::Observed,
                FillKind::HeldForward,
                FillKind::HeldForward,
            ]
        );
        assert_eq!(rows[0].position, Point2::new(1.0, 1.0));
        assert_eq!(rows[5].position, Point2::new(5.0, 5.0));
        assert!(rows.iter().all(|r| r.stable_id == 3));
    }

    #[test]
    fn test_interior_fill_copies_earlier_passthrough() {
        let observations = vec![
            obs(0, 0.0, 0.0).with_extras(vec!["a".into()]),
            obs(2, 2.0, 2.0).with_extras(vec!["b".into()]),
        ];
        let rows = fill_identity(1, &observations, 0, 2);
        assert_eq!(rows[1].extras, vec!["a".to_string()]);
        assert_eq!(rows[1].class_id, Some(2));
    }

    #[test]
    fn test_placeholder_rows() {
        let rows = placeholder_rows(2, 10, 12, 1);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.x().is_nan() && r.y().is_nan()));
        assert!(rows.iter().all(|r| r.class_id.is_none() && r.extras == vec![String::new()]));
    }

    #[test]
    fn test_check_density() {
        let mut rows = fill_identity(1, &[obs(0, 0.0, 0.0)], 0, 2);
        rows.extend(fill_identity(2, &[obs(1, 1.0, 1.0)], 0, 2));
        assert!(check_density(&rows, 2, 0, 2).is_ok());

        rows.pop();
        let err = check_density(&rows, 2, 0, 2).unwrap_err();
        assert!(matches!(
            err,
            Error::DensityViolation { frame_id: 2, found: 1, expected: 2 }
        ));

        let mut duplicated = fill_identity(1, &[obs(0, 0.0, 0.0)], 0, 0);
        duplicated.extend(fill_identity(1, &[obs(0, 0.0, 0.0)], 0, 0));
        assert!(check_density(&duplicated, 2, 0, 0).is_err());
    }
}
