//! Matching utilities for identity assignment.

use nalgebra::{Point2, distance};
use ndarray::Array2;

/// Compute the Euclidean distance matrix between identity positions (rows)
/// and detection centroids (columns).
pub fn euclidean_distance(positions: &[Point2<f64>], detections: &[Point2<f64>]) -> Array2<f64> {
    let mut dists = Array2::zeros((positions.len(), detections.len()));
    for (i, p) in positions.iter().enumerate() {
        for (j, d) in detections.iter().enumerate() {
            dists[[i, j]] = distance(p, d);
        }
    }
    dists
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentResult {
    /// (row, column) pairs, sorted by row
    pub matches: Vec<(usize, usize)>,
    pub unmatched_rows: Vec<usize>,
    pub unmatched_cols: Vec<usize>,
}

impl AssignmentResult {
    fn from_matches(mut matches: Vec<(usize, usize)>, num_rows: usize, num_cols: usize) -> Self {
        matches.sort_unstable();
        let mut row_free = vec![true; num_rows];
        let mut col_free = vec![true; num_cols];
        for &(r, c) in &matches {
            row_free[r] = false;
            col_free[c] = false;
        }
        Self {
            matches,
            unmatched_rows: free_indices(&row_free),
            unmatched_cols: free_indices(&col_free),
        }
    }
}

fn free_indices(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(i, &u)| if u { Some(i) } else { None })
        .collect()
}

/// Minimum total cost one-to-one assignment (Jonker-Volgenant).
///
/// The cost matrix is padded to a square with a cost larger than any real
/// entry, so at most `min(rows, cols)` real pairs are matched and the
/// remainder is reported unmatched. Returns `None` if the solver fails.
///
/// When several assignments reach the minimum total (within a relative
/// `1e-9`), the one that is smallest by (row, column) wins: row 0 takes the
/// lowest column any optimal assignment gives it, then row 1, and so on. A
/// matched row is preferred over an unmatched one.
pub fn linear_assignment(cost_matrix: &Array2<f64>) -> Option<AssignmentResult> {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return Some(AssignmentResult::from_matches(vec![], num_rows, num_cols));
    }

    let max_cost = cost_matrix.iter().copied().fold(0.0_f64, f64::max);
    let pad = max_cost * 2.0 + 1.0;

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), pad);
    for i in 0..num_rows {
        for j in 0..num_cols {
            padded[[i, j]] = cost_matrix[[i, j]];
        }
    }

    let mut row_to_col = solve_square(&padded)?;
    let optimum = permutation_cost(&padded, &row_to_col);
    let tolerance = 1e-9 * optimum.abs().max(1.0);
    // Any assignment using a forbidden cell costs more than every real one.
    let forbidden = pad * (size as f64 + 1.0);

    for row in 0..num_rows {
        for col in 0..row_to_col[row].min(num_cols) {
            let mut forced = padded.clone();
            pin(&mut forced, row, col, forbidden);
            let candidate = solve_square(&forced)?;
            if permutation_cost(&forced, &candidate) <= optimum + tolerance {
                row_to_col = candidate;
                break;
            }
        }
        pin(&mut padded, row, row_to_col[row], forbidden);
    }

    let matches = row_to_col
        .iter()
        .enumerate()
        .filter(|&(row, &col)| row < num_rows && col < num_cols)
        .map(|(row, &col)| (row, col))
        .collect();

    Some(AssignmentResult::from_matches(matches, num_rows, num_cols))
}

fn solve_square(cost: &Array2<f64>) -> Option<Vec<usize>> {
    lapjv::lapjv(cost).ok().map(|(row_to_col, _)| row_to_col)
}

fn permutation_cost(cost: &Array2<f64>, row_to_col: &[usize]) -> f64 {
    row_to_col
        .iter()
        .enumerate()
        .map(|(row, &col)| cost[[row, col]])
        .sum()
}

/// Restrict `row` to `col` and `col` to `row`.
fn pin(cost: &mut Array2<f64>, row: usize, col: usize, forbidden: f64) {
    let kept = cost[[row, col]];
    cost.row_mut(row).fill(forbidden);
    cost.column_mut(col).fill(forbidden);
    cost[[row, col]] = kept;
}

/// Greedy nearest-neighbour assignment.
///
/// Candidate pairs are visited by ascending cost, ties broken by row then
/// column index; a pair is accepted when neither side is already claimed.
pub fn greedy_assignment(cost_matrix: &Array2<f64>) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    let mut pairs: Vec<(f64, usize, usize)> = cost_matrix
        .indexed_iter()
        .map(|((i, j), &c)| (c, i, j))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut used_rows = vec![false; num_rows];
    let mut used_cols = vec![false; num_cols];
    let mut matches = Vec::new();

    for (_cost, row, col) in pairs {
        if used_rows[row] || used_cols[col] {
            continue;
        }
        used_rows[row] = true;
        used_cols[col] = true;
        matches.push((row, col));
    }

    AssignmentResult::from_matches(matches, num_rows, num_cols)
}

/// Sum of the costs of the matched pairs.
pub fn total_cost(cost_matrix: &Array2<f64>, result: &AssignmentResult) -> f64 {
    result.matches.iter().map(|&(r, c)| cost_matrix[[r, c]]).sum()
}
