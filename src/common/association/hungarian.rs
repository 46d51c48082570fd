//! Hungarian algorithm for optimal assignment
//!
//! Implements the Kuhn-Munkres algorithm (shortest augmenting path with
//! dual potentials) for minimum cost assignment in a bipartite graph.
//! Runs in O(n³) for an `n × n` problem; rectangular inputs are padded.
//!
//! Entries equal to `f64::INFINITY` (or NaN) mark forbidden pairs. The
//! solver returns the assignment with the largest number of allowed pairs
//! and, among those, the smallest total cost. Forbidden pairs never appear
//! in the result.

use nalgebra::DMatrix;

/// Hungarian algorithm result
#[derive(Debug, Clone, PartialEq)]
pub struct HungarianResult {
    /// `assignment[row] = Some(col)` when the row is matched
    pub assignment: Vec<Option<usize>>,
    /// Total cost of the matched pairs
    pub cost: f64,
}

impl HungarianResult {
    /// Result with every row unmatched.
    pub fn unmatched(rows: usize) -> Self {
        Self {
            assignment: vec![None; rows],
            cost: 0.0,
        }
    }

    /// Number of matched pairs
    pub fn num_assigned(&self) -> usize {
        self.assignment.iter().filter(|a| a.is_some()).count()
    }

    /// Iterate over matched `(row, col)` pairs in row order
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.assignment
            .iter()
            .enumerate()
            .filter_map(|(row, col)| col.map(|c| (row, c)))
    }

    /// Column assigned to each column index, inverted: `result[col] = Some(row)`.
    pub fn column_assignment(&self, cols: usize) -> Vec<Option<usize>> {
        let mut inverse = vec![None; cols];
        for (row, col) in self.pairs() {
            inverse[col] = Some(row);
        }
        inverse
    }
}

/// Hungarian algorithm for optimal assignment
///
/// # Arguments
/// * `perf` - Cost matrix (rows × cols). Use `f64::INFINITY` for impossible assignments.
///
/// # Returns
/// [`HungarianResult`] with the row-to-column mapping and total cost.
pub fn hungarian(perf: &DMatrix<f64>) -> HungarianResult {
    let rows = perf.nrows();
    let cols = perf.ncols();

    let allowed = |v: f64| v.is_finite();
    let max_finite = perf
        .iter()
        .cloned()
        .filter(|&v| allowed(v))
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
    let min_finite = perf
        .iter()
        .cloned()
        .filter(|&v| allowed(v))
        .fold(f64::INFINITY, f64::min);

    let max_finite = match max_finite {
        Some(v) => v,
        None => return HungarianResult::unmatched(rows),
    };

    // Shift so all allowed costs are non-negative, then pick a forbidden cost
    // larger than any sum of allowed costs so cardinality dominates.
    let shift = if min_finite < 0.0 { -min_finite } else { 0.0 };
    let k = rows.min(cols) as f64;
    let forbidden = (k + 1.0) * (max_finite + shift).max(1.0) + 1.0;

    let n = rows.max(cols);
    let mut square = DMatrix::from_element(n, n, 0.0);
    for i in 0..rows {
        for j in 0..cols {
            let v = perf[(i, j)];
            square[(i, j)] = if allowed(v) { v + shift } else { forbidden };
        }
    }

    let row_to_col = solve_square(&square);

    let mut assignment = vec![None; rows];
    let mut cost = 0.0;
    for (i, &j) in row_to_col.iter().enumerate().take(rows) {
        if j < cols && allowed(perf[(i, j)]) {
            assignment[i] = Some(j);
            cost += perf[(i, j)];
        }
    }

    HungarianResult { assignment, cost }
}

/// Shortest augmenting path Hungarian on a finite square matrix.
///
/// Returns the column assigned to each row. Ties are resolved towards the
/// lowest column index, so the result is a pure function of the input.
fn solve_square(a: &DMatrix<f64>) -> Vec<usize> {
    let n = a.nrows();
    // 1-based arrays; index 0 is the virtual source column
    let mut u = vec![0.0; n + 1];
    let mut v = vec![0.0; n + 1];
    let mut p = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;

            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let cur = a[(i0 - 1, j - 1)] - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        // Augment along the alternating path
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut row_to_col = vec![0usize; n];
    for j in 1..=n {
        if p[j] != 0 {
            row_to_col[p[j] - 1] = j - 1;
        }
    }
    row_to_col
}
