//! Rectangular, cost-limited front-end to the `lapjv` solver.
//!
//! [`lapjv`] reduces a rectangular cost matrix with an optional cost limit to
//! a square problem: the matrix is extended to `(rows + cols) x (rows + cols)`,
//! every real row gets a private dummy column and every real column a private
//! dummy row, so leaving an index unmatched costs `cost_limit / 2` on each
//! side. A real pairing is therefore only preferred while its cost stays
//! below the limit.

use log::warn;
use ndarray::Array2;

/// Solve a rectangular assignment problem.
///
/// Returns `row_to_col` over the unpadded indices. Without a `cost_limit` a
/// square matrix is solved as-is; a rectangular one is padded with
/// `max(cost) + 1`. With a limit, padding cells cost `cost_limit / 2`.
/// Non-finite costs are treated as the padding value.
pub fn lapjv(cost: &Array2<f32>, cost_limit: Option<f32>) -> Vec<Option<usize>> {
    let (rows, cols) = cost.dim();
    if rows == 0 || cols == 0 {
        return vec![None; rows];
    }

    let pad = match cost_limit {
        Some(limit) => f64::from(limit) / 2.0,
        None => {
            let max = cost
                .iter()
                .copied()
                .filter(|c| c.is_finite())
                .fold(f32::NEG_INFINITY, f32::max);
            let max = if max.is_finite() { max } else { 0.0 };
            f64::from(max) + 1.0
        }
    };
    let sanitize = |c: f32| if c.is_finite() { f64::from(c) } else { pad };

    let extend = rows != cols || cost_limit.is_some();
    let n = if extend { rows + cols } else { rows };

    let mut square = Array2::<f64>::from_elem((n, n), pad);
    if extend {
        for i in rows..n {
            for j in cols..n {
                square[[i, j]] = 0.0;
            }
        }
    }
    for ((i, j), &c) in cost.indexed_iter() {
        square[[i, j]] = sanitize(c);
    }

    match ::lapjv::lapjv(&square) {
        Ok((row_to_col, _)) => row_to_col
            .into_iter()
            .take(rows)
            .map(|j| (j < cols).then_some(j))
            .collect(),
        Err(err) => {
            warn!("lapjv failed on a {n}x{n} cost matrix, leaving all rows unmatched: {err:?}");
            vec![None; rows]
        }
    }
}
