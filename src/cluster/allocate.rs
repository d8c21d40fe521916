use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::error::{Error, Result};

/// Returns the row indices of `mu` that take part in allocation.
///
/// With `suppress_zero` set, rows whose every coordinate is exactly zero are
/// treated as pruned clusters and left out; otherwise every row is active.
/// Indices are returned in ascending order.
pub fn active_centers(mu: ArrayView2<f64>, suppress_zero: bool) -> Vec<usize> {
    mu.outer_iter()
        .enumerate()
        .filter(|(_, row)| !suppress_zero || row.iter().any(|&v| v != 0.0))
        .map(|(i, _)| i)
        .collect()
}

/// Assigns every observation in `x` to its nearest center in `mu`.
///
/// Distances are Euclidean. Ties go to the lowest active row index. When fewer
/// than two centers are active, every observation is assigned to cluster `0`;
/// this single-cluster result is valid output, not a failure.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] when `x` and `mu` do not have the same
/// number of columns.
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use sparse_kmeans::allocate;
///
/// let x = array![[0.9, 1.1], [-1.0, -0.8], [1.2, 0.7]];
/// let mu = array![[1.0, 1.0], [0.0, 0.0], [-1.0, -1.0]];
///
/// let labels = allocate(x.view(), mu.view(), true).unwrap();
/// assert_eq!(labels.to_vec(), vec![0, 2, 0]);
/// ```
pub fn allocate(
    x: ArrayView2<f64>,
    mu: ArrayView2<f64>,
    suppress_zero: bool,
) -> Result<Array1<usize>> {
    if x.ncols() != mu.ncols() {
        return Err(Error::DimensionMismatch {
            expected: x.ncols(),
            found: mu.ncols(),
        });
    }
    Ok(assign(x, mu, suppress_zero))
}

/// Allocation without the shape check, for callers that own both matrices.
pub(crate) fn assign(
    x: ArrayView2<f64>,
    mu: ArrayView2<f64>,
    suppress_zero: bool,
) -> Array1<usize> {
    let active = active_centers(mu, suppress_zero);
    if active.len() < 2 {
        return Array1::zeros(x.nrows());
    }

    x.outer_iter()
        .map(|point| {
            let mut best = active[0];
            let mut best_dist = squared_distance(point, mu.row(best));
            for &c in &active[1..] {
                let dist = squared_distance(point, mu.row(c));
                if dist < best_dist {
                    best_dist = dist;
                    best = c;
                }
            }
            best
        })
        .collect()
}

/// Column indices holding at least one non-zero center coordinate.
///
/// A new matrix restricted to these columns can be allocated against the
/// matching columns of `mu` with the same result.
pub fn used_variables(mu: ArrayView2<f64>) -> Vec<usize> {
    mu.columns()
        .into_iter()
        .enumerate()
        .filter(|(_, col)| col.iter().any(|&v| v != 0.0))
        .map(|(j, _)| j)
        .collect()
}

/// Squared Euclidean distance between two points of the same dimension.
pub(crate) fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .fold(0.0, |acc, (&x, &y)| acc + (x - y).powi(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_nearest_center() {
        let x = array![[0.0, 0.1], [4.9, 5.2], [-5.0, -4.0]];
        let mu = array![[0.0, 0.0], [5.0, 5.0], [-5.0, -5.0]];
        let labels = allocate(x.view(), mu.view(), false).unwrap();
        assert_eq!(labels.to_vec(), vec![0, 1, 2]);
    }

    #[test]
    fn test_ties_go_to_lowest_index() {
        let x = array![[0.0, 0.0], [0.0, 3.0]];
        let mu = array![[1.0, 0.0], [-1.0, 0.0], [0.0, 1.0]];
        let labels = allocate(x.view(), mu.view(), false).unwrap();
        assert_eq!(labels[0], 0);
        assert_eq!(labels[1], 2);
    }

    #[test]
    fn test_suppression_skips_zero_rows() {
        // The zero row is nearest for every point but is pruned.
        let x = array![[0.1, 0.1], [-0.1, 0.0], [0.0, 0.2]];
        let mu = array![[0.0, 0.0], [3.0, 3.0], [-3.0, -3.0]];

        let unsuppressed = allocate(x.view(), mu.view(), false).unwrap();
        assert!(unsuppressed.iter().all(|&c| c == 0));

        let suppressed = allocate(x.view(), mu.view(), true).unwrap();
        let active = active_centers(mu.view(), true);
        assert_eq!(active, vec![1, 2]);
        assert!(suppressed.iter().all(|c| active.contains(c)));
        assert_eq!(suppressed.to_vec(), vec![1, 2, 1]);
    }

    #[test]
    fn test_degenerate_single_active_center() {
        let x = array![[10.0, 10.0], [-10.0, -10.0], [3.0, 0.0]];
        let mu = array![[0.0, 0.0], [10.0, 10.0], [0.0, 0.0]];
        let labels = allocate(x.view(), mu.view(), true).unwrap();
        assert_eq!(labels.to_vec(), vec![0, 0, 0]);

        let all_zero = array![[0.0, 0.0], [0.0, 0.0]];
        let labels = allocate(x.view(), all_zero.view(), true).unwrap();
        assert_eq!(labels.len(), 3);
        assert!(labels.iter().all(|&c| c == 0));
    }

    #[test]
    fn test_column_mismatch_is_an_error() {
        let x = array![[1.0, 2.0, 3.0]];
        let mu = array![[1.0, 2.0], [3.0, 4.0]];
        let err = allocate(x.view(), mu.view(), false).unwrap_err();
        assert_eq!(
            err,
            Error::DimensionMismatch {
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_used_variables() {
        let mu = array![[0.0, 1.5, 0.0, 0.0], [0.0, 0.0, 0.0, -2.0], [0.0, 0.0, 0.0, 0.0]];
        assert_eq!(used_variables(mu.view()), vec![1, 3]);
    }
}
