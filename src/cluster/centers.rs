use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::cluster::allocate::squared_distance;
use crate::error::{Error, Result};

/// Recomputes the `k` cluster centers with soft-threshold shrinkage.
///
/// For each cluster and coordinate, with `s` the sum of the assigned values
/// and `m` their count, the new coordinate is
/// `min((s + reg/2) / m, max((s - reg/2) / m, 0))`: the plain mean pulled
/// toward zero by `reg / (2m)` and clamped to exactly zero when it would cross
/// it. This is what makes per-cluster variables sparse.
///
/// A cluster with no assigned observations gets an all-zero row, which marks
/// it as pruned for zero-suppressed allocation.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if `assignment` does not have one entry per row of `x`.
/// - [`Error::InvalidArgument`] if a label is not below `k`, or `regularization`
///   is negative or not finite.
pub fn estimate_centers(
    x: ArrayView2<f64>,
    assignment: ArrayView1<usize>,
    k: usize,
    regularization: f64,
) -> Result<Array2<f64>> {
    check_assignment(x, assignment, k)?;
    if !regularization.is_finite() || regularization < 0.0 {
        return Err(Error::invalid(format!(
            "regularization must be finite and non-negative, got {}",
            regularization
        )));
    }
    Ok(shrink_centers(x, assignment, k, regularization))
}

pub(crate) fn shrink_centers(
    x: ArrayView2<f64>,
    assignment: ArrayView1<usize>,
    k: usize,
    regularization: f64,
) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros((k, x.ncols()));
    let mut counts = vec![0_usize; k];
    for (point, &c) in x.outer_iter().zip(assignment.iter()) {
        let mut sum = sums.row_mut(c);
        sum += &point;
        counts[c] += 1;
    }

    let half = regularization / 2.0;
    for (mut row, &count) in sums.outer_iter_mut().zip(counts.iter()) {
        if count == 0 {
            row.fill(0.0);
            continue;
        }
        let m = count as f64;
        row.mapv_inplace(|s| {
            let plus = (s - half) / m;
            let minus = (s + half) / m;
            minus.min(plus.max(0.0))
        });
    }
    sums
}

/// The fit norm of a clustering: the sum of squared distances from each
/// observation to its assigned center plus `regularization` times the sum of
/// absolute center coordinates.
///
/// # Errors
///
/// Fails on the same shape and label checks as [`estimate_centers`], and when
/// `centers` and `x` disagree on the column count.
pub fn objective(
    x: ArrayView2<f64>,
    centers: ArrayView2<f64>,
    assignment: ArrayView1<usize>,
    regularization: f64,
) -> Result<f64> {
    if centers.ncols() != x.ncols() {
        return Err(Error::DimensionMismatch {
            expected: x.ncols(),
            found: centers.ncols(),
        });
    }
    check_assignment(x, assignment, centers.nrows())?;
    Ok(fit_norm(x, centers, assignment, regularization))
}

pub(crate) fn fit_norm(
    x: ArrayView2<f64>,
    centers: ArrayView2<f64>,
    assignment: ArrayView1<usize>,
    regularization: f64,
) -> f64 {
    let within: f64 = x
        .outer_iter()
        .zip(assignment.iter())
        .map(|(point, &c)| squared_distance(point, centers.row(c)))
        .sum();
    let magnitude: f64 = centers.iter().map(|v| v.abs()).sum();
    within + regularization * magnitude
}

/// Number of distinct clusters referenced by `assignment`, counting only
/// labels below `k`.
pub fn used_clusters(assignment: ArrayView1<usize>, k: usize) -> usize {
    let mut seen = vec![false; k];
    for &c in assignment.iter() {
        if let Some(slot) = seen.get_mut(c) {
            *slot = true;
        }
    }
    seen.into_iter().filter(|&s| s).count()
}

fn check_assignment(x: ArrayView2<f64>, assignment: ArrayView1<usize>, k: usize) -> Result<()> {
    if assignment.len() != x.nrows() {
        return Err(Error::DimensionMismatch {
            expected: x.nrows(),
            found: assignment.len(),
        });
    }
    if let Some(&label) = assignment.iter().find(|&&c| c >= k) {
        return Err(Error::invalid(format!(
            "cluster label {} out of range for {} clusters",
            label, k
        )));
    }
    Ok(())
}
