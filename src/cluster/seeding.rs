use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;

use crate::cluster::allocate::squared_distance;
use crate::error::{Error, Result};

/// Picks an index with probability proportional to its weight.
///
/// Uses cumulative-weight inversion: draws `r` uniformly in `[0, total)` and
/// returns the first index whose running sum of positive weights exceeds `r`.
/// Non-positive (and NaN) weights are never selected while any positive weight
/// exists. If none is positive, the last index is returned.
///
/// Returns `None` only for an empty weight vector.
pub fn sample_weighted<R: Rng + ?Sized>(weights: ArrayView1<f64>, rng: &mut R) -> Option<usize> {
    let len = weights.len();
    if len == 0 {
        return None;
    }

    let total: f64 = weights.iter().filter(|&&w| w > 0.0).sum();
    let mut last_positive = None;
    if total > 0.0 {
        let r = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        for (i, &w) in weights.iter().enumerate() {
            if w > 0.0 {
                cumulative += w;
                if cumulative > r {
                    return Some(i);
                }
                last_positive = Some(i);
            }
        }
    }
    Some(last_positive.unwrap_or(len - 1))
}

/// Chooses `k` initial centers from the rows of `x`.
///
/// The first center is a uniformly random row. Each following center is drawn
/// with probability proportional to the squared distance from a row to its
/// nearest already-chosen center, so the seeds spread across the data. Every
/// center is a copy of an actual observation.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `x` has no rows or `k` is zero.
pub fn initialize_centers<R: Rng + ?Sized>(
    x: ArrayView2<f64>,
    k: usize,
    rng: &mut R,
) -> Result<Array2<f64>> {
    let n = x.nrows();
    if n == 0 {
        return Err(Error::invalid("cannot seed centers from an empty matrix"));
    }
    if k == 0 {
        return Err(Error::invalid("number of centers must be positive"));
    }

    let mut centers = Array2::zeros((k, x.ncols()));
    let first = rng.gen_range(0..n);
    centers.row_mut(0).assign(&x.row(first));

    let mut nearest: Array1<f64> = x
        .outer_iter()
        .map(|row| squared_distance(row, centers.row(0)))
        .collect();

    for c in 1..k {
        let idx = sample_weighted(nearest.view(), rng).unwrap_or(n - 1);
        centers.row_mut(c).assign(&x.row(idx));

        if c + 1 < k {
            for (row, d) in x.outer_iter().zip(nearest.iter_mut()) {
                let dist = squared_distance(row, centers.row(c));
                if dist < *d {
                    *d = dist;
                }
            }
        }
    }

    Ok(centers)
}
