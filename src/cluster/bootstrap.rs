use ndarray::{Array2, ArrayView2, Axis};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::error::{Error, Result};

/// Draws `samples` rows from `x` uniformly and independently, with
/// replacement. The result keeps the column count of `x`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] when rows are requested from a matrix
/// that has none.
pub fn bootstrap<R: Rng + ?Sized>(
    x: ArrayView2<f64>,
    samples: usize,
    rng: &mut R,
) -> Result<Array2<f64>> {
    let n = x.nrows();
    if samples == 0 {
        return Ok(Array2::zeros((0, x.ncols())));
    }
    if n == 0 {
        return Err(Error::invalid("cannot resample an empty matrix"));
    }

    let rows = Uniform::from(0..n);
    let indices: Vec<usize> = (0..samples).map(|_| rows.sample(rng)).collect();
    Ok(x.select(Axis(0), &indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_bootstrap_shape_and_rows() {
        let x = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let sample = bootstrap(x.view(), 10, &mut rng).unwrap();

        assert_eq!(sample.dim(), (10, 3));
        for row in sample.outer_iter() {
            assert!(x.outer_iter().any(|orig| orig == row));
        }
    }

    #[test]
    fn test_bootstrap_draws_with_replacement() {
        let x = array![[0.0], [1.0]];
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let sample = bootstrap(x.view(), 200, &mut rng).unwrap();
        let ones = sample.iter().filter(|&&v| v == 1.0).count();
        assert!(ones > 60 && ones < 140, "ones = {}", ones);
    }

    #[test]
    fn test_bootstrap_reproducible() {
        let x = array![[1.0, -1.0], [2.0, -2.0], [3.0, -3.0], [4.0, -4.0]];
        let a = bootstrap(x.view(), 6, &mut ChaCha20Rng::seed_from_u64(7)).unwrap();
        let b = bootstrap(x.view(), 6, &mut ChaCha20Rng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bootstrap_empty_inputs() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let empty = Array2::<f64>::zeros((0, 4));
        assert!(bootstrap(empty.view(), 5, &mut rng).is_err());
        assert_eq!(bootstrap(empty.view(), 0, &mut rng).unwrap().dim(), (0, 4));

        let x = array![[1.0, 2.0]];
        assert_eq!(bootstrap(x.view(), 0, &mut rng).unwrap().dim(), (0, 2));
    }
}
