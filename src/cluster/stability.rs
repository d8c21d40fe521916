//! Chance-corrected agreement between two partitions of the same data.
//!
//! [`stability`] estimates the adjusted Rand index by sampling random pairs of
//! observations instead of visiting all `n(n-1)/2` of them, so its cost does
//! not grow with `n`. [`adjusted_rand_index`] computes the exact value from
//! the contingency table and is what the estimate converges to.

use ndarray::ArrayView1;
use rand::Rng;

use crate::error::{Error, Result};

/// Number of observation pairs sampled by [`stability`].
pub const DEFAULT_STABILITY_SAMPLES: usize = 10_000;

/// Monte Carlo adjusted Rand index between `c1` and `c2` using
/// [`DEFAULT_STABILITY_SAMPLES`] pairs.
///
/// Scores lie roughly in `[-1, 1]`: `1` means the partitions agree on every
/// pair, values near `0` mean agreement no better than chance.
///
/// # Errors
///
/// See [`stability_with_samples`].
pub fn stability<R: Rng + ?Sized>(
    c1: ArrayView1<usize>,
    c2: ArrayView1<usize>,
    k: usize,
    rng: &mut R,
) -> Result<f64> {
    stability_with_samples(c1, c2, k, DEFAULT_STABILITY_SAMPLES, rng)
}

/// Monte Carlo adjusted Rand index with an explicit pair count.
///
/// Draws `samples` pairs of distinct observations and counts the concordant
/// ones (together in both partitions, or apart in both). The observed
/// concordance is then corrected by the agreement expected from the two
/// cluster-size distributions alone. When that expected agreement is `1`
/// (both partitions trivial in the same way) the score is `1`.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if `c1` and `c2` differ in length.
/// - [`Error::InvalidArgument`] for fewer than two observations, zero
///   `samples`, or a label not below `k`.
pub fn stability_with_samples<R: Rng + ?Sized>(
    c1: ArrayView1<usize>,
    c2: ArrayView1<usize>,
    k: usize,
    samples: usize,
    rng: &mut R,
) -> Result<f64> {
    let n = c1.len();
    if c2.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            found: c2.len(),
        });
    }
    if n < 2 {
        return Err(Error::invalid("stability needs at least two observations"));
    }
    if samples == 0 {
        return Err(Error::invalid("stability needs at least one sampled pair"));
    }

    let p1 = cluster_fractions(c1, k)?;
    let p2 = cluster_fractions(c2, k)?;
    let same1 = same_cluster_probability(&p1, n);
    let same2 = same_cluster_probability(&p2, n);
    let expected = same1 * same2 + (1.0 - same1) * (1.0 - same2);

    let mut concordant = 0_usize;
    for _ in 0..samples {
        let i = rng.gen_range(0..n);
        let mut j = rng.gen_range(0..n - 1);
        if j >= i {
            j += 1;
        }
        if (c1[i] == c1[j]) == (c2[i] == c2[j]) {
            concordant += 1;
        }
    }
    let observed = concordant as f64 / samples as f64;

    let denominator = 1.0 - expected;
    if denominator.abs() < f64::EPSILON {
        return Ok(1.0);
    }
    Ok((observed - expected) / denominator)
}

/// Exact adjusted Rand index between two partitions.
///
/// # Errors
///
/// Fails when the partitions differ in length or cover fewer than two
/// observations.
pub fn adjusted_rand_index(c1: ArrayView1<usize>, c2: ArrayView1<usize>) -> Result<f64> {
    let n = c1.len();
    if c2.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            found: c2.len(),
        });
    }
    if n < 2 {
        return Err(Error::invalid("adjusted Rand index needs at least two observations"));
    }

    let rows = c1.iter().max().map_or(0, |&m| m + 1);
    let cols = c2.iter().max().map_or(0, |&m| m + 1);
    let mut table = vec![0_usize; rows * cols];
    let mut row_sums = vec![0_usize; rows];
    let mut col_sums = vec![0_usize; cols];
    for (&a, &b) in c1.iter().zip(c2.iter()) {
        table[a * cols + b] += 1;
        row_sums[a] += 1;
        col_sums[b] += 1;
    }

    let pairs = |m: usize| (m * m.saturating_sub(1)) as f64 / 2.0;
    let index: f64 = table.iter().map(|&m| pairs(m)).sum();
    let sum_rows: f64 = row_sums.iter().map(|&m| pairs(m)).sum();
    let sum_cols: f64 = col_sums.iter().map(|&m| pairs(m)).sum();

    let expected = sum_rows * sum_cols / pairs(n);
    let max_index = (sum_rows + sum_cols) / 2.0;
    let denominator = max_index - expected;
    if denominator.abs() < f64::EPSILON {
        return Ok(1.0);
    }
    Ok((index - expected) / denominator)
}

fn cluster_fractions(labels: ArrayView1<usize>, k: usize) -> Result<Vec<f64>> {
    let step = 1.0 / labels.len() as f64;
    let mut fractions = vec![0.0; k];
    for &c in labels.iter() {
        match fractions.get_mut(c) {
            Some(f) => *f += step,
            None => {
                return Err(Error::invalid(format!(
                    "cluster label {} out of range for {} clusters",
                    c, k
                )))
            }
        }
    }
    Ok(fractions)
}

/// Probability that two distinct observations drawn without replacement share
/// a cluster, given the cluster fractions `p` of `n` observations.
fn same_cluster_probability(p: &[f64], n: usize) -> f64 {
    let n = n as f64;
    let correction = n / (n - 1.0);
    p.iter().map(|&f| f * (f - 1.0 / n) * correction).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn blocks(sizes: &[usize]) -> Array1<usize> {
        sizes
            .iter()
            .enumerate()
            .flat_map(|(c, &size)| std::iter::repeat(c).take(size))
            .collect()
    }

    #[test]
    fn test_self_agreement() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let c = blocks(&[30, 50, 20]);
        let score = stability(c.view(), c.view(), 3, &mut rng).unwrap();
        assert!((score - 1.0).abs() < 0.02, "score = {}", score);
    }

    #[test]
    fn test_relabelling_does_not_matter() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let c1 = blocks(&[40, 60]);
        let c2 = c1.mapv(|c| 1 - c);
        let score = stability(c1.view(), c2.view(), 2, &mut rng).unwrap();
        assert_abs_diff_eq!(score, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_symmetry() {
        let c1 = blocks(&[25, 25, 25, 25]);
        let mut c2 = c1.clone();
        for i in (0..100).step_by(7) {
            c2[i] = (c2[i] + 1) % 4;
        }

        let score = |a: &Array1<usize>, b: &Array1<usize>, seed: u64| {
            stability(a.view(), b.view(), 4, &mut ChaCha20Rng::seed_from_u64(seed)).unwrap()
        };

        // Same pairs drawn, so the scores match exactly.
        assert_abs_diff_eq!(score(&c1, &c2, 3), score(&c2, &c1, 3), epsilon = 1e-12);
        assert_abs_diff_eq!(score(&c1, &c2, 3), score(&c2, &c1, 4), epsilon = 0.05);
    }

    #[test]
    fn test_shuffled_labels_score_near_zero() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let c1 = blocks(&[100, 100]);
        let mut shuffled = c1.to_vec();
        shuffled.shuffle(&mut rng);
        let c2 = Array1::from(shuffled);
        let score = stability(c1.view(), c2.view(), 2, &mut rng).unwrap();
        assert!(score.abs() < 0.1, "score = {}", score);
    }

    #[test]
    fn test_converges_to_exact_index() {
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let c1 = blocks(&[60, 90, 50]);
        let c2: Array1<usize> = c1
            .iter()
            .enumerate()
            .map(|(i, &c)| if i % 5 == 0 { (c + 1) % 3 } else { c })
            .collect();

        let exact = adjusted_rand_index(c1.view(), c2.view()).unwrap();
        let estimate = stability_with_samples(c1.view(), c2.view(), 3, 200_000, &mut rng).unwrap();
        assert!(exact > 0.2 && exact < 0.95, "exact = {}", exact);
        assert_abs_diff_eq!(estimate, exact, epsilon = 0.02);
    }

    #[test]
    fn test_reproducible_with_fixed_seed() {
        let c1 = blocks(&[10, 10, 10]);
        let c2 = blocks(&[15, 15]);
        let a = stability(c1.view(), c2.view(), 3, &mut ChaCha20Rng::seed_from_u64(9)).unwrap();
        let b = stability(c1.view(), c2.view(), 3, &mut ChaCha20Rng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_trivial_partitions() {
        let mut rng = ChaCha20Rng::seed_from_u64(10);
        let single = Array1::<usize>::zeros(12);
        let score = stability(single.view(), single.view(), 2, &mut rng).unwrap();
        assert_eq!(score, 1.0);
        assert_eq!(adjusted_rand_index(single.view(), single.view()).unwrap(), 1.0);
    }

    #[test]
    fn test_exact_index_known_value() {
        // Contingency [[2, 1], [0, 3]]: index 1 + 3 = 4, rows 3 + 3 = 6,
        // cols 1 + 6 = 7, pairs 15; expected 2.8, max 6.5.
        let c1 = array![0, 0, 0, 1, 1, 1];
        let c2 = array![0, 0, 1, 1, 1, 1];
        let ari = adjusted_rand_index(c1.view(), c2.view()).unwrap();
        assert_abs_diff_eq!(ari, (4.0 - 2.8) / (6.5 - 2.8), epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_stability_inputs() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let c = array![0, 1, 1];
        assert!(matches!(
            stability(c.view(), array![0, 1].view(), 2, &mut rng),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(stability(c.view(), c.view(), 1, &mut rng).is_err());
        assert!(stability(array![0].view(), array![0].view(), 2, &mut rng).is_err());
        assert!(stability_with_samples(c.view(), c.view(), 2, 0, &mut rng).is_err());
    }
}
