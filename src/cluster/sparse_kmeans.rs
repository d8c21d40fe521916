use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView2};
use rand::Rng;

use crate::cluster::allocate::assign;
use crate::cluster::centers::{fit_norm, shrink_centers};
use crate::cluster::seeding::initialize_centers;
use crate::error::{Error, Result};

/// Configuration options for a sparse k-means run.
#[derive(Debug, Clone)]
pub struct SparseKMeansConfig {
    /// Number of clusters (center rows) to fit. Must be at least 2.
    pub k: usize,
    /// Target regularization strength. Larger values shrink more center
    /// coordinates to exactly zero.
    pub regularization: f64,
    /// Exclude all-zero centers from allocation, pruning clusters that
    /// were shrunk away or lost every observation.
    pub zero_suppression: bool,
    /// Hard cap on allocation / re-estimation rounds.
    pub max_iterations: usize,
    /// Number of rounds over which regularization ramps linearly from zero
    /// to its target. The assignment is not considered settled before the
    /// ramp is complete.
    pub ramp_iterations: usize,
}

impl SparseKMeansConfig {
    /// Create a new config with zero-suppression off, max_iterations (1000)
    /// and ramp_iterations (20).
    pub fn new(k: usize, regularization: f64) -> Self {
        Self {
            k,
            regularization,
            zero_suppression: false,
            max_iterations: 1000,
            ramp_iterations: 20,
        }
    }

    /// Enable or disable pruning of all-zero centers.
    pub fn with_zero_suppression(mut self, zero_suppression: bool) -> Self {
        self.zero_suppression = zero_suppression;
        self
    }

    /// Customize the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Customize the length of the regularization ramp.
    pub fn with_ramp_iterations(mut self, ramp_iterations: usize) -> Self {
        self.ramp_iterations = ramp_iterations;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.k < 2 {
            return Err(Error::invalid(format!(
                "k must be at least 2, got {}",
                self.k
            )));
        }
        if !self.regularization.is_finite() || self.regularization < 0.0 {
            return Err(Error::invalid(format!(
                "regularization must be finite and non-negative, got {}",
                self.regularization
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::invalid("max_iterations must be positive"));
        }
        Ok(())
    }
}

/// Terminal state of a sparse k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterResult {
    assignment: Array1<usize>,
    centers: Array2<f64>,
    objective: f64,
    iterations: usize,
    converged: bool,
}

impl ClusterResult {
    /// Cluster index of every observation.
    pub fn assignment(&self) -> &Array1<usize> {
        &self.assignment
    }

    /// The `k x d` center matrix. All-zero rows are pruned clusters.
    pub fn centers(&self) -> &Array2<f64> {
        &self.centers
    }

    /// Fit norm at the target regularization.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Allocation rounds performed.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// `false` when the run stopped at the iteration cap.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Splits the result into assignment, centers and objective.
    pub fn into_parts(self) -> (Array1<usize>, Array2<f64>, f64) {
        (self.assignment, self.centers, self.objective)
    }
}

/// Regularization applied at `iteration` (0-based): a linear ramp from zero
/// that reaches `target` after `ramp` iterations and then holds.
pub fn annealed_regularization(target: f64, iteration: usize, ramp: usize) -> f64 {
    if ramp == 0 {
        return target;
    }
    target.min(target * iteration as f64 / ramp as f64)
}

/// Runs sparse, regularized k-means on `x`.
///
/// Centers are seeded from the rows of `x` by distance-weighted sampling. Each
/// round then allocates every observation to its nearest center and
/// re-estimates the centers with soft-threshold shrinkage, using the annealed
/// regularization for that round. The run stops once the assignment repeats
/// after the ramp has completed, or at `max_iterations`. The returned
/// assignment is always the allocation of `x` against the returned centers.
///
/// # Arguments
///
/// - `x`: the `n x d` observation matrix, already normalized by the caller.
/// - `config`: cluster count, target regularization and stopping rules.
/// - `rng`: source of randomness for seeding.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for an empty matrix, `k < 2`, a negative
/// or non-finite regularization, or a zero iteration cap.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha20Rng;
/// use sparse_kmeans::{fit, SparseKMeansConfig};
///
/// let x = array![[1.0, 1.0], [1.2, 0.9], [-1.0, -1.1], [-0.9, -1.0]];
/// let mut rng = ChaCha20Rng::seed_from_u64(7);
///
/// let result = fit(x.view(), &SparseKMeansConfig::new(2, 0.0), &mut rng).unwrap();
/// assert_eq!(result.assignment().len(), 4);
/// assert_eq!(result.centers().dim(), (2, 2));
/// ```
pub fn fit<R: Rng + ?Sized>(
    x: ArrayView2<f64>,
    config: &SparseKMeansConfig,
    rng: &mut R,
) -> Result<ClusterResult> {
    config.validate()?;
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(Error::invalid(format!(
            "observation matrix must be non-empty, got {}x{}",
            x.nrows(),
            x.ncols()
        )));
    }

    let k = config.k;
    let target = config.regularization;
    let suppress = config.zero_suppression;

    let mut centers = initialize_centers(x, k, rng)?;
    let mut previous: Option<Array1<usize>> = None;
    let mut settled = None;
    let mut iterations = 0;

    for iteration in 0..config.max_iterations {
        iterations = iteration + 1;
        let current = assign(x, centers.view(), suppress);
        if iteration > config.ramp_iterations && previous.as_ref() == Some(&current) {
            settled = Some(current);
            break;
        }
        let reg = annealed_regularization(target, iteration, config.ramp_iterations);
        centers = shrink_centers(x, current.view(), k, reg);
        previous = Some(current);
    }

    let converged = settled.is_some();
    let assignment = match settled {
        Some(assignment) => assignment,
        None => {
            warn!(
                "sparse k-means stopped at {} iterations before settling (k = {}, reg = {})",
                config.max_iterations, k, target
            );
            assign(x, centers.view(), suppress)
        }
    };

    let objective = fit_norm(x, centers.view(), assignment.view(), target);
    debug!(
        "sparse k-means finished after {} iterations (k = {}, reg = {}, objective = {:.6})",
        iterations, k, target, objective
    );

    Ok(ClusterResult {
        assignment,
        centers,
        objective,
        iterations,
        converged,
    })
}
