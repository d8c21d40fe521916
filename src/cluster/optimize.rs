//! Bootstrap stability search over `(k, regularization)` grids.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};
use ndarray::{Array2, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;

use crate::cluster::allocate::allocate;
use crate::cluster::bootstrap::bootstrap;
use crate::cluster::centers::used_clusters;
use crate::cluster::sparse_kmeans::{fit, SparseKMeansConfig};
use crate::cluster::stability::{stability_with_samples, DEFAULT_STABILITY_SAMPLES};
use crate::error::{Error, Result};

/// Configuration for [`optimize_parameters`].
#[derive(Debug, Clone)]
pub struct GridSearchConfig {
    /// Candidate cluster counts (rows of the result matrices).
    pub ks: Vec<usize>,
    /// Candidate regularization strengths (columns of the result matrices).
    pub regularizations: Vec<f64>,
    /// Bootstrap trials per grid cell.
    pub iterations: usize,
    /// Rows per bootstrap sample. `None` uses the row count of the data.
    pub bootstrap_samples: Option<usize>,
    /// Observation pairs sampled by the stability metric.
    pub stability_samples: usize,
    /// Iteration cap passed to every clustering run.
    pub max_iterations: usize,
    /// Keep every fitted center matrix in the result.
    pub retain_centers: bool,
    /// Checked before each cell; once set the search stops with
    /// [`Error::Cancelled`].
    pub cancel: Option<Arc<AtomicBool>>,
}

impl GridSearchConfig {
    /// Create a new config with iterations (20), stability_samples (10,000),
    /// max_iterations (1000), bootstrap samples matching the data, and center
    /// retention off.
    pub fn new(ks: Vec<usize>, regularizations: Vec<f64>) -> Self {
        Self {
            ks,
            regularizations,
            iterations: 20,
            bootstrap_samples: None,
            stability_samples: DEFAULT_STABILITY_SAMPLES,
            max_iterations: 1000,
            retain_centers: false,
            cancel: None,
        }
    }

    /// Customize the number of bootstrap trials per cell.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Customize the number of rows drawn per bootstrap sample.
    pub fn with_bootstrap_samples(mut self, samples: usize) -> Self {
        self.bootstrap_samples = Some(samples);
        self
    }

    /// Customize the number of pairs sampled by the stability metric.
    pub fn with_stability_samples(mut self, samples: usize) -> Self {
        self.stability_samples = samples;
        self
    }

    /// Customize the iteration cap of every clustering run.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Keep the two center matrices fitted in every cell. Memory grows with
    /// `iterations * ks.len() * regularizations.len()`.
    pub fn with_center_retention(mut self, retain: bool) -> Self {
        self.retain_centers = retain;
        self
    }

    /// Stop the search with [`Error::Cancelled`] once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn validate(&self, x: ArrayView2<f64>) -> Result<()> {
        if self.ks.is_empty() || self.regularizations.is_empty() {
            return Err(Error::invalid("parameter grids must be non-empty"));
        }
        if let Some(&k) = self.ks.iter().find(|&&k| k < 2) {
            return Err(Error::invalid(format!("k must be at least 2, got {}", k)));
        }
        if let Some(&reg) = self
            .regularizations
            .iter()
            .find(|r| !r.is_finite() || **r < 0.0)
        {
            return Err(Error::invalid(format!(
                "regularization must be finite and non-negative, got {}",
                reg
            )));
        }
        if self.iterations == 0 {
            return Err(Error::invalid("iterations must be positive"));
        }
        if self.stability_samples == 0 {
            return Err(Error::invalid("stability_samples must be positive"));
        }
        if self.bootstrap_samples == Some(0) {
            return Err(Error::invalid("bootstrap samples must be positive"));
        }
        if x.nrows() < 2 || x.ncols() == 0 {
            return Err(Error::invalid(format!(
                "grid search needs at least two observations with one variable, got {}x{}",
                x.nrows(),
                x.ncols()
            )));
        }
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// The two center matrices fitted for one `(iteration, k, reg)` cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellCenters {
    /// Bootstrap trial the centers came from.
    pub iteration: usize,
    /// Row of the cell, an index into `ks`.
    pub k_index: usize,
    /// Column of the cell, an index into `regularizations`.
    pub reg_index: usize,
    /// Centers fitted on the first bootstrap sample.
    pub first: Array2<f64>,
    /// Centers fitted on the second bootstrap sample.
    pub second: Array2<f64>,
}

/// Averaged outcome of a grid search. Rows follow `ks`, columns follow
/// `regularizations`.
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    /// Mean stability score per cell; `1` is perfectly reproducible.
    pub stability: Array2<f64>,
    /// Mean number of clusters actually used per bootstrap run.
    pub used_clusters: Array2<f64>,
    /// Fitted centers in cell order; empty unless retention was requested.
    pub centers: Vec<CellCenters>,
    /// Trials averaged into every cell.
    pub iterations: usize,
}

struct CellRecord {
    k_index: usize,
    reg_index: usize,
    score: f64,
    used: usize,
    centers: Option<CellCenters>,
}

/// Scores every `(k, regularization)` pair by bootstrap reproducibility.
///
/// For each trial and cell two bootstrap samples of `x` are clustered with
/// zero-suppression, `x` itself is allocated against both center matrices
/// with every row as a candidate, pruned ones included. The two allocations
/// are compared with the stability metric. Scores and used-cluster counts are
/// averaged over trials. Picking the winning cell is left to the caller.
///
/// Cells run in parallel. Each one gets its own generator stream derived from
/// a single seed drawn from `rng`, so a fixed `rng` state gives identical
/// results however the cells are scheduled.
///
/// # Errors
///
/// - [`Error::InvalidArgument`] for empty grids, `k < 2`, negative
///   regularization, zero counts, or fewer than two observations.
/// - [`Error::Cancelled`] if the cancel flag is raised mid-search.
pub fn optimize_parameters<R: Rng + ?Sized>(
    x: ArrayView2<f64>,
    config: &GridSearchConfig,
    rng: &mut R,
) -> Result<GridSearchResult> {
    config.validate(x)?;

    let k_len = config.ks.len();
    let reg_len = config.regularizations.len();
    let base_seed: u64 = rng.gen();

    let records = (0..config.iterations * k_len * reg_len)
        .into_par_iter()
        .map(|cell| {
            let iteration = cell / (k_len * reg_len);
            let k_index = (cell / reg_len) % k_len;
            let reg_index = cell % reg_len;
            let mut cell_rng = ChaCha20Rng::seed_from_u64(base_seed);
            cell_rng.set_stream(cell as u64);
            run_cell(x, config, iteration, k_index, reg_index, &mut cell_rng)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut stability = Array2::<f64>::zeros((k_len, reg_len));
    let mut used = Array2::<f64>::zeros((k_len, reg_len));
    let mut centers = Vec::new();
    for record in records {
        stability[[record.k_index, record.reg_index]] += record.score;
        used[[record.k_index, record.reg_index]] += record.used as f64;
        centers.extend(record.centers);
    }
    stability /= config.iterations as f64;
    used /= (2 * config.iterations) as f64;

    info!(
        "grid search finished: {} k values x {} regularizations x {} iterations",
        k_len, reg_len, config.iterations
    );

    Ok(GridSearchResult {
        stability,
        used_clusters: used,
        centers,
        iterations: config.iterations,
    })
}

fn run_cell(
    x: ArrayView2<f64>,
    config: &GridSearchConfig,
    iteration: usize,
    k_index: usize,
    reg_index: usize,
    rng: &mut ChaCha20Rng,
) -> Result<CellRecord> {
    if config.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let k = config.ks[k_index];
    let reg = config.regularizations[reg_index];
    let samples = config.bootstrap_samples.unwrap_or(x.nrows());
    let run_config = SparseKMeansConfig::new(k, reg)
        .with_zero_suppression(true)
        .with_max_iterations(config.max_iterations);

    let first_sample = bootstrap(x, samples, rng)?;
    let second_sample = bootstrap(x, samples, rng)?;
    let first = fit(first_sample.view(), &run_config, rng)?;
    let second = fit(second_sample.view(), &run_config, rng)?;

    let score = score_centers(
        x,
        first.centers().view(),
        second.centers().view(),
        k,
        config.stability_samples,
        rng,
    )?;
    let used = used_clusters(first.assignment().view(), k)
        + used_clusters(second.assignment().view(), k);

    debug!(
        "grid cell (iteration {}, k = {}, reg = {}): stability {:.4}, used clusters {}",
        iteration, k, reg, score, used
    );

    let centers = config.retain_centers.then(|| CellCenters {
        iteration,
        k_index,
        reg_index,
        first: first.into_parts().1,
        second: second.into_parts().1,
    });

    Ok(CellRecord {
        k_index,
        reg_index,
        score,
        used,
        centers,
    })
}

/// Allocates `x` against both center matrices and scores the agreement.
///
/// Pruned all-zero rows stay candidates here: on centered data they act as a
/// cluster at the origin.
fn score_centers<R: Rng + ?Sized>(
    x: ArrayView2<f64>,
    first: ArrayView2<f64>,
    second: ArrayView2<f64>,
    k: usize,
    samples: usize,
    rng: &mut R,
) -> Result<f64> {
    let first_labels = allocate(x, first, false)?;
    let second_labels = allocate(x, second, false)?;
    stability_with_samples(first_labels.view(), second_labels.view(), k, samples, rng)
}
