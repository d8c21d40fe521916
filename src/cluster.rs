pub mod allocate;
pub mod bootstrap;
pub mod centers;
pub mod optimize;
pub mod seeding;
pub mod sparse_kmeans;
pub mod stability;

// Re-export public types and functions
pub use allocate::{active_centers, allocate, used_variables};
pub use bootstrap::bootstrap;
pub use centers::{estimate_centers, objective, used_clusters};
pub use optimize::{optimize_parameters, CellCenters, GridSearchConfig, GridSearchResult};
pub use seeding::{initialize_centers, sample_weighted};
pub use sparse_kmeans::{annealed_regularization, fit, ClusterResult, SparseKMeansConfig};
pub use stability::{
    adjusted_rand_index, stability, stability_with_samples, DEFAULT_STABILITY_SAMPLES,
};
