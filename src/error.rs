use thiserror::Error;

/// Errors raised by the clustering core.
///
/// Algorithmic edge cases (fewer than two active centers, clusters that
/// lose all their points) resolve to documented fallback values and are
/// never reported here. Only structurally invalid calls are.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}
