use thiserror::Error;

/// Reasons a fit produced no usable model. These are ordinary data conditions; callers fall
/// back to a simpler model instead of failing the run.
#[derive(Error, Debug, PartialEq)]
pub enum FittingError {
    /// The inputs cannot be fitted at all, e.g. mismatched or too few samples
    #[error("{0}")]
    InvalidInput(String),

    /// The abscissae have no spread, so the slope is undefined
    #[error("{0}")]
    Degenerate(String),

    /// Represents a bad fit, for any reason
    #[error("{0}")]
    BadFit(String),
}
