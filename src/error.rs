use crate::utils::hdw::HdwError;
#[cfg(feature = "fitacf")]
use dmap::error::DmapError;
use thiserror::Error;

/// Errors raised at the API boundary. Per-point numeric failures are never reported
/// through this type; they propagate as NaN or an unresolved FoV flag.
#[derive(Error, Debug)]
pub enum FovError {
    /// Represents a malformed configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Represents a beam record with inconsistent contents
    #[error("Invalid beam: {0}")]
    InvalidBeam(String),

    /// Unable to get hdw file information
    #[error("{0}")]
    Hdw(#[from] HdwError),

    /// Represents a bad DMAP record
    #[cfg(feature = "fitacf")]
    #[error("{0}")]
    Dmap(#[from] DmapError),
}

#[cfg(feature = "python")]
impl From<FovError> for pyo3::PyErr {
    fn from(value: FovError) -> Self {
        let msg = value.to_string();
        pyo3::exceptions::PyValueError::new_err(msg)
    }
}
