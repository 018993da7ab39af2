//! Calibration of the receiver timing offset (tdiff) between the main and interferometer
//! arrays.
//!
//! A trial tdiff changes every elevation, and with it the position and height of every
//! calibration echo. The calibrator searches for the tdiff that makes a set of echoes with a
//! known origin land where they should, using a Nelder-Mead simplex hardened against shallow
//! local minima and against the periodicity of the phase in tdiff.
pub mod distribution;
pub mod objectives;
pub mod simplex;

/// Tolerances of the tdiff search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplexConfig {
    /// Two minima closer than this (microseconds) are the same minimum
    pub tdiff_tol: f64,
    /// Two objective values closer than this are equal
    pub func_tol: f64,
    /// Total simplex iterations allowed over all restarts
    pub maxiter: usize,
}

impl Default for SimplexConfig {
    fn default() -> Self {
        SimplexConfig {
            tdiff_tol: 1e-4,
            func_tol: 1e-4,
            maxiter: 1000,
        }
    }
}

/// Outcome of a tdiff search. `tdiff` and `objective` are NaN when the iterations ran out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TdiffEstimate {
    /// Microseconds
    pub tdiff: f64,
    pub objective: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl TdiffEstimate {
    pub(crate) fn exhausted(iterations: usize) -> TdiffEstimate {
        TdiffEstimate {
            tdiff: f64::NAN,
            objective: f64::NAN,
            iterations,
            converged: false,
        }
    }
}
