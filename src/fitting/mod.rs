//! Curve fits used by the FoV resolver: straight lines of elevation against range gate and
//! Gaussian peaks of virtual height histograms.
pub mod error;
pub mod gaussian;
pub mod least_squares;
