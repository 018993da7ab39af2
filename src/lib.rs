//! Front/back field-of-view resolution of SuperDARN backscatter, with the virtual height and
//! propagation path of every echo, and calibration of the interferometer timing offset.
pub mod error;
pub mod fitting;
pub mod fov;
pub mod tdiff;
pub mod utils;

#[cfg(feature = "python")]
mod python;

pub use crate::error::FovError;
pub use crate::fov::config::FovConfig;
pub use crate::fov::geometry::{GeometryProvider, HdwDirectory, RadarGeometry};
pub use crate::fov::resolve::{par_update_backscatter, update_backscatter, FovBeam};
pub use crate::fov::{Fov, FovAssignment, FovFlag};
pub use crate::tdiff::{SimplexConfig, TdiffEstimate};
