//! Virtual height of a reflection, either from the measured elevation or from an empirical
//! model of slant range.
use crate::fov::Hop;

/// One-way distance to the reflection point of a path with `hop` hops and total slant range
/// `slant_range` (km).
pub fn calc_distance(slant_range: f64, hop: Hop) -> f64 {
    slant_range / (2.0 * hop.as_f64())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualHeight {
    pub height: f64, // km
    pub error: f64,  // km
}

/// Height above a spherical Earth of radius `radius` reached by a straight ray leaving at
/// `elevation` degrees after travelling `distance` km (law of cosines).
///
/// The error combines the elevation, distance and radius uncertainties in quadrature and is
/// NaN when all of them are zero. Returns NaN for a NaN elevation or a ray that cannot exist.
pub fn vheight_from_elevation(
    distance: f64,
    elevation: f64,
    radius: f64,
    elevation_error: f64,
    distance_error: f64,
    radius_error: f64,
) -> VirtualHeight {
    let sin_elv = elevation.to_radians().sin();
    let radicand = radius * radius + distance * distance + 2.0 * radius * distance * sin_elv;
    if !radicand.is_finite() || radicand < 0.0 {
        return VirtualHeight {
            height: f64::NAN,
            error: f64::NAN,
        };
    }
    let hyp = radicand.sqrt();
    let height = hyp - radius;

    let cos_elv = elevation.to_radians().cos();
    let dh_delv = radius * distance * cos_elv / hyp;
    let dh_ddist = (distance + radius * sin_elv) / hyp;
    let dh_drad = (radius + distance * sin_elv) / hyp - 1.0;
    let var = (dh_delv * elevation_error.to_radians()).powi(2)
        + (dh_ddist * distance_error).powi(2)
        + (dh_drad * radius_error).powi(2);
    let error = if var > 0.0 { var.sqrt() } else { f64::NAN };

    VirtualHeight { height, error }
}

/// Elevation (degrees) at which a straight ray reaches `height` km after `distance` km.
/// Inverse of [`vheight_from_elevation`].
pub fn elevation_from_height(distance: f64, height: f64, radius: f64) -> f64 {
    let hyp = radius + height;
    let sin_elv = (hyp * hyp - radius * radius - distance * distance) / (2.0 * radius * distance);
    if (-1.0..=1.0).contains(&sin_elv) {
        sin_elv.asin().to_degrees()
    } else {
        f64::NAN
    }
}

/// Empirical virtual height models, used when no elevation is available.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VirtualHeightModel {
    /// Piecewise model of fldpnth in RST around a nominal reflection height
    Standard { nominal_height: f64 },
    /// Quadratic fits of Chisham et al. (2008) for E, half-hop F and 1.5-hop F paths
    Chisham,
}

impl Default for VirtualHeightModel {
    fn default() -> Self {
        VirtualHeightModel::Standard {
            nominal_height: 300.0,
        }
    }
}

impl VirtualHeightModel {
    /// Virtual height (km) of a path with `hop` hops and total slant range `slant_range` (km).
    pub fn height(&self, slant_range: f64, hop: Hop) -> f64 {
        match self {
            VirtualHeightModel::Standard { nominal_height } => {
                standard_height(calc_distance(slant_range, hop), *nominal_height)
            }
            VirtualHeightModel::Chisham => {
                if hop.as_f64() == 1.5 {
                    chisham_one_and_half_hop(slant_range)
                } else {
                    chisham_half_hop(calc_distance(slant_range, hop))
                }
            }
        }
    }
}

/// Adapted from fldpnth in cnvtcoord.c of RST. `slant_range` is the half-hop slant range.
fn standard_height(slant_range: f64, nominal_height: f64) -> f64 {
    let mut xh = if nominal_height <= 150.0 {
        nominal_height
    } else if slant_range < 600.0 {
        115.0
    } else if slant_range < 800.0 {
        (slant_range - 600.0) / 200.0 * (nominal_height - 115.0) + 115.0
    } else {
        nominal_height
    };
    if slant_range < 150.0 {
        xh = (slant_range / 150.0) * 115.0;
    }
    xh
}

/// Half-hop E or F height of the Chisham model, switched on slant range.
fn chisham_half_hop(slant_range: f64) -> f64 {
    const E_COEFF: [f64; 3] = [108.974, 0.0191271, 6.68283e-5];
    const F_COEFF: [f64; 3] = [384.416, -0.178640, 1.81405e-4];
    if slant_range < 115.0 {
        (slant_range / 115.0) * 112.0
    } else if slant_range < 787.5 {
        E_COEFF[0] + E_COEFF[1] * slant_range + E_COEFF[2] * slant_range * slant_range
    } else {
        F_COEFF[0] + F_COEFF[1] * slant_range + F_COEFF[2] * slant_range * slant_range
    }
}

fn chisham_one_and_half_hop(slant_range: f64) -> f64 {
    const COEFF: [f64; 3] = [1098.28, -0.354557, 9.39961e-5];
    COEFF[0] + COEFF[1] * slant_range + COEFF[2] * slant_range * slant_range
}
