//! Elevation angle from interferometer phase lag.
//!
//! With the interferometer displaced by (x, y, z) from the main array, a plane wave arriving
//! at elevation α along a beam pointing ψ off boresight produces the path difference
//! `x·sin ψ + y·sqrt(cos²ψ − sin²α) + z·sin α`. A signal through the rear lobe sees the same
//! geometry with y mirrored. The measured phase only fixes that difference modulo one
//! wavelength, so the observed phase is folded into the window of phases the geometry can
//! produce before the triangle is solved for sin α.
use crate::fov::geometry::{GeometryErrors, RadarGeometry};
use crate::fov::Fov;
use crate::utils::constants::{KHZ_TO_HZ_f64, LIGHTSPEED_f64};
use std::f64::consts::{PI, TAU};
use tracing::debug;

/// Phase lag measured along one beam at one range gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseObservation {
    /// Phase lag between the main and interferometer arrays, in radians
    pub phi0: f64,
    pub phi0_error: f64,
    pub tx_freq_khz: f64,
    /// Beam direction off boresight, in degrees
    pub beam_offset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elevation {
    pub elevation: f64, // degrees
    pub error: f64,     // degrees
    /// Number of 2π cycles added to the observed phase
    pub ambiguity: i32,
}

impl Elevation {
    pub const UNRESOLVED: Elevation = Elevation {
        elevation: f64::NAN,
        error: f64::NAN,
        ambiguity: 0,
    };
}

/// Radar wavenumber in rad/m.
pub fn wavenumber(tx_freq_khz: f64) -> f64 {
    TAU * tx_freq_khz * KHZ_TO_HZ_f64 / LIGHTSPEED_f64
}

/// Phase introduced by the receiver path delay `tdiff` (microseconds).
pub fn cable_phase_offset(tx_freq_khz: f64, tdiff: f64) -> f64 {
    -PI * tx_freq_khz * tdiff * 2e-3
}

struct PhaseWindow {
    /// +1 when the admissible phases lie below `chi_max`, -1 when they lie above it
    sign: f64,
    chi_max: f64,
}

fn interferometer(geometry: &RadarGeometry, fov: Fov) -> (f64, f64, f64) {
    let [x, y, z] = geometry.interferometer;
    (x, fov.sign() * y, z)
}

/// Path-difference phase of a wave at sin(elevation) `s`.
fn geometric_phase(k: f64, (x, y, z): (f64, f64, f64), psi: f64, s: f64) -> f64 {
    let (sp, cp) = psi.sin_cos();
    k * (x * sp + y * (cp * cp - s * s).max(0.0).sqrt() + z * s)
}

/// Extremum of the geometric phase over the visible elevations, on the side the upper
/// elevation branch starts from.
fn phase_window(k: f64, intf: (f64, f64, f64), psi: f64) -> PhaseWindow {
    let (_, y, z) = intf;
    let sign = if y < 0.0 { -1.0 } else { 1.0 };
    let cp = psi.cos();
    let yz = (y * y + z * z).sqrt();
    let s_ext = if yz > 0.0 {
        (sign * z * cp / yz).clamp(0.0, cp)
    } else {
        0.0
    };
    PhaseWindow {
        sign,
        chi_max: geometric_phase(k, intf, psi, s_ext),
    }
}

/// Computes the elevation of the echo observed in `obs`, assuming it arrived through `fov`.
///
/// `alias` widens the admissible phase window by that many extra 2π cycles, choosing the
/// farthest fold. Points whose phase cannot be folded into the window, or whose triangle has
/// no solution, return [`Elevation::UNRESOLVED`]. When `errors` is given the elevation error
/// combines the phase error with the geometry uncertainties.
pub fn calc_elevation(
    obs: &PhaseObservation,
    geometry: &RadarGeometry,
    tdiff: f64,
    errors: Option<&GeometryErrors>,
    alias: u8,
    fov: Fov,
) -> Elevation {
    let k = wavenumber(obs.tx_freq_khz);
    let intf = interferometer(geometry, fov);
    let psi = obs.beam_offset.to_radians();
    let window = phase_window(k, intf, psi);
    let sign = window.sign;

    let phi = geometry.phase_sign * obs.phi0 - cable_phase_offset(obs.tx_freq_khz, tdiff);
    if !phi.is_finite() || !window.chi_max.is_finite() {
        debug!(phi0 = obs.phi0, "phase unresolvable: non-finite input");
        return Elevation::UNRESOLVED;
    }

    let cycles = (sign * (window.chi_max - phi) / TAU).floor() - alias as f64;
    let psi_obs = phi + sign * TAU * cycles;
    let chi_min = window.chi_max - (alias as f64 + 1.0) * sign * TAU;
    let (lo, hi) = if sign > 0.0 {
        (chi_min, window.chi_max)
    } else {
        (window.chi_max, chi_min)
    };
    if psi_obs < lo || psi_obs > hi {
        debug!(phi0 = obs.phi0, "phase unresolvable: outside admissible window");
        return Elevation::UNRESOLVED;
    }

    let (x, y, z) = intf;
    let (sp, cp) = psi.sin_cos();
    let e = psi_obs / k - x * sp;
    let a = y * y + z * z;
    let disc = e * e * z * z - a * (e * e - y * y * cp * cp);
    if a <= 0.0 || disc < 0.0 {
        debug!(phi0 = obs.phi0, "phase unresolvable: no elevation on the cone");
        return Elevation::UNRESOLVED;
    }
    let sin_elv = (e * z + disc.sqrt()) / a;
    if sin_elv > 1.0 || sin_elv.is_nan() {
        debug!(phi0 = obs.phi0, sin_elv, "phase unresolvable: sin(elevation) > 1");
        return Elevation::UNRESOLVED;
    }

    let error = match errors {
        Some(errors) => elevation_error(obs, geometry, errors, fov, k, sin_elv),
        None => f64::NAN,
    };
    Elevation {
        elevation: sin_elv.asin().to_degrees(),
        error,
        ambiguity: (sign * cycles) as i32,
    }
}

/// Propagates the phase and geometry errors through the implicit equation
/// `F(s) = y·sqrt(cos²ψ − s²) + z·s − (ψ_obs/k − x·sin ψ) = 0`.
fn elevation_error(
    obs: &PhaseObservation,
    geometry: &RadarGeometry,
    errors: &GeometryErrors,
    fov: Fov,
    k: f64,
    s: f64,
) -> f64 {
    let (x, y, z) = interferometer(geometry, fov);
    let psi = obs.beam_offset.to_radians();
    let (sp, cp) = psi.sin_cos();
    let r = (cp * cp - s * s).sqrt();
    let df_ds = z - y * s / r;
    if !df_ds.is_finite() || df_ds == 0.0 || r == 0.0 {
        return f64::NAN;
    }

    let df_dphi0 = -geometry.phase_sign / k;
    let df_dtdiff = -PI * obs.tx_freq_khz * 2e-3 / k;
    let df_dx = sp;
    let df_dy = fov.sign() * r;
    let df_dz = s;
    let df_dpsi = x * cp - y * sp * cp / r;
    let psi_error = (errors.beam_azimuth.powi(2) + errors.boresight.powi(2))
        .sqrt()
        .to_radians();

    let var_f = (df_dphi0 * obs.phi0_error).powi(2)
        + (df_dtdiff * errors.tdiff).powi(2)
        + (df_dx * errors.interferometer[0]).powi(2)
        + (df_dy * errors.interferometer[1]).powi(2)
        + (df_dz * errors.interferometer[2]).powi(2)
        + (df_dpsi * psi_error).powi(2);
    let var_elv = var_f / (df_ds * df_ds) / (1.0 - s * s);
    if var_elv > 0.0 && var_elv.is_finite() {
        var_elv.sqrt().to_degrees()
    } else {
        f64::NAN
    }
}

/// Phase lag, wrapped to (-π, π], that an echo at `elevation` degrees arriving through `fov`
/// would produce. Inverse of [`calc_elevation`] for phases inside the admissible window.
pub fn phase_from_elevation(
    elevation: f64,
    tx_freq_khz: f64,
    beam_offset: f64,
    geometry: &RadarGeometry,
    tdiff: f64,
    fov: Fov,
) -> f64 {
    let k = wavenumber(tx_freq_khz);
    let psi = beam_offset.to_radians();
    let chi = geometric_phase(
        k,
        interferometer(geometry, fov),
        psi,
        elevation.to_radians().sin(),
    );
    let phi = geometry.phase_sign * (chi + cable_phase_offset(tx_freq_khz, tdiff));
    let wrapped = phi.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(y: f64) -> RadarGeometry {
        RadarGeometry {
            station_id: 5,
            latitude: 52.16,
            longitude: -106.53,
            boresight: 23.1,
            boresight_shift: 0.0,
            beam_separation: 3.24,
            max_beams: 16,
            max_range_gates: 75,
            interferometer: [1.5, y, -3.0],
            phase_sign: 1.0,
            tdiff: [0.0, 0.0],
        }
    }

    fn observation(phi0: f64) -> PhaseObservation {
        PhaseObservation {
            phi0,
            phi0_error: 0.1,
            tx_freq_khz: 12000.0,
            beam_offset: 5.0,
        }
    }

    #[test]
    fn recovers_elevation_in_both_fovs() {
        for y in [100.0, -100.0] {
            let geometry = geometry(y);
            for fov in Fov::BOTH {
                for elv in [5.0, 15.0, 25.0, 35.0] {
                    let phi0 = phase_from_elevation(elv, 12000.0, 5.0, &geometry, 0.35, fov);
                    let result =
                        calc_elevation(&observation(phi0), &geometry, 0.35, None, 0, fov);
                    assert!(
                        (result.elevation - elv).abs() < 1e-6,
                        "y {y} {fov:?} {elv}: got {}",
                        result.elevation
                    );
                }
            }
        }
    }

    #[test]
    fn phase_sign_is_undone() {
        let mut geometry = geometry(100.0);
        geometry.phase_sign = -1.0;
        let phi0 = phase_from_elevation(20.0, 12000.0, 5.0, &geometry, 0.0, Fov::Front);
        let result = calc_elevation(&observation(phi0), &geometry, 0.0, None, 0, Fov::Front);
        assert!((result.elevation - 20.0).abs() < 1e-6);
    }

    #[test]
    fn alias_moves_to_a_lower_fold() {
        let geometry = geometry(100.0);
        let phi0 = phase_from_elevation(35.0, 12000.0, 5.0, &geometry, 0.0, Fov::Front);
        let direct = calc_elevation(&observation(phi0), &geometry, 0.0, None, 0, Fov::Front);
        let aliased = calc_elevation(&observation(phi0), &geometry, 0.0, None, 1, Fov::Front);
        assert_eq!(aliased.ambiguity, direct.ambiguity - 1);
        if aliased.elevation.is_finite() {
            assert!(aliased.elevation > direct.elevation);
        }
    }

    #[test]
    fn unresolvable_inputs_give_nan() {
        let geometry = geometry(100.0);
        let result = calc_elevation(&observation(f64::NAN), &geometry, 0.0, None, 0, Fov::Front);
        assert!(result.elevation.is_nan());

        let mut flat = geometry.clone();
        flat.interferometer = [0.0, 0.0, 0.0];
        let result = calc_elevation(&observation(0.5), &flat, 0.0, None, 0, Fov::Front);
        assert!(result.elevation.is_nan());
    }

    #[test]
    fn error_grows_with_phase_error() {
        let geometry = geometry(100.0);
        let errors = GeometryErrors::default();
        let phi0 = phase_from_elevation(20.0, 12000.0, 5.0, &geometry, 0.0, Fov::Front);
        let mut obs = observation(phi0);
        let small = calc_elevation(&obs, &geometry, 0.0, Some(&errors), 0, Fov::Front);
        obs.phi0_error = 0.4;
        let large = calc_elevation(&obs, &geometry, 0.0, Some(&errors), 0, Fov::Front);
        assert!(small.error > 0.0);
        assert!(large.error > small.error);

        // no uncertainty at all leaves nothing to propagate
        obs.phi0_error = 0.0;
        let none = calc_elevation(&obs, &geometry, 0.0, Some(&errors), 0, Fov::Front);
        assert!(none.error.is_nan());
        assert!(none.elevation.is_finite());
    }
}
