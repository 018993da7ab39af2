//! Objectives scoring a trial tdiff against echoes of known origin.
//!
//! Both return `sqrt(bias² + spread²)` of the echo latitudes or heights with respect to a
//! reference value, so that a tdiff placing the echoes tightly but in the wrong place scores
//! no better than one scattering them around the right place.
use crate::fov::elevation::{calc_elevation, PhaseObservation};
use crate::fov::geometry::RadarGeometry;
use crate::fov::vheight::{calc_distance, vheight_from_elevation};
use crate::fov::{Fov, Hop};
use crate::tdiff::distribution::{distribution_min, phase_period};
use crate::tdiff::{SimplexConfig, TdiffEstimate};
use crate::utils::rpos::{fieldpoint_sphere, ground_distance, pointing_azimuth};
use tracing::info;

/// An echo whose propagation path and FoV are known, such as ground scatter from a known
/// feature or meteor echoes at a known altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPoint {
    /// Radians
    pub phi0: f64,
    pub tx_freq_khz: f64,
    /// Degrees off boresight
    pub beam_offset: f64,
    /// km
    pub slant_range: f64,
    pub hop: Hop,
    pub fov: Fov,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSet {
    pub geometry: RadarGeometry,
    pub points: Vec<CalibrationPoint>,
    pub alias: u8,
}

/// Elevation, one-way distance and virtual height of each point that can be resolved at
/// `tdiff`.
fn resolve_points(tdiff: f64, set: &CalibrationSet) -> impl Iterator<Item = (&CalibrationPoint, f64, f64, f64)> {
    let radius = set.geometry.earth_radius();
    set.points.iter().filter_map(move |p| {
        let obs = PhaseObservation {
            phi0: p.phi0,
            phi0_error: 0.0,
            tx_freq_khz: p.tx_freq_khz,
            beam_offset: p.beam_offset,
        };
        let elevation = calc_elevation(&obs, &set.geometry, tdiff, None, set.alias, p.fov).elevation;
        let distance = calc_distance(p.slant_range, p.hop);
        let height = vheight_from_elevation(distance, elevation, radius, 0.0, 0.0, 0.0).height;
        height
            .is_finite()
            .then_some((p, elevation, distance, height))
    })
}

/// `sqrt(bias² + spread²)` of `values` around `target`, or +∞ when there are none.
fn bias_spread(values: &[f64], target: f64) -> f64 {
    if values.is_empty() {
        return f64::INFINITY;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    ((mean - target).powi(2) + variance).sqrt()
}

/// Scores `tdiff` by the geographic latitude of the echoes against `target_lat` (degrees).
pub fn lat_distribution(tdiff: f64, set: &CalibrationSet, target_lat: f64) -> f64 {
    let geometry = &set.geometry;
    let radius = geometry.earth_radius();
    let latitudes: Vec<f64> = resolve_points(tdiff, set)
        .map(|(p, elevation, distance, height)| {
            let ground = ground_distance(distance, elevation, height, radius) * 2.0 * p.hop.as_f64();
            let bearing = pointing_azimuth(geometry.boresight, p.beam_offset, elevation, p.fov == Fov::Back);
            fieldpoint_sphere(geometry.latitude, geometry.longitude, radius, bearing, ground).0
        })
        .filter(|lat| lat.is_finite())
        .collect();
    bias_spread(&latitudes, target_lat)
}

/// Scores `tdiff` by the virtual height of the echoes against `target_height` (km).
pub fn vheight_distribution(tdiff: f64, set: &CalibrationSet, target_height: f64) -> f64 {
    let heights: Vec<f64> = resolve_points(tdiff, set).map(|(.., h)| h).collect();
    bias_spread(&heights, target_height)
}

/// Reference the calibration echoes are expected to match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TdiffObjective {
    /// Geographic latitude, degrees
    Latitude(f64),
    /// Virtual height, km
    VirtualHeight(f64),
}

/// Estimates tdiff from `set`, starting at `tdiff0` and searching one phase period to either
/// side. The period is taken at the mean transmit frequency of the set.
pub fn calibrate(set: &CalibrationSet, objective: TdiffObjective, tdiff0: f64, config: &SimplexConfig) -> TdiffEstimate {
    if set.points.is_empty() {
        info!("no calibration points");
        return TdiffEstimate::exhausted(0);
    }
    let freq = set.points.iter().map(|p| p.tx_freq_khz).sum::<f64>() / set.points.len() as f64;
    let period = phase_period(freq);
    match objective {
        TdiffObjective::Latitude(lat) => {
            distribution_min(tdiff0, period, |t| lat_distribution(t, set, lat), config)
        }
        TdiffObjective::VirtualHeight(h) => {
            distribution_min(tdiff0, period, |t| vheight_distribution(t, set, h), config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fov::elevation::phase_from_elevation;
    use crate::fov::vheight::elevation_from_height;
    use crate::utils::rpos::slant_range;

    const TRUE_TDIFF: f64 = 0.35;
    const LAYER_HEIGHT: f64 = 250.0;

    fn geometry() -> RadarGeometry {
        RadarGeometry {
            station_id: 65,
            latitude: 62.82,
            longitude: -93.11,
            boresight: 5.7,
            boresight_shift: 0.0,
            beam_separation: 3.24,
            max_beams: 16,
            max_range_gates: 75,
            interferometer: [0.0, 100.0, 0.0],
            phase_sign: 1.0,
            tdiff: [0.0, 0.0],
        }
    }

    /// Echoes from a layer at 250 km seen on several beams and gates, with phases generated at
    /// `TRUE_TDIFF`.
    fn layer_set() -> CalibrationSet {
        let geometry = geometry();
        let radius = geometry.earth_radius();
        let mut points = vec![];
        for beam in [6, 7, 8] {
            for gate in [5, 6, 7, 8] {
                let slant = slant_range(180.0, 45.0, 0.0, 0.0, gate);
                let offset = geometry.beam_offset(beam);
                let elevation = elevation_from_height(calc_distance(slant, Hop::HALF), LAYER_HEIGHT, radius);
                points.push(CalibrationPoint {
                    phi0: phase_from_elevation(elevation, 10500.0, offset, &geometry, TRUE_TDIFF, Fov::Front),
                    tx_freq_khz: 10500.0,
                    beam_offset: offset,
                    slant_range: slant,
                    hop: Hop::HALF,
                    fov: Fov::Front,
                });
            }
        }
        CalibrationSet {
            geometry,
            points,
            alias: 0,
        }
    }

    #[test]
    fn true_tdiff_scores_no_height_spread() {
        let set = layer_set();
        assert!(vheight_distribution(TRUE_TDIFF, &set, LAYER_HEIGHT) < 1e-4);
        assert!(vheight_distribution(TRUE_TDIFF + 0.01, &set, LAYER_HEIGHT) > 1e-3);
    }

    #[test]
    fn empty_set_scores_infinity() {
        let set = CalibrationSet {
            points: vec![],
            ..layer_set()
        };
        assert_eq!(vheight_distribution(0.0, &set, LAYER_HEIGHT), f64::INFINITY);
        assert_eq!(lat_distribution(0.0, &set, 60.0), f64::INFINITY);
        assert!(calibrate(&set, TdiffObjective::VirtualHeight(LAYER_HEIGHT), 0.0, &SimplexConfig::default())
            .tdiff
            .is_nan());
    }

    #[test]
    fn latitude_objective_is_lowest_at_true_tdiff() {
        let set = layer_set();
        let geometry = &set.geometry;
        let radius = geometry.earth_radius();
        // latitude of one echo at the true tdiff
        let p = set.points[0];
        let elevation = elevation_from_height(calc_distance(p.slant_range, p.hop), LAYER_HEIGHT, radius);
        let ground = ground_distance(calc_distance(p.slant_range, p.hop), elevation, LAYER_HEIGHT, radius);
        let bearing = pointing_azimuth(geometry.boresight, p.beam_offset, elevation, false);
        let lat = fieldpoint_sphere(geometry.latitude, geometry.longitude, radius, bearing, ground).0;
        let single = CalibrationSet {
            points: vec![p],
            ..set.clone()
        };
        assert!(lat_distribution(TRUE_TDIFF, &single, lat) < 1e-5);
        assert!(lat_distribution(TRUE_TDIFF + 0.02, &single, lat) > lat_distribution(TRUE_TDIFF, &single, lat));
    }

    #[test]
    fn recovers_tdiff_from_heights() {
        let set = layer_set();
        let est = calibrate(&set, TdiffObjective::VirtualHeight(LAYER_HEIGHT), 0.34, &SimplexConfig::default());
        assert!(est.converged, "{est:?}");
        assert!((est.tdiff - TRUE_TDIFF).abs() < 1e-3, "{est:?}");
    }
}
