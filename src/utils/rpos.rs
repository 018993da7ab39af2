//! Radar position helpers: slant range of a range gate, beam pointing and great-circle
//! projection of a field point.
use crate::utils::constants::{KM_PER_US, WGS84_A, WGS84_B};
use std::f64::consts::PI;

/// Calculates the slant range to a range gate in km.
/// `first_range` and `range_sep` are in km, `rx_rise` and `range_edge` in microseconds.
/// Called slant_range in cnvtcoord.c of RST.
pub fn slant_range(
    first_range: f64,
    range_sep: f64,
    rx_rise: f64,
    range_edge: f64,
    range_gate: usize,
) -> f64 {
    let lag_to_first_range = first_range / KM_PER_US; // microseconds
    let sample_separation = range_sep / KM_PER_US; // microseconds

    (lag_to_first_range - rx_rise + (range_gate as f64 * sample_separation) + range_edge)
        * KM_PER_US
}

/// Deviation of a beam from boresight in degrees, for a radar with `max_beams` beams
/// separated by `beam_separation` degrees.
pub fn beam_offset(beam_num: i16, max_beams: i16, beam_separation: f64, boresight_shift: f64) -> f64 {
    let offset = max_beams as f64 / 2.0 - 0.5;
    beam_separation * (beam_num as f64 - offset) + boresight_shift
}

/// Geocentric radius of the WGS84 ellipsoid at geodetic latitude `lat` (degrees), in km.
pub fn earth_radius(lat: f64) -> f64 {
    let phi = lat * PI / 180.0;
    let (a, b) = (WGS84_A, WGS84_B);
    let num = (a * a * phi.cos()).powi(2) + (b * b * phi.sin()).powi(2);
    let den = (a * phi.cos()).powi(2) + (b * phi.sin()).powi(2);
    (num / den).sqrt()
}

/// Bearing (degrees East of North) of a beam cell seen at `elevation` degrees. The beam is a
/// cone about the array axis, so the ground azimuth moves away from boresight as the elevation
/// grows. Backward-looking cells mirror the bearing about the array axis.
/// Adapted from the azimuth estimate in fldpnth of RST.
pub fn pointing_azimuth(boresight: f64, offset: f64, elevation: f64, back: bool) -> f64 {
    let off_boresight_rad = offset * PI / 180.0;
    let xel = elevation * PI / 180.0;
    let cos_sq = off_boresight_rad.cos() * off_boresight_rad.cos() - xel.sin() * xel.sin();
    let tan_azimuth = if cos_sq <= 0.0 {
        1e32
    } else {
        (off_boresight_rad.sin() * off_boresight_rad.sin() / cos_sq).sqrt()
    };
    let azimuth_rad = if off_boresight_rad > 0.0 {
        tan_azimuth.atan()
    } else {
        -(tan_azimuth.atan())
    };
    let azimuth = azimuth_rad * 180.0 / PI;

    if back {
        boresight + 180.0 - azimuth
    } else {
        boresight + azimuth
    }
}

/// Calculate a destination point (lat, lon) from a start point, a great-circle distance in km
/// and a bearing in degrees East of North, on a sphere of radius `radius` km.
/// Called fldpnt_sph in invmag.c of RST
pub fn fieldpoint_sphere(
    start_lat: f64,
    start_lon: f64,
    radius: f64,
    bearing: f64,
    range: f64,
) -> (f64, f64) {
    // Solving spherical triangle
    let c_side = (90.0 - start_lat) * PI / 180.0;
    let bearing = bearing.rem_euclid(360.0);
    let a_angle = if bearing > 180.0 {
        (bearing - 360.0) * PI / 180.0
    } else {
        bearing * PI / 180.0
    };

    let b_side = range / radius;
    let arg = (b_side.cos() * c_side.cos() + b_side.sin() * c_side.sin() * a_angle.cos())
        .clamp(-1.0, 1.0);
    let a_side = arg.acos();

    let arg = ((b_side.cos() - a_side.cos() * c_side.cos()) / (a_side.sin() * c_side.sin()))
        .clamp(-1.0, 1.0);
    let mut b_angle = arg.acos();
    if a_angle < 0.0 {
        b_angle = -b_angle;
    }

    let end_lat = 90.0 - (a_side * 180.0 / PI);
    let mut end_lon = start_lon + b_angle * 180.0 / PI;
    if end_lon < 0.0 {
        end_lon += 360.0;
    } else if end_lon > 360.0 {
        end_lon -= 360.0;
    }

    (end_lat, end_lon)
}

/// Great-circle ground distance (km) from the radar to the point below a reflection at
/// virtual height `height`, seen at `elevation` degrees and one-way slant distance `distance`.
pub fn ground_distance(distance: f64, elevation: f64, height: f64, radius: f64) -> f64 {
    let el = elevation * PI / 180.0;
    radius * (distance * el.cos() / (radius + height)).asin()
}
