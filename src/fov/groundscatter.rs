//! Confirmation of the upstream ground scatter flag.
//!
//! The fitting stage flags ground scatter from low velocity and spectral width alone, which
//! also catches slow ionospheric echoes. A flagged point is kept as ground scatter only if its
//! power and range are plausible and most of its range neighbours are ground scatter too.
use crate::fov::vheight::calc_distance;
use crate::fov::Hop;
use crate::utils::scan::{Beam, Point};

/// Reflection distance (km) below which ground scatter would need a virtual height under
/// ~110 km at 45° elevation.
const MIN_GS_DISTANCE: f64 = 78.0;

#[derive(Debug, Clone, PartialEq)]
pub struct GroundScatterConfig {
    /// First range gate of the near-range power cap
    pub min_rg: usize,
    /// Last range gate of the near-range power cap
    pub max_rg: usize,
    /// Half width of the neighbourhood vote, in range gates
    pub rg_box: usize,
    /// Power ceiling inside the near-range window, in dB
    pub max_power: f64,
    /// Minimum fraction of ground scatter candidates in the neighbourhood
    pub gs_tol: f64,
    /// Minimum number of points in the neighbourhood
    pub nmin: usize,
}

impl Default for GroundScatterConfig {
    fn default() -> Self {
        GroundScatterConfig {
            min_rg: 10,
            max_rg: 30,
            rg_box: 5,
            max_power: 5.0,
            gs_tol: 0.5,
            nmin: 5,
        }
    }
}

fn is_candidate(point: &Point, beam: &Beam, config: &GroundScatterConfig) -> bool {
    if point.groundscatter != 1 || !(point.power_lin >= 0.0 && point.power_sigma >= 0.0) {
        return false;
    }
    if calc_distance(beam.slant_range(point.range_gate), Hop::ONE) <= MIN_GS_DISTANCE {
        return false;
    }
    let near = (config.min_rg..=config.max_rg).contains(&point.range_gate);
    !(near && (point.power_lin > config.max_power || point.power_sigma > config.max_power))
}

/// Indices of the points of `beam` confirmed as ground scatter.
pub fn select_beam_groundscatter(beam: &Beam, config: &GroundScatterConfig) -> Vec<usize> {
    let candidates: Vec<bool> = beam
        .points
        .iter()
        .map(|p| is_candidate(p, beam, config))
        .collect();

    (0..beam.points.len())
        .filter(|&i| candidates[i])
        .filter(|&i| {
            let rg = beam.points[i].range_gate;
            let (total, gs) = beam
                .points
                .iter()
                .zip(&candidates)
                .filter(|(p, _)| p.range_gate.abs_diff(rg) <= config.rg_box)
                .fold((0usize, 0usize), |(n, g), (_, &c)| (n + 1, g + c as usize));
            total >= config.nmin && gs as f64 >= config.gs_tol * total as f64
        })
        .collect()
}

/// Ground scatter flags of `beam` after confirmation: 1 for confirmed points, -1
/// (indeterminate) for points flagged upstream but not confirmed, the upstream flag otherwise.
pub fn update_groundscatter_flags(beam: &Beam, config: &GroundScatterConfig) -> Vec<i8> {
    let confirmed = select_beam_groundscatter(beam, config);
    beam.points
        .iter()
        .enumerate()
        .map(|(i, p)| match p.groundscatter {
            1 if confirmed.contains(&i) => 1,
            1 => -1,
            flag => flag,
        })
        .collect()
}
