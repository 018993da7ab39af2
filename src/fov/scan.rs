//! Per-scan FoV selection.
//!
//! Within one propagation mode the elevation decreases smoothly with range, so the FoV whose
//! elevations line up across neighbouring range gates of all beams is taken as the true one.
//! Each point keeps the best (lowest) z-score and residual spread found for it; later
//! candidates must beat both to replace the assignment.
use crate::fitting::error::FittingError;
use crate::fitting::least_squares::{line_fit, LeastSquaresValues};
use crate::fov::altitude::{band_index, select_alt_groups};
use crate::fov::config::FovConfig;
use crate::fov::continuity::continuity_pass;
use crate::fov::resolve::FovBeam;
use crate::fov::{Fov, FovAssignment, FovFlag, PathKey};
use indexmap::IndexMap;
use itertools::Itertools;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// (point, FoV, |z-score|, residual std)
type Candidate = (usize, Fov, f64, f64);

fn has_solution(point: &FovAssignment) -> bool {
    point.front.is_valid() || point.back.is_valid()
}

/// Fits elevation against range gate within each altitude band of `members`, which all hold
/// valid `fov` solutions on the path `path`. Sub-groups whose elevation rises with range are
/// discarded.
fn score_path(
    points: &[&mut FovAssignment],
    members: &[usize],
    fov: Fov,
    path: PathKey,
    vh_box: f64,
    config: &FovConfig,
) -> Vec<Candidate> {
    let Some(region_band) = config.regions.band(path.1) else {
        return vec![];
    };
    let heights: Vec<f64> = members
        .iter()
        .map(|&i| points[i].solution(fov).vheight)
        .collect();
    let bands = select_alt_groups(
        &heights,
        region_band.min,
        region_band.max,
        vh_box,
        config.min_pnts,
    );
    let by_band = members
        .iter()
        .zip(&heights)
        .filter_map(|(&i, &h)| band_index(&bands, h).map(|b| (b, i)))
        .into_group_map();

    let mut candidates = vec![];
    for (band, sub) in by_band.into_iter().sorted_by_key(|(b, _)| *b) {
        if sub.len() < config.min_pnts {
            continue;
        }
        let x: Vec<f64> = sub.iter().map(|&i| points[i].range_gate as f64).collect();
        let y: Vec<f64> = sub
            .iter()
            .map(|&i| points[i].solution(fov).elevation)
            .collect();
        let fit = match line_fit(&x, &y) {
            Ok(fit) => fit,
            Err(FittingError::Degenerate(_)) => match LeastSquaresValues::mean_fit(&y) {
                Ok(fit) => fit,
                Err(_) => continue,
            },
            Err(e) => {
                debug!(band, "elevation fit failed: {e}");
                continue;
            }
        };
        if fit.slope > 0.0 {
            debug!(?fov, hop = %path.0, region = %path.1, slope = fit.slope, "elevation rises with range");
            continue;
        }
        candidates.extend(
            sub.iter()
                .zip(fit.z_scores())
                .map(|(&i, z)| (i, fov, z, fit.residual_std)),
        );
    }
    candidates
}

/// Scores both FoVs of every point of `window` by path.
fn score_window(
    points: &[&mut FovAssignment],
    window: &[usize],
    vh_box: f64,
    config: &FovConfig,
) -> Vec<Candidate> {
    let mut candidates = vec![];
    for fov in Fov::BOTH {
        let mut paths: IndexMap<PathKey, Vec<usize>> = IndexMap::new();
        for &i in window {
            let solution = points[i].solution(fov);
            if let Some(path) = solution.path().filter(|_| solution.is_valid()) {
                paths.entry(path).or_default().push(i);
            }
        }
        for (path, members) in paths {
            if members.len() >= config.min_pnts {
                candidates.extend(score_path(points, &members, fov, path, vh_box, config));
            }
        }
    }
    candidates
}

/// Scores every point against the points of all beams in its range-gate window.
fn score_scan(points: &mut [&mut FovAssignment], config: &FovConfig) {
    let cells: Vec<usize> = (0..points.len())
        .filter(|&i| has_solution(points[i]))
        .collect();
    let gates: BTreeSet<usize> = cells.iter().map(|&i| points[i].range_gate).collect();
    for gate in gates {
        let width = config.rg_box_for(gate);
        let window: Vec<usize> = cells
            .iter()
            .copied()
            .filter(|&i| points[i].range_gate.abs_diff(gate) <= width)
            .collect();
        if window.len() < config.min_pnts {
            info!(gate, points = window.len(), "too few points in range gate window");
            continue;
        }
        for (i, fov, z, std) in score_window(points, &window, config.vh_box_for(gate), config) {
            points[i].offer(fov, z, std, config.max_score, config.max_std);
        }
    }
}

/// Resolves points the scan-wide scoring never scored. Near the radar, a point realistic in
/// only one FoV takes that FoV; otherwise it is scored against its own beam over a doubled
/// range-gate window.
fn single_beam_fallback(points: &mut [&mut FovAssignment], beam_of: &[usize], config: &FovConfig) {
    let targets: Vec<usize> = (0..points.len())
        .filter(|&i| {
            points[i].fov == FovFlag::Unresolved
                && !points[i].score.is_finite()
                && has_solution(points[i])
        })
        .collect();

    for i in targets {
        let (front_ok, back_ok) = (points[i].front.is_valid(), points[i].back.is_valid());
        let gate = points[i].range_gate;
        if front_ok != back_ok && gate < config.near_rg {
            let fov = if front_ok { Fov::Front } else { Fov::Back };
            points[i].offer(fov, 0.0, 0.0, config.max_score, config.max_std);
            continue;
        }

        let width = 2 * config.rg_box_for(gate);
        let window: Vec<usize> = (0..points.len())
            .filter(|&j| beam_of[j] == beam_of[i])
            .filter(|&j| points[j].range_gate.abs_diff(gate) <= width && has_solution(points[j]))
            .collect();
        if window.len() < config.min_pnts {
            info!(gate, points = window.len(), "too few points for single beam scoring");
            continue;
        }
        for fov in Fov::BOTH {
            let target = points[i].solution(fov);
            let Some(path) = target.path().filter(|_| target.is_valid()) else {
                continue;
            };
            let members: Vec<usize> = window
                .iter()
                .copied()
                .filter(|&j| {
                    let s = points[j].solution(fov);
                    s.is_valid() && s.path() == Some(path)
                })
                .collect();
            if members.len() < config.min_pnts {
                continue;
            }
            let candidates = score_path(points, &members, fov, path, config.vh_box_for(gate), config);
            for (j, fov, z, std) in candidates {
                if j == i {
                    points[i].offer(fov, z, std, config.max_score, config.max_std);
                }
            }
        }
    }
}

/// Demotes points whose FoV disagrees with the majority of nearby beams on the same path.
fn azimuthal_veto(points: &mut [&mut FovAssignment], beam_nums: &[i16], config: &FovConfig) {
    let axis: Vec<f64> = beam_nums.iter().map(|&b| b as f64).collect();
    let half_width = config.min_pnts as f64;
    let windows: Vec<(f64, f64)> = beam_nums
        .iter()
        .unique()
        .sorted()
        .map(|&b| (b as f64 - half_width, b as f64 + half_width))
        .collect();
    let demoted = continuity_pass(points, &axis, &windows, config);
    if demoted > 0 {
        debug!(demoted, "azimuthal continuity demoted points");
    }
}

/// Assigns a FoV to the points of one scan. Which stages run is set by `config.step`: scoring
/// from 3, the single-beam fallback from 4 and the azimuthal veto from 5.
///
/// Running the resolver again on its own output changes nothing.
pub fn resolve_scan(beams: &mut [FovBeam], config: &FovConfig) {
    if config.step < 3 {
        return;
    }
    let (beam_of, beam_nums): (Vec<usize>, Vec<i16>) = beams
        .iter()
        .enumerate()
        .flat_map(|(b, beam)| std::iter::repeat((b, beam.beam.beam_num)).take(beam.fov.len()))
        .unzip();
    let mut points: Vec<&mut FovAssignment> =
        beams.iter_mut().flat_map(|b| b.fov.iter_mut()).collect();

    score_scan(&mut points, config);
    if config.step >= 4 {
        single_beam_fallback(&mut points, &beam_of, config);
    }
    if config.step >= 5 {
        azimuthal_veto(&mut points, &beam_nums, config);
    }
}
