//! Majority vote shared by the azimuthal and temporal continuity passes.
//!
//! Points are visited in windows along an axis (beam number or time). Within a window, the
//! assigned points near each range gate are grouped by propagation path. A FoV holding at
//! least two thirds of a group marks the group's other points as outliers; a group without
//! such a majority marks all of its points as mixed. A point collecting more outlier votes
//! than in-structure and mixed votes together is demoted.
use crate::fov::config::FovConfig;
use crate::fov::{Fov, FovAssignment, FovFlag, PathKey};
use indexmap::IndexMap;
use std::collections::BTreeSet;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tally {
    pub in_structure: u32,
    pub outlier: u32,
    pub mixed: u32,
}

fn tally_group(
    points: &[&mut FovAssignment],
    members: &[usize],
    config: &FovConfig,
    tallies: &mut [Tally],
) {
    let mut paths: IndexMap<PathKey, Vec<usize>> = IndexMap::new();
    for &i in members {
        if let Some(path) = points[i].assigned().and_then(|s| s.path()) {
            paths.entry(path).or_default().push(i);
        }
    }

    for group in paths.into_values() {
        if group.len() < config.min_pnts {
            continue;
        }
        let n = group.len();
        let front = group
            .iter()
            .filter(|&&i| points[i].fov == FovFlag::Front)
            .count();
        let (majority, count) = if 2 * front >= n {
            (Fov::Front, front)
        } else {
            (Fov::Back, n - front)
        };
        if 3 * count < 2 * n {
            for &i in &group {
                tallies[i].mixed += 1;
            }
            continue;
        }
        for &i in &group {
            if points[i].fov == majority.flag() {
                tallies[i].in_structure += 1;
            } else if points[i].solution(majority).is_valid() {
                tallies[i].outlier += 1;
            } else {
                // only realisable in its own FoV
                tallies[i].mixed += 1;
            }
        }
    }
}

/// Demotes every point with more outlier votes than in-structure and mixed votes together.
/// A point returns to its previous FoV at most once; any later demotion leaves it
/// unresolved.
fn demote(points: &mut [&mut FovAssignment], tallies: &[Tally], reinstated: &mut [bool]) -> usize {
    let mut demoted = 0;
    for ((point, tally), reinstated) in points.iter_mut().zip(tallies).zip(reinstated.iter_mut()) {
        if tally.outlier > tally.in_structure + tally.mixed {
            let reinstate = !*reinstated
                && point.past_fov != point.fov
                && point
                    .past_fov
                    .fov()
                    .map_or(true, |f| point.solution(f).is_valid());
            let target = if reinstate {
                *reinstated = true;
                point.past_fov
            } else {
                FovFlag::Unresolved
            };
            point.switch_to(target);
            demoted += 1;
        }
    }
    demoted
}

fn tally_windows(
    points: &[&mut FovAssignment],
    axis: &[f64],
    windows: &[(f64, f64)],
    config: &FovConfig,
) -> Vec<Tally> {
    let mut tallies = vec![Tally::default(); points.len()];
    for &(lo, hi) in windows {
        let inside: Vec<usize> = (0..points.len())
            .filter(|&i| axis[i] >= lo && axis[i] <= hi)
            .filter(|&i| points[i].assigned().is_some_and(|s| s.is_valid()))
            .collect();
        let gates: BTreeSet<usize> = inside.iter().map(|&i| points[i].range_gate).collect();
        for gate in gates {
            let width = config.rg_box_for(gate);
            let members: Vec<usize> = inside
                .iter()
                .copied()
                .filter(|&i| points[i].range_gate.abs_diff(gate) <= width)
                .collect();
            tally_group(points, &members, config, &mut tallies);
        }
    }
    tallies
}

/// Tallies every window `[lo, hi]` of `axis` and demotes the outliers, repeating until a
/// tally demotes nothing. `axis` holds the position of each point along the window axis.
/// Returns the number of demotions.
///
/// Each point is demoted at most twice, so the loop ends, and its result is left unchanged by
/// a second pass.
pub(crate) fn continuity_pass(
    points: &mut [&mut FovAssignment],
    axis: &[f64],
    windows: &[(f64, f64)],
    config: &FovConfig,
) -> usize {
    let mut reinstated = vec![false; points.len()];
    let mut total = 0;
    loop {
        let tallies = tally_windows(points, axis, windows, config);
        let demoted = demote(points, &tallies, &mut reinstated);
        if demoted == 0 {
            return total;
        }
        total += demoted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fov::{FovSolution, Hop, Region};

    fn assigned(range_gate: usize, fov: FovFlag, past_fov: FovFlag) -> FovAssignment {
        let solution = FovSolution {
            elevation: 20.0,
            elevation_error: 0.5,
            phase_ambiguity: 0,
            vheight: 300.0,
            vheight_error: 10.0,
            hop: Some(Hop::HALF),
            region: Some(Region::F),
        };
        FovAssignment {
            front: solution,
            back: solution,
            fov,
            past_fov,
            score: 1.0,
            std: 1.0,
            ..FovAssignment::new(range_gate, 0)
        }
    }

    #[test]
    fn minority_point_is_reinstated() {
        let mut records: Vec<FovAssignment> = (0..5)
            .map(|_| assigned(20, FovFlag::Front, FovFlag::Unresolved))
            .collect();
        records.push(assigned(20, FovFlag::Back, FovFlag::Front));
        let axis: Vec<f64> = (0..6).map(|b| b as f64).collect();
        let mut points: Vec<&mut FovAssignment> = records.iter_mut().collect();
        let demoted = continuity_pass(&mut points, &axis, &[(0.0, 5.0)], &FovConfig::default());
        assert_eq!(demoted, 1);
        assert_eq!(records[5].fov, FovFlag::Front);
        assert_eq!(records[5].past_fov, FovFlag::Back);
        assert!(records[..5].iter().all(|r| r.fov == FovFlag::Front));
    }

    #[test]
    fn minority_without_history_is_unassigned() {
        let mut records: Vec<FovAssignment> = (0..4)
            .map(|_| assigned(20, FovFlag::Back, FovFlag::Unresolved))
            .collect();
        records.push(assigned(21, FovFlag::Front, FovFlag::Unresolved));
        let axis = vec![0.0; 5];
        let mut points: Vec<&mut FovAssignment> = records.iter_mut().collect();
        continuity_pass(&mut points, &axis, &[(0.0, 0.0)], &FovConfig::default());
        assert_eq!(records[4].fov, FovFlag::Unresolved);
        assert_eq!(records[4].past_fov, FovFlag::Front);
    }

    #[test]
    fn demotion_reaches_a_fixed_point() {
        let pattern = [0, 1, 1, 0, 1, 0, 0, 1, 1, 1, 0, 1];
        let mut records: Vec<FovAssignment> = pattern
            .iter()
            .map(|&bit| {
                let (fov, past) = if bit == 1 {
                    (FovFlag::Back, FovFlag::Front)
                } else {
                    (FovFlag::Front, FovFlag::Back)
                };
                assigned(20, fov, past)
            })
            .collect();
        let axis: Vec<f64> = (0..12).map(|b| b as f64).collect();
        let windows: Vec<(f64, f64)> = (0..12).map(|b| (b as f64 - 3.0, b as f64 + 3.0)).collect();
        let config = FovConfig::default();
        let mut points: Vec<&mut FovAssignment> = records.iter_mut().collect();
        continuity_pass(&mut points, &axis, &windows, &config);
        let once = records.clone();
        let mut points: Vec<&mut FovAssignment> = records.iter_mut().collect();
        assert_eq!(continuity_pass(&mut points, &axis, &windows, &config), 0);
        assert_eq!(records, once);
    }

    #[test]
    fn split_groups_are_left_alone() {
        let mut records = vec![
            assigned(20, FovFlag::Front, FovFlag::Unresolved),
            assigned(20, FovFlag::Front, FovFlag::Unresolved),
            assigned(20, FovFlag::Back, FovFlag::Unresolved),
            assigned(20, FovFlag::Back, FovFlag::Unresolved),
        ];
        let before = records.clone();
        let axis = vec![0.0; 4];
        let mut points: Vec<&mut FovAssignment> = records.iter_mut().collect();
        assert_eq!(
            continuity_pass(&mut points, &axis, &[(0.0, 0.0)], &FovConfig::default()),
            0
        );
        assert_eq!(records, before);
    }

    #[test]
    fn points_only_realisable_in_their_fov_survive() {
        let mut records: Vec<FovAssignment> = (0..4)
            .map(|_| assigned(20, FovFlag::Front, FovFlag::Unresolved))
            .collect();
        let mut lonely = assigned(20, FovFlag::Back, FovFlag::Unresolved);
        lonely.front = FovSolution::INVALID;
        records.push(lonely);
        let axis = vec![0.0; 5];
        let mut points: Vec<&mut FovAssignment> = records.iter_mut().collect();
        assert_eq!(
            continuity_pass(&mut points, &axis, &[(0.0, 0.0)], &FovConfig::default()),
            0
        );
        assert_eq!(records[4].fov, FovFlag::Back);
    }
}
