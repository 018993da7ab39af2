//! Temporal continuity of FoV assignments along one beam direction.
use crate::fov::config::FovConfig;
use crate::fov::continuity::continuity_pass;
use crate::fov::resolve::FovBeam;
use crate::fov::FovAssignment;
use itertools::Itertools;
use tracing::{debug, info};

/// Sliding windows of `width` seconds centred on each sounding of `times`, which are seconds
/// since the first sounding. Windows reaching past either end of the series are skipped.
fn time_windows(times: &[f64], width: f64) -> Vec<(f64, f64)> {
    let Some(last) = times.iter().copied().reduce(f64::max) else {
        return vec![];
    };
    let half = width / 2.0;
    times
        .iter()
        .copied()
        .sorted_by(f64::total_cmp)
        .dedup()
        .map(|t| (t - half, t + half))
        .filter(|&(lo, hi)| lo >= 0.0 && hi <= last)
        .collect()
}

/// Demotes FoV assignments that disagree with the majority of the same beam direction over a
/// window of `config.ut_box`. `series` holds the beams of one station, channel and beam number
/// in any order. Only runs when `config.step` is 6 or more.
pub fn resolve_temporal(series: &mut [&mut FovBeam], config: &FovConfig) {
    if config.step < 6 {
        return;
    }
    let Some(start) = series.iter().map(|b| b.beam.time).min() else {
        return;
    };
    let times: Vec<f64> = series
        .iter()
        .map(|b| (b.beam.time - start).num_milliseconds() as f64 / 1000.0)
        .collect();
    let width = config.ut_box.num_milliseconds() as f64 / 1000.0;
    let windows = time_windows(&times, width);
    if windows.is_empty() {
        info!(
            beams = series.len(),
            span = times.iter().copied().fold(0.0, f64::max),
            "beam series shorter than the temporal window"
        );
        return;
    }

    let axis: Vec<f64> = series
        .iter()
        .zip(&times)
        .flat_map(|(b, &t)| std::iter::repeat(t).take(b.fov.len()))
        .collect();
    let mut points: Vec<&mut FovAssignment> = series
        .iter_mut()
        .flat_map(|b| b.fov.iter_mut())
        .collect();
    let demoted = continuity_pass(&mut points, &axis, &windows, config);
    if demoted > 0 {
        debug!(demoted, "temporal continuity demoted points");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_windows_are_skipped() {
        let times = [0.0, 60.0, 120.0, 180.0, 240.0];
        assert_eq!(time_windows(&times, 120.0), vec![(0.0, 120.0), (60.0, 180.0), (120.0, 240.0)]);
        assert!(time_windows(&times, 600.0).is_empty());
        assert!(time_windows(&[], 600.0).is_empty());
    }

    #[test]
    fn repeated_times_give_one_window() {
        let times = [0.0, 30.0, 30.0, 60.0];
        assert_eq!(time_windows(&times, 60.0), vec![(0.0, 60.0)]);
    }
}
