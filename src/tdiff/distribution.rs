//! Global minimum of an objective that repeats with the phase period of tdiff.
use crate::tdiff::simplex::rigerous_simplex;
use crate::tdiff::{SimplexConfig, TdiffEstimate};
use itertools::Itertools;
use tracing::debug;

/// Upper limit on the number of grid points searched between two candidate minima.
const MAX_GRID: usize = 200;

/// Shift of tdiff (microseconds) that changes the interferometer phase by one full cycle at
/// `tx_freq_khz`.
pub fn phase_period(tx_freq_khz: f64) -> f64 {
    1e3 / tx_freq_khz
}

/// Finds the global minimum of `objective` near `x0` when the objective is roughly periodic
/// in tdiff with period `period`.
///
/// The local minimum from `x0` is found first, then the minima one period above and below it.
/// If the lowest candidates are equal within `func_tol` the one closest to `x0` wins.
/// Otherwise the lowest wins, unless a grid between the two lowest finds a point deeper by more
/// than `func_tol`, in which case the search is refined from that point. Two candidates less
/// than two `tdiff_tol` apart bracket nothing and the lowest is kept.
pub fn distribution_min<F>(x0: f64, period: f64, mut objective: F, config: &SimplexConfig) -> TdiffEstimate
where
    F: FnMut(f64) -> f64,
{
    let local = rigerous_simplex(x0, &mut objective, config);
    let mut iterations = local.iterations;
    if local.tdiff.is_nan() {
        return TdiffEstimate::exhausted(iterations);
    }

    let mut candidates = vec![local];
    for shift in [period, -period] {
        let est = rigerous_simplex(local.tdiff + shift, &mut objective, config);
        iterations += est.iterations;
        if est.tdiff.is_nan() {
            debug!(start = local.tdiff + shift, "no minimum one period away");
        } else {
            candidates.push(est);
        }
    }
    let best = settle_candidates(candidates, x0, &mut objective, config);
    TdiffEstimate {
        iterations: iterations + best.iterations,
        ..best
    }
}

/// Interior points of a grid over `[a, c]` with spacing near 10 `tdiff_tol`, at most
/// [`MAX_GRID`] intervals. `None` when the bracket is too narrow to hold a distinct minimum.
fn bracket_grid(a: f64, c: f64, tdiff_tol: f64) -> Option<Vec<f64>> {
    if c - a <= 2.0 * tdiff_tol {
        return None;
    }
    let steps = (((c - a) / (tdiff_tol * 10.0)).ceil() as usize).clamp(2, MAX_GRID);
    Some(
        (1..steps)
            .map(|i| a + (c - a) * i as f64 / steps as f64)
            .collect(),
    )
}

/// Picks the global minimum among local minima found from different starts. The iterations of
/// the returned estimate are only those spent here.
fn settle_candidates<F>(
    candidates: Vec<TdiffEstimate>,
    x0: f64,
    objective: &mut F,
    config: &SimplexConfig,
) -> TdiffEstimate
where
    F: FnMut(f64) -> f64,
{
    let ranked: Vec<TdiffEstimate> = candidates
        .into_iter()
        .sorted_by(|a, b| a.objective.total_cmp(&b.objective))
        .collect();
    let Some(&best) = ranked.first() else {
        return TdiffEstimate::exhausted(0);
    };
    let best = TdiffEstimate { iterations: 0, ..best };
    let Some(&second) = ranked.get(1) else {
        return best;
    };

    if second.objective - best.objective <= config.func_tol {
        let closest = ranked
            .iter()
            .filter(|c| c.objective - best.objective <= config.func_tol)
            .min_by(|a, b| (a.tdiff - x0).abs().total_cmp(&(b.tdiff - x0).abs()))
            .copied()
            .unwrap_or(best);
        return TdiffEstimate {
            iterations: 0,
            ..closest
        };
    }

    let (a, c) = if best.tdiff < second.tdiff {
        (best.tdiff, second.tdiff)
    } else {
        (second.tdiff, best.tdiff)
    };
    let Some(grid) = bracket_grid(a, c, config.tdiff_tol) else {
        debug!(a, c, "candidate minima too close to bracket");
        return best;
    };
    let deepest = grid
        .into_iter()
        .map(|x| (x, objective(x)))
        .filter(|(_, f)| !f.is_nan())
        .min_by(|p, q| p.1.total_cmp(&q.1));
    match deepest {
        Some((x, f)) if f < best.objective - config.func_tol => {
            debug!(x, f, "deeper point between candidate minima");
            let refined = rigerous_simplex(x, &mut *objective, config);
            if refined.objective < best.objective {
                refined
            } else {
                TdiffEstimate {
                    iterations: refined.iterations,
                    ..best
                }
            }
        }
        _ => best,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{PI, TAU};

    #[test]
    fn lowest_period_wins() {
        let objective = |x: f64| -(TAU * x).cos() + 0.05 * x * x;
        let est = distribution_min(0.9, 1.0, objective, &SimplexConfig::default());
        assert!(est.converged);
        assert!(est.tdiff.abs() < 1e-3, "{est:?}");
        assert!((est.objective + 1.0).abs() < 1e-6);
    }

    #[test]
    fn equal_minima_prefer_the_closest() {
        let objective = |x: f64| -(TAU * x).cos();
        let est = distribution_min(0.3, 1.0, objective, &SimplexConfig::default());
        assert!(est.tdiff.abs() < 1e-3, "{est:?}");
        let est = distribution_min(1.8, 1.0, objective, &SimplexConfig::default());
        assert!((est.tdiff - 2.0).abs() < 1e-3, "{est:?}");
    }

    #[test]
    fn deeper_minimum_between_candidates_is_found() {
        // minima every 2 µs on a tilted floor, with a narrow deeper well at 1 µs
        let objective = |x: f64| {
            -(PI * x).cos() + 0.1 * (x - 0.5).powi(2) - 3.0 * (-(x - 1.0).powi(2) / 0.01).exp()
        };
        let est = distribution_min(0.2, 2.0, objective, &SimplexConfig::default());
        assert!((est.tdiff - 1.0).abs() < 1e-2, "{est:?}");
        assert!(est.objective < -1.9);
    }

    fn candidate(tdiff: f64, objective: f64) -> TdiffEstimate {
        TdiffEstimate {
            tdiff,
            objective,
            iterations: 40,
            converged: true,
        }
    }

    #[test]
    fn narrow_bracket_keeps_the_lowest() {
        let config = SimplexConfig::default();
        assert_eq!(bracket_grid(0.0, 1.5e-4, config.tdiff_tol), None);
        let mut calls = 0;
        // a deeper point sits between the two, but they are too close to bracket it
        let mut objective = |x: f64| {
            calls += 1;
            if (x - 0.75e-4).abs() < 1e-5 {
                -10.0
            } else {
                0.0
            }
        };
        let best = settle_candidates(
            vec![candidate(1.5e-4, -0.5), candidate(0.0, -0.501)],
            1.5e-4,
            &mut objective,
            &config,
        );
        assert_eq!(best.tdiff, 0.0);
        assert_eq!(best.objective, -0.501);
        assert_eq!(best.iterations, 0);
        assert_eq!(calls, 0);
    }

    #[test]
    fn wide_bracket_grid_is_capped() {
        let config = SimplexConfig::default();
        let grid = bracket_grid(-5.0, 5.0, config.tdiff_tol).unwrap();
        assert_eq!(grid.len(), MAX_GRID - 1);
        assert!(grid.iter().all(|&x| x > -5.0 && x < 5.0));
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
        // the smallest bracket still gets a midpoint
        assert_eq!(bracket_grid(0.0, 3e-4, config.tdiff_tol), Some(vec![1.5e-4]));

        let mut calls = 0;
        let mut objective = |_: f64| {
            calls += 1;
            1.0
        };
        let best = settle_candidates(
            vec![candidate(5.0, 0.5), candidate(-5.0, 0.0)],
            0.0,
            &mut objective,
            &config,
        );
        assert_eq!(best.tdiff, -5.0);
        assert_eq!(calls, MAX_GRID - 1);
    }

    #[test]
    fn period_of_phase() {
        assert!((phase_period(10000.0) - 0.1).abs() < 1e-12);
    }
}
