//! Nelder-Mead minimisation.
use crate::tdiff::{SimplexConfig, TdiffEstimate};
use itertools::Itertools;
use nalgebra::DVector;
use tracing::debug;

// Reflection, expansion, contraction and shrink coefficients
const RHO: f64 = 1.0;
const CHI: f64 = 2.0;
const PSI: f64 = 0.5;
const SIGMA: f64 = 0.5;

/// Relative size of the initial simplex, and the absolute size used for zero coordinates.
const NONZDELT: f64 = 0.05;
const ZDELT: f64 = 0.00025;

/// Number of times the kick size is doubled before a minimum is accepted.
const MAX_KICKS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct SimplexResult {
    pub x: DVector<f64>,
    pub fun: f64,
    pub iterations: usize,
    /// Whether the simplex shrank below both tolerances before `maxiter`
    pub converged: bool,
}

/// Local Nelder-Mead search from `x0`. Stops when all vertices lie within `xatol` of the
/// best one and their values within `fatol`, or after `maxiter` iterations. NaN objective
/// values count as +∞.
pub fn nelder_mead<F>(
    mut objective: F,
    x0: &DVector<f64>,
    xatol: f64,
    fatol: f64,
    maxiter: usize,
) -> SimplexResult
where
    F: FnMut(&DVector<f64>) -> f64,
{
    let mut f = |x: &DVector<f64>| {
        let v = objective(x);
        if v.is_nan() {
            f64::INFINITY
        } else {
            v
        }
    };

    let n = x0.len();
    let mut sim: Vec<DVector<f64>> = Vec::with_capacity(n + 1);
    sim.push(x0.clone());
    for k in 0..n {
        let mut y = x0.clone();
        y[k] = if y[k] != 0.0 {
            (1.0 + NONZDELT) * y[k]
        } else {
            ZDELT
        };
        sim.push(y);
    }
    let mut fsim: Vec<f64> = sim.iter().map(&mut f).collect();

    let order = |sim: &mut Vec<DVector<f64>>, fsim: &mut Vec<f64>| {
        let idx: Vec<usize> = (0..fsim.len())
            .sorted_by(|&a, &b| fsim[a].total_cmp(&fsim[b]))
            .collect();
        *sim = idx.iter().map(|&i| sim[i].clone()).collect();
        *fsim = idx.iter().map(|&i| fsim[i]).collect();
    };
    order(&mut sim, &mut fsim);

    let mut iterations = 1;
    let mut converged = false;
    while iterations < maxiter {
        let xspread = sim[1..]
            .iter()
            .map(|v| (v - &sim[0]).amax())
            .fold(0.0, f64::max);
        let fspread = fsim[1..]
            .iter()
            .map(|v| (v - fsim[0]).abs())
            .fold(0.0, f64::max);
        if xspread <= xatol && fspread <= fatol {
            converged = true;
            break;
        }

        let xbar: DVector<f64> = sim[..n].iter().sum::<DVector<f64>>() / n as f64;
        let worst = sim[n].clone();
        let xr = &xbar * (1.0 + RHO) - &worst * RHO;
        let fxr = f(&xr);

        let mut shrink = false;
        if fxr < fsim[0] {
            let xe = &xbar * (1.0 + RHO * CHI) - &worst * (RHO * CHI);
            let fxe = f(&xe);
            if fxe < fxr {
                sim[n] = xe;
                fsim[n] = fxe;
            } else {
                sim[n] = xr;
                fsim[n] = fxr;
            }
        } else if fxr < fsim[n - 1] {
            sim[n] = xr;
            fsim[n] = fxr;
        } else if fxr < fsim[n] {
            // outside contraction
            let xc = &xbar * (1.0 + PSI * RHO) - &worst * (PSI * RHO);
            let fxc = f(&xc);
            if fxc <= fxr {
                sim[n] = xc;
                fsim[n] = fxc;
            } else {
                shrink = true;
            }
        } else {
            // inside contraction
            let xcc = &xbar * (1.0 - PSI) + &worst * PSI;
            let fxcc = f(&xcc);
            if fxcc < fsim[n] {
                sim[n] = xcc;
                fsim[n] = fxcc;
            } else {
                shrink = true;
            }
        }
        if shrink {
            for j in 1..=n {
                sim[j] = &sim[0] + (&sim[j] - &sim[0]) * SIGMA;
                fsim[j] = f(&sim[j]);
            }
        }
        order(&mut sim, &mut fsim);
        iterations += 1;
    }

    SimplexResult {
        x: sim[0].clone(),
        fun: fsim[0],
        iterations,
        converged,
    }
}

/// One-dimensional local search with tolerances derived from `config`.
pub(crate) fn local_min<F>(objective: &mut F, x0: f64, config: &SimplexConfig, maxiter: usize) -> (f64, f64, usize)
where
    F: FnMut(f64) -> f64,
{
    let result = nelder_mead(
        |x: &DVector<f64>| objective(x[0]),
        &DVector::from_element(1, x0),
        config.tdiff_tol * 1e-2,
        config.func_tol * 1e-3,
        maxiter.max(1),
    );
    (result.x[0], result.fun, result.iterations)
}

/// Minimises `objective` from `x0`, restarting the simplex until it settles and then kicking
/// the minimum to either side with a growing step to check that no deeper minimum lies next
/// to it.
///
/// The simplex is restarted from its own result until two successive results agree within
/// `tdiff_tol`. The agreed minimum is then kicked by ±10 `tdiff_tol`, doubling the kick up to
/// five times. A kick that reaches a minimum deeper by more than `func_tol` restarts the search
/// from there; a kick size for which both sides fall back to the minimum accepts it. The
/// estimate is NaN when the iterations of all simplex runs together reach `maxiter`.
pub fn rigerous_simplex<F>(x0: f64, mut objective: F, config: &SimplexConfig) -> TdiffEstimate
where
    F: FnMut(f64) -> f64,
{
    let mut total = 0;
    let (mut x, mut fun, nit) = local_min(&mut objective, x0, config, config.maxiter);
    total += nit;

    'search: loop {
        if total >= config.maxiter {
            debug!(x0, total, "simplex iterations exhausted");
            return TdiffEstimate::exhausted(total);
        }
        let (again, again_fun, nit) = local_min(&mut objective, x, config, config.maxiter - total);
        total += nit;
        let settled = (again - x).abs() <= config.tdiff_tol;
        if again_fun <= fun || !settled {
            (x, fun) = (again, again_fun);
        }
        if !settled {
            continue;
        }

        let mut step = config.tdiff_tol * 10.0;
        for _ in 0..MAX_KICKS {
            let mut stable = true;
            for dx in [step, -step] {
                if total >= config.maxiter {
                    debug!(x0, total, "simplex iterations exhausted while kicking");
                    return TdiffEstimate::exhausted(total);
                }
                let (kx, kfun, nit) = local_min(&mut objective, x + dx, config, config.maxiter - total);
                total += nit;
                if kfun < fun - config.func_tol {
                    debug!(from = x, to = kx, "kick found a deeper minimum");
                    (x, fun) = (kx, kfun);
                    continue 'search;
                }
                stable &= (kx - x).abs() <= config.tdiff_tol;
            }
            if stable {
                break;
            }
            step *= 2.0;
        }

        return TdiffEstimate {
            tdiff: x,
            objective: fun,
            iterations: total,
            converged: true,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    /// Distance of `x` from -π/2 on the circle.
    fn off_minimum(x: f64) -> f64 {
        let d = (x + FRAC_PI_2).rem_euclid(TAU);
        d.min(TAU - d)
    }

    #[test]
    fn sine_from_zero() {
        let est = rigerous_simplex(0.0, f64::sin, &SimplexConfig::default());
        assert!(est.converged);
        assert!(off_minimum(est.tdiff) < 1e-4, "{est:?}");
        assert!((est.objective + 1.0).abs() < 1e-6);
    }

    #[test]
    fn sine_from_pi() {
        let est = rigerous_simplex(PI, f64::sin, &SimplexConfig::default());
        assert!(off_minimum(est.tdiff) < 1e-4, "{est:?}");
        assert!((est.tdiff - 1.5 * PI).abs() < 1e-4);
    }

    #[test]
    fn sine_from_minus_271_degrees() {
        let est = rigerous_simplex((-271.0f64).to_radians(), f64::sin, &SimplexConfig::default());
        assert!(off_minimum(est.tdiff) < 1e-4, "{est:?}");
    }

    #[test]
    fn exhausted_iterations_give_nan() {
        let config = SimplexConfig {
            maxiter: 5,
            ..Default::default()
        };
        let est = rigerous_simplex(0.0, f64::sin, &config);
        assert!(est.tdiff.is_nan());
        assert!(!est.converged);
        assert!(est.iterations >= 5);
    }

    #[test]
    fn nan_values_are_avoided() {
        let est = rigerous_simplex(
            1.0,
            |x| if x < 0.5 { f64::NAN } else { (x - 2.0).powi(2) },
            &SimplexConfig::default(),
        );
        assert!((est.tdiff - 2.0).abs() < 1e-4);
    }

    #[test]
    fn two_dimensional_bowl() {
        let result = nelder_mead(
            |v: &DVector<f64>| (v[0] - 1.0).powi(2) + 4.0 * (v[1] + 0.5).powi(2),
            &DVector::from_vec(vec![0.0, 0.0]),
            1e-8,
            1e-10,
            2000,
        );
        assert!(result.converged);
        assert!((result.x[0] - 1.0).abs() < 1e-5);
        assert!((result.x[1] + 0.5).abs() < 1e-5);
    }
}
