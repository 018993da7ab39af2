use crate::fitting::error::FittingError;
use rmpfit::{MPConfig, MPFitter, MPPar, MPResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianFit {
    pub amplitude: f64,
    pub mean: f64,
    pub sigma: f64,
}

fn gaussian(params: &[f64], x: f64) -> f64 {
    params[0] * (-(x - params[1]).powi(2) / (2.0 * params[2] * params[2])).exp()
}

/// Levenberg-Marquardt fit of a Gaussian to histogram counts using the rmpfit crate
struct GaussianProblem<'a> {
    /// Bin centres
    x: &'a [f64],

    /// Bin counts
    y: &'a [f64],

    /// Amplitude, mean and width limits
    params: Vec<MPPar>,
}

impl<'a> GaussianProblem<'a> {
    fn new(x: &'a [f64], y: &'a [f64]) -> GaussianProblem<'a> {
        let (lo, hi) = x
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let amp_param = MPPar {
            limited_low: true,
            limit_low: 0.0,
            ..Default::default()
        };
        let mean_param = MPPar {
            limited_low: true,
            limit_low: lo,
            limited_up: true,
            limit_up: hi,
            ..Default::default()
        };
        let sigma_param = MPPar {
            limited_low: true,
            limit_low: 1e-3,
            ..Default::default()
        };
        GaussianProblem {
            x,
            y,
            params: vec![amp_param, mean_param, sigma_param],
        }
    }
}

impl MPFitter for GaussianProblem<'_> {
    fn eval(&mut self, params: &[f64], deviates: &mut [f64]) -> MPResult<()> {
        for ((dev, &x), &y) in deviates.iter_mut().zip(self.x).zip(self.y) {
            *dev = y - gaussian(params, x);
        }
        Ok(())
    }

    fn number_of_points(&self) -> usize {
        self.x.len()
    }

    fn config(&self) -> MPConfig {
        MPConfig {
            ftol: 1e-6,
            gtol: 1e-6,
            no_finite_check: false,
            max_fev: 400,
            ..Default::default()
        }
    }

    fn parameters(&self) -> Option<&[MPPar]> {
        Some(&*self.params)
    }
}

/// Fits `amplitude * exp(-(x - mean)² / (2 sigma²))` to the samples, starting from `guess`.
pub fn fit_gaussian(x: &[f64], y: &[f64], guess: GaussianFit) -> Result<GaussianFit, FittingError> {
    if x.len() != y.len() {
        Err(FittingError::InvalidInput(format!(
            "{} bins for {} counts",
            x.len(),
            y.len()
        )))?
    }
    if x.len() < 3 {
        Err(FittingError::InvalidInput(format!(
            "Cannot fit a Gaussian to {} bins",
            x.len()
        )))?
    }
    let mut problem = GaussianProblem::new(x, y);
    let mut params = vec![guess.amplitude, guess.mean, guess.sigma.max(1e-3)];
    problem
        .mpfit(&mut params)
        .map_err(|e| FittingError::BadFit(format!("Error with MPFit: {e}")))?;

    let fit = GaussianFit {
        amplitude: params[0],
        mean: params[1],
        sigma: params[2].abs(),
    };
    if !(fit.amplitude.is_finite() && fit.mean.is_finite() && fit.sigma.is_finite())
        || fit.amplitude <= 0.0
    {
        Err(FittingError::BadFit(format!("Unusable Gaussian {fit:?}")))?
    }
    Ok(fit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_a_peak() {
        let truth = GaussianFit {
            amplitude: 12.0,
            mean: 250.0,
            sigma: 15.0,
        };
        let x: Vec<f64> = (0..30).map(|i| 180.0 + 5.0 * i as f64).collect();
        let y: Vec<f64> = x.iter().map(|&x| gaussian(&[truth.amplitude, truth.mean, truth.sigma], x)).collect();
        let guess = GaussianFit {
            amplitude: 10.0,
            mean: 245.0,
            sigma: 10.0,
        };
        let fit = fit_gaussian(&x, &y, guess).unwrap();
        assert!((fit.mean - 250.0).abs() < 0.1);
        assert!((fit.sigma - 15.0).abs() < 0.1);
        assert!((fit.amplitude - 12.0).abs() < 0.1);
    }

    #[test]
    fn too_few_bins() {
        let guess = GaussianFit {
            amplitude: 1.0,
            mean: 0.0,
            sigma: 1.0,
        };
        assert!(matches!(
            fit_gaussian(&[0.0, 1.0], &[1.0, 2.0], guess),
            Err(FittingError::InvalidInput(_))
        ));
    }
}
