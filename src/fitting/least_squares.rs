use crate::fitting::error::FittingError;

/// Relative residual spread below which a fit counts as exact
const PERFECT_FIT_TOL: f64 = 1e-9;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct LeastSquaresValues {
    pub sum: f64,
    pub sum_x: f64,
    pub sum_y: f64,
    pub sum_xx: f64,
    pub sum_xy: f64,
    pub delta: f64,
    pub intercept: f64,
    pub slope: f64,
    /// y - (intercept + slope * x) for every sample
    pub residuals: Vec<f64>,
    /// Population standard deviation of the residuals
    pub residual_std: f64,
}

impl LeastSquaresValues {
    /// Constant model through the mean of `y_vals`, used when the abscissae have no spread.
    pub fn mean_fit(y_vals: &[f64]) -> Result<LeastSquaresValues, FittingError> {
        if y_vals.is_empty() {
            Err(FittingError::InvalidInput("No samples to fit".to_string()))?
        }
        let mut lsq = LeastSquaresValues {
            sum: y_vals.len() as f64,
            sum_y: y_vals.iter().sum(),
            ..Default::default()
        };
        lsq.intercept = lsq.sum_y / lsq.sum;
        lsq.calculate_residuals(&vec![0.0; y_vals.len()], y_vals);
        Ok(lsq)
    }

    /// |residual| / residual std of each sample. A perfect fit scores every sample 0.
    pub fn z_scores(&self) -> Vec<f64> {
        self.residuals
            .iter()
            .map(|r| {
                if self.residual_std > 0.0 {
                    r.abs() / self.residual_std
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn calculate_residuals(&mut self, x_vals: &[f64], y_vals: &[f64]) {
        self.residuals = x_vals
            .iter()
            .zip(y_vals)
            .map(|(x, y)| y - (self.intercept + self.slope * x))
            .collect();
        let n = self.residuals.len() as f64;
        let mean = self.residuals.iter().sum::<f64>() / n;
        let std = (self.residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt();
        // spreads at the round-off level of the data are a perfect fit
        let scale = y_vals.iter().fold(1.0f64, |m, y| m.max(y.abs()));
        self.residual_std = if std <= PERFECT_FIT_TOL * scale { 0.0 } else { std };
    }
}

/// Unweighted two-parameter line fit of `y_vals` against `x_vals`.
///
/// Fails with [`FittingError::Degenerate`] when all abscissae are equal; callers decide
/// whether [`LeastSquaresValues::mean_fit`] is an acceptable substitute.
pub fn line_fit(x_vals: &[f64], y_vals: &[f64]) -> Result<LeastSquaresValues, FittingError> {
    if x_vals.len() != y_vals.len() {
        Err(FittingError::InvalidInput(format!(
            "{} abscissae for {} ordinates",
            x_vals.len(),
            y_vals.len()
        )))?
    }
    if x_vals.len() < 2 {
        Err(FittingError::InvalidInput(format!(
            "Cannot fit a line to {} samples",
            x_vals.len()
        )))?
    }

    let mut lsq = LeastSquaresValues::default();
    for (&x, &y) in x_vals.iter().zip(y_vals) {
        lsq.sum += 1.0;
        lsq.sum_x += x;
        lsq.sum_y += y;
        lsq.sum_xx += x * x;
        lsq.sum_xy += x * y;
    }
    lsq.delta = lsq.sum * lsq.sum_xx - lsq.sum_x * lsq.sum_x;
    if lsq.delta.abs() <= f64::EPSILON * lsq.sum * lsq.sum_xx {
        Err(FittingError::Degenerate(
            "All abscissae are equal".to_string(),
        ))?
    }
    lsq.intercept = (lsq.sum_xx * lsq.sum_y - lsq.sum_x * lsq.sum_xy) / lsq.delta;
    lsq.slope = (lsq.sum * lsq.sum_xy - lsq.sum_x * lsq.sum_y) / lsq.delta;
    lsq.calculate_residuals(x_vals, y_vals);
    Ok(lsq)
}
