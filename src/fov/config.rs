use crate::error::FovError;
use crate::fov::geometry::GeometryErrors;
use crate::fov::groundscatter::GroundScatterConfig;
use crate::fov::propagation::RegionBounds;
use crate::fov::vheight::VirtualHeightModel;
use chrono::Duration;

type Result<T> = std::result::Result<T, FovError>;

/// Largest `max_hop` accepted by [`FovConfig::validate`]
pub const MAX_HOP: f64 = 10.0;

/// Settings of one FoV resolution run.
///
/// The range-gate tables are indexed together: points below `max_rg[i]` use a window of
/// ±`rg_box[i]` gates and altitude bands of `vh_box[i]` km. Gates past the last entry use the
/// last one.
#[derive(Debug, Clone, PartialEq)]
pub struct FovConfig {
    /// Minimum number of points for any statistical test
    pub min_pnts: usize,
    pub regions: RegionBounds,
    pub rg_box: Vec<usize>,
    pub vh_box: Vec<f64>,
    pub max_rg: Vec<usize>,
    pub max_hop: f64,
    /// Width of the sliding window of the temporal continuity pass
    pub ut_box: Duration,
    /// Apply the propagation realism test during the hop search
    pub ptest: bool,
    /// Discard points with an indeterminate ground scatter flag instead of treating them
    /// as ionospheric scatter
    pub strict_gs: bool,
    /// Range gates below which a single realistic FoV is assigned outright
    pub near_rg: usize,
    pub max_score: f64,
    /// Largest residual standard deviation of an elevation fit, in degrees
    pub max_std: f64,
    /// Last stage to run: 1 elevations only, 2 ground scatter refinement, 3 scan scoring,
    /// 4 single-beam fallback, 5 azimuthal veto, 6 temporal veto
    pub step: u8,
    pub alias: u8,
    /// Height model for beams without phase lags
    pub height_model: VirtualHeightModel,
    pub geometry_errors: GeometryErrors,
    /// Replaces the hardware tdiff (microseconds) when set
    pub tdiff_override: Option<f64>,
    pub groundscatter: GroundScatterConfig,
}

impl Default for FovConfig {
    fn default() -> Self {
        FovConfig {
            min_pnts: 3,
            regions: RegionBounds::default(),
            rg_box: vec![2, 5, 10, 20],
            vh_box: vec![50.0, 50.0, 50.0, 150.0],
            max_rg: vec![5, 25, 40, 76],
            max_hop: 3.0,
            ut_box: Duration::minutes(20),
            ptest: true,
            strict_gs: false,
            near_rg: 10,
            max_score: 3.0,
            max_std: 3.0,
            step: 6,
            alias: 0,
            height_model: VirtualHeightModel::default(),
            geometry_errors: GeometryErrors::default(),
            tdiff_override: None,
            groundscatter: GroundScatterConfig::default(),
        }
    }
}

impl FovConfig {
    fn table_index(&self, range_gate: usize) -> usize {
        self.max_rg
            .iter()
            .position(|&m| range_gate < m)
            .unwrap_or(self.max_rg.len().saturating_sub(1))
    }

    /// Half width, in range gates, of the window centred on `range_gate`.
    pub fn rg_box_for(&self, range_gate: usize) -> usize {
        self.rg_box[self.table_index(range_gate)]
    }

    /// Width of the uniform altitude bands, in km, for a window centred on `range_gate`.
    pub fn vh_box_for(&self, range_gate: usize) -> f64 {
        self.vh_box[self.table_index(range_gate)]
    }

    /// Checks the configuration before a run.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(FovError::InvalidConfig(msg)) };

        if self.min_pnts == 0 {
            invalid("min_pnts must be at least 1".to_string())?
        }
        if self.rg_box.is_empty()
            || self.rg_box.len() != self.vh_box.len()
            || self.rg_box.len() != self.max_rg.len()
        {
            invalid(format!(
                "rg_box, vh_box and max_rg must have the same non-zero length, got {}, {} and {}",
                self.rg_box.len(),
                self.vh_box.len(),
                self.max_rg.len()
            ))?
        }
        if self.rg_box.iter().any(|&b| b == 0) {
            invalid(format!("rg_box entries must be positive: {:?}", self.rg_box))?
        }
        if self.vh_box.iter().any(|&b| !(b.is_finite() && b > 0.0)) {
            invalid(format!("vh_box entries must be positive: {:?}", self.vh_box))?
        }
        if self.max_rg.windows(2).any(|w| w[1] <= w[0]) {
            invalid(format!("max_rg must be increasing: {:?}", self.max_rg))?
        }
        if !(0.5..=MAX_HOP).contains(&self.max_hop) {
            invalid(format!(
                "max_hop must be between 0.5 and {MAX_HOP}, got {}",
                self.max_hop
            ))?
        }
        if self.ut_box <= Duration::zero() {
            invalid(format!("ut_box must be positive, got {}", self.ut_box))?
        }
        if !(self.max_score > 0.0 && self.max_std > 0.0) {
            invalid(format!(
                "max_score and max_std must be positive, got {} and {}",
                self.max_score, self.max_std
            ))?
        }
        if !(1..=6).contains(&self.step) {
            invalid(format!("step must be between 1 and 6, got {}", self.step))?
        }
        if self.alias > 1 {
            invalid(format!("alias must be 0 or 1, got {}", self.alias))?
        }
        if let Some(tdiff) = self.tdiff_override {
            if !tdiff.is_finite() {
                invalid(format!("tdiff must be finite, got {tdiff}"))?
            }
        }
        let gs = &self.groundscatter;
        if !(0.0..=1.0).contains(&gs.gs_tol) {
            invalid(format!("gs_tol must be within [0, 1], got {}", gs.gs_tol))?
        }
        if gs.min_rg > gs.max_rg {
            invalid(format!(
                "ground scatter range window [{}, {}] is inverted",
                gs.min_rg, gs.max_rg
            ))?
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(FovConfig::default().validate().is_ok());
    }

    #[test]
    fn tables_follow_max_rg() {
        let config = FovConfig::default();
        assert_eq!(config.rg_box_for(0), 2);
        assert_eq!(config.rg_box_for(5), 5);
        assert_eq!(config.rg_box_for(39), 10);
        assert_eq!(config.rg_box_for(40), 20);
        assert_eq!(config.rg_box_for(200), 20);
        assert_eq!(config.vh_box_for(60), 150.0);
    }

    #[test]
    fn rejects_contract_violations() {
        let bad = [
            FovConfig {
                rg_box: vec![2, 5],
                ..Default::default()
            },
            FovConfig {
                vh_box: vec![50.0, -50.0, 50.0, 150.0],
                ..Default::default()
            },
            FovConfig {
                max_rg: vec![5, 25, 25, 76],
                ..Default::default()
            },
            FovConfig {
                step: 7,
                ..Default::default()
            },
            FovConfig {
                alias: 2,
                ..Default::default()
            },
            FovConfig {
                max_hop: 0.0,
                ..Default::default()
            },
            FovConfig {
                max_hop: 200.0,
                ..Default::default()
            },
            FovConfig {
                groundscatter: GroundScatterConfig {
                    gs_tol: 1.5,
                    ..Default::default()
                },
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(FovError::InvalidConfig(_))));
        }
    }
}
