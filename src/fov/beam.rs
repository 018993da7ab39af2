//! Elevation, height and propagation path of every point of a beam, for both FoVs.
use crate::fov::config::FovConfig;
use crate::fov::elevation::{calc_elevation, PhaseObservation};
use crate::fov::geometry::RadarGeometry;
use crate::fov::groundscatter::update_groundscatter_flags;
use crate::fov::vheight::{calc_distance, vheight_from_elevation};
use crate::fov::{Fov, FovAssignment, FovSolution, Hop};
use crate::utils::scan::{Beam, PhaseLag};
use tracing::warn;

struct BeamContext<'a> {
    beam: &'a Beam,
    geometry: &'a RadarGeometry,
    config: &'a FovConfig,
    tdiff: f64,
    beam_offset: f64,
    radius: f64,
}

impl BeamContext<'_> {
    /// Searches the hops of one FoV from the lowest allowed, keeping the first whose height
    /// falls in a region and, with `ptest`, passes the realism test.
    fn solve(&self, phase: &PhaseLag, range_gate: usize, groundscatter: i8, fov: Fov) -> FovSolution {
        if self.config.strict_gs && groundscatter == -1 {
            return FovSolution::INVALID;
        }
        let obs = PhaseObservation {
            phi0: phase.phi0,
            phi0_error: phase.phi0_error,
            tx_freq_khz: self.beam.tx_freq,
            beam_offset: self.beam_offset,
        };
        let elv = calc_elevation(
            &obs,
            self.geometry,
            self.tdiff,
            Some(&self.config.geometry_errors),
            self.config.alias,
            fov,
        );
        if !elv.elevation.is_finite() {
            return FovSolution::INVALID;
        }

        let slant = self.beam.slant_range(range_gate);
        let first = if groundscatter == 1 { Hop::ONE } else { Hop::HALF };
        let hops = std::iter::successors(Some(first), |h| h.next())
            .take_while(|h| h.as_f64() <= self.config.max_hop);
        for hop in hops {
            let distance = calc_distance(slant, hop);
            let distance_error = calc_distance(self.beam.range_sep / 2.0, hop);
            let vh = vheight_from_elevation(
                distance,
                elv.elevation,
                self.radius,
                elv.error,
                distance_error,
                0.0,
            );
            if let Some(region) = self.config.regions.assign_region(vh.height) {
                if !self.config.ptest || self.config.regions.test_propagation(hop, vh.height, slant) {
                    return FovSolution {
                        elevation: elv.elevation,
                        elevation_error: elv.error,
                        phase_ambiguity: elv.ambiguity,
                        vheight: vh.height,
                        vheight_error: vh.error,
                        hop: Some(hop),
                        region: Some(region),
                    };
                }
            }
        }
        FovSolution::INVALID
    }

    /// Height from the configured model, for points without a phase lag. The solution has no
    /// elevation and is never used by the resolvers.
    fn model(&self, range_gate: usize, groundscatter: i8) -> FovSolution {
        let hop = if groundscatter == 1 { Hop::ONE } else { Hop::HALF };
        let vheight = self
            .config
            .height_model
            .height(self.beam.slant_range(range_gate), hop);
        FovSolution {
            vheight,
            hop: Some(hop),
            region: self.config.regions.assign_region(vheight),
            ..FovSolution::INVALID
        }
    }
}

/// Evaluates both FoV hypotheses for every point of `beam`. The returned records are
/// unresolved; picking a FoV is left to the scan resolver.
pub fn evaluate_beam(beam: &Beam, geometry: &RadarGeometry, config: &FovConfig) -> Vec<FovAssignment> {
    let ctx = BeamContext {
        beam,
        geometry,
        config,
        tdiff: config
            .tdiff_override
            .unwrap_or_else(|| geometry.tdiff(beam.channel)),
        beam_offset: geometry.beam_offset(beam.beam_num),
        radius: geometry.earth_radius(),
    };
    let flags: Vec<i8> = if config.step >= 2 {
        update_groundscatter_flags(beam, &config.groundscatter)
    } else {
        beam.points.iter().map(|p| p.groundscatter).collect()
    };
    let has_phase = beam.has_phase();
    if !has_phase && !beam.points.is_empty() {
        warn!(
            beam = beam.beam_num,
            time = %beam.time,
            "beam has no phase lags, using model heights"
        );
    }

    beam.points
        .iter()
        .zip(flags)
        .map(|(point, gflg)| {
            let mut record = FovAssignment::new(point.range_gate, gflg);
            match (&point.phase, has_phase) {
                (Some(phase), true) => {
                    for fov in Fov::BOTH {
                        *record.solution_mut(fov) = ctx.solve(phase, point.range_gate, gflg, fov);
                    }
                }
                _ => record.front = ctx.model(point.range_gate, gflg),
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fov::elevation::phase_from_elevation;
    use crate::fov::Region;
    use crate::utils::scan::Point;
    use chrono::NaiveDate;

    fn geometry() -> RadarGeometry {
        RadarGeometry {
            station_id: 5,
            latitude: 52.16,
            longitude: -106.53,
            boresight: 23.1,
            boresight_shift: 0.0,
            beam_separation: 3.24,
            max_beams: 16,
            max_range_gates: 75,
            interferometer: [0.0, 100.0, 0.0],
            phase_sign: 1.0,
            tdiff: [0.0, 0.0],
        }
    }

    fn beam(points: Vec<Point>) -> Beam {
        Beam {
            time: NaiveDate::from_ymd_opt(2016, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            station_id: 5,
            beam_num: 7,
            program_id: 153,
            channel: 0,
            scan_flag: 1,
            integration_time: 3.0,
            tx_freq: 12000.0,
            first_range: 180.0,
            range_sep: 45.0,
            rx_rise: 0.0,
            num_ranges: 75,
            points,
        }
    }

    fn point(range_gate: usize, phi0: Option<f64>) -> Point {
        Point {
            range_gate,
            groundscatter: 0,
            power_lin: 15.0,
            power_sigma: 15.0,
            velocity: 300.0,
            spectral_width_lin: 100.0,
            phase: phi0.map(|phi0| PhaseLag {
                phi0,
                phi0_error: 0.05,
            }),
        }
    }

    #[test]
    fn half_hop_f_region_echo() {
        let geometry = geometry();
        // 1080 km slant range at 20 degrees reflects near 470 km
        let offset = geometry.beam_offset(7);
        let phi0 = phase_from_elevation(20.0, 12000.0, offset, &geometry, 0.0, Fov::Front);
        let records = evaluate_beam(&beam(vec![point(20, Some(phi0))]), &geometry, &FovConfig::default());
        let front = records[0].front;
        assert!((front.elevation - 20.0).abs() < 1e-6);
        assert_eq!(front.hop, Some(Hop::HALF));
        assert_eq!(front.region, Some(Region::F));
        assert!(front.vheight > 400.0 && front.vheight < 550.0);
        assert!(front.elevation_error > 0.0);
        // the same phase seen through the rear lobe needs a steeper ray
        assert!(records[0].back.elevation > front.elevation);
    }

    #[test]
    fn low_elevation_far_echo_needs_more_hops() {
        let geometry = geometry();
        let offset = geometry.beam_offset(7);
        // 3105 km at 25 degrees: half hop would reflect above 900 km
        let phi0 = phase_from_elevation(25.0, 12000.0, offset, &geometry, 0.0, Fov::Front);
        let records = evaluate_beam(&beam(vec![point(65, Some(phi0))]), &geometry, &FovConfig::default());
        let front = records[0].front;
        assert!(front.hop.unwrap() > Hop::HALF);
        assert!(front.is_valid());
    }

    #[test]
    fn unrealistic_echo_ends_the_hop_search() {
        let geometry = geometry();
        let offset = geometry.beam_offset(7);
        let phi0 = phase_from_elevation(1.0, 12000.0, offset, &geometry, 0.0, Fov::Front);
        // every representable hop is searched, none reaches a region
        let config = FovConfig {
            max_hop: 200.0,
            ..Default::default()
        };
        let records = evaluate_beam(&beam(vec![point(0, Some(phi0))]), &geometry, &config);
        assert!(!records[0].front.is_valid());
    }

    #[test]
    fn missing_phase_uses_model_height() {
        let geometry = geometry();
        let records = evaluate_beam(
            &beam(vec![point(20, None), point(5, None)]),
            &geometry,
            &FovConfig::default(),
        );
        assert!(records[0].front.elevation.is_nan());
        assert_eq!(records[0].front.vheight, 300.0);
        // 405 km of slant range reflects in the E region
        assert_eq!(records[1].front.vheight, 115.0);
        assert_eq!(records[1].front.region, Some(Region::E));
        assert!(!records[0].front.is_valid());
        assert!(!records[0].back.is_valid());
    }
}
