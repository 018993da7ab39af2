use crate::error::FovError;
use crate::utils::rpos::slant_range;
use chrono::NaiveDateTime;

/// Interferometer phase lag of one range gate, in radians.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PhaseLag {
    pub phi0: f64,       // phi0 in RST
    pub phi0_error: f64, // phi0_e in RST
}

/// One fitted range gate of a beam.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    pub range_gate: usize,         // slist in RST
    pub groundscatter: i8,         // gflg in RST
    pub power_lin: f64,            // p_l in RST
    pub power_sigma: f64,          // p_s in RST
    pub velocity: f64,             // v in RST
    pub spectral_width_lin: f64,   // w_l in RST
    pub phase: Option<PhaseLag>,   // phi0 and phi0_e in RST
}

/// One integration period along one beam direction.
#[derive(Clone, Debug, PartialEq)]
pub struct Beam {
    pub time: NaiveDateTime,    // time in RST
    pub station_id: i16,        // stid in RST
    pub beam_num: i16,          // bmnum in RST
    pub program_id: i16,        // cp in RST
    pub channel: i16,           // channel in RST
    pub scan_flag: i16,         // scan in RST
    pub integration_time: f64,  // intt.sc + intt.us in RST, seconds
    pub tx_freq: f64,           // tfreq in RST, kHz
    pub first_range: f64,       // frang in RST, km
    pub range_sep: f64,         // rsep in RST, km
    pub rx_rise: f64,           // rxrise in RST, microseconds
    pub num_ranges: i16,        // nrang in RST
    pub points: Vec<Point>,
}

impl Beam {
    /// Whether elevations can be computed for this beam. Beams without phase lags fall back to
    /// model heights.
    pub fn has_phase(&self) -> bool {
        !self.points.is_empty() && self.points.iter().all(|p| p.phase.is_some())
    }

    /// Slant range to the centre of `range_gate`, in km.
    pub fn slant_range(&self, range_gate: usize) -> f64 {
        slant_range(self.first_range, self.range_sep, self.rx_rise, 0.0, range_gate)
    }

    /// Checks the beam before it enters the resolver.
    pub fn validate(&self) -> Result<(), FovError> {
        if !(self.tx_freq.is_finite() && self.tx_freq > 0.0) {
            Err(FovError::InvalidBeam(format!(
                "beam {} at {} has transmit frequency {}",
                self.beam_num, self.time, self.tx_freq
            )))?
        }
        if !(self.range_sep.is_finite() && self.range_sep > 0.0) {
            Err(FovError::InvalidBeam(format!(
                "beam {} at {} has range separation {}",
                self.beam_num, self.time, self.range_sep
            )))?
        }
        for pair in self.points.windows(2) {
            if pair[1].range_gate <= pair[0].range_gate {
                Err(FovError::InvalidBeam(format!(
                    "beam {} at {}: range gates not increasing ({} after {})",
                    self.beam_num, self.time, pair[1].range_gate, pair[0].range_gate
                )))?
            }
        }
        if let Some(last) = self.points.last() {
            if last.range_gate >= self.num_ranges.max(0) as usize {
                Err(FovError::InvalidBeam(format!(
                    "beam {} at {}: range gate {} beyond {} ranges",
                    self.beam_num, self.time, last.range_gate, self.num_ranges
                )))?
            }
        }
        Ok(())
    }
}

/// Consecutive beams of one radar sweep.
#[derive(Clone, Debug)]
pub struct ScanWindow {
    pub beams: Vec<Beam>,
}

impl ScanWindow {
    pub fn new(first: Beam) -> ScanWindow {
        ScanWindow { beams: vec![first] }
    }

    /// Whether `beam` continues this scan. A scan ends when the scan flag marks a new sweep,
    /// when the radar program or channel changes, when a beam direction repeats, when
    /// `max_beams` beams are collected, or when more than three dwell times pass between
    /// consecutive beams.
    /// Adapted from FitReadRadarScan in fitscan.c of RST.
    pub fn accepts(&self, beam: &Beam, max_beams: i16) -> bool {
        let (Some(first), Some(last)) = (self.beams.first(), self.beams.last()) else {
            return true;
        };
        if beam.station_id != first.station_id
            || beam.program_id != first.program_id
            || beam.channel != first.channel
        {
            return false;
        }
        if beam.scan_flag.abs() == 1 || self.beams.len() >= max_beams.max(1) as usize {
            return false;
        }
        if self.beams.iter().any(|b| b.beam_num == beam.beam_num) {
            return false;
        }
        let dwell = last.integration_time.max(1.0);
        let gap = (beam.time - last.time).num_milliseconds() as f64 / 1000.0;
        (0.0..=3.0 * dwell).contains(&gap)
    }

    pub fn push(&mut self, beam: Beam) {
        self.beams.push(beam);
    }
}
