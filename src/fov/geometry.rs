use crate::error::FovError;
use crate::utils::hdw::{read_hdw_lines, HdwError, HdwInfo};
use crate::utils::rpos::{beam_offset, earth_radius};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

type Result<T> = std::result::Result<T, FovError>;

/// Radar constants needed to turn interferometer phase into elevation and position.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarGeometry {
    pub station_id: i16,
    pub latitude: f64,        // degrees
    pub longitude: f64,       // degrees
    pub boresight: f64,       // degrees East of North
    pub boresight_shift: f64, // degrees
    pub beam_separation: f64, // degrees
    pub max_beams: i16,
    pub max_range_gates: i16,
    /// Interferometer offset from the main array (x along the array, y towards boresight,
    /// z vertical), in metres
    pub interferometer: [f64; 3],
    /// +1 or -1, sign convention of the measured phase difference
    pub phase_sign: f64,
    /// Receiver path delay of channel A and B, in microseconds
    pub tdiff: [f64; 2],
}

impl RadarGeometry {
    /// Beam direction off boresight, in degrees.
    pub fn beam_offset(&self, beam_num: i16) -> f64 {
        beam_offset(
            beam_num,
            self.max_beams,
            self.beam_separation,
            self.boresight_shift,
        )
    }

    /// Hardware tdiff for a receiver channel. Channel 2 is the second (B) channel of a
    /// stereo radar; everything else uses channel A.
    pub fn tdiff(&self, channel: i16) -> f64 {
        if channel == 2 {
            self.tdiff[1]
        } else {
            self.tdiff[0]
        }
    }

    /// Local Earth radius beneath the radar, in km.
    pub fn earth_radius(&self) -> f64 {
        earth_radius(self.latitude)
    }
}

impl From<&HdwInfo> for RadarGeometry {
    fn from(hdw: &HdwInfo) -> Self {
        RadarGeometry {
            station_id: hdw.station_id,
            latitude: hdw.latitude as f64,
            longitude: hdw.longitude as f64,
            boresight: hdw.boresight as f64,
            boresight_shift: hdw.boresight_shift as f64,
            beam_separation: hdw.beam_separation as f64,
            max_beams: hdw.max_num_beams,
            max_range_gates: hdw.max_num_ranges,
            interferometer: [
                hdw.intf_offset_x as f64,
                hdw.intf_offset_y as f64,
                hdw.intf_offset_z as f64,
            ],
            phase_sign: if hdw.phase_sign < 0.0 { -1.0 } else { 1.0 },
            tdiff: [hdw.tdiff_a as f64, hdw.tdiff_b as f64],
        }
    }
}

/// 1-sigma uncertainties of the radar geometry, used for elevation error propagation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeometryErrors {
    pub beam_azimuth: f64, // degrees
    pub boresight: f64,    // degrees
    pub interferometer: [f64; 3], // metres
    pub tdiff: f64,        // microseconds
}

/// Supplies the geometry of a radar valid at a given time.
pub trait GeometryProvider: Sync {
    fn geometry(&self, station_id: i16, time: NaiveDateTime) -> Result<RadarGeometry>;
}

/// A fixed geometry, returned for its own station at any time.
impl GeometryProvider for RadarGeometry {
    fn geometry(&self, station_id: i16, _time: NaiveDateTime) -> Result<RadarGeometry> {
        if station_id != self.station_id {
            Err(HdwError::InvalidStation(station_id))?
        }
        Ok(self.clone())
    }
}

/// Geometry read from the `hdw.dat.<site>` files of a directory. Each file is read once and
/// kept for later lookups.
#[derive(Debug, Default)]
pub struct HdwDirectory {
    dir: Option<PathBuf>,
    files: Mutex<IndexMap<i16, Arc<Vec<String>>>>,
}

impl HdwDirectory {
    /// Uses `dir`, or the `HDW_DIR` environment variable when `dir` is `None`.
    pub fn new(dir: Option<&Path>) -> HdwDirectory {
        HdwDirectory {
            dir: dir.map(Path::to_path_buf),
            files: Mutex::new(IndexMap::new()),
        }
    }

    fn lines(&self, station_id: i16) -> Result<Arc<Vec<String>>> {
        if let Ok(files) = self.files.lock() {
            if let Some(lines) = files.get(&station_id) {
                return Ok(Arc::clone(lines));
            }
        }
        let lines = Arc::new(read_hdw_lines(station_id, self.dir.as_deref())?);
        if let Ok(mut files) = self.files.lock() {
            files.insert(station_id, Arc::clone(&lines));
        }
        Ok(lines)
    }
}

impl GeometryProvider for HdwDirectory {
    fn geometry(&self, station_id: i16, time: NaiveDateTime) -> Result<RadarGeometry> {
        let lines = self.lines(station_id)?;
        let info = HdwInfo::from_lines(lines.iter().map(String::as_str), time)?;
        Ok(RadarGeometry::from(&info))
    }
}
