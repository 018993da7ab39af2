use chrono::NaiveDateTime;
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HdwError {
    /// The station id has no known site code
    #[error("Invalid station id {0}")]
    InvalidStation(i16),

    /// The hdw file could not be opened or read
    #[error("Unable to read hdw file {path}: {msg}")]
    Io { path: PathBuf, msg: String },

    /// A column of the hdw file could not be parsed
    #[error("Unable to read {0} from hdw file")]
    Parse(String),

    /// No line in the hdw file is valid at the requested time
    #[error("No valid lines found in hdw file for {0}")]
    NoValidLine(String),

    /// Neither an explicit directory nor HDW_DIR was given
    #[error("No hdw directory given and HDW_DIR is not set")]
    MissingDirectory,
}

#[derive(Debug, Clone)]
pub struct HdwInfo {
    pub station_id: i16,           // stid in RST
    pub valid_from: NaiveDateTime, // date, hr, mt, sc in RST
    pub latitude: f32,             // geolat in RST
    pub longitude: f32,            // geolon in RST
    pub altitude: f32,             // alt in RST
    pub boresight: f32,            // boresite in RST
    pub boresight_shift: f32,      // bmoff in RST
    pub beam_separation: f32,      // bmsep in RST
    pub velocity_sign: f32,        // vdir in RST
    pub phase_sign: f32,           // phidiff in RST
    pub tdiff_a: f32,              // tdiff[0] in RST
    pub tdiff_b: f32,              // tdiff[1] in RST
    pub intf_offset_x: f32,        // interfer[0] in RST
    pub intf_offset_y: f32,        // interfer[1] in RST
    pub intf_offset_z: f32,        // interfer[2] in RST
    pub rx_rise_time: f32,         // recrise in RST
    pub rx_atten_step: f32,        // atten in RST
    pub attenuation_stages: f32,   // maxatten in RST
    pub max_num_ranges: i16,       // maxrange in RST
    pub max_num_beams: i16,        // maxbeam in RST
}

/// Returns the three-letter site code of a station id.
pub fn site_code(station_id: i16) -> Result<&'static str, HdwError> {
    let code = match station_id {
        209 => "ade",
        208 => "adw",
        33 => "bks",
        24 => "bpk",
        66 => "cly",
        207 => "cve",
        206 => "cvw",
        96 => "dce",
        97 => "dcn",
        512 => "ekb",
        205 => "fhe",
        204 => "fhw",
        21 => "fir",
        1 => "gbr",
        4 => "hal",
        10 => "han",
        41 => "hkw",
        40 => "hok",
        211 => "ice",
        210 => "icw",
        64 => "inv",
        50 => "jme",
        3 => "kap",
        15 => "ker",
        7 => "kod",
        16 => "ksr",
        90 => "lyr",
        20 => "mcm",
        6 => "pgr",
        9 => "pyk",
        65 => "rkn",
        11 => "san",
        5 => "sas",
        2 => "sch",
        22 => "sps",
        8 => "sto",
        13 => "sye",
        12 => "sys",
        14 => "tig",
        0 => "tst",
        18 => "unw",
        32 => "wal",
        19 => "zho",
        _ => Err(HdwError::InvalidStation(station_id))?,
    };
    Ok(code)
}

fn column<T: FromStr>(elements: &[&str], idx: usize, name: &str) -> Result<T, HdwError> {
    elements
        .get(idx)
        .ok_or_else(|| HdwError::Parse(name.to_string()))?
        .parse::<T>()
        .map_err(|_| HdwError::Parse(name.to_string()))
}

/// Reads the lines of the hdw file of `station_id` from `hdw_dir`, falling back to the
/// `HDW_DIR` environment variable when no directory is given.
pub fn read_hdw_lines(station_id: i16, hdw_dir: Option<&Path>) -> Result<Vec<String>, HdwError> {
    let site_name = site_code(station_id)?;
    let dir: PathBuf = match hdw_dir {
        Some(d) => d.to_path_buf(),
        None => PathBuf::from(env::var_os("HDW_DIR").ok_or(HdwError::MissingDirectory)?),
    };
    let hdw_file = dir.join(format!("hdw.dat.{}", site_name));
    let file = File::open(&hdw_file).map_err(|e| HdwError::Io {
        path: hdw_file.clone(),
        msg: e.to_string(),
    })?;
    BufReader::new(file)
        .lines()
        .collect::<Result<Vec<String>, _>>()
        .map_err(|e| HdwError::Io {
            path: hdw_file.clone(),
            msg: e.to_string(),
        })
}

impl HdwInfo {
    /// Parses the entry valid at `datetime` from the lines of an hdw file.
    /// Lines are ordered by validity date; the last one at or before `datetime` wins.
    pub fn from_lines<'a>(
        lines: impl Iterator<Item = &'a str>,
        datetime: NaiveDateTime,
    ) -> Result<HdwInfo, HdwError> {
        let mut hdw_params: Vec<HdwInfo> = vec![];
        for line in lines {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let elements: Vec<&str> = line.split_whitespace().collect();
            if elements.len() < 22 {
                Err(HdwError::Parse(format!("line with {} columns", elements.len())))?
            }
            let validity_date = NaiveDateTime::parse_from_str(
                format!("{} {}", elements[2], elements[3]).as_str(),
                "%Y%m%d %H:%M:%S",
            )
            .map_err(|_| HdwError::Parse("validity date".to_string()))?;

            if datetime < validity_date {
                break;
            }
            hdw_params.push(HdwInfo {
                station_id: column(&elements, 0, "station id")?,
                valid_from: validity_date,
                latitude: column(&elements, 4, "latitude")?,
                longitude: column(&elements, 5, "longitude")?,
                altitude: column(&elements, 6, "altitude")?,
                boresight: column(&elements, 7, "boresight")?,
                boresight_shift: column(&elements, 8, "boresight shift")?,
                beam_separation: column(&elements, 9, "beam separation")?,
                velocity_sign: column(&elements, 10, "velocity sign")?,
                phase_sign: column(&elements, 11, "phase sign")?,
                tdiff_a: column(&elements, 12, "tdiff A")?,
                tdiff_b: column(&elements, 13, "tdiff B")?,
                intf_offset_x: column(&elements, 14, "intf offset X")?,
                intf_offset_y: column(&elements, 15, "intf offset Y")?,
                intf_offset_z: column(&elements, 16, "intf offset Z")?,
                rx_rise_time: column(&elements, 17, "rx rise time")?,
                rx_atten_step: column(&elements, 18, "rx attenuation")?,
                attenuation_stages: column(&elements, 19, "attenuation stages")?,
                max_num_ranges: column(&elements, 20, "max number of ranges")?,
                max_num_beams: column(&elements, 21, "max number of beams")?,
            })
        }
        hdw_params
            .pop()
            .ok_or_else(|| HdwError::NoValidLine(datetime.to_string()))
    }
}
