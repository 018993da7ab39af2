use crate::utils::scan::{Beam, PhaseLag, Point};
use chrono::NaiveDate;
use dmap::error::DmapError;
use dmap::formats::fitacf::FitacfRecord;
use dmap::types::DmapField;
use numpy::ndarray::ArrayD;

impl TryFrom<&FitacfRecord> for Beam {
    type Error = DmapError;
    fn try_from(value: &FitacfRecord) -> Result<Self, Self::Error> {
        let scalar_getter = |key: &str| -> Result<&DmapField, DmapError> {
            value
                .get(&key.to_string())
                .ok_or_else(|| DmapError::InvalidScalar(key.to_string()))
        };
        let vector_getter = |key: &str| -> Result<&DmapField, DmapError> {
            value
                .get(&key.to_string())
                .ok_or_else(|| DmapError::InvalidVector(key.to_string()))
        };
        let opt_vector_getter = |key: &str| -> Option<&DmapField> { value.get(&key.to_string()) };
        let f32_vector = |key: &str| -> Result<Vec<f64>, DmapError> {
            Ok(<DmapField as TryInto<ArrayD<f32>>>::try_into(vector_getter(key)?.clone())?
                .iter()
                .map(|&x| x as f64)
                .collect())
        };

        let time_yr: i16 = scalar_getter("time.yr")?.clone().try_into()?;
        let time_mo: i16 = scalar_getter("time.mo")?.clone().try_into()?;
        let time_dy: i16 = scalar_getter("time.dy")?.clone().try_into()?;
        let time_hr: i16 = scalar_getter("time.hr")?.clone().try_into()?;
        let time_mt: i16 = scalar_getter("time.mt")?.clone().try_into()?;
        let time_sc: i16 = scalar_getter("time.sc")?.clone().try_into()?;
        let time_us: i32 = scalar_getter("time.us")?.clone().try_into()?;
        let time = NaiveDate::from_ymd_opt(time_yr as i32, time_mo as u32, time_dy as u32)
            .and_then(|d| {
                d.and_hms_micro_opt(time_hr as u32, time_mt as u32, time_sc as u32, time_us as u32)
            })
            .ok_or_else(|| {
                DmapError::InvalidScalar(format!(
                    "time {time_yr}-{time_mo}-{time_dy} {time_hr}:{time_mt}:{time_sc}.{time_us}"
                ))
            })?;

        let intt_sc: i16 = scalar_getter("intt.sc")?.clone().try_into()?;
        let intt_us: i32 = scalar_getter("intt.us")?.clone().try_into()?;
        let tfreq: i16 = scalar_getter("tfreq")?.clone().try_into()?;
        let frang: i16 = scalar_getter("frang")?.clone().try_into()?;
        let rsep: i16 = scalar_getter("rsep")?.clone().try_into()?;
        let rxrise: i16 = scalar_getter("rxrise")?.clone().try_into()?;

        // Records without any fitted range have no vector fields
        let points = match opt_vector_getter("slist") {
            None => vec![],
            Some(slist) => {
                let slist = <DmapField as TryInto<ArrayD<i16>>>::try_into(slist.clone())?;
                let gflg = <DmapField as TryInto<ArrayD<i8>>>::try_into(vector_getter("gflg")?.clone())?;
                let p_l = f32_vector("p_l")?;
                let p_s = f32_vector("p_s")?;
                let v = f32_vector("v")?;
                let w_l = f32_vector("w_l")?;
                let phase = match (opt_vector_getter("phi0"), opt_vector_getter("phi0_e")) {
                    (Some(_), Some(_)) => Some((f32_vector("phi0")?, f32_vector("phi0_e")?)),
                    _ => None,
                };
                let n = slist.len();
                if [gflg.len(), p_l.len(), p_s.len(), v.len(), w_l.len()]
                    .iter()
                    .any(|&len| len != n)
                {
                    Err(DmapError::InvalidVector(format!(
                        "range vectors do not match slist of length {n}"
                    )))?
                }
                if let Some((phi0, phi0_e)) = &phase {
                    if phi0.len() != n || phi0_e.len() != n {
                        Err(DmapError::InvalidVector(format!(
                            "phi0 vectors do not match slist of length {n}"
                        )))?
                    }
                }
                slist
                    .iter()
                    .zip(gflg.iter())
                    .enumerate()
                    .map(|(i, (&range_gate, &gflg))| Point {
                        range_gate: range_gate.max(0) as usize,
                        groundscatter: gflg,
                        power_lin: p_l[i],
                        power_sigma: p_s[i],
                        velocity: v[i],
                        spectral_width_lin: w_l[i],
                        phase: phase.as_ref().map(|(phi0, phi0_e)| PhaseLag {
                            phi0: phi0[i],
                            phi0_error: phi0_e[i],
                        }),
                    })
                    .collect()
            }
        };

        Ok(Beam {
            time,
            station_id: scalar_getter("stid")?.clone().try_into()?,
            beam_num: scalar_getter("bmnum")?.clone().try_into()?,
            program_id: scalar_getter("cp")?.clone().try_into()?,
            channel: scalar_getter("channel")?.clone().try_into()?,
            scan_flag: scalar_getter("scan")?.clone().try_into()?,
            integration_time: intt_sc as f64 + intt_us as f64 * 1e-6,
            tx_freq: tfreq as f64,
            first_range: frang as f64,
            range_sep: rsep as f64,
            rx_rise: rxrise as f64,
            num_ranges: scalar_getter("nrang")?.clone().try_into()?,
            points,
        })
    }
}
