use crate::error::FovError;
use crate::fov::config::FovConfig;
use crate::fov::geometry::HdwDirectory;
use crate::fov::resolve::{par_update_backscatter, FovBeam};
use crate::fov::FovAssignment;
use crate::utils::scan::Beam;
use dmap::error::DmapError;
use dmap::formats::fitacf::FitacfRecord;
use dmap::types::DmapField;
use indexmap::IndexMap;
use itertools::{Either, Itertools};
use pyo3::prelude::PyModule;
use pyo3::{pyfunction, pymodule, wrap_pyfunction, Bound, PyErr, PyResult};
use std::path::PathBuf;

type BeamOutput = (IndexMap<String, Vec<f64>>, Vec<String>);

/// Per-range-gate numeric output of one beam keyed by the RST field names, and the region
/// label of each range gate ("" when there is none).
fn beam_fields(beam: &FovBeam) -> BeamOutput {
    let column = |f: fn(&FovAssignment) -> f64| -> Vec<f64> { beam.fov.iter().map(f).collect() };
    let mut fields = IndexMap::new();
    fields.insert("slist".to_string(), column(|p| p.range_gate as f64));
    fields.insert("gflg".to_string(), column(|p| p.groundscatter as f64));
    fields.insert("fovflg".to_string(), column(|p| p.fov.as_i8() as f64));
    fields.insert("fovpast".to_string(), column(|p| p.past_fov.as_i8() as f64));
    fields.insert("fovscore".to_string(), column(|p| p.score));
    fields.insert("fovstd".to_string(), column(|p| p.std));
    fields.insert("hop".to_string(), column(|p| p.hop().map_or(f64::NAN, |h| h.as_f64())));
    fields.insert("fovelv".to_string(), column(|p| p.elevation()));
    fields.insert("fovelv_e".to_string(), column(|p| p.elevation_error()));
    fields.insert("vheight".to_string(), column(|p| p.vheight()));
    fields.insert("vheight_e".to_string(), column(|p| p.vheight_error()));
    fields.insert("felv".to_string(), column(|p| p.front.elevation));
    fields.insert("felv_e".to_string(), column(|p| p.front.elevation_error));
    fields.insert("belv".to_string(), column(|p| p.back.elevation));
    fields.insert("belv_e".to_string(), column(|p| p.back.elevation_error));
    fields.insert("fvheight".to_string(), column(|p| p.front.vheight));
    fields.insert("bvheight".to_string(), column(|p| p.back.vheight));
    let regions = beam
        .fov
        .iter()
        .map(|p| p.region().map_or(String::new(), |r| r.label().to_string()))
        .collect();
    (fields, regions)
}

/// Resolves the field of view of a list of FITACF records.
#[pyfunction]
#[pyo3(name = "update_backscatter")]
#[pyo3(signature = (recs, hdw_dir = None, step = 6))]
fn update_backscatter_py(
    mut recs: Vec<IndexMap<String, DmapField>>,
    hdw_dir: Option<PathBuf>,
    step: u8,
) -> PyResult<Vec<BeamOutput>> {
    let (errors, beams): (Vec<_>, Vec<_>) = recs
        .iter_mut()
        .enumerate()
        .partition_map(|(i, rec)| {
            match FitacfRecord::try_from(rec).and_then(|r| Beam::try_from(&r)) {
                Err(e) => Either::Left((i, e)),
                Ok(x) => Either::Right(x),
            }
        });
    if !errors.is_empty() {
        Err(PyErr::from(FovError::from(DmapError::InvalidRecord(format!(
            "Corrupted records: {errors:?}"
        )))))?
    }
    let config = FovConfig {
        step,
        ..Default::default()
    };
    let provider = HdwDirectory::new(hdw_dir.as_deref());
    let resolved = par_update_backscatter(beams, &provider, &config)?;
    Ok(resolved.iter().map(beam_fields).collect())
}

/// Field-of-view resolution of SuperDARN backscatter.
#[pymodule]
fn fovdarn(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(update_backscatter_py, m)?)?;

    Ok(())
}
