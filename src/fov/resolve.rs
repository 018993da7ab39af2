//! Front/back FoV resolution of a stream of beams.
use crate::error::FovError;
use crate::fov::beam::evaluate_beam;
use crate::fov::config::FovConfig;
use crate::fov::geometry::{GeometryProvider, RadarGeometry};
use crate::fov::scan::resolve_scan;
use crate::fov::temporal::resolve_temporal;
use crate::fov::FovAssignment;
use crate::utils::scan::{Beam, ScanWindow};
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, info};

/// A beam with the FoV outcome of each of its points, in the order of `beam.points`.
#[derive(Debug, Clone, PartialEq)]
pub struct FovBeam {
    pub beam: Beam,
    pub fov: Vec<FovAssignment>,
}

/// Splits the time-ordered `beams` into scans and looks up the radar geometry of each one.
fn collect_scans<I, G>(beams: I, provider: &G) -> Result<Vec<(RadarGeometry, ScanWindow)>, FovError>
where
    I: IntoIterator<Item = Beam>,
    G: GeometryProvider + ?Sized,
{
    let mut beams = beams.into_iter().peekable();
    let mut scans = vec![];
    while let Some(first) = beams.next() {
        first.validate()?;
        let geometry = provider.geometry(first.station_id, first.time)?;
        let mut window = ScanWindow::new(first);
        while let Some(beam) = beams.next_if(|b| window.accepts(b, geometry.max_beams)) {
            beam.validate()?;
            window.push(beam);
        }
        debug!(
            station = geometry.station_id,
            beams = window.beams.len(),
            "collected scan"
        );
        scans.push((geometry, window));
    }
    Ok(scans)
}

/// Evaluates both FoVs of every point of one scan and resolves them against each other.
pub fn resolve_window(window: ScanWindow, geometry: &RadarGeometry, config: &FovConfig) -> Vec<FovBeam> {
    let mut beams: Vec<FovBeam> = window
        .beams
        .into_iter()
        .map(|beam| {
            let fov = evaluate_beam(&beam, geometry, config);
            FovBeam { beam, fov }
        })
        .collect();
    resolve_scan(&mut beams, config);
    beams
}

/// Beams grouped by station, channel and beam number, keeping their order.
fn beam_series(beams: &mut [FovBeam]) -> Vec<Vec<&mut FovBeam>> {
    let mut series: IndexMap<(i16, i16, i16), Vec<&mut FovBeam>> = IndexMap::new();
    for beam in beams.iter_mut() {
        let key = (beam.beam.station_id, beam.beam.channel, beam.beam.beam_num);
        series.entry(key).or_default().push(beam);
    }
    series.into_values().collect()
}

/// Assigns a FoV to every point of `beams`, which must be in time order.
///
/// The beams are split into scans, each scan is resolved on its own, and the temporal
/// continuity pass then runs over each beam direction. The stages that run are set by
/// `config.step`. Points that cannot be resolved keep an unresolved FoV flag with the front
/// FoV values; only a bad configuration, a malformed beam or a missing radar geometry is an
/// error.
pub fn update_backscatter<I, G>(beams: I, provider: &G, config: &FovConfig) -> Result<Vec<FovBeam>, FovError>
where
    I: IntoIterator<Item = Beam>,
    G: GeometryProvider + ?Sized,
{
    config.validate()?;
    let scans = collect_scans(beams, provider)?;
    info!(scans = scans.len(), "resolving FoV");
    let mut resolved: Vec<FovBeam> = scans
        .into_iter()
        .flat_map(|(geometry, window)| resolve_window(window, &geometry, config))
        .collect();
    for mut series in beam_series(&mut resolved) {
        resolve_temporal(&mut series, config);
    }
    Ok(resolved)
}

/// Same as [`update_backscatter`], resolving the scans and then the beam series in parallel.
pub fn par_update_backscatter<I, G>(
    beams: I,
    provider: &G,
    config: &FovConfig,
) -> Result<Vec<FovBeam>, FovError>
where
    I: IntoIterator<Item = Beam>,
    G: GeometryProvider + ?Sized,
{
    config.validate()?;
    let scans = collect_scans(beams, provider)?;
    info!(scans = scans.len(), "resolving FoV");
    let mut resolved: Vec<FovBeam> = scans
        .into_par_iter()
        .map(|(geometry, window)| resolve_window(window, &geometry, config))
        .collect::<Vec<Vec<FovBeam>>>()
        .into_iter()
        .flatten()
        .collect();
    beam_series(&mut resolved)
        .into_par_iter()
        .for_each(|mut series| resolve_temporal(&mut series, config));
    Ok(resolved)
}
