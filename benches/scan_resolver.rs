use chrono::{Duration, NaiveDate};
use criterion::{criterion_group, criterion_main, Criterion};
use fovdarn::fov::config::FovConfig;
use fovdarn::fov::elevation::phase_from_elevation;
use fovdarn::fov::geometry::RadarGeometry;
use fovdarn::fov::resolve::{par_update_backscatter, update_backscatter};
use fovdarn::fov::Fov;
use fovdarn::utils::scan::{Beam, PhaseLag, Point};

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
        interferometer: [1.5, 100.0, -3.0],
        phase_sign: 1.0,
        tdiff: [0.0, 0.0],
    }
}

/// Twenty minutes of 16-beam scans with F region echoes between gates 15 and 45.
fn synthetic_beams() -> Vec<Beam> {
    let geometry = geometry();
    let start = NaiveDate::from_ymd_opt(2016, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut beams = vec![];
    for scan in 0..20 {
        for beam_num in 0..16 {
            let offset = geometry.beam_offset(beam_num);
            let points = (15..45)
                .map(|gate| {
                    let elevation = 35.0 - 0.5 * (gate - 15) as f64 + 0.1 * beam_num as f64;
                    Point {
                        range_gate: gate,
                        groundscatter: 0,
                        power_lin: 12.0,
                        power_sigma: 1.0,
                        velocity: 300.0,
                        spectral_width_lin: 150.0,
                        phase: Some(PhaseLag {
                            phi0: phase_from_elevation(elevation, 11500.0, offset, &geometry, 0.0, Fov::Front),
                            phi0_error: 0.1,
                        }),
                    }
                })
                .collect();
            beams.push(Beam {
                time: start + Duration::seconds(60 * scan + 3 * beam_num as i64),
                station_id: 5,
                beam_num,
                program_id: 153,
                channel: 0,
                scan_flag: if beam_num == 0 { 1 } else { 0 },
                integration_time: 3.0,
                tx_freq: 11500.0,
                first_range: 180.0,
                range_sep: 45.0,
                rx_rise: 0.0,
                num_ranges: 75,
                points,
            });
        }
    }
    beams
}

fn criterion_benchmark(c: &mut Criterion) {
    let beams = synthetic_beams();
    let geometry = geometry();
    let config = FovConfig::default();
    c.bench_function("UpdateBackscatter", |b| {
        b.iter(|| update_backscatter(beams.clone(), &geometry, &config).expect("Could not resolve"))
    });
    c.bench_function("Parallel UpdateBackscatter", |b| {
        b.iter(|| par_update_backscatter(beams.clone(), &geometry, &config).expect("Could not resolve"))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
