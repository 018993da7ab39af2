use clap::Parser;
use fovdarn::fov::config::FovConfig;
use fovdarn::fov::geometry::HdwDirectory;
use fovdarn::fov::resolve::par_update_backscatter;
use fovdarn::utils::scan::Beam;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub type BinResult<T, E = Box<dyn std::error::Error + Send + Sync>> = Result<T, E>;

fn main() {
    if let Err(e) = bin_main() {
        eprintln!("error: {e}");
        if let Some(e) = e.source() {
            eprintln!("error: {e}");
        }
        std::process::exit(1);
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Fitacf file to resolve
    #[arg()]
    infile: PathBuf,

    /// Directory of hdw.dat files [default: $HDW_DIR]
    #[arg(long)]
    hdw_dir: Option<PathBuf>,

    /// Last stage to run, from 1 (elevations only) to 6 (temporal continuity)
    #[arg(long, default_value_t = 6)]
    step: u8,

    /// Largest number of hops to consider
    #[arg(long, default_value_t = 3.0)]
    max_hop: f64,

    /// Discard points with an indeterminate ground scatter flag
    #[arg(long)]
    strict_gs: bool,

    /// Skip the propagation realism test during the hop search
    #[arg(long)]
    no_ptest: bool,

    /// tdiff in microseconds, replacing the value from the hdw file
    #[arg(long)]
    tdiff: Option<f64>,

    /// Shift the admissible phase window by this many 2π cycles
    #[arg(long, default_value_t = 0)]
    alias: u8,
}

fn bin_main() -> BinResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = FovConfig {
        step: args.step,
        max_hop: args.max_hop,
        strict_gs: args.strict_gs,
        ptest: !args.no_ptest,
        tdiff_override: args.tdiff,
        alias: args.alias,
        ..Default::default()
    };

    let fitacf_records = dmap::read_fitacf(args.infile)?;
    let mut beams = vec![];
    for rec in &fitacf_records {
        beams.push(Beam::try_from(rec)?);
    }
    let provider = HdwDirectory::new(args.hdw_dir.as_deref());
    let resolved = par_update_backscatter(beams, &provider, &config)?;

    println!("time beam gate gflg fovflg hop region elevation elevation_e vheight vheight_e score");
    for beam in &resolved {
        for p in &beam.fov {
            println!(
                "{} {} {} {} {} {} {} {:.3} {:.3} {:.1} {:.1} {:.3}",
                beam.beam.time.format("%Y-%m-%dT%H:%M:%S%.3f"),
                beam.beam.beam_num,
                p.range_gate,
                p.groundscatter,
                p.fov.as_i8(),
                p.hop().map_or("-".to_string(), |h| h.to_string()),
                p.region().map_or("-", |r| r.label()),
                p.elevation(),
                p.elevation_error(),
                p.vheight(),
                p.vheight_error(),
                p.score,
            );
        }
    }
    Ok(())
}
