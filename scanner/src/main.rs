use anyhow::{bail, Context};
use clap::Parser;
use ddmcore::GeodeticPoint;
use generator::profile::{build_archive, GeneratorConfig};
use report::writer::ReportWriter;
use std::path::PathBuf;
use workflow::config::ScanConfig;
use workflow::runner::Runner;

mod generator;
mod report;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Find GNSS-R DDM observations near a point of interest")]
struct Args {
    /// Load the scan config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Archive root holding one subdirectory per day
    #[arg(long)]
    root: Option<PathBuf>,
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,
    #[arg(long, default_value_t = 50.0)]
    radius_km: f64,
    /// Only walk subdirectories whose name starts with this prefix
    #[arg(long)]
    dir_prefix: Option<String>,
    #[arg(long)]
    suffix: Option<String>,
    /// Files opened concurrently; 1 scans sequentially
    #[arg(long)]
    jobs: Option<usize>,
    #[arg(long, default_value = "ddm_matches.json")]
    report: PathBuf,
    /// Write a synthetic archive here first (scanned when no root is given)
    #[arg(long)]
    generate: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let writer = ReportWriter::new(&args.report);

    if let Some(dir) = &args.generate {
        let mut generator = GeneratorConfig {
            seed: args.seed,
            ..Default::default()
        };
        if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
            generator.center = GeodeticPoint::new(lat, lon);
        }
        let summary = build_archive(dir, &generator)
            .with_context(|| format!("generating synthetic archive in {}", dir.display()))?;
        let corrupt = summary.corrupt.map_or(0, |_| 1);
        writer.publish_status(&format!(
            "generated {} files ({} corrupt) in {}",
            summary.files.len() + corrupt,
            corrupt,
            dir.display()
        ));
    }

    let mut scan_config = if let Some(path) = &args.config {
        ScanConfig::load(path)?
    } else {
        let Some(root) = args.root.clone().or_else(|| args.generate.clone()) else {
            bail!("either --config, --root or --generate is required");
        };
        let (Some(lat), Some(lon)) = (args.lat, args.lon) else {
            bail!("--lat and --lon are required without --config");
        };
        ScanConfig::from_args(root, lat, lon, args.radius_km)
    };
    if let Some(prefix) = args.dir_prefix {
        scan_config.directory_prefix = Some(prefix);
    }
    if let Some(suffix) = args.suffix {
        scan_config.file_suffix = suffix;
    }
    if let Some(jobs) = args.jobs {
        scan_config.jobs = jobs;
    }

    let report = Runner::new(scan_config).execute()?;
    if report.entries.is_empty() {
        writer.publish_status("no observations found within the search radius");
    }
    writer.publish(&report)?;

    Ok(())
}
