use crate::generator::template::ddm_template;
use anyhow::Context;
use ddmcore::archive_interface::{ArrayStore, GridKeys};
use ddmcore::GeodeticPoint;
use ndarray::{Array, Array2, Array4, IxDyn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const QUALITY_WORDS: [f64; 6] = [0.0, 0.0, 2.0, 4.0, 66.0, 1024.0 + 256.0];

/// Configuration for generating a synthetic DDM archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub days: usize,
    pub files_per_day: usize,
    pub times: usize,
    pub channels: usize,
    pub doppler_bins: usize,
    pub code_bins: usize,
    pub center: GeodeticPoint,
    pub spread_deg: f64,
    pub seed: u64,
    pub corrupt_file: bool,
    pub suffix: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            days: 2,
            files_per_day: 3,
            times: 8,
            channels: 4,
            doppler_bins: 64,
            code_bins: 128,
            center: GeodeticPoint::new(10.324902, 79.753311),
            spread_deg: 2.0,
            seed: 0,
            corrupt_file: true,
            suffix: "_CorDDM_v2.0_nc".into(),
        }
    }
}

/// Files written by [`build_archive`].
#[derive(Debug, Default)]
pub struct ArchiveSummary {
    pub files: Vec<PathBuf>,
    pub corrupt: Option<PathBuf>,
}

fn build_file(config: &GeneratorConfig, rng: &mut StdRng, start_sec: f64) -> ArrayStore {
    let keys = GridKeys::default();
    let (times, channels) = (config.times.max(1), config.channels.max(1));
    let (doppler_bins, code_bins) = (config.doppler_bins.max(1), config.code_bins.max(1));

    let mut prn = Array2::<f64>::zeros((times, channels));
    let mut splat = Array2::<f64>::zeros((times, channels));
    let mut splon = Array2::<f64>::zeros((times, channels));
    let mut quality = Array2::<f64>::zeros((times, channels));
    let mut code_phase = Array2::<f64>::zeros((times, channels));
    let mut doppler_frequency = Array2::<f64>::zeros((times, channels));
    let mut doppler_shift = Array2::<f64>::zeros((times, channels));
    let mut ddm = Array4::<f64>::zeros((times, channels, doppler_bins, code_bins));

    for c in 0..channels {
        let id = ((c * 7 + rng.gen_range(0..3)) % 32 + 1) as f64;
        let lat = config.center.latitude + rng.gen_range(-1.0..=1.0) * config.spread_deg;
        let lon = config.center.longitude + rng.gen_range(-1.0..=1.0) * config.spread_deg;
        let dlat: f64 = rng.gen_range(-0.06..0.06);
        let dlon: f64 = rng.gen_range(-0.06..0.06);

        for t in 0..times {
            prn[[t, c]] = id;
            splat[[t, c]] = lat + dlat * t as f64;
            splon[[t, c]] = lon + dlon * t as f64;
            quality[[t, c]] = QUALITY_WORDS[rng.gen_range(0..QUALITY_WORDS.len())];
            code_phase[[t, c]] = rng.gen_range(0.0..1023.0);
            doppler_frequency[[t, c]] = rng.gen_range(-5000.0..5000.0);
            doppler_shift[[t, c]] = rng.gen_range(-1.0..1.0);

            let peak_doppler = doppler_bins as f64 / 2.0 + rng.gen_range(-2.0..2.0);
            let peak_code = code_bins as f64 / 2.0 + rng.gen_range(-4.0..4.0);
            let template =
                ddm_template(doppler_bins, code_bins, peak_doppler, peak_code, 1.0e-16);
            for ((d, k), power) in template.indexed_iter() {
                ddm[[t, c, d, k]] = *power + rng.gen_range(0.0..2.0e-18);
            }
        }
    }

    let mut store = ArrayStore::new()
        .with(keys.signal_id, prn.into_dyn())
        .with(keys.latitude, splat.into_dyn())
        .with(keys.longitude, splon.into_dyn())
        .with(keys.status, quality.into_dyn())
        .with(keys.code_phase, code_phase.into_dyn())
        .with(keys.doppler_frequency, doppler_frequency.into_dyn())
        .with(keys.doppler_shift, doppler_shift.into_dyn())
        .with(keys.ddm, ddm.into_dyn());
    if let (Some(week_key), Some(seconds_key)) = (keys.gps_week, keys.gps_seconds) {
        store.insert(week_key, Array::from_elem(IxDyn(&[times]), 2348.0));
        store.insert(
            seconds_key,
            Array::from_shape_fn(IxDyn(&[times]), |ix| start_sec + ix[0] as f64),
        );
    }
    store
}

/// Writes `root/<YYYYMMDD>/TRITON_<n>_<YYYYMMDD><HHMMSS><suffix>` files.
pub fn build_archive(root: &Path, config: &GeneratorConfig) -> anyhow::Result<ArchiveSummary> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut summary = ArchiveSummary::default();

    for day in 0..config.days {
        let day_name = format!("202501{:02}", day + 1);
        let directory = root.join(&day_name);
        fs::create_dir_all(&directory)
            .with_context(|| format!("creating archive directory {}", directory.display()))?;

        for file in 0..config.files_per_day {
            let start_sec = 64_800.0 + (file * 600) as f64;
            let clock = format!("{:02}{:02}00", 18 + file / 6, (file * 10) % 60);
            let name = format!(
                "TRITON_{:06}_{}{}{}",
                day * config.files_per_day + file,
                day_name,
                clock,
                config.suffix
            );
            let path = directory.join(name);
            let store = build_file(config, &mut rng, start_sec);
            let json = store
                .to_json()
                .with_context(|| format!("encoding {}", path.display()))?;
            fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            summary.files.push(path);
        }

        if config.corrupt_file && day == 0 {
            let path = directory.join(format!("TRITON_corrupt_{}{}", day_name, config.suffix));
            fs::write(&path, b"\x89HDF\r\n\x1a\n truncated transfer")
                .with_context(|| format!("writing {}", path.display()))?;
            summary.corrupt = Some(path);
        }
    }

    Ok(summary)
}
