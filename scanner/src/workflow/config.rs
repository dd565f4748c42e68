use anyhow::Context;
use ddmcore::archive_interface::{GridKeys, JsonArchive};
use ddmcore::math::GeoDistance;
use ddmcore::processing::{
    ArchiveScanner, DdmCalibrator, SpatialMatcher, StatusDecoder, StatusTable,
};
use ddmcore::GeodeticPoint;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FILE_SUFFIX: &str = "_nc";

fn default_file_suffix() -> String {
    DEFAULT_FILE_SUFFIX.to_string()
}

fn default_jobs() -> usize {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub directory_prefix: Option<String>,
    #[serde(default = "default_file_suffix")]
    pub file_suffix: String,
    pub target: GeodeticPoint,
    pub radius_km: f64,
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    #[serde(default)]
    pub keys: GridKeys,
    #[serde(default)]
    pub calibration: DdmCalibrator,
    #[serde(default)]
    pub distance: GeoDistance,
    #[serde(default)]
    pub status_table: StatusTable,
}

impl ScanConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading scan config {}", path_ref.display()))?;
        let config: ScanConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing scan config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(root: PathBuf, latitude: f64, longitude: f64, radius_km: f64) -> Self {
        Self {
            root,
            directory_prefix: None,
            file_suffix: default_file_suffix(),
            target: GeodeticPoint::new(latitude, longitude),
            radius_km,
            jobs: default_jobs(),
            keys: GridKeys::default(),
            calibration: DdmCalibrator::default(),
            distance: GeoDistance::default(),
            status_table: StatusTable::default(),
        }
    }

    pub fn accepts_file(&self, name: &str) -> bool {
        name.ends_with(&self.file_suffix)
    }

    pub fn build_scanner(&self) -> ArchiveScanner<JsonArchive> {
        let scanner = ArchiveScanner::new(JsonArchive)
            .with_keys(self.keys.clone())
            .with_matcher(SpatialMatcher::new(self.distance))
            .with_decoder(StatusDecoder::new(self.status_table.clone()));
        match self.directory_prefix.clone() {
            Some(prefix) => {
                scanner.with_directory_filter(move |name| name.starts_with(&prefix))
            }
            None => scanner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_uses_defaults() {
        let cfg = ScanConfig::from_args(PathBuf::from("/data"), 10.3, 79.7, 50.0);
        assert_eq!(cfg.target, GeodeticPoint::new(10.3, 79.7));
        assert_eq!(cfg.calibration.code_bin_width, 0.25);
        assert_eq!(cfg.distance.earth_radius_km, 6371.0);
        assert!(cfg.accepts_file("TRITON_185832_20250107174354_CorDDM_v2.0_nc"));
        assert!(!cfg.accepts_file("ddm_prn5_idx0_1.png"));
    }

    #[test]
    fn config_load_reads_yaml_with_overrides() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"root: /archive\n\
              directory_prefix: \"202501\"\n\
              target: { latitude: 10.324902, longitude: 79.753311 }\n\
              radius_km: 25\n\
              jobs: 4\n\
              calibration: { doppler_bin_width: 250.0 }\n\
              status_table:\n  - { mask: 1, label: Reserved }\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = ScanConfig::load(&path).unwrap();
        assert_eq!(cfg.root, PathBuf::from("/archive"));
        assert_eq!(cfg.directory_prefix.as_deref(), Some("202501"));
        assert_eq!(cfg.file_suffix, "_nc");
        assert_eq!(cfg.jobs, 4);
        assert_eq!(cfg.calibration.code_bin_width, 0.25);
        assert_eq!(cfg.calibration.doppler_bin_width, 250.0);
        assert_eq!(cfg.keys.signal_id, "PRN");
        assert_eq!(cfg.status_table.flags.len(), 1);
    }

    #[test]
    fn config_load_reports_missing_fields() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"root: /archive\n").unwrap();
        let path = temp.into_temp_path();
        let err = ScanConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing scan config"));
    }
}
