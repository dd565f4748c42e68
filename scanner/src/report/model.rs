use ddmcore::archive_interface::MatchRecord;
use ddmcore::processing::{CalibratedAxes, DdmCalibrator};
use ddmcore::telemetry::Metrics;
use ddmcore::{CoreResult, GeodeticPoint};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One matched observation, ready for plotting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub record: MatchRecord,
    pub axes: CalibratedAxes,
    pub flags: String,
    pub title: String,
}

impl ReportEntry {
    pub fn new(record: MatchRecord, calibrator: &DdmCalibrator) -> CoreResult<Self> {
        let axes = record.axes(calibrator)?;
        let flags = record.active_statuses.display_text();
        let mut title = format!(
            "DDM PRN {} | SP lat/lon ({:.6}, {:.6})",
            record.signal_id, record.location.latitude, record.location.longitude
        );
        if let Some(gps) = record.gps_time {
            title.push_str(&format!(" | GPS Week {}, Sec {}", gps.week, gps.seconds));
        }
        Ok(Self {
            record,
            axes,
            flags,
            title,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportModel {
    pub target: Option<GeodeticPoint>,
    pub radius_km: f64,
    pub files_scanned: usize,
    pub failed_files: Vec<PathBuf>,
    pub entries: Vec<ReportEntry>,
}

impl ReportModel {
    pub fn build(
        target: GeodeticPoint,
        radius_km: f64,
        records: Vec<MatchRecord>,
        metrics: Metrics,
        calibrator: &DdmCalibrator,
    ) -> CoreResult<Self> {
        let entries = records
            .into_iter()
            .map(|record| ReportEntry::new(record, calibrator))
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self {
            target: Some(target),
            radius_km,
            files_scanned: metrics.files_scanned,
            failed_files: metrics.failed_files,
            entries,
        })
    }
}
