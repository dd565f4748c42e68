use crate::archive_interface::grid::{GpsTime, Observation};
use crate::math::stats::StatsHelper;
use crate::prelude::{CoreResult, GeodeticPoint, ObservationKey};
use crate::processing::calibration::{CalibratedAxes, DdmCalibration, DdmCalibrator, DdmShape};
use crate::processing::status::StatusSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Observation found near a point of interest, with its decoded status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub source_file: PathBuf,
    pub key: ObservationKey,
    pub signal_id: i64,
    pub location: GeodeticPoint,
    pub distance_km: f64,
    pub status_word: i64,
    pub active_statuses: StatusSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_time: Option<GpsTime>,
    pub ddm_shape: DdmShape,
    pub calibration: DdmCalibration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_power: Option<f64>,
}

impl MatchRecord {
    pub fn new(
        source_file: &Path,
        observation: &Observation<'_>,
        distance_km: f64,
        active_statuses: StatusSet,
    ) -> Self {
        Self {
            source_file: source_file.to_path_buf(),
            key: observation.key,
            signal_id: observation.signal_id,
            location: observation.location,
            distance_km,
            status_word: observation.status_word,
            active_statuses,
            gps_time: observation.gps_time,
            ddm_shape: observation.ddm_shape(),
            calibration: observation.calibration,
            peak_power: StatsHelper::peak(observation.ddm.view()),
        }
    }

    /// Axis extrema for rendering this record's DDM.
    pub fn axes(&self, calibrator: &DdmCalibrator) -> CoreResult<CalibratedAxes> {
        calibrator.axes(self.ddm_shape, self.calibration)
    }
}
