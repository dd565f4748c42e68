use crate::archive_interface::reader::{ArrayReader, SourceOpener};
use crate::prelude::{CoreError, CoreResult, GeodeticPoint, ObservationKey};
use crate::processing::calibration::{DdmCalibration, DdmShape};
use ndarray::{s, Array1, Array2, Array4, ArrayView2, ArrayViewD, Ix1, Ix2, Ix4};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Names of the arrays an observation grid is assembled from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridKeys {
    pub signal_id: String,
    pub latitude: String,
    pub longitude: String,
    pub status: String,
    pub ddm: String,
    pub code_phase: String,
    pub doppler_frequency: String,
    pub doppler_shift: String,
    pub gps_week: Option<String>,
    pub gps_seconds: Option<String>,
}

impl Default for GridKeys {
    fn default() -> Self {
        Self {
            signal_id: "PRN".into(),
            latitude: "splat".into(),
            longitude: "splon".into(),
            status: "quality_flags".into(),
            ddm: "DDMpower".into(),
            code_phase: "CodePhase".into(),
            doppler_frequency: "DopplerFrequency".into(),
            doppler_shift: "DopplerShift".into(),
            gps_week: Some("GPSWeek".into()),
            gps_seconds: Some("GPSSec".into()),
        }
    }
}

/// GPS time of one time step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsTime {
    pub week: i64,
    pub seconds: f64,
}

/// Read-only view of one (time, channel) cell.
#[derive(Debug, Clone)]
pub struct Observation<'g> {
    pub key: ObservationKey,
    pub signal_id: i64,
    pub location: GeodeticPoint,
    pub status_word: i64,
    pub calibration: DdmCalibration,
    pub ddm: ArrayView2<'g, f64>,
    pub gps_time: Option<GpsTime>,
}

impl Observation<'_> {
    pub fn ddm_shape(&self) -> DdmShape {
        let (doppler_bins, code_bins) = self.ddm.dim();
        DdmShape::new(doppler_bins, code_bins)
    }
}

/// Decoded time x channel arrays of one archive file.
///
/// The underlying reader is released once [`ObservationGrid::open`] returns;
/// the grid only holds its own copies of the arrays. Cells whose signal
/// identifier or status word is a fill value (non-finite) hold no observation.
#[derive(Debug, Clone)]
pub struct ObservationGrid {
    source: PathBuf,
    signal_ids: Array2<Option<i64>>,
    latitudes: Array2<f64>,
    longitudes: Array2<f64>,
    status_words: Array2<Option<i64>>,
    code_phase: Array2<f64>,
    doppler_frequency: Array2<f64>,
    doppler_shift: Array2<f64>,
    ddm: Array4<f64>,
    gps_time: Option<(Array1<i64>, Array1<f64>)>,
}

impl ObservationGrid {
    pub fn open<O: SourceOpener>(opener: &O, path: &Path, keys: &GridKeys) -> CoreResult<Self> {
        let reader = opener.open(path)?;
        Self::from_reader(path, &reader, keys)
    }

    /// Opens `path`, hands the grid to `access` and drops it on every exit path.
    pub fn with_open<O, T, F>(
        opener: &O,
        path: &Path,
        keys: &GridKeys,
        access: F,
    ) -> CoreResult<T>
    where
        O: SourceOpener,
        F: FnOnce(&ObservationGrid) -> CoreResult<T>,
    {
        let grid = Self::open(opener, path, keys)?;
        access(&grid)
    }

    pub fn from_reader<R: ArrayReader>(
        path: &Path,
        reader: &R,
        keys: &GridKeys,
    ) -> CoreResult<Self> {
        let loader = Loader { path, reader };

        let signal_ids = loader.integers(&keys.signal_id, None)?;
        let dims = signal_ids.dim();
        let latitudes = loader.floats(&keys.latitude, dims)?;
        let longitudes = loader.floats(&keys.longitude, dims)?;
        let status_words = loader.integers(&keys.status, Some(dims))?;
        if status_words.iter().flatten().any(|&word| word < 0) {
            return Err(CoreError::malformed(
                path,
                format!("array `{}` holds negative status words", keys.status),
            ));
        }
        let code_phase = loader.floats(&keys.code_phase, dims)?;
        let doppler_frequency = loader.floats(&keys.doppler_frequency, dims)?;
        let doppler_shift = loader.floats(&keys.doppler_shift, dims)?;
        let ddm = loader.cube(&keys.ddm, dims)?;

        let gps_time = match (&keys.gps_week, &keys.gps_seconds) {
            (Some(week_key), Some(seconds_key)) => {
                loader.gps_time(week_key, seconds_key, dims.0)?
            }
            _ => None,
        };

        Ok(Self {
            source: path.to_path_buf(),
            signal_ids,
            latitudes,
            longitudes,
            status_words,
            code_phase,
            doppler_frequency,
            doppler_shift,
            ddm,
            gps_time,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// `(time_count, channel_count)`.
    pub fn dimensions(&self) -> (usize, usize) {
        self.signal_ids.dim()
    }

    /// Fails with [`CoreError::OutOfRange`] outside [`Self::dimensions`] and
    /// with [`CoreError::FillValue`] on a fill cell.
    pub fn at(&self, key: ObservationKey) -> CoreResult<Observation<'_>> {
        self.check(key)?;
        let index = (key.time_index, key.channel_index);
        let ids = (self.signal_ids[index], self.status_words[index]);
        let (Some(signal_id), Some(status_word)) = ids else {
            return Err(CoreError::FillValue(format!(
                "cell t={} ch={} of {} has no signal identifier or status word",
                key.time_index,
                key.channel_index,
                self.source.display()
            )));
        };
        Ok(Observation {
            key,
            signal_id,
            location: self.location(key),
            status_word,
            calibration: DdmCalibration {
                code_phase: self.code_phase[index],
                doppler_frequency: self.doppler_frequency[index],
                doppler_shift: self.doppler_shift[index],
            },
            ddm: self.ddm.slice(s![key.time_index, key.channel_index, .., ..]),
            gps_time: self.gps_time.as_ref().map(|(weeks, seconds)| GpsTime {
                week: weeks[key.time_index],
                seconds: seconds[key.time_index],
            }),
        })
    }

    /// Whether `key`, which must lie inside [`Self::dimensions`], is a fill cell.
    pub fn is_fill(&self, key: ObservationKey) -> bool {
        let index = (key.time_index, key.channel_index);
        self.signal_ids[index].is_none() || self.status_words[index].is_none()
    }

    /// Specular point of `key`, which must lie inside [`Self::dimensions`].
    pub(crate) fn location(&self, key: ObservationKey) -> GeodeticPoint {
        let index = (key.time_index, key.channel_index);
        GeodeticPoint::new(self.latitudes[index], self.longitudes[index])
    }

    fn check(&self, key: ObservationKey) -> CoreResult<()> {
        let (times, channels) = self.dimensions();
        if key.time_index >= times {
            return Err(CoreError::OutOfRange(format!(
                "time index {} outside [0, {})",
                key.time_index, times
            )));
        }
        if key.channel_index >= channels {
            return Err(CoreError::OutOfRange(format!(
                "channel index {} outside [0, {})",
                key.channel_index, channels
            )));
        }
        Ok(())
    }
}

struct Loader<'a, R> {
    path: &'a Path,
    reader: &'a R,
}

impl<'a, R: ArrayReader> Loader<'a, R> {
    fn required(&self, key: &str) -> CoreResult<ArrayViewD<'a, f64>> {
        let reader: &'a R = self.reader;
        reader
            .array(key)
            .ok_or_else(|| CoreError::malformed(self.path, format!("missing array `{}`", key)))
    }

    fn matrix(
        &self,
        key: &str,
        expected: Option<(usize, usize)>,
    ) -> CoreResult<ArrayView2<'a, f64>> {
        let view = self.required(key)?;
        let shape = view.shape().to_vec();
        let matrix = view.into_dimensionality::<Ix2>().map_err(|_| {
            CoreError::malformed(
                self.path,
                format!("array `{}` must be 2-D, got shape {:?}", key, shape),
            )
        })?;
        if let Some(dims) = expected {
            if matrix.dim() != dims {
                return Err(CoreError::malformed(
                    self.path,
                    format!(
                        "array `{}` has shape {:?}, expected {:?}",
                        key,
                        matrix.dim(),
                        dims
                    ),
                ));
            }
        }
        Ok(matrix)
    }

    fn floats(&self, key: &str, dims: (usize, usize)) -> CoreResult<Array2<f64>> {
        Ok(self.matrix(key, Some(dims))?.to_owned())
    }

    /// Non-finite cells are fill values; finite cells must be integers.
    fn integers(
        &self,
        key: &str,
        expected: Option<(usize, usize)>,
    ) -> CoreResult<Array2<Option<i64>>> {
        let matrix = self.matrix(key, expected)?;
        if matrix.iter().any(|v| v.is_finite() && !is_integral(*v)) {
            return Err(CoreError::malformed(
                self.path,
                format!("array `{}` must hold integers", key),
            ));
        }
        Ok(matrix.mapv(|v| v.is_finite().then_some(v as i64)))
    }

    fn cube(&self, key: &str, dims: (usize, usize)) -> CoreResult<Array4<f64>> {
        let view = self.required(key)?;
        let shape = view.shape().to_vec();
        let cube = view.into_dimensionality::<Ix4>().map_err(|_| {
            CoreError::malformed(
                self.path,
                format!("array `{}` must be 4-D, got shape {:?}", key, shape),
            )
        })?;
        let (times, channels, doppler_bins, code_bins) = cube.dim();
        if (times, channels) != dims || doppler_bins == 0 || code_bins == 0 {
            return Err(CoreError::malformed(
                self.path,
                format!(
                    "array `{}` has shape {:?}, expected ({}, {}, >0, >0)",
                    key, shape, dims.0, dims.1
                ),
            ));
        }
        Ok(cube.to_owned())
    }

    fn gps_time(
        &self,
        week_key: &str,
        seconds_key: &str,
        times: usize,
    ) -> CoreResult<Option<(Array1<i64>, Array1<f64>)>> {
        let reader: &'a R = self.reader;
        let (Some(weeks), Some(seconds)) = (reader.array(week_key), reader.array(seconds_key))
        else {
            return Ok(None);
        };
        let vector = |key: &str, view: ArrayViewD<'a, f64>| {
            view.into_dimensionality::<Ix1>()
                .ok()
                .filter(|v| v.len() == times)
                .ok_or_else(|| {
                    CoreError::malformed(
                        self.path,
                        format!("array `{}` must be 1-D with {} entries", key, times),
                    )
                })
        };
        let weeks = vector(week_key, weeks)?;
        let seconds = vector(seconds_key, seconds)?;
        if weeks.iter().any(|v| !is_integral(*v)) {
            return Err(CoreError::malformed(
                self.path,
                format!("array `{}` must hold finite integers", week_key),
            ));
        }
        Ok(Some((weeks.mapv(|v| v as i64), seconds.to_owned())))
    }
}

fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::archive_interface::reader::ArrayStore;
    use ndarray::{Array, ArrayD, IxDyn};

    fn cells(times: usize, channels: usize, f: impl Fn(usize, usize) -> f64) -> ArrayD<f64> {
        ArrayD::from_shape_fn(IxDyn(&[times, channels]), |ix| f(ix[0], ix[1]))
    }

    /// Synthetic archive with the given specular points laid out as
    /// `locations[time][channel]` and 4x8 DDMs.
    pub(crate) fn store(locations: &[Vec<(f64, f64)>]) -> ArrayStore {
        let times = locations.len();
        let channels = locations.first().map_or(0, Vec::len);
        ArrayStore::new()
            .with("PRN", cells(times, channels, |t, c| (t * 10 + c + 1) as f64))
            .with("splat", cells(times, channels, |t, c| locations[t][c].0))
            .with("splon", cells(times, channels, |t, c| locations[t][c].1))
            .with(
                "quality_flags",
                cells(times, channels, |t, c| if (t + c) % 2 == 0 { 0.0 } else { 66.0 }),
            )
            .with("CodePhase", cells(times, channels, |t, _| 500.0 + t as f64))
            .with("DopplerFrequency", cells(times, channels, |_, c| 1000.0 * c as f64))
            .with("DopplerShift", cells(times, channels, |_, _| 0.5))
            .with(
                "DDMpower",
                Array::from_shape_fn(IxDyn(&[times, channels, 4, 8]), |ix| {
                    (ix[0] + ix[1] + ix[2] * ix[3]) as f64
                }),
            )
            .with("GPSWeek", Array::from_elem(IxDyn(&[times]), 2348.0))
            .with(
                "GPSSec",
                Array::from_shape_fn(IxDyn(&[times]), |ix| 64800.0 + ix[0] as f64),
            )
    }

    pub(crate) fn grid(locations: &[Vec<(f64, f64)>]) -> ObservationGrid {
        let keys = GridKeys::default();
        ObservationGrid::from_reader(Path::new("synthetic_nc"), &store(locations), &keys)
            .unwrap()
    }
}
