use crate::prelude::{CoreError, CoreResult};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Assumed code-delay bin width in chips.
pub const DEFAULT_CODE_BIN_WIDTH: f64 = 0.25;
/// Assumed Doppler bin width in Hz.
pub const DEFAULT_DOPPLER_BIN_WIDTH: f64 = 500.0;

/// DDM dimensions, Doppler bins by code bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdmShape {
    pub doppler_bins: usize,
    pub code_bins: usize,
}

impl DdmShape {
    pub fn new(doppler_bins: usize, code_bins: usize) -> Self {
        Self {
            doppler_bins,
            code_bins,
        }
    }
}

/// Per-observation calibration scalars read alongside a DDM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DdmCalibration {
    /// Chips.
    pub code_phase: f64,
    /// Hz.
    pub doppler_frequency: f64,
    /// Doppler bins.
    pub doppler_shift: f64,
}

/// Physical axis extrema of one DDM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibratedAxes {
    pub code_min: f64,
    pub code_max: f64,
    pub doppler_min: f64,
    pub doppler_max: f64,
}

impl CalibratedAxes {
    /// `[code_min, code_max, doppler_min, doppler_max]`, the image extent of
    /// a DDM drawn with code delay on x and Doppler on y.
    pub fn extent(&self) -> [f64; 4] {
        [self.code_min, self.code_max, self.doppler_min, self.doppler_max]
    }
}

/// Linear bin-index to physical-value mapping for DDM axes.
///
/// The bin widths are instrument assumptions rather than published values and
/// can be overridden per archive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DdmCalibrator {
    pub code_bin_width: f64,
    pub doppler_bin_width: f64,
}

impl Default for DdmCalibrator {
    fn default() -> Self {
        Self {
            code_bin_width: DEFAULT_CODE_BIN_WIDTH,
            doppler_bin_width: DEFAULT_DOPPLER_BIN_WIDTH,
        }
    }
}

impl DdmCalibrator {
    pub fn new(code_bin_width: f64, doppler_bin_width: f64) -> Self {
        Self {
            code_bin_width,
            doppler_bin_width,
        }
    }

    pub fn axes(
        &self,
        shape: DdmShape,
        calibration: DdmCalibration,
    ) -> CoreResult<CalibratedAxes> {
        validate(shape)?;
        let (code_center, doppler_center) = centers(shape);
        Ok(CalibratedAxes {
            code_min: self.code_value(0.0, code_center, calibration),
            code_max: self.code_value(shape.code_bins as f64 - 1.0, code_center, calibration),
            doppler_min: self.doppler_value(0.0, doppler_center, calibration),
            doppler_max: self.doppler_value(
                shape.doppler_bins as f64 - 1.0,
                doppler_center,
                calibration,
            ),
        })
    }

    /// Code delay in chips at every code bin.
    pub fn code_axis(
        &self,
        shape: DdmShape,
        calibration: DdmCalibration,
    ) -> CoreResult<Array1<f64>> {
        validate(shape)?;
        let (code_center, _) = centers(shape);
        Ok(Array1::from_iter((0..shape.code_bins).map(|bin| {
            self.code_value(bin as f64, code_center, calibration)
        })))
    }

    /// Doppler frequency in Hz at every Doppler bin.
    pub fn doppler_axis(
        &self,
        shape: DdmShape,
        calibration: DdmCalibration,
    ) -> CoreResult<Array1<f64>> {
        validate(shape)?;
        let (_, doppler_center) = centers(shape);
        Ok(Array1::from_iter((0..shape.doppler_bins).map(|bin| {
            self.doppler_value(bin as f64, doppler_center, calibration)
        })))
    }

    fn code_value(&self, bin: f64, center: f64, calibration: DdmCalibration) -> f64 {
        calibration.code_phase + (bin - center) * self.code_bin_width
    }

    fn doppler_value(&self, bin: f64, center: f64, calibration: DdmCalibration) -> f64 {
        calibration.doppler_frequency
            + (bin - center + calibration.doppler_shift) * self.doppler_bin_width
    }
}

fn validate(shape: DdmShape) -> CoreResult<()> {
    if shape.doppler_bins == 0 || shape.code_bins == 0 {
        return Err(CoreError::InvalidArgument(format!(
            "DDM shape must be positive, got {}x{}",
            shape.doppler_bins, shape.code_bins
        )));
    }
    Ok(())
}

fn centers(shape: DdmShape) -> (f64, f64) {
    ((shape.code_bins / 2) as f64, (shape.doppler_bins / 2) as f64)
}
