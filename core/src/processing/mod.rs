pub mod calibration;
pub mod matcher;
pub mod scanner;
pub mod status;

pub use calibration::{CalibratedAxes, DdmCalibration, DdmCalibrator, DdmShape};
pub use matcher::{GridMatch, SpatialMatch, SpatialMatcher};
pub use scanner::ArchiveScanner;
pub use status::{StatusDecoder, StatusSet, StatusTable};
