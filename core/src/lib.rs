//! Geospatial correlation and delay-Doppler map calibration core for
//! GNSS reflectometry observation archives.
//!
//! The modules locate observations whose specular point lies near a point of
//! interest, decode their quality bitmasks and compute the physical axes
//! needed to render a DDM.

pub mod archive_interface;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use prelude::{CoreError, CoreResult, GeodeticPoint, ObservationKey};
