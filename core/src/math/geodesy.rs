use crate::prelude::GeodeticPoint;
use serde::{Deserialize, Serialize};

/// Mean spherical Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance on a spherical Earth.
///
/// Inputs are expected within latitude `[-90, 90]` and longitude
/// `[-180, 180]`; values outside are not rejected. NaN coordinates yield a
/// NaN distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoDistance {
    pub earth_radius_km: f64,
}

impl Default for GeoDistance {
    fn default() -> Self {
        Self {
            earth_radius_km: EARTH_RADIUS_KM,
        }
    }
}

impl GeoDistance {
    pub fn new(earth_radius_km: f64) -> Self {
        Self { earth_radius_km }
    }

    /// Haversine distance between two points in kilometres.
    pub fn haversine_km(&self, a: GeodeticPoint, b: GeodeticPoint) -> f64 {
        let dlat = (b.latitude - a.latitude).to_radians();
        let dlon = (b.longitude - a.longitude).to_radians();
        let lat_a = a.latitude.to_radians();
        let lat_b = b.latitude.to_radians();

        let h = (dlat / 2.0).sin().powi(2)
            + lat_a.cos() * lat_b.cos() * (dlon / 2.0).sin().powi(2);
        // rounding can push h slightly outside [0, 1]
        let h = h.clamp(0.0, 1.0);

        2.0 * self.earth_radius_km * h.sqrt().atan2((1.0 - h).sqrt())
    }

    /// Upper bound of any distance returned by [`GeoDistance::haversine_km`].
    pub fn half_circumference_km(&self) -> f64 {
        std::f64::consts::PI * self.earth_radius_km
    }
}
