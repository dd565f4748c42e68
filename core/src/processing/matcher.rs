use crate::archive_interface::grid::ObservationGrid;
use crate::math::geodesy::GeoDistance;
use crate::prelude::{CoreError, CoreResult, GeodeticPoint, ObservationKey};

/// Slack added to the radius so that coincident points match at radius 0.
pub const MATCH_TOLERANCE_KM: f64 = 1e-9;

/// Observation within the search radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialMatch {
    pub key: ObservationKey,
    pub distance_km: f64,
}

/// Match from one grid of a collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMatch {
    pub grid_index: usize,
    pub hit: SpatialMatch,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialMatcher {
    distance: GeoDistance,
}

impl SpatialMatcher {
    pub fn new(distance: GeoDistance) -> Self {
        Self { distance }
    }

    /// Lazily yields every observation within `radius_km` of `target`, in
    /// ascending time then channel order. Fill cells and observations with
    /// NaN coordinates never match.
    pub fn find_within_radius<'g>(
        &self,
        grid: &'g ObservationGrid,
        target: GeodeticPoint,
        radius_km: f64,
    ) -> CoreResult<impl Iterator<Item = SpatialMatch> + 'g> {
        validate_radius(radius_km)?;
        let distance = self.distance;
        let (times, channels) = grid.dimensions();
        Ok((0..times)
            .flat_map(move |t| (0..channels).map(move |c| ObservationKey::new(t, c)))
            .filter(move |&key| !grid.is_fill(key))
            .filter_map(move |key| {
                let distance_km = distance.haversine_km(target, grid.location(key));
                (distance_km <= radius_km + MATCH_TOLERANCE_KM).then_some(SpatialMatch {
                    key,
                    distance_km,
                })
            }))
    }

    /// Runs [`Self::find_within_radius`] over each grid in turn.
    pub fn find_in_grids<'g>(
        &self,
        grids: &'g [ObservationGrid],
        target: GeodeticPoint,
        radius_km: f64,
    ) -> CoreResult<impl Iterator<Item = GridMatch> + 'g> {
        validate_radius(radius_km)?;
        let matcher = *self;
        Ok(grids.iter().enumerate().flat_map(move |(grid_index, grid)| {
            matcher
                .find_within_radius(grid, target, radius_km)
                .into_iter()
                .flatten()
                .map(move |hit| GridMatch { grid_index, hit })
        }))
    }
}

pub(crate) fn validate_radius(radius_km: f64) -> CoreResult<()> {
    if radius_km >= 0.0 {
        Ok(())
    } else {
        Err(CoreError::InvalidArgument(format!(
            "search radius must be a non-negative number of km, got {}",
            radius_km
        )))
    }
}
