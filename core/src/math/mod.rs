pub mod geodesy;
pub mod stats;

pub use geodesy::GeoDistance;
pub use stats::StatsHelper;
