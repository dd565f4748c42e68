pub mod grid;
pub mod reader;
pub mod record;

pub use grid::{GpsTime, GridKeys, Observation, ObservationGrid};
pub use reader::{ArrayReader, ArrayStore, JsonArchive, SourceOpener};
pub use record::MatchRecord;
