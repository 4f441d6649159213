//! Waveform containers and the attribute map that travels with them.

pub mod metadata;
pub mod naming;
pub mod seismogram;

pub use metadata::{Metadata, MetadataError, MetadataList};
pub use naming::{make_dfile_name, virtual_station_name};
pub use seismogram::{ThreeComponentEnsemble, ThreeComponentSeismogram};
