//! Slowness grid, station offsets and plane-wave moveout.

pub mod grid;
pub mod moveout;
pub mod offsets;

pub use grid::{GridNode, RectangularSlownessGrid};
pub use moveout::compute_pwmoveout;
pub use offsets::{geographic_to_dne, StationGeometry};
