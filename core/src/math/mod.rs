pub mod stats;
pub mod vector;

pub use stats::StatsHelper;
pub use vector::{dcopy, dzero, strided, strided_mut, vadd, vscal};
