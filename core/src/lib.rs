//! Plane-wave stacking core for passive seismic array processing.
//!
//! An ensemble of three-component recordings around one pseudostation is
//! weighted by a time-variable aperture, time-aligned for every node of a
//! relative slowness grid, and summed into one stacked trace per node. Each
//! stack is paired with a windowed coherence estimate and committed, in grid
//! order, to caller-supplied stores.

pub mod geometry;
pub mod math;
pub mod output;
pub mod policy;
pub mod prelude;
pub mod processing;
pub mod seismic;
pub mod telemetry;

pub use prelude::{NodeOutcome, StackConfig, StackError, StackOutcome, StackResult};
pub use processing::{PwStackEngine, StackRequest};
