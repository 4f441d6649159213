//! Mute and aperture policies applied while stacking.

pub mod aperture;
pub mod mute;

pub use aperture::{compute_pseudostation_weights, ApertureError, DepthDependentAperture};
pub use mute::{TaperKind, TopMute};
