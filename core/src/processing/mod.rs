pub mod accumulator;
pub mod coherence;
pub mod engine;
pub mod weights;

#[cfg(test)]
mod tests;

pub use accumulator::{accumulate_node, NodeStack, Overlap};
pub use coherence::{Coharray, CoherenceEstimator, CoherenceInput, WeightedSemblance};
pub use engine::{PseudostationFrame, PwStackEngine, StackRequest, StackedPair, Sweep};
pub use weights::EnsembleWeights;
