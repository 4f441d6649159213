//! Persistence seams for stacked traces and their coherence records.

use crate::processing::coherence::Coharray;
use crate::seismic::ThreeComponentSeismogram;

/// Failure reported by a persistence collaborator.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("store rejected record: {0}")]
    Rejected(String),
}

pub trait TraceStore {
    fn save(&mut self, trace: &ThreeComponentSeismogram) -> Result<(), StoreError>;
}

pub trait CoherenceStore {
    /// `trace` is the stack the coherence record describes.
    fn save(&mut self, coh: &Coharray, trace: &ThreeComponentSeismogram) -> Result<(), StoreError>;
}

/// Keeps every committed record in memory, in commit order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub traces: Vec<ThreeComponentSeismogram>,
    pub coherence: Vec<Coharray>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TraceStore for MemoryStore {
    fn save(&mut self, trace: &ThreeComponentSeismogram) -> Result<(), StoreError> {
        self.traces.push(trace.clone());
        Ok(())
    }
}

impl CoherenceStore for MemoryStore {
    fn save(&mut self, coh: &Coharray, _trace: &ThreeComponentSeismogram) -> Result<(), StoreError> {
        self.coherence.push(coh.clone());
        Ok(())
    }
}
