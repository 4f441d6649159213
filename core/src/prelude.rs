use serde::{Deserialize, Serialize};

use crate::output::StoreError;
use crate::seismic::{MetadataError, MetadataList};

/// Stack weights at or below this value are treated as zero.
pub const WEIGHT_MINIMUM: f64 = 1.0e-2;

/// Shared configuration for one ensemble-processing call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Start of the output window, relative to each trace's time base.
    pub tstart: f64,
    /// End of the output window (inclusive).
    pub tend: f64,
    /// Minimum number of used stations required to stack an ensemble.
    pub min_fold: usize,
    /// Sample interval of the coherence estimate.
    pub dtcoh: f64,
    /// Length of each coherence window.
    pub cohwinlen: f64,
    /// Ensemble metadata keys copied onto every stacked trace.
    pub copy_keys: MetadataList,
    /// Log per-node progress at info level instead of debug.
    pub verbose: bool,
    /// Number of workers for the grid sweep. `1` runs sequentially.
    pub workers: usize,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            tstart: 0.0,
            tend: 60.0,
            min_fold: 1,
            dtcoh: 1.0,
            cohwinlen: 2.0,
            copy_keys: Vec::new(),
            verbose: false,
            workers: 1,
        }
    }
}

/// Result of one ensemble-processing call that did not hit a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOutcome {
    /// The grid sweep ran and every produced pair was committed.
    Stacked {
        fold: usize,
        committed: usize,
        no_coverage: usize,
    },
    /// Too few stations fell inside the aperture; nothing was committed.
    InsufficientFold { fold: usize, required: usize },
}

impl StackOutcome {
    pub fn fold(&self) -> usize {
        match *self {
            StackOutcome::Stacked { fold, .. } => fold,
            StackOutcome::InsufficientFold { fold, .. } => fold,
        }
    }

    pub fn committed(&self) -> usize {
        match *self {
            StackOutcome::Stacked { committed, .. } => committed,
            StackOutcome::InsufficientFold { .. } => 0,
        }
    }
}

/// Common error type for fatal stacking failures.
#[derive(thiserror::Error, Debug)]
pub enum StackError {
    #[error("missing required metadata: {0}")]
    MissingMetadata(#[from] MetadataError),
    #[error("irreconcilable window request: {0}")]
    InvalidWindow(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("write failure: {0}")]
    Persistence(#[from] StoreError),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type StackResult<T> = Result<T, StackError>;

/// Result of stacking one slowness-grid node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome<T> {
    Stacked(T),
    /// No output sample reached the weight floor at this node.
    NoCoverage,
}

impl<T> NodeOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> NodeOutcome<U> {
        match self {
            NodeOutcome::Stacked(value) => NodeOutcome::Stacked(f(value)),
            NodeOutcome::NoCoverage => NodeOutcome::NoCoverage,
        }
    }
}
