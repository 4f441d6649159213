use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::seismic::metadata::Metadata;

/// A three-component seismogram stored as a `3 × ns` sample matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreeComponentSeismogram {
    pub dt: f64,
    pub t0: f64,
    pub ns: usize,
    pub live: bool,
    pub u: Array2<f64>,
    pub metadata: Metadata,
}

impl ThreeComponentSeismogram {
    /// An all-zero live trace of `ns` samples.
    pub fn zeros(ns: usize, dt: f64, t0: f64) -> Self {
        Self {
            dt,
            t0,
            ns,
            live: true,
            u: Array2::zeros((3, ns)),
            metadata: Metadata::new(),
        }
    }

    /// Wrap an existing sample matrix. `u` must have three rows.
    pub fn from_samples(u: Array2<f64>, dt: f64, t0: f64) -> Option<Self> {
        if u.nrows() != 3 {
            return None;
        }
        Some(Self {
            dt,
            t0,
            ns: u.ncols(),
            live: true,
            u,
            metadata: Metadata::new(),
        })
    }

    pub fn time(&self, i: usize) -> f64 {
        self.t0 + self.dt * i as f64
    }

    /// Nearest sample index to time `t`; may fall outside `0..ns`.
    pub fn sample_at(&self, t: f64) -> i64 {
        ((t - self.t0) / self.dt).round() as i64
    }

    pub fn endtime(&self) -> f64 {
        self.time(self.ns.saturating_sub(1))
    }
}

/// An ordered group of three-component seismograms with shared attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreeComponentEnsemble {
    pub metadata: Metadata,
    pub members: Vec<ThreeComponentSeismogram>,
}

impl ThreeComponentEnsemble {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            members: Vec::new(),
        }
    }

    pub fn live_members(&self) -> impl Iterator<Item = &ThreeComponentSeismogram> {
        self.members.iter().filter(|m| m.live)
    }
}
