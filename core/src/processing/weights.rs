use ndarray::Array2;

use crate::geometry::StationGeometry;
use crate::policy::{compute_pseudostation_weights, DepthDependentAperture};
use crate::prelude::WEIGHT_MINIMUM;

/// Per-station, per-output-sample stacking weights for one ensemble.
///
/// `weights[[j, i]]` is the weight of station `j` at output sample `i`. The
/// matrix depends only on geometry and aperture, never on the slowness node.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleWeights {
    pub weights: Array2<f64>,
    pub used: Vec<bool>,
}

impl EnsembleWeights {
    /// Evaluate the aperture at `tstart + i*dt` for every output sample `i`.
    pub fn compute(
        geometry: &StationGeometry,
        aperture: &DepthDependentAperture,
        tstart: f64,
        dt: f64,
        nsout: usize,
    ) -> Self {
        let nsta = geometry.len();
        let mut weights = Array2::zeros((nsta, nsout));
        let mut used = vec![false; nsta];
        let mut work = vec![0.0; nsta];

        for i in 0..nsout {
            let t = tstart + dt * i as f64;
            compute_pseudostation_weights(
                &geometry.dnorth,
                &geometry.deast,
                aperture.get_aperture(t),
                aperture.get_cutoff(t),
                &mut work,
            );
            for (j, &w) in work.iter().enumerate() {
                if w > WEIGHT_MINIMUM {
                    weights[[j, i]] = w;
                    used[j] = true;
                }
            }
        }
        Self { weights, used }
    }

    /// Number of stations with a nonzero weight at some output sample.
    pub fn fold(&self) -> usize {
        self.used.iter().filter(|&&u| u).count()
    }

    pub fn nsta(&self) -> usize {
        self.weights.nrows()
    }

    pub fn nsout(&self) -> usize {
        self.weights.ncols()
    }
}
