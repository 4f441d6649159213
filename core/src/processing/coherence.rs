use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::policy::TopMute;
use crate::seismic::ThreeComponentSeismogram;

/// Windowed coherence of one stacked trace, per component and pooled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coharray {
    pub t0: f64,
    pub dt: f64,
    pub component: [Vec<f64>; 3],
    pub total: Vec<f64>,
}

impl Coharray {
    pub fn empty(t0: f64, dt: f64) -> Self {
        Self {
            t0,
            dt,
            component: [Vec::new(), Vec::new(), Vec::new()],
            total: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.total.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_empty()
    }

    pub fn mean_total(&self) -> f64 {
        if self.total.is_empty() {
            0.0
        } else {
            self.total.iter().sum::<f64>() / self.total.len() as f64
        }
    }
}

/// Everything a coherence estimator sees for one grid node.
///
/// `gather[c]` and `gathwgt` are `nsout × stack_count`, one column per used
/// station; `stack` is the finished, muted stacked trace.
pub struct CoherenceInput<'a> {
    pub gather: &'a [Array2<f64>; 3],
    pub gathwgt: &'a Array2<f64>,
    pub stack: &'a ThreeComponentSeismogram,
    pub dtcoh: f64,
    pub cohwinlen: f64,
    pub mute: &'a TopMute,
}

pub trait CoherenceEstimator: Send + Sync {
    fn estimate(&self, input: &CoherenceInput<'_>) -> Coharray;
}

/// Semblance-style coherence: one minus the weighted residual energy of the
/// gather about the stack, relative to the gather energy.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedSemblance;

fn coherence_ratio(residual: f64, energy: f64) -> f64 {
    if energy > 0.0 {
        (1.0 - residual / energy).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl CoherenceEstimator for WeightedSemblance {
    fn estimate(&self, input: &CoherenceInput<'_>) -> Coharray {
        let stack = input.stack;
        let mut coh = Coharray::empty(stack.t0, input.dtcoh);
        let nsout = stack.ns;
        if nsout == 0 || input.dtcoh <= 0.0 || stack.dt <= 0.0 {
            return coh;
        }

        let duration = stack.dt * (nsout - 1) as f64;
        let ncoh = (duration / input.dtcoh).floor() as usize + 1;
        let half = (input.cohwinlen / stack.dt / 2.0).round().max(0.0) as usize;
        let ncols = input.gathwgt.ncols();

        for k in 0..ncoh {
            let center = ((k as f64 * input.dtcoh / stack.dt).round() as usize).min(nsout - 1);
            let lo = center.saturating_sub(half);
            let hi = (center + half).min(nsout - 1);
            let mute_weight = input.mute.weight_at(stack.time(center));

            let (mut residual_all, mut energy_all) = (0.0, 0.0);
            for (c, gather) in input.gather.iter().enumerate() {
                let (mut residual, mut energy) = (0.0, 0.0);
                for i in lo..=hi {
                    let s = stack.u[[c, i]];
                    for col in 0..ncols {
                        let w = input.gathwgt[[i, col]];
                        if w <= 0.0 {
                            continue;
                        }
                        let g = gather[[i, col]];
                        let r = g - w * s;
                        residual += r * r;
                        energy += g * g;
                    }
                }
                coh.component[c].push(coherence_ratio(residual, energy) * mute_weight);
                residual_all += residual;
                energy_all += energy;
            }
            coh.total
                .push(coherence_ratio(residual_all, energy_all) * mute_weight);
        }
        coh
    }
}
