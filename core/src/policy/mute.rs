use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::seismic::ThreeComponentSeismogram;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaperKind {
    #[default]
    Linear,
    Cosine,
}

/// Top mute: zero before `t0e`, ramp up to unity at `t1`, pass after.
///
/// Times are measured on the trace's own time axis (`t0 + i*dt`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopMute {
    pub t0e: f64,
    pub t1: f64,
    #[serde(default)]
    pub taper: TaperKind,
}

impl TopMute {
    pub fn new(t0e: f64, t1: f64, taper: TaperKind) -> Self {
        Self { t0e, t1, taper }
    }

    /// The same mute moved later by `tshift`.
    pub fn shifted(&self, tshift: f64) -> Self {
        Self {
            t0e: self.t0e + tshift,
            t1: self.t1 + tshift,
            taper: self.taper,
        }
    }

    /// Mute multiplier at time `t`, in `[0, 1]`.
    pub fn weight_at(&self, t: f64) -> f64 {
        if t < self.t0e {
            0.0
        } else if t >= self.t1 {
            1.0
        } else {
            let frac = (t - self.t0e) / (self.t1 - self.t0e);
            match self.taper {
                TaperKind::Linear => frac,
                TaperKind::Cosine => 0.5 * (1.0 - (PI * frac).cos()),
            }
        }
    }

    pub fn apply(&self, trace: &mut ThreeComponentSeismogram) {
        for i in 0..trace.ns {
            let w = self.weight_at(trace.time(i));
            if w < 1.0 {
                trace.u.column_mut(i).mapv_inplace(|v| v * w);
            } else {
                // weight is unity from here on
                break;
            }
        }
    }
}
