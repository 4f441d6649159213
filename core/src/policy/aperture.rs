use serde::{Deserialize, Serialize};

/// Invalid table handed to [`DepthDependentAperture::from_tables`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ApertureError {
    #[error("aperture tables are empty")]
    Empty,
    #[error("aperture tables differ in length ({times} times, {apertures} apertures, {cutoffs} cutoffs)")]
    LengthMismatch {
        times: usize,
        apertures: usize,
        cutoffs: usize,
    },
    #[error("aperture times must be strictly increasing")]
    NotIncreasing,
    #[error("Fresnel aperture needs 0 < vs < vp and a positive period (vs={vs}, vp={vp}, period={period})")]
    InvalidVelocities { vs: f64, vp: f64, period: f64 },
}

/// Time-variable stacking aperture.
///
/// The aperture radius and hard cutoff are sampled at increasing lag times and
/// interpolated linearly between samples; beyond the table ends the first or
/// last value holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthDependentAperture {
    t: Vec<f64>,
    aperture: Vec<f64>,
    cutoff: Vec<f64>,
}

impl DepthDependentAperture {
    pub fn constant(aperture: f64, cutoff: f64) -> Self {
        Self {
            t: vec![0.0],
            aperture: vec![aperture],
            cutoff: vec![cutoff],
        }
    }

    pub fn from_tables(
        t: Vec<f64>,
        aperture: Vec<f64>,
        cutoff: Vec<f64>,
    ) -> Result<Self, ApertureError> {
        if t.is_empty() {
            return Err(ApertureError::Empty);
        }
        if t.len() != aperture.len() || t.len() != cutoff.len() {
            return Err(ApertureError::LengthMismatch {
                times: t.len(),
                apertures: aperture.len(),
                cutoffs: cutoff.len(),
            });
        }
        if t.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(ApertureError::NotIncreasing);
        }
        Ok(Self { t, aperture, cutoff })
    }

    /// Aperture that tracks the first Fresnel zone of a P-to-S conversion.
    ///
    /// At lag `tau` the conversion depth is `z = tau / (1/vs - 1/vp)` and the
    /// zone radius is `sqrt(lambda*z + lambda^2/4)` with `lambda = vs*period`.
    /// The cutoff is the radius scaled by `cutoff_multiplier`.
    pub fn fresnel(
        vs: f64,
        vp: f64,
        period: f64,
        dtau: f64,
        ntau: usize,
        cutoff_multiplier: f64,
    ) -> Result<Self, ApertureError> {
        if !(vs > 0.0 && vp > vs && period > 0.0) {
            return Err(ApertureError::InvalidVelocities { vs, vp, period });
        }
        let lambda = vs * period;
        let slowness_gap = 1.0 / vs - 1.0 / vp;
        let mut t = Vec::with_capacity(ntau);
        let mut aperture = Vec::with_capacity(ntau);
        let mut cutoff = Vec::with_capacity(ntau);
        for i in 0..ntau {
            let tau = dtau * i as f64;
            let z = tau / slowness_gap;
            let radius = (lambda * z + lambda * lambda / 4.0).sqrt();
            t.push(tau);
            aperture.push(radius);
            cutoff.push(radius * cutoff_multiplier);
        }
        Self::from_tables(t, aperture, cutoff)
    }

    fn interpolate(&self, values: &[f64], t: f64) -> f64 {
        let n = self.t.len();
        // NaN lands here too
        if !(t > self.t[0]) {
            return values[0];
        }
        if t >= self.t[n - 1] {
            return values[n - 1];
        }
        // first table time strictly greater than t; 1..n-1 here
        let hi = self.t.partition_point(|&ti| ti <= t);
        let lo = hi - 1;
        let frac = (t - self.t[lo]) / (self.t[hi] - self.t[lo]);
        values[lo] + frac * (values[hi] - values[lo])
    }

    pub fn get_aperture(&self, t: f64) -> f64 {
        self.interpolate(&self.aperture, t)
    }

    pub fn get_cutoff(&self, t: f64) -> f64 {
        self.interpolate(&self.cutoff, t)
    }
}

/// Gaussian pseudostation weights, zero beyond `cutoff`.
///
/// Writes one weight per station into `weights` and returns how many stations
/// fell inside the cutoff.
pub fn compute_pseudostation_weights(
    dnorth: &[f64],
    deast: &[f64],
    aperture: f64,
    cutoff: f64,
    weights: &mut [f64],
) -> usize {
    let denom = 2.0 * aperture * aperture;
    let mut nused = 0;
    for ((w, &dn), &de) in weights.iter_mut().zip(dnorth).zip(deast) {
        let d = dn.hypot(de);
        if d > cutoff || denom <= 0.0 {
            *w = 0.0;
        } else {
            *w = (-d * d / denom).exp();
            nused += 1;
        }
    }
    nused
}
