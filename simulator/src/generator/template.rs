use std::f64::consts::PI;

/// Ricker wavelet with peak frequency `fpeak`, centered at `t = 0`.
pub fn ricker(t: f64, fpeak: f64) -> f64 {
    let arg = (PI * fpeak * t).powi(2);
    (1.0 - 2.0 * arg) * (-arg).exp()
}
