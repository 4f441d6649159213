/// Plane-wave moveout of each station for relative slowness `(dux, duy)`.
///
/// `moveout[i] = dux*deast[i] + duy*dnorth[i]`, written into `moveout`.
pub fn compute_pwmoveout(deast: &[f64], dnorth: &[f64], dux: f64, duy: f64, moveout: &mut [f64]) {
    for ((m, &de), &dn) in moveout.iter_mut().zip(deast).zip(dnorth) {
        *m = dux * de + duy * dn;
    }
}
