//! Element-wise kernels over strided vectors.
//!
//! The kernels take ndarray views, which carry their own length and stride,
//! so a row or column of a dense matrix can be handed in without copying.
//! [`strided`] and [`strided_mut`] build such a view over a flat buffer from an
//! explicit `(n, inc)` pair.

use ndarray::{ArrayView1, ArrayViewMut1, ShapeBuilder, ShapeError, Zip};

/// View `n` elements of `data` spaced `inc` apart, starting at `data[0]`.
pub fn strided(data: &[f64], n: usize, inc: usize) -> Result<ArrayView1<'_, f64>, ShapeError> {
    ArrayView1::from_shape((n,).strides((inc,)), data)
}

/// Mutable counterpart of [`strided`].
pub fn strided_mut(
    data: &mut [f64],
    n: usize,
    inc: usize,
) -> Result<ArrayViewMut1<'_, f64>, ShapeError> {
    ArrayViewMut1::from_shape((n,).strides((inc,)), data)
}

/// `y[i] = 0`
pub fn dzero(y: &mut ArrayViewMut1<'_, f64>) {
    y.fill(0.0);
}

/// `y[i] *= w[i]`
pub fn vscal(w: &ArrayView1<'_, f64>, y: &mut ArrayViewMut1<'_, f64>) {
    debug_assert_eq!(w.len(), y.len());
    Zip::from(y).and(w).for_each(|y, &w| *y *= w);
}

/// `y[i] += x[i]`
pub fn vadd(x: &ArrayView1<'_, f64>, y: &mut ArrayViewMut1<'_, f64>) {
    debug_assert_eq!(x.len(), y.len());
    Zip::from(y).and(x).for_each(|y, &x| *y += x);
}

/// `y[i] = x[i]`
pub fn dcopy(x: &ArrayView1<'_, f64>, y: &mut ArrayViewMut1<'_, f64>) {
    debug_assert_eq!(x.len(), y.len());
    y.assign(x);
}
