use ndarray::{s, Array1, Array2};

use crate::math::{dcopy, dzero, vadd, vscal};
use crate::prelude::{NodeOutcome, WEIGHT_MINIMUM};
use crate::processing::weights::EnsembleWeights;
use crate::seismic::ThreeComponentSeismogram;

/// Normalized stack and coherence gather for one slowness node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeStack {
    /// `3 × nsout` weighted-mean stack.
    pub stack: Array2<f64>,
    /// Weight sum per output sample.
    pub stack_weight: Array1<f64>,
    /// Weighted, aligned member samples, `nsout × stack_count` per component.
    pub gather: [Array2<f64>; 3],
    /// Weights matching `gather`; zero where a member has no data.
    pub gathwgt: Array2<f64>,
    /// First output sample whose weight sum exceeds the floor.
    pub stack_start: usize,
}

/// Source/destination ranges for copying one member into the stack window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlap {
    /// First input sample.
    pub is: usize,
    /// First output sample.
    pub j0: usize,
    /// Samples to copy; zero when the windows do not meet.
    pub len: usize,
}

impl Overlap {
    /// `is0` is the signed input sample that lands on output sample 0.
    pub fn new(is0: i64, nsin: usize, nsout: usize) -> Self {
        if is0 >= 0 {
            let is = is0 as usize;
            Self {
                is,
                j0: 0,
                len: nsin.saturating_sub(is).min(nsout),
            }
        } else {
            let j0 = is0.unsigned_abs() as usize;
            Self {
                is: 0,
                j0,
                len: nsout.saturating_sub(j0).min(nsin),
            }
        }
    }
}

/// Time-align, weight and sum `members` for one node.
///
/// `members[j]` pairs with row `j` of `weights` and with `moveout[j]`. Members
/// flagged unused are skipped entirely and get no gather column.
pub fn accumulate_node(
    members: &[ThreeComponentSeismogram],
    weights: &EnsembleWeights,
    moveout: &[f64],
    tstart: f64,
    dt: f64,
) -> NodeOutcome<NodeStack> {
    let nsout = weights.nsout();
    let stack_count = weights.fold();
    let mut stack = Array2::<f64>::zeros((3, nsout));
    let mut stack_weight = Array1::<f64>::zeros(nsout);
    let mut gather = [
        Array2::<f64>::zeros((nsout, stack_count)),
        Array2::<f64>::zeros((nsout, stack_count)),
        Array2::<f64>::zeros((nsout, stack_count)),
    ];
    let mut gathwgt = Array2::<f64>::zeros((nsout, stack_count));

    let used = members
        .iter()
        .zip(moveout)
        .enumerate()
        .filter(|(j, _)| weights.used[*j]);

    for (col, (j, (member, &mout))) in used.enumerate() {
        let lag = tstart - member.t0 + mout;
        let is0 = (lag / dt).round() as i64;
        let Overlap { is, j0, len } = Overlap::new(is0, member.u.ncols(), nsout);
        if len == 0 {
            continue;
        }
        let out = j0..j0 + len;
        let wrow = weights.weights.slice(s![j, out.clone()]);

        for (c, gather_c) in gather.iter_mut().enumerate() {
            let mut twork = member.u.slice(s![c, is..is + len]).to_owned();
            vscal(&wrow, &mut twork.view_mut());
            vadd(&twork.view(), &mut stack.slice_mut(s![c, out.clone()]));
            dcopy(&twork.view(), &mut gather_c.slice_mut(s![out.clone(), col]));
            // all three components share one weight
            if c == 0 {
                vadd(&wrow, &mut stack_weight.slice_mut(s![out.clone()]));
                dcopy(&wrow, &mut gathwgt.slice_mut(s![out.clone(), col]));
            }
        }
    }

    for (i, &sw) in stack_weight.iter().enumerate() {
        let mut column = stack.column_mut(i);
        if sw > WEIGHT_MINIMUM {
            column /= sw;
        } else {
            dzero(&mut column);
        }
    }

    match stack_weight.iter().position(|&sw| sw > WEIGHT_MINIMUM) {
        Some(stack_start) => NodeOutcome::Stacked(NodeStack {
            stack,
            stack_weight,
            gather,
            gathwgt,
            stack_start,
        }),
        None => NodeOutcome::NoCoverage,
    }
}
