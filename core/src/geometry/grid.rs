use serde::{Deserialize, Serialize};

/// Regular grid of relative horizontal slowness vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangularSlownessGrid {
    pub name: String,
    pub uxlow: f64,
    pub uylow: f64,
    pub dux: f64,
    pub duy: f64,
    pub nux: usize,
    pub nuy: usize,
}

/// One node of a [`RectangularSlownessGrid`] in traversal order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridNode {
    pub iu: usize,
    pub ju: usize,
    /// 1-based sequence number in row-major (`iu` outer) order.
    pub gridid: usize,
    pub dux: f64,
    pub duy: f64,
}

impl RectangularSlownessGrid {
    pub fn new(
        name: impl Into<String>,
        uxlow: f64,
        uylow: f64,
        dux: f64,
        duy: f64,
        nux: usize,
        nuy: usize,
    ) -> Option<Self> {
        if nux == 0 || nuy == 0 {
            return None;
        }
        Some(Self {
            name: name.into(),
            uxlow,
            uylow,
            dux,
            duy,
            nux,
            nuy,
        })
    }

    /// Square grid of `n × n` nodes spanning `[-umax, umax]` on both axes.
    pub fn centered(name: impl Into<String>, umax: f64, n: usize) -> Option<Self> {
        let step = if n > 1 {
            2.0 * umax / (n - 1) as f64
        } else {
            0.0
        };
        let low = if n > 1 { -umax } else { 0.0 };
        Self::new(name, low, low, step, step, n, n)
    }

    pub fn ux(&self, iu: usize) -> f64 {
        self.uxlow + self.dux * iu as f64
    }

    pub fn uy(&self, ju: usize) -> f64 {
        self.uylow + self.duy * ju as f64
    }

    pub fn len(&self) -> usize {
        self.nux * self.nuy
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn nodes(&self) -> impl Iterator<Item = GridNode> + '_ {
        (0..self.nux).flat_map(move |iu| {
            (0..self.nuy).map(move |ju| GridNode {
                iu,
                ju,
                gridid: iu * self.nuy + ju + 1,
                dux: self.ux(iu),
                duy: self.uy(ju),
            })
        })
    }
}
