//! Scalar-to-color mapping bound to a range.

use atomj_core::Rgba;

use crate::gradient::ColorGradient;

/// A gradient bound to `[lower, upper]` with out-of-range colors.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintScale {
    lower: f64,
    upper: f64,
    gradient: ColorGradient,
    underflow: Rgba,
    overflow: Rgba,
}

impl PaintScale {
    #[must_use]
    pub fn new(
        lower: f64,
        upper: f64,
        gradient: ColorGradient,
        underflow: Rgba,
        overflow: Rgba,
    ) -> Self {
        Self {
            lower,
            upper,
            gradient,
            underflow,
            overflow,
        }
    }

    #[must_use]
    pub fn lower_bound(&self) -> f64 {
        self.lower
    }

    #[must_use]
    pub fn upper_bound(&self) -> f64 {
        self.upper
    }

    #[must_use]
    pub fn gradient(&self) -> &ColorGradient {
        &self.gradient
    }

    #[must_use]
    pub fn underflow_color(&self) -> Rgba {
        self.underflow
    }

    #[must_use]
    pub fn overflow_color(&self) -> Rgba {
        self.overflow
    }

    /// Color for `z`. NaN is transparent; a degenerate range maps in-range
    /// values to the start of the gradient.
    #[must_use]
    pub fn paint(&self, z: f64) -> Rgba {
        if z.is_nan() {
            return Rgba::TRANSPARENT;
        }
        if z < self.lower {
            return self.underflow;
        }
        if z > self.upper {
            return self.overflow;
        }
        let span = self.upper - self.lower;
        let t = if span > 0.0 {
            (z - self.lower) / span
        } else {
            0.0
        };
        self.gradient.color_at(t)
    }

    /// Packed `0xAARRGGBB` color for `z`.
    #[must_use]
    pub fn paint_argb(&self, z: f64) -> u32 {
        self.paint(z).to_argb()
    }
}
