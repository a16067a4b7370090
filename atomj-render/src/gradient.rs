//! Piecewise linear color gradients.

use atomj_core::Rgba;
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};

/// Color ramp over the unit interval.
///
/// Stops are kept sorted by position; positions are clamped to [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorGradient {
    stops: Vec<(f64, Rgba)>,
}

impl Default for ColorGradient {
    fn default() -> Self {
        crate::Colormap::default().gradient()
    }
}

impl ColorGradient {
    /// Creates a gradient from arbitrary stops.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::EmptyGradient`] when no finite stop is given.
    pub fn new(stops: impl IntoIterator<Item = (f64, Rgba)>) -> Result<Self> {
        let mut stops: Vec<(f64, Rgba)> = stops
            .into_iter()
            .filter(|(t, _)| t.is_finite())
            .map(|(t, c)| (t.clamp(0.0, 1.0), c))
            .collect();
        if stops.is_empty() {
            return Err(RenderError::EmptyGradient);
        }
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self { stops })
    }

    /// Two-color ramp.
    #[must_use]
    pub fn linear(start: Rgba, end: Rgba) -> Self {
        Self {
            stops: vec![(0.0, start), (1.0, end)],
        }
    }

    pub(crate) fn from_sorted_stops(stops: Vec<(f64, Rgba)>) -> Self {
        Self { stops }
    }

    #[must_use]
    pub fn stops(&self) -> &[(f64, Rgba)] {
        &self.stops
    }

    /// Color at position 0 (or the first stop).
    #[must_use]
    pub fn start_color(&self) -> Rgba {
        self.color_at(0.0)
    }

    /// Color at position 1 (or the last stop).
    #[must_use]
    pub fn end_color(&self) -> Rgba {
        self.color_at(1.0)
    }

    /// Interpolated color at `t`, clamped to [0, 1]. NaN maps to the start.
    #[must_use]
    pub fn color_at(&self, t: f64) -> Rgba {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let Some(&(first_t, first_c)) = self.stops.first() else {
            return Rgba::TRANSPARENT;
        };
        if t <= first_t {
            return first_c;
        }
        for pair in self.stops.windows(2) {
            let (t0, c0) = pair[0];
            let (t1, c1) = pair[1];
            if t <= t1 {
                let span = t1 - t0;
                if span <= f64::EPSILON {
                    return c1;
                }
                return c0.lerp(c1, (t - t0) / span);
            }
        }
        self.stops[self.stops.len() - 1].1
    }

    /// Same stops mirrored around 0.5.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let mut stops: Vec<(f64, Rgba)> = self.stops.iter().map(|(t, c)| (1.0 - t, *c)).collect();
        stops.reverse();
        Self { stops }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation() {
        let g = ColorGradient::linear(Rgba::BLACK, Rgba::WHITE);
        assert_eq!(g.color_at(-1.0), Rgba::BLACK);
        assert_eq!(g.color_at(0.5), Rgba::rgb(128, 128, 128));
        assert_eq!(g.color_at(2.0), Rgba::WHITE);
    }

    #[test]
    fn test_unsorted_stops_and_empty() {
        let red = Rgba::rgb(255, 0, 0);
        let g = ColorGradient::new([(1.0, Rgba::WHITE), (0.0, red)]).unwrap();
        assert_eq!(g.start_color(), red);
        assert_eq!(g.end_color(), Rgba::WHITE);
        assert!(ColorGradient::new(Vec::new()).is_err());
        assert!(ColorGradient::new([(f64::NAN, red)]).is_err());
    }

    #[test]
    fn test_reversed() {
        let g = ColorGradient::linear(Rgba::BLACK, Rgba::WHITE).reversed();
        assert_eq!(g.start_color(), Rgba::WHITE);
        assert_eq!(g.end_color(), Rgba::BLACK);
    }
}
