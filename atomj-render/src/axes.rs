//! Data-to-pixel mapping for the plot's data area.

use atomj_core::{Point, Rect};

/// Which data axis runs horizontally on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlotOrientation {
    /// x horizontal, y vertical (up).
    #[default]
    Vertical,
    /// x vertical (up), y horizontal.
    Horizontal,
}

/// Axis-aligned rectangle in pixel space (y down).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized rectangle spanning two pixel corners.
    #[must_use]
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        let x = a.0.min(b.0);
        let y = a.1.min(b.1);
        Self::new(x, y, (a.0 - b.0).abs(), (a.1 - b.1).abs())
    }

    #[must_use]
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Same center, each side pulled in by `fraction` of the size.
    #[must_use]
    pub fn inset(&self, fraction: f64) -> Self {
        let dx = self.width * fraction;
        let dy = self.height * fraction;
        Self::new(
            self.x + dx,
            self.y + dy,
            (self.width - 2.0 * dx).max(0.0),
            (self.height - 2.0 * dy).max(0.0),
        )
    }

    /// Overlap with the `width` x `height` canvas.
    #[must_use]
    pub fn intersects_canvas(&self, width: usize, height: usize) -> bool {
        let w = atomj_core::util::usize_to_f64(width);
        let h = atomj_core::util::usize_to_f64(height);
        self.x < w && self.y < h && self.x + self.width > 0.0 && self.y + self.height > 0.0
    }
}

/// Visible data ranges and orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axes {
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub orientation: PlotOrientation,
}

impl Default for Axes {
    fn default() -> Self {
        Self {
            x_range: (0.0, 1.0),
            y_range: (0.0, 1.0),
            orientation: PlotOrientation::Vertical,
        }
    }
}

impl Axes {
    #[must_use]
    pub fn new(x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        Self {
            x_range,
            y_range,
            orientation: PlotOrientation::Vertical,
        }
    }

    /// Axes showing exactly `area`.
    #[must_use]
    pub fn fitting(area: &Rect) -> Self {
        Self::new((area.min_x, area.max_x), (area.min_y, area.max_y))
    }

    #[must_use]
    pub fn with_orientation(mut self, orientation: PlotOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Visible data area.
    #[must_use]
    pub fn visible_area(&self) -> Rect {
        Rect::from_corners(
            Point::new(self.x_range.0, self.y_range.0),
            Point::new(self.x_range.1, self.y_range.1),
        )
    }

    /// Pixel position of a data point on a `width` x `height` data area.
    #[must_use]
    pub fn data_to_pixel(&self, p: Point, width: usize, height: usize) -> (f64, f64) {
        let w = atomj_core::util::usize_to_f64(width);
        let h = atomj_core::util::usize_to_f64(height);
        let fx = fraction(p.x, self.x_range);
        let fy = fraction(p.y, self.y_range);
        match self.orientation {
            PlotOrientation::Vertical => (fx * w, (1.0 - fy) * h),
            PlotOrientation::Horizontal => (fy * w, (1.0 - fx) * h),
        }
    }

    /// Inverse of [`Axes::data_to_pixel`].
    #[must_use]
    pub fn pixel_to_data(&self, px: f64, py: f64, width: usize, height: usize) -> Point {
        let w = atomj_core::util::usize_to_f64(width.max(1));
        let h = atomj_core::util::usize_to_f64(height.max(1));
        let (fh, fv) = (px / w, 1.0 - py / h);
        let (fx, fy) = match self.orientation {
            PlotOrientation::Vertical => (fh, fv),
            PlotOrientation::Horizontal => (fv, fh),
        };
        Point::new(
            self.x_range.0 + fx * (self.x_range.1 - self.x_range.0),
            self.y_range.0 + fy * (self.y_range.1 - self.y_range.0),
        )
    }

    /// Pixel rectangle covered by a data rectangle.
    #[must_use]
    pub fn rect_to_pixels(&self, rect: &Rect, width: usize, height: usize) -> PixelRect {
        let a = self.data_to_pixel(Point::new(rect.min_x, rect.min_y), width, height);
        let b = self.data_to_pixel(Point::new(rect.max_x, rect.max_y), width, height);
        PixelRect::from_corners(a, b)
    }
}

fn fraction(value: f64, range: (f64, f64)) -> f64 {
    let span = range.1 - range.0;
    if span == 0.0 {
        0.0
    } else {
        (value - range.0) / span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vertical_mapping_has_y_up() {
        let axes = Axes::new((0.0, 10.0), (0.0, 5.0));
        let (px, py) = axes.data_to_pixel(Point::new(2.5, 5.0), 100, 50);
        assert_relative_eq!(px, 25.0);
        assert_relative_eq!(py, 0.0);
        let back = axes.pixel_to_data(px, py, 100, 50);
        assert_relative_eq!(back.x, 2.5);
        assert_relative_eq!(back.y, 5.0);
    }

    #[test]
    fn test_horizontal_mapping_transposes() {
        let axes = Axes::new((0.0, 10.0), (0.0, 5.0)).with_orientation(PlotOrientation::Horizontal);
        let (px, py) = axes.data_to_pixel(Point::new(10.0, 2.5), 100, 50);
        assert_relative_eq!(px, 50.0);
        assert_relative_eq!(py, 0.0);
        let back = axes.pixel_to_data(px, py, 100, 50);
        assert_relative_eq!(back.x, 10.0);
        assert_relative_eq!(back.y, 2.5);
    }

    #[test]
    fn test_rect_to_pixels_is_normalized() {
        let axes = Axes::new((0.0, 4.0), (0.0, 4.0));
        let data = Rect::from_corners(Point::new(1.0, 1.0), Point::new(2.0, 3.0));
        let r = axes.rect_to_pixels(&data, 40, 40);
        assert_relative_eq!(r.x, 10.0);
        assert_relative_eq!(r.y, 10.0);
        assert_relative_eq!(r.width, 10.0);
        assert_relative_eq!(r.height, 20.0);
    }

    #[test]
    fn test_inset() {
        let r = PixelRect::new(0.0, 0.0, 10.0, 20.0).inset(0.1);
        assert_relative_eq!(r.x, 1.0);
        assert_relative_eq!(r.height, 16.0);
        assert!(r.contains(5.0, 5.0));
        assert!(!r.contains(0.5, 5.0));
    }
}
