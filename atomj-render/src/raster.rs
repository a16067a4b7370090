//! Packed ARGB bitmaps and the primitive drawing operations used by the plot.
//!
//! Pixel coverage follows the center rule: a pixel is covered when its center
//! `(i + 0.5, j + 0.5)` lies inside the shape. Colors compose source-over.

use std::ops::Range;

use atomj_core::util::{f64_to_usize_saturating, usize_to_f64};
use atomj_core::{geometry, Point, Rgba};

use crate::axes::PixelRect;

/// Row-major ARGB image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl RasterImage {
    /// Transparent image.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, Rgba::TRANSPARENT)
    }

    #[must_use]
    pub fn filled(width: usize, height: usize, color: Rgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![color.to_argb(); width.saturating_mul(height)],
        }
    }

    /// Wraps a row-major ARGB buffer of `width * height` pixels.
    #[must_use]
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<u32>) -> Option<Self> {
        (pixels.len() == width.saturating_mul(height)).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(Rgba::from_argb(self.pixels[y * self.width + x]))
    }

    /// Overwrites one pixel (no blending).
    pub fn set(&mut self, x: usize, y: usize, color: Rgba) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color.to_argb();
        }
    }

    /// Row-major packed pixels, for writers that fill whole lines.
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Paints `color` over one pixel.
    pub fn blend(&mut self, x: usize, y: usize, color: Rgba) {
        if x >= self.width || y >= self.height || color.a == 0 {
            return;
        }
        let idx = y * self.width + x;
        self.pixels[idx] = color.over(Rgba::from_argb(self.pixels[idx])).to_argb();
    }

    /// Unpremultiplied RGBA bytes, row-major.
    #[must_use]
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|&argb| {
                let c = Rgba::from_argb(argb);
                [c.r, c.g, c.b, c.a]
            })
            .collect()
    }

    pub fn fill_rect(&mut self, rect: &PixelRect, color: Rgba) {
        let xs = span(rect.x, rect.x + rect.width, self.width);
        let ys = span(rect.y, rect.y + rect.height, self.height);
        for y in ys {
            for x in xs.clone() {
                self.blend(x, y, color);
            }
        }
    }

    /// Fills the ellipse inscribed in `rect`.
    pub fn fill_ellipse(&mut self, rect: &PixelRect, color: Rgba) {
        let (cx, cy) = rect.center();
        let (rx, ry) = (rect.width / 2.0, rect.height / 2.0);
        if rx <= 0.0 || ry <= 0.0 {
            return;
        }
        let xs = span(rect.x, rect.x + rect.width, self.width);
        let ys = span(rect.y, rect.y + rect.height, self.height);
        for y in ys {
            let dy = (usize_to_f64(y) + 0.5 - cy) / ry;
            for x in xs.clone() {
                let dx = (usize_to_f64(x) + 0.5 - cx) / rx;
                if dx * dx + dy * dy <= 1.0 {
                    self.blend(x, y, color);
                }
            }
        }
    }

    /// Line of the given stroke width between two pixel positions.
    pub fn draw_line(&mut self, p0: (f64, f64), p1: (f64, f64), color: Rgba, width: f64) {
        if [p0.0, p0.1, p1.0, p1.1].iter().any(|v| !v.is_finite()) {
            return;
        }
        let half = (width / 2.0).max(0.5);
        let xs = span(p0.0.min(p1.0) - half, p0.0.max(p1.0) + half, self.width);
        let ys = span(p0.1.min(p1.1) - half, p0.1.max(p1.1) + half, self.height);
        let (a, b) = (Point::new(p0.0, p0.1), Point::new(p1.0, p1.1));
        for y in ys {
            for x in xs.clone() {
                let c = Point::new(usize_to_f64(x) + 0.5, usize_to_f64(y) + 0.5);
                if geometry::distance_point_to_segment(c, a, b) <= half {
                    self.blend(x, y, color);
                }
            }
        }
    }

    pub fn stroke_polyline(
        &mut self,
        points: &[(f64, f64)],
        closed: bool,
        color: Rgba,
        width: f64,
    ) {
        for pair in points.windows(2) {
            self.draw_line(pair[0], pair[1], color, width);
        }
        if closed && points.len() > 2 {
            if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
                self.draw_line(last, first, color, width);
            }
        }
    }
}

/// Pixel indices whose centers fall in `[start, end)`, clipped to `[0, count)`.
pub(crate) fn span(start: f64, end: f64, count: usize) -> Range<usize> {
    let lo = f64_to_usize_saturating((start - 0.5).ceil()).min(count);
    let hi = f64_to_usize_saturating((end - 0.5).ceil()).min(count);
    lo..hi.max(lo)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba = Rgba::rgb(255, 0, 0);

    #[test]
    fn test_fill_rect_center_rule() {
        let mut img = RasterImage::new(4, 4);
        img.fill_rect(&PixelRect::new(0.6, 0.0, 2.0, 1.0), RED);
        assert_eq!(img.get(0, 0), Some(Rgba::TRANSPARENT));
        assert_eq!(img.get(1, 0), Some(RED));
        assert_eq!(img.get(2, 0), Some(RED));
        assert_eq!(img.get(3, 0), Some(Rgba::TRANSPARENT));
        assert_eq!(img.get(1, 1), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn test_fill_rect_clips_to_canvas() {
        let mut img = RasterImage::new(3, 3);
        img.fill_rect(&PixelRect::new(-10.0, -10.0, 100.0, 100.0), RED);
        assert!(img.pixels().iter().all(|&p| p == RED.to_argb()));
    }

    #[test]
    fn test_fill_ellipse_leaves_corners() {
        let mut img = RasterImage::new(10, 10);
        img.fill_ellipse(&PixelRect::new(0.0, 0.0, 10.0, 10.0), RED);
        assert_eq!(img.get(5, 5), Some(RED));
        assert_eq!(img.get(0, 0), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn test_draw_line_and_blend() {
        let mut img = RasterImage::filled(5, 5, Rgba::WHITE);
        img.draw_line((0.0, 2.5), (5.0, 2.5), Rgba::BLACK, 1.0);
        assert_eq!(img.get(3, 2), Some(Rgba::BLACK));
        assert_eq!(img.get(3, 0), Some(Rgba::WHITE));
        img.blend(0, 0, Rgba::TRANSPARENT);
        assert_eq!(img.get(0, 0), Some(Rgba::WHITE));
    }

    #[test]
    fn test_rgba_bytes() {
        let img = RasterImage::filled(1, 1, Rgba::new(1, 2, 3, 4));
        assert_eq!(img.to_rgba_bytes(), vec![1, 2, 3, 4]);
        assert!(RasterImage::from_pixels(2, 2, vec![0; 3]).is_none());
    }
}
