//! Planar geometry in data coordinates.

use std::ops::{Add, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True if either coordinate is NaN.
    #[must_use]
    pub fn is_nan(self) -> bool {
        self.x.is_nan() || self.y.is_nan()
    }

    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Rotates the point by `angle` radians (counter-clockwise) about `pivot`.
    #[must_use]
    pub fn rotated_about(self, pivot: Point, angle: f64) -> Point {
        let (sin, cos) = angle.sin_cos();
        let dx = self.x - pivot.x;
        let dy = self.y - pivot.y;
        Point::new(pivot.x + dx * cos - dy * sin, pivot.y + dx * sin + dy * cos)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned rectangle in data coordinates. Always normalized.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    /// Creates a rectangle from two opposite corners in any order.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    /// Square of half side `half` centered on `center`; used as the hit tolerance window.
    #[must_use]
    pub fn centered_square(center: Point, half: f64) -> Self {
        Self::centered(center, half, half)
    }

    #[must_use]
    pub fn centered(center: Point, half_width: f64, half_height: f64) -> Self {
        Self {
            min_x: center.x - half_width,
            min_y: center.y - half_height,
            max_x: center.x + half_width,
            max_y: center.y + half_height,
        }
    }

    /// Bounding box of a point set; `None` when empty.
    pub fn bounding<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Rect::from_corners(*first, *first);
        for p in iter {
            rect.min_x = rect.min_x.min(p.x);
            rect.min_y = rect.min_y.min(p.y);
            rect.max_x = rect.max_x.max(p.x);
            rect.max_y = rect.max_y.max(p.y);
        }
        Some(rect)
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Corners in counter-clockwise order starting at the minimum corner.
    #[must_use]
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.min_x, self.max_y),
        ]
    }

    /// True if the segment `a`-`b` touches the rectangle.
    #[must_use]
    pub fn intersects_segment(&self, a: Point, b: Point) -> bool {
        if self.contains(a) || self.contains(b) {
            return true;
        }
        let corners = self.corners();
        (0..4).any(|i| segments_intersect(a, b, corners[i], corners[(i + 1) % 4]))
    }
}

/// Distance from `point` to the segment `a`-`b`.
#[must_use]
pub fn distance_point_to_segment(point: Point, a: Point, b: Point) -> f64 {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let apx = point.x - a.x;
    let apy = point.y - a.y;
    let ab_len_sq = abx * abx + aby * aby;
    if ab_len_sq <= f64::EPSILON {
        return point.distance(a);
    }
    let t = ((apx * abx + apy * aby) / ab_len_sq).clamp(0.0, 1.0);
    point.distance(Point::new(a.x + abx * t, a.y + aby * t))
}

/// Even-odd containment test.
#[must_use]
pub fn point_in_polygon(point: Point, vertices: &[Point]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (vertices[i], vertices[j]);
        if (pi.y > point.y) != (pj.y > point.y)
            && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Twice the signed area (positive for counter-clockwise).
#[must_use]
pub fn polygon_area2(vertices: &[Point]) -> f64 {
    let n = vertices.len();
    (0..n)
        .map(|i| {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum()
}

/// Area centroid; falls back to the vertex mean for degenerate polygons.
#[must_use]
pub fn polygon_centroid(vertices: &[Point]) -> Point {
    let n = vertices.len();
    if n == 0 {
        return Point::default();
    }
    let area2 = polygon_area2(vertices);
    if area2.abs() <= f64::EPSILON {
        let inv = 1.0 / crate::util::usize_to_f64(n);
        let sum = vertices.iter().fold(Point::default(), |acc, p| acc + *p);
        return Point::new(sum.x * inv, sum.y * inv);
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let cross = a.x * b.y - b.x * a.y;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    let factor = 1.0 / (3.0 * area2);
    Point::new(cx * factor, cy * factor)
}

/// True when two polygon edges cross.
#[must_use]
pub fn polygon_self_intersects(vertices: &[Point]) -> bool {
    let n = vertices.len();
    if n < 4 {
        return false;
    }
    for i in 0..n {
        let a1 = vertices[i];
        let a2 = vertices[(i + 1) % n];
        for j in (i + 1)..n {
            if shares_endpoint(i, j, n) {
                continue;
            }
            if segments_intersect(a1, a2, vertices[j], vertices[(j + 1) % n]) {
                return true;
            }
        }
    }
    false
}

fn shares_endpoint(i: usize, j: usize, n: usize) -> bool {
    i == j || i == (j + 1) % n || j == (i + 1) % n
}

/// True when segments `a1`-`a2` and `b1`-`b2` intersect (touching counts).
#[must_use]
pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = direction(a1, a2, b1);
    let d2 = direction(a1, a2, b2);
    let d3 = direction(b1, b2, a1);
    let d4 = direction(b1, b2, a2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1.abs() <= f64::EPSILON && on_segment(a1, a2, b1))
        || (d2.abs() <= f64::EPSILON && on_segment(a1, a2, b2))
        || (d3.abs() <= f64::EPSILON && on_segment(b1, b2, a1))
        || (d4.abs() <= f64::EPSILON && on_segment(b1, b2, a2))
}

fn direction(a: Point, b: Point, c: Point) -> f64 {
    (c.x - a.x) * (b.y - a.y) - (c.y - a.y) * (b.x - a.x)
}

fn on_segment(a: Point, b: Point, c: Point) -> bool {
    c.x >= a.x.min(b.x) - f64::EPSILON
        && c.x <= a.x.max(b.x) + f64::EPSILON
        && c.y >= a.y.min(b.y) - f64::EPSILON
        && c.y <= a.y.max(b.y) + f64::EPSILON
}

/// Convex hull (Andrew's monotone chain), counter-clockwise, no repeated end point.
#[must_use]
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut sorted: Vec<Point> = points.iter().copied().filter(|p| !p.is_nan()).collect();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let cross = |o: Point, a: Point, b: Point| {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };
    let mut hull: Vec<Point> = Vec::with_capacity(sorted.len() * 2);
    for &p in &sorted {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in sorted.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Drops vertices lying on the straight line between their neighbours.
#[must_use]
pub fn remove_collinear(vertices: &[Point]) -> Vec<Point> {
    let n = vertices.len();
    if n < 3 {
        return vertices.to_vec();
    }
    (0..n)
        .filter(|&i| {
            let prev = vertices[(i + n - 1) % n];
            let next = vertices[(i + 1) % n];
            direction(prev, next, vertices[i]).abs() > f64::EPSILON
        })
        .map(|i| vertices[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ]
    }

    #[test]
    fn test_point_in_polygon() {
        assert!(point_in_polygon(Point::new(1.0, 1.0), &square()));
        assert!(!point_in_polygon(Point::new(3.0, 1.0), &square()));
    }

    #[test]
    fn test_centroid_and_area() {
        assert_relative_eq!(polygon_area2(&square()), 8.0);
        let c = polygon_centroid(&square());
        assert_relative_eq!(c.x, 1.0);
        assert_relative_eq!(c.y, 1.0);
    }

    #[test]
    fn test_convex_hull_drops_interior() {
        let mut pts = square();
        pts.push(Point::new(1.0, 1.0));
        pts.push(Point::new(0.5, 1.5));
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Point::new(1.0, 1.0)));
    }

    #[test]
    fn test_rect_segment_intersection() {
        let r = Rect::centered_square(Point::new(1.0, 0.0), 0.1);
        assert!(r.intersects_segment(Point::new(0.0, 0.0), Point::new(2.0, 0.0)));
        assert!(!r.intersects_segment(Point::new(0.0, 1.0), Point::new(2.0, 1.0)));
        // crossing without either endpoint inside
        assert!(r.intersects_segment(Point::new(1.0, -5.0), Point::new(1.0, 5.0)));
    }

    #[test]
    fn test_self_intersection() {
        let bowtie = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, 0.0),
            Point::new(0.0, 2.0),
        ];
        assert!(polygon_self_intersects(&bowtie));
        assert!(!polygon_self_intersects(&square()));
    }

    #[test]
    fn test_remove_collinear() {
        let mut pts = square();
        pts.insert(1, Point::new(1.0, 0.0));
        assert_eq!(remove_collinear(&pts).len(), 4);
    }

    #[test]
    fn test_rotation() {
        let p = Point::new(1.0, 0.0).rotated_about(Point::default(), std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }
}
