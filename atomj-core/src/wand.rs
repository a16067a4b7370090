//! Wand contour tracing over a scalar grid.
//!
//! The tracer flood-fills the cells whose value lies within a tolerance of
//! the seed value and returns the outer boundary of the filled region,
//! following cell edges, as a polygon in data coordinates.

use std::collections::{HashMap, VecDeque};

use log::trace;

use crate::geometry::{polygon_area2, remove_collinear, Point};
use crate::grid::Grid2D;
use crate::roi::{PathKind, Roi, RoiKey};
use crate::util::usize_to_f64;

/// Neighborhood used by the flood fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Edge neighbors only.
    #[default]
    Four,
    /// Edge and corner neighbors.
    Eight,
}

/// Traces the contour of a region of similar values around a seed point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WandContourTracer {
    tolerance: f64,
    connectivity: Connectivity,
}

impl Default for WandContourTracer {
    fn default() -> Self {
        Self::new(0.0, Connectivity::Four)
    }
}

impl WandContourTracer {
    /// `tolerance` is the maximum absolute difference from the seed value.
    #[must_use]
    pub fn new(tolerance: f64, connectivity: Connectivity) -> Self {
        Self {
            tolerance: tolerance.abs(),
            connectivity,
        }
    }

    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance.abs();
    }

    #[must_use]
    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Row-major cell mask of the region grown from `seed`.
    ///
    /// `None` when the seed lies outside the grid or on a NaN sample.
    #[must_use]
    pub fn region(&self, grid: &Grid2D, seed: Point) -> Option<Vec<bool>> {
        if seed.is_nan() || !grid.domain().contains(seed) {
            return None;
        }
        let rows = grid.row_count();
        let cols = grid.column_count();
        let (seed_row, seed_col) = (grid.row(seed.y), grid.column(seed.x));
        let seed_z = grid.z(seed_row, seed_col);
        if seed_z.is_nan() {
            return None;
        }

        let accepts = |z: f64| !z.is_nan() && (z - seed_z).abs() <= self.tolerance;
        let mut mask = vec![false; rows * cols];
        let mut queue = VecDeque::new();
        mask[seed_row * cols + seed_col] = true;
        queue.push_back((seed_row, seed_col));

        let offsets: &[(isize, isize)] = match self.connectivity {
            Connectivity::Four => &[(-1, 0), (1, 0), (0, -1), (0, 1)],
            Connectivity::Eight => &[
                (-1, -1),
                (-1, 0),
                (-1, 1),
                (0, -1),
                (0, 1),
                (1, -1),
                (1, 0),
                (1, 1),
            ],
        };

        while let Some((r, c)) = queue.pop_front() {
            for (dr, dc) in offsets {
                let Some(nr) = r.checked_add_signed(*dr) else {
                    continue;
                };
                let Some(nc) = c.checked_add_signed(*dc) else {
                    continue;
                };
                if nr >= rows || nc >= cols || mask[nr * cols + nc] {
                    continue;
                }
                if accepts(grid.z(nr, nc)) {
                    mask[nr * cols + nc] = true;
                    queue.push_back((nr, nc));
                }
            }
        }
        Some(mask)
    }

    /// Outer contour of the region around `seed`; `None` if nothing was traced.
    #[must_use]
    pub fn trace(&self, grid: &Grid2D, seed: Point) -> Option<Vec<Point>> {
        let mask = self.region(grid, seed)?;
        let rings = boundary_rings(&mask, grid.row_count(), grid.column_count(), self.connectivity);
        let outer = rings
            .into_iter()
            .max_by(|a, b| ring_area2(a).total_cmp(&ring_area2(b)))?;

        let x0 = grid.x_origin() - 0.5 * grid.x_increment();
        let y0 = grid.y_origin() - 0.5 * grid.y_increment();
        let polygon: Vec<Point> = outer
            .iter()
            .map(|(cx, cy)| {
                Point::new(
                    x0 + usize_to_f64(*cx) * grid.x_increment(),
                    y0 + usize_to_f64(*cy) * grid.y_increment(),
                )
            })
            .collect();
        let polygon = remove_collinear(&polygon);
        trace!(
            "wand traced {} vertices from seed ({}, {})",
            polygon.len(),
            seed.x,
            seed.y
        );
        (polygon.len() >= 3).then_some(polygon)
    }

    /// Traced contour wrapped as a finished wand ROI.
    #[must_use]
    pub fn trace_roi(&self, key: RoiKey, grid: &Grid2D, seed: Point) -> Option<Roi> {
        let vertices = self.trace(grid, seed)?;
        Roi::path(key, PathKind::Wand, vertices).ok()
    }
}

fn signed(v: usize) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

type Corner = (usize, usize);

fn ring_area2(ring: &[Corner]) -> f64 {
    let points: Vec<Point> = ring
        .iter()
        .map(|(x, y)| Point::new(usize_to_f64(*x), usize_to_f64(*y)))
        .collect();
    polygon_area2(&points)
}

/// Chains the directed cell-boundary edges of `mask` into closed rings.
///
/// Edges run counter-clockwise around each cell (y up), so outer rings
/// have positive area and holes negative. At a pinch corner the walk turns
/// right for 8-connectivity, merging diagonal neighbors, and left otherwise.
fn boundary_rings(
    mask: &[bool],
    rows: usize,
    cols: usize,
    connectivity: Connectivity,
) -> Vec<Vec<Corner>> {
    let inside = |r: usize, c: usize| r < rows && c < cols && mask[r * cols + c];
    let mut edges: Vec<(Corner, Corner)> = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            if !inside(r, c) {
                continue;
            }
            if r == 0 || !inside(r - 1, c) {
                edges.push(((c, r), (c + 1, r)));
            }
            if !inside(r, c + 1) {
                edges.push(((c + 1, r), (c + 1, r + 1)));
            }
            if !inside(r + 1, c) {
                edges.push(((c + 1, r + 1), (c, r + 1)));
            }
            if c == 0 || !inside(r, c - 1) {
                edges.push(((c, r + 1), (c, r)));
            }
        }
    }

    let mut outgoing: HashMap<Corner, Vec<usize>> = HashMap::new();
    for (i, (from, _)) in edges.iter().enumerate() {
        outgoing.entry(*from).or_default().push(i);
    }

    let direction = |(from, to): (Corner, Corner)| {
        (
            signed(to.0) - signed(from.0),
            signed(to.1) - signed(from.1),
        )
    };

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();
    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        let origin = edges[start].0;
        let mut ring = Vec::new();
        let mut current = start;
        loop {
            used[current] = true;
            let (from, to) = edges[current];
            ring.push(from);
            if to == origin {
                break;
            }
            let (dx, dy) = direction(edges[current]);
            let next = outgoing.get(&to).and_then(|candidates| {
                let free = candidates.iter().copied().filter(|&e| !used[e]);
                // cross product sign: positive for a left turn
                let turn = |e: &usize| {
                    let (ex, ey) = direction(edges[*e]);
                    dx * ey - dy * ex
                };
                match connectivity {
                    Connectivity::Four => free.max_by_key(turn),
                    Connectivity::Eight => free.min_by_key(turn),
                }
            });
            match next {
                Some(e) => current = e,
                None => break,
            }
        }
        rings.push(ring);
    }
    rings
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn plateau() -> Grid2D {
        // 6x6 grid, a 2x3 plateau of 5.0 at rows 1..3, columns 2..5.
        Grid2D::from_fn(6, 6, Point::default(), 1.0, 1.0, |x, y| {
            if (1.0..=2.0).contains(&y) && (2.0..=4.0).contains(&x) {
                5.0
            } else {
                0.0
            }
        })
        .unwrap()
    }

    #[test]
    fn test_plateau_contour() {
        let tracer = WandContourTracer::new(0.5, Connectivity::Four);
        let contour = tracer.trace(&plateau(), Point::new(3.0, 1.0)).unwrap();
        assert_eq!(contour.len(), 4);
        let area = polygon_area2(&contour) * 0.5;
        assert_relative_eq!(area, 6.0);
        let roi = tracer.trace_roi(1, &plateau(), Point::new(3.0, 1.0)).unwrap();
        assert!(roi.contains(Point::new(3.0, 1.5)));
        assert!(!roi.contains(Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_seed_outside_or_nan() {
        let tracer = WandContourTracer::default();
        assert!(tracer.trace(&plateau(), Point::new(-10.0, 0.0)).is_none());
        let grid = Grid2D::from_row_major(1, 2, vec![f64::NAN, 1.0], Point::default(), 1.0, 1.0)
            .unwrap();
        assert!(tracer.trace(&grid, Point::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_diagonal_connectivity() {
        // checkerboard diagonal: (0,0) and (1,1) set
        let grid = Grid2D::from_row_major(
            2,
            2,
            vec![1.0, 0.0, 0.0, 1.0],
            Point::default(),
            1.0,
            1.0,
        )
        .unwrap();
        let four = WandContourTracer::new(0.1, Connectivity::Four)
            .region(&grid, Point::new(0.0, 0.0))
            .unwrap();
        assert_eq!(four, vec![true, false, false, false]);
        let eight = WandContourTracer::new(0.1, Connectivity::Eight);
        assert_eq!(
            eight.region(&grid, Point::new(0.0, 0.0)).unwrap(),
            vec![true, false, false, true]
        );
        let contour = eight.trace(&grid, Point::new(0.0, 0.0)).unwrap();
        let area = polygon_area2(&contour) * 0.5;
        assert_relative_eq!(area, 2.0);
    }
}
