//! Regular 2D sample grid mapping measurements to world coordinates.
//!
//! Samples are stored row-major in an `ndarray::Array2` indexed by
//! `[row, column]`. Row `r` sits at `y = y_origin + r * y_increment` and
//! column `c` at `x = x_origin + c * x_increment`; each sample is the center
//! of a cell one increment wide.

use ndarray::Array2;

use crate::error::{Error, Result};
use crate::geometry::{Point, Rect};
use crate::util::{f64_to_index_clamped, usize_to_f64};

/// A regular grid of scalar samples (height, stiffness, adhesion, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2D {
    values: Array2<f64>,
    x_origin: f64,
    y_origin: f64,
    x_increment: f64,
    y_increment: f64,
}

impl Grid2D {
    /// Creates a grid from a `[rows, columns]` array.
    ///
    /// # Errors
    ///
    /// Returns an error if the array is empty or an increment is not positive and finite.
    pub fn new(
        values: Array2<f64>,
        x_origin: f64,
        y_origin: f64,
        x_increment: f64,
        y_increment: f64,
    ) -> Result<Self> {
        if values.nrows() == 0 || values.ncols() == 0 {
            return Err(Error::EmptyGrid);
        }
        for increment in [x_increment, y_increment] {
            if !increment.is_finite() || increment <= 0.0 {
                return Err(Error::InvalidIncrement(increment));
            }
        }
        Ok(Self {
            values,
            x_origin,
            y_origin,
            x_increment,
            y_increment,
        })
    }

    /// Creates a grid from a flat row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if `data.len() != rows * columns` or on invalid geometry.
    pub fn from_row_major(
        rows: usize,
        columns: usize,
        data: Vec<f64>,
        origin: Point,
        x_increment: f64,
        y_increment: f64,
    ) -> Result<Self> {
        let expected = rows * columns;
        if data.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }
        let values =
            Array2::from_shape_vec((rows, columns), data).map_err(|_| Error::DimensionMismatch {
                expected,
                actual: rows * columns,
            })?;
        Self::new(values, origin.x, origin.y, x_increment, y_increment)
    }

    /// Creates a grid by evaluating `f(x, y)` at every sample position.
    ///
    /// # Errors
    ///
    /// Returns an error on empty dimensions or invalid increments.
    pub fn from_fn(
        rows: usize,
        columns: usize,
        origin: Point,
        x_increment: f64,
        y_increment: f64,
        mut f: impl FnMut(f64, f64) -> f64,
    ) -> Result<Self> {
        let values = Array2::from_shape_fn((rows, columns), |(r, c)| {
            f(
                origin.x + usize_to_f64(c) * x_increment,
                origin.y + usize_to_f64(r) * y_increment,
            )
        });
        Self::new(values, origin.x, origin.y, x_increment, y_increment)
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.values.nrows()
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.values.ncols()
    }

    #[must_use]
    pub fn x_increment(&self) -> f64 {
        self.x_increment
    }

    #[must_use]
    pub fn y_increment(&self) -> f64 {
        self.y_increment
    }

    #[must_use]
    pub fn x_origin(&self) -> f64 {
        self.x_origin
    }

    #[must_use]
    pub fn y_origin(&self) -> f64 {
        self.y_origin
    }

    /// Nearest column for `x`, clamped to `[0, column_count - 1]`.
    #[must_use]
    pub fn column(&self, x: f64) -> usize {
        f64_to_index_clamped((x - self.x_origin) / self.x_increment, self.column_count())
    }

    /// Nearest row for `y`, clamped to `[0, row_count - 1]`.
    #[must_use]
    pub fn row(&self, y: f64) -> usize {
        f64_to_index_clamped((y - self.y_origin) / self.y_increment, self.row_count())
    }

    #[must_use]
    pub fn x(&self, column: usize) -> f64 {
        self.x_origin + usize_to_f64(column) * self.x_increment
    }

    #[must_use]
    pub fn y(&self, row: usize) -> f64 {
        self.y_origin + usize_to_f64(row) * self.y_increment
    }

    /// Sample center of a cell.
    #[must_use]
    pub fn point(&self, row: usize, column: usize) -> Point {
        Point::new(self.x(column), self.y(row))
    }

    /// Sample at `(row, column)`.
    ///
    /// # Panics
    ///
    /// Panics if the indices are out of range; callers pass indices obtained
    /// from [`Grid2D::row`] / [`Grid2D::column`] or bounded loops.
    #[must_use]
    pub fn z(&self, row: usize, column: usize) -> f64 {
        self.values[[row, column]]
    }

    /// Sample of the cell nearest to `(x, y)`.
    #[must_use]
    pub fn z_at(&self, x: f64, y: f64) -> f64 {
        self.z(self.row(y), self.column(x))
    }

    /// Raw sample array.
    #[must_use]
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Cell-edge bounding rectangle of the whole grid.
    #[must_use]
    pub fn domain(&self) -> Rect {
        let half_x = 0.5 * self.x_increment;
        let half_y = 0.5 * self.y_increment;
        Rect {
            min_x: self.x_origin - half_x,
            min_y: self.y_origin - half_y,
            max_x: self.x(self.column_count() - 1) + half_x,
            max_y: self.y(self.row_count() - 1) + half_y,
        }
    }

    /// Minimum and maximum of all non-NaN samples.
    #[must_use]
    pub fn z_range(&self) -> Option<(f64, f64)> {
        min_max(self.values.iter().copied())
    }

    /// Minimum and maximum of the samples whose cell center satisfies `predicate`.
    pub fn range_where(&self, mut predicate: impl FnMut(Point) -> bool) -> Option<(f64, f64)> {
        min_max(
            self.values
                .indexed_iter()
                .filter(|((r, c), _)| predicate(self.point(*r, *c)))
                .map(|(_, z)| *z),
        )
    }

    /// All non-NaN samples, unordered.
    #[must_use]
    pub fn finite_samples(&self) -> Vec<f64> {
        self.values.iter().copied().filter(|z| !z.is_nan()).collect()
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.filter(|z| !z.is_nan()).fold(None, |acc, z| match acc {
        None => Some((z, z)),
        Some((lo, hi)) => Some((lo.min(z), hi.max(z))),
    })
}
