//! atomj-core: Core types for AFM map analysis.
//!
//! This crate provides the scalar grid accessor, the geometric primitives,
//! the region-of-interest model with its composites, the insertion-ordered
//! ROI collection and the wand contour tracer.
//!

pub mod collection;
pub mod color;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod roi;
pub mod util;
pub mod wand;

pub use collection::RoiCollection;
pub use color::Rgba;
pub use error::{Error, Result};
pub use geometry::{Point, Rect};
pub use grid::Grid2D;
pub use roi::{
    Anchor, Compass, CompositeOp, Modifiers, PathKind, Roi, RoiKey, RoiKind, RoiShape, RoiStyle,
};
pub use wand::{Connectivity, WandContourTracer};
