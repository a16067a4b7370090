//! atomj-render: Gradient mapping and raster caching for 2D channel maps.
//!
//! This crate provides:
//! - **Color gradients** and the bound [`PaintScale`]
//! - **[`GradientRenderer`]** - range selection (full / automatic / ROI / manual),
//!   ROI masking and the packed-raster fast path
//! - **[`Channel2DPlot`]** - dataset layers, cached bitmap and overlay layers
//!

pub mod axes;
pub mod colormap;
pub mod error;
pub mod gradient;
pub mod overlay;
pub mod paint_scale;
pub mod plot;
pub mod raster;
pub mod renderer;
pub mod style;

pub use axes::{Axes, PixelRect, PlotOrientation};
pub use colormap::Colormap;
pub use error::{RenderError, Result};
pub use gradient::ColorGradient;
pub use overlay::{Keyed, MapMarker, OverlayCollection, Profile};
pub use paint_scale::PaintScale;
pub use plot::{Channel2DPlot, ChartEntity, DatasetOrder, Frame, PlotLabel, PlotUpdate};
pub use raster::RasterImage;
pub use renderer::{
    AutomaticRange, ChangeSet, FullRange, GradientRenderer, MaskSelector, QuantileRange,
    RangeSelector, RendererProperty,
};
pub use style::{
    JsonStyleStore, MarkerShape, MemoryStyleStore, NumberFormat, Preferences, RendererStyle,
    StyleStore,
};
