//! Gradient renderer: range policy, masking and item drawing for one dataset.
//!
//! The renderer owns the active bounds of its [`PaintScale`]. Which bound pair
//! drives them is chosen by the [`RangeSelector`]:
//!
//! - `Full`: the dataset's z-range, refreshed whenever the dataset changes.
//! - `Automatic`: an [`AutomaticRange`] strategy, computed lazily.
//! - `RoiFull`: the range of samples inside the mask region, supplied by the
//!   host through [`GradientRenderer::set_roi_bounds`].
//! - `Manual`: set directly; every bound setter switches to this policy.
//!
//! Mutators return a [`ChangeSet`] naming the properties that changed so the
//! host can invalidate its caches synchronously.

use std::ops::Range;
use std::sync::{Arc, OnceLock};

use atomj_core::util::{f64_to_index_clamped, usize_to_f64};
use atomj_core::{Grid2D, Point, Rect, Rgba, Roi};
use log::{debug, trace};
use rayon::prelude::*;

use crate::axes::{Axes, PixelRect, PlotOrientation};
use crate::error::{RenderError, Result};
use crate::gradient::ColorGradient;
use crate::paint_scale::PaintScale;
use crate::plot::{ChartEntity, Frame, PlotLabel};
use crate::raster::{span, RasterImage};
use crate::style::{MarkerShape, NumberFormat, Preferences, RendererStyle};

/// Policy choosing the bound pair that drives the paint scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeSelector {
    #[default]
    Full,
    Automatic,
    RoiFull,
    Manual,
}

/// Which side of the mask region is painted with the mask color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskSelector {
    #[default]
    NoMask,
    MaskInside,
    MaskOutside,
}

/// Observable renderer properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererProperty {
    Gradient,
    UnderflowColor,
    OverflowColor,
    UseOutsideRangeColors,
    MaskColor,
    RangeSelector,
    MaskSelector,
    MaskedRegion,
    LowerBound,
    UpperBound,
    LowerFullBound,
    UpperFullBound,
    LowerAutomaticBound,
    UpperAutomaticBound,
    /// The host must recompute ROI sample statistics.
    RoiSamplesNeeded,
    /// Shape, outline, guide or label configuration.
    Style,
}

/// Properties changed by one mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    properties: Vec<RendererProperty>,
}

impl ChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, property: RendererProperty) {
        if !self.properties.contains(&property) {
            self.properties.push(property);
        }
    }

    pub fn extend(&mut self, other: ChangeSet) {
        for p in other.properties {
            self.push(p);
        }
    }

    #[must_use]
    pub fn contains(&self, property: RendererProperty) -> bool {
        self.properties.contains(&property)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    #[must_use]
    pub fn properties(&self) -> &[RendererProperty] {
        &self.properties
    }

    /// True if any change affects painted pixels.
    #[must_use]
    pub fn requires_repaint(&self) -> bool {
        self.properties
            .iter()
            .any(|p| *p != RendererProperty::RoiSamplesNeeded)
    }
}

/// Data-driven "interesting" sub-range of a dataset.
pub trait AutomaticRange: std::fmt::Debug + Send + Sync {
    /// Range to display, or `None` when the grid has no usable samples.
    fn automatic_range(&self, grid: &Grid2D) -> Option<(f64, f64)>;
}

/// Full z-range of the dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullRange;

impl AutomaticRange for FullRange {
    fn automatic_range(&self, grid: &Grid2D) -> Option<(f64, f64)> {
        grid.z_range()
    }
}

/// Range between two sample quantiles, excluding outliers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantileRange {
    pub lower: f64,
    pub upper: f64,
}

impl Default for QuantileRange {
    fn default() -> Self {
        Self {
            lower: 0.01,
            upper: 0.99,
        }
    }
}

impl AutomaticRange for QuantileRange {
    fn automatic_range(&self, grid: &Grid2D) -> Option<(f64, f64)> {
        let mut samples = grid.finite_samples();
        if samples.is_empty() {
            return None;
        }
        samples.sort_by(f64::total_cmp);
        let last = samples.len() - 1;
        let at = |q: f64| {
            samples[f64_to_index_clamped(q.clamp(0.0, 1.0) * usize_to_f64(last), samples.len())]
        };
        let (lo, hi) = (at(self.lower.min(self.upper)), at(self.upper.max(self.lower)));
        Some((lo, hi))
    }
}

/// Maps the samples of one grid to colors and draws them.
#[derive(Debug, Clone)]
pub struct GradientRenderer {
    preferences: Preferences,
    gradient: ColorGradient,
    use_outside_range_colors: bool,
    underflow_color: Rgba,
    overflow_color: Rgba,
    mask_color: Rgba,
    range_selector: RangeSelector,
    mask_selector: MaskSelector,
    masked_region: Option<Roi>,
    lower_bound: f64,
    upper_bound: f64,
    lower_full_bound: f64,
    upper_full_bound: f64,
    automatic_bounds: OnceLock<(f64, f64)>,
    lower_roi_bound: f64,
    upper_roi_bound: f64,
    automatic_range: Arc<dyn AutomaticRange>,
    dataset: Option<Arc<Grid2D>>,
    paint_scale: PaintScale,
    x_density: f64,
    y_density: f64,
}

impl Default for GradientRenderer {
    fn default() -> Self {
        Self::new(Preferences::default())
    }
}

impl GradientRenderer {
    /// Renderer configured from `preferences`, bounds `[0, 1]` until a
    /// dataset is attached.
    #[must_use]
    pub fn new(preferences: Preferences) -> Self {
        let style = preferences.style().clone();
        let paint_scale = PaintScale::new(
            0.0,
            1.0,
            style.gradient.clone(),
            style.gradient.start_color(),
            style.gradient.end_color(),
        );
        let mut renderer = Self {
            gradient: style.gradient,
            use_outside_range_colors: style.use_outside_range_colors,
            underflow_color: style.underflow_color,
            overflow_color: style.overflow_color,
            mask_color: style.mask_color,
            preferences,
            range_selector: RangeSelector::Full,
            mask_selector: MaskSelector::NoMask,
            masked_region: None,
            lower_bound: 0.0,
            upper_bound: 1.0,
            lower_full_bound: 0.0,
            upper_full_bound: 1.0,
            automatic_bounds: OnceLock::new(),
            lower_roi_bound: 0.0,
            upper_roi_bound: 1.0,
            automatic_range: Arc::new(FullRange),
            dataset: None,
            paint_scale,
            x_density: 1.0,
            y_density: 1.0,
        };
        renderer.update_paint_scale();
        renderer
    }

    /// Replaces the automatic range strategy.
    #[must_use]
    pub fn with_automatic_range(mut self, strategy: Arc<dyn AutomaticRange>) -> Self {
        self.automatic_range = strategy;
        self.automatic_bounds = OnceLock::new();
        self
    }

    // ---- range policy ------------------------------------------------------

    #[must_use]
    pub fn range_selector(&self) -> RangeSelector {
        self.range_selector
    }

    /// Switches the range policy and re-applies its bounds.
    pub fn set_range_selector(&mut self, selector: RangeSelector) -> ChangeSet {
        let mut changes = ChangeSet::new();
        if self.range_selector != selector {
            self.range_selector = selector;
            changes.push(RendererProperty::RangeSelector);
            if selector == RangeSelector::RoiFull {
                changes.push(RendererProperty::RoiSamplesNeeded);
            }
            debug!("range selector -> {selector:?}");
        }
        if let Some((lower, upper)) = self.policy_bounds() {
            self.apply_bounds(lower, upper, &mut changes);
        }
        changes
    }

    fn policy_bounds(&self) -> Option<(f64, f64)> {
        match self.range_selector {
            RangeSelector::Full => Some((self.lower_full_bound, self.upper_full_bound)),
            RangeSelector::Automatic => Some(self.automatic_bounds()),
            RangeSelector::RoiFull => Some((self.lower_roi_bound, self.upper_roi_bound)),
            RangeSelector::Manual => None,
        }
    }

    fn apply_bounds(&mut self, lower: f64, upper: f64, changes: &mut ChangeSet) {
        if lower.to_bits() != self.lower_bound.to_bits() {
            self.lower_bound = lower;
            changes.push(RendererProperty::LowerBound);
        }
        if upper.to_bits() != self.upper_bound.to_bits() {
            self.upper_bound = upper;
            changes.push(RendererProperty::UpperBound);
        }
        self.update_paint_scale();
    }

    fn update_paint_scale(&mut self) {
        let (underflow, overflow) = if self.use_outside_range_colors {
            (self.underflow_color, self.overflow_color)
        } else {
            (self.gradient.start_color(), self.gradient.end_color())
        };
        self.paint_scale = PaintScale::new(
            self.lower_bound,
            self.upper_bound,
            self.gradient.clone(),
            underflow,
            overflow,
        );
    }

    fn validate(lower: f64, upper: f64) -> Result<()> {
        if lower.is_finite() && upper.is_finite() && lower <= upper {
            Ok(())
        } else {
            Err(RenderError::InvalidBounds { lower, upper })
        }
    }

    fn switch_to_manual(&mut self, changes: &mut ChangeSet) {
        if self.range_selector != RangeSelector::Manual {
            self.range_selector = RangeSelector::Manual;
            changes.push(RendererProperty::RangeSelector);
        }
    }

    /// Sets the lower bound and switches to [`RangeSelector::Manual`].
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidBounds`] for a non-finite value or one
    /// above the current upper bound.
    pub fn set_lower_bound(&mut self, lower: f64) -> Result<ChangeSet> {
        self.set_gradient_bounds(lower, self.upper_bound)
    }

    /// Sets the upper bound and switches to [`RangeSelector::Manual`].
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidBounds`] for a non-finite value or one
    /// below the current lower bound.
    pub fn set_upper_bound(&mut self, upper: f64) -> Result<ChangeSet> {
        self.set_gradient_bounds(self.lower_bound, upper)
    }

    /// Sets both bounds and switches to [`RangeSelector::Manual`].
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidBounds`] unless both are finite and ordered.
    pub fn set_gradient_bounds(&mut self, lower: f64, upper: f64) -> Result<ChangeSet> {
        Self::validate(lower, upper)?;
        let mut changes = ChangeSet::new();
        self.switch_to_manual(&mut changes);
        self.apply_bounds(lower, upper, &mut changes);
        Ok(changes)
    }

    #[must_use]
    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    #[must_use]
    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    #[must_use]
    pub fn full_bounds(&self) -> (f64, f64) {
        (self.lower_full_bound, self.upper_full_bound)
    }

    /// Automatic bounds, computed on first use after a dataset change.
    #[must_use]
    pub fn automatic_bounds(&self) -> (f64, f64) {
        *self.automatic_bounds.get_or_init(|| {
            let bounds = self
                .dataset
                .as_deref()
                .and_then(|grid| self.automatic_range.automatic_range(grid))
                .unwrap_or((self.lower_full_bound, self.upper_full_bound));
            trace!("automatic bounds computed: {bounds:?}");
            bounds
        })
    }

    #[must_use]
    pub fn roi_bounds(&self) -> (f64, f64) {
        (self.lower_roi_bound, self.upper_roi_bound)
    }

    /// True while the active policy depends on ROI-filtered samples.
    #[must_use]
    pub fn are_roi_samples_needed(&self) -> bool {
        self.range_selector == RangeSelector::RoiFull
    }

    pub fn set_lower_roi_bound(&mut self, lower: f64) -> ChangeSet {
        self.set_roi_bounds(lower, self.upper_roi_bound)
    }

    pub fn set_upper_roi_bound(&mut self, upper: f64) -> ChangeSet {
        self.set_roi_bounds(self.lower_roi_bound, upper)
    }

    /// Stores the ROI lens range; applied at once under `RoiFull`.
    pub fn set_roi_bounds(&mut self, lower: f64, upper: f64) -> ChangeSet {
        self.lower_roi_bound = lower;
        self.upper_roi_bound = upper;
        let mut changes = ChangeSet::new();
        if self.range_selector == RangeSelector::RoiFull {
            self.apply_bounds(lower, upper, &mut changes);
        }
        changes
    }

    /// Resets the ROI lens to the full range.
    pub fn set_lens_to_full(&mut self) -> ChangeSet {
        self.set_roi_bounds(self.lower_full_bound, self.upper_full_bound)
    }

    /// Attaches `grid` and refits the bounds to it.
    ///
    /// `changed_materially` tells a manual range to reset as well.
    pub fn fit_to_dataset(&mut self, grid: Arc<Grid2D>, changed_materially: bool) -> ChangeSet {
        let mut changes = ChangeSet::new();
        let (lower, upper) = grid.z_range().unwrap_or((0.0, 0.0));
        if lower.to_bits() != self.lower_full_bound.to_bits() {
            changes.push(RendererProperty::LowerFullBound);
        }
        if upper.to_bits() != self.upper_full_bound.to_bits() {
            changes.push(RendererProperty::UpperFullBound);
        }
        self.lower_full_bound = lower;
        self.upper_full_bound = upper;
        self.x_density = grid.x_increment();
        self.y_density = grid.y_increment();
        self.dataset = Some(grid);
        self.automatic_bounds = OnceLock::new();
        changes.push(RendererProperty::LowerAutomaticBound);
        changes.push(RendererProperty::UpperAutomaticBound);

        changes.extend(self.set_lens_to_full());
        match self.range_selector {
            RangeSelector::Full => self.apply_bounds(lower, upper, &mut changes),
            RangeSelector::Manual if changed_materially => {
                self.apply_bounds(lower, upper, &mut changes);
            }
            RangeSelector::Automatic => {
                let (lo, hi) = self.automatic_bounds();
                self.apply_bounds(lo, hi, &mut changes);
            }
            RangeSelector::Manual | RangeSelector::RoiFull => {}
        }
        if self.are_roi_samples_needed() {
            changes.push(RendererProperty::RoiSamplesNeeded);
        }
        debug!(
            "renderer fitted to {}x{} grid, bounds [{}, {}]",
            self.dataset.as_deref().map_or(0, Grid2D::row_count),
            self.dataset.as_deref().map_or(0, Grid2D::column_count),
            self.lower_bound,
            self.upper_bound
        );
        changes
    }

    /// Grid spacing used for shape sizing.
    #[must_use]
    pub fn densities(&self) -> (f64, f64) {
        (self.x_density, self.y_density)
    }

    /// Widens the range after a click on the legend strip.
    ///
    /// `position` is the click position along the strip in `[0, 1]`; the lower
    /// third moves the lower bound, the upper third the upper bound and the
    /// middle third both. Each moved bound shifts outward by `percent` percent
    /// of the current range length.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidBounds`] if a negative `percent` would
    /// cross the bounds.
    pub fn request_paint_scale_change(&mut self, position: f64, percent: f64) -> Result<ChangeSet> {
        let delta = percent / 100.0 * (self.upper_bound - self.lower_bound);
        let (lower, upper) = (self.lower_bound, self.upper_bound);
        if position < 1.0 / 3.0 {
            self.set_lower_bound(lower - delta)
        } else if position > 2.0 / 3.0 {
            self.set_upper_bound(upper + delta)
        } else {
            self.set_gradient_bounds(lower - delta, upper + delta)
        }
    }

    // ---- colors and masking ----------------------------------------------

    #[must_use]
    pub fn paint_scale(&self) -> &PaintScale {
        &self.paint_scale
    }

    #[must_use]
    pub fn gradient(&self) -> &ColorGradient {
        &self.gradient
    }

    pub fn set_gradient(&mut self, gradient: ColorGradient) -> ChangeSet {
        let mut changes = ChangeSet::new();
        if self.gradient != gradient {
            self.gradient = gradient.clone();
            self.preferences.update(|s| s.gradient = gradient);
            self.update_paint_scale();
            changes.push(RendererProperty::Gradient);
        }
        changes
    }

    #[must_use]
    pub fn use_outside_range_colors(&self) -> bool {
        self.use_outside_range_colors
    }

    pub fn set_use_outside_range_colors(&mut self, enabled: bool) -> ChangeSet {
        let mut changes = ChangeSet::new();
        if self.use_outside_range_colors != enabled {
            self.use_outside_range_colors = enabled;
            self.preferences.update(|s| s.use_outside_range_colors = enabled);
            self.update_paint_scale();
            changes.push(RendererProperty::UseOutsideRangeColors);
        }
        changes
    }

    #[must_use]
    pub fn underflow_color(&self) -> Rgba {
        self.underflow_color
    }

    pub fn set_underflow_color(&mut self, color: Rgba) -> ChangeSet {
        let mut changes = ChangeSet::new();
        if self.underflow_color != color {
            self.underflow_color = color;
            self.preferences.update(|s| s.underflow_color = color);
            self.update_paint_scale();
            changes.push(RendererProperty::UnderflowColor);
        }
        changes
    }

    #[must_use]
    pub fn overflow_color(&self) -> Rgba {
        self.overflow_color
    }

    pub fn set_overflow_color(&mut self, color: Rgba) -> ChangeSet {
        let mut changes = ChangeSet::new();
        if self.overflow_color != color {
            self.overflow_color = color;
            self.preferences.update(|s| s.overflow_color = color);
            self.update_paint_scale();
            changes.push(RendererProperty::OverflowColor);
        }
        changes
    }

    #[must_use]
    pub fn mask_color(&self) -> Rgba {
        self.mask_color
    }

    pub fn set_mask_color(&mut self, color: Rgba) -> ChangeSet {
        let mut changes = ChangeSet::new();
        if self.mask_color != color {
            self.mask_color = color;
            self.preferences.update(|s| s.mask_color = color);
            changes.push(RendererProperty::MaskColor);
        }
        changes
    }

    #[must_use]
    pub fn mask_selector(&self) -> MaskSelector {
        self.mask_selector
    }

    pub fn set_mask_selector(&mut self, selector: MaskSelector) -> ChangeSet {
        let mut changes = ChangeSet::new();
        if self.mask_selector != selector {
            self.mask_selector = selector;
            changes.push(RendererProperty::MaskSelector);
        }
        changes
    }

    #[must_use]
    pub fn masked_region(&self) -> Option<&Roi> {
        self.masked_region.as_ref()
    }

    /// Registers the mask region (usually the union of all ROIs).
    pub fn set_masked_region(&mut self, region: Option<Roi>) -> ChangeSet {
        let mut changes = ChangeSet::new();
        if self.masked_region != region {
            self.masked_region = region;
            changes.push(RendererProperty::MaskedRegion);
            if self.are_roi_samples_needed() {
                changes.push(RendererProperty::RoiSamplesNeeded);
            }
        }
        changes
    }

    /// True if `p` is painted with the mask color.
    #[must_use]
    pub fn is_masked(&self, p: Point) -> bool {
        is_masked_by(self.mask_selector, self.masked_region.as_ref(), p)
    }

    /// Color of the sample `z` at `p`, or `None` for a NaN sample.
    #[must_use]
    pub fn color_for(&self, p: Point, z: f64) -> Option<Rgba> {
        if p.is_nan() || z.is_nan() {
            return None;
        }
        if self.is_masked(p) {
            Some(self.mask_color)
        } else {
            Some(self.paint_scale.paint(z))
        }
    }

    // ---- style -------------------------------------------------------------

    #[must_use]
    pub fn style(&self) -> &RendererStyle {
        self.preferences.style()
    }

    #[must_use]
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Edits the drawing style and persists it.
    pub fn update_style(&mut self, edit: impl FnOnce(&mut RendererStyle)) -> ChangeSet {
        let mut changes = ChangeSet::new();
        if self.preferences.update(edit) {
            changes.push(RendererProperty::Style);
        }
        changes
    }

    pub fn set_shape(&mut self, shape: MarkerShape) -> ChangeSet {
        self.update_style(|s| s.shape = shape)
    }

    pub fn set_shape_margin(&mut self, margin: f64) -> ChangeSet {
        self.update_style(|s| s.shape_margin = margin.clamp(0.0, 0.49))
    }

    pub fn set_stretch_shape(&mut self, stretch: bool) -> ChangeSet {
        self.update_style(|s| s.stretch_shape = stretch)
    }

    pub fn set_outline_visible(&mut self, visible: bool) -> ChangeSet {
        self.update_style(|s| s.outline_visible = visible)
    }

    pub fn set_guides_visible(&mut self, visible: bool) -> ChangeSet {
        self.update_style(|s| s.guides_visible = visible)
    }

    pub fn set_label_visible(&mut self, visible: bool) -> ChangeSet {
        self.update_style(|s| s.label_visible = visible)
    }

    pub fn set_number_format(&mut self, format: NumberFormat) -> ChangeSet {
        self.update_style(|s| s.number_format = format)
    }

    #[must_use]
    pub fn format_label(&self, z: f64) -> String {
        self.style().number_format.format(z)
    }

    // ---- drawing -------------------------------------------------------------

    /// True when the packed-raster path reproduces the generic path.
    #[must_use]
    pub fn can_use_fast_path(&self) -> bool {
        self.style().is_plain_grid()
    }

    /// Draws `grid` as dataset `index` into `frame`.
    pub fn render(&self, grid: &Grid2D, axes: &Axes, index: usize, frame: &mut Frame) {
        if self.can_use_fast_path() {
            self.render_fast(grid, axes, index, frame);
        } else {
            self.render_items(grid, axes, index, frame);
        }
    }

    /// Writes packed ARGB pixels for the visible window straight into the frame.
    ///
    /// Pixels resolve to cells through [`CellLookup`], so each pixel ends up
    /// with exactly the colors [`GradientRenderer::render_items`] would give it.
    pub fn render_fast(&self, grid: &Grid2D, axes: &Axes, index: usize, frame: &mut Frame) {
        let Some((rows, cols)) = visible_window(grid, axes) else {
            return;
        };
        let (w, h) = frame.image.size();
        if w == 0 || h == 0 {
            return;
        }
        let lookup = CellLookup::new(self, grid, axes, (&rows, &cols), (w, h));
        frame
            .image
            .pixels_mut()
            .par_chunks_mut(w)
            .enumerate()
            .for_each(|(y, line)| {
                if lookup.by_y[y].is_empty() {
                    return;
                }
                for (x, px) in line.iter_mut().enumerate() {
                    for (r, c) in lookup.cells(x, y) {
                        match self.color_for(grid.point(r, c), grid.z(r, c)) {
                            Some(color) if color.a != 0 => {
                                *px = color.over(Rgba::from_argb(*px)).to_argb();
                            }
                            _ => {}
                        }
                    }
                }
            });
        let area = window_rect(grid, &rows, &cols);
        frame.entities.push(ChartEntity {
            dataset: index,
            area: axes.rect_to_pixels(&area, w, h),
            cell: None,
        });
        trace!(
            "fast path painted {}x{} cells for dataset {index}",
            rows.len(),
            cols.len()
        );
    }

    /// Topmost painted cell under pixel `(x, y)` of a `width` x `height` frame.
    #[must_use]
    pub fn cell_at_pixel(
        &self,
        grid: &Grid2D,
        axes: &Axes,
        (width, height): (usize, usize),
        (x, y): (usize, usize),
    ) -> Option<(usize, usize)> {
        if x >= width || y >= height {
            return None;
        }
        let (rows, cols) = visible_window(grid, axes)?;
        let lookup = CellLookup::new(self, grid, axes, (&rows, &cols), (width, height));
        lookup
            .cells(x, y)
            .filter(|&(r, c)| self.color_for(grid.point(r, c), grid.z(r, c)).is_some())
            .last()
    }

    /// Draws one shape per sample, with optional outline, guides and labels.
    pub fn render_items(&self, grid: &Grid2D, axes: &Axes, index: usize, frame: &mut Frame) {
        let Some((rows, cols)) = visible_window(grid, axes) else {
            return;
        };
        let style = self.style();
        let (w, h) = frame.image.size();
        for r in rows.clone() {
            for c in cols.clone() {
                let p = grid.point(r, c);
                let z = grid.z(r, c);
                let Some(color) = self.color_for(p, z) else {
                    continue;
                };
                let area = self.item_area(p, axes, w, h);
                if !area.intersects_canvas(w, h) {
                    continue;
                }
                match style.shape {
                    MarkerShape::Rectangle => frame.image.fill_rect(&area, color),
                    MarkerShape::Ellipse => frame.image.fill_ellipse(&area, color),
                }
                if style.outline_visible {
                    let outline = item_outline(style.shape, &area);
                    frame
                        .image
                        .stroke_polyline(&outline, true, style.outline_color, style.outline_width);
                }
                if style.label_visible {
                    let (x, y) = area.center();
                    frame.labels.push(PlotLabel {
                        text: self.format_label(z),
                        x,
                        y,
                        font_size: style.label_font_size,
                        color: style.label_color,
                    });
                }
                frame.entities.push(ChartEntity {
                    dataset: index,
                    area,
                    cell: Some((r, c)),
                });
            }
        }
        if style.guides_visible {
            draw_guides(grid, axes, &rows, &cols, style, &mut frame.image);
        }
    }

    fn item_area(&self, p: Point, axes: &Axes, w: usize, h: usize) -> PixelRect {
        let style = self.style();
        if style.stretch_shape {
            let cell = Rect::centered(p, self.x_density / 2.0, self.y_density / 2.0);
            axes.rect_to_pixels(&cell, w, h).inset(style.shape_margin)
        } else {
            let (cx, cy) = axes.data_to_pixel(p, w, h);
            let size = style.shape_size;
            PixelRect::new(cx - size / 2.0, cy - size / 2.0, size, size)
        }
    }
}

/// Cells covering each pixel column and pixel row of a frame.
///
/// Built from the same cell rectangles and pixel-center rule that
/// `render_items` fills, so both paths agree on every pixel, ties included.
struct CellLookup {
    orientation: PlotOrientation,
    /// Cell indices along the horizontal pixel axis (columns when vertical,
    /// rows when horizontal).
    by_x: Vec<Range<usize>>,
    /// Cell indices along the vertical pixel axis.
    by_y: Vec<Range<usize>>,
}

impl CellLookup {
    fn new(
        renderer: &GradientRenderer,
        grid: &Grid2D,
        axes: &Axes,
        (rows, cols): (&Range<usize>, &Range<usize>),
        (w, h): (usize, usize),
    ) -> Self {
        let mut by_x = vec![0..0; w];
        let mut by_y = vec![0..0; h];
        // A cell's horizontal extent depends only on one of its indices.
        for c in cols.clone() {
            let area = renderer.item_area(grid.point(rows.start, c), axes, w, h);
            match axes.orientation {
                PlotOrientation::Vertical => {
                    cover(&mut by_x, span(area.x, area.x + area.width, w), c);
                }
                PlotOrientation::Horizontal => {
                    cover(&mut by_y, span(area.y, area.y + area.height, h), c);
                }
            }
        }
        for r in rows.clone() {
            let area = renderer.item_area(grid.point(r, cols.start), axes, w, h);
            match axes.orientation {
                PlotOrientation::Vertical => {
                    cover(&mut by_y, span(area.y, area.y + area.height, h), r);
                }
                PlotOrientation::Horizontal => {
                    cover(&mut by_x, span(area.x, area.x + area.width, w), r);
                }
            }
        }
        Self {
            orientation: axes.orientation,
            by_x,
            by_y,
        }
    }

    /// Cells under pixel `(x, y)` in the order the per-item path paints them.
    fn cells(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> {
        let (rows, cols) = match self.orientation {
            PlotOrientation::Vertical => (self.by_y[y].clone(), self.by_x[x].clone()),
            PlotOrientation::Horizontal => (self.by_x[x].clone(), self.by_y[y].clone()),
        };
        rows.flat_map(move |r| cols.clone().map(move |c| (r, c)))
    }
}

/// Widens the cell range of every pixel in `pixels` to include `cell`.
fn cover(table: &mut [Range<usize>], pixels: Range<usize>, cell: usize) {
    for slot in &mut table[pixels] {
        *slot = if slot.is_empty() {
            cell..cell + 1
        } else {
            slot.start.min(cell)..slot.end.max(cell + 1)
        };
    }
}

fn is_masked_by(selector: MaskSelector, region: Option<&Roi>, p: Point) -> bool {
    match (selector, region) {
        (MaskSelector::NoMask, _) | (_, None) => false,
        (MaskSelector::MaskInside, Some(roi)) => roi.contains(p),
        (MaskSelector::MaskOutside, Some(roi)) => !roi.contains(p),
    }
}

/// Row and column index ranges of cells overlapping the visible area.
fn visible_window(grid: &Grid2D, axes: &Axes) -> Option<(Range<usize>, Range<usize>)> {
    let area = axes.visible_area();
    let domain = grid.domain();
    if !area.intersects(&domain) {
        return None;
    }
    let c0 = grid.column(area.min_x.max(domain.min_x));
    let c1 = grid.column(area.max_x.min(domain.max_x));
    let r0 = grid.row(area.min_y.max(domain.min_y));
    let r1 = grid.row(area.max_y.min(domain.max_y));
    Some((r0..r1 + 1, c0..c1 + 1))
}

/// Data rectangle covered by a window of cells.
fn window_rect(grid: &Grid2D, rows: &Range<usize>, cols: &Range<usize>) -> Rect {
    let (hx, hy) = (grid.x_increment() / 2.0, grid.y_increment() / 2.0);
    Rect::from_corners(
        Point::new(grid.x(cols.start) - hx, grid.y(rows.start) - hy),
        Point::new(grid.x(cols.end - 1) + hx, grid.y(rows.end - 1) + hy),
    )
}

fn item_outline(shape: MarkerShape, area: &PixelRect) -> Vec<(f64, f64)> {
    match shape {
        MarkerShape::Rectangle => vec![
            (area.x, area.y),
            (area.x + area.width, area.y),
            (area.x + area.width, area.y + area.height),
            (area.x, area.y + area.height),
        ],
        MarkerShape::Ellipse => {
            let (cx, cy) = area.center();
            (0..32)
                .map(|i| {
                    let t = usize_to_f64(i) / 32.0 * std::f64::consts::TAU;
                    (cx + area.width / 2.0 * t.cos(), cy + area.height / 2.0 * t.sin())
                })
                .collect()
        }
    }
}

/// Grid lines along the cell edges of the window.
fn draw_guides(
    grid: &Grid2D,
    axes: &Axes,
    rows: &Range<usize>,
    cols: &Range<usize>,
    style: &RendererStyle,
    image: &mut RasterImage,
) {
    let area = window_rect(grid, rows, cols);
    let (w, h) = image.size();
    let mut line = |a: Point, b: Point| {
        image.draw_line(
            axes.data_to_pixel(a, w, h),
            axes.data_to_pixel(b, w, h),
            style.guide_color,
            style.guide_width,
        );
    };
    for k in 0..=cols.len() {
        let x = area.min_x + usize_to_f64(k) * grid.x_increment();
        line(Point::new(x, area.min_y), Point::new(x, area.max_y));
    }
    for k in 0..=rows.len() {
        let y = area.min_y + usize_to_f64(k) * grid.y_increment();
        line(Point::new(area.min_x, y), Point::new(area.max_x, y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp() -> Arc<Grid2D> {
        // z = 10 * column + row on a 4 x 5 grid
        let grid = Grid2D::from_fn(4, 5, Point::new(0.0, 0.0), 1.0, 1.0, |x, y| 10.0 * x + y);
        Arc::new(grid.unwrap())
    }

    #[test]
    fn test_fit_full_range() {
        let mut r = GradientRenderer::default();
        let changes = r.fit_to_dataset(ramp(), true);
        assert!(changes.contains(RendererProperty::UpperBound));
        assert_relative_eq!(r.lower_bound(), 0.0);
        assert_relative_eq!(r.upper_bound(), 43.0);
        assert_eq!(r.roi_bounds(), (0.0, 43.0));
    }

    #[test]
    fn test_selector_idempotent() {
        let mut r = GradientRenderer::default().with_automatic_range(Arc::new(QuantileRange {
            lower: 0.25,
            upper: 0.75,
        }));
        r.fit_to_dataset(ramp(), true);
        r.set_range_selector(RangeSelector::Automatic);
        let once = (r.lower_bound(), r.upper_bound());
        let again = r.set_range_selector(RangeSelector::Automatic);
        assert!(again.is_empty());
        assert_eq!(once, (r.lower_bound(), r.upper_bound()));
        assert!(once.0 > 0.0 && once.1 < 43.0);
    }

    #[test]
    fn test_bound_setters_switch_to_manual() {
        for selector in [RangeSelector::Full, RangeSelector::Automatic, RangeSelector::RoiFull] {
            let mut r = GradientRenderer::default();
            r.fit_to_dataset(ramp(), true);
            r.set_range_selector(selector);
            let changes = r.set_lower_bound(5.0).unwrap();
            assert!(changes.contains(RendererProperty::RangeSelector));
            assert_eq!(r.range_selector(), RangeSelector::Manual);
            assert_relative_eq!(r.lower_bound(), 5.0);
            r.set_range_selector(selector);
            r.set_gradient_bounds(1.0, 2.0).unwrap();
            assert_eq!((r.lower_bound(), r.upper_bound()), (1.0, 2.0));
            assert_eq!(r.paint_scale().upper_bound(), 2.0);
        }
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let mut r = GradientRenderer::default();
        assert!(r.set_gradient_bounds(2.0, 1.0).is_err());
        assert!(r.set_upper_bound(f64::NAN).is_err());
        assert_eq!(r.range_selector(), RangeSelector::Full);
    }

    #[test]
    fn test_roi_full_requests_samples() {
        let mut r = GradientRenderer::default();
        r.fit_to_dataset(ramp(), true);
        let changes = r.set_range_selector(RangeSelector::RoiFull);
        assert!(changes.contains(RendererProperty::RoiSamplesNeeded));
        assert!(r.are_roi_samples_needed());
        r.set_roi_bounds(10.0, 20.0);
        assert_eq!((r.lower_bound(), r.upper_bound()), (10.0, 20.0));
        r.set_lens_to_full();
        assert_eq!((r.lower_bound(), r.upper_bound()), (0.0, 43.0));
    }

    #[test]
    fn test_manual_kept_unless_material_change() {
        let mut r = GradientRenderer::default();
        r.fit_to_dataset(ramp(), true);
        r.set_gradient_bounds(1.0, 2.0).unwrap();
        r.fit_to_dataset(ramp(), false);
        assert_eq!((r.lower_bound(), r.upper_bound()), (1.0, 2.0));
        r.fit_to_dataset(ramp(), true);
        assert_eq!((r.lower_bound(), r.upper_bound()), (0.0, 43.0));
    }

    #[test]
    fn test_paint_scale_change_thirds() {
        let mut r = GradientRenderer::default();
        r.fit_to_dataset(ramp(), true);
        r.set_gradient_bounds(0.0, 100.0).unwrap();
        r.request_paint_scale_change(0.1, 10.0).unwrap();
        assert_eq!((r.lower_bound(), r.upper_bound()), (-10.0, 100.0));
        r.request_paint_scale_change(0.9, 10.0).unwrap();
        assert_relative_eq!(r.upper_bound(), 111.0);
        r.request_paint_scale_change(0.5, 10.0).unwrap();
        assert_relative_eq!(r.lower_bound(), -22.1);
        assert_relative_eq!(r.upper_bound(), 123.1);
    }

    #[test]
    fn test_underflow_uses_gradient_start() {
        let mut r = GradientRenderer::default();
        r.set_gradient(ColorGradient::linear(Rgba::BLACK, Rgba::WHITE));
        r.set_gradient_bounds(0.0, 100.0).unwrap();
        assert_eq!(r.color_for(Point::new(0.0, 0.0), -5.0), Some(Rgba::BLACK));
        r.set_use_outside_range_colors(true);
        assert_eq!(
            r.color_for(Point::new(0.0, 0.0), -5.0),
            Some(r.underflow_color())
        );
    }

    #[test]
    fn test_nan_sample_skipped() {
        let r = GradientRenderer::default();
        assert_eq!(r.color_for(Point::new(0.0, 0.0), f64::NAN), None);
        assert_eq!(r.color_for(Point::new(f64::NAN, 0.0), 1.0), None);
    }

    #[test]
    fn test_style_change_reported() {
        let mut r = GradientRenderer::default();
        assert!(r.can_use_fast_path());
        let changes = r.set_label_visible(true);
        assert!(changes.contains(RendererProperty::Style));
        assert!(!r.can_use_fast_path());
        assert!(r.set_label_visible(true).is_empty());
    }

    #[test]
    fn test_change_set_repaint() {
        let mut c = ChangeSet::new();
        c.push(RendererProperty::RoiSamplesNeeded);
        assert!(!c.requires_repaint());
        c.push(RendererProperty::LowerBound);
        c.push(RendererProperty::LowerBound);
        assert_eq!(c.properties().len(), 2);
        assert!(c.requires_repaint());
    }
}
