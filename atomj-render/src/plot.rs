//! Channel plot: dataset layers over a cached raster, with overlay layers.
//!
//! The dataset layers are rendered into a bitmap that is reused until a
//! dataset, renderer, axis or pixel-affecting ROI change sets the `refresh`
//! flag, or until the data area is resized. ROI outlines, profiles and map
//! markers are drawn on a copy of that bitmap every frame.

use std::sync::Arc;

use atomj_core::util::pixel_index;
use atomj_core::{Grid2D, Point, Rgba, Roi, RoiCollection, RoiKey};
use log::{debug, trace, warn};

use crate::axes::{Axes, PixelRect, PlotOrientation};
use crate::error::{RenderError, Result};
use crate::overlay::{MapMarker, OverlayCollection, Profile};
use crate::raster::RasterImage;
use crate::renderer::{ChangeSet, GradientRenderer, MaskSelector, RendererProperty};

/// Order in which dataset layers are painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatasetOrder {
    /// Layer 0 first, later layers on top.
    #[default]
    Forward,
    /// Last layer first, layer 0 on top.
    Reverse,
}

/// Hit-test region recorded while rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartEntity {
    pub dataset: usize,
    pub area: PixelRect,
    /// `(row, column)`; `None` for a whole-dataset entity from the fast path.
    pub cell: Option<(usize, usize)>,
}

/// Text to draw at a pixel position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotLabel {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub color: Rgba,
}

/// One drawn frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RasterImage,
    pub labels: Vec<PlotLabel>,
    pub entities: Vec<ChartEntity>,
    /// True if the dataset raster was reused.
    pub from_cache: bool,
}

impl Frame {
    #[must_use]
    pub fn blank(width: usize, height: usize, background: Rgba) -> Self {
        Self {
            image: RasterImage::filled(width, height, background),
            labels: Vec::new(),
            entities: Vec::new(),
            from_cache: false,
        }
    }
}

/// Effect of an overlay mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlotUpdate {
    /// Overlays must be redrawn on the next paint.
    pub overlays_changed: bool,
    /// The dataset raster must be rebuilt.
    pub raster_invalidated: bool,
}

impl PlotUpdate {
    const OVERLAY: PlotUpdate = PlotUpdate {
        overlays_changed: true,
        raster_invalidated: false,
    };
}

#[derive(Debug, Clone)]
struct DatasetLayer {
    grid: Arc<Grid2D>,
    renderer: GradientRenderer,
}

#[derive(Debug, Clone)]
struct RasterCache {
    image: RasterImage,
    labels: Vec<PlotLabel>,
    entities: Vec<ChartEntity>,
}

const MARKER_HALF_SIZE: f64 = 4.0;

/// Plot of one or more channel grids.
#[derive(Debug, Clone)]
pub struct Channel2DPlot {
    layers: Vec<DatasetLayer>,
    order: DatasetOrder,
    axes: Axes,
    use_buffer: bool,
    refresh: bool,
    cache: Option<RasterCache>,
    rois: RoiCollection,
    roi_under_construction: Option<Roi>,
    profiles: OverlayCollection<Profile>,
    markers: OverlayCollection<MapMarker>,
    background: Rgba,
}

impl Default for Channel2DPlot {
    fn default() -> Self {
        Self::new(Axes::default())
    }
}

impl Channel2DPlot {
    #[must_use]
    pub fn new(axes: Axes) -> Self {
        Self {
            layers: Vec::new(),
            order: DatasetOrder::Forward,
            axes,
            use_buffer: true,
            refresh: true,
            cache: None,
            rois: RoiCollection::new(),
            roi_under_construction: None,
            profiles: OverlayCollection::new(),
            markers: OverlayCollection::new(),
            background: Rgba::WHITE,
        }
    }

    /// True if the next draw rebuilds the dataset raster.
    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        self.refresh
    }

    fn invalidate(&mut self) {
        self.refresh = true;
    }

    // ---- datasets and renderers ---------------------------------------------

    /// Adds a layer and returns its index. The renderer is fitted to `grid`.
    pub fn add_dataset(&mut self, grid: Arc<Grid2D>, mut renderer: GradientRenderer) -> usize {
        renderer.fit_to_dataset(Arc::clone(&grid), true);
        self.layers.push(DatasetLayer { grid, renderer });
        let index = self.layers.len() - 1;
        self.refresh_mask(index);
        self.invalidate();
        debug!("dataset {index} added");
        index
    }

    /// Replaces the grid of layer `index` and refits its renderer.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownDataset`] for a missing layer.
    pub fn set_dataset(
        &mut self,
        index: usize,
        grid: Arc<Grid2D>,
        changed_materially: bool,
    ) -> Result<ChangeSet> {
        let layer = self
            .layers
            .get_mut(index)
            .ok_or(RenderError::UnknownDataset(index))?;
        let changes = layer
            .renderer
            .fit_to_dataset(Arc::clone(&grid), changed_materially);
        layer.grid = grid;
        self.refresh_mask(index);
        self.invalidate();
        Ok(changes)
    }

    /// Replaces the renderer of layer `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownDataset`] for a missing layer.
    pub fn set_renderer(&mut self, index: usize, mut renderer: GradientRenderer) -> Result<()> {
        let layer = self
            .layers
            .get_mut(index)
            .ok_or(RenderError::UnknownDataset(index))?;
        renderer.fit_to_dataset(Arc::clone(&layer.grid), true);
        layer.renderer = renderer;
        self.refresh_mask(index);
        self.invalidate();
        Ok(())
    }

    /// Drops layer `index` together with its renderer. Later layers move down by one.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownDataset`] for a missing layer.
    pub fn remove_dataset(&mut self, index: usize) -> Result<(Arc<Grid2D>, GradientRenderer)> {
        if index >= self.layers.len() {
            return Err(RenderError::UnknownDataset(index));
        }
        let layer = self.layers.remove(index);
        self.invalidate();
        debug!("dataset {index} removed");
        Ok((layer.grid, layer.renderer))
    }

    /// Applies `edit` to a renderer and invalidates whatever it changed.
    ///
    /// ROI statistics are recomputed right away when the renderer asks for them.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownDataset`] for a missing layer.
    pub fn update_renderer(
        &mut self,
        index: usize,
        edit: impl FnOnce(&mut GradientRenderer) -> ChangeSet,
    ) -> Result<ChangeSet> {
        let layer = self
            .layers
            .get_mut(index)
            .ok_or(RenderError::UnknownDataset(index))?;
        let mut changes = edit(&mut layer.renderer);
        if changes.contains(RendererProperty::RoiSamplesNeeded) {
            let mask = mask_region(&self.rois);
            changes.extend(supply_roi_samples(layer, mask.as_ref()));
        }
        if changes.requires_repaint() {
            self.invalidate();
        }
        Ok(changes)
    }

    #[must_use]
    pub fn renderer(&self, index: usize) -> Option<&GradientRenderer> {
        self.layers.get(index).map(|l| &l.renderer)
    }

    #[must_use]
    pub fn dataset(&self, index: usize) -> Option<&Arc<Grid2D>> {
        self.layers.get(index).map(|l| &l.grid)
    }

    #[must_use]
    pub fn dataset_count(&self) -> usize {
        self.layers.len()
    }

    /// Copy of the renderer of layer `index`, for use on another plot.
    ///
    /// A missing layer yields a freshly configured default renderer.
    #[must_use]
    pub fn duplicate_renderer(&self, index: usize) -> GradientRenderer {
        if let Some(layer) = self.layers.get(index) {
            layer.renderer.clone()
        } else {
            warn!("no renderer at index {index} to duplicate, using a default renderer");
            GradientRenderer::default()
        }
    }

    // ---- axes and order --------------------------------------------------------

    #[must_use]
    pub fn axes(&self) -> &Axes {
        &self.axes
    }

    pub fn set_axes(&mut self, axes: Axes) {
        if self.axes != axes {
            self.axes = axes;
            self.invalidate();
        }
    }

    pub fn set_orientation(&mut self, orientation: PlotOrientation) {
        self.set_axes(self.axes.with_orientation(orientation));
    }

    #[must_use]
    pub fn orientation(&self) -> PlotOrientation {
        self.axes.orientation
    }

    pub fn set_dataset_order(&mut self, order: DatasetOrder) {
        if self.order != order {
            self.order = order;
            self.invalidate();
        }
    }

    /// Enables or disables the raster cache.
    pub fn set_use_buffer(&mut self, use_buffer: bool) {
        self.use_buffer = use_buffer;
        self.invalidate();
    }

    pub fn set_background(&mut self, background: Rgba) {
        if self.background != background {
            self.background = background;
            self.invalidate();
        }
    }

    // ---- ROIs -------------------------------------------------------------------

    #[must_use]
    pub fn rois(&self) -> &RoiCollection {
        &self.rois
    }

    #[must_use]
    pub fn roi(&self, key: RoiKey) -> Option<&Roi> {
        self.rois.get(key)
    }

    pub fn add_or_replace_roi(&mut self, roi: Roi) -> PlotUpdate {
        self.rois.add_or_replace(roi);
        self.rois_changed()
    }

    pub fn remove_roi(&mut self, key: RoiKey) -> PlotUpdate {
        if self.rois.remove(key).is_none() {
            return PlotUpdate::default();
        }
        self.rois_changed()
    }

    pub fn set_rois(&mut self, rois: impl IntoIterator<Item = Roi>) -> PlotUpdate {
        self.rois.set_all(rois);
        self.rois_changed()
    }

    #[must_use]
    pub fn roi_under_construction(&self) -> Option<&Roi> {
        self.roi_under_construction.as_ref()
    }

    /// Shows (or clears) the provisional outline of a ROI being built.
    pub fn set_roi_under_construction(&mut self, roi: Option<Roi>) -> PlotUpdate {
        self.roi_under_construction = roi;
        PlotUpdate::OVERLAY
    }

    fn rois_changed(&mut self) -> PlotUpdate {
        let mut update = PlotUpdate::OVERLAY;
        for index in 0..self.layers.len() {
            if self.refresh_mask(index) {
                update.raster_invalidated = true;
            }
        }
        if update.raster_invalidated {
            self.invalidate();
        }
        update
    }

    /// Pushes the ROI union to layer `index`; returns whether pixels changed.
    fn refresh_mask(&mut self, index: usize) -> bool {
        let mask = mask_region(&self.rois);
        let Some(layer) = self.layers.get_mut(index) else {
            return false;
        };
        let mut changes = layer.renderer.set_masked_region(mask.clone());
        if layer.renderer.are_roi_samples_needed() {
            changes.extend(supply_roi_samples(layer, mask.as_ref()));
        }
        let mask_visible = layer.renderer.mask_selector() != MaskSelector::NoMask
            && changes.contains(RendererProperty::MaskedRegion);
        mask_visible
            || changes.contains(RendererProperty::LowerBound)
            || changes.contains(RendererProperty::UpperBound)
    }

    // ---- profiles and markers -------------------------------------------------------

    #[must_use]
    pub fn profiles(&self) -> &OverlayCollection<Profile> {
        &self.profiles
    }

    pub fn add_or_replace_profile(&mut self, profile: Profile) -> PlotUpdate {
        self.profiles.add_or_replace(profile);
        PlotUpdate::OVERLAY
    }

    pub fn remove_profile(&mut self, key: usize) -> PlotUpdate {
        match self.profiles.remove(key) {
            Some(_) => PlotUpdate::OVERLAY,
            None => PlotUpdate::default(),
        }
    }

    pub fn set_profiles(&mut self, profiles: impl IntoIterator<Item = Profile>) -> PlotUpdate {
        self.profiles.set_all(profiles);
        PlotUpdate::OVERLAY
    }

    #[must_use]
    pub fn markers(&self) -> &OverlayCollection<MapMarker> {
        &self.markers
    }

    pub fn add_or_replace_marker(&mut self, marker: MapMarker) -> PlotUpdate {
        self.markers.add_or_replace(marker);
        PlotUpdate::OVERLAY
    }

    pub fn remove_marker(&mut self, key: usize) -> PlotUpdate {
        match self.markers.remove(key) {
            Some(_) => PlotUpdate::OVERLAY,
            None => PlotUpdate::default(),
        }
    }

    pub fn set_markers(&mut self, markers: impl IntoIterator<Item = MapMarker>) -> PlotUpdate {
        self.markers.set_all(markers);
        PlotUpdate::OVERLAY
    }

    // ---- drawing -------------------------------------------------------------------

    /// Draws the plot on a `width` x `height` data area.
    pub fn draw(&mut self, width: usize, height: usize) -> Frame {
        let resized = self
            .cache
            .as_ref()
            .map_or(true, |c| c.image.size() != (width, height));
        let from_cache = self.use_buffer && !self.refresh && !resized;
        if from_cache {
            trace!("reusing cached raster {width}x{height}");
        } else {
            self.cache = Some(self.render_layers(width, height));
            self.refresh = false;
        }
        let mut frame = match &self.cache {
            Some(cache) => Frame {
                image: cache.image.clone(),
                labels: cache.labels.clone(),
                entities: cache.entities.clone(),
                from_cache,
            },
            None => Frame::blank(width, height, self.background),
        };
        self.draw_overlays(&mut frame);
        frame
    }

    fn render_layers(&self, width: usize, height: usize) -> RasterCache {
        let mut frame = Frame::blank(width, height, self.background);
        let indices: Vec<usize> = match self.order {
            DatasetOrder::Forward => (0..self.layers.len()).collect(),
            DatasetOrder::Reverse => (0..self.layers.len()).rev().collect(),
        };
        for index in indices {
            let layer = &self.layers[index];
            layer
                .renderer
                .render(&layer.grid, &self.axes, index, &mut frame);
        }
        debug!(
            "rendered {} dataset(s) into {width}x{height} raster",
            self.layers.len()
        );
        RasterCache {
            image: frame.image,
            labels: frame.labels,
            entities: frame.entities,
        }
    }

    fn draw_overlays(&self, frame: &mut Frame) {
        let (w, h) = frame.image.size();
        let to_px = |p: Point| self.axes.data_to_pixel(p, w, h);
        for roi in self.rois.iter() {
            let width = roi.style().width(roi.is_highlighted());
            for ring in roi.outlines() {
                if ring.iter().any(|p| p.is_nan()) {
                    continue;
                }
                let points: Vec<(f64, f64)> = ring.iter().copied().map(to_px).collect();
                frame
                    .image
                    .stroke_polyline(&points, true, roi.style().stroke, width);
            }
            if roi.style().label_visible {
                let (x, y) = to_px(roi.label_position());
                frame.labels.push(PlotLabel {
                    text: roi.label().to_string(),
                    x,
                    y,
                    font_size: 12.0,
                    color: roi.style().stroke,
                });
            }
        }
        if let Some(roi) = &self.roi_under_construction {
            let style = roi.style();
            for ring in roi.outlines() {
                let mut points: Vec<(f64, f64)> = ring.iter().copied().map(to_px).collect();
                if let Some(preview) = roi.preview() {
                    points.push(to_px(preview));
                }
                frame
                    .image
                    .stroke_polyline(&points, roi.is_finished(), style.stroke, style.stroke_width);
            }
        }
        for profile in self.profiles.iter() {
            let points: Vec<(f64, f64)> = profile.points.iter().copied().map(to_px).collect();
            frame.image.stroke_polyline(&points, false, profile.color, 1.0);
        }
        for marker in self.markers.iter() {
            if marker.position.is_nan() {
                continue;
            }
            let (x, y) = to_px(marker.position);
            let d = MARKER_HALF_SIZE;
            frame.image.draw_line((x - d, y), (x + d, y), marker.color, 1.0);
            frame.image.draw_line((x, y - d), (x, y + d), marker.color, 1.0);
        }
    }

    /// Topmost entity under a pixel of the last drawn frame.
    ///
    /// Whole-dataset entities are resolved to the cell under the pixel.
    #[must_use]
    pub fn entity_at(&self, px: f64, py: f64) -> Option<ChartEntity> {
        let cache = self.cache.as_ref()?;
        let (w, h) = cache.image.size();
        let entity = cache.entities.iter().rev().find(|e| e.area.contains(px, py))?;
        let mut entity = *entity;
        if entity.cell.is_none() {
            let layer = self.layers.get(entity.dataset)?;
            let pixel = (pixel_index(px, w)?, pixel_index(py, h)?);
            let cell = layer
                .renderer
                .cell_at_pixel(&layer.grid, &self.axes, (w, h), pixel)?;
            entity.cell = Some(cell);
        }
        Some(entity)
    }
}

/// Union of all ROIs, used as the mask region.
fn mask_region(rois: &RoiCollection) -> Option<Roi> {
    let mut parts: Vec<Roi> = rois.iter().cloned().collect();
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Roi::union(0, "mask", parts).ok(),
    }
}

/// Computes the ROI lens range for a renderer that needs it.
fn supply_roi_samples(layer: &mut DatasetLayer, mask: Option<&Roi>) -> ChangeSet {
    let range = mask.and_then(|m| layer.grid.range_where(|p| m.contains(p)));
    match range {
        Some((lower, upper)) => layer.renderer.set_roi_bounds(lower, upper),
        None => layer.renderer.set_lens_to_full(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RangeSelector;
    use atomj_core::Rect;

    fn grid() -> Arc<Grid2D> {
        Arc::new(
            Grid2D::from_fn(4, 4, Point::new(0.0, 0.0), 1.0, 1.0, |x, y| x + 4.0 * y).unwrap(),
        )
    }

    fn unit_square() -> Roi {
        Roi::rectangle(1, Rect::centered_square(Point::new(1.0, 1.0), 0.6))
    }

    fn plot() -> Channel2DPlot {
        let g = grid();
        let mut plot = Channel2DPlot::new(Axes::fitting(&g.domain()));
        plot.add_dataset(g, GradientRenderer::default());
        plot
    }

    #[test]
    fn test_cache_reused_until_invalidated() {
        let mut plot = plot();
        assert!(!plot.draw(40, 40).from_cache);
        assert!(plot.draw(40, 40).from_cache);
        assert!(!plot.draw(50, 40).from_cache);
        plot.set_dataset_order(DatasetOrder::Reverse);
        assert!(!plot.draw(50, 40).from_cache);
    }

    #[test]
    fn test_overlay_changes_keep_raster() {
        let mut plot = plot();
        plot.draw(40, 40);
        let update = plot.add_or_replace_marker(MapMarker {
            key: 1,
            position: Point::new(1.0, 1.0),
            color: Rgba::BLACK,
        });
        assert!(update.overlays_changed && !update.raster_invalidated);
        let update = plot.add_or_replace_roi(unit_square());
        assert!(!update.raster_invalidated);
        assert!(plot.draw(40, 40).from_cache);
    }

    #[test]
    fn test_mask_change_invalidates_raster() {
        let mut plot = plot();
        plot.update_renderer(0, |r| r.set_mask_selector(MaskSelector::MaskInside))
            .unwrap();
        plot.draw(40, 40);
        let update = plot.add_or_replace_roi(unit_square());
        assert!(update.raster_invalidated);
        assert!(!plot.draw(40, 40).from_cache);
    }

    #[test]
    fn test_roi_full_chain() {
        let mut plot = plot();
        plot.add_or_replace_roi(unit_square());
        plot.update_renderer(0, |r| r.set_range_selector(RangeSelector::RoiFull))
            .unwrap();
        let r = plot.renderer(0).unwrap();
        assert_eq!((r.lower_bound(), r.upper_bound()), (5.0, 5.0));
        plot.remove_roi(1);
        let r = plot.renderer(0).unwrap();
        assert_eq!((r.lower_bound(), r.upper_bound()), (0.0, 15.0));
    }

    #[test]
    fn test_entity_replay_from_cache() {
        let mut plot = plot();
        plot.draw(40, 40);
        let first = plot.entity_at(5.0, 35.0).unwrap();
        assert_eq!(first.cell, Some((0, 0)));
        plot.draw(40, 40);
        assert_eq!(plot.entity_at(35.0, 5.0).unwrap().cell, Some((3, 3)));
    }

    #[test]
    fn test_duplicate_missing_renderer_falls_back() {
        let plot = plot();
        let copy = plot.duplicate_renderer(7);
        assert_eq!(copy.range_selector(), RangeSelector::Full);
        assert_eq!(copy.full_bounds(), (0.0, 1.0));
        let mut plot = plot;
        assert!(matches!(
            plot.set_dataset(9, grid(), true),
            Err(RenderError::UnknownDataset(9))
        ));
    }

    #[test]
    fn test_remove_dataset_rebuilds_raster() {
        let mut plot = plot();
        let g = grid();
        plot.add_dataset(Arc::clone(&g), GradientRenderer::default());
        let frame = plot.draw(40, 40);
        assert!(frame.entities.iter().any(|e| e.dataset == 1));
        assert!(plot.draw(40, 40).from_cache);

        let (removed, _) = plot.remove_dataset(1).unwrap();
        assert!(Arc::ptr_eq(&removed, &g));
        assert_eq!(plot.dataset_count(), 1);
        assert!(plot.needs_refresh());
        let frame = plot.draw(40, 40);
        assert!(!frame.from_cache);
        assert!(frame.entities.iter().all(|e| e.dataset == 0));
        assert!(matches!(
            plot.remove_dataset(1),
            Err(RenderError::UnknownDataset(1))
        ));
    }
}
