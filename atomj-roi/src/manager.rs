//! ROI interaction state machine.
//!
//! The manager reacts to pointer events according to the [`InteractionMode`]
//! the host passes in and talks back to it through a [`RoiSupervisor`]. It is
//! in one of three states:
//!
//! - idle,
//! - constructing a polygon or freehand ROI,
//! - dragging an anchor of an existing ROI.
//!
//! The manager keeps its own copy of the ROI collection. Every ROI it adds or
//! mutates is pushed to the supervisor as well.

use atomj_core::{Anchor, Point, Rect, Roi, RoiCollection, RoiKey};
use log::{debug, trace};

use crate::cursor::Cursor;
use crate::error::Result;
use crate::event::{MouseButton, PointerEvent};
use crate::mode::InteractionMode;
use crate::supervisor::RoiSupervisor;

/// Default half-size of the hit square, as a fraction of the visible extent.
pub const DEFAULT_HOT_FRACTION: f64 = 0.005;

/// Click-created rectangles and ellipses span this fraction of the visible extent.
const CLICK_SHAPE_FRACTION: f64 = 1.0 / 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoiManagerState {
    Idle,
    Constructing,
    DraggingHandle,
}

/// Anchor captured by a press, with the drag reference points.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RoiDrag {
    key: RoiKey,
    anchor: Anchor,
    rotation_center: Point,
    composite_center: Point,
    pressed: Point,
    last: Point,
}

#[derive(Debug, Clone)]
pub struct RoiManager {
    rois: RoiCollection,
    under_construction: Option<Roi>,
    drag: Option<RoiDrag>,
    current_roi_index: RoiKey,
    hole_mode: bool,
    hot_fraction: f64,
}

impl Default for RoiManager {
    fn default() -> Self {
        Self {
            rois: RoiCollection::new(),
            under_construction: None,
            drag: None,
            current_roi_index: 1,
            hole_mode: false,
            hot_fraction: DEFAULT_HOT_FRACTION,
        }
    }
}

impl RoiManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> RoiManagerState {
        if self.under_construction.is_some() {
            RoiManagerState::Constructing
        } else if self.drag.is_some() {
            RoiManagerState::DraggingHandle
        } else {
            RoiManagerState::Idle
        }
    }

    #[must_use]
    pub fn rois(&self) -> &RoiCollection {
        &self.rois
    }

    #[must_use]
    pub fn roi_under_construction(&self) -> Option<&Roi> {
        self.under_construction.as_ref()
    }

    /// Key the next created ROI will receive.
    #[must_use]
    pub fn current_roi_index(&self) -> RoiKey {
        self.current_roi_index
    }

    #[must_use]
    pub fn is_hole_mode(&self) -> bool {
        self.hole_mode
    }

    pub fn set_hole_mode(&mut self, hole_mode: bool) {
        self.hole_mode = hole_mode;
    }

    #[must_use]
    pub fn hot_fraction(&self) -> f64 {
        self.hot_fraction
    }

    pub fn set_hot_fraction(&mut self, fraction: f64) {
        if fraction.is_finite() && fraction > 0.0 {
            self.hot_fraction = fraction;
        }
    }

    fn next_key(&mut self) -> RoiKey {
        let key = self.current_roi_index;
        self.current_roi_index = self.current_roi_index.saturating_add(1);
        key
    }

    /// Hit square around `p`.
    #[must_use]
    pub fn hot_rect(&self, p: Point, visible: &Rect) -> Rect {
        Rect::centered(
            p,
            self.hot_fraction * visible.width(),
            self.hot_fraction * visible.height(),
        )
    }

    // ---- collection ----------------------------------------------------------

    /// Adds or replaces a ROI and pushes it to the host.
    ///
    /// Keys of later auto-created ROIs stay above every key seen here.
    pub fn add_or_replace_roi(&mut self, roi: Roi, supervisor: &mut dyn RoiSupervisor) {
        self.current_roi_index = self.current_roi_index.max(roi.key().saturating_add(1));
        self.rois.add_or_replace(roi.clone());
        supervisor.add_or_replace_roi(roi);
    }

    pub fn remove_roi(&mut self, key: RoiKey, supervisor: &mut dyn RoiSupervisor) {
        if self.rois.remove(key).is_some() {
            if self.drag.is_some_and(|d| d.key == key) {
                self.drag = None;
            }
            supervisor.remove_roi(key);
        }
    }

    /// Replaces all ROIs.
    pub fn set_rois(&mut self, rois: Vec<Roi>, supervisor: &mut dyn RoiSupervisor) {
        let old: Vec<RoiKey> = self.rois.keys().collect();
        for key in old {
            self.remove_roi(key, supervisor);
        }
        for roi in rois {
            self.add_or_replace_roi(roi, supervisor);
        }
    }

    /// Discards the ROI being built. Its key stays available.
    pub fn cancel_roi_construction(&mut self, supervisor: &mut dyn RoiSupervisor) {
        if let Some(roi) = self.under_construction.take() {
            debug!(
                "[{}] ROI {} construction cancelled",
                supervisor.publication_site(),
                roi.key()
            );
            supervisor.show_provisional_roi(None);
        }
    }

    /// Cancels a multi-step construction the new mode cannot continue.
    pub fn on_mode_changed(&mut self, mode: InteractionMode, supervisor: &mut dyn RoiSupervisor) {
        let keeps = self
            .under_construction
            .as_ref()
            .is_some_and(|_| mode.is_multi_step());
        if !keeps {
            self.cancel_roi_construction(supervisor);
        }
        self.drag = None;
    }

    // ---- pointer handlers -------------------------------------------------------

    pub fn mouse_pressed(
        &mut self,
        mode: InteractionMode,
        event: &mut PointerEvent,
        supervisor: &mut dyn RoiSupervisor,
    ) {
        if !mode.is_roi_mode() {
            return;
        }
        if let Some(roi) = &mut self.under_construction {
            if event.button == MouseButton::Left {
                roi.mouse_pressed_during_construction(event.data, event.modifiers);
                supervisor.show_provisional_roi(Some(&*roi));
            }
            return;
        }
        let hot = self.hot_rect(event.data, &supervisor.visible_area());
        let caught = self
            .rois
            .iter_topmost_first()
            .find_map(|roi| roi.caught_anchor(event.data, &hot).map(|a| (roi, a)));
        if let Some((roi, anchor)) = caught {
            self.drag = Some(RoiDrag {
                key: roi.key(),
                anchor,
                rotation_center: roi.rotation_center(),
                composite_center: roi.composite_rotation_center(),
                pressed: event.data,
                last: event.data,
            });
            trace!("caught {anchor:?} of ROI {}", roi.key());
            let cursor = Cursor::for_anchor(anchor, mode);
            supervisor.request_cursor_change_oriented(cursor.transposed(), cursor);
        }
    }

    pub fn mouse_dragged(
        &mut self,
        mode: InteractionMode,
        event: &mut PointerEvent,
        supervisor: &mut dyn RoiSupervisor,
    ) {
        if event.is_consumed() || !mode.is_roi_mode() {
            return;
        }
        let Some(drag) = &mut self.drag else {
            return;
        };
        let Some(roi) = self.rois.get_mut(drag.key) else {
            self.drag = None;
            return;
        };
        drag.anchor = if mode == InteractionMode::RotateRoi {
            roi.rotate(
                drag.anchor,
                event.modifiers,
                drag.rotation_center,
                drag.composite_center,
                drag.pressed,
                drag.last,
                event.data,
            )
        } else {
            roi.set_position(
                drag.anchor,
                event.modifiers,
                drag.pressed,
                drag.last,
                event.data,
            )
        };
        drag.last = event.data;
        supervisor.add_or_replace_roi(roi.clone());
        event.consume();
    }

    pub fn mouse_released(&mut self, _mode: InteractionMode, _event: &mut PointerEvent) {
        self.drag = None;
    }

    pub fn mouse_moved(
        &mut self,
        mode: InteractionMode,
        event: &mut PointerEvent,
        supervisor: &mut dyn RoiSupervisor,
    ) {
        if !mode.is_roi_mode() {
            return;
        }
        if let Some(roi) = &mut self.under_construction {
            roi.mouse_moved_during_construction(event.data, event.modifiers);
            supervisor.show_provisional_roi(Some(&*roi));
        }
        if event.is_cursor_consumed() {
            return;
        }
        let hot = self.hot_rect(event.data, &supervisor.visible_area());
        let cursor = self
            .rois
            .iter_topmost_first()
            .find_map(|roi| roi.caught_anchor(event.data, &hot))
            .map_or_else(|| Cursor::for_mode(mode), |a| Cursor::for_anchor(a, mode));
        supervisor.request_cursor_change_oriented(cursor.transposed(), cursor);
        event.consume_cursor();
    }

    pub fn mouse_clicked(
        &mut self,
        mode: InteractionMode,
        event: &mut PointerEvent,
        supervisor: &mut dyn RoiSupervisor,
    ) {
        if !mode.is_roi_mode() || event.data.is_nan() {
            return;
        }
        match (event.button, event.click_count) {
            (MouseButton::Left, 1) => self.left_click(mode, event, supervisor),
            (MouseButton::Left, n) if n > 1 => self.double_click(event, supervisor),
            (MouseButton::Right, _) => self.right_click(event, supervisor),
            _ => {}
        }
    }

    fn left_click(
        &mut self,
        mode: InteractionMode,
        event: &mut PointerEvent,
        supervisor: &mut dyn RoiSupervisor,
    ) {
        if self.under_construction.is_some() {
            return;
        }
        let hot = self.hot_rect(event.data, &supervisor.visible_area());
        let hit = self
            .rois
            .iter_topmost_first()
            .find(|roi| roi.is_boundary_clicked(&hot) || roi.is_label_clicked(&hot))
            .map(Roi::key);
        let Some(key) = hit else {
            self.begin_construction(mode, event.data, supervisor);
            return;
        };
        if let Some(roi) = self.rois.get_mut(key) {
            if !roi.reshape_in_response_to_click(event.modifiers, event.data, &hot) {
                let highlighted = roi.is_highlighted();
                roi.set_highlighted(!highlighted);
            }
            supervisor.add_or_replace_roi(roi.clone());
            event.consume();
        }
    }

    fn double_click(&mut self, event: &mut PointerEvent, supervisor: &mut dyn RoiSupervisor) {
        let hot = self.hot_rect(event.data, &supervisor.visible_area());
        let label_hit = self
            .rois
            .iter_topmost_first()
            .find(|roi| roi.caught_anchor(event.data, &hot) == Some(Anchor::Label))
            .map(Roi::key);
        if let Some(key) = label_hit {
            self.rename(key, supervisor);
            event.consume();
            return;
        }
        if let Some(key) = self.rois.boundary_hit(&hot).map(Roi::key) {
            self.remove_roi(key, supervisor);
            event.consume();
        }
    }

    fn rename(&mut self, key: RoiKey, supervisor: &mut dyn RoiSupervisor) {
        let Some(roi) = self.rois.get(key) else {
            return;
        };
        let Some(new_label) = supervisor.edit_roi_label(roi) else {
            return;
        };
        let old_label = roi.label().to_string();
        if new_label == old_label {
            return;
        }
        if let Some(roi) = self.rois.get_mut(key) {
            roi.set_label(new_label.clone());
            supervisor.add_or_replace_roi(roi.clone());
            supervisor.change_roi_label(key, &old_label, &new_label);
        }
    }

    fn right_click(&mut self, event: &mut PointerEvent, supervisor: &mut dyn RoiSupervisor) {
        let Some(mut roi) = self.under_construction.take() else {
            return;
        };
        if roi.respond_to_right_click_during_construction(event.data, event.modifiers) {
            // The key is only taken now; an import may have claimed the seed's key meanwhile.
            let key = self.next_key();
            roi = roi.with_key(key);
            roi.set_finished(true);
            debug!(
                "[{}] ROI {} completed with {} vertices",
                supervisor.publication_site(),
                roi.key(),
                roi.vertex_count()
            );
            supervisor.show_provisional_roi(None);
            self.add_or_replace_roi(roi, supervisor);
        } else {
            self.under_construction = Some(roi);
            self.cancel_roi_construction(supervisor);
        }
        event.consume();
    }

    fn begin_construction(
        &mut self,
        mode: InteractionMode,
        p: Point,
        supervisor: &mut dyn RoiSupervisor,
    ) {
        let visible = supervisor.visible_area();
        let wrap = |roi: Roi, hole: bool| if hole { roi.with_hole(visible) } else { roi };
        match mode {
            InteractionMode::PolygonRoi | InteractionMode::FreeHandRoi => {
                let key = self.current_roi_index;
                let seed = if mode == InteractionMode::PolygonRoi {
                    Roi::polygon_seed(key, p)
                } else {
                    Roi::freehand_seed(key, p)
                };
                let roi = wrap(seed, self.hole_mode);
                supervisor.show_provisional_roi(Some(&roi));
                self.under_construction = Some(roi);
                debug!("[{}] ROI {key} construction started", supervisor.publication_site());
            }
            InteractionMode::RectangleRoi | InteractionMode::EllipseRoi => {
                let rect = Rect::centered(
                    p,
                    0.5 * CLICK_SHAPE_FRACTION * visible.width(),
                    0.5 * CLICK_SHAPE_FRACTION * visible.height(),
                );
                let key = self.next_key();
                let roi = if mode == InteractionMode::RectangleRoi {
                    Roi::rectangle(key, rect)
                } else {
                    Roi::ellipse(key, rect)
                };
                self.add_or_replace_roi(wrap(roi, self.hole_mode), supervisor);
            }
            InteractionMode::WandRoi => {
                let key = self.current_roi_index;
                let traced = supervisor
                    .grid()
                    .and_then(|grid| supervisor.wand_tracer().trace_roi(key, grid, p));
                match traced {
                    Some(roi) => {
                        self.next_key();
                        self.add_or_replace_roi(wrap(roi, self.hole_mode), supervisor);
                    }
                    None => trace!("wand trace at {p:?} found no region"),
                }
            }
            InteractionMode::Normal | InteractionMode::RotateRoi => {}
        }
    }

    // ---- composite operations on highlighted ROIs ----------------------------------

    fn highlighted_keys(&self) -> Vec<RoiKey> {
        self.rois.highlighted().map(Roi::key).collect()
    }

    #[must_use]
    pub fn highlighted_count(&self) -> usize {
        self.rois.highlighted().count()
    }

    fn take_highlighted(&mut self, supervisor: &mut dyn RoiSupervisor) -> Vec<Roi> {
        let keys = self.highlighted_keys();
        let mut taken = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(mut roi) = self.rois.get(key).cloned() {
                self.remove_roi(key, supervisor);
                roi.set_highlighted(false);
                taken.push(roi);
            }
        }
        taken
    }

    /// Replaces the highlighted ROIs by their union; returns the new key.
    ///
    /// # Errors
    ///
    /// Fails when nothing is highlighted.
    pub fn merge_highlighted(&mut self, supervisor: &mut dyn RoiSupervisor) -> Result<RoiKey> {
        let parts = self.take_highlighted(supervisor);
        let key = self.current_roi_index;
        let union = Roi::union(key, key.to_string(), parts)?;
        self.next_key();
        self.add_or_replace_roi(union, supervisor);
        Ok(key)
    }

    /// Replaces the highlighted ROIs by the first one minus the others.
    ///
    /// # Errors
    ///
    /// Fails when nothing is highlighted.
    pub fn subtract_highlighted(&mut self, supervisor: &mut dyn RoiSupervisor) -> Result<RoiKey> {
        let mut parts = self.take_highlighted(supervisor).into_iter();
        let Some(minuend) = parts.next() else {
            let empty = atomj_core::Error::DegenerateShape("nothing to subtract from".into());
            return Err(empty.into());
        };
        let key = self.next_key();
        let difference = Roi::difference(key, key.to_string(), minuend, parts.collect());
        self.add_or_replace_roi(difference, supervisor);
        Ok(key)
    }

    /// Adds the complement of every highlighted ROI within the visible area.
    pub fn complement_highlighted(&mut self, supervisor: &mut dyn RoiSupervisor) -> Vec<RoiKey> {
        let area = supervisor.visible_area();
        self.derive_from_highlighted(supervisor, |roi, key| {
            Roi::complement(key, key.to_string(), roi, area)
        })
    }

    /// Adds the convex hull of every highlighted ROI.
    pub fn convex_hull_highlighted(&mut self, supervisor: &mut dyn RoiSupervisor) -> Vec<RoiKey> {
        self.derive_from_highlighted(supervisor, |roi, key| roi.convex_hull(key, key.to_string()))
    }

    fn derive_from_highlighted(
        &mut self,
        supervisor: &mut dyn RoiSupervisor,
        derive: impl Fn(&Roi, RoiKey) -> Roi,
    ) -> Vec<RoiKey> {
        let sources: Vec<Roi> = self.rois.highlighted().cloned().collect();
        let mut keys = Vec::with_capacity(sources.len());
        for source in &sources {
            let key = self.next_key();
            let mut derived = derive(source, key);
            derived.set_highlighted(false);
            self.add_or_replace_roi(derived, supervisor);
            keys.push(key);
        }
        keys
    }

    /// Removes every highlighted ROI.
    pub fn remove_highlighted(&mut self, supervisor: &mut dyn RoiSupervisor) -> usize {
        self.take_highlighted(supervisor).len()
    }

    /// Clears every highlight flag.
    pub fn clear_highlight(&mut self, supervisor: &mut dyn RoiSupervisor) {
        for key in self.highlighted_keys() {
            if let Some(roi) = self.rois.get_mut(key) {
                roi.set_highlighted(false);
                supervisor.add_or_replace_roi(roi.clone());
            }
        }
    }
}
