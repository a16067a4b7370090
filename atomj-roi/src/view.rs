//! Channel view: a [`Channel2DPlot`] driven by a [`RoiManager`].

use atomj_core::{Grid2D, Rect, Roi, RoiKey, WandContourTracer};
use atomj_render::{Channel2DPlot, Frame, PlotOrientation};
use log::{debug, info};

use crate::commands;
use crate::cursor::Cursor;
use crate::error::Result;
use crate::event::PointerEvent;
use crate::manager::RoiManager;
use crate::mode::InteractionMode;
use crate::supervisor::RoiSupervisor;

/// The plot side of a channel view; implements [`RoiSupervisor`].
#[derive(Debug, Clone)]
pub struct PlotHost {
    plot: Channel2DPlot,
    tracer: WandContourTracer,
    cursor: Cursor,
    publication_site: String,
    pending_label: Option<String>,
    label_changes: Vec<(RoiKey, String, String)>,
}

impl PlotHost {
    #[must_use]
    pub fn new(plot: Channel2DPlot, publication_site: impl Into<String>) -> Self {
        Self {
            plot,
            tracer: WandContourTracer::default(),
            cursor: Cursor::Default,
            publication_site: publication_site.into(),
            pending_label: None,
            label_changes: Vec::new(),
        }
    }

    #[must_use]
    pub fn plot(&self) -> &Channel2DPlot {
        &self.plot
    }

    pub fn plot_mut(&mut self) -> &mut Channel2DPlot {
        &mut self.plot
    }

    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn set_wand_tracer(&mut self, tracer: WandContourTracer) {
        self.tracer = tracer;
    }

    /// Answer for the next label edit request.
    pub fn queue_label_edit(&mut self, label: impl Into<String>) {
        self.pending_label = Some(label.into());
    }

    /// Renames reported so far as `(key, old, new)`.
    #[must_use]
    pub fn label_changes(&self) -> &[(RoiKey, String, String)] {
        &self.label_changes
    }
}

impl RoiSupervisor for PlotHost {
    fn add_or_replace_roi(&mut self, roi: Roi) {
        self.plot.add_or_replace_roi(roi);
    }

    fn remove_roi(&mut self, key: RoiKey) {
        self.plot.remove_roi(key);
    }

    fn request_cursor_change(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    fn request_cursor_change_oriented(&mut self, horizontal: Cursor, vertical: Cursor) {
        self.cursor = match self.plot.orientation() {
            PlotOrientation::Horizontal => horizontal,
            PlotOrientation::Vertical => vertical,
        };
    }

    fn change_roi_label(&mut self, key: RoiKey, old_label: &str, new_label: &str) {
        info!(
            "[{}] ROI {key} renamed '{old_label}' -> '{new_label}'",
            self.publication_site
        );
        self.label_changes
            .push((key, old_label.to_string(), new_label.to_string()));
    }

    fn edit_roi_label(&mut self, _roi: &Roi) -> Option<String> {
        self.pending_label.take()
    }

    fn publication_site(&self) -> &str {
        &self.publication_site
    }

    fn wand_tracer(&self) -> &WandContourTracer {
        &self.tracer
    }

    fn grid(&self) -> Option<&Grid2D> {
        self.plot.dataset(0).map(|grid| &**grid)
    }

    fn visible_area(&self) -> Rect {
        self.plot.axes().visible_area()
    }

    fn show_provisional_roi(&mut self, roi: Option<&Roi>) {
        self.plot.set_roi_under_construction(roi.cloned());
    }
}

/// A channel map with pointer-driven ROI editing.
#[derive(Debug, Clone)]
pub struct ChannelView {
    host: PlotHost,
    manager: RoiManager,
    mode: InteractionMode,
}

impl ChannelView {
    #[must_use]
    pub fn new(plot: Channel2DPlot, publication_site: impl Into<String>) -> Self {
        Self {
            host: PlotHost::new(plot, publication_site),
            manager: RoiManager::new(),
            mode: InteractionMode::Normal,
        }
    }

    #[must_use]
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Changes the interaction mode before any dependent state is read.
    pub fn set_mode(&mut self, mode: InteractionMode) {
        if self.mode != mode {
            debug!("[{}] mode {:?} -> {mode:?}", self.host.publication_site, self.mode);
            self.mode = mode;
            self.manager.on_mode_changed(mode, &mut self.host);
            let cursor = Cursor::for_mode(mode);
            self.host.request_cursor_change(cursor);
        }
    }

    #[must_use]
    pub fn host(&self) -> &PlotHost {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut PlotHost {
        &mut self.host
    }

    #[must_use]
    pub fn plot(&self) -> &Channel2DPlot {
        &self.host.plot
    }

    #[must_use]
    pub fn manager(&self) -> &RoiManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut RoiManager {
        &mut self.manager
    }

    /// Adds a ROI from outside the pointer flow (import, scene file).
    pub fn add_or_replace_roi(&mut self, roi: Roi) {
        self.manager.add_or_replace_roi(roi, &mut self.host);
    }

    pub fn remove_roi(&mut self, key: RoiKey) {
        self.manager.remove_roi(key, &mut self.host);
    }

    pub fn mouse_pressed(&mut self, event: &mut PointerEvent) {
        self.manager.mouse_pressed(self.mode, event, &mut self.host);
    }

    pub fn mouse_dragged(&mut self, event: &mut PointerEvent) {
        self.manager.mouse_dragged(self.mode, event, &mut self.host);
    }

    pub fn mouse_released(&mut self, event: &mut PointerEvent) {
        self.manager.mouse_released(self.mode, event);
    }

    pub fn mouse_moved(&mut self, event: &mut PointerEvent) {
        self.manager.mouse_moved(self.mode, event, &mut self.host);
    }

    pub fn mouse_clicked(&mut self, event: &mut PointerEvent) {
        self.manager.mouse_clicked(self.mode, event, &mut self.host);
    }

    /// Press, release and click at one position.
    pub fn click(&mut self, mut event: PointerEvent) {
        self.mouse_pressed(&mut event);
        self.mouse_released(&mut event);
        self.mouse_clicked(&mut event);
    }

    pub fn cancel_roi_construction(&mut self) {
        self.manager.cancel_roi_construction(&mut self.host);
    }

    /// Runs a command from [`commands::COMMANDS`].
    ///
    /// # Errors
    ///
    /// See [`commands::dispatch`].
    pub fn run_command(&mut self, id: &str) -> Result<()> {
        commands::dispatch(id, &mut self.manager, &mut self.host)
    }

    /// Ids of the commands currently enabled.
    #[must_use]
    pub fn enabled_commands(&self) -> Vec<&'static str> {
        commands::COMMANDS
            .iter()
            .filter(|c| (c.is_enabled)(&self.manager))
            .map(|c| c.id)
            .collect()
    }

    pub fn draw(&mut self, width: usize, height: usize) -> Frame {
        self.host.plot.draw(width, height)
    }
}
