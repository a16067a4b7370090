//! Capabilities a hosting view exposes to the ROI manager.

use atomj_core::{Grid2D, Rect, Roi, RoiKey, WandContourTracer};

use crate::cursor::Cursor;

/// Host of a [`crate::RoiManager`].
pub trait RoiSupervisor {
    /// Adds `roi`, replacing any ROI with the same key in place.
    fn add_or_replace_roi(&mut self, roi: Roi);

    fn remove_roi(&mut self, key: RoiKey);

    fn request_cursor_change(&mut self, cursor: Cursor);

    /// Requests `horizontal` on a horizontally oriented plot and `vertical` otherwise.
    fn request_cursor_change_oriented(&mut self, horizontal: Cursor, vertical: Cursor);

    /// Notification that a ROI was renamed.
    fn change_roi_label(&mut self, key: RoiKey, old_label: &str, new_label: &str);

    /// Asks the user for a new label; `None` keeps the current one.
    fn edit_roi_label(&mut self, roi: &Roi) -> Option<String>;

    /// Identifier of the view, used in log output.
    fn publication_site(&self) -> &str;

    fn wand_tracer(&self) -> &WandContourTracer;

    /// Scalar grid the wand traces on.
    fn grid(&self) -> Option<&Grid2D>;

    /// Visible data area; bounds hole ROIs and scales the hit tolerance.
    fn visible_area(&self) -> Rect;

    /// Shows the provisional outline of the ROI being built.
    fn show_provisional_roi(&mut self, roi: Option<&Roi>);
}
