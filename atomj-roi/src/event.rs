//! Pointer events in data coordinates.

use atomj_core::{Modifiers, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// A pointer event already mapped to data space.
///
/// Handlers mark an event consumed so later listeners skip it; the cursor
/// flag is tracked separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub data: Point,
    pub button: MouseButton,
    pub click_count: u32,
    pub modifiers: Modifiers,
    consumed: bool,
    cursor_consumed: bool,
}

impl PointerEvent {
    #[must_use]
    pub fn new(data: Point, button: MouseButton) -> Self {
        Self {
            data,
            button,
            click_count: 1,
            modifiers: Modifiers::NONE,
            consumed: false,
            cursor_consumed: false,
        }
    }

    /// Single left click.
    #[must_use]
    pub fn left(x: f64, y: f64) -> Self {
        Self::new(Point::new(x, y), MouseButton::Left)
    }

    /// Single right click.
    #[must_use]
    pub fn right(x: f64, y: f64) -> Self {
        Self::new(Point::new(x, y), MouseButton::Right)
    }

    #[must_use]
    pub fn with_click_count(mut self, click_count: u32) -> Self {
        self.click_count = click_count;
        self
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn consume(&mut self) {
        self.consumed = true;
    }

    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    pub fn consume_cursor(&mut self) {
        self.cursor_consumed = true;
    }

    #[must_use]
    pub fn is_cursor_consumed(&self) -> bool {
        self.cursor_consumed
    }
}
