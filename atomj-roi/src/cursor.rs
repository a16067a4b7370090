//! Pointer cursors requested from the host.

use atomj_core::{Anchor, Compass};

use crate::mode::InteractionMode;

/// Cursor shape. Resize directions are expressed in data space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Crosshair,
    Move,
    Hand,
    Text,
    Rotate,
    Resize(Compass),
}

impl Cursor {
    /// Cursor shown over `anchor` in `mode`.
    #[must_use]
    pub fn for_anchor(anchor: Anchor, mode: InteractionMode) -> Cursor {
        if mode == InteractionMode::RotateRoi {
            return Cursor::Rotate;
        }
        match anchor {
            Anchor::Vertex(_) => Cursor::Hand,
            Anchor::Handle(compass) => Cursor::Resize(compass),
            Anchor::Body => Cursor::Move,
            Anchor::Label => Cursor::Text,
        }
    }

    /// Cursor shown over empty space in `mode`.
    #[must_use]
    pub fn for_mode(mode: InteractionMode) -> Cursor {
        if mode.creates_roi() {
            Cursor::Crosshair
        } else {
            Cursor::Default
        }
    }

    /// Same cursor on a plot whose x axis runs vertically.
    #[must_use]
    pub fn transposed(self) -> Cursor {
        match self {
            Cursor::Resize(compass) => {
                let (sx, sy) = compass.signs();
                Compass::from_signs(sy, sx).map_or(self, Cursor::Resize)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transposed_resize() {
        assert_eq!(
            Cursor::Resize(Compass::North).transposed(),
            Cursor::Resize(Compass::East)
        );
        assert_eq!(
            Cursor::Resize(Compass::NorthWest).transposed(),
            Cursor::Resize(Compass::SouthEast)
        );
        assert_eq!(Cursor::Move.transposed(), Cursor::Move);
    }

    #[test]
    fn test_anchor_cursors() {
        assert_eq!(
            Cursor::for_anchor(Anchor::Body, InteractionMode::RotateRoi),
            Cursor::Rotate
        );
        assert_eq!(
            Cursor::for_anchor(Anchor::Label, InteractionMode::PolygonRoi),
            Cursor::Text
        );
        assert_eq!(Cursor::for_mode(InteractionMode::Normal), Cursor::Default);
    }
}
