//! Interaction mode supplied by the hosting view.

/// Global pointer mode of a channel view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    Normal,
    PolygonRoi,
    RectangleRoi,
    EllipseRoi,
    FreeHandRoi,
    WandRoi,
    RotateRoi,
}

impl InteractionMode {
    /// True for every mode the ROI manager handles.
    #[must_use]
    pub fn is_roi_mode(self) -> bool {
        self != InteractionMode::Normal
    }

    /// True for modes that build a ROI across several events.
    #[must_use]
    pub fn is_multi_step(self) -> bool {
        matches!(self, InteractionMode::PolygonRoi | InteractionMode::FreeHandRoi)
    }

    /// True for modes in which a click on empty space creates a ROI.
    #[must_use]
    pub fn creates_roi(self) -> bool {
        !matches!(self, InteractionMode::Normal | InteractionMode::RotateRoi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_classes() {
        assert!(!InteractionMode::Normal.is_roi_mode());
        assert!(InteractionMode::RotateRoi.is_roi_mode());
        assert!(!InteractionMode::RotateRoi.creates_roi());
        assert!(InteractionMode::FreeHandRoi.is_multi_step());
        assert!(!InteractionMode::WandRoi.is_multi_step());
    }
}
