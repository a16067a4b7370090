//! Region-of-interest model.
//!
//! A [`Roi`] pairs a [`RoiShape`] with its identity (key, label), its visual
//! style and its interaction flags. Every shape kind can be turned into a
//! hole: a hole ROI covers its bounding area minus the shape.

use std::f64::consts::{PI, TAU};

use crate::color::{roi_palette_color, Rgba};
use crate::error::{Error, Result};
use crate::geometry::{
    convex_hull, point_in_polygon, polygon_centroid, polygon_self_intersects, Point, Rect,
};
use crate::util::usize_to_f64;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Key of a ROI, unique within one collection.
pub type RoiKey = usize;

/// Number of segments used to polygonize ellipses.
const ELLIPSE_SEGMENTS: usize = 64;

/// Rotation snap step used while shift is held.
const ROTATION_SNAP: f64 = PI / 12.0;

/// Keyboard modifiers held during a pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
        alt: false,
    };
    pub const CTRL: Modifiers = Modifiers {
        shift: false,
        ctrl: true,
        alt: false,
    };
}

/// Resize handle position on a rectangle or ellipse, in the shape's own frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Compass {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Compass {
    pub const ALL: [Compass; 8] = [
        Compass::SouthWest,
        Compass::South,
        Compass::SouthEast,
        Compass::East,
        Compass::NorthEast,
        Compass::North,
        Compass::NorthWest,
        Compass::West,
    ];

    /// Unit direction `(sx, sy)` of the handle; each component is -1, 0 or 1.
    #[must_use]
    pub fn signs(self) -> (i8, i8) {
        match self {
            Compass::North => (0, 1),
            Compass::South => (0, -1),
            Compass::East => (1, 0),
            Compass::West => (-1, 0),
            Compass::NorthEast => (1, 1),
            Compass::NorthWest => (-1, 1),
            Compass::SouthEast => (1, -1),
            Compass::SouthWest => (-1, -1),
        }
    }

    /// Inverse of [`Compass::signs`]; `None` for `(0, 0)`.
    #[must_use]
    pub fn from_signs(sx: i8, sy: i8) -> Option<Compass> {
        match (sx.signum(), sy.signum()) {
            (0, 1) => Some(Compass::North),
            (0, -1) => Some(Compass::South),
            (1, 0) => Some(Compass::East),
            (-1, 0) => Some(Compass::West),
            (1, 1) => Some(Compass::NorthEast),
            (-1, 1) => Some(Compass::NorthWest),
            (1, -1) => Some(Compass::SouthEast),
            (-1, -1) => Some(Compass::SouthWest),
            _ => None,
        }
    }

    /// True for handles that move a single side.
    #[must_use]
    pub fn is_side(self) -> bool {
        let (sx, sy) = self.signs();
        sx == 0 || sy == 0
    }
}

/// Control point of a ROI caught by the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Polygon / freehand / wand vertex.
    Vertex(usize),
    /// Rectangle or ellipse resize handle.
    Handle(Compass),
    /// Whole shape (translate or rotate).
    Body,
    /// The label; dragging moves it, double click renames.
    Label,
}

/// Flavor of a vertex path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PathKind {
    Polygon,
    FreeHand,
    Wand,
}

/// How a composite combines its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CompositeOp {
    /// Inside any part.
    Union,
    /// Inside the first part and outside all the others.
    Difference,
}

/// Shape tag, used for dispatch by callers that only need the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoiKind {
    Polygon,
    Rectangle,
    Ellipse,
    FreeHand,
    Wand,
    Composite,
}

/// Visual attributes of a ROI.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoiStyle {
    pub stroke: Rgba,
    pub stroke_width: f64,
    pub highlight_width: f64,
    pub fill_alpha: u8,
    pub label_visible: bool,
}

impl Default for RoiStyle {
    fn default() -> Self {
        Self::from_palette(0)
    }
}

impl RoiStyle {
    /// Style with the palette color for `index`.
    #[must_use]
    pub fn from_palette(index: usize) -> Self {
        Self {
            stroke: roi_palette_color(index),
            stroke_width: 1.0,
            highlight_width: 2.0,
            fill_alpha: 48,
            label_visible: true,
        }
    }

    /// Stroke width for the current highlight state.
    #[must_use]
    pub fn width(&self, highlighted: bool) -> f64 {
        if highlighted {
            self.highlight_width
        } else {
            self.stroke_width
        }
    }
}

/// ROI geometry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RoiShape {
    /// Closed vertex path.
    Path {
        kind: PathKind,
        vertices: Vec<Point>,
    },
    /// Possibly rotated rectangle.
    Rectangle {
        center: Point,
        half_width: f64,
        half_height: f64,
        angle: f64,
    },
    /// Possibly rotated ellipse inscribed in the equivalent rectangle.
    Ellipse {
        center: Point,
        half_width: f64,
        half_height: f64,
        angle: f64,
    },
    /// Combination of other ROIs.
    Composite { op: CompositeOp, parts: Vec<Roi> },
}

impl RoiShape {
    #[must_use]
    pub fn kind(&self) -> RoiKind {
        match self {
            RoiShape::Path { kind, .. } => match kind {
                PathKind::Polygon => RoiKind::Polygon,
                PathKind::FreeHand => RoiKind::FreeHand,
                PathKind::Wand => RoiKind::Wand,
            },
            RoiShape::Rectangle { .. } => RoiKind::Rectangle,
            RoiShape::Ellipse { .. } => RoiKind::Ellipse,
            RoiShape::Composite { .. } => RoiKind::Composite,
        }
    }

    /// Containment of the shape itself, ignoring any hole inversion.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        if p.is_nan() {
            return false;
        }
        match self {
            RoiShape::Path { vertices, .. } => point_in_polygon(p, vertices),
            RoiShape::Rectangle {
                center,
                half_width,
                half_height,
                angle,
            } => {
                let local = p.rotated_about(*center, -angle) - *center;
                local.x.abs() <= *half_width && local.y.abs() <= *half_height
            }
            RoiShape::Ellipse {
                center,
                half_width,
                half_height,
                angle,
            } => {
                if *half_width <= 0.0 || *half_height <= 0.0 {
                    return false;
                }
                let local = p.rotated_about(*center, -angle) - *center;
                let u = local.x / half_width;
                let v = local.y / half_height;
                u * u + v * v <= 1.0
            }
            RoiShape::Composite { op, parts } => match op {
                CompositeOp::Union => parts.iter().any(|part| part.contains(p)),
                CompositeOp::Difference => match parts.split_first() {
                    Some((first, rest)) => {
                        first.contains(p) && !rest.iter().any(|part| part.contains(p))
                    }
                    None => false,
                },
            },
        }
    }

    /// Closed outlines of the shape, one per disjoint ring.
    #[must_use]
    pub fn outlines(&self) -> Vec<Vec<Point>> {
        match self {
            RoiShape::Path { vertices, .. } => vec![vertices.clone()],
            RoiShape::Rectangle {
                center,
                half_width,
                half_height,
                angle,
            } => {
                let ring = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
                    .iter()
                    .map(|(sx, sy)| {
                        (*center + Point::new(sx * half_width, sy * half_height))
                            .rotated_about(*center, *angle)
                    })
                    .collect();
                vec![ring]
            }
            RoiShape::Ellipse {
                center,
                half_width,
                half_height,
                angle,
            } => {
                let ring = (0..ELLIPSE_SEGMENTS)
                    .map(|i| {
                        let t = TAU * usize_to_f64(i) / usize_to_f64(ELLIPSE_SEGMENTS);
                        (*center + Point::new(half_width * t.cos(), half_height * t.sin()))
                            .rotated_about(*center, *angle)
                    })
                    .collect();
                vec![ring]
            }
            RoiShape::Composite { parts, .. } => {
                parts.iter().flat_map(|part| part.shape.outlines()).collect()
            }
        }
    }

    /// Bounding box of the outlines.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        let outlines = self.outlines();
        Rect::bounding(outlines.iter().flatten())
    }

    /// Natural rotation center: area centroid for paths, center otherwise.
    #[must_use]
    pub fn center(&self) -> Point {
        match self {
            RoiShape::Path { vertices, .. } => polygon_centroid(vertices),
            RoiShape::Rectangle { center, .. } | RoiShape::Ellipse { center, .. } => *center,
            RoiShape::Composite { .. } => self.bounds().unwrap_or_default().center(),
        }
    }

    /// Resize handle positions for rectangles and ellipses.
    #[must_use]
    pub fn handles(&self) -> Vec<(Compass, Point)> {
        match self {
            RoiShape::Rectangle {
                center,
                half_width,
                half_height,
                angle,
            }
            | RoiShape::Ellipse {
                center,
                half_width,
                half_height,
                angle,
            } => Compass::ALL
                .iter()
                .map(|c| {
                    let (sx, sy) = c.signs();
                    let local =
                        Point::new(f64::from(sx) * half_width, f64::from(sy) * half_height);
                    (*c, (*center + local).rotated_about(*center, *angle))
                })
                .collect(),
            RoiShape::Path { .. } | RoiShape::Composite { .. } => Vec::new(),
        }
    }

    fn translate(&mut self, delta: Point) {
        match self {
            RoiShape::Path { vertices, .. } => {
                for v in vertices.iter_mut() {
                    *v = *v + delta;
                }
            }
            RoiShape::Rectangle { center, .. } | RoiShape::Ellipse { center, .. } => {
                *center = *center + delta;
            }
            RoiShape::Composite { parts, .. } => {
                for part in parts.iter_mut() {
                    part.shape.translate(delta);
                }
            }
        }
    }

    fn rotate_about(&mut self, pivot: Point, delta_angle: f64) {
        match self {
            RoiShape::Path { vertices, .. } => {
                for v in vertices.iter_mut() {
                    *v = v.rotated_about(pivot, delta_angle);
                }
            }
            RoiShape::Rectangle { center, angle, .. } | RoiShape::Ellipse { center, angle, .. } => {
                *center = center.rotated_about(pivot, delta_angle);
                *angle = (*angle + delta_angle).rem_euclid(TAU);
            }
            RoiShape::Composite { parts, .. } => {
                for part in parts.iter_mut() {
                    part.shape.rotate_about(pivot, delta_angle);
                }
            }
        }
    }

    /// Moves a rectangle / ellipse handle by `delta` (data space).
    ///
    /// The opposite side stays fixed. Crossing it flips the handle, so the
    /// returned compass is the one that is still under the pointer.
    fn drag_handle(&mut self, handle: Compass, delta: Point, keep_aspect: bool) -> Compass {
        let (RoiShape::Rectangle {
            center,
            half_width,
            half_height,
            angle,
        }
        | RoiShape::Ellipse {
            center,
            half_width,
            half_height,
            angle,
        }) = self
        else {
            return handle;
        };

        let local_delta = delta.rotated_about(Point::default(), -*angle);
        let (mut sx, mut sy) = handle.signs();
        let mut left = -*half_width;
        let mut right = *half_width;
        let mut bottom = -*half_height;
        let mut top = *half_height;

        match sx {
            1 => right += local_delta.x,
            -1 => left += local_delta.x,
            _ => {}
        }
        match sy {
            1 => top += local_delta.y,
            -1 => bottom += local_delta.y,
            _ => {}
        }
        if right < left {
            std::mem::swap(&mut left, &mut right);
            sx = -sx;
        }
        if top < bottom {
            std::mem::swap(&mut top, &mut bottom);
            sy = -sy;
        }
        if keep_aspect && sx != 0 && sy != 0 {
            let side = (right - left).max(top - bottom);
            if sx == 1 {
                right = left + side;
            } else {
                left = right - side;
            }
            if sy == 1 {
                top = bottom + side;
            } else {
                bottom = top - side;
            }
        }

        let local_center = Point::new((left + right) * 0.5, (bottom + top) * 0.5);
        *center = *center + local_center.rotated_about(Point::default(), *angle);
        *half_width = (right - left) * 0.5;
        *half_height = (top - bottom) * 0.5;
        Compass::from_signs(sx, sy).unwrap_or(handle)
    }
}

/// A region of interest drawn over a map.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Roi {
    key: RoiKey,
    label: String,
    style: RoiStyle,
    shape: RoiShape,
    hole: Option<Rect>,
    finished: bool,
    highlighted: bool,
    label_offset: Point,
    #[cfg_attr(feature = "serde", serde(skip))]
    preview: Option<Point>,
}

impl Roi {
    /// Wraps a shape. The ROI is finished and labelled with its key.
    #[must_use]
    pub fn new(key: RoiKey, shape: RoiShape) -> Self {
        Self {
            key,
            label: key.to_string(),
            style: RoiStyle::from_palette(key),
            shape,
            hole: None,
            finished: true,
            highlighted: false,
            label_offset: Point::default(),
            preview: None,
        }
    }

    /// Unfinished polygon seeded with a single vertex.
    #[must_use]
    pub fn polygon_seed(key: RoiKey, seed: Point) -> Self {
        Self::path_seed(key, PathKind::Polygon, seed)
    }

    /// Unfinished freehand path seeded with a single point.
    #[must_use]
    pub fn freehand_seed(key: RoiKey, seed: Point) -> Self {
        Self::path_seed(key, PathKind::FreeHand, seed)
    }

    fn path_seed(key: RoiKey, kind: PathKind, seed: Point) -> Self {
        let mut roi = Self::new(
            key,
            RoiShape::Path {
                kind,
                vertices: vec![seed],
            },
        );
        roi.finished = false;
        roi
    }

    /// Finished closed path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateShape`] for fewer than three vertices.
    pub fn path(key: RoiKey, kind: PathKind, vertices: Vec<Point>) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(Error::DegenerateShape(format!(
                "path needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        Ok(Self::new(key, RoiShape::Path { kind, vertices }))
    }

    /// Axis-aligned rectangle.
    #[must_use]
    pub fn rectangle(key: RoiKey, rect: Rect) -> Self {
        Self::new(
            key,
            RoiShape::Rectangle {
                center: rect.center(),
                half_width: rect.width() * 0.5,
                half_height: rect.height() * 0.5,
                angle: 0.0,
            },
        )
    }

    /// Axis-aligned ellipse inscribed in `rect`.
    #[must_use]
    pub fn ellipse(key: RoiKey, rect: Rect) -> Self {
        Self::new(
            key,
            RoiShape::Ellipse {
                center: rect.center(),
                half_width: rect.width() * 0.5,
                half_height: rect.height() * 0.5,
                angle: 0.0,
            },
        )
    }

    /// Union of `parts`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateShape`] when `parts` is empty.
    pub fn union(key: RoiKey, label: impl Into<String>, parts: Vec<Roi>) -> Result<Self> {
        if parts.is_empty() {
            return Err(Error::DegenerateShape("union of nothing".to_string()));
        }
        let style = parts[0].style;
        Ok(Self::new(
            key,
            RoiShape::Composite {
                op: CompositeOp::Union,
                parts,
            },
        )
        .with_label(label)
        .with_style(style))
    }

    /// `minuend` minus every ROI in `subtrahends`.
    #[must_use]
    pub fn difference(
        key: RoiKey,
        label: impl Into<String>,
        minuend: Roi,
        subtrahends: Vec<Roi>,
    ) -> Self {
        let style = minuend.style;
        let mut parts = Vec::with_capacity(subtrahends.len() + 1);
        parts.push(minuend);
        parts.extend(subtrahends);
        Self::new(
            key,
            RoiShape::Composite {
                op: CompositeOp::Difference,
                parts,
            },
        )
        .with_label(label)
        .with_style(style)
    }

    /// Complement of `roi` within `area`. Complementing a hole restores the plain shape.
    #[must_use]
    pub fn complement(key: RoiKey, label: impl Into<String>, roi: &Roi, area: Rect) -> Self {
        let mut complement = roi.clone().with_key(key).with_label(label);
        complement.hole = match roi.hole {
            Some(_) => None,
            None => Some(area),
        };
        complement
    }

    /// Turns the ROI into its hole variant within `area`.
    #[must_use]
    pub fn with_hole(mut self, area: Rect) -> Self {
        self.hole = Some(area);
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: RoiStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: RoiKey) -> Self {
        self.key = key;
        self
    }

    #[must_use]
    pub fn key(&self) -> RoiKey {
        self.key
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    #[must_use]
    pub fn style(&self) -> &RoiStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: RoiStyle) {
        self.style = style;
    }

    #[must_use]
    pub fn shape(&self) -> &RoiShape {
        &self.shape
    }

    #[must_use]
    pub fn kind(&self) -> RoiKind {
        self.shape.kind()
    }

    /// Bounding area if this is a hole ROI.
    #[must_use]
    pub fn hole_area(&self) -> Option<Rect> {
        self.hole
    }

    #[must_use]
    pub fn is_hole(&self) -> bool {
        self.hole.is_some()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn set_finished(&mut self, finished: bool) {
        self.finished = finished;
        if finished {
            self.preview = None;
        }
    }

    #[must_use]
    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub fn set_highlighted(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
    }

    /// Rubber-band point of an unfinished polygon.
    #[must_use]
    pub fn preview(&self) -> Option<Point> {
        self.preview
    }

    /// Vertex count of path shapes; 0 for the others.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        match &self.shape {
            RoiShape::Path { vertices, .. } => vertices.len(),
            _ => 0,
        }
    }

    /// Containment honoring the hole inversion.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        match self.hole {
            Some(area) => area.contains(p) && !self.shape.contains(p),
            None => self.shape.contains(p),
        }
    }

    #[must_use]
    pub fn outlines(&self) -> Vec<Vec<Point>> {
        self.shape.outlines()
    }

    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        self.shape.bounds()
    }

    #[must_use]
    pub fn rotation_center(&self) -> Point {
        self.shape.center()
    }

    /// Center used when rotating together with sibling parts: the bounding box center.
    #[must_use]
    pub fn composite_rotation_center(&self) -> Point {
        self.bounds().map_or_else(|| self.rotation_center(), |b| b.center())
    }

    #[must_use]
    pub fn label_position(&self) -> Point {
        self.shape.center() + self.label_offset
    }

    /// True when any outline edge touches `hot`.
    #[must_use]
    pub fn is_boundary_clicked(&self, hot: &Rect) -> bool {
        self.outlines().iter().any(|ring| {
            let n = ring.len();
            match n {
                0 => false,
                1 => hot.contains(ring[0]),
                _ => (0..n).any(|i| hot.intersects_segment(ring[i], ring[(i + 1) % n])),
            }
        })
    }

    /// True when the label is visible and its anchor point lies inside `hot`.
    #[must_use]
    pub fn is_label_clicked(&self, hot: &Rect) -> bool {
        self.style.label_visible && hot.contains(self.label_position())
    }

    /// Control handle under the pointer, if any.
    ///
    /// Handles and vertices win over the label, which wins over the body.
    #[must_use]
    pub fn caught_anchor(&self, data: Point, hot: &Rect) -> Option<Anchor> {
        if !self.finished || data.is_nan() {
            return None;
        }
        if let RoiShape::Path { vertices, .. } = &self.shape {
            if let Some(index) = vertices.iter().position(|v| hot.contains(*v)) {
                return Some(Anchor::Vertex(index));
            }
        }
        if let Some((compass, _)) = self
            .shape
            .handles()
            .into_iter()
            .find(|(_, p)| hot.contains(*p))
        {
            return Some(Anchor::Handle(compass));
        }
        if self.is_label_clicked(hot) {
            return Some(Anchor::Label);
        }
        if self.is_boundary_clicked(hot) || self.contains(data) {
            return Some(Anchor::Body);
        }
        None
    }

    /// Drag-to-reshape step from `last` to `current`.
    ///
    /// `pressed` is where the drag started; with shift held a body drag is
    /// constrained to the dominant axis of the total displacement.
    pub fn set_position(
        &mut self,
        anchor: Anchor,
        modifiers: Modifiers,
        pressed: Point,
        last: Point,
        current: Point,
    ) -> Anchor {
        if last.is_nan() || current.is_nan() {
            return anchor;
        }
        let mut delta = current - last;
        match anchor {
            Anchor::Body => {
                if modifiers.shift {
                    let total = current - pressed;
                    if total.x.abs() >= total.y.abs() {
                        delta.y = 0.0;
                    } else {
                        delta.x = 0.0;
                    }
                }
                self.shape.translate(delta);
                Anchor::Body
            }
            Anchor::Label => {
                self.label_offset = self.label_offset + delta;
                Anchor::Label
            }
            Anchor::Vertex(index) => {
                if let RoiShape::Path { vertices, .. } = &mut self.shape {
                    if let Some(v) = vertices.get_mut(index) {
                        *v = *v + delta;
                    }
                }
                anchor
            }
            Anchor::Handle(compass) => match self.shape {
                RoiShape::Rectangle { .. } | RoiShape::Ellipse { .. } => {
                    let keep_aspect = modifiers.shift && !compass.is_side();
                    Anchor::Handle(self.shape.drag_handle(compass, delta, keep_aspect))
                }
                _ => {
                    self.shape.translate(delta);
                    Anchor::Body
                }
            },
        }
    }

    /// Rotation step from `last` to `current` around `center`.
    ///
    /// With ctrl held the pivot is `composite_center`; with shift held the
    /// accumulated angle since `pressed` snaps to 15 degree steps.
    #[allow(clippy::too_many_arguments)]
    pub fn rotate(
        &mut self,
        anchor: Anchor,
        modifiers: Modifiers,
        center: Point,
        composite_center: Point,
        pressed: Point,
        last: Point,
        current: Point,
    ) -> Anchor {
        let pivot = if modifiers.ctrl {
            composite_center
        } else {
            center
        };
        let angle_of = |p: Point| {
            let d = p - pivot;
            if d.x == 0.0 && d.y == 0.0 {
                None
            } else {
                Some(d.y.atan2(d.x))
            }
        };
        let (Some(a_last), Some(a_current)) = (angle_of(last), angle_of(current)) else {
            return anchor;
        };
        let delta = if modifiers.shift {
            let Some(a_pressed) = angle_of(pressed) else {
                return anchor;
            };
            let snap = |a: f64| (wrap_angle(a - a_pressed) / ROTATION_SNAP).round() * ROTATION_SNAP;
            snap(a_current) - snap(a_last)
        } else {
            wrap_angle(a_current - a_last)
        };
        if delta != 0.0 {
            self.shape.rotate_about(pivot, delta);
        }
        anchor
    }

    /// Forwards a press while the ROI is under construction.
    pub fn mouse_pressed_during_construction(&mut self, p: Point, _modifiers: Modifiers) {
        if self.finished || p.is_nan() {
            return;
        }
        if let RoiShape::Path { kind, vertices } = &mut self.shape {
            if matches!(kind, PathKind::Polygon | PathKind::FreeHand)
                && vertices.last() != Some(&p)
            {
                vertices.push(p);
            }
        }
        self.preview = None;
    }

    /// Forwards pointer movement while the ROI is under construction.
    pub fn mouse_moved_during_construction(&mut self, p: Point, _modifiers: Modifiers) {
        if self.finished || p.is_nan() {
            return;
        }
        if let RoiShape::Path { kind, vertices } = &mut self.shape {
            match kind {
                PathKind::Polygon => self.preview = Some(p),
                PathKind::FreeHand => {
                    if vertices.last() != Some(&p) {
                        vertices.push(p);
                    }
                }
                PathKind::Wand => {}
            }
        }
    }

    /// Right click during construction; `true` when the shape is complete.
    pub fn respond_to_right_click_during_construction(
        &mut self,
        _p: Point,
        _modifiers: Modifiers,
    ) -> bool {
        self.preview = None;
        match &self.shape {
            RoiShape::Path { kind, vertices } => {
                vertices.len() >= 3
                    && (*kind == PathKind::FreeHand || !polygon_self_intersects(vertices))
            }
            _ => true,
        }
    }

    /// Click on the boundary of a finished ROI. Returns `true` when the shape changed.
    ///
    /// With shift held on a path, a click on a vertex removes it (at least
    /// three are kept) and a click on an edge inserts a vertex there.
    pub fn reshape_in_response_to_click(
        &mut self,
        modifiers: Modifiers,
        data: Point,
        hot: &Rect,
    ) -> bool {
        if !self.finished || !modifiers.shift || data.is_nan() {
            return false;
        }
        let RoiShape::Path { vertices, .. } = &mut self.shape else {
            return false;
        };
        if let Some(index) = vertices.iter().position(|v| hot.contains(*v)) {
            if vertices.len() <= 3 {
                return false;
            }
            vertices.remove(index);
            return true;
        }
        let n = vertices.len();
        if let Some(edge) =
            (0..n).find(|&i| hot.intersects_segment(vertices[i], vertices[(i + 1) % n]))
        {
            vertices.insert(edge + 1, data);
            return true;
        }
        false
    }

    /// Value copy.
    #[must_use]
    pub fn copy(&self) -> Roi {
        self.clone()
    }

    /// Value copy with another style.
    #[must_use]
    pub fn copy_with_style(&self, style: RoiStyle) -> Roi {
        self.clone().with_style(style)
    }

    /// Convex hull of the covered region as a finished polygon.
    #[must_use]
    pub fn convex_hull(&self, key: RoiKey, label: impl Into<String>) -> Roi {
        let mut points: Vec<Point> = self.outlines().into_iter().flatten().collect();
        if let Some(area) = self.hole {
            points.extend(area.corners());
        }
        let hull = convex_hull(&points);
        Roi::new(
            key,
            RoiShape::Path {
                kind: PathKind::Polygon,
                vertices: hull,
            },
        )
        .with_label(label)
        .with_style(self.style)
    }
}

fn wrap_angle(a: f64) -> f64 {
    let wrapped = (a + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_rect() -> Roi {
        Roi::rectangle(1, Rect::from_corners(Point::new(0.0, 0.0), Point::new(2.0, 2.0)))
    }

    fn triangle() -> Roi {
        Roi::path(
            2,
            PathKind::Polygon,
            vec![
                Point::new(0.0, 0.0),
                Point::new(4.0, 0.0),
                Point::new(0.0, 4.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_hole_inverts_containment() {
        let area = Rect::from_corners(Point::new(-5.0, -5.0), Point::new(5.0, 5.0));
        let hole = unit_rect().with_hole(area);
        assert!(!hole.contains(Point::new(1.0, 1.0)));
        assert!(hole.contains(Point::new(4.0, 4.0)));
        assert!(!hole.contains(Point::new(6.0, 6.0)));
    }

    #[test]
    fn test_ellipse_contains() {
        let e = Roi::ellipse(3, Rect::from_corners(Point::new(0.0, 0.0), Point::new(4.0, 2.0)));
        assert!(e.contains(Point::new(2.0, 1.0)));
        assert!(e.contains(Point::new(3.9, 1.0)));
        assert!(!e.contains(Point::new(3.9, 1.9)));
    }

    #[test]
    fn test_composites() {
        let a = unit_rect();
        let b = Roi::rectangle(5, Rect::from_corners(Point::new(1.0, 1.0), Point::new(3.0, 3.0)));
        let union = Roi::union(10, "u", vec![a.clone(), b.clone()]).unwrap();
        assert!(union.contains(Point::new(0.5, 0.5)));
        assert!(union.contains(Point::new(2.5, 2.5)));
        let diff = Roi::difference(11, "d", a, vec![b]);
        assert!(diff.contains(Point::new(0.5, 0.5)));
        assert!(!diff.contains(Point::new(1.5, 1.5)));
        assert_eq!(diff.kind(), RoiKind::Composite);
        assert!(Roi::union(12, "empty", Vec::new()).is_err());
    }

    #[test]
    fn test_complement_toggles_hole() {
        let area = Rect::from_corners(Point::new(-5.0, -5.0), Point::new(5.0, 5.0));
        let c = Roi::complement(7, "c", &unit_rect(), area);
        assert!(c.is_hole());
        assert_eq!(c.key(), 7);
        assert!(!Roi::complement(8, "cc", &c, area).is_hole());
    }

    #[test]
    fn test_caught_anchor_priorities() {
        let roi = unit_rect();
        let hot = Rect::centered_square(Point::new(2.0, 2.0), 0.05);
        assert_eq!(
            roi.caught_anchor(Point::new(2.0, 2.0), &hot),
            Some(Anchor::Handle(Compass::NorthEast))
        );
        let hot = Rect::centered_square(Point::new(1.0, 1.0), 0.05);
        assert_eq!(roi.caught_anchor(Point::new(1.0, 1.0), &hot), Some(Anchor::Label));
        let hot = Rect::centered_square(Point::new(1.5, 0.5), 0.05);
        assert_eq!(roi.caught_anchor(Point::new(1.5, 0.5), &hot), Some(Anchor::Body));
        let hot = Rect::centered_square(Point::new(9.0, 9.0), 0.05);
        assert_eq!(roi.caught_anchor(Point::new(9.0, 9.0), &hot), None);
    }

    #[test]
    fn test_hole_body_is_the_kept_area() {
        let area = Rect::from_corners(Point::new(-5.0, -5.0), Point::new(5.0, 5.0));
        let hole = unit_rect().with_hole(area);
        let at = |p: Point| hole.caught_anchor(p, &Rect::centered_square(p, 0.05));
        assert_eq!(at(Point::new(1.5, 0.5)), None);
        assert_eq!(at(Point::new(4.0, 4.0)), Some(Anchor::Body));
        assert_eq!(at(Point::new(7.0, 7.0)), None);
        assert_eq!(at(Point::new(2.0, 1.3)), Some(Anchor::Body));
    }

    #[test]
    fn test_body_drag_composes_deltas() {
        let mut roi = unit_rect();
        let pressed = Point::new(1.0, 1.0);
        let mid = Point::new(1.5, 1.0);
        let end = Point::new(2.0, 1.5);
        let anchor = roi.set_position(Anchor::Body, Modifiers::NONE, pressed, pressed, mid);
        let anchor = roi.set_position(anchor, Modifiers::NONE, pressed, mid, end);
        assert_eq!(anchor, Anchor::Body);
        let c = roi.rotation_center();
        assert_relative_eq!(c.x, 2.0);
        assert_relative_eq!(c.y, 1.5);
    }

    #[test]
    fn test_handle_flips_when_crossing() {
        let mut roi = unit_rect();
        let start = Point::new(2.0, 1.0);
        let end = Point::new(-1.0, 1.0);
        let anchor = roi.set_position(
            Anchor::Handle(Compass::East),
            Modifiers::NONE,
            start,
            start,
            end,
        );
        assert_eq!(anchor, Anchor::Handle(Compass::West));
        let bounds = roi.bounds().unwrap();
        assert_relative_eq!(bounds.min_x, -1.0);
        assert_relative_eq!(bounds.max_x, 0.0);
    }

    #[test]
    fn test_shift_corner_drag_keeps_square() {
        let mut roi = unit_rect();
        let start = Point::new(2.0, 2.0);
        let end = Point::new(5.0, 3.0);
        roi.set_position(
            Anchor::Handle(Compass::NorthEast),
            Modifiers::SHIFT,
            start,
            start,
            end,
        );
        let bounds = roi.bounds().unwrap();
        assert_relative_eq!(bounds.width(), 5.0, epsilon = 1e-9);
        assert_relative_eq!(bounds.height(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let mut roi = unit_rect();
        let center = roi.rotation_center();
        let last = Point::new(3.0, 1.0);
        let current = Point::new(1.0, 3.0);
        roi.rotate(Anchor::Body, Modifiers::NONE, center, center, last, last, current);
        let RoiShape::Rectangle { angle, .. } = roi.shape() else {
            panic!("rectangle expected");
        };
        assert_relative_eq!(*angle, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert!(roi.contains(Point::new(1.0, 1.0)));
    }

    #[test]
    fn test_polygon_construction() {
        let mut roi = Roi::polygon_seed(4, Point::new(0.0, 0.0));
        assert!(!roi.is_finished());
        roi.mouse_pressed_during_construction(Point::new(1.0, 0.0), Modifiers::NONE);
        roi.mouse_moved_during_construction(Point::new(1.0, 1.0), Modifiers::NONE);
        assert_eq!(roi.preview(), Some(Point::new(1.0, 1.0)));
        assert!(!roi.respond_to_right_click_during_construction(
            Point::new(1.0, 1.0),
            Modifiers::NONE
        ));
        roi.mouse_pressed_during_construction(Point::new(1.0, 1.0), Modifiers::NONE);
        assert!(roi.respond_to_right_click_during_construction(
            Point::new(1.0, 1.0),
            Modifiers::NONE
        ));
        assert_eq!(roi.vertex_count(), 3);
    }

    #[test]
    fn test_reshape_inserts_and_removes_vertices() {
        let mut roi = triangle();
        let on_edge = Point::new(2.0, 0.0);
        let hot = Rect::centered_square(on_edge, 0.05);
        assert!(!roi.reshape_in_response_to_click(Modifiers::NONE, on_edge, &hot));
        assert!(roi.reshape_in_response_to_click(Modifiers::SHIFT, on_edge, &hot));
        assert_eq!(roi.vertex_count(), 4);
        assert!(roi.reshape_in_response_to_click(Modifiers::SHIFT, on_edge, &hot));
        assert_eq!(roi.vertex_count(), 3);
        // the last three vertices are kept
        let hot = Rect::centered_square(Point::new(0.0, 0.0), 0.05);
        assert!(!roi.reshape_in_response_to_click(Modifiers::SHIFT, Point::new(0.0, 0.0), &hot));
    }

    #[test]
    fn test_convex_hull_of_ellipse_is_polygon() {
        let e = Roi::ellipse(3, Rect::from_corners(Point::new(0.0, 0.0), Point::new(4.0, 2.0)));
        let hull = e.convex_hull(9, "hull");
        assert_eq!(hull.kind(), RoiKind::Polygon);
        assert_eq!(hull.key(), 9);
        assert_eq!(hull.label(), "hull");
        assert!(hull.contains(Point::new(2.0, 1.0)));
    }

    #[test]
    fn test_wrap_angle() {
        assert_relative_eq!(wrap_angle(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-3.0 * PI / 2.0), PI / 2.0, epsilon = 1e-12);
    }
}
