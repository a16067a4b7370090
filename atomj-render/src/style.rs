//! Renderer style and its preference store.
//!
//! A [`RendererStyle`] is read once when a renderer is created and written
//! back through the [`StyleStore`] every time one of its fields changes.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use atomj_core::Rgba;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};
use crate::gradient::ColorGradient;

/// Shape drawn for each grid item by the generic path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MarkerShape {
    #[default]
    Rectangle,
    Ellipse,
}

/// Numeric label formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormat {
    pub grouping_used: bool,
    pub grouping_separator: char,
    pub decimal_separator: char,
    pub max_fraction_digits: usize,
    pub min_fraction_digits: usize,
    pub trailing_zeroes: bool,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            grouping_used: false,
            grouping_separator: ',',
            decimal_separator: '.',
            max_fraction_digits: 3,
            min_fraction_digits: 0,
            trailing_zeroes: false,
        }
    }
}

impl NumberFormat {
    /// Formats `value` with this configuration.
    #[must_use]
    pub fn format(&self, value: f64) -> String {
        if !value.is_finite() {
            return value.to_string();
        }
        let max = self.max_fraction_digits.max(self.min_fraction_digits);
        let digits = format!("{:.*}", max, value.abs());
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), ""));

        let mut frac = frac_part.to_string();
        if !self.trailing_zeroes {
            while frac.len() > self.min_fraction_digits && frac.ends_with('0') {
                frac.pop();
            }
        }

        let mut out = String::with_capacity(digits.len() + int_part.len() / 3 + 1);
        let is_zero = int_part.chars().chain(frac.chars()).all(|c| c == '0');
        if value < 0.0 && !is_zero {
            out.push('-');
        }
        let len = int_part.len();
        for (i, c) in int_part.chars().enumerate() {
            if self.grouping_used && i > 0 && (len - i) % 3 == 0 {
                out.push(self.grouping_separator);
            }
            out.push(c);
        }
        if !frac.is_empty() {
            out.push(self.decimal_separator);
            out.push_str(&frac);
        }
        out
    }
}

/// Persisted visual configuration of a gradient renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererStyle {
    pub shape: MarkerShape,
    /// Fraction of the cell left empty on each side, in [0, 0.5).
    pub shape_margin: f64,
    /// Stretch items to fill their cell; otherwise `shape_size` pixels.
    pub stretch_shape: bool,
    pub shape_size: f64,
    pub outline_visible: bool,
    pub outline_color: Rgba,
    pub outline_width: f64,
    pub guides_visible: bool,
    pub guide_color: Rgba,
    pub guide_width: f64,
    pub label_visible: bool,
    pub label_font_size: f64,
    pub label_color: Rgba,
    pub number_format: NumberFormat,
    pub gradient: ColorGradient,
    pub underflow_color: Rgba,
    pub overflow_color: Rgba,
    pub mask_color: Rgba,
    pub use_outside_range_colors: bool,
}

impl Default for RendererStyle {
    fn default() -> Self {
        Self {
            shape: MarkerShape::Rectangle,
            shape_margin: 0.0,
            stretch_shape: true,
            shape_size: 6.0,
            outline_visible: false,
            outline_color: Rgba::BLACK,
            outline_width: 1.0,
            guides_visible: false,
            guide_color: Rgba::rgb(128, 128, 128),
            guide_width: 1.0,
            label_visible: false,
            label_font_size: 10.0,
            label_color: Rgba::BLACK,
            number_format: NumberFormat::default(),
            gradient: ColorGradient::default(),
            underflow_color: Rgba::rgb(0, 0, 255),
            overflow_color: Rgba::rgb(255, 0, 0),
            mask_color: Rgba::rgb(255, 255, 255),
            use_outside_range_colors: false,
        }
    }
}

impl RendererStyle {
    /// True when items are plain cell-filling rectangles with no decorations,
    /// the configuration the packed-raster path reproduces exactly.
    #[must_use]
    pub fn is_plain_grid(&self) -> bool {
        self.shape == MarkerShape::Rectangle
            && self.shape_margin == 0.0
            && self.stretch_shape
            && !self.outline_visible
            && !self.guides_visible
            && !self.label_visible
    }
}

/// Preference store keyed by style identity.
pub trait StyleStore: Debug + Send + Sync {
    /// Stored style for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read or parsed.
    fn load(&self, key: &str) -> Result<Option<RendererStyle>>;

    /// Writes `style` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, key: &str, style: &RendererStyle) -> Result<()>;
}

/// In-memory store, shared between renderers of the same session.
#[derive(Debug, Default)]
pub struct MemoryStyleStore {
    styles: Mutex<HashMap<String, RendererStyle>>,
}

impl MemoryStyleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StyleStore for MemoryStyleStore {
    fn load(&self, key: &str) -> Result<Option<RendererStyle>> {
        let styles = self
            .styles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(styles.get(key).cloned())
    }

    fn save(&self, key: &str, style: &RendererStyle) -> Result<()> {
        let mut styles = self
            .styles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        styles.insert(key.to_string(), style.clone());
        Ok(())
    }
}

/// One JSON file per style key inside a directory.
#[derive(Debug, Clone)]
pub struct JsonStyleStore {
    dir: PathBuf,
}

impl JsonStyleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.json"))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl StyleStore for JsonStyleStore {
    fn load(&self, key: &str) -> Result<Option<RendererStyle>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(RenderError::StoreIo { path, source }),
        }
    }

    fn save(&self, key: &str, style: &RendererStyle) -> Result<()> {
        let path = self.path_for(key);
        std::fs::create_dir_all(&self.dir).map_err(|source| RenderError::StoreIo {
            path: self.dir.clone(),
            source,
        })?;
        let text = serde_json::to_string_pretty(style)?;
        std::fs::write(&path, text).map_err(|source| RenderError::StoreIo { path, source })
    }
}

/// A style together with the store it persists to.
#[derive(Debug, Clone)]
pub struct Preferences {
    key: String,
    style: RendererStyle,
    store: Option<Arc<dyn StyleStore>>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self::detached(RendererStyle::default())
    }
}

impl Preferences {
    /// Style that is never persisted.
    #[must_use]
    pub fn detached(style: RendererStyle) -> Self {
        Self {
            key: String::new(),
            style,
            store: None,
        }
    }

    /// Reads the style stored under `key`, falling back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be read.
    pub fn load(key: impl Into<String>, store: Arc<dyn StyleStore>) -> Result<Self> {
        let key = key.into();
        let style = store.load(&key)?.unwrap_or_default();
        debug!("loaded renderer style '{key}'");
        Ok(Self {
            key,
            style,
            store: Some(store),
        })
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn style(&self) -> &RendererStyle {
        &self.style
    }

    /// Applies `edit` and writes the style back if it changed.
    ///
    /// Returns whether the style changed. Store failures are logged and do
    /// not undo the in-memory change.
    pub fn update(&mut self, edit: impl FnOnce(&mut RendererStyle)) -> bool {
        let before = self.style.clone();
        edit(&mut self.style);
        if self.style == before {
            return false;
        }
        if let Some(store) = &self.store {
            if let Err(err) = store.save(&self.key, &self.style) {
                warn!("failed to persist renderer style '{}': {err}", self.key);
            }
        }
        true
    }
}
