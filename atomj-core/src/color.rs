//! RGBA color value shared by ROI styles and the gradient renderer.

use crate::util::f64_to_u8;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Non-premultiplied 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);

    /// Creates a color from its four channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Same color with a different alpha.
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Packs into a 32-bit `0xAARRGGBB` word.
    #[must_use]
    pub const fn to_argb(self) -> u32 {
        ((self.a as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Unpacks a `0xAARRGGBB` word.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    /// Linear interpolation, `t` clamped to [0, 1].
    #[must_use]
    pub fn lerp(self, other: Rgba, t: f64) -> Rgba {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let mix = |a: u8, b: u8| f64_to_u8(f64::from(a) + (f64::from(b) - f64::from(a)) * t);
        Rgba {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }

    /// Source-over composition of `self` on top of `below`.
    #[must_use]
    pub fn over(self, below: Rgba) -> Rgba {
        match self.a {
            255 => self,
            0 => below,
            alpha => {
                let src_a = f64::from(alpha) / 255.0;
                let dst_a = f64::from(below.a) / 255.0;
                let out_a = src_a + dst_a * (1.0 - src_a);
                let mix = |s: u8, d: u8| {
                    let s = f64::from(s);
                    let d = f64::from(d);
                    f64_to_u8((s * src_a + d * dst_a * (1.0 - src_a)) / out_a)
                };
                Rgba {
                    r: mix(self.r, below.r),
                    g: mix(self.g, below.g),
                    b: mix(self.b, below.b),
                    a: f64_to_u8(out_a * 255.0),
                }
            }
        }
    }
}

/// Palette for automatically assigned ROI colors.
#[must_use]
pub fn roi_palette_color(index: usize) -> Rgba {
    const PALETTE: [Rgba; 10] = [
        Rgba::rgb(0x4a, 0x9e, 0xff),
        Rgba::rgb(0xef, 0x44, 0x44),
        Rgba::rgb(0x10, 0xb9, 0x81),
        Rgba::rgb(0xf5, 0x9e, 0x0b),
        Rgba::rgb(0x8b, 0x5c, 0xff),
        Rgba::rgb(0xf4, 0x72, 0xb6),
        Rgba::rgb(0x22, 0xc5, 0xe5),
        Rgba::rgb(0x84, 0xcc, 0x16),
        Rgba::rgb(0xf9, 0x73, 0x16),
        Rgba::rgb(0x06, 0xb6, 0xd4),
    ];
    PALETTE[index % PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argb_packing() {
        let c = Rgba::new(0x12, 0x34, 0x56, 0x78);
        assert_eq!(c.to_argb(), 0x7812_3456);
        assert_eq!(Rgba::from_argb(0x7812_3456), c);
    }

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(Rgba::BLACK.lerp(Rgba::WHITE, 0.0), Rgba::BLACK);
        assert_eq!(Rgba::BLACK.lerp(Rgba::WHITE, 1.0), Rgba::WHITE);
        assert_eq!(Rgba::BLACK.lerp(Rgba::WHITE, 0.5), Rgba::rgb(128, 128, 128));
    }

    #[test]
    fn test_over_opaque_and_transparent() {
        let red = Rgba::rgb(255, 0, 0);
        assert_eq!(red.over(Rgba::WHITE), red);
        assert_eq!(Rgba::TRANSPARENT.over(red), red);
    }
}
