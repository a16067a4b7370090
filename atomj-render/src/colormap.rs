//! Colormap presets used as default gradients.

use atomj_core::util::f64_to_u8;
use atomj_core::Rgba;

use crate::gradient::ColorGradient;

/// Number of stops sampled when a preset is turned into a gradient.
const PRESET_STOPS: usize = 17;

/// Built-in colormaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colormap {
    /// Grayscale - black to white.
    #[default]
    Grayscale,
    /// Green (Matrix style) - black to bright green.
    Green,
    /// Hot (Thermal) - red to yellow to white.
    Hot,
    /// Viridis (approximate) - blue to teal to green to yellow.
    Viridis,
    /// Diverging blue - white - red, for signed channels.
    BlueWhiteRed,
}

impl std::fmt::Display for Colormap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Colormap::Grayscale => write!(f, "Grayscale"),
            Colormap::Green => write!(f, "Green (Matrix)"),
            Colormap::Hot => write!(f, "Hot (Thermal)"),
            Colormap::Viridis => write!(f, "Viridis"),
            Colormap::BlueWhiteRed => write!(f, "Blue-White-Red"),
        }
    }
}

impl std::str::FromStr for Colormap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grayscale" | "gray" | "grey" => Ok(Colormap::Grayscale),
            "green" => Ok(Colormap::Green),
            "hot" => Ok(Colormap::Hot),
            "viridis" => Ok(Colormap::Viridis),
            "bwr" | "blue-white-red" => Ok(Colormap::BlueWhiteRed),
            other => Err(format!("unknown colormap: {other}")),
        }
    }
}

impl Colormap {
    /// Every preset, in menu order.
    pub const ALL: [Colormap; 5] = [
        Colormap::Grayscale,
        Colormap::Green,
        Colormap::Hot,
        Colormap::Viridis,
        Colormap::BlueWhiteRed,
    ];

    /// Apply the colormap to a normalized value [0, 1].
    #[must_use]
    pub fn apply(self, val: f64) -> Rgba {
        let val = if val.is_nan() { 0.0 } else { val.clamp(0.0, 1.0) };
        match self {
            Colormap::Green => Rgba::rgb(0, f64_to_u8(val * 255.0), 0),
            Colormap::Grayscale => {
                let v = f64_to_u8(val * 255.0);
                Rgba::rgb(v, v, v)
            }
            Colormap::Hot => {
                // Red to Yellow, then Yellow to White
                if val < 0.5 {
                    Rgba::rgb(255, f64_to_u8(val * 2.0 * 255.0), 0)
                } else {
                    Rgba::rgb(255, 255, f64_to_u8((val - 0.5) * 2.0 * 255.0))
                }
            }
            Colormap::Viridis => Rgba::rgb(
                f64_to_u8(255.0 * val.powi(2)),
                f64_to_u8(255.0 * val),
                f64_to_u8(255.0 * (1.0 - val)),
            ),
            Colormap::BlueWhiteRed => {
                if val < 0.5 {
                    let v = f64_to_u8(val * 2.0 * 255.0);
                    Rgba::rgb(v, v, 255)
                } else {
                    let v = f64_to_u8((1.0 - val) * 2.0 * 255.0);
                    Rgba::rgb(255, v, v)
                }
            }
        }
    }

    /// Samples the preset into a piecewise linear gradient.
    #[must_use]
    pub fn gradient(self) -> ColorGradient {
        let last = atomj_core::util::usize_to_f64(PRESET_STOPS - 1);
        let stops = (0..PRESET_STOPS)
            .map(|i| {
                let t = atomj_core::util::usize_to_f64(i) / last;
                (t, self.apply(t))
            })
            .collect();
        ColorGradient::from_sorted_stops(stops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(Colormap::Grayscale.apply(0.0), Rgba::BLACK);
        assert_eq!(Colormap::Grayscale.apply(1.0), Rgba::WHITE);
        assert_eq!(Colormap::Hot.apply(1.0), Rgba::WHITE);
        assert_eq!(Colormap::BlueWhiteRed.apply(0.5), Rgba::WHITE);
    }

    #[test]
    fn test_gradient_matches_preset_at_stops() {
        for cmap in Colormap::ALL {
            let gradient = cmap.gradient();
            assert_eq!(gradient.color_at(0.0), cmap.apply(0.0));
            assert_eq!(gradient.color_at(1.0), cmap.apply(1.0));
            assert_eq!(gradient.color_at(0.5), cmap.apply(0.5));
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("HOT".parse::<Colormap>(), Ok(Colormap::Hot));
        assert!("plasma".parse::<Colormap>().is_err());
    }
}
