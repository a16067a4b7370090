//! Casts between grid/pixel indices and data-space floats.
//!
//! Kept in one place so the pedantic cast lints stay enabled everywhere else.

/// Convert usize to f64 with allowed precision loss.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    value as f64
}

/// Convert f64 to u8 with clamping to [0, 255].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn f64_to_u8(value: f64) -> u8 {
    let clamped = value.clamp(0.0, 255.0);
    clamped.round() as u8
}

/// Round to the nearest index and clamp into `[0, count - 1]`.
///
/// Non-finite input maps to index 0. `count` must be non-zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn f64_to_index_clamped(value: f64, count: usize) -> usize {
    let last = count.saturating_sub(1);
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let rounded = value.round();
    if rounded >= usize_to_f64(last) {
        last
    } else {
        rounded as usize
    }
}

/// Convert f64 to usize, saturating at the type bounds. NaN maps to 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn f64_to_usize_saturating(value: f64) -> usize {
    value as usize
}

/// Index of the pixel containing coordinate `value` on an axis of `count` pixels.
///
/// `None` when the coordinate lies off the axis or is not finite.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn pixel_index(value: f64, count: usize) -> Option<usize> {
    if value.is_finite() && value >= 0.0 && value < usize_to_f64(count) {
        Some((value.floor() as usize).min(count - 1))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturating_conversion() {
        assert_eq!(f64_to_usize_saturating(-1.5), 0);
        assert_eq!(f64_to_usize_saturating(f64::NAN), 0);
        assert_eq!(f64_to_usize_saturating(7.9), 7);
    }

    #[test]
    fn test_index_clamping() {
        assert_eq!(f64_to_index_clamped(-3.2, 10), 0);
        assert_eq!(f64_to_index_clamped(4.4, 10), 4);
        assert_eq!(f64_to_index_clamped(4.6, 10), 5);
        assert_eq!(f64_to_index_clamped(42.0, 10), 9);
        assert_eq!(f64_to_index_clamped(f64::NAN, 10), 0);
    }

    #[test]
    fn test_pixel_index_and_channel_clamp() {
        assert_eq!(pixel_index(2.7, 3), Some(2));
        assert_eq!(pixel_index(0.0, 3), Some(0));
        assert_eq!(pixel_index(3.0, 3), None);
        assert_eq!(pixel_index(-0.1, 3), None);
        assert_eq!(pixel_index(f64::INFINITY, 3), None);
        assert_eq!(pixel_index(0.5, 0), None);
        assert_eq!(f64_to_u8(300.0), 255);
        assert_eq!(f64_to_u8(-1.0), 0);
    }
}
