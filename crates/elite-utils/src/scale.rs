//! Wire encoding for floats as `round(x * ratio)` into a saturated `i32`.
//!
//! Every control-frame channel (C3/C4/C5) transmits fractional values as
//! scaled integers rather than carrying floats over the wire. The ratios
//! below are also the values substituted into the script template's
//! `*_ZOOM_RATIO_REPLACE` placeholders (spec.md §6.1), so the robot-side
//! script and the driver agree on the same scale.

/// Position/length values are scaled by 10^5.
pub const POS_ZOOM_RATIO: f64 = 100_000.0;
/// Time values are scaled by 10^3.
pub const TIME_ZOOM_RATIO: f64 = 1_000.0;
/// Generic (mass, voltage, wrench, ...) values are scaled by 10^6.
pub const COMMON_ZOOM_RATIO: f64 = 1_000_000.0;

/// `round(value * ratio)`, saturated to the `i32` range.
///
/// Rounding is nearest, ties away from zero (`f64::round`), not
/// round-half-to-even — matching the scaled-integer contract in spec.md
/// §9 ("banker-agnostic nearest rounding").
#[inline]
pub fn scale_to_i32(value: f64, ratio: f64) -> i32 {
    let scaled = (value * ratio).round();
    if scaled >= i32::MAX as f64 {
        i32::MAX
    } else if scaled <= i32::MIN as f64 {
        i32::MIN
    } else {
        scaled as i32
    }
}

/// Inverse of [`scale_to_i32`], used when decoding values the driver itself
/// receives back (none of C3/C4/C5 do today, but RTSI register helpers and
/// tests decode scaled integers to assert against).
#[inline]
pub fn unscale_from_i32(value: i32, ratio: f64) -> f64 {
    f64::from(value) / ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_and_rounds_nearest() {
        assert_eq!(scale_to_i32(0.1, POS_ZOOM_RATIO), 10_000);
        assert_eq!(scale_to_i32(-0.1, POS_ZOOM_RATIO), -10_000);
        assert_eq!(scale_to_i32(1.234565, COMMON_ZOOM_RATIO), 1_234_565);
    }

    #[test]
    fn saturates_out_of_range() {
        assert_eq!(scale_to_i32(1.0e10, POS_ZOOM_RATIO), i32::MAX);
        assert_eq!(scale_to_i32(-1.0e10, POS_ZOOM_RATIO), i32::MIN);
    }

    #[test]
    fn roundtrips() {
        let v = unscale_from_i32(scale_to_i32(0.05, TIME_ZOOM_RATIO), TIME_ZOOM_RATIO);
        assert!((v - 0.05).abs() < 1e-9);
    }
}
