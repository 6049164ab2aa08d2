//! Utilities to approximate equality of floating point values.
//!
//! The CPU and GPU devices evaluate the same expressions with different
//! instruction sequences, so their results are compared with a tolerance
//! rather than bit-for-bit.

/// Tolerance used to cross-validate backends.
pub const DEFAULT_TOLERANCE: f32 = 1e-4;

/// Distance scaled by magnitude once values leave the unit range.
fn scaled_difference(a: f32, b: f32) -> f32 {
    if a == b {
        // covers equal infinities
        return 0.0;
    }
    let magnitude = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() / magnitude
}

/// Whether every pair of elements differs by at most `tolerance`, measured
/// absolutely below magnitude 1 and relatively above it.
///
/// Slices of different lengths are never within tolerance, and `NaN` is never
/// within tolerance of anything.
#[must_use]
pub fn within(a: &[f32], b: &[f32], tolerance: f32) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(&x, &y)| scaled_difference(x, y) <= tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_uses_given_tolerance() {
        assert!(within(&[0.0, 0.5], &[0.01, 0.5], 0.05));
        assert!(!within(&[0.0, 0.5], &[0.1, 0.5], 0.05));
    }

    #[test]
    fn large_values_compare_relatively() {
        assert!(within(&[1_000_000.0], &[1_000_050.0], DEFAULT_TOLERANCE));
        assert!(!within(&[1_000_000.0], &[1_010_000.0], DEFAULT_TOLERANCE));
    }

    #[test]
    fn nan_and_length_mismatch_fail() {
        assert!(!within(&[f32::NAN], &[f32::NAN], 1.0));
        assert!(!within(&[1.0, 2.0], &[1.0], 1.0));
        assert!(within(&[f32::INFINITY], &[f32::INFINITY], 0.0));
    }
}
