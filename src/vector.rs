//! 2D vector math
//!
//! `Vector2` is glam's double-precision vector, the common currency of every
//! engine component. The operations below are pure and return new values.
//!
//! Zero-length policy: normalizing a vector with zero (or non-finite) length
//! yields `Vector2::ZERO`. `try_normalize` surfaces the same case as
//! `FieldError::InvalidGeometry` for callers that want to branch on it.

use glam::DVec2;

use crate::error::{FieldError, Result};

/// Field-space point or direction
pub type Vector2 = DVec2;

#[inline]
pub const fn new(x: f64, y: f64) -> Vector2 {
    DVec2::new(x, y)
}

/// Unit vector along `v`, or zero when `v` has no direction
#[inline]
pub fn normalize(v: Vector2) -> Vector2 {
    try_normalize(v).unwrap_or(Vector2::ZERO)
}

/// Unit vector along `v`
pub fn try_normalize(v: Vector2) -> Result<Vector2> {
    v.try_normalize()
        .ok_or(FieldError::InvalidGeometry("zero-length vector has no direction"))
}

#[inline]
pub fn length(v: Vector2) -> f64 {
    v.length()
}

#[inline]
pub fn distance_squared(a: Vector2, b: Vector2) -> f64 {
    a.distance_squared(b)
}

#[inline]
pub fn dot(a: Vector2, b: Vector2) -> f64 {
    a.dot(b)
}

/// `to - from`
#[inline]
pub fn diff(to: Vector2, from: Vector2) -> Vector2 {
    to - from
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_unit_length() {
        let v = normalize(new(3.0, 4.0));
        assert!((length(v) - 1.0).abs() < 1e-12);
        assert!((v.x - 0.6).abs() < 1e-12);
        assert!((v.y - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_zero_is_zero() {
        assert_eq!(normalize(Vector2::ZERO), Vector2::ZERO);
        assert!(matches!(
            try_normalize(Vector2::ZERO),
            Err(FieldError::InvalidGeometry(_))
        ));
        assert_eq!(normalize(new(f64::NAN, 1.0)), Vector2::ZERO);
    }

    #[test]
    fn test_distance_dot_diff() {
        let a = new(1.0, 2.0);
        let b = new(4.0, 6.0);
        assert_eq!(distance_squared(a, b), 25.0);
        assert_eq!(dot(a, b), 16.0);
        assert_eq!(diff(b, a), new(3.0, 4.0));
        // Operands are untouched
        assert_eq!(a, new(1.0, 2.0));
    }
}
