//! Math types and traits used by the crate.
//!
//! The scalar precision is feature-dependent, so [`Scalar`] and [`Vector`] are
//! `f64` and `DVec2` with the `f64` feature, or `f32` and `Vec2` with the `f32` feature.

#[cfg(feature = "f32")]
mod single;
#[cfg(feature = "f32")]
pub use single::*;

#[cfg(feature = "f64")]
mod double;
#[cfg(feature = "f64")]
pub use double::*;

mod bounding_box;
mod transform;

pub use bounding_box::BoundingBox;
pub use transform::Transform;

/// A small distance below which directions are considered degenerate.
pub(crate) const MAGIC_EPSILON: Scalar = 1e-5;

/// Computes the 2D cross product (perp-dot product) of two vectors.
#[inline]
pub fn cross(a: Vector, b: Vector) -> Scalar {
    a.perp_dot(b)
}

/// Computes the cross product of a scalar and a vector, `s × v`.
///
/// This is the vector `v` rotated by 90 degrees counterclockwise and scaled by `s`,
/// which is how an angular velocity `s` acts on a lever arm `v`.
#[inline]
pub fn cross_sv(s: Scalar, v: Vector) -> Vector {
    Vector::new(-s * v.y, s * v.x)
}

/// Returns the point on the segment `a`-`b` that is closest to `p`.
pub fn closest_point_on_segment(p: Vector, a: Vector, b: Vector) -> Vector {
    let delta = a - b;
    let length_squared = delta.length_squared();
    if length_squared == 0.0 {
        return a;
    }
    let t = (delta.dot(p - b) / length_squared).clamp(0.0, 1.0);
    b + delta * t
}

/// An extension trait for computing reciprocals without division by zero.
pub trait RecipOrZero {
    /// Computes the reciprocal of `self` if `self` is not zero,
    /// and returns zero otherwise to avoid division by zero.
    fn recip_or_zero(self) -> Self;
}

impl RecipOrZero for f32 {
    fn recip_or_zero(self) -> Self {
        if self != 0.0 && self.is_finite() {
            self.recip()
        } else {
            0.0
        }
    }
}

impl RecipOrZero for f64 {
    fn recip_or_zero(self) -> Self {
        if self != 0.0 && self.is_finite() {
            self.recip()
        } else {
            0.0
        }
    }
}

/// Vector operations that are not provided by [`Vector`] itself.
///
/// Rotation here treats vectors as unit complex numbers, so a rotation by `rot`
/// is `v.rotate(rot)` and its inverse is `v.unrotate(rot)`.
pub trait VectorExt: Sized {
    /// Returns the vector rotated by 90 degrees clockwise.
    fn rperp(self) -> Self;

    /// Rotates `self` by the inverse of the unit vector `rot`.
    fn unrotate(self, rot: Self) -> Self;

    /// Linearly interpolates towards `to` by at most `max_distance`.
    fn lerp_const(self, to: Self, max_distance: Scalar) -> Self;

    /// Spherically interpolates between `self` and `to` by the fraction `t`.
    fn slerp(self, to: Self, t: Scalar) -> Self;

    /// Spherically interpolates towards `to` by at most `max_angle` radians.
    fn slerp_const(self, to: Self, max_angle: Scalar) -> Self;

    /// Returns `true` if the distance between `self` and `other` is less than `distance`.
    fn near(self, other: Self, distance: Scalar) -> bool;
}

impl VectorExt for Vector {
    #[inline]
    fn rperp(self) -> Self {
        Vector::new(self.y, -self.x)
    }

    #[inline]
    fn unrotate(self, rot: Self) -> Self {
        Vector::new(
            self.x * rot.x + self.y * rot.y,
            self.y * rot.x - self.x * rot.y,
        )
    }

    fn lerp_const(self, to: Self, max_distance: Scalar) -> Self {
        self + (to - self).clamp_length_max(max_distance)
    }

    fn slerp(self, to: Self, t: Scalar) -> Self {
        let dot = self
            .normalize_or_zero()
            .dot(to.normalize_or_zero())
            .clamp(-1.0, 1.0);
        let omega = dot.acos();

        if omega < 1e-3 {
            // Nearly parallel, so a linear interpolation is accurate enough.
            self.lerp(to, t)
        } else {
            let denom = omega.sin().recip();
            self * (((1.0 - t) * omega).sin() * denom) + to * ((t * omega).sin() * denom)
        }
    }

    fn slerp_const(self, to: Self, max_angle: Scalar) -> Self {
        let dot = self
            .normalize_or_zero()
            .dot(to.normalize_or_zero())
            .clamp(-1.0, 1.0);
        let omega = dot.acos();

        if omega == 0.0 {
            return self;
        }
        self.slerp(to, max_angle.min(omega) / omega)
    }

    #[inline]
    fn near(self, other: Self, distance: Scalar) -> bool {
        self.distance_squared(other) < distance * distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rotate_unrotate_roundtrip() {
        let rot = Vector::from_angle(0.7);
        let v = Vector::new(3.0, -2.0);
        assert_relative_eq!(v.rotate(rot).unrotate(rot), v, epsilon = 1e-6);
    }

    #[test]
    fn cross_sv_matches_perp() {
        let v = Vector::new(2.0, 5.0);
        assert_relative_eq!(cross_sv(3.0, v), v.perp() * 3.0);
    }

    #[test]
    fn slerp_halfway_between_axes() {
        let mid = Vector::X.slerp(Vector::Y, 0.5);
        let expected = Vector::new(1.0, 1.0).normalize();
        assert_relative_eq!(mid, expected, epsilon = 1e-6);
        // Limited to a quarter of the way there.
        let limited = Vector::X.slerp_const(Vector::Y, PI / 8.0);
        assert_relative_eq!(limited.to_angle(), PI / 8.0, epsilon = 1e-5);
    }

    #[test]
    fn lerp_const_limits_distance() {
        let v = Vector::ZERO.lerp_const(Vector::new(10.0, 0.0), 2.5);
        assert_relative_eq!(v, Vector::new(2.5, 0.0));
    }

    #[test]
    fn closest_point_is_clamped_to_segment() {
        let a = Vector::new(0.0, 0.0);
        let b = Vector::new(4.0, 0.0);
        assert_relative_eq!(
            closest_point_on_segment(Vector::new(2.0, 3.0), a, b),
            Vector::new(2.0, 0.0)
        );
        assert_relative_eq!(closest_point_on_segment(Vector::new(-5.0, 1.0), a, b), a);
    }
}
