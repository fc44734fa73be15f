use core::ops::Mul;

use super::{BoundingBox, Scalar, Vector};

/// A 2D affine transform stored as a 2x3 matrix.
///
/// ```text
/// | a  c  tx |
/// | b  d  ty |
/// ```
///
/// Points are mapped as `(a * x + c * y + tx, b * x + d * y + ty)`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub a: Scalar,
    pub b: Scalar,
    pub c: Scalar,
    pub d: Scalar,
    pub tx: Scalar,
    pub ty: Scalar,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Creates a transform from its matrix elements in column-major order.
    #[inline]
    pub const fn new(a: Scalar, b: Scalar, c: Scalar, d: Scalar, tx: Scalar, ty: Scalar) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    /// Creates a transform from its matrix elements in row-major order.
    #[inline]
    pub const fn new_transpose(
        a: Scalar,
        c: Scalar,
        tx: Scalar,
        b: Scalar,
        d: Scalar,
        ty: Scalar,
    ) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    /// Creates a translation.
    #[inline]
    pub const fn translate(translation: Vector) -> Self {
        Self::new_transpose(1.0, 0.0, translation.x, 0.0, 1.0, translation.y)
    }

    /// Creates a non-uniform scale.
    #[inline]
    pub const fn scale(scale_x: Scalar, scale_y: Scalar) -> Self {
        Self::new_transpose(scale_x, 0.0, 0.0, 0.0, scale_y, 0.0)
    }

    /// Creates a rotation by the given angle in radians.
    #[inline]
    pub fn rotate(radians: Scalar) -> Self {
        let rot = Vector::from_angle(radians);
        Self::new_transpose(rot.x, -rot.y, 0.0, rot.y, rot.x, 0.0)
    }

    /// Creates a rigid transform, a rotation followed by a translation.
    #[inline]
    pub fn rigid(translation: Vector, radians: Scalar) -> Self {
        let rot = Vector::from_angle(radians);
        Self::new_transpose(rot.x, -rot.y, translation.x, rot.y, rot.x, translation.y)
    }

    /// Creates a rigid transform from a translation and a unit rotation vector.
    #[inline]
    pub(crate) const fn from_rotation_vector(translation: Vector, rot: Vector) -> Self {
        Self::new_transpose(rot.x, -rot.y, translation.x, rot.y, rot.x, translation.y)
    }

    /// Creates an orthographic projection that maps the given bounding box
    /// to the `[-1, 1]` square.
    pub fn ortho(bb: BoundingBox) -> Self {
        let (l, b, r, t) = (bb.min.x, bb.min.y, bb.max.x, bb.max.y);
        Self::new_transpose(
            2.0 / (r - l),
            0.0,
            -(r + l) / (r - l),
            0.0,
            2.0 / (t - b),
            -(t + b) / (t - b),
        )
    }

    /// Creates a transform that maps the unit x segment `(0, 0)`-`(1, 0)`
    /// onto the segment `v0`-`v1`, rotating and scaling uniformly.
    pub fn bone_scale(v0: Vector, v1: Vector) -> Self {
        let d = v1 - v0;
        Self::new_transpose(d.x, -d.y, v0.x, d.y, d.x, v0.y)
    }

    /// Creates a transform that scales by `scale` along the unit vector `axis`
    /// while keeping `pivot` fixed.
    pub fn axial_scale(axis: Vector, pivot: Vector, scale: Scalar) -> Self {
        let a = axis.x * axis.y * (scale - 1.0);
        let b = axis.dot(pivot) * (1.0 - scale);
        Self::new_transpose(
            scale * axis.x * axis.x + axis.y * axis.y,
            a,
            axis.x * b,
            a,
            axis.x * axis.x + scale * axis.y * axis.y,
            axis.y * b,
        )
    }

    /// Returns the inverse of the transform.
    ///
    /// A singular transform produces non-finite elements.
    pub fn inverse(&self) -> Self {
        let inv_det = 1.0 / (self.a * self.d - self.c * self.b);
        Self::new_transpose(
            self.d * inv_det,
            -self.c * inv_det,
            (self.c * self.ty - self.tx * self.d) * inv_det,
            -self.b * inv_det,
            self.a * inv_det,
            (self.tx * self.b - self.a * self.ty) * inv_det,
        )
    }

    /// Returns the inverse of a rigid transform. This is cheaper than [`Transform::inverse`]
    /// but only valid when the transform has no scale or shear.
    pub fn rigid_inverse(&self) -> Self {
        Self::new_transpose(
            self.d,
            -self.c,
            self.c * self.ty - self.tx * self.d,
            -self.b,
            self.a,
            self.tx * self.b - self.a * self.ty,
        )
    }

    /// Composes two transforms. The result applies `other` first, then `self`.
    pub fn mult(&self, other: &Self) -> Self {
        Self::new_transpose(
            self.a * other.a + self.c * other.b,
            self.a * other.c + self.c * other.d,
            self.a * other.tx + self.c * other.ty + self.tx,
            self.b * other.a + self.d * other.b,
            self.b * other.c + self.d * other.d,
            self.b * other.tx + self.d * other.ty + self.ty,
        )
    }

    /// Returns `inverse(outer) * inner * outer`.
    pub fn wrap(outer: &Self, inner: &Self) -> Self {
        outer.inverse().mult(&inner.mult(outer))
    }

    /// Returns `outer * inner * inverse(outer)`.
    pub fn wrap_inverse(outer: &Self, inner: &Self) -> Self {
        outer.mult(&inner.mult(&outer.inverse()))
    }

    /// Transforms a point, applying the translation.
    #[inline]
    pub fn point(&self, p: Vector) -> Vector {
        Vector::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    /// Transforms a vector, ignoring the translation.
    #[inline]
    pub fn vect(&self, v: Vector) -> Vector {
        Vector::new(self.a * v.x + self.c * v.y, self.b * v.x + self.d * v.y)
    }

    /// Returns the translation part of the transform.
    #[inline]
    pub fn translation(&self) -> Vector {
        Vector::new(self.tx, self.ty)
    }

    /// Returns a bounding box that contains the transformed bounding box.
    pub fn bb(&self, bb: BoundingBox) -> BoundingBox {
        let center = bb.center();
        let half_width = (bb.max.x - bb.min.x) * 0.5;
        let half_height = (bb.max.y - bb.min.y) * 0.5;

        let (a, b) = (self.a * half_width, self.c * half_height);
        let (d, e) = (self.b * half_width, self.d * half_height);
        let half_width_max = (a + b).abs().max((a - b).abs());
        let half_height_max = (d + e).abs().max((d - e).abs());

        BoundingBox::for_extents(self.point(center), half_width_max, half_height_max)
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Self) -> Self::Output {
        self.mult(&rhs)
    }
}

impl Mul<Vector> for Transform {
    type Output = Vector;

    fn mul(self, rhs: Vector) -> Self::Output {
        self.point(rhs)
    }
}
