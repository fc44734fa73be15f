//! Area, moment of inertia and centroid helpers for the supported shape geometry.
//!
//! The moment functions return the moment of inertia about the center of gravity
//! of the whole shape unless an `offset` is applied, in which case the parallel axis
//! theorem is used to move the axis by `offset`.

use crate::math::{PI, Scalar, Vector, cross};

/// Computes the moment of inertia of a hollow circle with inner radius `r1`
/// and outer radius `r2`, offset from the axis by `offset`.
///
/// A solid circle has an inner radius of zero.
#[inline]
pub fn moment_for_circle(mass: Scalar, r1: Scalar, r2: Scalar, offset: Vector) -> Scalar {
    mass * (0.5 * (r1 * r1 + r2 * r2) + offset.length_squared())
}

/// Computes the area of a hollow circle with inner radius `r1` and outer radius `r2`.
#[inline]
pub fn area_for_circle(r1: Scalar, r2: Scalar) -> Scalar {
    PI * (r1 * r1 - r2 * r2).abs()
}

/// Computes the moment of inertia of a line segment with endpoints `a` and `b`
/// and the given rounding `radius`. The axis is at the origin.
pub fn moment_for_segment(mass: Scalar, a: Vector, b: Vector, radius: Scalar) -> Scalar {
    let offset = a.lerp(b, 0.5);
    let length = b.distance(a) + 2.0 * radius;
    mass * ((length * length + 4.0 * radius * radius) / 12.0 + offset.length_squared())
}

/// Computes the area of a rounded segment, a capsule.
#[inline]
pub fn area_for_segment(a: Vector, b: Vector, radius: Scalar) -> Scalar {
    radius * (PI * radius + 2.0 * a.distance(b))
}

/// Computes the moment of inertia of a solid convex polygon with counterclockwise winding.
/// The vertices are moved by `offset` before the moment is computed.
///
/// Polygons with two vertices are treated as segments. The rounding radius
/// is not taken into account.
pub fn moment_for_poly(mass: Scalar, vertices: &[Vector], offset: Vector, radius: Scalar) -> Scalar {
    if vertices.len() == 2 {
        return moment_for_segment(mass, vertices[0], vertices[1], radius);
    }

    let mut sum1 = 0.0;
    let mut sum2 = 0.0;
    for (i, &v) in vertices.iter().enumerate() {
        let v1 = v + offset;
        let v2 = vertices[(i + 1) % vertices.len()] + offset;

        let a = cross(v2, v1);
        let b = v1.dot(v1) + v1.dot(v2) + v2.dot(v2);

        sum1 += a * b;
        sum2 += a;
    }

    if sum2 == 0.0 {
        return 0.0;
    }
    (mass * sum1) / (6.0 * sum2)
}

/// Computes the signed area of a convex polygon with counterclockwise winding,
/// including the area added by a rounding `radius`.
pub fn area_for_poly(vertices: &[Vector], radius: Scalar) -> Scalar {
    let mut area = 0.0;
    let mut perimeter = 0.0;
    for (i, &v1) in vertices.iter().enumerate() {
        let v2 = vertices[(i + 1) % vertices.len()];
        area += cross(v1, v2);
        perimeter += v1.distance(v2);
    }
    radius * (PI * radius.abs() + perimeter) + area / 2.0
}

/// Computes the centroid of a polygon.
pub fn centroid_for_poly(vertices: &[Vector]) -> Vector {
    let mut sum = 0.0;
    let mut vsum = Vector::ZERO;
    for (i, &v1) in vertices.iter().enumerate() {
        let v2 = vertices[(i + 1) % vertices.len()];
        let cross = cross(v1, v2);

        sum += cross;
        vsum += (v1 + v2) * cross;
    }

    if sum == 0.0 {
        // Degenerate polygon, use the average of the vertices.
        return vertices.iter().copied().sum::<Vector>() / vertices.len().max(1) as Scalar;
    }
    vsum / (3.0 * sum)
}

/// Computes the moment of inertia of a solid box centered on the axis.
#[inline]
pub fn moment_for_box(mass: Scalar, width: Scalar, height: Scalar) -> Scalar {
    mass * (width * width + height * height) / 12.0
}

/// The mass properties of a single shape.
///
/// `moment` is stored per unit of mass so that it can be rescaled when the mass of
/// the shape changes without recomputing the geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct MassInfo {
    /// The mass of the shape.
    pub mass: Scalar,
    /// The moment of inertia about the center of gravity, divided by the mass.
    pub moment_per_mass: Scalar,
    /// The center of gravity in the local space of the body.
    pub center_of_gravity: Vector,
    /// The area of the shape.
    pub area: Scalar,
}

impl MassInfo {
    /// Returns the moment of inertia of the shape about its center of gravity.
    #[inline]
    pub fn moment(&self) -> Scalar {
        self.mass * self.moment_per_mass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> [Vector; 4] {
        [
            Vector::new(-0.5, -0.5),
            Vector::new(0.5, -0.5),
            Vector::new(0.5, 0.5),
            Vector::new(-0.5, 0.5),
        ]
    }

    #[test]
    fn box_and_poly_moments_agree() {
        let poly = moment_for_poly(2.0, &unit_square(), Vector::ZERO, 0.0);
        assert_relative_eq!(poly, moment_for_box(2.0, 1.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn circle_moment_uses_parallel_axis() {
        let centered = moment_for_circle(3.0, 0.0, 2.0, Vector::ZERO);
        assert_relative_eq!(centered, 6.0);
        let offset = moment_for_circle(3.0, 0.0, 2.0, Vector::new(1.0, 0.0));
        assert_relative_eq!(offset, 9.0);
    }

    #[test]
    fn poly_area_and_centroid() {
        let shifted = unit_square().map(|v| v + Vector::new(2.0, 1.0));
        assert_relative_eq!(area_for_poly(&shifted, 0.0), 1.0, epsilon = 1e-6);
        assert_relative_eq!(centroid_for_poly(&shifted), Vector::new(2.0, 1.0), epsilon = 1e-6);
        // Rounding adds the perimeter strip and a full circle.
        assert_relative_eq!(
            area_for_poly(&unit_square(), 0.5),
            1.0 + 0.5 * 4.0 + PI * 0.25,
            epsilon = 1e-6
        );
    }

    #[test]
    fn segment_area_is_capsule_area() {
        let area = area_for_segment(Vector::ZERO, Vector::new(2.0, 0.0), 1.0);
        assert_relative_eq!(area, PI + 4.0, epsilon = 1e-6);
        assert_relative_eq!(area_for_circle(0.0, 1.0), PI);
    }
}
