use super::ShapeGeometry;
use crate::{
    dynamics::rigid_body::mass_properties::{MassInfo, area_for_circle, moment_for_circle},
    math::*,
    spatial_query::{PointQueryInfo, SegmentQueryInfo},
};

/// A solid circle with a center that can be offset from the body origin.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Circle {
    pub(crate) offset: Vector,
    pub(crate) radius: Scalar,
    pub(crate) world_center: Vector,
}

impl Circle {
    pub(crate) fn new(radius: Scalar, offset: Vector) -> Self {
        Self {
            offset,
            radius,
            world_center: offset,
        }
    }

    /// The center of the circle in the local space of the body.
    #[inline]
    pub fn offset(&self) -> Vector {
        self.offset
    }

    /// The radius of the circle.
    #[inline]
    pub fn radius(&self) -> Scalar {
        self.radius
    }

    /// The center of the circle in world space, as of the last update.
    #[inline]
    pub fn world_center(&self) -> Vector {
        self.world_center
    }
}

impl ShapeGeometry for Circle {
    fn update(&mut self, transform: &Transform) -> BoundingBox {
        self.world_center = transform.point(self.offset);
        BoundingBox::for_circle(self.world_center, self.radius)
    }

    fn mass_info(&self, mass: Scalar) -> MassInfo {
        MassInfo {
            mass,
            moment_per_mass: moment_for_circle(1.0, 0.0, self.radius, Vector::ZERO),
            center_of_gravity: self.offset,
            area: area_for_circle(0.0, self.radius),
        }
    }

    fn point_query(&self, point: Vector) -> PointQueryInfo {
        let delta = point - self.world_center;
        let distance = delta.length();
        let gradient = if distance > MAGIC_EPSILON {
            delta / distance
        } else {
            Vector::Y
        };

        PointQueryInfo {
            shape: None,
            point: self.world_center + gradient * self.radius,
            distance: distance - self.radius,
            gradient,
        }
    }

    fn segment_query(&self, a: Vector, b: Vector, radius: Scalar) -> Option<SegmentQueryInfo> {
        circle_segment_query(self.world_center, self.radius, a, b, radius)
    }
}

/// Casts a segment with the given `radius` against a circle.
///
/// This is shared with the rounded endpoints of segments and polygons.
pub(crate) fn circle_segment_query(
    center: Vector,
    circle_radius: Scalar,
    a: Vector,
    b: Vector,
    radius: Scalar,
) -> Option<SegmentQueryInfo> {
    let da = a - center;
    let db = b - center;
    let rsum = circle_radius + radius;

    let qa = da.dot(da) - 2.0 * da.dot(db) + db.dot(db);
    let qb = da.dot(db) - da.dot(da);
    let det = qb * qb - qa * (da.dot(da) - rsum * rsum);

    if det < 0.0 || qa == 0.0 {
        return None;
    }

    let t = (-qb - det.sqrt()) / qa;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }

    let normal = da.lerp(db, t).normalize_or_zero();
    Some(SegmentQueryInfo {
        shape: None,
        point: a.lerp(b, t) - normal * radius,
        normal,
        alpha: t,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn point_query_outside_and_inside() {
        let mut circle = Circle::new(1.0, Vector::new(1.0, 0.0));
        circle.update(&Transform::translate(Vector::new(2.0, 0.0)));
        assert_relative_eq!(circle.world_center(), Vector::new(3.0, 0.0));

        let outside = circle.point_query(Vector::new(3.0, 3.0));
        assert_relative_eq!(outside.distance, 2.0);
        assert_relative_eq!(outside.point, Vector::new(3.0, 1.0));
        assert_relative_eq!(outside.gradient, Vector::Y);

        let inside = circle.point_query(Vector::new(3.5, 0.0));
        assert_relative_eq!(inside.distance, -0.5);
    }

    #[test]
    fn segment_query_hits_front_face() {
        let circle = Circle::new(1.0, Vector::ZERO);
        let hit = circle
            .segment_query(Vector::new(-3.0, 0.0), Vector::new(3.0, 0.0), 0.0)
            .unwrap();
        assert_relative_eq!(hit.alpha, 2.0 / 6.0, epsilon = 1e-6);
        assert_relative_eq!(hit.point, Vector::new(-1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(hit.normal, Vector::new(-1.0, 0.0), epsilon = 1e-6);

        assert!(
            circle
                .segment_query(Vector::new(-3.0, 2.0), Vector::new(3.0, 2.0), 0.5)
                .is_none()
        );
    }
}
