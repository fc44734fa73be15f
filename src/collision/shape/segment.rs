use super::{ShapeGeometry, circle::circle_segment_query};
use crate::{
    dynamics::rigid_body::mass_properties::{MassInfo, area_for_segment, moment_for_box},
    math::*,
    spatial_query::{PointQueryInfo, SegmentQueryInfo},
};

/// A line segment with an optional rounding radius, making it a capsule.
///
/// Segments are typically attached to static bodies to build terrain. When segments are
/// chained, [`Segment::set_neighbors`] tells the segment about its neighbors so that shapes
/// sliding along the chain do not catch on the seams between segments.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    pub(crate) a: Vector,
    pub(crate) b: Vector,
    pub(crate) normal: Vector,
    pub(crate) radius: Scalar,
    pub(crate) a_tangent: Vector,
    pub(crate) b_tangent: Vector,

    pub(crate) world_a: Vector,
    pub(crate) world_b: Vector,
    pub(crate) world_normal: Vector,
    pub(crate) world_a_tangent: Vector,
    pub(crate) world_b_tangent: Vector,
}

impl Segment {
    pub(crate) fn new(a: Vector, b: Vector, radius: Scalar) -> Self {
        let normal = (b - a).normalize_or_zero().rperp();
        Self {
            a,
            b,
            normal,
            radius,
            a_tangent: Vector::ZERO,
            b_tangent: Vector::ZERO,
            world_a: a,
            world_b: b,
            world_normal: normal,
            world_a_tangent: Vector::ZERO,
            world_b_tangent: Vector::ZERO,
        }
    }

    pub(crate) fn set_endpoints(&mut self, a: Vector, b: Vector) {
        self.a = a;
        self.b = b;
        self.normal = (b - a).normalize_or_zero().rperp();
    }

    /// Sets the endpoints of the neighboring segments in a chain.
    ///
    /// `prev` is the far endpoint of the segment connected to `a`,
    /// and `next` is the far endpoint of the segment connected to `b`.
    pub fn set_neighbors(&mut self, prev: Vector, next: Vector) {
        self.a_tangent = prev - self.a;
        self.b_tangent = next - self.b;
    }

    /// The first endpoint in the local space of the body.
    #[inline]
    pub fn a(&self) -> Vector {
        self.a
    }

    /// The second endpoint in the local space of the body.
    #[inline]
    pub fn b(&self) -> Vector {
        self.b
    }

    /// The unit normal of the segment in local space, pointing to the right of `a` to `b`.
    #[inline]
    pub fn normal(&self) -> Vector {
        self.normal
    }

    /// The rounding radius.
    #[inline]
    pub fn radius(&self) -> Scalar {
        self.radius
    }

    /// The endpoints in world space, as of the last update.
    #[inline]
    pub fn world_endpoints(&self) -> (Vector, Vector) {
        (self.world_a, self.world_b)
    }

    /// Returns `false` if a contact at `point` with the `normal` pointing away from the
    /// segment should be discarded because it would catch on the seam with a neighbor.
    ///
    /// Only contacts on an endpoint with a normal that is not the face normal are discarded,
    /// and only when the neighbor at that endpoint lies on the side of the normal.
    pub(crate) fn accepts_contact(&self, point: Vector, normal: Vector) -> bool {
        let delta = self.world_b - self.world_a;
        let length_squared = delta.length_squared();
        if length_squared == 0.0 || normal.dot(self.world_normal).abs() >= 1.0 - MAGIC_EPSILON {
            return true;
        }

        let t = (point - self.world_a).dot(delta) / length_squared;
        if t <= MAGIC_EPSILON && normal.dot(self.world_a_tangent) > 0.0 {
            return false;
        }
        if t >= 1.0 - MAGIC_EPSILON && normal.dot(self.world_b_tangent) > 0.0 {
            return false;
        }
        true
    }
}

impl ShapeGeometry for Segment {
    fn update(&mut self, transform: &Transform) -> BoundingBox {
        self.world_a = transform.point(self.a);
        self.world_b = transform.point(self.b);
        self.world_normal = transform.vect(self.normal);
        self.world_a_tangent = transform.vect(self.a_tangent);
        self.world_b_tangent = transform.vect(self.b_tangent);

        BoundingBox::new(
            self.world_a.min(self.world_b),
            self.world_a.max(self.world_b),
        )
        .grow(self.radius)
    }

    fn mass_info(&self, mass: Scalar) -> MassInfo {
        MassInfo {
            mass,
            moment_per_mass: moment_for_box(
                1.0,
                self.a.distance(self.b) + 2.0 * self.radius,
                2.0 * self.radius,
            ),
            center_of_gravity: self.a.lerp(self.b, 0.5),
            area: area_for_segment(self.a, self.b, self.radius),
        }
    }

    fn point_query(&self, point: Vector) -> PointQueryInfo {
        let closest = closest_point_on_segment(point, self.world_a, self.world_b);
        let delta = point - closest;
        let distance = delta.length();

        let gradient = if distance > MAGIC_EPSILON {
            delta / distance
        } else {
            self.world_normal
        };

        PointQueryInfo {
            shape: None,
            point: closest + gradient * self.radius,
            distance: distance - self.radius,
            gradient,
        }
    }

    fn segment_query(&self, a: Vector, b: Vector, radius: Scalar) -> Option<SegmentQueryInfo> {
        let n = self.world_normal;
        let d = (self.world_a - a).dot(n);
        let r = self.radius + radius;

        let flipped_n = if d > 0.0 { -n } else { n };
        let seg_offset = flipped_n * r - a;

        // Make the endpoints relative to `a` and move them by the thickness of the segment.
        let seg_a = self.world_a + seg_offset;
        let seg_b = self.world_b + seg_offset;
        let delta = b - a;

        if cross(delta, seg_a) * cross(delta, seg_b) <= 0.0 {
            let d_offset = d + if d > 0.0 { -r } else { r };
            let ad = -d_offset;
            let bd = delta.dot(n) - d_offset;

            if ad * bd < 0.0 {
                let t = ad / (ad - bd);
                return Some(SegmentQueryInfo {
                    shape: None,
                    point: a.lerp(b, t) - flipped_n * radius,
                    normal: flipped_n,
                    alpha: t,
                });
            }
        } else if r != 0.0 {
            let hit_a = circle_segment_query(self.world_a, self.radius, a, b, radius);
            let hit_b = circle_segment_query(self.world_b, self.radius, a, b, radius);
            return match (hit_a, hit_b) {
                (Some(hit_a), Some(hit_b)) => Some(if hit_a.alpha < hit_b.alpha {
                    hit_a
                } else {
                    hit_b
                }),
                (hit_a, hit_b) => hit_a.or(hit_b),
            };
        }

        None
    }
}
