//! Spatial queries against the shapes of a [`Space`].
//!
//! - [Point queries](Space::point_query) find shapes near a point, or the
//!   [nearest](Space::point_query_nearest) one.
//! - [Segment queries](Space::segment_query) cast a segment with an optional thickness
//!   and find the shapes it hits, or the [first](Space::segment_query_first) one.
//! - [Bounding box queries](Space::bb_query) find shapes whose bounding boxes overlap a box.
//! - [Shape queries](Space::shape_query) find shapes touching another shape.
//!
//! Every query takes a [`ShapeFilter`] that is tested against the filter of each shape,
//! so queries can be limited to some categories with [`ShapeFilter::new`] or run against
//! everything with [`ShapeFilter::ALL`]. The bounding boxes used are the ones computed during
//! the last step, or when the shapes were added or reindexed.
//!
//! Sensor shapes are included in queries that return every match, but never returned
//! by the nearest point or first hit queries.

use crate::{
    collision::{
        contact_types::ContactPointSet, layers::ShapeFilter, narrow_phase::collide, shape::Shape,
    },
    math::*,
    space::{ShapeHandle, Space},
};

/// The result of a point query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointQueryInfo {
    /// The shape that was queried, if it belongs to a space.
    pub shape: Option<ShapeHandle>,
    /// The closest point on the surface of the shape.
    pub point: Vector,
    /// The distance to the surface. Negative if the query point is inside the shape.
    pub distance: Scalar,
    /// The direction in which the distance grows fastest. Points away from the shape.
    pub gradient: Vector,
}

/// The result of a segment query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentQueryInfo {
    /// The shape that was hit, if it belongs to a space.
    pub shape: Option<ShapeHandle>,
    /// The point of impact on the surface of the shape.
    pub point: Vector,
    /// The surface normal at the point of impact.
    pub normal: Vector,
    /// How far along the segment the hit is, from `0.0` at the start to `1.0` at the end.
    pub alpha: Scalar,
}

impl SegmentQueryInfo {
    /// The point along the segment from `start` to `end` at which the hit happened.
    pub fn hit_point(&self, start: Vector, end: Vector) -> Vector {
        start.lerp(end, self.alpha)
    }

    /// The distance from `start` to the hit.
    pub fn hit_distance(&self, start: Vector, end: Vector) -> Scalar {
        start.distance(end) * self.alpha
    }
}

impl Space {
    /// Calls `visit` for every shape whose bounding box intersects `bb`.
    ///
    /// Unbounded boxes visit every shape without going through the spatial indices.
    fn visit_candidates<'a>(&'a self, bb: BoundingBox, mut visit: impl FnMut(&'a Shape)) {
        if !bb.min.is_finite() || !bb.max.is_finite() {
            for (_, shape) in self.shapes.iter() {
                visit(shape);
            }
            return;
        }

        let mut visit_slot = |slot| {
            if let Some(shape) = self
                .shapes
                .index_of_slot(slot)
                .and_then(|index| self.shapes.get(index))
            {
                visit(shape);
            }
        };
        self.dynamic_index.query(bb, &mut visit_slot);
        self.static_index.query(bb, &mut visit_slot);
    }

    /// Finds every shape within `max_distance` of `point`.
    ///
    /// With a `max_distance` of zero, this finds the shapes containing the point.
    pub fn point_query(
        &self,
        point: Vector,
        max_distance: Scalar,
        filter: ShapeFilter,
    ) -> Vec<PointQueryInfo> {
        let mut hits = Vec::new();
        self.visit_candidates(BoundingBox::for_circle(point, max_distance.max(0.0)), |shape| {
            if filter.rejects(shape.filter) {
                return;
            }
            let info = shape.point_query(point);
            if info.distance < max_distance {
                hits.push(info);
            }
        });
        hits
    }

    /// Finds the shape closest to `point` within `max_distance`, ignoring sensors.
    ///
    /// An infinite `max_distance` searches every shape in the space.
    ///
    /// ```
    /// use rigid2d::prelude::*;
    ///
    /// let mut space = Space::new();
    /// let ball = Shape::circle(1.0, Vector::new(3.0, 0.0)).unwrap();
    /// let ball = space.add_shape(space.static_body(), ball).unwrap();
    ///
    /// let nearest = space
    ///     .point_query_nearest(Vector::ZERO, Scalar::INFINITY, ShapeFilter::ALL)
    ///     .unwrap();
    /// assert_eq!(nearest.shape, Some(ball));
    /// assert_eq!(nearest.distance, 2.0);
    /// ```
    pub fn point_query_nearest(
        &self,
        point: Vector,
        max_distance: Scalar,
        filter: ShapeFilter,
    ) -> Option<PointQueryInfo> {
        let mut nearest: Option<PointQueryInfo> = None;
        self.visit_candidates(BoundingBox::for_circle(point, max_distance.max(0.0)), |shape| {
            if shape.sensor || filter.rejects(shape.filter) {
                return;
            }
            let info = shape.point_query(point);
            if info.distance < max_distance
                && nearest.is_none_or(|nearest| info.distance < nearest.distance)
            {
                nearest = Some(info);
            }
        });
        nearest
    }

    /// Casts a segment from `start` to `end` with a thickness of `radius` and returns every
    /// shape it hits, ordered by distance along the segment.
    pub fn segment_query(
        &self,
        start: Vector,
        end: Vector,
        radius: Scalar,
        filter: ShapeFilter,
    ) -> Vec<SegmentQueryInfo> {
        let mut hits = Vec::new();
        self.visit_candidates(segment_bb(start, end, radius), |shape| {
            if filter.rejects(shape.filter) {
                return;
            }
            if let Some(hit) = shape.segment_query(start, end, radius) {
                hits.push(hit);
            }
        });
        hits.sort_by(|a, b| a.alpha.total_cmp(&b.alpha));
        hits
    }

    /// Casts a segment from `start` to `end` with a thickness of `radius` and returns the first
    /// shape it hits, ignoring sensors.
    pub fn segment_query_first(
        &self,
        start: Vector,
        end: Vector,
        radius: Scalar,
        filter: ShapeFilter,
    ) -> Option<SegmentQueryInfo> {
        let mut first: Option<SegmentQueryInfo> = None;
        self.visit_candidates(segment_bb(start, end, radius), |shape| {
            if shape.sensor || filter.rejects(shape.filter) {
                return;
            }
            if let Some(hit) = shape.segment_query(start, end, radius) {
                if first.is_none_or(|first| hit.alpha < first.alpha) {
                    first = Some(hit);
                }
            }
        });
        first
    }

    /// Finds every shape whose bounding box intersects `bb`.
    pub fn bb_query(&self, bb: BoundingBox, filter: ShapeFilter) -> Vec<ShapeHandle> {
        let mut shapes = Vec::new();
        self.visit_candidates(bb, |shape| {
            if !filter.rejects(shape.filter) && shape.bb.intersects(&bb) {
                shapes.extend(shape.handle);
            }
        });
        shapes
    }

    /// Finds every shape of the space touching `shape`, along with the contact points.
    ///
    /// The shape does not need to belong to the space, but it must have been positioned with
    /// [`Shape::update`]. If it does belong to the space, it is not reported as touching itself.
    /// The normals of the contact sets point from `shape` to the shapes that were found.
    pub fn shape_query(&self, shape: &Shape) -> Vec<(ShapeHandle, ContactPointSet)> {
        let mut contacts = Vec::new();
        self.visit_candidates(shape.bb, |other| {
            let Some(handle) = other.handle else {
                return;
            };
            if shape.handle == Some(handle) || shape.filter.rejects(other.filter) {
                return;
            }
            let manifold = collide(&shape.kind, &other.kind);
            if !manifold.is_empty() {
                contacts.push((handle, manifold.to_point_set()));
            }
        });
        contacts
    }
}

fn segment_bb(start: Vector, end: Vector, radius: Scalar) -> BoundingBox {
    BoundingBox::new(start.min(end), start.max(end)).grow(radius.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use approx::assert_relative_eq;

    fn space_with_circles() -> (Space, ShapeHandle, ShapeHandle) {
        let mut space = Space::new();
        let ground = space.static_body();
        let near = space
            .add_shape(ground, Shape::circle(1.0, Vector::new(3.0, 0.0)).unwrap())
            .unwrap();
        let body = space
            .add_body(Body::dynamic(1.0, 1.0).with_position(Vector::new(6.0, 0.0)))
            .unwrap();
        let far = space
            .add_shape(body, Shape::circle(1.0, Vector::ZERO).unwrap())
            .unwrap();
        (space, near, far)
    }

    #[test]
    fn point_query_finds_shapes_within_distance() {
        let (space, near, far) = space_with_circles();

        let hits = space.point_query(Vector::ZERO, 3.0, ShapeFilter::ALL);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].shape, Some(near));
        assert_relative_eq!(hits[0].distance, 2.0);
        assert_relative_eq!(hits[0].gradient, Vector::NEG_X);

        let inside = space.point_query(Vector::new(6.5, 0.0), 0.0, ShapeFilter::ALL);
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].shape, Some(far));
        assert!(inside[0].distance < 0.0);
    }

    #[test]
    fn segment_query_sorts_hits() {
        let (space, near, far) = space_with_circles();

        let hits = space.segment_query(Vector::ZERO, Vector::new(10.0, 0.0), 0.0, ShapeFilter::ALL);
        let shapes: Vec<_> = hits.iter().map(|hit| hit.shape).collect();
        assert_eq!(shapes, [Some(near), Some(far)]);
        assert_relative_eq!(hits[0].alpha, 0.2);
        assert_relative_eq!(hits[0].hit_point(Vector::ZERO, Vector::new(10.0, 0.0)), Vector::new(2.0, 0.0));

        let first = space
            .segment_query_first(Vector::ZERO, Vector::new(10.0, 0.0), 0.0, ShapeFilter::ALL)
            .unwrap();
        assert_eq!(first.shape, Some(near));
        assert_relative_eq!(first.normal, Vector::NEG_X);
    }

    #[test]
    fn missed_segment_returns_nothing() {
        let (space, _, _) = space_with_circles();
        assert!(
            space
                .segment_query_first(Vector::new(0.0, 5.0), Vector::new(10.0, 5.0), 0.0, ShapeFilter::ALL)
                .is_none()
        );
    }

    #[test]
    fn filters_and_sensors() {
        let (mut space, near, far) = space_with_circles();
        space.shape_mut(near).unwrap().set_sensor(true);
        space
            .shape_mut(far)
            .unwrap()
            .set_filter(ShapeFilter::new(0, LayerMask(0b10), LayerMask::ALL));

        // The sensor is skipped by the first hit query but reported by the full query.
        assert!(
            space
                .segment_query_first(Vector::ZERO, Vector::new(10.0, 0.0), 0.0, ShapeFilter::new(0, LayerMask(0b01), LayerMask(0b01)))
                .is_none()
        );
        assert_eq!(
            space
                .segment_query(Vector::ZERO, Vector::new(10.0, 0.0), 0.0, ShapeFilter::ALL)
                .len(),
            2
        );
    }

    #[test]
    fn bb_query_uses_bounding_boxes() {
        let (space, near, _) = space_with_circles();
        let shapes = space.bb_query(BoundingBox::new(Vector::ZERO, Vector::new(2.5, 0.5)), ShapeFilter::ALL);
        assert_eq!(shapes, [near]);
    }

    #[test]
    fn shape_query_reports_contacts() {
        let (space, near, _) = space_with_circles();
        let mut probe = Shape::circle(1.0, Vector::ZERO).unwrap();
        probe.update(&Transform::translate(Vector::new(1.5, 0.0)));

        let contacts = space.shape_query(&probe);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].0, near);
        assert_relative_eq!(contacts[0].1.normal, Vector::X);
        assert_relative_eq!(contacts[0].1.points[0].penetration, 0.5);
    }
}
