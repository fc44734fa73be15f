//! Computes the contact points between pairs of shapes.
//!
//! Circles are handled in closed form, and segments and polygons share a clipping-based
//! polygon collider in which a segment is a polygon with two vertices. The normal of every
//! result points from the first shape to the second.
//!
//! Contacts that touch a segment at an endpoint shared with a neighbor are discarded when the
//! neighbor faces the contact, so that shapes sliding along chained segments do not catch on
//! the seams.

mod circles;
mod polygons;

use crate::{
    collision::{
        contact_types::{ContactManifold, ContactPointSet},
        shape::{Segment, Shape, ShapeKind},
    },
    math::*,
};
use polygons::PolygonGeometry;

/// Computes the contact points between two shapes without adding them to a space.
///
/// The shapes are collided with their current world-space geometry, so shapes that are not
/// in a space must be positioned with [`Shape::update`] first. Returns an empty set if the
/// shapes do not touch.
///
/// ```
/// use rigid2d::prelude::*;
///
/// let mut a = Shape::circle(1.0, Vector::ZERO).unwrap();
/// let mut b = Shape::circle(1.0, Vector::ZERO).unwrap();
/// a.update(&Transform::IDENTITY);
/// b.update(&Transform::translate(Vector::new(1.5, 0.0)));
///
/// let contacts = shapes_collide(&a, &b);
/// assert_eq!(contacts.len(), 1);
/// assert_eq!(contacts.normal, Vector::X);
/// assert_eq!(contacts.points[0].penetration, 0.5);
/// ```
pub fn shapes_collide(a: &Shape, b: &Shape) -> ContactPointSet {
    collide(&a.kind, &b.kind).to_point_set()
}

/// Computes the penetrating contact points between two shapes.
pub(crate) fn collide(a: &ShapeKind, b: &ShapeKind) -> ContactManifold {
    let mut manifold = match (a, b) {
        (ShapeKind::Circle(a), ShapeKind::Circle(b)) => {
            circles::collide_circles(a.world_center, a.radius, b.world_center, b.radius)
        }
        (ShapeKind::Segment(a), ShapeKind::Circle(b)) => circles::collide_capsule_circle(
            a.world_a,
            a.world_b,
            a.radius,
            b.world_center,
            b.radius,
        ),
        (ShapeKind::Circle(a), ShapeKind::Segment(b)) => circles::collide_capsule_circle(
            b.world_a,
            b.world_b,
            b.radius,
            a.world_center,
            a.radius,
        )
        .flipped(),
        (ShapeKind::Polygon(a), ShapeKind::Circle(b)) => {
            circles::collide_polygon_circle(a, b.world_center, b.radius)
        }
        (ShapeKind::Circle(a), ShapeKind::Polygon(b)) => {
            circles::collide_polygon_circle(b, a.world_center, a.radius).flipped()
        }
        (ShapeKind::Segment(a), ShapeKind::Segment(b)) => {
            let (a_vertices, a_normals) = segment_polygon(a);
            let (b_vertices, b_normals) = segment_polygon(b);
            polygons::collide_polygons(
                &PolygonGeometry {
                    vertices: &a_vertices,
                    normals: &a_normals,
                    radius: a.radius,
                },
                &PolygonGeometry {
                    vertices: &b_vertices,
                    normals: &b_normals,
                    radius: b.radius,
                },
            )
        }
        (ShapeKind::Segment(a), ShapeKind::Polygon(b)) => {
            let (vertices, normals) = segment_polygon(a);
            polygons::collide_polygons(
                &PolygonGeometry {
                    vertices: &vertices,
                    normals: &normals,
                    radius: a.radius,
                },
                &polygon_geometry(b),
            )
        }
        (ShapeKind::Polygon(a), ShapeKind::Segment(b)) => {
            let (vertices, normals) = segment_polygon(b);
            polygons::collide_polygons(
                &polygon_geometry(a),
                &PolygonGeometry {
                    vertices: &vertices,
                    normals: &normals,
                    radius: b.radius,
                },
            )
        }
        (ShapeKind::Polygon(a), ShapeKind::Polygon(b)) => {
            polygons::collide_polygons(&polygon_geometry(a), &polygon_geometry(b))
        }
    };

    manifold.points.retain(|point| point.distance <= 0.0);

    // Discard contacts that would catch on the seams of segment chains.
    let normal = manifold.normal;
    if let ShapeKind::Segment(segment) = a {
        manifold.points.retain(|point| {
            segment.accepts_contact(point.point_a - normal * segment.radius, normal)
        });
    }
    if let ShapeKind::Segment(segment) = b {
        manifold.points.retain(|point| {
            segment.accepts_contact(point.point_b + normal * segment.radius, -normal)
        });
    }

    manifold
}

fn segment_polygon(segment: &Segment) -> ([Vector; 2], [Vector; 2]) {
    (
        [segment.world_a, segment.world_b],
        [segment.world_normal, -segment.world_normal],
    )
}

fn polygon_geometry(polygon: &crate::collision::shape::Polygon) -> PolygonGeometry<'_> {
    PolygonGeometry {
        vertices: &polygon.world_vertices,
        normals: &polygon.world_normals,
        radius: polygon.radius,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn placed(mut shape: Shape, position: Vector) -> Shape {
        shape.update(&Transform::translate(position));
        shape
    }

    #[test]
    fn circles_report_single_contact() {
        let a = placed(Shape::circle(1.0, Vector::ZERO).unwrap(), Vector::ZERO);
        let b = placed(Shape::circle(1.0, Vector::ZERO).unwrap(), Vector::new(1.5, 0.0));
        let contacts = shapes_collide(&a, &b);
        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts.normal, Vector::X);
        assert_relative_eq!(contacts.points[0].penetration, 0.5);

        // Swapping the shapes flips the normal.
        let swapped = shapes_collide(&b, &a);
        assert_relative_eq!(swapped.normal, Vector::NEG_X);
    }

    #[test]
    fn circle_and_box_in_both_orders() {
        let circle = placed(Shape::circle(0.5, Vector::ZERO).unwrap(), Vector::new(0.0, 1.25));
        let square = placed(Shape::box_shape(2.0, 2.0, 0.0).unwrap(), Vector::ZERO);

        let box_first = shapes_collide(&square, &circle);
        assert_relative_eq!(box_first.normal, Vector::Y);
        assert_relative_eq!(box_first.points[0].penetration, 0.25);

        let circle_first = shapes_collide(&circle, &square);
        assert_relative_eq!(circle_first.normal, Vector::NEG_Y);
        assert_relative_eq!(circle_first.points[0].point_a, Vector::new(0.0, 0.75));
    }

    #[test]
    fn box_resting_on_segment() {
        let floor = placed(
            Shape::segment(Vector::new(-5.0, 0.0), Vector::new(5.0, 0.0), 0.0).unwrap(),
            Vector::ZERO,
        );
        let square = placed(Shape::box_shape(1.0, 1.0, 0.0).unwrap(), Vector::new(0.0, 0.45));

        let contacts = shapes_collide(&square, &floor);
        assert_eq!(contacts.len(), 2);
        assert_relative_eq!(contacts.normal, Vector::NEG_Y, epsilon = 1e-9);
        for point in &contacts.points {
            assert_relative_eq!(point.penetration, 0.05, epsilon = 1e-9);
        }
    }

    #[test]
    fn separated_shapes_have_no_contacts() {
        let a = placed(Shape::box_shape(1.0, 1.0, 0.0).unwrap(), Vector::ZERO);
        let b = placed(Shape::circle(0.5, Vector::ZERO).unwrap(), Vector::new(3.0, 0.0));
        assert!(shapes_collide(&a, &b).is_empty());
    }
}
