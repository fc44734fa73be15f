//! Contacts involving circles and capsules.

use crate::{
    collision::{
        contact_types::{ContactManifold, ManifoldPoint},
        shape::Polygon,
    },
    math::*,
};

/// Computes the contact between two circles.
pub(crate) fn collide_circles(
    center_a: Vector,
    radius_a: Scalar,
    center_b: Vector,
    radius_b: Scalar,
) -> ContactManifold {
    let delta = center_b - center_a;
    let radius = radius_a + radius_b;
    let distance_squared = delta.length_squared();
    if distance_squared > radius * radius {
        return ContactManifold::default();
    }

    let distance = distance_squared.sqrt();
    let normal = if distance > 0.0 {
        delta / distance
    } else {
        Vector::X
    };

    ContactManifold::single(
        normal,
        ManifoldPoint {
            point_a: center_a + normal * radius_a,
            point_b: center_b - normal * radius_b,
            distance: distance - radius,
            id: 0,
        },
    )
}

/// Computes the contact between a capsule from `a` to `b` and a circle.
pub(crate) fn collide_capsule_circle(
    a: Vector,
    b: Vector,
    capsule_radius: Scalar,
    center: Vector,
    circle_radius: Scalar,
) -> ContactManifold {
    let closest = closest_point_on_segment(center, a, b);
    collide_circles(closest, capsule_radius, center, circle_radius)
}

/// Computes the contact between a rounded polygon and a circle.
pub(crate) fn collide_polygon_circle(
    polygon: &Polygon,
    center: Vector,
    circle_radius: Scalar,
) -> ContactManifold {
    let vertices = &polygon.world_vertices;
    let normals = &polygon.world_normals;
    let count = vertices.len();
    let radius = polygon.radius + circle_radius;

    // Find the closest point on the polygon boundary.
    let mut outside = false;
    let mut min_distance = Scalar::INFINITY;
    let mut closest_point = Vector::ZERO;
    let mut closest_normal = Vector::ZERO;

    for i in 0..count {
        let v1 = vertices[i];
        let v2 = vertices[(i + 1) % count];
        let separation = normals[i].dot(center - v1);
        if separation > radius {
            return ContactManifold::default();
        }
        outside |= separation > 0.0;

        let closest = closest_point_on_segment(center, v1, v2);
        let distance = center.distance(closest);
        if distance < min_distance {
            min_distance = distance;
            closest_point = closest;
            closest_normal = normals[i];
        }
    }

    let (normal, distance) = if !outside {
        // The center is inside, so push it out through the closest face.
        (closest_normal, -min_distance)
    } else if min_distance > MAGIC_EPSILON {
        ((center - closest_point) / min_distance, min_distance)
    } else {
        (closest_normal, min_distance)
    };

    if distance > radius {
        return ContactManifold::default();
    }

    ContactManifold::single(
        normal,
        ManifoldPoint {
            point_a: closest_point + normal * polygon.radius,
            point_b: center - normal * circle_radius,
            distance: distance - radius,
            id: 0,
        },
    )
}
