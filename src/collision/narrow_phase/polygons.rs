//! Contacts between convex polygons, using the separating axis test and clipping
//! of the incident edge against the reference edge.
//!
//! Segments are treated as polygons with two vertices and two opposing normals.

use crate::{
    collision::contact_types::{ContactManifold, ManifoldPoint},
    math::*,
};

/// A tolerance used to prefer the first polygon as the reference and to detect disjoint polygons.
const LINEAR_SLOP: Scalar = 0.005;

/// World-space geometry of a convex polygon with counterclockwise winding.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PolygonGeometry<'a> {
    pub vertices: &'a [Vector],
    pub normals: &'a [Vector],
    pub radius: Scalar,
}

impl PolygonGeometry<'_> {
    #[inline]
    fn next(&self, i: usize) -> usize {
        if i + 1 < self.vertices.len() { i + 1 } else { 0 }
    }
}

/// Packs a pair of vertex indices into a contact id.
#[inline]
fn feature_id(a: usize, b: usize) -> u64 {
    ((a as u64) << 32) | (b as u64 & 0xffff_ffff)
}

/// Finds the edge normal of `poly1` with the largest separation from `poly2`.
fn find_max_separation(poly1: &PolygonGeometry, poly2: &PolygonGeometry) -> (usize, Scalar) {
    let mut best_index = 0;
    let mut max_separation = Scalar::NEG_INFINITY;

    for (i, (&normal, &v1)) in poly1.normals.iter().zip(poly1.vertices).enumerate() {
        let separation = poly2
            .vertices
            .iter()
            .map(|&v2| normal.dot(v2 - v1))
            .fold(Scalar::INFINITY, Scalar::min);

        if separation > max_separation {
            max_separation = separation;
            best_index = i;
        }
    }

    (best_index, max_separation)
}

/// Finds the edge of `poly` whose normal is most anti-parallel to `direction`.
fn find_incident_edge(poly: &PolygonGeometry, direction: Vector) -> usize {
    let mut index = 0;
    let mut min_dot = Scalar::INFINITY;
    for (i, &normal) in poly.normals.iter().enumerate() {
        let dot = direction.dot(normal);
        if dot < min_dot {
            min_dot = dot;
            index = i;
        }
    }
    index
}

/// The closest points between the segments `p1`-`q1` and `p2`-`q2`.
struct SegmentDistance {
    fraction1: Scalar,
    fraction2: Scalar,
}

fn segment_distance(p1: Vector, q1: Vector, p2: Vector, q2: Vector) -> SegmentDistance {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let dd1 = d1.dot(d1);
    let dd2 = d2.dot(d2);
    let rd1 = r.dot(d1);
    let rd2 = r.dot(d2);
    let eps_squared = Scalar::EPSILON * Scalar::EPSILON;

    if dd1 < eps_squared || dd2 < eps_squared {
        return if dd1 >= eps_squared {
            SegmentDistance {
                fraction1: (-rd1 / dd1).clamp(0.0, 1.0),
                fraction2: 0.0,
            }
        } else if dd2 >= eps_squared {
            SegmentDistance {
                fraction1: 0.0,
                fraction2: (rd2 / dd2).clamp(0.0, 1.0),
            }
        } else {
            SegmentDistance {
                fraction1: 0.0,
                fraction2: 0.0,
            }
        };
    }

    let d12 = d1.dot(d2);
    let denominator = dd1 * dd2 - d12 * d12;

    let mut fraction1 = if denominator != 0.0 {
        ((d12 * rd2 - rd1 * dd2) / denominator).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut fraction2 = (d12 * fraction1 + rd2) / dd2;

    // Clamping the second fraction requires recomputing the first.
    if fraction2 < 0.0 {
        fraction2 = 0.0;
        fraction1 = (-rd1 / dd1).clamp(0.0, 1.0);
    } else if fraction2 > 1.0 {
        fraction2 = 1.0;
        fraction1 = ((d12 - rd1) / dd1).clamp(0.0, 1.0);
    }

    SegmentDistance {
        fraction1,
        fraction2,
    }
}

/// Computes the contact between two rounded vertices.
fn collide_vertices(
    vertex_a: Vector,
    radius_a: Scalar,
    vertex_b: Vector,
    radius_b: Scalar,
    id: u64,
) -> ContactManifold {
    let delta = vertex_b - vertex_a;
    let distance = delta.length();
    let radius = radius_a + radius_b;
    if distance > radius || distance == 0.0 {
        return ContactManifold::default();
    }

    let normal = delta / distance;
    ContactManifold::single(
        normal,
        ManifoldPoint {
            point_a: vertex_a + normal * radius_a,
            point_b: vertex_b - normal * radius_b,
            distance: distance - radius,
            id,
        },
    )
}

/// Computes the contact between two convex polygons.
///
/// The normal of the result points from `poly_a` to `poly_b`.
pub(crate) fn collide_polygons(
    poly_a: &PolygonGeometry,
    poly_b: &PolygonGeometry,
) -> ContactManifold {
    let (mut edge_a, separation_a) = find_max_separation(poly_a, poly_b);
    let (mut edge_b, separation_b) = find_max_separation(poly_b, poly_a);
    let radius = poly_a.radius + poly_b.radius;

    if separation_a > radius || separation_b > radius {
        return ContactManifold::default();
    }

    // Prefer the first polygon as the reference to keep the result stable.
    let flip = separation_b > separation_a + 0.1 * LINEAR_SLOP;
    if flip {
        edge_a = find_incident_edge(poly_a, poly_b.normals[edge_b]);
    } else {
        edge_b = find_incident_edge(poly_b, poly_a.normals[edge_a]);
    }

    let separation = separation_a.max(separation_b);
    if separation > 0.1 * LINEAR_SLOP {
        // The polygons are disjoint and only touch through their rounding radii,
        // so the closest features might be two vertices.
        if radius == 0.0 {
            return ContactManifold::default();
        }

        let (i11, i12) = (edge_a, poly_a.next(edge_a));
        let (i21, i22) = (edge_b, poly_b.next(edge_b));
        let (v11, v12) = (poly_a.vertices[i11], poly_a.vertices[i12]);
        let (v21, v22) = (poly_b.vertices[i21], poly_b.vertices[i22]);

        let closest = segment_distance(v11, v12, v21, v22);
        let vertex_pair = match (closest.fraction1, closest.fraction2) {
            (f1, f2) if f1 == 0.0 && f2 == 0.0 => Some((v11, v21, feature_id(i11, i21))),
            (f1, f2) if f1 == 0.0 && f2 == 1.0 => Some((v11, v22, feature_id(i11, i22))),
            (f1, f2) if f1 == 1.0 && f2 == 0.0 => Some((v12, v21, feature_id(i12, i21))),
            (f1, f2) if f1 == 1.0 && f2 == 1.0 => Some((v12, v22, feature_id(i12, i22))),
            _ => None,
        };

        if let Some((vertex_a, vertex_b, id)) = vertex_pair {
            return collide_vertices(vertex_a, poly_a.radius, vertex_b, poly_b.radius, id);
        }
    }

    clip_polygons(poly_a, poly_b, edge_a, edge_b, flip)
}

/// Clips the incident edge against the side planes of the reference edge.
///
/// The reference edge is `edge_b` of `poly_b` if `flip` is set, and `edge_a` of `poly_a` otherwise.
fn clip_polygons(
    poly_a: &PolygonGeometry,
    poly_b: &PolygonGeometry,
    edge_a: usize,
    edge_b: usize,
    flip: bool,
) -> ContactManifold {
    let (poly1, poly2, i11, i21) = if flip {
        (poly_b, poly_a, edge_b, edge_a)
    } else {
        (poly_a, poly_b, edge_a, edge_b)
    };
    let i12 = poly1.next(i11);
    let i22 = poly2.next(i21);

    let normal = poly1.normals[i11];

    // Reference edge.
    let v11 = poly1.vertices[i11];
    let v12 = poly1.vertices[i12];

    // Incident edge.
    let v21 = poly2.vertices[i21];
    let v22 = poly2.vertices[i22];

    let tangent = normal.perp();

    let lower1 = 0.0;
    let upper1 = (v12 - v11).dot(tangent);

    // The incident edge runs opposite to the tangent.
    let upper2 = (v21 - v11).dot(tangent);
    let lower2 = (v22 - v11).dot(tangent);
    let length2 = upper2 - lower2;

    let v_lower = if lower2 < lower1 && length2 > Scalar::EPSILON {
        v22.lerp(v21, (lower1 - lower2) / length2)
    } else {
        v22
    };
    let v_upper = if upper2 > upper1 && length2 > Scalar::EPSILON {
        v22.lerp(v21, (upper1 - lower2) / length2)
    } else {
        v21
    };

    let r1 = poly1.radius;
    let r2 = poly2.radius;

    // Projects an incident vertex onto both surfaces.
    let surface_points = |vertex: Vector| {
        let separation = (vertex - v11).dot(normal);
        let reference = vertex - normal * (separation - r1);
        let incident = vertex - normal * r2;
        (reference, incident, separation - r1 - r2)
    };

    let (ref_lower, inc_lower, distance_lower) = surface_points(v_lower);
    let (ref_upper, inc_upper, distance_upper) = surface_points(v_upper);

    let mut manifold = ContactManifold::default();
    if flip {
        manifold.normal = -normal;
        manifold.push(ManifoldPoint {
            point_a: inc_upper,
            point_b: ref_upper,
            distance: distance_upper,
            id: feature_id(i21, i12),
        });
        manifold.push(ManifoldPoint {
            point_a: inc_lower,
            point_b: ref_lower,
            distance: distance_lower,
            id: feature_id(i22, i11),
        });
    } else {
        manifold.normal = normal;
        manifold.push(ManifoldPoint {
            point_a: ref_lower,
            point_b: inc_lower,
            distance: distance_lower,
            id: feature_id(i11, i22),
        });
        manifold.push(ManifoldPoint {
            point_a: ref_upper,
            point_b: inc_upper,
            distance: distance_upper,
            id: feature_id(i12, i21),
        });
    }
    manifold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::shape::{Polygon, ShapeGeometry};
    use approx::assert_relative_eq;

    fn square_at(position: Vector, angle: Scalar) -> Polygon {
        let mut square = Polygon::rectangle(2.0, 2.0, 0.0).unwrap();
        square.update(&Transform::rigid(position, angle));
        square
    }

    fn geometry(polygon: &Polygon) -> PolygonGeometry<'_> {
        PolygonGeometry {
            vertices: &polygon.world_vertices,
            normals: &polygon.world_normals,
            radius: polygon.radius,
        }
    }

    #[test]
    fn stacked_boxes_have_two_contacts() {
        let bottom = square_at(Vector::ZERO, 0.0);
        let top = square_at(Vector::new(0.5, 1.9), 0.0);

        let manifold = collide_polygons(&geometry(&bottom), &geometry(&top));
        assert_eq!(manifold.points.len(), 2);
        assert_relative_eq!(manifold.normal, Vector::Y, epsilon = 1e-9);
        for point in &manifold.points {
            assert_relative_eq!(point.distance, -0.1, epsilon = 1e-9);
            assert_relative_eq!(point.point_a.y, 1.0, epsilon = 1e-9);
            assert_relative_eq!(point.point_b.y, 0.9, epsilon = 1e-9);
        }

        // The same pair in the other order has the opposite normal.
        let flipped = collide_polygons(&geometry(&top), &geometry(&bottom));
        assert_relative_eq!(flipped.normal, Vector::NEG_Y, epsilon = 1e-9);
        assert_eq!(flipped.points.len(), 2);
    }

    #[test]
    fn feature_ids_keep_large_vertex_indices_apart() {
        assert_ne!(feature_id(300, 2), feature_id(44, 2));
        assert_ne!(feature_id(1, 256), feature_id(1, 0));
        assert_ne!(feature_id(70_000, 5), feature_id(4_464, 5));
        assert_ne!(feature_id(1, 2), feature_id(2, 1));
    }

    #[test]
    fn separated_boxes_do_not_collide() {
        let a = square_at(Vector::ZERO, 0.0);
        let b = square_at(Vector::new(2.5, 0.0), 0.3);
        assert!(collide_polygons(&geometry(&a), &geometry(&b)).is_empty());
    }

    #[test]
    fn segment_under_box() {
        let floor = [Vector::new(-5.0, 0.0), Vector::new(5.0, 0.0)];
        let normal = (floor[1] - floor[0]).normalize().rperp();
        let normals = [normal, -normal];
        let segment = PolygonGeometry {
            vertices: &floor,
            normals: &normals,
            radius: 0.0,
        };
        let square = square_at(Vector::new(0.0, -0.95), 0.0);

        // The right-hand normal of a left-to-right segment points down into the box.
        let manifold = collide_polygons(&segment, &geometry(&square));
        assert_relative_eq!(manifold.normal, Vector::NEG_Y, epsilon = 1e-9);
        assert_eq!(manifold.points.len(), 2);
        for point in &manifold.points {
            assert_relative_eq!(point.distance, -0.05, epsilon = 1e-9);
        }
    }

    #[test]
    fn rounded_corners_touch_through_vertices() {
        let mut a = Polygon::rectangle(2.0, 2.0, 0.5).unwrap();
        a.update(&Transform::IDENTITY);
        let mut b = Polygon::rectangle(2.0, 2.0, 0.5).unwrap();
        b.update(&Transform::translate(Vector::new(2.5, 2.5)));

        let manifold = collide_polygons(&geometry(&a), &geometry(&b));
        assert_eq!(manifold.points.len(), 1);
        let expected = Vector::new(1.0, 1.0).normalize();
        assert_relative_eq!(manifold.normal, expected, epsilon = 1e-9);
        assert_relative_eq!(
            manifold.points[0].distance,
            Scalar::sqrt(0.5) - 1.0,
            epsilon = 1e-9
        );
    }
}
