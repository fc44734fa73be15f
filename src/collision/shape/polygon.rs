use super::{ShapeGeometry, circle::circle_segment_query, convex_hull::convex_hull};
use crate::{
    PhysicsError, Result,
    dynamics::rigid_body::mass_properties::{
        MassInfo, area_for_poly, centroid_for_poly, moment_for_poly,
    },
    math::*,
    spatial_query::{PointQueryInfo, SegmentQueryInfo},
};

/// A convex polygon with counterclockwise winding and an optional rounding radius.
///
/// Edge `i` goes from vertex `i` to vertex `i + 1`, and normal `i` is the outward unit
/// normal of that edge.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Polygon {
    pub(crate) vertices: Vec<Vector>,
    pub(crate) normals: Vec<Vector>,
    pub(crate) radius: Scalar,

    pub(crate) world_vertices: Vec<Vector>,
    pub(crate) world_normals: Vec<Vector>,
}

impl Polygon {
    /// Creates a polygon from the convex hull of `vertices` after applying `transform` to them.
    ///
    /// Vertices that are not part of the hull are discarded.
    pub fn new(vertices: &[Vector], transform: Transform, radius: Scalar) -> Result<Self> {
        validate_radius(radius)?;
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(PhysicsError::InvalidGeometry(
                "polygon vertices must be finite".to_string(),
            ));
        }

        let transformed: Vec<Vector> = vertices.iter().map(|&v| transform.point(v)).collect();
        let (hull, _) = convex_hull(&transformed, 0.0);
        if hull.len() < 3 {
            return Err(PhysicsError::InvalidGeometry(format!(
                "a polygon needs at least 3 vertices in convex position, found {}",
                hull.len()
            )));
        }
        if hull.len() < vertices.len() {
            tracing::warn!(
                "polygon vertices were reduced to their convex hull ({} of {} kept)",
                hull.len(),
                vertices.len()
            );
        }

        Ok(Self::from_hull(hull, radius))
    }

    /// Creates a polygon from vertices that are already convex with counterclockwise winding.
    ///
    /// Unlike [`Polygon::new`], no transform is applied and no hull is computed.
    /// Vertices that are not convex or are wound clockwise are rejected.
    pub fn new_raw(vertices: &[Vector], radius: Scalar) -> Result<Self> {
        validate_radius(radius)?;
        validate_convex(vertices)?;
        Ok(Self::from_hull(vertices.to_vec(), radius))
    }

    /// Creates a box centered on the body origin.
    pub fn rectangle(width: Scalar, height: Scalar, radius: Scalar) -> Result<Self> {
        let half_width = width * 0.5;
        let half_height = height * 0.5;
        Self::from_bounding_box(
            BoundingBox::from_edges(-half_width, -half_height, half_width, half_height),
            radius,
        )
    }

    /// Creates a box covering the given bounding box in the local space of the body.
    pub fn from_bounding_box(bb: BoundingBox, radius: Scalar) -> Result<Self> {
        let vertices = [
            Vector::new(bb.max.x, bb.min.y),
            Vector::new(bb.max.x, bb.max.y),
            Vector::new(bb.min.x, bb.max.y),
            Vector::new(bb.min.x, bb.min.y),
        ];
        Self::new_raw(&vertices, radius)
    }

    fn from_hull(vertices: Vec<Vector>, radius: Scalar) -> Self {
        let normals = edge_normals(&vertices);
        Self {
            world_vertices: vertices.clone(),
            world_normals: normals.clone(),
            vertices,
            normals,
            radius,
        }
    }

    /// The number of vertices.
    #[inline]
    pub fn count(&self) -> usize {
        self.vertices.len()
    }

    /// The vertices in the local space of the body.
    #[inline]
    pub fn vertices(&self) -> &[Vector] {
        &self.vertices
    }

    /// The outward edge normals in the local space of the body.
    #[inline]
    pub fn normals(&self) -> &[Vector] {
        &self.normals
    }

    /// The vertices in world space, as of the last update.
    #[inline]
    pub fn world_vertices(&self) -> &[Vector] {
        &self.world_vertices
    }

    /// The outward edge normals in world space, as of the last update.
    #[inline]
    pub fn world_normals(&self) -> &[Vector] {
        &self.world_normals
    }

    /// The rounding radius.
    #[inline]
    pub fn radius(&self) -> Scalar {
        self.radius
    }
}

impl ShapeGeometry for Polygon {
    fn update(&mut self, transform: &Transform) -> BoundingBox {
        let mut min = Vector::splat(Scalar::INFINITY);
        let mut max = Vector::splat(Scalar::NEG_INFINITY);

        for (world, &local) in self.world_vertices.iter_mut().zip(&self.vertices) {
            *world = transform.point(local);
            min = min.min(*world);
            max = max.max(*world);
        }
        for (world, &local) in self.world_normals.iter_mut().zip(&self.normals) {
            *world = transform.vect(local);
        }

        BoundingBox::new(min, max).grow(self.radius)
    }

    fn mass_info(&self, mass: Scalar) -> MassInfo {
        let centroid = centroid_for_poly(&self.vertices);
        MassInfo {
            mass,
            moment_per_mass: moment_for_poly(1.0, &self.vertices, -centroid, self.radius),
            center_of_gravity: centroid,
            area: area_for_poly(&self.vertices, self.radius),
        }
    }

    fn point_query(&self, point: Vector) -> PointQueryInfo {
        let count = self.world_vertices.len();
        let mut outside = false;
        let mut min_distance = Scalar::INFINITY;
        let mut closest_point = Vector::ZERO;
        let mut closest_normal = Vector::ZERO;

        for i in 0..count {
            let v1 = self.world_vertices[i];
            let v2 = self.world_vertices[(i + 1) % count];
            let normal = self.world_normals[i];

            outside = outside || normal.dot(point - v1) > 0.0;

            let closest = closest_point_on_segment(point, v1, v2);
            let distance = point.distance(closest);
            if distance < min_distance {
                min_distance = distance;
                closest_point = closest;
                closest_normal = normal;
            }
        }

        let distance = if outside { min_distance } else { -min_distance };
        let gradient = if min_distance > MAGIC_EPSILON {
            (point - closest_point) / distance
        } else {
            closest_normal
        };

        PointQueryInfo {
            shape: None,
            point: closest_point + gradient * self.radius,
            distance: distance - self.radius,
            gradient,
        }
    }

    fn segment_query(&self, a: Vector, b: Vector, radius: Scalar) -> Option<SegmentQueryInfo> {
        let count = self.world_vertices.len();
        let rsum = self.radius + radius;
        let mut hit: Option<SegmentQueryInfo> = None;

        for i in 0..count {
            let normal = self.world_normals[i];
            let v1 = self.world_vertices[i];
            let v2 = self.world_vertices[(i + 1) % count];

            let an = a.dot(normal);
            let d = an - v1.dot(normal) - rsum;
            if d < 0.0 {
                continue;
            }

            let bn = b.dot(normal);
            let t = d / (an - bn);
            if !(0.0..=1.0).contains(&t) {
                continue;
            }

            // The hit must be within the extents of the edge.
            let point = a.lerp(b, t);
            let dt = cross(normal, point);
            if cross(normal, v1) <= dt && dt <= cross(normal, v2) {
                hit = Some(SegmentQueryInfo {
                    shape: None,
                    point: point - normal * radius,
                    normal,
                    alpha: t,
                });
            }
        }

        // Beveled corners.
        if rsum > 0.0 {
            for &vertex in &self.world_vertices {
                let Some(corner) = circle_segment_query(vertex, self.radius, a, b, radius) else {
                    continue;
                };
                if hit.as_ref().is_none_or(|hit| corner.alpha < hit.alpha) {
                    hit = Some(corner);
                }
            }
        }

        hit
    }
}

/// Computes the outward normals of a counterclockwise polygon.
fn edge_normals(vertices: &[Vector]) -> Vec<Vector> {
    let count = vertices.len();
    (0..count)
        .map(|i| {
            (vertices[(i + 1) % count] - vertices[i])
                .normalize_or_zero()
                .rperp()
        })
        .collect()
}

fn validate_radius(radius: Scalar) -> Result<()> {
    if radius.is_finite() && radius >= 0.0 {
        Ok(())
    } else {
        Err(PhysicsError::InvalidGeometry(format!(
            "the rounding radius must be finite and non-negative, got {radius}"
        )))
    }
}

fn validate_convex(vertices: &[Vector]) -> Result<()> {
    let count = vertices.len();
    if count < 3 {
        return Err(PhysicsError::InvalidGeometry(format!(
            "a polygon needs at least 3 vertices, found {count}"
        )));
    }
    if vertices.iter().any(|v| !v.is_finite()) {
        return Err(PhysicsError::InvalidGeometry(
            "polygon vertices must be finite".to_string(),
        ));
    }

    for i in 0..count {
        let a = vertices[i];
        let b = vertices[(i + 1) % count];
        let c = vertices[(i + 2) % count];
        if cross(b - a, c - b) < 0.0 {
            return Err(PhysicsError::InvalidGeometry(
                "polygon vertices must be convex with counterclockwise winding".to_string(),
            ));
        }
    }

    if area_for_poly(vertices, 0.0) <= 0.0 {
        return Err(PhysicsError::InvalidGeometry(
            "polygon has no area".to_string(),
        ));
    }

    Ok(())
}
