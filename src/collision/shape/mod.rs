//! Collision shapes and their geometry.
//!
//! A [`Shape`] wraps one of the supported geometries in [`ShapeKind`] together with its
//! material, filtering and mass properties. Shapes are attached to a body when they are
//! added to a [`Space`](crate::space::Space), and their world-space geometry is refreshed
//! from the body transform every step.

mod circle;
pub mod convex_hull;
mod polygon;
mod segment;

pub use circle::Circle;
pub use convex_hull::convex_hull;
pub use polygon::Polygon;
pub use segment::Segment;

use crate::{
    PhysicsError, Result,
    collision::layers::{CollisionType, ShapeFilter},
    dynamics::rigid_body::mass_properties::MassInfo,
    math::*,
    space::{BodyHandle, ShapeHandle},
    spatial_query::{PointQueryInfo, SegmentQueryInfo},
};

/// The geometric operations shared by every shape variant.
///
/// Queries operate on the world-space geometry computed by the last call to
/// [`ShapeGeometry::update`].
pub trait ShapeGeometry {
    /// Moves the geometry to world space with the body `transform` and returns the new bounding box.
    fn update(&mut self, transform: &Transform) -> BoundingBox;

    /// Computes the mass properties of the geometry in the local space of the body for the given `mass`.
    fn mass_info(&self, mass: Scalar) -> MassInfo;

    /// Finds the closest point on the surface of the shape.
    ///
    /// The distance is negative if the point is inside of the shape.
    fn point_query(&self, point: Vector) -> PointQueryInfo;

    /// Casts a segment from `a` to `b` with a thickness of `radius` against the shape.
    fn segment_query(&self, a: Vector, b: Vector, radius: Scalar) -> Option<SegmentQueryInfo>;
}

/// The geometry of a [`Shape`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ShapeKind {
    /// A circle.
    Circle(Circle),
    /// A segment, optionally rounded into a capsule.
    Segment(Segment),
    /// A convex polygon, optionally with rounded corners.
    Polygon(Polygon),
}

impl ShapeKind {
    /// The rank used to order shape pairs for collision detection.
    #[inline]
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::Circle(_) => 0,
            Self::Segment(_) => 1,
            Self::Polygon(_) => 2,
        }
    }
}

impl ShapeGeometry for ShapeKind {
    fn update(&mut self, transform: &Transform) -> BoundingBox {
        match self {
            Self::Circle(circle) => circle.update(transform),
            Self::Segment(segment) => segment.update(transform),
            Self::Polygon(polygon) => polygon.update(transform),
        }
    }

    fn mass_info(&self, mass: Scalar) -> MassInfo {
        match self {
            Self::Circle(circle) => circle.mass_info(mass),
            Self::Segment(segment) => segment.mass_info(mass),
            Self::Polygon(polygon) => polygon.mass_info(mass),
        }
    }

    fn point_query(&self, point: Vector) -> PointQueryInfo {
        match self {
            Self::Circle(circle) => circle.point_query(point),
            Self::Segment(segment) => segment.point_query(point),
            Self::Polygon(polygon) => polygon.point_query(point),
        }
    }

    fn segment_query(&self, a: Vector, b: Vector, radius: Scalar) -> Option<SegmentQueryInfo> {
        match self {
            Self::Circle(circle) => circle.segment_query(a, b, radius),
            Self::Segment(segment) => segment.segment_query(a, b, radius),
            Self::Polygon(polygon) => polygon.segment_query(a, b, radius),
        }
    }
}

/// Collision geometry attached to a body.
///
/// The mass of a shape is authoritative: [`Shape::set_density`] converts the density
/// to a mass using the current area, and [`Shape::density`] is derived from the mass.
/// Changing the mass or geometry of a shape that belongs to a space marks it dirty,
/// and the mass of its body is recomputed at the start of the next step.
///
/// ```
/// use rigid2d::prelude::*;
///
/// let mut ball = Shape::circle(0.5, Vector::ZERO).unwrap();
/// ball.set_friction(0.7);
/// ball.set_density(2.0);
/// assert!(ball.mass() > 0.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Shape {
    pub(crate) kind: ShapeKind,
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub(crate) handle: Option<ShapeHandle>,
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub(crate) body: Option<BodyHandle>,
    pub(crate) mass_info: MassInfo,
    pub(crate) mass_dirty: bool,
    pub(crate) elasticity: Scalar,
    pub(crate) friction: Scalar,
    pub(crate) surface_velocity: Vector,
    pub(crate) sensor: bool,
    pub(crate) collision_type: CollisionType,
    pub(crate) filter: ShapeFilter,
    pub(crate) bb: BoundingBox,
}

impl Shape {
    /// Creates a shape from geometry with zero mass and default material properties.
    pub fn new(kind: ShapeKind) -> Self {
        let mass_info = kind.mass_info(0.0);
        Self {
            kind,
            handle: None,
            body: None,
            mass_info,
            mass_dirty: false,
            elasticity: 0.0,
            friction: 0.0,
            surface_velocity: Vector::ZERO,
            sensor: false,
            collision_type: 0,
            filter: ShapeFilter::ALL,
            bb: BoundingBox::default(),
        }
    }

    /// Creates a circle with the given `radius` whose center is at `offset` from the body origin.
    pub fn circle(radius: Scalar, offset: Vector) -> Result<Self> {
        if !radius.is_finite() || radius < 0.0 || !offset.is_finite() {
            return Err(PhysicsError::InvalidGeometry(format!(
                "a circle needs a finite, non-negative radius and a finite offset, got radius {radius}"
            )));
        }
        Ok(Self::new(ShapeKind::Circle(Circle::new(radius, offset))))
    }

    /// Creates a segment from `a` to `b` rounded by `radius`.
    pub fn segment(a: Vector, b: Vector, radius: Scalar) -> Result<Self> {
        validate_segment(a, b, radius)?;
        Ok(Self::new(ShapeKind::Segment(Segment::new(a, b, radius))))
    }

    /// Creates a polygon from the convex hull of `vertices` transformed by `transform`.
    pub fn polygon(vertices: &[Vector], transform: Transform, radius: Scalar) -> Result<Self> {
        Polygon::new(vertices, transform, radius).map(|polygon| Self::new(ShapeKind::Polygon(polygon)))
    }

    /// Creates a polygon from vertices that are already convex with counterclockwise winding.
    pub fn polygon_raw(vertices: &[Vector], radius: Scalar) -> Result<Self> {
        Polygon::new_raw(vertices, radius).map(|polygon| Self::new(ShapeKind::Polygon(polygon)))
    }

    /// Creates a box of the given size centered on the body origin.
    pub fn box_shape(width: Scalar, height: Scalar, radius: Scalar) -> Result<Self> {
        Polygon::rectangle(width, height, radius).map(|polygon| Self::new(ShapeKind::Polygon(polygon)))
    }

    /// Creates a box covering `bb` in the local space of the body.
    pub fn box_from_bb(bb: BoundingBox, radius: Scalar) -> Result<Self> {
        Polygon::from_bounding_box(bb, radius).map(|polygon| Self::new(ShapeKind::Polygon(polygon)))
    }

    /// Returns the shape with the given mass.
    pub fn with_mass(mut self, mass: Scalar) -> Self {
        self.set_mass(mass);
        self
    }

    /// Returns the shape with the given density.
    pub fn with_density(mut self, density: Scalar) -> Self {
        self.set_density(density);
        self
    }

    /// Returns the shape with the given friction.
    pub fn with_friction(mut self, friction: Scalar) -> Self {
        self.friction = friction;
        self
    }

    /// Returns the shape with the given elasticity.
    pub fn with_elasticity(mut self, elasticity: Scalar) -> Self {
        self.elasticity = elasticity;
        self
    }

    /// Returns the shape with the given collision type.
    pub fn with_collision_type(mut self, collision_type: CollisionType) -> Self {
        self.collision_type = collision_type;
        self
    }

    /// Returns the shape with the given collision filter.
    pub fn with_filter(mut self, filter: ShapeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Returns the shape as a sensor or a solid shape.
    pub fn with_sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    /// The geometry of the shape.
    #[inline]
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// The handle of the shape if it belongs to a space.
    #[inline]
    pub fn handle(&self) -> Option<ShapeHandle> {
        self.handle
    }

    /// The body the shape is attached to if it belongs to a space.
    #[inline]
    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    /// The bounding box computed by the last update.
    #[inline]
    pub fn bb(&self) -> BoundingBox {
        self.bb
    }

    /// Moves the shape to world space with the given body transform and caches its bounding box.
    ///
    /// Shapes in a space are updated automatically. This is useful for shapes that are
    /// queried or collided without a space.
    pub fn update(&mut self, transform: &Transform) -> BoundingBox {
        self.bb = self.kind.update(transform);
        self.bb
    }

    /// The mass of the shape.
    #[inline]
    pub fn mass(&self) -> Scalar {
        self.mass_info.mass
    }

    /// Sets the mass of the shape.
    pub fn set_mass(&mut self, mass: Scalar) {
        self.mass_info = self.kind.mass_info(mass);
        self.mass_dirty = true;
    }

    /// The density of the shape, derived from its mass and area.
    pub fn density(&self) -> Scalar {
        self.mass_info.mass * self.mass_info.area.recip_or_zero()
    }

    /// Sets the mass of the shape to `density` times its area.
    pub fn set_density(&mut self, density: Scalar) {
        self.set_mass(density * self.area());
    }

    /// The moment of inertia of the shape about its center of gravity.
    #[inline]
    pub fn moment(&self) -> Scalar {
        self.mass_info.moment()
    }

    /// The area of the shape.
    #[inline]
    pub fn area(&self) -> Scalar {
        self.mass_info.area
    }

    /// The center of gravity of the shape in the local space of the body.
    #[inline]
    pub fn center_of_gravity(&self) -> Vector {
        self.mass_info.center_of_gravity
    }

    /// The coefficient of restitution.
    #[inline]
    pub fn elasticity(&self) -> Scalar {
        self.elasticity
    }

    /// Sets the coefficient of restitution. Values above `1.0` add energy to collisions.
    #[inline]
    pub fn set_elasticity(&mut self, elasticity: Scalar) {
        self.elasticity = elasticity;
    }

    /// The coefficient of friction.
    #[inline]
    pub fn friction(&self) -> Scalar {
        self.friction
    }

    /// Sets the coefficient of friction.
    #[inline]
    pub fn set_friction(&mut self, friction: Scalar) {
        self.friction = friction;
    }

    /// The velocity of the surface used for conveyor belt effects.
    #[inline]
    pub fn surface_velocity(&self) -> Vector {
        self.surface_velocity
    }

    /// Sets the velocity of the surface.
    #[inline]
    pub fn set_surface_velocity(&mut self, surface_velocity: Vector) {
        self.surface_velocity = surface_velocity;
    }

    /// Returns `true` if the shape only detects collisions without responding to them.
    #[inline]
    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    /// Sets whether the shape is a sensor.
    #[inline]
    pub fn set_sensor(&mut self, sensor: bool) {
        self.sensor = sensor;
    }

    /// The collision type used to select collision handlers.
    #[inline]
    pub fn collision_type(&self) -> CollisionType {
        self.collision_type
    }

    /// Sets the collision type.
    #[inline]
    pub fn set_collision_type(&mut self, collision_type: CollisionType) {
        self.collision_type = collision_type;
    }

    /// The collision filter.
    #[inline]
    pub fn filter(&self) -> ShapeFilter {
        self.filter
    }

    /// Sets the collision filter.
    #[inline]
    pub fn set_filter(&mut self, filter: ShapeFilter) {
        self.filter = filter;
    }

    /// Sets the neighboring endpoints of a segment in a chain.
    ///
    /// Returns an error if the shape is not a segment.
    pub fn set_segment_neighbors(&mut self, prev: Vector, next: Vector) -> Result<()> {
        match &mut self.kind {
            ShapeKind::Segment(segment) => {
                segment.set_neighbors(prev, next);
                Ok(())
            }
            _ => Err(PhysicsError::InvalidArgument(
                "segment neighbors can only be set on segments".to_string(),
            )),
        }
    }

    /// Moves the endpoints of a segment.
    ///
    /// Returns an error if the shape is not a segment or if the endpoints are invalid.
    pub fn set_segment_endpoints(&mut self, a: Vector, b: Vector) -> Result<()> {
        let ShapeKind::Segment(segment) = &mut self.kind else {
            return Err(PhysicsError::InvalidArgument(
                "segment endpoints can only be set on segments".to_string(),
            ));
        };
        validate_segment(a, b, segment.radius)?;
        segment.set_endpoints(a, b);
        self.refresh_mass_info();
        Ok(())
    }

    /// Sets the radius of a circle.
    pub fn set_circle_radius(&mut self, radius: Scalar) -> Result<()> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(PhysicsError::InvalidGeometry(format!(
                "a circle needs a finite, non-negative radius, got {radius}"
            )));
        }
        let ShapeKind::Circle(circle) = &mut self.kind else {
            return Err(PhysicsError::InvalidArgument(
                "the radius can only be set on circles".to_string(),
            ));
        };
        circle.radius = radius;
        self.refresh_mass_info();
        Ok(())
    }

    /// Replaces the vertices of a polygon with the hull of `vertices` transformed by `transform`.
    pub fn set_polygon_vertices(&mut self, vertices: &[Vector], transform: Transform) -> Result<()> {
        let ShapeKind::Polygon(polygon) = &mut self.kind else {
            return Err(PhysicsError::InvalidArgument(
                "vertices can only be set on polygons".to_string(),
            ));
        };
        *polygon = Polygon::new(vertices, transform, polygon.radius)?;
        self.refresh_mass_info();
        Ok(())
    }

    /// Replaces the vertices of a polygon without transforming them or computing a hull.
    pub fn set_polygon_vertices_raw(&mut self, vertices: &[Vector]) -> Result<()> {
        let ShapeKind::Polygon(polygon) = &mut self.kind else {
            return Err(PhysicsError::InvalidArgument(
                "vertices can only be set on polygons".to_string(),
            ));
        };
        *polygon = Polygon::new_raw(vertices, polygon.radius)?;
        self.refresh_mass_info();
        Ok(())
    }

    fn refresh_mass_info(&mut self) {
        self.set_mass(self.mass_info.mass);
    }

    /// Finds the closest point on the surface of the shape to `point`.
    ///
    /// The distance is negative if the point is inside of the shape.
    pub fn point_query(&self, point: Vector) -> PointQueryInfo {
        PointQueryInfo {
            shape: self.handle,
            ..self.kind.point_query(point)
        }
    }

    /// Casts a segment from `a` to `b` with a thickness of `radius` against the shape.
    ///
    /// A segment that starts inside of the shape hits it immediately with an alpha of zero.
    pub fn segment_query(&self, a: Vector, b: Vector, radius: Scalar) -> Option<SegmentQueryInfo> {
        let nearest = self.kind.point_query(a);
        let hit = if nearest.distance <= radius {
            let normal = (a - nearest.point).normalize_or(nearest.gradient);
            Some(SegmentQueryInfo {
                shape: None,
                point: nearest.point,
                normal,
                alpha: 0.0,
            })
        } else {
            self.kind.segment_query(a, b, radius)
        };

        hit.map(|hit| SegmentQueryInfo {
            shape: self.handle,
            ..hit
        })
    }
}

fn validate_segment(a: Vector, b: Vector, radius: Scalar) -> Result<()> {
    if !a.is_finite() || !b.is_finite() || !radius.is_finite() || radius < 0.0 {
        return Err(PhysicsError::InvalidGeometry(
            "segment endpoints and radius must be finite and the radius non-negative".to_string(),
        ));
    }
    if a == b {
        return Err(PhysicsError::InvalidGeometry(
            "segment endpoints must be distinct".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mass_is_authoritative_over_density() {
        let mut shape = Shape::box_shape(2.0, 2.0, 0.0).unwrap();
        shape.set_density(3.0);
        assert_relative_eq!(shape.mass(), 12.0);
        assert_relative_eq!(shape.density(), 3.0);

        shape.set_mass(2.0);
        assert_relative_eq!(shape.density(), 0.5);
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        assert!(Shape::circle(-1.0, Vector::ZERO).is_err());
        assert!(Shape::segment(Vector::ONE, Vector::ONE, 0.0).is_err());
        assert!(Shape::polygon(&[Vector::ZERO, Vector::X], Transform::IDENTITY, 0.0).is_err());
    }

    #[test]
    fn update_caches_bounding_box() {
        let mut shape = Shape::circle(1.0, Vector::ZERO).unwrap();
        let transform = Transform::rigid(Vector::new(2.0, 3.0), 0.5);
        let first = shape.update(&transform);
        let second = shape.update(&transform);
        assert_eq!(first, second);
        assert_eq!(shape.bb(), BoundingBox::from_edges(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn segment_query_starting_inside_hits_at_zero() {
        let mut shape = Shape::circle(1.0, Vector::ZERO).unwrap();
        shape.update(&Transform::IDENTITY);
        let hit = shape
            .segment_query(Vector::new(0.5, 0.0), Vector::new(5.0, 0.0), 0.0)
            .unwrap();
        assert_eq!(hit.alpha, 0.0);
        assert_relative_eq!(hit.point, Vector::new(1.0, 0.0));
        assert_relative_eq!(hit.normal, Vector::NEG_X);
    }

    #[test]
    fn neighbors_require_segment() {
        let mut circle = Shape::circle(1.0, Vector::ZERO).unwrap();
        assert!(circle.set_segment_neighbors(Vector::ZERO, Vector::X).is_err());
        let mut segment = Shape::segment(Vector::ZERO, Vector::X, 0.0).unwrap();
        assert!(segment.set_segment_neighbors(Vector::NEG_X, Vector::new(2.0, 0.0)).is_ok());
    }
}
