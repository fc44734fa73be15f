//! Rigid bodies and their mass properties.

pub mod mass_properties;

use core::any::Any;
use core::fmt;

use crate::{
    PhysicsError, Result,
    dynamics::sleeping::SleepState,
    math::*,
    space::{BodyHandle, ConstraintHandle, ShapeHandle},
};
use mass_properties::MassInfo;

/// The type of a [`Body`], determining how it is simulated.
///
/// - **Dynamic bodies** are affected by gravity, forces and contacts.
/// - **Kinematic bodies** are only moved by their velocity, which is set by the user.
///   They have infinite mass, so contacts and constraints never change their velocity.
/// - **Static bodies** never move on their own and are only repositioned by the user.
///   Every [`Space`](crate::space::Space) owns an implicit static body for anchoring
///   world-fixed shapes and constraints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum BodyType {
    /// A body that is simulated by forces and contacts.
    #[default]
    Dynamic,
    /// A body with infinite mass that moves with a user-controlled velocity.
    Kinematic,
    /// A body that does not move.
    Static,
}

impl BodyType {
    /// Returns `true` if the body is dynamic.
    #[inline]
    pub fn is_dynamic(self) -> bool {
        self == Self::Dynamic
    }

    /// Returns `true` if the body is kinematic.
    #[inline]
    pub fn is_kinematic(self) -> bool {
        self == Self::Kinematic
    }

    /// Returns `true` if the body is static.
    #[inline]
    pub fn is_static(self) -> bool {
        self == Self::Static
    }
}

/// A custom velocity integrator called with the gravity, damping and time step.
pub type VelocityUpdateFn = Box<dyn FnMut(&mut Body, Vector, Scalar, Scalar) + Send>;

/// A custom position integrator called with the time step.
pub type PositionUpdateFn = Box<dyn FnMut(&mut Body, Scalar) + Send>;

/// A non-deformable body.
///
/// # Body Types
///
/// A body is either [dynamic](BodyType::Dynamic), [kinematic](BodyType::Kinematic)
/// or [static](BodyType::Static). The type of a body in a space can be changed with
/// [`Space::set_body_type`](crate::space::Space::set_body_type), which also moves its
/// shapes to the spatial index used for that type.
///
/// # Position and Center of Gravity
///
/// The position of a body is the location of its origin, and its shapes are positioned
/// relative to it. Bodies rotate around their center of gravity, which is computed from
/// the attached shapes unless it is set manually.
///
/// # Mass
///
/// The mass and moment of inertia of a dynamic body are recomputed from its shapes when
/// a shape with mass is added or removed, or when the mass of one of its shapes changes.
/// Setting them directly with [`Body::set_mass`] and [`Body::set_moment`] overrides the
/// computed values until the next recomputation.
///
/// # Integration
///
/// Each step, the velocity of every awake dynamic body is integrated with
/// [`Body::update_velocity`] and the position of every awake non-static body with
/// [`Body::update_position`]. Both can be replaced with custom functions, which may still
/// call the default integrators.
///
/// ```
/// use rigid2d::prelude::*;
///
/// let mut body = Body::dynamic(1.0, 1.0);
/// // A body that ignores gravity.
/// body.set_velocity_update_fn(|body, _gravity, damping, dt| {
///     body.update_velocity(Vector::ZERO, damping, dt);
/// });
/// ```
pub struct Body {
    pub(crate) body_type: BodyType,
    pub(crate) handle: Option<BodyHandle>,

    pub(crate) mass: Scalar,
    pub(crate) inv_mass: Scalar,
    pub(crate) moment: Scalar,
    pub(crate) inv_moment: Scalar,
    pub(crate) center_of_gravity: Vector,

    /// The world-space position of the center of gravity.
    pub(crate) p: Vector,
    pub(crate) velocity: Vector,
    pub(crate) force: Vector,
    pub(crate) angle: Scalar,
    pub(crate) angular_velocity: Scalar,
    pub(crate) torque: Scalar,
    pub(crate) transform: Transform,

    pub(crate) v_bias: Vector,
    pub(crate) w_bias: Scalar,

    pub(crate) sleep: SleepState,

    pub(crate) velocity_update: Option<VelocityUpdateFn>,
    pub(crate) position_update: Option<PositionUpdateFn>,

    pub(crate) shapes: Vec<ShapeHandle>,
    pub(crate) constraints: Vec<ConstraintHandle>,
    user_data: Option<Box<dyn Any + Send>>,
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("body_type", &self.body_type)
            .field("handle", &self.handle)
            .field("mass", &self.mass)
            .field("moment", &self.moment)
            .field("center_of_gravity", &self.center_of_gravity)
            .field("position", &self.position())
            .field("velocity", &self.velocity)
            .field("angle", &self.angle)
            .field("angular_velocity", &self.angular_velocity)
            .field("sleep", &self.sleep)
            .field("shapes", &self.shapes)
            .field("constraints", &self.constraints)
            .finish_non_exhaustive()
    }
}

impl Body {
    fn new(body_type: BodyType, mass: Scalar, moment: Scalar) -> Self {
        let mut body = Self {
            body_type,
            handle: None,
            mass,
            inv_mass: mass.recip_or_zero(),
            moment,
            inv_moment: moment.recip_or_zero(),
            center_of_gravity: Vector::ZERO,
            p: Vector::ZERO,
            velocity: Vector::ZERO,
            force: Vector::ZERO,
            angle: 0.0,
            angular_velocity: 0.0,
            torque: 0.0,
            transform: Transform::IDENTITY,
            v_bias: Vector::ZERO,
            w_bias: 0.0,
            sleep: SleepState::default(),
            velocity_update: None,
            position_update: None,
            shapes: Vec::new(),
            constraints: Vec::new(),
            user_data: None,
        };
        if body_type.is_static() {
            body.sleep.idle_time = Scalar::INFINITY;
        }
        body
    }

    /// Creates a dynamic body with the given mass and moment of inertia.
    ///
    /// The values are replaced by the mass properties of the shapes once a shape
    /// with mass is attached.
    pub fn dynamic(mass: Scalar, moment: Scalar) -> Self {
        Self::new(BodyType::Dynamic, mass, moment)
    }

    /// Creates a kinematic body.
    pub fn kinematic() -> Self {
        Self::new(BodyType::Kinematic, Scalar::INFINITY, Scalar::INFINITY)
    }

    /// Creates a static body.
    pub fn static_body() -> Self {
        Self::new(BodyType::Static, Scalar::INFINITY, Scalar::INFINITY)
    }

    /// Returns the body at the given position.
    pub fn with_position(mut self, position: Vector) -> Self {
        self.set_position(position);
        self
    }

    /// Returns the body with the given rotation angle in radians.
    pub fn with_angle(mut self, angle: Scalar) -> Self {
        self.set_angle(angle);
        self
    }

    /// Returns the body with the given linear velocity.
    pub fn with_velocity(mut self, velocity: Vector) -> Self {
        self.velocity = velocity;
        self
    }

    /// Returns the body with the given angular velocity.
    pub fn with_angular_velocity(mut self, angular_velocity: Scalar) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// The handle of the body if it belongs to a space.
    #[inline]
    pub fn handle(&self) -> Option<BodyHandle> {
        self.handle
    }

    /// The type of the body.
    #[inline]
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// Changes the type of a body that is not in a space.
    ///
    /// Bodies in a space must be changed with
    /// [`Space::set_body_type`](crate::space::Space::set_body_type).
    pub(crate) fn apply_body_type(&mut self, body_type: BodyType, shape_mass: &[MassInfo]) {
        if self.body_type == body_type {
            return;
        }
        self.body_type = body_type;
        self.sleep.idle_time = if body_type.is_static() {
            Scalar::INFINITY
        } else {
            0.0
        };

        if body_type.is_dynamic() {
            self.mass = 0.0;
            self.moment = 0.0;
            self.inv_mass = Scalar::INFINITY;
            self.inv_moment = Scalar::INFINITY;
            self.accumulate_mass(shape_mass.iter().copied());
        } else {
            self.mass = Scalar::INFINITY;
            self.moment = Scalar::INFINITY;
            self.inv_mass = 0.0;
            self.inv_moment = 0.0;
            self.velocity = Vector::ZERO;
            self.angular_velocity = 0.0;
        }
    }

    /// Recomputes the mass, moment of inertia and center of gravity from the mass
    /// properties of the attached shapes, keeping the position of the body origin.
    ///
    /// Only dynamic bodies are affected.
    pub(crate) fn accumulate_mass(&mut self, shapes: impl IntoIterator<Item = MassInfo>) {
        if !self.body_type.is_dynamic() {
            return;
        }

        let position = self.position();
        self.mass = 0.0;
        self.moment = 0.0;
        self.center_of_gravity = Vector::ZERO;

        for info in shapes {
            let mass = info.mass;
            if mass > 0.0 {
                let mass_sum = self.mass + mass;
                self.moment += info.moment()
                    + self.center_of_gravity.distance_squared(info.center_of_gravity) * (mass * self.mass)
                        / mass_sum;
                self.center_of_gravity = self
                    .center_of_gravity
                    .lerp(info.center_of_gravity, mass / mass_sum);
                self.mass = mass_sum;
            }
        }

        if self.mass <= 0.0 || !self.mass.is_finite() {
            tracing::warn!(
                "dynamic body {:?} has no mass after summing its shapes; it will not respond to forces",
                self.handle
            );
        }
        self.inv_mass = self.mass.recip_or_zero();
        self.inv_moment = self.moment.recip_or_zero();

        self.set_position(position);
    }

    /// The mass of the body.
    #[inline]
    pub fn mass(&self) -> Scalar {
        self.mass
    }

    /// The inverse of the mass, zero for infinite mass.
    #[inline]
    pub fn inverse_mass(&self) -> Scalar {
        self.inv_mass
    }

    /// Sets the mass of a dynamic body. The mass must be positive and finite.
    pub fn set_mass(&mut self, mass: Scalar) -> Result<()> {
        if !self.body_type.is_dynamic() {
            return Err(PhysicsError::InvalidArgument(
                "only dynamic bodies have a mass that can be set".to_string(),
            ));
        }
        if !(mass > 0.0 && mass.is_finite()) {
            return Err(PhysicsError::InvalidArgument(format!(
                "mass must be positive and finite, got {mass}"
            )));
        }
        self.mass = mass;
        self.inv_mass = mass.recip();
        Ok(())
    }

    /// The moment of inertia of the body.
    #[inline]
    pub fn moment(&self) -> Scalar {
        self.moment
    }

    /// The inverse of the moment of inertia, zero for infinite moment.
    #[inline]
    pub fn inverse_moment(&self) -> Scalar {
        self.inv_moment
    }

    /// Sets the moment of inertia of a dynamic body. The moment must be positive.
    pub fn set_moment(&mut self, moment: Scalar) -> Result<()> {
        if !self.body_type.is_dynamic() {
            return Err(PhysicsError::InvalidArgument(
                "only dynamic bodies have a moment of inertia that can be set".to_string(),
            ));
        }
        if !(moment > 0.0) {
            return Err(PhysicsError::InvalidArgument(format!(
                "moment of inertia must be positive, got {moment}"
            )));
        }
        self.moment = moment;
        self.inv_moment = moment.recip_or_zero();
        Ok(())
    }

    /// The center of gravity in the local space of the body.
    #[inline]
    pub fn center_of_gravity(&self) -> Vector {
        self.center_of_gravity
    }

    /// Sets the center of gravity in the local space of the body.
    ///
    /// The center of gravity stays fixed in world space, so the body origin moves.
    pub fn set_center_of_gravity(&mut self, center_of_gravity: Vector) {
        self.center_of_gravity = center_of_gravity;
        self.update_transform();
    }

    /// The position of the body origin in world space.
    #[inline]
    pub fn position(&self) -> Vector {
        self.transform.translation()
    }

    /// Moves the body origin to `position`.
    pub fn set_position(&mut self, position: Vector) {
        self.p = self.transform.vect(self.center_of_gravity) + position;
        self.update_transform();
    }

    /// The position of the center of gravity in world space.
    #[inline]
    pub fn world_center_of_gravity(&self) -> Vector {
        self.p
    }

    /// The rotation angle in radians.
    #[inline]
    pub fn angle(&self) -> Scalar {
        self.angle
    }

    /// Sets the rotation angle in radians, rotating around the center of gravity.
    pub fn set_angle(&mut self, angle: Scalar) {
        self.angle = angle;
        self.update_transform();
    }

    /// The rotation as a unit vector `(cos, sin)`.
    #[inline]
    pub fn rotation(&self) -> Vector {
        Vector::new(self.transform.a, self.transform.b)
    }

    /// The transform from the local space of the body to world space.
    #[inline]
    pub fn transform(&self) -> Transform {
        self.transform
    }

    fn update_transform(&mut self) {
        let rotation = Vector::from_angle(self.angle);
        let origin = self.p - self.center_of_gravity.rotate(rotation);
        self.transform = Transform::from_rotation_vector(origin, rotation);
    }

    /// The linear velocity of the center of gravity.
    #[inline]
    pub fn velocity(&self) -> Vector {
        self.velocity
    }

    /// Sets the linear velocity.
    #[inline]
    pub fn set_velocity(&mut self, velocity: Vector) {
        self.velocity = velocity;
    }

    /// The angular velocity in radians per second.
    #[inline]
    pub fn angular_velocity(&self) -> Scalar {
        self.angular_velocity
    }

    /// Sets the angular velocity.
    #[inline]
    pub fn set_angular_velocity(&mut self, angular_velocity: Scalar) {
        self.angular_velocity = angular_velocity;
    }

    /// The force applied to the center of gravity during the current step.
    #[inline]
    pub fn force(&self) -> Vector {
        self.force
    }

    /// Sets the accumulated force. It is reset after every step.
    #[inline]
    pub fn set_force(&mut self, force: Vector) {
        self.force = force;
    }

    /// The torque applied during the current step.
    #[inline]
    pub fn torque(&self) -> Scalar {
        self.torque
    }

    /// Sets the accumulated torque. It is reset after every step.
    #[inline]
    pub fn set_torque(&mut self, torque: Scalar) {
        self.torque = torque;
    }

    /// Converts a point from the local space of the body to world space.
    #[inline]
    pub fn local_to_world(&self, point: Vector) -> Vector {
        self.transform.point(point)
    }

    /// Converts a point from world space to the local space of the body.
    #[inline]
    pub fn world_to_local(&self, point: Vector) -> Vector {
        self.transform.rigid_inverse().point(point)
    }

    /// Applies a force at a point in world space.
    pub fn apply_force_at_world_point(&mut self, force: Vector, point: Vector) {
        self.force += force;
        let r = point - self.p;
        self.torque += cross(r, force);
    }

    /// Applies a force given in local space at a point in local space.
    pub fn apply_force_at_local_point(&mut self, force: Vector, point: Vector) {
        self.apply_force_at_world_point(self.transform.vect(force), self.transform.point(point));
    }

    /// Applies an impulse at a point in world space.
    pub fn apply_impulse_at_world_point(&mut self, impulse: Vector, point: Vector) {
        let r = point - self.p;
        self.apply_impulse(impulse, r);
    }

    /// Applies an impulse given in local space at a point in local space.
    pub fn apply_impulse_at_local_point(&mut self, impulse: Vector, point: Vector) {
        self.apply_impulse_at_world_point(
            self.transform.vect(impulse),
            self.transform.point(point),
        );
    }

    /// Applies an impulse at the offset `r` from the center of gravity.
    #[inline]
    pub(crate) fn apply_impulse(&mut self, impulse: Vector, r: Vector) {
        self.velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_moment * cross(r, impulse);
    }

    /// Applies a bias impulse used for position correction at the offset `r`.
    #[inline]
    pub(crate) fn apply_bias_impulse(&mut self, impulse: Vector, r: Vector) {
        self.v_bias += impulse * self.inv_mass;
        self.w_bias += self.inv_moment * cross(r, impulse);
    }

    /// The velocity of a point given in world space that is attached to the body.
    pub fn velocity_at_world_point(&self, point: Vector) -> Vector {
        let r = point - self.p;
        self.velocity + r.perp() * self.angular_velocity
    }

    /// The velocity of a point given in local space that is attached to the body.
    pub fn velocity_at_local_point(&self, point: Vector) -> Vector {
        let r = self.transform.vect(point - self.center_of_gravity);
        self.velocity + r.perp() * self.angular_velocity
    }

    /// The kinetic energy of the body, `m * |v|^2 + I * w^2`.
    ///
    /// This is twice the physical kinetic energy, which is the quantity compared
    /// against the idle speed threshold when deciding whether the body can sleep.
    pub fn kinetic_energy(&self) -> Scalar {
        let vsq = self.velocity.length_squared();
        let wsq = self.angular_velocity * self.angular_velocity;
        (if vsq != 0.0 { vsq * self.mass } else { 0.0 })
            + (if wsq != 0.0 { wsq * self.moment } else { 0.0 })
    }

    /// The time in seconds that the body has been resting.
    #[inline]
    pub fn idle_time(&self) -> Scalar {
        self.sleep.idle_time
    }

    /// Returns `true` if the body is sleeping.
    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.sleep.group.is_some()
    }

    /// The handles of the shapes attached to the body.
    #[inline]
    pub fn shapes(&self) -> &[ShapeHandle] {
        &self.shapes
    }

    /// The handles of the constraints attached to the body.
    #[inline]
    pub fn constraints(&self) -> &[ConstraintHandle] {
        &self.constraints
    }

    /// User data attached to the body.
    pub fn user_data(&self) -> Option<&(dyn Any + Send)> {
        self.user_data.as_deref()
    }

    /// Mutable user data attached to the body.
    pub fn user_data_mut(&mut self) -> Option<&mut (dyn Any + Send)> {
        self.user_data.as_deref_mut()
    }

    /// Attaches user data to the body, returning the previous data.
    pub fn set_user_data(&mut self, data: impl Any + Send) -> Option<Box<dyn Any + Send>> {
        self.user_data.replace(Box::new(data))
    }

    /// Replaces the velocity integrator of the body.
    pub fn set_velocity_update_fn(
        &mut self,
        update: impl FnMut(&mut Body, Vector, Scalar, Scalar) + Send + 'static,
    ) {
        self.velocity_update = Some(Box::new(update));
    }

    /// Restores the default velocity integrator.
    pub fn clear_velocity_update_fn(&mut self) {
        self.velocity_update = None;
    }

    /// Replaces the position integrator of the body.
    pub fn set_position_update_fn(&mut self, update: impl FnMut(&mut Body, Scalar) + Send + 'static) {
        self.position_update = Some(Box::new(update));
    }

    /// Restores the default position integrator.
    pub fn clear_position_update_fn(&mut self) {
        self.position_update = None;
    }

    /// The default velocity integrator.
    ///
    /// Kinematic bodies are skipped. The accumulated force and torque are reset.
    pub fn update_velocity(&mut self, gravity: Vector, damping: Scalar, dt: Scalar) {
        if self.body_type.is_kinematic() {
            return;
        }

        self.velocity = self.velocity * damping + (gravity + self.force * self.inv_mass) * dt;
        self.angular_velocity =
            self.angular_velocity * damping + self.torque * self.inv_moment * dt;

        self.force = Vector::ZERO;
        self.torque = 0.0;
    }

    /// The default position integrator.
    ///
    /// The bias velocities used for position correction are applied and reset.
    pub fn update_position(&mut self, dt: Scalar) {
        self.p += (self.velocity + self.v_bias) * dt;
        self.angle += (self.angular_velocity + self.w_bias) * dt;
        self.update_transform();

        self.v_bias = Vector::ZERO;
        self.w_bias = 0.0;
    }

    /// Integrates the velocity with the custom integrator if there is one.
    pub(crate) fn integrate_velocity(&mut self, gravity: Vector, damping: Scalar, dt: Scalar) {
        match self.velocity_update.take() {
            Some(mut update) => {
                update(self, gravity, damping, dt);
                self.velocity_update.get_or_insert(update);
            }
            None => self.update_velocity(gravity, damping, dt),
        }
    }

    /// Integrates the position with the custom integrator if there is one.
    pub(crate) fn integrate_position(&mut self, dt: Scalar) {
        match self.position_update.take() {
            Some(mut update) => {
                update(self, dt);
                self.position_update.get_or_insert(update);
            }
            None => self.update_position(dt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn local_world_round_trip() {
        let mut body = Body::dynamic(1.0, 1.0);
        body.set_center_of_gravity(Vector::new(0.5, -0.25));
        body.set_angle(1.2);
        body.set_position(Vector::new(3.0, -2.0));

        let point = Vector::new(-7.0, 4.5);
        assert_relative_eq!(body.local_to_world(body.world_to_local(point)), point, epsilon = 1e-9);
        assert_relative_eq!(body.position(), Vector::new(3.0, -2.0), epsilon = 1e-9);
    }

    #[test]
    fn rotation_is_about_center_of_gravity() {
        let mut body = Body::dynamic(1.0, 1.0);
        body.set_center_of_gravity(Vector::new(1.0, 0.0));
        assert_relative_eq!(body.position(), Vector::new(-1.0, 0.0));

        // The body origin swings around the fixed center of gravity.
        body.set_angle(PI);
        assert_relative_eq!(body.world_center_of_gravity(), Vector::ZERO);
        assert_relative_eq!(body.position(), Vector::new(1.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn kinematic_bodies_skip_velocity_integration() {
        let mut body = Body::kinematic().with_velocity(Vector::X);
        body.update_velocity(Vector::new(0.0, -10.0), 0.5, 1.0);
        assert_eq!(body.velocity(), Vector::X);

        body.update_position(2.0);
        assert_relative_eq!(body.position(), Vector::new(2.0, 0.0));
    }

    #[test]
    fn force_is_applied_and_reset() {
        let mut body = Body::dynamic(2.0, 1.0);
        body.apply_force_at_world_point(Vector::new(4.0, 0.0), Vector::new(0.0, 1.0));
        assert_relative_eq!(body.torque(), -4.0);

        body.update_velocity(Vector::ZERO, 1.0, 0.5);
        assert_relative_eq!(body.velocity(), Vector::new(1.0, 0.0));
        assert_relative_eq!(body.angular_velocity(), -2.0);
        assert_eq!(body.force(), Vector::ZERO);
    }

    #[test]
    fn point_velocity_includes_rotation() {
        let body = Body::dynamic(1.0, 1.0)
            .with_velocity(Vector::new(1.0, 0.0))
            .with_angular_velocity(2.0);
        assert_relative_eq!(
            body.velocity_at_world_point(Vector::new(0.0, 1.0)),
            Vector::new(-1.0, 0.0)
        );
    }

    #[test]
    fn mass_accumulates_from_shapes() {
        let mut body = Body::dynamic(1.0, 1.0).with_position(Vector::new(5.0, 0.0));
        let shapes = [
            MassInfo {
                mass: 1.0,
                moment_per_mass: 0.5,
                center_of_gravity: Vector::new(-1.0, 0.0),
                area: 1.0,
            },
            MassInfo {
                mass: 1.0,
                moment_per_mass: 0.5,
                center_of_gravity: Vector::new(1.0, 0.0),
                area: 1.0,
            },
        ];
        body.accumulate_mass(shapes);
        assert_relative_eq!(body.mass(), 2.0);
        assert_relative_eq!(body.moment(), 1.0 + 2.0);
        assert_relative_eq!(body.center_of_gravity(), Vector::ZERO);
        assert_relative_eq!(body.position(), Vector::new(5.0, 0.0));
    }

    #[test]
    fn invalid_mass_is_rejected() {
        let mut body = Body::dynamic(1.0, 1.0);
        assert!(body.set_mass(0.0).is_err());
        assert!(body.set_mass(Scalar::INFINITY).is_err());
        assert!(Body::static_body().set_mass(1.0).is_err());
    }
}
