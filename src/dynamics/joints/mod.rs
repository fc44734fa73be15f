//! **Constraints** connect two bodies and restrict how they can move relative to each other.
//!
//! Every [`Constraint`] has a shared set of parameters and one of the [`ConstraintKind`] variants
//! that defines what it actually constrains:
//!
//! | Constraint               | Effect                                                         |
//! | ------------------------ | -------------------------------------------------------------- |
//! | [`PinJoint`]             | Keeps two anchors at a fixed distance, like a rigid rod.        |
//! | [`SlideJoint`]           | Keeps two anchors within a distance range, like a chain.        |
//! | [`PivotJoint`]           | Keeps two anchors at the same point, allowing rotation.         |
//! | [`GrooveJoint`]          | Keeps an anchor of the second body on a groove of the first.    |
//! | [`DampedSpring`]         | A spring with damping between two anchors.                      |
//! | [`DampedRotarySpring`]   | A spring with damping acting on the relative angle.             |
//! | [`RotaryLimitJoint`]     | Keeps the relative angle within a range.                        |
//! | [`RatchetJoint`]         | Lets the relative angle only increase, in ratchet steps.        |
//! | [`GearJoint`]            | Keeps the angular velocities at a fixed ratio.                  |
//! | [`SimpleMotor`]          | Drives the relative angular velocity towards a fixed rate.      |
//!
//! # Using Constraints
//!
//! Constraints are created with the constructors of [`Constraint`] and added to a space with
//! [`Space::add_constraint`]. Anchors are given in the local space of each body, relative to the
//! body origin.
//!
//! ```
//! use rigid2d::prelude::*;
//!
//! let mut space = Space::new();
//! let a = space.add_body(Body::dynamic(1.0, 1.0)).unwrap();
//! let b = space
//!     .add_body(Body::dynamic(1.0, 1.0).with_position(Vector::new(2.0, 0.0)))
//!     .unwrap();
//!
//! // Connect the bodies with a rigid rod between their centers.
//! let pin = space
//!     .add_constraint(Constraint::pin(a, b, Vector::ZERO, Vector::ZERO))
//!     .unwrap();
//! ```
//!
//! By default, the constrained bodies can still collide with each other.
//! This can be disabled with [`Constraint::set_collide_bodies`].
//!
//! # Limits
//!
//! The force a constraint can apply is limited by [`Constraint::max_force`], and the speed
//! at which it corrects errors by [`Constraint::max_bias`]. [`Constraint::error_bias`] is the
//! fraction of the error that is left uncorrected after one second.
//!
//! [`Space::add_constraint`]: crate::space::Space::add_constraint

mod damped_rotary_spring;
mod damped_spring;
mod gear;
mod groove;
mod pin;
mod pivot;
mod ratchet;
mod rotary_limit;
mod simple_motor;
mod slide;

pub use damped_rotary_spring::{DampedRotarySpring, SpringTorqueFn};
pub use damped_spring::{DampedSpring, SpringForceFn};
pub use gear::GearJoint;
pub use groove::GrooveJoint;
pub use pin::PinJoint;
pub use pivot::PivotJoint;
pub use ratchet::RatchetJoint;
pub use rotary_limit::RotaryLimitJoint;
pub use simple_motor::SimpleMotor;
pub use slide::SlideJoint;

use core::any::Any;
use core::fmt;

use derive_more::From;

use crate::{
    dynamics::rigid_body::Body,
    math::*,
    space::{BodyHandle, ConstraintHandle, Space},
};

/// A callback invoked once per step before or after a constraint is solved.
pub type ConstraintCallback = Box<dyn FnMut(ConstraintHandle, &mut Space) + Send>;

/// The parameters shared by all constraints, passed to the solver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ConstraintParams {
    pub max_force: Scalar,
    pub max_bias: Scalar,
    pub error_bias: Scalar,
}

impl ConstraintParams {
    /// The bias coefficient for the time step.
    #[inline]
    pub fn bias_coef(&self, dt: Scalar) -> Scalar {
        crate::dynamics::solver::bias_coef(self.error_bias, dt)
    }

    /// Converts a position error into a clamped bias velocity.
    #[inline]
    pub fn bias(&self, error: Scalar, dt: Scalar) -> Scalar {
        (-self.bias_coef(dt) * error / dt).clamp(-self.max_bias, self.max_bias)
    }

    /// The largest impulse that may be applied during the step.
    #[inline]
    pub fn max_impulse(&self, dt: Scalar) -> Scalar {
        self.max_force * dt
    }
}

/// The solver contract implemented by every constraint variant.
pub(crate) trait ConstraintSolver {
    /// Resolves values that depend on the initial placement of the bodies.
    /// Called once when the constraint is added to a space.
    fn resolve(&mut self, _a: &Body, _b: &Body) {}

    /// Precomputes effective masses and bias velocities for the step.
    fn pre_step(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar);

    /// Applies the impulse accumulated during the previous step, scaled by `dt_coef`.
    fn apply_cached_impulse(&mut self, a: &mut Body, b: &mut Body, dt_coef: Scalar);

    /// Runs one solver iteration.
    fn apply_impulse(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar);

    /// The magnitude of the impulse applied during the last step.
    fn impulse(&self) -> Scalar;
}

/// The variant of a [`Constraint`] with its specific parameters.
#[derive(Debug, From)]
pub enum ConstraintKind {
    /// A [`PinJoint`].
    Pin(PinJoint),
    /// A [`SlideJoint`].
    Slide(SlideJoint),
    /// A [`PivotJoint`].
    Pivot(PivotJoint),
    /// A [`GrooveJoint`].
    Groove(GrooveJoint),
    /// A [`DampedSpring`].
    DampedSpring(DampedSpring),
    /// A [`DampedRotarySpring`].
    DampedRotarySpring(DampedRotarySpring),
    /// A [`RotaryLimitJoint`].
    RotaryLimit(RotaryLimitJoint),
    /// A [`RatchetJoint`].
    Ratchet(RatchetJoint),
    /// A [`GearJoint`].
    Gear(GearJoint),
    /// A [`SimpleMotor`].
    SimpleMotor(SimpleMotor),
}

macro_rules! dispatch {
    ($kind:expr, $joint:ident => $body:expr) => {
        match $kind {
            ConstraintKind::Pin($joint) => $body,
            ConstraintKind::Slide($joint) => $body,
            ConstraintKind::Pivot($joint) => $body,
            ConstraintKind::Groove($joint) => $body,
            ConstraintKind::DampedSpring($joint) => $body,
            ConstraintKind::DampedRotarySpring($joint) => $body,
            ConstraintKind::RotaryLimit($joint) => $body,
            ConstraintKind::Ratchet($joint) => $body,
            ConstraintKind::Gear($joint) => $body,
            ConstraintKind::SimpleMotor($joint) => $body,
        }
    };
}

impl ConstraintSolver for ConstraintKind {
    fn resolve(&mut self, a: &Body, b: &Body) {
        dispatch!(self, joint => joint.resolve(a, b))
    }

    fn pre_step(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar) {
        dispatch!(self, joint => joint.pre_step(a, b, params, dt))
    }

    fn apply_cached_impulse(&mut self, a: &mut Body, b: &mut Body, dt_coef: Scalar) {
        dispatch!(self, joint => joint.apply_cached_impulse(a, b, dt_coef))
    }

    fn apply_impulse(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar) {
        dispatch!(self, joint => joint.apply_impulse(a, b, params, dt))
    }

    fn impulse(&self) -> Scalar {
        dispatch!(self, joint => joint.impulse())
    }
}

/// A constraint between two bodies.
///
/// See the [module-level documentation](self) for the available kinds of constraints.
pub struct Constraint {
    pub(crate) handle: Option<ConstraintHandle>,
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) kind: ConstraintKind,
    max_force: Scalar,
    max_bias: Scalar,
    error_bias: Scalar,
    collide_bodies: bool,
    pub(crate) pre_solve: Option<ConstraintCallback>,
    pub(crate) post_solve: Option<ConstraintCallback>,
    user_data: Option<Box<dyn Any + Send>>,
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("handle", &self.handle)
            .field("body_a", &self.body_a)
            .field("body_b", &self.body_b)
            .field("kind", &self.kind)
            .field("max_force", &self.max_force)
            .field("max_bias", &self.max_bias)
            .field("error_bias", &self.error_bias)
            .field("collide_bodies", &self.collide_bodies)
            .finish_non_exhaustive()
    }
}

impl Constraint {
    /// The default error bias, correcting 10% of the error per step at 60 Hz.
    pub const DEFAULT_ERROR_BIAS: Scalar = 0.0017970102999144341; // 0.9^60

    /// Creates a constraint of the given kind between two bodies.
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, kind: impl Into<ConstraintKind>) -> Self {
        Self {
            handle: None,
            body_a,
            body_b,
            kind: kind.into(),
            max_force: Scalar::INFINITY,
            max_bias: Scalar::INFINITY,
            error_bias: Self::DEFAULT_ERROR_BIAS,
            collide_bodies: true,
            pre_solve: None,
            post_solve: None,
            user_data: None,
        }
    }

    /// Creates a [`PinJoint`] that keeps the anchors at their distance when the constraint is added.
    pub fn pin(a: BodyHandle, b: BodyHandle, anchor_a: Vector, anchor_b: Vector) -> Self {
        Self::new(a, b, PinJoint::new(anchor_a, anchor_b))
    }

    /// Creates a [`SlideJoint`] that keeps the distance of the anchors between `min` and `max`.
    pub fn slide(
        a: BodyHandle,
        b: BodyHandle,
        anchor_a: Vector,
        anchor_b: Vector,
        min: Scalar,
        max: Scalar,
    ) -> Self {
        Self::new(a, b, SlideJoint::new(anchor_a, anchor_b, min, max))
    }

    /// Creates a [`PivotJoint`] around a point given in world space.
    pub fn pivot(a: BodyHandle, b: BodyHandle, pivot: Vector) -> Self {
        Self::new(a, b, PivotJoint::from_world_pivot(pivot))
    }

    /// Creates a [`PivotJoint`] from an anchor on each body.
    pub fn pivot_with_anchors(
        a: BodyHandle,
        b: BodyHandle,
        anchor_a: Vector,
        anchor_b: Vector,
    ) -> Self {
        Self::new(a, b, PivotJoint::new(anchor_a, anchor_b))
    }

    /// Creates a [`GrooveJoint`] with a groove from `groove_a` to `groove_b` on the first body.
    pub fn groove(
        a: BodyHandle,
        b: BodyHandle,
        groove_a: Vector,
        groove_b: Vector,
        anchor_b: Vector,
    ) -> Self {
        Self::new(a, b, GrooveJoint::new(groove_a, groove_b, anchor_b))
    }

    /// Creates a [`DampedSpring`].
    pub fn damped_spring(
        a: BodyHandle,
        b: BodyHandle,
        anchor_a: Vector,
        anchor_b: Vector,
        rest_length: Scalar,
        stiffness: Scalar,
        damping: Scalar,
    ) -> Self {
        Self::new(
            a,
            b,
            DampedSpring::new(anchor_a, anchor_b, rest_length, stiffness, damping),
        )
    }

    /// Creates a [`DampedRotarySpring`].
    pub fn damped_rotary_spring(
        a: BodyHandle,
        b: BodyHandle,
        rest_angle: Scalar,
        stiffness: Scalar,
        damping: Scalar,
    ) -> Self {
        Self::new(a, b, DampedRotarySpring::new(rest_angle, stiffness, damping))
    }

    /// Creates a [`RotaryLimitJoint`].
    pub fn rotary_limit(a: BodyHandle, b: BodyHandle, min: Scalar, max: Scalar) -> Self {
        Self::new(a, b, RotaryLimitJoint::new(min, max))
    }

    /// Creates a [`RatchetJoint`].
    pub fn ratchet(a: BodyHandle, b: BodyHandle, phase: Scalar, ratchet: Scalar) -> Self {
        Self::new(a, b, RatchetJoint::new(phase, ratchet))
    }

    /// Creates a [`GearJoint`].
    pub fn gear(a: BodyHandle, b: BodyHandle, phase: Scalar, ratio: Scalar) -> Self {
        Self::new(a, b, GearJoint::new(phase, ratio))
    }

    /// Creates a [`SimpleMotor`].
    pub fn simple_motor(a: BodyHandle, b: BodyHandle, rate: Scalar) -> Self {
        Self::new(a, b, SimpleMotor::new(rate))
    }

    /// The handle of the constraint, or `None` if it is not in a space.
    #[inline]
    pub fn handle(&self) -> Option<ConstraintHandle> {
        self.handle
    }

    /// The first body.
    #[inline]
    pub fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    /// The second body.
    #[inline]
    pub fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    /// The kind of the constraint with its specific parameters.
    #[inline]
    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// The kind of the constraint with its specific parameters, mutably.
    #[inline]
    pub fn kind_mut(&mut self) -> &mut ConstraintKind {
        &mut self.kind
    }

    /// The maximum force the constraint can apply. Infinite by default.
    #[inline]
    pub fn max_force(&self) -> Scalar {
        self.max_force
    }

    /// Sets the maximum force the constraint can apply.
    #[inline]
    pub fn set_max_force(&mut self, max_force: Scalar) {
        self.max_force = max_force.max(0.0);
    }

    /// Returns the constraint with the given maximum force.
    pub fn with_max_force(mut self, max_force: Scalar) -> Self {
        self.set_max_force(max_force);
        self
    }

    /// The maximum speed at which the constraint corrects errors. Infinite by default.
    #[inline]
    pub fn max_bias(&self) -> Scalar {
        self.max_bias
    }

    /// Sets the maximum speed at which the constraint corrects errors.
    #[inline]
    pub fn set_max_bias(&mut self, max_bias: Scalar) {
        self.max_bias = max_bias.max(0.0);
    }

    /// Returns the constraint with the given maximum error correction speed.
    pub fn with_max_bias(mut self, max_bias: Scalar) -> Self {
        self.set_max_bias(max_bias);
        self
    }

    /// The fraction of the error left uncorrected after one second.
    #[inline]
    pub fn error_bias(&self) -> Scalar {
        self.error_bias
    }

    /// Sets the fraction of the error left uncorrected after one second, in `[0, 1]`.
    #[inline]
    pub fn set_error_bias(&mut self, error_bias: Scalar) {
        self.error_bias = error_bias.clamp(0.0, 1.0);
    }

    /// Returns the constraint with the given error bias.
    pub fn with_error_bias(mut self, error_bias: Scalar) -> Self {
        self.set_error_bias(error_bias);
        self
    }

    /// Returns `true` if the constrained bodies can collide with each other.
    #[inline]
    pub fn collide_bodies(&self) -> bool {
        self.collide_bodies
    }

    /// Sets whether the constrained bodies can collide with each other.
    #[inline]
    pub fn set_collide_bodies(&mut self, collide_bodies: bool) {
        self.collide_bodies = collide_bodies;
    }

    /// Returns the constraint with collisions between its bodies enabled or disabled.
    pub fn with_collide_bodies(mut self, collide_bodies: bool) -> Self {
        self.collide_bodies = collide_bodies;
        self
    }

    /// The magnitude of the impulse applied during the last step.
    ///
    /// Divide by the time step to get the force.
    #[inline]
    pub fn impulse(&self) -> Scalar {
        self.kind.impulse()
    }

    /// Sets a callback invoked once per step before the constraint is solved.
    pub fn set_pre_solve(&mut self, callback: impl FnMut(ConstraintHandle, &mut Space) + Send + 'static) {
        self.pre_solve = Some(Box::new(callback));
    }

    /// Sets a callback invoked once per step after the constraint was solved.
    pub fn set_post_solve(&mut self, callback: impl FnMut(ConstraintHandle, &mut Space) + Send + 'static) {
        self.post_solve = Some(Box::new(callback));
    }

    /// Removes the pre-solve and post-solve callbacks.
    pub fn clear_callbacks(&mut self) {
        self.pre_solve = None;
        self.post_solve = None;
    }

    /// User data attached to the constraint.
    pub fn user_data(&self) -> Option<&(dyn Any + Send)> {
        self.user_data.as_deref()
    }

    /// Mutable user data attached to the constraint.
    pub fn user_data_mut(&mut self) -> Option<&mut (dyn Any + Send)> {
        self.user_data.as_deref_mut()
    }

    /// Attaches user data to the constraint, returning the previous data.
    pub fn set_user_data(&mut self, data: impl Any + Send) -> Option<Box<dyn Any + Send>> {
        self.user_data.replace(Box::new(data))
    }

    pub(crate) fn params(&self) -> ConstraintParams {
        ConstraintParams {
            max_force: self.max_force,
            max_bias: self.max_bias,
            error_bias: self.error_bias,
        }
    }
}

/// The offset of a local anchor from the center of gravity, in world space.
#[inline]
pub(crate) fn world_offset(body: &Body, anchor: Vector) -> Vector {
    body.transform.vect(anchor - body.center_of_gravity)
}

/// Applies an angular impulse `j` to `b` and `-j` to `a`.
#[inline]
pub(crate) fn apply_angular_impulses(a: &mut Body, b: &mut Body, j: Scalar) {
    a.angular_velocity -= j * a.inv_moment;
    b.angular_velocity += j * b.inv_moment;
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;

    /// Steps two bodies connected by a constraint without a space.
    pub fn simulate(
        kind: &mut ConstraintKind,
        params: &ConstraintParams,
        a: &mut Body,
        b: &mut Body,
        steps: usize,
    ) {
        let dt = 1.0 / 60.0;
        for _ in 0..steps {
            a.update_velocity(Vector::ZERO, 1.0, dt);
            b.update_velocity(Vector::ZERO, 1.0, dt);
            kind.pre_step(a, b, params, dt);
            kind.apply_cached_impulse(a, b, 1.0);
            for _ in 0..10 {
                kind.apply_impulse(a, b, params, dt);
            }
            a.update_position(dt);
            b.update_position(dt);
        }
    }

    pub fn default_params() -> ConstraintParams {
        ConstraintParams {
            max_force: Scalar::INFINITY,
            max_bias: Scalar::INFINITY,
            error_bias: Constraint::DEFAULT_ERROR_BIAS,
        }
    }
}
