use core::fmt;

use super::{apply_angular_impulses, ConstraintParams, ConstraintSolver};
use crate::{dynamics::rigid_body::Body, math::*};

/// A custom spring torque function, called with the spring and the relative angle
/// of the bodies, `angle_a - angle_b`.
pub type SpringTorqueFn = Box<dyn Fn(&DampedRotarySpring, Scalar) -> Scalar + Send + Sync>;

/// A damped spring acting on the relative angle of two bodies.
pub struct DampedRotarySpring {
    /// The relative angle, `angle_a - angle_b`, the spring wants to keep.
    pub rest_angle: Scalar,
    /// The spring constant.
    pub stiffness: Scalar,
    /// How soft to make the damping of the spring.
    pub damping: Scalar,
    torque_fn: Option<SpringTorqueFn>,

    target_wrn: Scalar,
    w_coef: Scalar,
    i_sum: Scalar,
    j_acc: Scalar,
}

impl fmt::Debug for DampedRotarySpring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DampedRotarySpring")
            .field("rest_angle", &self.rest_angle)
            .field("stiffness", &self.stiffness)
            .field("damping", &self.damping)
            .field("custom_torque", &self.torque_fn.is_some())
            .finish_non_exhaustive()
    }
}

impl DampedRotarySpring {
    /// Creates a damped rotary spring.
    pub fn new(rest_angle: Scalar, stiffness: Scalar, damping: Scalar) -> Self {
        Self {
            rest_angle,
            stiffness,
            damping,
            torque_fn: None,
            target_wrn: 0.0,
            w_coef: 0.0,
            i_sum: 0.0,
            j_acc: 0.0,
        }
    }

    /// Returns the spring with a custom torque function.
    pub fn with_torque_fn(
        mut self,
        torque_fn: impl Fn(&DampedRotarySpring, Scalar) -> Scalar + Send + Sync + 'static,
    ) -> Self {
        self.set_torque_fn(torque_fn);
        self
    }

    /// Replaces the default linear spring torque with a custom function.
    pub fn set_torque_fn(
        &mut self,
        torque_fn: impl Fn(&DampedRotarySpring, Scalar) -> Scalar + Send + Sync + 'static,
    ) {
        self.torque_fn = Some(Box::new(torque_fn));
    }

    /// Restores the default linear spring torque.
    pub fn clear_torque_fn(&mut self) {
        self.torque_fn = None;
    }

    /// The spring torque for a relative angle.
    pub fn torque(&self, relative_angle: Scalar) -> Scalar {
        match &self.torque_fn {
            Some(torque_fn) => torque_fn(self, relative_angle),
            None => (relative_angle - self.rest_angle) * self.stiffness,
        }
    }
}

impl ConstraintSolver for DampedRotarySpring {
    fn pre_step(&mut self, a: &mut Body, b: &mut Body, _params: &ConstraintParams, dt: Scalar) {
        let moment = a.inv_moment + b.inv_moment;
        self.i_sum = moment.recip_or_zero();

        self.w_coef = 1.0 - (-self.damping * dt * moment).exp();
        self.target_wrn = 0.0;

        // Apply the spring torque explicitly.
        let j = self.torque(a.angle - b.angle) * dt;
        self.j_acc = j;
        apply_angular_impulses(a, b, j);
    }

    fn apply_cached_impulse(&mut self, _a: &mut Body, _b: &mut Body, _dt_coef: Scalar) {}

    fn apply_impulse(&mut self, a: &mut Body, b: &mut Body, _params: &ConstraintParams, _dt: Scalar) {
        let wrn = a.angular_velocity - b.angular_velocity;

        let w_damp = (self.target_wrn - wrn) * self.w_coef;
        self.target_wrn = wrn + w_damp;

        let j_damp = w_damp * self.i_sum;
        self.j_acc += j_damp;
        apply_angular_impulses(a, b, -j_damp);
    }

    fn impulse(&self) -> Scalar {
        self.j_acc.abs()
    }
}
