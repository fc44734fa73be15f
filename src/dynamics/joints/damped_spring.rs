use core::fmt;

use super::{world_offset, ConstraintParams, ConstraintSolver};
use crate::{
    dynamics::{rigid_body::Body, solver::*},
    math::*,
};

/// A custom spring force function, called with the spring and the current distance
/// between the anchors. Positive forces push the anchors apart.
pub type SpringForceFn = Box<dyn Fn(&DampedSpring, Scalar) -> Scalar + Send + Sync>;

/// A damped spring between the anchors of two bodies.
///
/// The spring force is applied explicitly once per step, and the damping is solved
/// implicitly so that even very stiff damping stays stable.
pub struct DampedSpring {
    /// The anchor on the first body in its local space.
    pub anchor_a: Vector,
    /// The anchor on the second body in its local space.
    pub anchor_b: Vector,
    /// The distance the spring wants to be.
    pub rest_length: Scalar,
    /// The spring constant.
    pub stiffness: Scalar,
    /// How soft to make the damping of the spring.
    pub damping: Scalar,
    force_fn: Option<SpringForceFn>,

    r1: Vector,
    r2: Vector,
    n: Vector,
    n_mass: Scalar,
    target_vrn: Scalar,
    v_coef: Scalar,
    j_acc: Scalar,
}

impl fmt::Debug for DampedSpring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DampedSpring")
            .field("anchor_a", &self.anchor_a)
            .field("anchor_b", &self.anchor_b)
            .field("rest_length", &self.rest_length)
            .field("stiffness", &self.stiffness)
            .field("damping", &self.damping)
            .field("custom_force", &self.force_fn.is_some())
            .finish_non_exhaustive()
    }
}

impl DampedSpring {
    /// Creates a damped spring between the given local anchors.
    pub fn new(
        anchor_a: Vector,
        anchor_b: Vector,
        rest_length: Scalar,
        stiffness: Scalar,
        damping: Scalar,
    ) -> Self {
        Self {
            anchor_a,
            anchor_b,
            rest_length,
            stiffness,
            damping,
            force_fn: None,
            r1: Vector::ZERO,
            r2: Vector::ZERO,
            n: Vector::ZERO,
            n_mass: 0.0,
            target_vrn: 0.0,
            v_coef: 0.0,
            j_acc: 0.0,
        }
    }

    /// Returns the spring with a custom force function.
    pub fn with_force_fn(
        mut self,
        force_fn: impl Fn(&DampedSpring, Scalar) -> Scalar + Send + Sync + 'static,
    ) -> Self {
        self.set_force_fn(force_fn);
        self
    }

    /// Replaces the default linear spring force with a custom function.
    pub fn set_force_fn(
        &mut self,
        force_fn: impl Fn(&DampedSpring, Scalar) -> Scalar + Send + Sync + 'static,
    ) {
        self.force_fn = Some(Box::new(force_fn));
    }

    /// Restores the default linear spring force.
    pub fn clear_force_fn(&mut self) {
        self.force_fn = None;
    }

    /// The spring force for a distance between the anchors.
    pub fn force(&self, distance: Scalar) -> Scalar {
        match &self.force_fn {
            Some(force_fn) => force_fn(self, distance),
            None => (self.rest_length - distance) * self.stiffness,
        }
    }
}

impl ConstraintSolver for DampedSpring {
    fn pre_step(&mut self, a: &mut Body, b: &mut Body, _params: &ConstraintParams, dt: Scalar) {
        self.r1 = world_offset(a, self.anchor_a);
        self.r2 = world_offset(b, self.anchor_b);

        let delta = (b.p + self.r2) - (a.p + self.r1);
        let dist = delta.length();
        self.n = if dist > 0.0 { delta / dist } else { Vector::ZERO };

        let k = k_scalar(a, b, self.r1, self.r2, self.n);
        self.n_mass = k.recip_or_zero();

        self.target_vrn = 0.0;
        self.v_coef = 1.0 - (-self.damping * dt * k).exp();

        // Apply the spring force explicitly.
        self.j_acc = self.force(dist) * dt;
        apply_impulses(a, b, self.r1, self.r2, self.n * self.j_acc);
    }

    fn apply_cached_impulse(&mut self, _a: &mut Body, _b: &mut Body, _dt_coef: Scalar) {}

    fn apply_impulse(&mut self, a: &mut Body, b: &mut Body, _params: &ConstraintParams, _dt: Scalar) {
        let vrn = normal_relative_velocity(a, b, self.r1, self.r2, self.n);

        // Compute the velocity loss from drag.
        let v_damp = (self.target_vrn - vrn) * self.v_coef;
        self.target_vrn = vrn + v_damp;

        let j_damp = v_damp * self.n_mass;
        self.j_acc += j_damp;
        apply_impulses(a, b, self.r1, self.r2, self.n * j_damp);
    }

    fn impulse(&self) -> Scalar {
        self.j_acc.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::joints::{test_utils::*, ConstraintKind};
    use approx::assert_relative_eq;

    #[test]
    fn default_force_is_linear() {
        let spring = DampedSpring::new(Vector::ZERO, Vector::ZERO, 2.0, 10.0, 0.0);
        assert_relative_eq!(spring.force(1.5), 5.0);
        assert_relative_eq!(spring.force(3.0), -10.0);
    }

    #[test]
    fn custom_force_is_used() {
        let spring = DampedSpring::new(Vector::ZERO, Vector::ZERO, 2.0, 10.0, 0.0)
            .with_force_fn(|spring, dist| (spring.rest_length - dist).signum());
        assert_relative_eq!(spring.force(5.0), -1.0);
    }

    #[test]
    fn stretched_spring_pulls_bodies_together() {
        let mut a = Body::dynamic(1.0, 1.0);
        let mut b = Body::dynamic(1.0, 1.0).with_position(Vector::new(3.0, 0.0));
        let mut kind =
            ConstraintKind::from(DampedSpring::new(Vector::ZERO, Vector::ZERO, 1.0, 10.0, 0.0));

        simulate(&mut kind, &default_params(), &mut a, &mut b, 1);
        assert!(a.velocity().x > 0.0);
        assert!(b.velocity().x < 0.0);
        assert_relative_eq!(a.velocity().x + b.velocity().x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn damping_settles_the_spring() {
        let mut a = Body::static_body();
        let mut b = Body::dynamic(1.0, 1.0).with_position(Vector::new(3.0, 0.0));
        let mut kind =
            ConstraintKind::from(DampedSpring::new(Vector::ZERO, Vector::ZERO, 1.0, 20.0, 5.0));

        simulate(&mut kind, &default_params(), &mut a, &mut b, 600);
        assert_relative_eq!(b.position().x, 1.0, epsilon = 0.01);
        assert!(b.velocity().length() < 0.01);
    }
}
