use super::{world_offset, ConstraintParams, ConstraintSolver};
use crate::{
    dynamics::{rigid_body::Body, solver::*},
    math::*,
};

/// A slide joint keeps the distance between the anchors of two bodies within a range,
/// like a chain or a telescoping rod.
#[derive(Clone, Debug, PartialEq)]
pub struct SlideJoint {
    /// The anchor on the first body in its local space.
    pub anchor_a: Vector,
    /// The anchor on the second body in its local space.
    pub anchor_b: Vector,
    /// The minimum distance between the anchors.
    pub min: Scalar,
    /// The maximum distance between the anchors.
    pub max: Scalar,

    r1: Vector,
    r2: Vector,
    n: Vector,
    n_mass: Scalar,
    bias: Scalar,
    jn_acc: Scalar,
}

impl SlideJoint {
    /// Creates a slide joint between the given local anchors.
    pub fn new(anchor_a: Vector, anchor_b: Vector, min: Scalar, max: Scalar) -> Self {
        Self {
            anchor_a,
            anchor_b,
            min,
            max,
            r1: Vector::ZERO,
            r2: Vector::ZERO,
            n: Vector::ZERO,
            n_mass: 0.0,
            bias: 0.0,
            jn_acc: 0.0,
        }
    }
}

impl ConstraintSolver for SlideJoint {
    fn pre_step(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar) {
        self.r1 = world_offset(a, self.anchor_a);
        self.r2 = world_offset(b, self.anchor_b);

        let delta = (b.p + self.r2) - (a.p + self.r1);
        let dist = delta.length();
        let mut pdist = 0.0;
        if dist > self.max {
            pdist = dist - self.max;
            self.n = delta.normalize_or_zero();
        } else if dist < self.min {
            pdist = self.min - dist;
            self.n = -delta.normalize_or_zero();
        } else {
            self.n = Vector::ZERO;
            self.jn_acc = 0.0;
        }

        self.n_mass = k_scalar(a, b, self.r1, self.r2, self.n).recip_or_zero();
        self.bias = params.bias(pdist, dt);
    }

    fn apply_cached_impulse(&mut self, a: &mut Body, b: &mut Body, dt_coef: Scalar) {
        let j = self.n * (self.jn_acc * dt_coef);
        apply_impulses(a, b, self.r1, self.r2, j);
    }

    fn apply_impulse(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar) {
        if self.n == Vector::ZERO {
            return;
        }

        let vrn = normal_relative_velocity(a, b, self.r1, self.r2, self.n);

        let jn = (self.bias - vrn) * self.n_mass;
        let jn_old = self.jn_acc;
        self.jn_acc = (jn_old + jn).clamp(-params.max_impulse(dt), 0.0);
        let jn = self.jn_acc - jn_old;

        apply_impulses(a, b, self.r1, self.r2, self.n * jn);
    }

    fn impulse(&self) -> Scalar {
        self.jn_acc.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::joints::{test_utils::*, ConstraintKind};
    use approx::assert_relative_eq;

    #[test]
    fn slack_within_range() {
        let mut a = Body::dynamic(1.0, 1.0);
        let mut b = Body::dynamic(1.0, 1.0)
            .with_position(Vector::new(2.0, 0.0))
            .with_velocity(Vector::new(0.5, 0.0));
        let mut kind = ConstraintKind::from(SlideJoint::new(Vector::ZERO, Vector::ZERO, 1.0, 3.0));

        // The anchors move apart freely until they reach the maximum distance.
        simulate(&mut kind, &default_params(), &mut a, &mut b, 60);
        assert_relative_eq!(b.position().x, 2.5, epsilon = 1e-9);
        assert_eq!(kind.impulse(), 0.0);
    }

    #[test]
    fn stops_at_the_maximum_distance() {
        let mut a = Body::dynamic(1.0, 1.0);
        let mut b = Body::dynamic(1.0, 1.0)
            .with_position(Vector::new(2.0, 0.0))
            .with_velocity(Vector::new(4.0, 0.0));
        let mut kind = ConstraintKind::from(SlideJoint::new(Vector::ZERO, Vector::ZERO, 1.0, 3.0));

        simulate(&mut kind, &default_params(), &mut a, &mut b, 120);
        let dist = a.position().distance(b.position());
        assert!(dist < 3.05, "distance {dist}");
        // Momentum is conserved, so the bodies keep moving together.
        assert_relative_eq!(a.velocity().x + b.velocity().x, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn stops_at_the_minimum_distance() {
        let mut a = Body::dynamic(1.0, 1.0);
        let mut b = Body::dynamic(1.0, 1.0)
            .with_position(Vector::new(2.0, 0.0))
            .with_velocity(Vector::new(-4.0, 0.0));
        let mut kind = ConstraintKind::from(SlideJoint::new(Vector::ZERO, Vector::ZERO, 1.0, 3.0));

        simulate(&mut kind, &default_params(), &mut a, &mut b, 120);
        let dist = a.position().distance(b.position());
        assert!(dist > 0.95, "distance {dist}");
    }
}
