use super::{apply_angular_impulses, ConstraintParams, ConstraintSolver};
use crate::{dynamics::rigid_body::Body, math::*};

/// A rotary limit keeps the relative angle of two bodies, `angle_b - angle_a`,
/// between a minimum and a maximum.
#[derive(Clone, Debug, PartialEq)]
pub struct RotaryLimitJoint {
    /// The minimum relative angle in radians.
    pub min: Scalar,
    /// The maximum relative angle in radians.
    pub max: Scalar,

    i_sum: Scalar,
    bias: Scalar,
    j_acc: Scalar,
}

impl RotaryLimitJoint {
    /// Creates a rotary limit with the given range of relative angles.
    pub fn new(min: Scalar, max: Scalar) -> Self {
        Self {
            min,
            max,
            i_sum: 0.0,
            bias: 0.0,
            j_acc: 0.0,
        }
    }
}

impl ConstraintSolver for RotaryLimitJoint {
    fn pre_step(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar) {
        let dist = b.angle - a.angle;
        let mut pdist = 0.0;
        if dist > self.max {
            pdist = self.max - dist;
        } else if dist < self.min {
            pdist = self.min - dist;
        }

        self.i_sum = (a.inv_moment + b.inv_moment).recip_or_zero();
        self.bias = params.bias(pdist, dt);

        // Only solve while the limit is violated.
        if self.bias == 0.0 {
            self.j_acc = 0.0;
        }
    }

    fn apply_cached_impulse(&mut self, a: &mut Body, b: &mut Body, dt_coef: Scalar) {
        apply_angular_impulses(a, b, self.j_acc * dt_coef);
    }

    fn apply_impulse(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar) {
        if self.bias == 0.0 {
            return;
        }

        let wr = b.angular_velocity - a.angular_velocity;
        let j_max = params.max_impulse(dt);

        let j = -(self.bias + wr) * self.i_sum;
        let j_old = self.j_acc;
        self.j_acc = if self.bias < 0.0 {
            (j_old + j).clamp(0.0, j_max)
        } else {
            (j_old + j).clamp(-j_max, 0.0)
        };
        let j = self.j_acc - j_old;

        apply_angular_impulses(a, b, j);
    }

    fn impulse(&self) -> Scalar {
        self.j_acc.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::joints::{test_utils::*, ConstraintKind};

    #[test]
    fn free_within_the_range() {
        let mut a = Body::static_body();
        let mut b = Body::dynamic(1.0, 1.0).with_angular_velocity(0.5);
        let mut kind = ConstraintKind::from(RotaryLimitJoint::new(-1.0, 1.0));

        simulate(&mut kind, &default_params(), &mut a, &mut b, 60);
        approx::assert_relative_eq!(b.angle(), 0.5, epsilon = 1e-5);
        assert_eq!(kind.impulse(), 0.0);
    }

    #[test]
    fn stops_at_the_maximum() {
        let mut a = Body::static_body();
        let mut b = Body::dynamic(1.0, 1.0).with_angular_velocity(3.0);
        let mut kind = ConstraintKind::from(RotaryLimitJoint::new(-1.0, 1.0));

        simulate(&mut kind, &default_params(), &mut a, &mut b, 120);
        assert!(b.angle() < 1.05, "angle {}", b.angle());
        assert!(b.angle() > 0.9);
    }

    #[test]
    fn stops_at_the_minimum() {
        let mut a = Body::static_body();
        let mut b = Body::dynamic(1.0, 1.0).with_angular_velocity(-3.0);
        let mut kind = ConstraintKind::from(RotaryLimitJoint::new(-1.0, 1.0));

        simulate(&mut kind, &default_params(), &mut a, &mut b, 120);
        assert!(b.angle() > -1.05, "angle {}", b.angle());
    }
}
