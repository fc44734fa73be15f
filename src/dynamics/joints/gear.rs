use super::{ConstraintParams, ConstraintSolver};
use crate::{dynamics::rigid_body::Body, math::*};

/// A gear joint keeps the angular velocities of two bodies at a fixed ratio,
/// so that `angle_b * ratio - angle_a` stays at `phase`.
///
/// A negative ratio makes the bodies turn in opposite directions.
#[derive(Clone, Debug, PartialEq)]
pub struct GearJoint {
    /// The angular offset between the bodies in radians.
    pub phase: Scalar,
    ratio: Scalar,
    ratio_inv: Scalar,

    i_sum: Scalar,
    bias: Scalar,
    j_acc: Scalar,
}

impl GearJoint {
    /// Creates a gear joint.
    pub fn new(phase: Scalar, ratio: Scalar) -> Self {
        Self {
            phase,
            ratio,
            ratio_inv: ratio.recip_or_zero(),
            i_sum: 0.0,
            bias: 0.0,
            j_acc: 0.0,
        }
    }

    /// The gear ratio.
    pub fn ratio(&self) -> Scalar {
        self.ratio
    }

    /// Sets the gear ratio.
    pub fn set_ratio(&mut self, ratio: Scalar) {
        self.ratio = ratio;
        self.ratio_inv = ratio.recip_or_zero();
    }

    #[inline]
    fn apply(&self, a: &mut Body, b: &mut Body, j: Scalar) {
        a.angular_velocity -= j * a.inv_moment * self.ratio_inv;
        b.angular_velocity += j * b.inv_moment;
    }
}

impl ConstraintSolver for GearJoint {
    fn pre_step(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar) {
        self.i_sum =
            (a.inv_moment * self.ratio_inv + self.ratio * b.inv_moment).recip_or_zero();
        self.bias = params.bias(b.angle * self.ratio - a.angle - self.phase, dt);
    }

    fn apply_cached_impulse(&mut self, a: &mut Body, b: &mut Body, dt_coef: Scalar) {
        self.apply(a, b, self.j_acc * dt_coef);
    }

    fn apply_impulse(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar) {
        let wr = b.angular_velocity * self.ratio - a.angular_velocity;
        let j_max = params.max_impulse(dt);

        let j = (self.bias - wr) * self.i_sum;
        let j_old = self.j_acc;
        self.j_acc = (j_old + j).clamp(-j_max, j_max);
        let j = self.j_acc - j_old;

        self.apply(a, b, j);
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
    fn keeps_the_velocity_ratio() {
        let mut a = Body::dynamic(1.0, 1.0).with_angular_velocity(2.0);
        let mut b = Body::dynamic(1.0, 1.0);
        let mut kind = ConstraintKind::from(GearJoint::new(0.0, 2.0));

        simulate(&mut kind, &default_params(), &mut a, &mut b, 60);
        assert_relative_eq!(
            b.angular_velocity() * 2.0,
            a.angular_velocity(),
            epsilon = 0.01
        );
        assert_relative_eq!(b.angle() * 2.0, a.angle(), epsilon = 0.01);
    }

    #[test]
    fn negative_ratio_reverses() {
        let mut a = Body::dynamic(1.0, 1.0).with_angular_velocity(1.0);
        let mut b = Body::dynamic(1.0, 1.0);
        let mut kind = ConstraintKind::from(GearJoint::new(0.0, -1.0));

        simulate(&mut kind, &default_params(), &mut a, &mut b, 30);
        assert!(b.angular_velocity() < 0.0);
    }
}
