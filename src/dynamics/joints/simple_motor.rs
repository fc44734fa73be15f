use super::{apply_angular_impulses, ConstraintParams, ConstraintSolver};
use crate::{dynamics::rigid_body::Body, math::*};

/// A simple motor keeps the relative angular velocity of two bodies at a constant rate,
/// so that `angular_velocity_a - angular_velocity_b == rate`.
///
/// The torque is only limited by [`Constraint::max_force`](super::Constraint::max_force),
/// which should usually be set to something finite.
#[derive(Clone, Debug, PartialEq)]
pub struct SimpleMotor {
    /// The desired relative angular velocity in radians per second.
    pub rate: Scalar,

    i_sum: Scalar,
    j_acc: Scalar,
}

impl SimpleMotor {
    /// Creates a motor with the given rate.
    pub fn new(rate: Scalar) -> Self {
        Self {
            rate,
            i_sum: 0.0,
            j_acc: 0.0,
        }
    }
}

impl ConstraintSolver for SimpleMotor {
    fn pre_step(&mut self, a: &mut Body, b: &mut Body, _params: &ConstraintParams, _dt: Scalar) {
        self.i_sum = (a.inv_moment + b.inv_moment).recip_or_zero();
    }

    fn apply_cached_impulse(&mut self, a: &mut Body, b: &mut Body, dt_coef: Scalar) {
        apply_angular_impulses(a, b, self.j_acc * dt_coef);
    }

    fn apply_impulse(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar) {
        let wr = b.angular_velocity - a.angular_velocity + self.rate;
        let j_max = params.max_impulse(dt);

        let j = -wr * self.i_sum;
        let j_old = self.j_acc;
        self.j_acc = (j_old + j).clamp(-j_max, j_max);
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
    use approx::assert_relative_eq;

    #[test]
    fn drives_the_relative_rate() {
        let mut a = Body::static_body();
        let mut b = Body::dynamic(1.0, 1.0);
        let mut kind = ConstraintKind::from(SimpleMotor::new(3.0));

        simulate(&mut kind, &default_params(), &mut a, &mut b, 1);
        assert_relative_eq!(b.angular_velocity(), -3.0, epsilon = 1e-9);
    }

    #[test]
    fn torque_is_limited() {
        let mut a = Body::static_body();
        let mut b = Body::dynamic(1.0, 1.0);
        let mut kind = ConstraintKind::from(SimpleMotor::new(3.0));
        let params = ConstraintParams {
            max_force: 6.0,
            ..default_params()
        };

        // At most 6 rad/s² of angular acceleration for a unit moment.
        simulate(&mut kind, &params, &mut a, &mut b, 10);
        assert_relative_eq!(b.angular_velocity(), -1.0, epsilon = 1e-9);
    }
}
