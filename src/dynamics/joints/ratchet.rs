use super::{apply_angular_impulses, ConstraintParams, ConstraintSolver};
use crate::{dynamics::rigid_body::Body, math::*};

/// A ratchet joint works like a socket wrench: the relative angle, `angle_b - angle_a`,
/// can move freely in the direction of `ratchet`, but not back past the last notch.
///
/// Notches are spaced `ratchet` radians apart, offset by `phase`.
#[derive(Clone, Debug, PartialEq)]
pub struct RatchetJoint {
    /// The offset of the notches in radians.
    pub phase: Scalar,
    /// The distance between notches in radians. The sign decides the free direction.
    pub ratchet: Scalar,
    angle: Option<Scalar>,

    i_sum: Scalar,
    bias: Scalar,
    j_acc: Scalar,
}

impl RatchetJoint {
    /// Creates a ratchet joint.
    pub fn new(phase: Scalar, ratchet: Scalar) -> Self {
        Self {
            phase,
            ratchet,
            angle: None,
            i_sum: 0.0,
            bias: 0.0,
            j_acc: 0.0,
        }
    }

    /// The relative angle of the current notch.
    ///
    /// Starts at the relative angle of the bodies when the constraint is added to a space.
    pub fn angle(&self) -> Scalar {
        self.angle.unwrap_or(0.0)
    }

    /// Sets the relative angle of the current notch.
    pub fn set_angle(&mut self, angle: Scalar) {
        self.angle = Some(angle);
    }
}

impl ConstraintSolver for RatchetJoint {
    fn resolve(&mut self, a: &Body, b: &Body) {
        if self.angle.is_none() {
            self.angle = Some(b.angle - a.angle);
        }
    }

    fn pre_step(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar) {
        let angle = self.angle();
        let delta = b.angle - a.angle;
        let diff = angle - delta;

        let mut pdist = 0.0;
        if diff * self.ratchet > 0.0 {
            pdist = diff;
        } else if self.ratchet != 0.0 {
            // Advance to the notch the bodies have moved past.
            let notch = ((delta - self.phase) / self.ratchet).floor();
            self.angle = Some(notch * self.ratchet + self.phase);
        }

        self.i_sum = (a.inv_moment + b.inv_moment).recip_or_zero();
        self.bias = params.bias(pdist, dt);

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
        let ratchet = self.ratchet;
        let j_max = params.max_impulse(dt);

        let j = -(self.bias + wr) * self.i_sum;
        let j_old = self.j_acc;
        self.j_acc = ((j_old + j) * ratchet).clamp(0.0, j_max * ratchet.abs()) / ratchet;
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
    fn turns_freely_forward() {
        let mut a = Body::static_body();
        let mut b = Body::dynamic(1.0, 1.0).with_angular_velocity(2.0);
        let mut kind = ConstraintKind::from(RatchetJoint::new(0.0, 0.5));
        kind.resolve(&a, &b);

        simulate(&mut kind, &default_params(), &mut a, &mut b, 50);
        assert_relative_eq!(b.angle(), 5.0 / 3.0, epsilon = 1e-9);
        let ConstraintKind::Ratchet(ratchet) = &kind else {
            unreachable!()
        };
        assert_relative_eq!(ratchet.angle(), 1.5, epsilon = 1e-9);
    }

    #[test]
    fn blocks_backwards_rotation() {
        let mut a = Body::static_body();
        let mut b = Body::dynamic(1.0, 1.0).with_angular_velocity(2.0);
        let mut kind = ConstraintKind::from(RatchetJoint::new(0.0, 0.5));
        kind.resolve(&a, &b);

        simulate(&mut kind, &default_params(), &mut a, &mut b, 40);
        b.set_angular_velocity(-2.0);
        simulate(&mut kind, &default_params(), &mut a, &mut b, 60);

        // The last notch passed was at 1.0.
        assert!(b.angle() > 0.95, "angle {}", b.angle());
    }
}
