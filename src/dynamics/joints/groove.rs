use super::{world_offset, ConstraintParams, ConstraintSolver};
use crate::{
    dynamics::{rigid_body::Body, solver::*},
    math::*,
};

/// A groove joint keeps an anchor of the second body on a line segment, the groove,
/// attached to the first body. The anchor can slide along the groove and rotate freely.
///
/// The groove endpoints are given in the local space of the first body.
#[derive(Clone, Debug, PartialEq)]
pub struct GrooveJoint {
    groove_a: Vector,
    groove_b: Vector,
    groove_normal: Vector,
    /// The anchor on the second body in its local space.
    pub anchor_b: Vector,

    world_normal: Vector,
    clamp: Scalar,
    r1: Vector,
    r2: Vector,
    k: Matrix2,
    bias: Vector,
    j_acc: Vector,
}

impl GrooveJoint {
    /// Creates a groove joint with a groove from `groove_a` to `groove_b` on the first body.
    pub fn new(groove_a: Vector, groove_b: Vector, anchor_b: Vector) -> Self {
        Self {
            groove_a,
            groove_b,
            groove_normal: (groove_b - groove_a).normalize_or_zero().perp(),
            anchor_b,
            world_normal: Vector::ZERO,
            clamp: 0.0,
            r1: Vector::ZERO,
            r2: Vector::ZERO,
            k: Matrix2::ZERO,
            bias: Vector::ZERO,
            j_acc: Vector::ZERO,
        }
    }

    /// The start of the groove in the local space of the first body.
    pub fn groove_a(&self) -> Vector {
        self.groove_a
    }

    /// The end of the groove in the local space of the first body.
    pub fn groove_b(&self) -> Vector {
        self.groove_b
    }

    /// Sets the start of the groove.
    pub fn set_groove_a(&mut self, groove_a: Vector) {
        *self = Self {
            j_acc: self.j_acc,
            ..Self::new(groove_a, self.groove_b, self.anchor_b)
        };
    }

    /// Sets the end of the groove.
    pub fn set_groove_b(&mut self, groove_b: Vector) {
        *self = Self {
            j_acc: self.j_acc,
            ..Self::new(self.groove_a, groove_b, self.anchor_b)
        };
    }

    /// Clamps an impulse so that it only pushes the anchor back into the groove
    /// when it is at one of the ends.
    fn constrain(&self, j: Vector, max_impulse: Scalar) -> Vector {
        let n = self.world_normal;
        let j_clamp = if self.clamp * cross(j, n) > 0.0 {
            j
        } else {
            n * (j.dot(n) * n.length_squared().recip_or_zero())
        };
        clamp_length(j_clamp, max_impulse)
    }
}

impl ConstraintSolver for GrooveJoint {
    fn pre_step(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar) {
        let ta = a.transform.point(self.groove_a);
        let tb = a.transform.point(self.groove_b);
        let n = a.transform.vect(self.groove_normal);
        let d = ta.dot(n);

        self.world_normal = n;
        self.r2 = world_offset(b, self.anchor_b);

        // Find the point on the groove closest to the anchor of the second body.
        let td = cross(b.p + self.r2, n);
        if td <= cross(ta, n) {
            self.clamp = 1.0;
            self.r1 = ta - a.p;
        } else if td >= cross(tb, n) {
            self.clamp = -1.0;
            self.r1 = tb - a.p;
        } else {
            self.clamp = 0.0;
            self.r1 = n.perp() * -td + n * d - a.p;
        }

        self.k = k_tensor(a, b, self.r1, self.r2);

        let delta = (b.p + self.r2) - (a.p + self.r1);
        self.bias = clamp_length(delta * (-params.bias_coef(dt) / dt), params.max_bias);
    }

    fn apply_cached_impulse(&mut self, a: &mut Body, b: &mut Body, dt_coef: Scalar) {
        apply_impulses(a, b, self.r1, self.r2, self.j_acc * dt_coef);
    }

    fn apply_impulse(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar) {
        let vr = relative_velocity(a, b, self.r1, self.r2);

        let j = self.k * (self.bias - vr);
        let j_old = self.j_acc;
        self.j_acc = self.constrain(j_old + j, params.max_impulse(dt));
        let j = self.j_acc - j_old;

        apply_impulses(a, b, self.r1, self.r2, j);
    }

    fn impulse(&self) -> Scalar {
        self.j_acc.length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::joints::{test_utils::*, ConstraintKind};
    use approx::assert_relative_eq;

    fn groove() -> ConstraintKind {
        GrooveJoint::new(Vector::new(-2.0, 0.0), Vector::new(2.0, 0.0), Vector::ZERO).into()
    }

    #[test]
    fn slides_freely_along_the_groove() {
        let mut a = Body::static_body();
        let mut b = Body::dynamic(1.0, 1.0).with_velocity(Vector::new(1.0, 0.0));
        let mut kind = groove();

        simulate(&mut kind, &default_params(), &mut a, &mut b, 30);
        assert_relative_eq!(b.position(), Vector::new(0.5, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn stays_on_the_groove() {
        let mut a = Body::static_body();
        let mut b = Body::dynamic(1.0, 1.0).with_velocity(Vector::new(1.0, 3.0));
        let mut kind = groove();

        simulate(&mut kind, &default_params(), &mut a, &mut b, 30);
        assert!(b.position().y.abs() < 0.01);
        assert_relative_eq!(b.position().x, 0.5, epsilon = 0.01);
    }

    #[test]
    fn stops_at_the_end() {
        let mut a = Body::static_body();
        let mut b = Body::dynamic(1.0, 1.0).with_velocity(Vector::new(6.0, 0.0));
        let mut kind = groove();

        simulate(&mut kind, &default_params(), &mut a, &mut b, 60);
        assert!(b.position().x < 2.05, "position {}", b.position());
    }
}
