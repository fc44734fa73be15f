use super::{world_offset, ConstraintParams, ConstraintSolver};
use crate::{
    dynamics::{rigid_body::Body, solver::*},
    math::*,
};

/// A pivot joint keeps the anchors of two bodies at the same point, letting them rotate
/// freely around it, like a hinge.
#[derive(Clone, Debug, PartialEq)]
pub struct PivotJoint {
    /// The anchor on the first body in its local space.
    pub anchor_a: Vector,
    /// The anchor on the second body in its local space.
    pub anchor_b: Vector,
    world_pivot: Option<Vector>,

    r1: Vector,
    r2: Vector,
    k: Matrix2,
    bias: Vector,
    j_acc: Vector,
}

impl PivotJoint {
    /// Creates a pivot joint between the given local anchors.
    pub fn new(anchor_a: Vector, anchor_b: Vector) -> Self {
        Self {
            anchor_a,
            anchor_b,
            world_pivot: None,
            r1: Vector::ZERO,
            r2: Vector::ZERO,
            k: Matrix2::ZERO,
            bias: Vector::ZERO,
            j_acc: Vector::ZERO,
        }
    }

    /// Creates a pivot joint around a point in world space.
    ///
    /// The anchors are computed from the positions of the bodies when the constraint
    /// is added to a space.
    pub fn from_world_pivot(pivot: Vector) -> Self {
        Self {
            world_pivot: Some(pivot),
            ..Self::new(Vector::ZERO, Vector::ZERO)
        }
    }
}

impl ConstraintSolver for PivotJoint {
    fn resolve(&mut self, a: &Body, b: &Body) {
        if let Some(pivot) = self.world_pivot.take() {
            self.anchor_a = a.world_to_local(pivot);
            self.anchor_b = b.world_to_local(pivot);
        }
    }

    fn pre_step(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar) {
        self.r1 = world_offset(a, self.anchor_a);
        self.r2 = world_offset(b, self.anchor_b);

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
        self.j_acc = clamp_length(j_old + j, params.max_impulse(dt));
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

    #[test]
    fn world_pivot_resolves_to_local_anchors() {
        let a = Body::dynamic(1.0, 1.0).with_position(Vector::new(-1.0, 0.0));
        let b = Body::dynamic(1.0, 1.0).with_position(Vector::new(1.0, 0.0));
        let mut joint = PivotJoint::from_world_pivot(Vector::ZERO);
        joint.resolve(&a, &b);
        assert_relative_eq!(joint.anchor_a, Vector::new(1.0, 0.0));
        assert_relative_eq!(joint.anchor_b, Vector::new(-1.0, 0.0));
    }

    #[test]
    fn anchors_stay_together() {
        let mut a = Body::static_body();
        let mut b = Body::dynamic(1.0, 1.0).with_position(Vector::new(1.0, 0.0));
        let mut kind = ConstraintKind::from(PivotJoint::from_world_pivot(Vector::ZERO));
        kind.resolve(&a, &b);

        // Swing the body around the pivot with gravity.
        let dt = 1.0 / 60.0;
        let params = default_params();
        for _ in 0..30 {
            b.update_velocity(Vector::new(0.0, -10.0), 1.0, dt);
            kind.pre_step(&mut a, &mut b, &params, dt);
            kind.apply_cached_impulse(&mut a, &mut b, 1.0);
            for _ in 0..10 {
                kind.apply_impulse(&mut a, &mut b, &params, dt);
            }
            b.update_position(dt);
        }

        let anchor = b.local_to_world(Vector::new(-1.0, 0.0));
        assert!(anchor.length() < 0.05, "anchor drifted to {anchor}");
        assert!(b.position().y < -0.1);
        assert_eq!(a.position(), Vector::ZERO);
    }
}
