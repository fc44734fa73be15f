use super::{world_offset, ConstraintParams, ConstraintSolver};
use crate::{
    dynamics::{rigid_body::Body, solver::*},
    math::*,
};

/// A pin joint keeps the anchors of two bodies at a fixed distance, like a massless rigid rod.
///
/// Unless set explicitly, the distance is the distance between the anchors when the
/// constraint is added to a space.
#[derive(Clone, Debug, PartialEq)]
pub struct PinJoint {
    /// The anchor on the first body in its local space.
    pub anchor_a: Vector,
    /// The anchor on the second body in its local space.
    pub anchor_b: Vector,
    distance: Option<Scalar>,

    r1: Vector,
    r2: Vector,
    n: Vector,
    n_mass: Scalar,
    bias: Scalar,
    jn_acc: Scalar,
}

impl PinJoint {
    /// Creates a pin joint between the given local anchors.
    pub fn new(anchor_a: Vector, anchor_b: Vector) -> Self {
        Self {
            anchor_a,
            anchor_b,
            distance: None,
            r1: Vector::ZERO,
            r2: Vector::ZERO,
            n: Vector::ZERO,
            n_mass: 0.0,
            bias: 0.0,
            jn_acc: 0.0,
        }
    }

    /// Returns the joint with the given distance instead of the initial distance of the anchors.
    pub fn with_distance(mut self, distance: Scalar) -> Self {
        self.set_distance(distance);
        self
    }

    /// The distance kept between the anchors.
    ///
    /// Zero until the constraint is added to a space, unless it was set explicitly.
    pub fn distance(&self) -> Scalar {
        self.distance.unwrap_or(0.0)
    }

    /// Sets the distance kept between the anchors.
    pub fn set_distance(&mut self, distance: Scalar) {
        self.distance = Some(distance.max(0.0));
    }
}

impl ConstraintSolver for PinJoint {
    fn resolve(&mut self, a: &Body, b: &Body) {
        if self.distance.is_none() {
            let pa = a.transform.point(self.anchor_a);
            let pb = b.transform.point(self.anchor_b);
            self.distance = Some(pa.distance(pb));
        }
    }

    fn pre_step(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar) {
        self.r1 = world_offset(a, self.anchor_a);
        self.r2 = world_offset(b, self.anchor_b);

        let delta = (b.p + self.r2) - (a.p + self.r1);
        let dist = delta.length();
        self.n = if dist > 0.0 { delta / dist } else { Vector::ZERO };

        self.n_mass = k_scalar(a, b, self.r1, self.r2, self.n).recip_or_zero();
        self.bias = params.bias(dist - self.distance(), dt);
    }

    fn apply_cached_impulse(&mut self, a: &mut Body, b: &mut Body, dt_coef: Scalar) {
        let j = self.n * (self.jn_acc * dt_coef);
        apply_impulses(a, b, self.r1, self.r2, j);
    }

    fn apply_impulse(&mut self, a: &mut Body, b: &mut Body, params: &ConstraintParams, dt: Scalar) {
        let vrn = normal_relative_velocity(a, b, self.r1, self.r2, self.n);
        let jn_max = params.max_impulse(dt);

        let jn = (self.bias - vrn) * self.n_mass;
        let jn_old = self.jn_acc;
        self.jn_acc = (jn_old + jn).clamp(-jn_max, jn_max);
        let jn = self.jn_acc - jn_old;

        apply_impulses(a, b, self.r1, self.r2, self.n * jn);
    }

    fn impulse(&self) -> Scalar {
        self.jn_acc.abs()
    }
}
