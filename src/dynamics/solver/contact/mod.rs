//! Solving contacts with sequential impulses.
//!
//! Each contact point has a normal impulse that keeps the shapes from penetrating and a
//! tangent impulse for Coulomb friction, limited by the friction coefficient times the
//! normal impulse. Penetration is corrected with a separate bias impulse.

use super::{
    apply_bias_impulses, apply_impulses, k_scalar, normal_relative_velocity, relative_velocity,
};
use crate::{collision::contact_types::Arbiter, dynamics::rigid_body::Body, math::*};

impl Arbiter {
    /// Computes the effective masses, bias velocities and bounce velocities of the contacts.
    ///
    /// `slop` is the allowed penetration and `bias_coef` the fraction of the remaining
    /// penetration corrected during this step.
    pub(crate) fn pre_step(
        &mut self,
        a: &Body,
        b: &Body,
        dt: Scalar,
        slop: Scalar,
        bias_coef: Scalar,
    ) {
        let n = self.normal;
        let body_delta = b.p - a.p;

        for contact in self.contacts.iter_mut() {
            let (r1, r2) = (contact.r1, contact.r2);

            contact.normal_mass = k_scalar(a, b, r1, r2, n).recip_or_zero();
            contact.tangent_mass = k_scalar(a, b, r1, r2, n.perp()).recip_or_zero();

            let distance = (r2 - r1 + body_delta).dot(n);
            contact.bias = -bias_coef * (distance + slop).min(0.0) / dt;
            contact.bias_impulse = 0.0;

            contact.bounce = normal_relative_velocity(a, b, r1, r2, n) * self.restitution;
        }
    }

    /// Applies the impulses accumulated during the previous step, scaled by `dt_coef`.
    ///
    /// The accumulated impulses are scaled as well, so they keep matching what was applied.
    /// Nothing is applied on the first step of a contact.
    pub(crate) fn apply_cached_impulse(&mut self, a: &mut Body, b: &mut Body, dt_coef: Scalar) {
        if self.is_first_contact() {
            return;
        }

        let n = self.normal;
        for contact in self.contacts.iter_mut() {
            contact.normal_impulse *= dt_coef;
            contact.tangent_impulse *= dt_coef;
            let j = n.rotate(Vector::new(contact.normal_impulse, contact.tangent_impulse));
            apply_impulses(a, b, contact.r1, contact.r2, j);
        }
    }

    /// Runs one solver iteration for the contacts.
    pub(crate) fn apply_impulse(&mut self, a: &mut Body, b: &mut Body) {
        let n = self.normal;
        let tangent = n.perp();
        let surface_velocity = self.surface_velocity;
        let friction = self.friction;

        for contact in self.contacts.iter_mut() {
            let (r1, r2) = (contact.r1, contact.r2);

            let vb1 = a.v_bias + r1.perp() * a.w_bias;
            let vb2 = b.v_bias + r2.perp() * b.w_bias;
            let vr = relative_velocity(a, b, r1, r2) + surface_velocity;

            let vbn = (vb2 - vb1).dot(n);
            let vrn = vr.dot(n);
            let vrt = vr.dot(tangent);

            // Position correction
            let jbn = (contact.bias - vbn) * contact.normal_mass;
            let jbn_old = contact.bias_impulse;
            contact.bias_impulse = (jbn_old + jbn).max(0.0);

            // Non-penetration
            let jn = -(contact.bounce + vrn) * contact.normal_mass;
            let jn_old = contact.normal_impulse;
            contact.normal_impulse = (jn_old + jn).max(0.0);

            // Friction
            let jt_max = friction * contact.normal_impulse;
            let jt = -vrt * contact.tangent_mass;
            let jt_old = contact.tangent_impulse;
            contact.tangent_impulse = (jt_old + jt).clamp(-jt_max, jt_max);

            apply_bias_impulses(a, b, r1, r2, n * (contact.bias_impulse - jbn_old));
            apply_impulses(
                a,
                b,
                r1,
                r2,
                n.rotate(Vector::new(
                    contact.normal_impulse - jn_old,
                    contact.tangent_impulse - jt_old,
                )),
            );
        }
    }
}
