//! The sequential impulse solver.
//!
//! Contacts and constraints are solved at the velocity level. Each step, every
//! [`Arbiter`](crate::collision::contact_types::Arbiter) and constraint:
//!
//! 1. Precomputes its effective masses and bias velocities (`pre_step`).
//! 2. Applies the impulses accumulated during the previous step, scaled by the ratio of the
//!    time steps, so that the solver starts from a good guess (warm starting).
//! 3. Iteratively applies corrective impulses, clamping the accumulated impulse to its limits.
//!
//! Position errors are corrected with separate bias velocities that are discarded after
//! the positions have been integrated, so that the correction does not add energy.

pub(crate) mod contact;

use crate::{dynamics::rigid_body::Body, math::*};

/// The velocity of the point at `r2` on `b` relative to the point at `r1` on `a`.
#[inline]
pub(crate) fn relative_velocity(a: &Body, b: &Body, r1: Vector, r2: Vector) -> Vector {
    let v1 = a.velocity + r1.perp() * a.angular_velocity;
    let v2 = b.velocity + r2.perp() * b.angular_velocity;
    v2 - v1
}

/// The relative velocity along `n`.
#[inline]
pub(crate) fn normal_relative_velocity(
    a: &Body,
    b: &Body,
    r1: Vector,
    r2: Vector,
    n: Vector,
) -> Scalar {
    relative_velocity(a, b, r1, r2).dot(n)
}

/// Applies `j` to `b` and `-j` to `a`.
#[inline]
pub(crate) fn apply_impulses(a: &mut Body, b: &mut Body, r1: Vector, r2: Vector, j: Vector) {
    a.apply_impulse(-j, r1);
    b.apply_impulse(j, r2);
}

/// Applies the bias impulse `j` to `b` and `-j` to `a`.
#[inline]
pub(crate) fn apply_bias_impulses(a: &mut Body, b: &mut Body, r1: Vector, r2: Vector, j: Vector) {
    a.apply_bias_impulse(-j, r1);
    b.apply_bias_impulse(j, r2);
}

#[inline]
fn k_scalar_body(body: &Body, r: Vector, n: Vector) -> Scalar {
    let rcn = cross(r, n);
    body.inv_mass + body.inv_moment * rcn * rcn
}

/// The inverse effective mass of the bodies along `n` at the offsets `r1` and `r2`.
///
/// Zero if both bodies have infinite mass.
#[inline]
pub(crate) fn k_scalar(a: &Body, b: &Body, r1: Vector, r2: Vector, n: Vector) -> Scalar {
    k_scalar_body(a, r1, n) + k_scalar_body(b, r2, n)
}

/// The effective mass matrix of a point-to-point constraint at the offsets `r1` and `r2`.
pub(crate) fn k_tensor(a: &Body, b: &Body, r1: Vector, r2: Vector) -> Matrix2 {
    let mass_sum = a.inv_mass + b.inv_mass;

    // Start with the identity scaled by the mass sum.
    let (mut k11, mut k12, mut k21, mut k22) = (mass_sum, 0.0, 0.0, mass_sum);

    // Add the influence of the rotation of each body.
    for (inv_moment, r) in [(a.inv_moment, r1), (b.inv_moment, r2)] {
        let rx_sq = r.x * r.x * inv_moment;
        let ry_sq = r.y * r.y * inv_moment;
        let rxy = -r.x * r.y * inv_moment;
        k11 += ry_sq;
        k12 += rxy;
        k21 += rxy;
        k22 += rx_sq;
    }

    let det_inv = (k11 * k22 - k12 * k21).recip_or_zero();
    Matrix2::from_cols(
        Vector::new(k22 * det_inv, -k21 * det_inv),
        Vector::new(-k12 * det_inv, k11 * det_inv),
    )
}

/// The fraction of the error corrected per step for an error bias given as the fraction of
/// error left after one second.
#[inline]
pub(crate) fn bias_coef(error_bias: Scalar, dt: Scalar) -> Scalar {
    1.0 - error_bias.powf(dt)
}

/// Clamps the length of `v` to `max`.
#[inline]
pub(crate) fn clamp_length(v: Vector, max: Scalar) -> Vector {
    if v.length_squared() > max * max {
        v.normalize_or_zero() * max
    } else {
        v
    }
}
