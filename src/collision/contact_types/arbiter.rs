use core::any::Any;
use core::fmt;

use arrayvec::ArrayVec;

use super::{ContactManifold, ContactPoint, ContactPointSet, MAX_CONTACTS_PER_ARBITER};
use crate::{
    PhysicsError, Result,
    collision::layers::CollisionType,
    data_structures::pair_key::PairKey,
    math::*,
    space::{ArbiterHandle, BodyHandle, ShapeHandle, SpaceId},
};

/// The state of an [`Arbiter`] in the collision pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArbiterState {
    /// The shapes started touching this step, or the `begin` callback has not accepted the pair yet.
    FirstCollision,
    /// The shapes have been touching for more than one step.
    Normal,
    /// The contact is ignored for the rest of the current step.
    Ignore,
    /// The shapes stopped touching, but the arbiter is kept for a few steps in case they touch again.
    Cached,
    /// The arbiter is being removed together with one of its shapes.
    Invalidated,
}

/// Solver data of a single contact point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Contact {
    /// The offset of the point on the first shape from the center of gravity of the first body.
    pub r1: Vector,
    /// The offset of the point on the second shape from the center of gravity of the second body.
    pub r2: Vector,
    pub normal_mass: Scalar,
    pub tangent_mass: Scalar,
    pub bounce: Scalar,
    pub bias: Scalar,
    pub normal_impulse: Scalar,
    pub tangent_impulse: Scalar,
    pub bias_impulse: Scalar,
    pub id: u64,
}

/// A persistent contact between two shapes.
///
/// Arbiters are created when the bounding boxes of two shapes overlap and the shapes touch,
/// and are handed to the callbacks of the matching
/// [`CollisionHandler`](crate::collision::hooks::CollisionHandler). An arbiter reference can not
/// outlive the callback it was passed to, and an [`ArbiterHandle`] obtained from
/// [`Arbiter::handle`] expires as soon as that callback returns.
///
/// # Swapped Views
///
/// The shapes of an arbiter are stored in a fixed order, but each callback sees them in the
/// order of the collision types its handler was registered with. For a handler registered for
/// `(PLAYER, ENEMY)`, [`Arbiter::shapes`] always returns the player shape first and
/// [`Arbiter::normal`] points from the player to the enemy.
///
/// # Modifying Contacts
///
/// Changes made with [`Arbiter::set_restitution`], [`Arbiter::set_friction`],
/// [`Arbiter::set_surface_velocity`] and [`Arbiter::set_contact_point_set`] only last until the
/// end of the current step, after which the values are recomputed from the shapes.
pub struct Arbiter {
    pub(crate) space: SpaceId,
    pub(crate) key: PairKey,
    pub(crate) shape_a: ShapeHandle,
    pub(crate) shape_b: ShapeHandle,
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) type_a: CollisionType,
    pub(crate) type_b: CollisionType,

    pub(crate) normal: Vector,
    pub(crate) contacts: ArrayVec<Contact, MAX_CONTACTS_PER_ARBITER>,
    /// The world-space centers of gravity of the bodies when the contacts were computed.
    pub(crate) center_a: Vector,
    pub(crate) center_b: Vector,

    pub(crate) restitution: Scalar,
    pub(crate) friction: Scalar,
    pub(crate) surface_velocity: Vector,

    pub(crate) state: ArbiterState,
    pub(crate) stamp: u64,
    /// Identifies the callback dispatch currently handling the arbiter.
    pub(crate) serial: u64,
    pub(crate) swapped: bool,
    pub(crate) begin_accepted: bool,
    pub(crate) begin_invoked: bool,
    pub(crate) sensor: bool,

    user_data: Option<Box<dyn Any + Send>>,
}

impl fmt::Debug for Arbiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arbiter")
            .field("shape_a", &self.shape_a)
            .field("shape_b", &self.shape_b)
            .field("normal", &self.normal)
            .field("contacts", &self.contacts)
            .field("restitution", &self.restitution)
            .field("friction", &self.friction)
            .field("state", &self.state)
            .field("stamp", &self.stamp)
            .field("swapped", &self.swapped)
            .finish_non_exhaustive()
    }
}

impl Arbiter {
    pub(crate) fn new(
        space: SpaceId,
        shape_a: ShapeHandle,
        shape_b: ShapeHandle,
        body_a: BodyHandle,
        body_b: BodyHandle,
    ) -> Self {
        Self {
            space,
            key: PairKey::new(shape_a.index.slot, shape_b.index.slot),
            shape_a,
            shape_b,
            body_a,
            body_b,
            type_a: 0,
            type_b: 0,
            normal: Vector::ZERO,
            contacts: ArrayVec::new(),
            center_a: Vector::ZERO,
            center_b: Vector::ZERO,
            restitution: 0.0,
            friction: 0.0,
            surface_velocity: Vector::ZERO,
            state: ArbiterState::FirstCollision,
            stamp: 0,
            serial: 0,
            swapped: false,
            begin_accepted: false,
            begin_invoked: false,
            sensor: false,
            user_data: None,
        }
    }

    /// Replaces the contacts with a new manifold, carrying over the accumulated impulses
    /// of contacts produced by the same features.
    pub(crate) fn update_contacts(
        &mut self,
        manifold: &ContactManifold,
        center_a: Vector,
        center_b: Vector,
    ) {
        let mut contacts = ArrayVec::new();
        for point in &manifold.points {
            let mut contact = Contact {
                r1: point.point_a - center_a,
                r2: point.point_b - center_b,
                id: point.id,
                ..Default::default()
            };
            if let Some(old) = self.contacts.iter().find(|old| old.id == point.id) {
                contact.normal_impulse = old.normal_impulse;
                contact.tangent_impulse = old.tangent_impulse;
            }
            contacts.push(contact);
        }

        self.contacts = contacts;
        self.normal = manifold.normal;
        self.center_a = center_a;
        self.center_b = center_b;

        if self.state == ArbiterState::Cached {
            self.state = ArbiterState::FirstCollision;
            self.begin_accepted = false;
        }
    }

    /// Returns a handle that [`Space::check_arbiter`](crate::space::Space::check_arbiter)
    /// accepts until the callback it was obtained in returns.
    pub fn handle(&self) -> ArbiterHandle {
        ArbiterHandle {
            space: self.space,
            key: self.key,
            serial: self.serial,
        }
    }

    /// The two shapes in the order of the current handler.
    pub fn shapes(&self) -> (ShapeHandle, ShapeHandle) {
        if self.swapped {
            (self.shape_b, self.shape_a)
        } else {
            (self.shape_a, self.shape_b)
        }
    }

    /// The bodies of the two shapes in the order of the current handler.
    pub fn bodies(&self) -> (BodyHandle, BodyHandle) {
        if self.swapped {
            (self.body_b, self.body_a)
        } else {
            (self.body_a, self.body_b)
        }
    }

    /// The collision normal, pointing from the first shape to the second.
    pub fn normal(&self) -> Vector {
        if self.swapped { -self.normal } else { self.normal }
    }

    /// The number of contact points.
    #[inline]
    pub fn count(&self) -> usize {
        self.contacts.len()
    }

    fn world_points(&self, contact: &Contact) -> (Vector, Vector) {
        (self.center_a + contact.r1, self.center_b + contact.r2)
    }

    /// The contact point on the surface of the first shape.
    pub fn point_a(&self, index: usize) -> Option<Vector> {
        let contact = self.contacts.get(index)?;
        let (a, b) = self.world_points(contact);
        Some(if self.swapped { b } else { a })
    }

    /// The contact point on the surface of the second shape.
    pub fn point_b(&self, index: usize) -> Option<Vector> {
        let contact = self.contacts.get(index)?;
        let (a, b) = self.world_points(contact);
        Some(if self.swapped { a } else { b })
    }

    /// The penetration depth of a contact point, positive when the shapes overlap.
    pub fn penetration(&self, index: usize) -> Option<Scalar> {
        let contact = self.contacts.get(index)?;
        let (a, b) = self.world_points(contact);
        Some((a - b).dot(self.normal))
    }

    /// The contact points and normal in the order of the current handler.
    pub fn contact_point_set(&self) -> ContactPointSet {
        let set = ContactPointSet {
            normal: self.normal,
            points: self
                .contacts
                .iter()
                .map(|contact| {
                    let (point_a, point_b) = self.world_points(contact);
                    ContactPoint {
                        point_a,
                        point_b,
                        penetration: (point_a - point_b).dot(self.normal),
                    }
                })
                .collect(),
        };
        if self.swapped { set.flipped() } else { set }
    }

    /// Replaces the contact points and normal for the rest of the step.
    ///
    /// The number of points must match [`Arbiter::count`]. Penetration depths are recomputed
    /// from the points, so only the points and the normal are used.
    pub fn set_contact_point_set(&mut self, set: &ContactPointSet) -> Result<()> {
        if set.len() != self.contacts.len() {
            return Err(PhysicsError::InvalidArgument(format!(
                "the number of contact points can not be changed from {} to {}",
                self.contacts.len(),
                set.len()
            )));
        }

        let set = if self.swapped { set.flipped() } else { set.clone() };
        self.normal = set.normal;
        for (contact, point) in self.contacts.iter_mut().zip(&set.points) {
            contact.r1 = point.point_a - self.center_a;
            contact.r2 = point.point_b - self.center_b;
        }
        Ok(())
    }

    /// The sum of the impulses applied by the solver during the step, in the direction of the normal.
    ///
    /// This is only meaningful in a post-solve callback or after the step.
    pub fn total_impulse(&self) -> Vector {
        let sum = self
            .contacts
            .iter()
            .map(|contact| {
                self.normal
                    .rotate(Vector::new(contact.normal_impulse, contact.tangent_impulse))
            })
            .sum::<Vector>();
        if self.swapped { -sum } else { sum }
    }

    /// The kinetic energy lost to friction and inelastic collision during the step.
    pub fn total_kinetic_energy(&self) -> Scalar {
        let restitution_coef = (1.0 - self.restitution) / (1.0 + self.restitution);
        self.contacts
            .iter()
            .map(|contact| {
                let normal_impulse = contact.normal_impulse;
                let tangent_impulse = contact.tangent_impulse;
                normal_impulse * normal_impulse * restitution_coef
                    * contact.normal_mass.recip_or_zero()
                    + tangent_impulse * tangent_impulse * contact.tangent_mass.recip_or_zero()
            })
            .sum()
    }

    /// Ignores the contact for the rest of the current step.
    ///
    /// The shapes are still tracked, and the pre-solve callback is called again next step
    /// if they keep touching.
    #[inline]
    pub fn ignore(&mut self) {
        self.state = ArbiterState::Ignore;
    }

    /// The state of the arbiter.
    #[inline]
    pub fn state(&self) -> ArbiterState {
        self.state
    }

    /// Returns `true` during the first step in which the shapes touch.
    #[inline]
    pub fn is_first_contact(&self) -> bool {
        self.state == ArbiterState::FirstCollision
    }

    /// Returns `true` if the separate callback was triggered by removing one of the shapes.
    #[inline]
    pub fn is_removal(&self) -> bool {
        self.state == ArbiterState::Invalidated
    }

    /// Returns `true` if either shape is a sensor.
    #[inline]
    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    /// The coefficient of restitution, the product of the elasticities of the shapes.
    #[inline]
    pub fn restitution(&self) -> Scalar {
        self.restitution
    }

    /// Overrides the coefficient of restitution for the current step.
    #[inline]
    pub fn set_restitution(&mut self, restitution: Scalar) {
        self.restitution = restitution;
    }

    /// The coefficient of friction, the product of the frictions of the shapes.
    #[inline]
    pub fn friction(&self) -> Scalar {
        self.friction
    }

    /// Overrides the coefficient of friction for the current step.
    #[inline]
    pub fn set_friction(&mut self, friction: Scalar) {
        self.friction = friction;
    }

    /// The relative tangential surface velocity of the shapes.
    pub fn surface_velocity(&self) -> Vector {
        if self.swapped {
            -self.surface_velocity
        } else {
            self.surface_velocity
        }
    }

    /// Overrides the relative surface velocity for the current step.
    pub fn set_surface_velocity(&mut self, velocity: Vector) {
        self.surface_velocity = if self.swapped { -velocity } else { velocity };
    }

    /// User data attached to the arbiter. It is kept for as long as the shapes touch.
    pub fn user_data(&self) -> Option<&(dyn Any + Send)> {
        self.user_data.as_deref()
    }

    /// Mutable user data attached to the arbiter.
    pub fn user_data_mut(&mut self) -> Option<&mut (dyn Any + Send)> {
        self.user_data.as_deref_mut()
    }

    /// Attaches user data to the arbiter, returning the previous data.
    pub fn set_user_data(&mut self, data: impl Any + Send) -> Option<Box<dyn Any + Send>> {
        self.user_data.replace(Box::new(data))
    }
}
