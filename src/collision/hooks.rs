//! Collision handlers for filtering, modifying and observing contacts.
//!
//! See [`CollisionHandler`] for more information.

use core::fmt;
use std::collections::HashMap;

use arrayvec::ArrayVec;

use crate::{
    collision::{
        contact_types::Arbiter,
        layers::{CollisionType, WILDCARD_COLLISION_TYPE},
    },
    space::{ArbiterHandle, Space},
};

/// A callback that can reject a contact by returning `false`.
pub type ArbiterFilterFn = Box<dyn FnMut(&mut Arbiter, &mut Space) -> bool + Send>;

/// A callback that observes a contact.
pub type ArbiterNotifyFn = Box<dyn FnMut(&mut Arbiter, &mut Space) + Send>;

/// A set of callbacks invoked for contacts between shapes with given
/// [collision types](crate::collision::shape::Shape::collision_type).
///
/// Handlers are owned by the [`Space`] and created on demand with
/// [`Space::collision_handler`], [`Space::wildcard_collision_handler`] and
/// [`Space::default_collision_handler`].
///
/// # Callbacks
///
/// - `begin`: Called when two shapes start touching. Returning `false` ignores the contact
///   for the current step, and `begin` is called again next step while the shapes keep touching.
/// - `pre_solve`: Called every step the shapes touch, after `begin` accepted the contact.
///   Returning `false` ignores the contact for the current step.
/// - `post_solve`: Called after the solver for contacts that were solved.
///   The impulses of the [`Arbiter`] can be read here.
/// - `separate`: Called when the shapes stop touching or one of them is removed,
///   for every pair whose `begin` callback was called.
///
/// Callbacks receive the space mutably, but the space is locked. Adding or removing
/// bodies, shapes and constraints fails with [`PhysicsError::Locked`](crate::PhysicsError::Locked)
/// and must be deferred with [`Space::add_post_step_callback`].
///
/// # Dispatch
///
/// For a pair of shapes with types `(a, b)`, the handler registered for `(a, b)` or `(b, a)` is
/// called first, or the default handler if there is none. Then the wildcard handlers registered
/// for `a` and for `b` are called. For `begin` and `pre_solve`, any of them returning `false`
/// rejects the contact and stops the chain.
///
/// Each handler sees the shapes in the order of its own types, so for a handler registered
/// for `(PLAYER, ENEMY)` the player shape is always the first shape of the arbiter.
///
/// ```
/// use rigid2d::prelude::*;
///
/// const PLAYER: CollisionType = 1;
/// const COIN: CollisionType = 2;
///
/// let mut space = Space::new();
/// space.collision_handler(PLAYER, COIN).set_begin(|arbiter, space| {
///     let (_player, coin) = arbiter.shapes();
///     // Shapes can not be removed during the step, so the removal is deferred.
///     space.add_post_step_callback(move |space| {
///         let _ = space.remove_shape(coin);
///     });
///     false
/// });
/// ```
pub struct CollisionHandler {
    type_a: CollisionType,
    type_b: CollisionType,
    pub(crate) begin: Option<ArbiterFilterFn>,
    pub(crate) pre_solve: Option<ArbiterFilterFn>,
    pub(crate) post_solve: Option<ArbiterNotifyFn>,
    pub(crate) separate: Option<ArbiterNotifyFn>,
}

impl fmt::Debug for CollisionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollisionHandler")
            .field("type_a", &self.type_a)
            .field("type_b", &self.type_b)
            .field("begin", &self.begin.is_some())
            .field("pre_solve", &self.pre_solve.is_some())
            .field("post_solve", &self.post_solve.is_some())
            .field("separate", &self.separate.is_some())
            .finish()
    }
}

impl CollisionHandler {
    pub(crate) fn new(type_a: CollisionType, type_b: CollisionType) -> Self {
        Self {
            type_a,
            type_b,
            begin: None,
            pre_solve: None,
            post_solve: None,
            separate: None,
        }
    }

    /// The first collision type of the handler, or [`WILDCARD_COLLISION_TYPE`] for the default handler.
    #[inline]
    pub fn type_a(&self) -> CollisionType {
        self.type_a
    }

    /// The second collision type of the handler, or [`WILDCARD_COLLISION_TYPE`] for wildcard handlers.
    #[inline]
    pub fn type_b(&self) -> CollisionType {
        self.type_b
    }

    /// Sets the callback for when two shapes start touching.
    pub fn set_begin(
        &mut self,
        callback: impl FnMut(&mut Arbiter, &mut Space) -> bool + Send + 'static,
    ) -> &mut Self {
        self.begin = Some(Box::new(callback));
        self
    }

    /// Sets the callback invoked every step before the contact is solved.
    pub fn set_pre_solve(
        &mut self,
        callback: impl FnMut(&mut Arbiter, &mut Space) -> bool + Send + 'static,
    ) -> &mut Self {
        self.pre_solve = Some(Box::new(callback));
        self
    }

    /// Sets the callback invoked every step after the contact was solved.
    pub fn set_post_solve(
        &mut self,
        callback: impl FnMut(&mut Arbiter, &mut Space) + Send + 'static,
    ) -> &mut Self {
        self.post_solve = Some(Box::new(callback));
        self
    }

    /// Sets the callback for when two shapes stop touching.
    pub fn set_separate(
        &mut self,
        callback: impl FnMut(&mut Arbiter, &mut Space) + Send + 'static,
    ) -> &mut Self {
        self.separate = Some(Box::new(callback));
        self
    }

    /// Removes all callbacks, restoring the default behavior.
    pub fn clear(&mut self) {
        self.begin = None;
        self.pre_solve = None;
        self.post_solve = None;
        self.separate = None;
    }
}

/// Identifies a handler in a [`HandlerRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum HandlerSlot {
    Default,
    Pair(CollisionType, CollisionType),
    Wildcard(CollisionType),
}

/// The handlers of a space, and the order in which they are called for a pair of collision types.
pub(crate) struct HandlerRegistry {
    default: CollisionHandler,
    pairs: HashMap<(CollisionType, CollisionType), CollisionHandler>,
    wildcards: HashMap<CollisionType, CollisionHandler>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self {
            default: CollisionHandler::new(WILDCARD_COLLISION_TYPE, WILDCARD_COLLISION_TYPE),
            pairs: HashMap::new(),
            wildcards: HashMap::new(),
        }
    }
}

#[inline]
fn pair_key(a: CollisionType, b: CollisionType) -> (CollisionType, CollisionType) {
    (a.min(b), a.max(b))
}

impl HandlerRegistry {
    pub fn default_handler(&mut self) -> &mut CollisionHandler {
        &mut self.default
    }

    pub fn pair_handler(&mut self, a: CollisionType, b: CollisionType) -> &mut CollisionHandler {
        self.pairs
            .entry(pair_key(a, b))
            .or_insert_with(|| CollisionHandler::new(a, b))
    }

    pub fn wildcard_handler(&mut self, ty: CollisionType) -> &mut CollisionHandler {
        self.wildcards
            .entry(ty)
            .or_insert_with(|| CollisionHandler::new(ty, WILDCARD_COLLISION_TYPE))
    }

    pub fn get_mut(&mut self, slot: HandlerSlot) -> Option<&mut CollisionHandler> {
        match slot {
            HandlerSlot::Default => Some(&mut self.default),
            HandlerSlot::Pair(a, b) => self.pairs.get_mut(&(a, b)),
            HandlerSlot::Wildcard(ty) => self.wildcards.get_mut(&ty),
        }
    }

    /// The number of handlers registered for type pairs and wildcards.
    pub fn len(&self) -> usize {
        self.pairs.len() + self.wildcards.len()
    }

    /// Returns `true` if the primary handler for the types sees the shapes in swapped order.
    pub fn primary_swapped(&self, type_a: CollisionType, type_b: CollisionType) -> bool {
        self.pairs
            .get(&pair_key(type_a, type_b))
            .is_some_and(|handler| handler.type_a != type_a)
    }

    /// The handlers to call for a pair of collision types, in order, with whether each of them
    /// sees the shapes in swapped order.
    pub fn dispatch(
        &self,
        type_a: CollisionType,
        type_b: CollisionType,
    ) -> ArrayVec<(HandlerSlot, bool), 3> {
        let mut slots = ArrayVec::new();

        let key = pair_key(type_a, type_b);
        match self.pairs.get(&key) {
            Some(handler) => slots.push((HandlerSlot::Pair(key.0, key.1), handler.type_a != type_a)),
            None => slots.push((HandlerSlot::Default, false)),
        }

        if self.wildcards.contains_key(&type_a) {
            slots.push((HandlerSlot::Wildcard(type_a), false));
        }
        if self.wildcards.contains_key(&type_b) {
            slots.push((HandlerSlot::Wildcard(type_b), true));
        }

        slots
    }
}

/// Selects one of the filtering callbacks of a handler.
pub(crate) type FilterSelector = fn(&mut CollisionHandler) -> &mut Option<ArbiterFilterFn>;

/// Selects one of the notification callbacks of a handler.
pub(crate) type NotifySelector = fn(&mut CollisionHandler) -> &mut Option<ArbiterNotifyFn>;

pub(crate) fn select_begin(handler: &mut CollisionHandler) -> &mut Option<ArbiterFilterFn> {
    &mut handler.begin
}

pub(crate) fn select_pre_solve(handler: &mut CollisionHandler) -> &mut Option<ArbiterFilterFn> {
    &mut handler.pre_solve
}

pub(crate) fn select_post_solve(handler: &mut CollisionHandler) -> &mut Option<ArbiterNotifyFn> {
    &mut handler.post_solve
}

pub(crate) fn select_separate(handler: &mut CollisionHandler) -> &mut Option<ArbiterNotifyFn> {
    &mut handler.separate
}

impl Space {
    /// Returns the handler for contacts between shapes of types `a` and `b`, creating it if needed.
    ///
    /// The handler is shared by `(a, b)` and `(b, a)`. Its callbacks see the shapes in the order
    /// of the types it was first created with.
    pub fn collision_handler(&mut self, a: CollisionType, b: CollisionType) -> &mut CollisionHandler {
        self.handlers.pair_handler(a, b)
    }

    /// Returns the handler called for every contact involving a shape of type `ty`,
    /// in addition to the handler of the pair.
    pub fn wildcard_collision_handler(&mut self, ty: CollisionType) -> &mut CollisionHandler {
        self.handlers.wildcard_handler(ty)
    }

    /// Returns the handler used for pairs of types without a registered handler.
    pub fn default_collision_handler(&mut self) -> &mut CollisionHandler {
        self.handlers.default_handler()
    }

    /// Runs a filtering callback chain for the arbiter, stopping at the first rejection.
    ///
    /// The callback is taken out of its handler for the duration of the call, so the handler
    /// can be replaced from within the callback.
    pub(crate) fn run_filter_callbacks(
        &mut self,
        arbiter: &mut Arbiter,
        select: FilterSelector,
    ) -> bool {
        let primary_swapped = arbiter.swapped;
        let previous = self.activate_arbiter(arbiter);
        let mut accepted = true;

        for (slot, swapped) in self.handlers.dispatch(arbiter.type_a, arbiter.type_b) {
            let Some(mut callback) = self.handlers.get_mut(slot).and_then(|h| select(h).take())
            else {
                continue;
            };

            arbiter.swapped = swapped;
            accepted = callback(arbiter, self);

            if let Some(handler) = self.handlers.get_mut(slot) {
                select(handler).get_or_insert(callback);
            }
            if !accepted {
                break;
            }
        }

        arbiter.swapped = primary_swapped;
        self.active_arbiter = previous;
        accepted
    }

    /// Runs every notification callback for the arbiter.
    pub(crate) fn run_notify_callbacks(&mut self, arbiter: &mut Arbiter, select: NotifySelector) {
        let primary_swapped = arbiter.swapped;
        let previous = self.activate_arbiter(arbiter);

        for (slot, swapped) in self.handlers.dispatch(arbiter.type_a, arbiter.type_b) {
            let Some(mut callback) = self.handlers.get_mut(slot).and_then(|h| select(h).take())
            else {
                continue;
            };

            arbiter.swapped = swapped;
            callback(arbiter, self);

            if let Some(handler) = self.handlers.get_mut(slot) {
                select(handler).get_or_insert(callback);
            }
        }

        arbiter.swapped = primary_swapped;
        self.active_arbiter = previous;
    }

    /// Gives the arbiter a fresh serial so that handles from earlier callbacks expire.
    fn activate_arbiter(&mut self, arbiter: &mut Arbiter) -> Option<ArbiterHandle> {
        self.callback_serial += 1;
        arbiter.serial = self.callback_serial;
        self.active_arbiter.replace(arbiter.handle())
    }
}
