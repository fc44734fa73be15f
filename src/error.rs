//! Errors returned by fallible operations on a [`Space`](crate::space::Space)
//! and its bodies, shapes and constraints.

use thiserror::Error;

use crate::math::Scalar;

/// An error returned by the engine.
///
/// Only [`PhysicsError::Locked`] is recoverable in place: the same call succeeds
/// once [`Space::step`](crate::space::Space::step) has returned, or it can be scheduled
/// with [`Space::add_post_step_callback`](crate::space::Space::add_post_step_callback).
/// Every other error is reported before any state is modified.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PhysicsError {
    /// The space is stepping, so structural changes are not permitted.
    #[error(
        "the space is locked while it is stepping; schedule the change with a post-step callback instead"
    )]
    Locked,
    /// [`Space::step`](crate::space::Space::step) was called while the space was already stepping.
    #[error("the space is already stepping")]
    Reentrant,
    /// The time step was zero, negative or not finite.
    #[error("invalid time step {0}, the time step must be positive and finite")]
    InvalidTimeStep(Scalar),
    /// The handle refers to an object that has been removed.
    #[error("the handle refers to an object that no longer exists")]
    StaleHandle,
    /// The handle was created by a different space.
    #[error("the handle belongs to a different space")]
    ForeignSpace,
    /// The operation is not valid for the static body owned by the space.
    #[error("the static body of a space cannot be removed or retyped")]
    StaticBody,
    /// A constraint was created between a body and itself.
    #[error("a constraint must connect two different bodies")]
    SameBody,
    /// A shape was given invalid geometry.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    /// An argument was outside of its valid range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// An arbiter handle was used outside of the callback it was obtained in.
    #[error("the arbiter handle is only valid during the callback that produced it")]
    ArbiterExpired,
}

/// A specialized [`Result`](core::result::Result) type for the engine.
pub type Result<T, E = PhysicsError> = core::result::Result<T, E>;
