//! Collision detection for [`Shape`]s.
//!
//! Collision detection involves determining pairs of shapes that may currently be in contact,
//! and computing contact data for each intersection. The contacts are then kept in
//! [`Arbiter`]s and resolved by the [solver](crate::dynamics::solver).
//!
//! # Phases
//!
//! Every [step](crate::space::Space::step), collision detection runs in two phases:
//!
//! - The [broad phase](broad_phase) finds pairs of shapes with overlapping
//!   [bounding boxes](crate::math::BoundingBox) using a [`SpatialIndex`](broad_phase::SpatialIndex).
//!   Pairs that can never collide are skipped here, such as shapes of the same body or shapes
//!   whose [`ShapeFilter`]s reject each other.
//! - The [narrow phase](narrow_phase) computes the actual contact points of each pair.
//!
//! # Collision Callbacks
//!
//! Collisions can be observed and modified with [`CollisionHandler`]s, which are registered
//! for pairs of [`CollisionType`]s. See the [`hooks`] module for the order in which they run.
//!
//! # Filtering
//!
//! Groups, categories and masks are combined into a [`ShapeFilter`]. See the [`layers`] module.

pub mod broad_phase;
pub mod contact_types;
pub mod hooks;
pub mod layers;
pub mod narrow_phase;
pub mod shape;

pub use contact_types::{Arbiter, ArbiterState, ContactPoint, ContactPointSet};
pub use hooks::CollisionHandler;
pub use layers::{CollisionType, Group, LayerMask, ShapeFilter};
pub use narrow_phase::shapes_collide;
pub use shape::{Shape, ShapeKind};
