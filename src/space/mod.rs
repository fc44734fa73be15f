//! The [`Space`], which owns every body, shape and constraint of a simulation and steps them.
//!
//! # Locking
//!
//! While [`Space::step`] runs, the space is locked. Collision and constraint callbacks receive
//! the space mutably and may read it, change velocities or query it, but adding or removing
//! bodies, shapes and constraints fails with [`PhysicsError::Locked`]. Such changes are
//! scheduled with [`Space::add_post_step_callback`] and run right after the step.
//!
//! # Handles
//!
//! Objects added to a space are referred to by handles, see the [`handles`] module.

mod config;
pub mod handles;
mod post_step;
mod step;

pub use config::SpaceConfig;
pub use handles::{ArbiterHandle, BodyHandle, ConstraintHandle, ShapeHandle, SpaceId};
pub use post_step::{PostStepFn, PostStepKey};

use core::fmt;

use indexmap::IndexMap;
use itertools::Itertools;
use slab::Slab;
use tracing::debug;

use crate::{
    PhysicsError, Result,
    collision::{
        broad_phase::{BroadPhaseKind, SpatialIndex},
        contact_types::{Arbiter, ArbiterState},
        hooks::{HandlerRegistry, select_separate},
        shape::Shape,
    },
    data_structures::{arena::Arena, pair_key::PairKey},
    dynamics::{
        joints::{Constraint, ConstraintSolver},
        rigid_body::{Body, BodyType, mass_properties::MassInfo},
        sleeping::SleepGroup,
    },
    math::*,
};
use post_step::PostStepQueue;

/// A container for bodies, shapes and constraints that advances them through time.
///
/// A space always has a static body, returned by [`Space::static_body`], which shapes for
/// level geometry can be attached to without creating a body of their own.
///
/// ```
/// use rigid2d::prelude::*;
///
/// let mut space = Space::new();
/// space.set_gravity(Vector::new(0.0, -10.0));
///
/// // A static floor and a falling ball.
/// let floor = Shape::segment(Vector::new(-10.0, 0.0), Vector::new(10.0, 0.0), 0.0).unwrap();
/// space.add_shape(space.static_body(), floor.with_friction(1.0)).unwrap();
///
/// let ball = space
///     .add_body(Body::dynamic(1.0, 1.0).with_position(Vector::new(0.0, 5.0)))
///     .unwrap();
/// space
///     .add_shape(ball, Shape::circle(0.5, Vector::ZERO).unwrap().with_mass(1.0))
///     .unwrap();
///
/// for _ in 0..300 {
///     space.step(1.0 / 60.0).unwrap();
/// }
/// assert!((space.body(ball).unwrap().position().y - 0.5).abs() < 0.2);
/// ```
pub struct Space {
    pub(crate) id: SpaceId,
    pub(crate) config: SpaceConfig,

    pub(crate) bodies: Arena<Body>,
    pub(crate) shapes: Arena<Shape>,
    pub(crate) constraints: Arena<Constraint>,
    pub(crate) static_body: BodyHandle,

    /// Shapes of dynamic and kinematic bodies, updated every step.
    pub(crate) dynamic_index: Box<dyn SpatialIndex>,
    /// Shapes of static bodies, only updated when reindexed.
    pub(crate) static_index: Box<dyn SpatialIndex>,

    pub(crate) arbiters: IndexMap<PairKey, Arbiter>,
    pub(crate) handlers: HandlerRegistry,
    pub(crate) post_step: PostStepQueue,
    pub(crate) sleep_groups: Slab<SleepGroup>,

    pub(crate) locked: bool,
    pub(crate) stamp: u64,
    /// The arbiter whose callbacks are running, if any.
    pub(crate) active_arbiter: Option<ArbiterHandle>,
    pub(crate) callback_serial: u64,
    pub(crate) current_dt: Scalar,
    pub(crate) previous_dt: Scalar,

    #[cfg(feature = "parallel")]
    pub(crate) pool: Option<rayon::ThreadPool>,
}

impl fmt::Debug for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Space")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("bodies", &self.bodies.len())
            .field("shapes", &self.shapes.len())
            .field("constraints", &self.constraints.len())
            .field("arbiters", &self.arbiters.len())
            .field("locked", &self.locked)
            .field("stamp", &self.stamp)
            .finish_non_exhaustive()
    }
}

impl Default for Space {
    fn default() -> Self {
        Self::new()
    }
}

impl Space {
    /// Creates an empty space with the default [`SpaceConfig`].
    pub fn new() -> Self {
        Self::with_config(SpaceConfig::default())
    }

    /// Creates an empty space with the given configuration.
    pub fn with_config(config: SpaceConfig) -> Self {
        let id = SpaceId::next();

        let mut bodies = Arena::new();
        let index = bodies.insert(Body::static_body());
        let static_body = BodyHandle::new(id, index);
        bodies[index].handle = Some(static_body);

        debug!(?id, "created space");

        Self {
            id,
            dynamic_index: config.broad_phase.build(),
            static_index: config.broad_phase.build(),
            #[cfg(feature = "parallel")]
            pool: build_pool(config.threads),
            config,
            bodies,
            shapes: Arena::new(),
            constraints: Arena::new(),
            static_body,
            arbiters: IndexMap::new(),
            handlers: HandlerRegistry::default(),
            post_step: PostStepQueue::default(),
            sleep_groups: Slab::new(),
            locked: false,
            stamp: 0,
            active_arbiter: None,
            callback_serial: 0,
            current_dt: 0.0,
            previous_dt: 0.0,
        }
    }

    /// The unique identifier of the space.
    #[inline]
    pub fn id(&self) -> SpaceId {
        self.id
    }

    /// The configuration of the space.
    #[inline]
    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    /// The static body owned by the space. It can not be removed.
    #[inline]
    pub fn static_body(&self) -> BodyHandle {
        self.static_body
    }

    /// Returns `true` while the space is stepping.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// The time step of the current or last step.
    #[inline]
    pub fn current_time_step(&self) -> Scalar {
        self.current_dt
    }

    /// The number of steps taken so far.
    #[inline]
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// The number of solver iterations per step.
    #[inline]
    pub fn iterations(&self) -> usize {
        self.config.iterations
    }

    /// Sets the number of solver iterations per step.
    pub fn set_iterations(&mut self, iterations: usize) {
        self.config.iterations = iterations;
    }

    /// The gravity applied to dynamic bodies.
    #[inline]
    pub fn gravity(&self) -> Vector {
        self.config.gravity
    }

    /// Sets the gravity applied to dynamic bodies.
    pub fn set_gravity(&mut self, gravity: Vector) {
        self.config.gravity = gravity;
    }

    /// The fraction of velocity bodies keep after one second.
    #[inline]
    pub fn damping(&self) -> Scalar {
        self.config.damping
    }

    /// Sets the fraction of velocity bodies keep after one second.
    pub fn set_damping(&mut self, damping: Scalar) -> Result<()> {
        if !(0.0..=1.0).contains(&damping) {
            return Err(PhysicsError::InvalidArgument(format!(
                "damping must be within [0, 1], got {damping}"
            )));
        }
        self.config.damping = damping;
        Ok(())
    }

    /// The speed below which a body counts as idle.
    #[inline]
    pub fn idle_speed_threshold(&self) -> Scalar {
        self.config.idle_speed_threshold
    }

    /// Sets the speed below which a body counts as idle. Zero derives it from gravity.
    pub fn set_idle_speed_threshold(&mut self, threshold: Scalar) {
        self.config.idle_speed_threshold = threshold;
    }

    /// How long bodies must be idle before they fall asleep.
    #[inline]
    pub fn sleep_time_threshold(&self) -> Scalar {
        self.config.sleep_time_threshold
    }

    /// Sets how long bodies must be idle before they fall asleep.
    ///
    /// An infinite threshold disables sleeping and wakes every sleeping body.
    pub fn set_sleep_time_threshold(&mut self, threshold: Scalar) {
        self.config.sleep_time_threshold = threshold;

        if threshold.is_infinite() && !self.sleep_groups.is_empty() {
            self.sleep_groups.clear();
            for (_, body) in self.bodies.iter_mut() {
                if body.sleep.group.take().is_some() {
                    body.sleep.idle_time = 0.0;
                }
            }
        }
    }

    /// The amount of overlap allowed between shapes.
    #[inline]
    pub fn collision_slop(&self) -> Scalar {
        self.config.collision_slop
    }

    /// Sets the amount of overlap allowed between shapes.
    pub fn set_collision_slop(&mut self, slop: Scalar) {
        self.config.collision_slop = slop;
    }

    /// The fraction of overlap left uncorrected after one second.
    #[inline]
    pub fn collision_bias(&self) -> Scalar {
        self.config.collision_bias
    }

    /// Sets the fraction of overlap left uncorrected after one second.
    pub fn set_collision_bias(&mut self, bias: Scalar) {
        self.config.collision_bias = bias;
    }

    /// The number of steps arbiters are kept after their shapes separate.
    #[inline]
    pub fn collision_persistence(&self) -> u64 {
        self.config.collision_persistence
    }

    /// Sets the number of steps arbiters are kept after their shapes separate.
    pub fn set_collision_persistence(&mut self, persistence: u64) {
        self.config.collision_persistence = persistence;
    }

    /// The number of threads used by the narrow phase.
    #[inline]
    pub fn threads(&self) -> usize {
        self.config.threads
    }

    /// Sets the number of threads used by the narrow phase. Zero uses one thread per core.
    ///
    /// Without the `parallel` feature the narrow phase always runs on the calling thread.
    pub fn set_threads(&mut self, threads: usize) {
        self.config.threads = threads;
        #[cfg(feature = "parallel")]
        {
            self.pool = build_pool(threads);
        }
    }

    /// The number of bodies, excluding the static body of the space.
    pub fn body_count(&self) -> usize {
        self.bodies.len() - 1
    }

    /// The number of shapes.
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// The number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// The number of arbiters, including cached arbiters of shapes that recently separated.
    pub fn arbiter_count(&self) -> usize {
        self.arbiters.len()
    }

    pub(crate) fn check_unlocked(&self) -> Result<()> {
        if self.locked {
            Err(PhysicsError::Locked)
        } else {
            Ok(())
        }
    }

    #[inline]
    fn check_space(&self, space: SpaceId) -> Result<()> {
        if space == self.id {
            Ok(())
        } else {
            Err(PhysicsError::ForeignSpace)
        }
    }

    pub(crate) fn check_body(&self, handle: BodyHandle) -> Result<&Body> {
        self.check_space(handle.space)?;
        self.bodies.get(handle.index).ok_or(PhysicsError::StaleHandle)
    }

    pub(crate) fn check_shape(&self, handle: ShapeHandle) -> Result<&Shape> {
        self.check_space(handle.space)?;
        self.shapes.get(handle.index).ok_or(PhysicsError::StaleHandle)
    }

    pub(crate) fn check_constraint(&self, handle: ConstraintHandle) -> Result<&Constraint> {
        self.check_space(handle.space)?;
        self.constraints
            .get(handle.index)
            .ok_or(PhysicsError::StaleHandle)
    }

    /// Adds a body to the space.
    pub fn add_body(&mut self, mut body: Body) -> Result<BodyHandle> {
        self.check_unlocked()?;

        body.shapes.clear();
        body.constraints.clear();
        body.sleep.group = None;
        let index = self.bodies.insert(body);
        let handle = BodyHandle::new(self.id, index);
        self.bodies[index].handle = Some(handle);

        debug!(?handle, body_type = ?self.bodies[index].body_type, "added body");
        Ok(handle)
    }

    /// Removes a body along with its shapes and constraints, and returns it.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<Body> {
        self.check_unlocked()?;
        self.check_body(handle)?;
        if handle == self.static_body {
            return Err(PhysicsError::StaticBody);
        }

        self.activate_body(handle);
        let mark = self.post_step.len();
        let body = &self.bodies[handle.index];
        let constraints = body.constraints.clone();
        let shapes = body.shapes.clone();
        for constraint in constraints {
            self.remove_constraint(constraint)?;
        }
        for shape in shapes {
            self.detach_shape(shape)?;
        }

        let mut body = self
            .bodies
            .remove(handle.index)
            .ok_or(PhysicsError::StaleHandle)?;
        body.handle = None;
        body.sleep = Default::default();

        debug!(?handle, "removed body");
        self.run_post_step_callbacks_after(mark);
        Ok(body)
    }

    /// Returns `true` if the handle refers to a body of this space.
    pub fn contains_body(&self, handle: BodyHandle) -> bool {
        self.check_body(handle).is_ok()
    }

    /// Returns a reference to a body.
    pub fn body(&self, handle: BodyHandle) -> Result<&Body> {
        self.check_body(handle)
    }

    /// Returns a mutable reference to a body, waking it up.
    ///
    /// Static bodies that are moved must be reindexed with [`Space::reindex_shapes_for_body`]
    /// for their shapes to collide at the new position.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut Body> {
        self.check_body(handle)?;
        self.activate_body(handle);
        Ok(&mut self.bodies[handle.index])
    }

    /// Changes the type of a body in the space, moving its shapes to the right spatial index.
    pub fn set_body_type(&mut self, handle: BodyHandle, body_type: BodyType) -> Result<()> {
        self.check_unlocked()?;
        let old_type = self.check_body(handle)?.body_type;
        if handle == self.static_body {
            return Err(PhysicsError::StaticBody);
        }
        if old_type == body_type {
            return Ok(());
        }

        if old_type.is_static() {
            self.activate_static(handle, None)?;
        } else {
            self.activate_body(handle);
        }

        let shapes = self.bodies[handle.index].shapes.clone();
        let mass: Vec<MassInfo> = shapes
            .iter()
            .filter_map(|shape| self.shapes.get(shape.index))
            .map(|shape| shape.mass_info)
            .collect();
        self.bodies[handle.index].apply_body_type(body_type, &mass);

        if old_type.is_static() != body_type.is_static() {
            for shape in shapes {
                self.dynamic_index.remove(shape.index.slot);
                self.static_index.remove(shape.index.slot);
                self.refresh_shape_bb(shape);
            }
        }
        self.activate_body(handle);

        debug!(?handle, ?old_type, ?body_type, "changed body type");
        Ok(())
    }

    /// Attaches a shape to a body and adds it to the space.
    pub fn add_shape(&mut self, body: BodyHandle, mut shape: Shape) -> Result<ShapeHandle> {
        self.check_unlocked()?;
        let owner = self.check_body(body)?;
        let is_static = owner.body_type.is_static();

        let bb = shape.update(&owner.transform);
        shape.body = Some(body);
        shape.mass_dirty = false;
        let has_mass = shape.mass() > 0.0;

        let index = self.shapes.insert(shape);
        let handle = ShapeHandle::new(self.id, index);
        self.shapes[index].handle = Some(handle);

        if is_static {
            self.static_index.insert(index.slot, bb);
        } else {
            self.dynamic_index.insert(index.slot, bb);
        }

        self.bodies[body.index].shapes.push(handle);
        if has_mass {
            self.accumulate_body_mass(body);
        }
        self.activate_body(body);

        debug!(?handle, ?body, "added shape");
        Ok(handle)
    }

    /// Removes a shape from the space and its body, and returns it.
    ///
    /// The `separate` callbacks of the shape's current contacts are called with
    /// [`Arbiter::is_removal`] returning `true`. Post-step callbacks they schedule run
    /// before this returns.
    pub fn remove_shape(&mut self, handle: ShapeHandle) -> Result<Shape> {
        self.check_unlocked()?;
        let mark = self.post_step.len();
        let shape = self.detach_shape(handle)?;
        self.run_post_step_callbacks_after(mark);
        Ok(shape)
    }

    fn detach_shape(&mut self, handle: ShapeHandle) -> Result<Shape> {
        let body = self
            .check_shape(handle)?
            .body
            .ok_or(PhysicsError::StaleHandle)?;

        if self.bodies[body.index].body_type.is_static() {
            self.activate_static(body, Some(handle))?;
        } else {
            self.activate_body(body);
        }

        self.invalidate_arbiters(handle);
        self.dynamic_index.remove(handle.index.slot);
        self.static_index.remove(handle.index.slot);

        let mut shape = self
            .shapes
            .remove(handle.index)
            .ok_or(PhysicsError::StaleHandle)?;
        self.bodies[body.index].shapes.retain(|&shape| shape != handle);
        if shape.mass() > 0.0 {
            self.accumulate_body_mass(body);
        }

        shape.handle = None;
        shape.body = None;

        debug!(?handle, ?body, "removed shape");
        Ok(shape)
    }

    /// Removes the arbiters of a shape, calling `separate` for the ones that are touching.
    fn invalidate_arbiters(&mut self, shape: ShapeHandle) {
        let keys: Vec<PairKey> = self
            .arbiters
            .iter()
            .filter(|(_, arbiter)| arbiter.shape_a == shape || arbiter.shape_b == shape)
            .map(|(&key, _)| key)
            .collect();
        if keys.is_empty() {
            return;
        }

        self.locked = true;
        for key in keys {
            let Some(mut arbiter) = self.arbiters.swap_remove(&key) else {
                continue;
            };
            if arbiter.state != ArbiterState::Cached && arbiter.begin_invoked {
                arbiter.state = ArbiterState::Invalidated;
                self.run_notify_callbacks(&mut arbiter, select_separate);
            }
        }
        self.locked = false;
    }

    /// Returns `true` if the handle refers to a shape of this space.
    pub fn contains_shape(&self, handle: ShapeHandle) -> bool {
        self.check_shape(handle).is_ok()
    }

    /// Returns a reference to a shape.
    pub fn shape(&self, handle: ShapeHandle) -> Result<&Shape> {
        self.check_shape(handle)
    }

    /// Returns a mutable reference to a shape, waking up its body.
    ///
    /// Changes to the mass of the shape are applied to its body at the start of the next step.
    /// Shapes of static bodies whose geometry changed must be reindexed with
    /// [`Space::reindex_shape`].
    pub fn shape_mut(&mut self, handle: ShapeHandle) -> Result<&mut Shape> {
        if let Some(body) = self.check_shape(handle)?.body {
            self.activate_body(body);
        }
        Ok(&mut self.shapes[handle.index])
    }

    /// Adds a constraint between two bodies of the space.
    ///
    /// Anchors and angles that are derived from the initial positions of the bodies, like the
    /// distance of a [`PinJoint`](crate::dynamics::joints::PinJoint), are computed here.
    pub fn add_constraint(&mut self, mut constraint: Constraint) -> Result<ConstraintHandle> {
        self.check_unlocked()?;
        let (a, b) = (constraint.body_a, constraint.body_b);
        if a == b {
            return Err(PhysicsError::SameBody);
        }
        let body_a = self.check_body(a)?;
        let body_b = self.check_body(b)?;
        constraint.kind.resolve(body_a, body_b);

        let index = self.constraints.insert(constraint);
        let handle = ConstraintHandle::new(self.id, index);
        self.constraints[index].handle = Some(handle);

        self.bodies[a.index].constraints.push(handle);
        self.bodies[b.index].constraints.push(handle);
        self.activate_body(a);
        self.activate_body(b);

        debug!(?handle, body_a = ?a, body_b = ?b, "added constraint");
        Ok(handle)
    }

    /// Removes a constraint from the space and returns it.
    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<Constraint> {
        self.check_unlocked()?;
        self.check_constraint(handle)?;

        let mut constraint = self
            .constraints
            .remove(handle.index)
            .ok_or(PhysicsError::StaleHandle)?;
        for body in [constraint.body_a, constraint.body_b] {
            self.activate_body(body);
            if let Some(body) = self.bodies.get_mut(body.index) {
                body.constraints.retain(|&constraint| constraint != handle);
            }
        }
        constraint.handle = None;

        debug!(?handle, "removed constraint");
        Ok(constraint)
    }

    /// Returns `true` if the handle refers to a constraint of this space.
    pub fn contains_constraint(&self, handle: ConstraintHandle) -> bool {
        self.check_constraint(handle).is_ok()
    }

    /// Returns a reference to a constraint.
    pub fn constraint(&self, handle: ConstraintHandle) -> Result<&Constraint> {
        self.check_constraint(handle)
    }

    /// Returns a mutable reference to a constraint, waking up both of its bodies.
    pub fn constraint_mut(&mut self, handle: ConstraintHandle) -> Result<&mut Constraint> {
        let constraint = self.check_constraint(handle)?;
        let (a, b) = (constraint.body_a, constraint.body_b);
        self.activate_body(a);
        self.activate_body(b);
        Ok(&mut self.constraints[handle.index])
    }

    /// Checks that an arbiter handle belongs to the arbiter whose callback is running.
    ///
    /// Handles expire when the callback they were obtained in returns. Keeping one and
    /// checking it from the callback of another arbiter, or after the step, fails with
    /// [`PhysicsError::ArbiterExpired`].
    pub fn check_arbiter(&self, handle: ArbiterHandle) -> Result<()> {
        self.check_space(handle.space)?;
        if self.active_arbiter == Some(handle) {
            Ok(())
        } else {
            Err(PhysicsError::ArbiterExpired)
        }
    }

    /// Recomputes the mass properties of a body from its shapes.
    pub(crate) fn accumulate_body_mass(&mut self, handle: BodyHandle) {
        let Some(body) = self.bodies.get_mut(handle.index) else {
            return;
        };
        let mass: Vec<MassInfo> = body
            .shapes
            .iter()
            .filter_map(|shape| self.shapes.get(shape.index))
            .map(|shape| shape.mass_info)
            .collect();
        body.accumulate_mass(mass);
    }

    /// Applies shape mass changes made since the last step to their bodies.
    pub(crate) fn flush_mass_changes(&mut self) {
        let dirty: Vec<BodyHandle> = self
            .shapes
            .iter_mut()
            .filter_map(|(_, shape)| {
                if core::mem::take(&mut shape.mass_dirty) {
                    shape.body
                } else {
                    None
                }
            })
            .unique()
            .collect();

        for body in dirty {
            self.accumulate_body_mass(body);
        }
    }

    /// Updates the bounding box of a shape and moves it in its spatial index.
    pub(crate) fn refresh_shape_bb(&mut self, handle: ShapeHandle) {
        let Some(shape) = self.shapes.get_mut(handle.index) else {
            return;
        };
        let Some(body) = shape.body.and_then(|body| self.bodies.get(body.index)) else {
            return;
        };

        let bb = shape.update(&body.transform);
        if body.body_type.is_static() {
            self.static_index.insert(handle.index.slot, bb);
        } else {
            self.dynamic_index.insert(handle.index.slot, bb);
        }
    }

    /// Updates the bounding boxes of all shapes attached to static bodies.
    ///
    /// Static shapes are not updated automatically, so this must be called after moving
    /// static bodies.
    pub fn reindex_static(&mut self) -> Result<()> {
        self.check_unlocked()?;
        let shapes: Vec<ShapeHandle> = self
            .shapes
            .iter()
            .filter(|(_, shape)| {
                shape
                    .body
                    .and_then(|body| self.bodies.get(body.index))
                    .is_some_and(|body| body.body_type.is_static())
            })
            .filter_map(|(_, shape)| shape.handle)
            .collect();

        for shape in shapes {
            self.refresh_shape_bb(shape);
        }
        Ok(())
    }

    /// Updates the bounding box of a single shape.
    pub fn reindex_shape(&mut self, handle: ShapeHandle) -> Result<()> {
        self.check_unlocked()?;
        self.check_shape(handle)?;
        self.refresh_shape_bb(handle);
        Ok(())
    }

    /// Updates the bounding boxes of all shapes attached to a body.
    pub fn reindex_shapes_for_body(&mut self, handle: BodyHandle) -> Result<()> {
        self.check_unlocked()?;
        for shape in self.check_body(handle)?.shapes.clone() {
            self.refresh_shape_bb(shape);
        }
        Ok(())
    }

    /// Replaces both spatial indices with a new kind, reinserting every shape.
    pub fn set_broad_phase(&mut self, kind: BroadPhaseKind) -> Result<()> {
        self.check_unlocked()?;
        if let BroadPhaseKind::SpatialHash { cell_size, count } = kind {
            if !(cell_size > 0.0 && cell_size.is_finite()) || count == 0 {
                return Err(PhysicsError::InvalidArgument(format!(
                    "a spatial hash needs a positive cell size and bucket count, got {cell_size} and {count}"
                )));
            }
        }

        self.config.broad_phase = kind;
        self.dynamic_index = kind.build();
        self.static_index = kind.build();
        for index in self.shapes.indices() {
            if let Some(handle) = self.shapes[index].handle {
                self.refresh_shape_bb(handle);
            }
        }

        debug!(?kind, "rebuilt spatial indices");
        Ok(())
    }

    /// Switches the broad phase to a [`SpatialHash`](crate::collision::broad_phase::SpatialHash)
    /// with cells of size `dim` and `count` buckets.
    ///
    /// The cell size should be close to the size of a typical shape.
    pub fn use_spatial_hash(&mut self, dim: Scalar, count: usize) -> Result<()> {
        self.set_broad_phase(BroadPhaseKind::SpatialHash {
            cell_size: dim,
            count,
        })
    }

    /// Calls `visit` for every body except the static body of the space, stopping at the first error.
    pub fn each_body<E>(&self, mut visit: impl FnMut(&Body) -> Result<(), E>) -> Result<(), E> {
        self.bodies
            .iter()
            .filter(|(index, _)| *index != self.static_body.index)
            .try_for_each(|(_, body)| visit(body))
    }

    /// Calls `visit` for every shape, stopping at the first error.
    pub fn each_shape<E>(&self, mut visit: impl FnMut(&Shape) -> Result<(), E>) -> Result<(), E> {
        self.shapes.iter().try_for_each(|(_, shape)| visit(shape))
    }

    /// Calls `visit` for every constraint, stopping at the first error.
    pub fn each_constraint<E>(
        &self,
        mut visit: impl FnMut(&Constraint) -> Result<(), E>,
    ) -> Result<(), E> {
        self.constraints
            .iter()
            .try_for_each(|(_, constraint)| visit(constraint))
    }

    /// Calls `visit` for every arbiter whose shapes touched during the last step,
    /// stopping at the first error.
    pub fn each_arbiter<E>(&self, mut visit: impl FnMut(&Arbiter) -> Result<(), E>) -> Result<(), E> {
        self.arbiters
            .values()
            .filter(|arbiter| self.arbiter_is_touching(arbiter))
            .try_for_each(&mut visit)
    }

    /// Calls `visit` for every shape attached to a body, stopping at the first error.
    pub fn each_body_shape<E: From<PhysicsError>>(
        &self,
        body: BodyHandle,
        mut visit: impl FnMut(&Shape) -> Result<(), E>,
    ) -> Result<(), E> {
        self.check_body(body)?
            .shapes
            .iter()
            .filter_map(|shape| self.shapes.get(shape.index))
            .try_for_each(&mut visit)
    }

    /// Calls `visit` for every constraint attached to a body, stopping at the first error.
    pub fn each_body_constraint<E: From<PhysicsError>>(
        &self,
        body: BodyHandle,
        mut visit: impl FnMut(&Constraint) -> Result<(), E>,
    ) -> Result<(), E> {
        self.check_body(body)?
            .constraints
            .iter()
            .filter_map(|constraint| self.constraints.get(constraint.index))
            .try_for_each(&mut visit)
    }

    /// Calls `visit` for every arbiter of a body whose shapes touched during the last step,
    /// stopping at the first error.
    ///
    /// Each arbiter is seen from the point of view of the body, so its first shape is
    /// attached to `body` and its normal points away from it.
    pub fn each_body_arbiter<E: From<PhysicsError>>(
        &mut self,
        body: BodyHandle,
        mut visit: impl FnMut(&mut Arbiter) -> Result<(), E>,
    ) -> Result<(), E> {
        self.check_body(body)?;
        let stamp = self.stamp;

        for arbiter in self.arbiters.values_mut() {
            let touching = arbiter.stamp == stamp
                && matches!(
                    arbiter.state,
                    ArbiterState::FirstCollision | ArbiterState::Normal
                );
            if !touching || (arbiter.body_a != body && arbiter.body_b != body) {
                continue;
            }

            let swapped = arbiter.swapped;
            arbiter.swapped = arbiter.body_a != body;
            let result = visit(arbiter);
            arbiter.swapped = swapped;
            result?;
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn arbiter_is_touching(&self, arbiter: &Arbiter) -> bool {
        arbiter.stamp == self.stamp
            && matches!(
                arbiter.state,
                ArbiterState::FirstCollision | ArbiterState::Normal
            )
    }
}

#[cfg(feature = "parallel")]
fn build_pool(threads: usize) -> Option<rayon::ThreadPool> {
    if threads == 1 {
        return None;
    }
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => Some(pool),
        Err(err) => {
            tracing::warn!("failed to build a thread pool with {threads} threads, stepping on the calling thread: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn static_body_can_not_be_removed_or_retyped() {
        let mut space = Space::new();
        let ground = space.static_body();
        assert_eq!(space.remove_body(ground).unwrap_err(), PhysicsError::StaticBody);
        assert_eq!(
            space.set_body_type(ground, BodyType::Dynamic).unwrap_err(),
            PhysicsError::StaticBody
        );
        assert_eq!(space.body_count(), 0);
    }

    #[test]
    fn stale_and_foreign_handles_are_rejected() {
        let mut space = Space::new();
        let mut other = Space::new();
        let body = space.add_body(Body::dynamic(1.0, 1.0)).unwrap();
        let foreign = other.add_body(Body::dynamic(1.0, 1.0)).unwrap();

        assert_eq!(space.body(foreign).unwrap_err(), PhysicsError::ForeignSpace);
        space.remove_body(body).unwrap();
        assert_eq!(space.body(body).unwrap_err(), PhysicsError::StaleHandle);

        // The slot is reused, but the old handle stays stale.
        let reused = space.add_body(Body::dynamic(1.0, 1.0)).unwrap();
        assert_eq!(reused.index().slot(), body.index().slot());
        assert!(!space.contains_body(body));
        assert!(space.contains_body(reused));
    }

    #[test]
    fn removing_a_body_removes_its_shapes_and_constraints() {
        let mut space = Space::new();
        let body = space.add_body(Body::dynamic(1.0, 1.0)).unwrap();
        let shape = space
            .add_shape(body, Shape::circle(1.0, Vector::ZERO).unwrap())
            .unwrap();
        let constraint = space
            .add_constraint(Constraint::pivot(space.static_body(), body, Vector::ZERO))
            .unwrap();

        let removed = space.remove_body(body).unwrap();
        assert!(removed.handle().is_none());
        assert!(!space.contains_shape(shape));
        assert!(!space.contains_constraint(constraint));
        assert!(space.body(space.static_body()).unwrap().constraints().is_empty());
    }

    #[test]
    fn shape_mass_is_added_to_the_body() {
        let mut space = Space::new();
        let body = space.add_body(Body::dynamic(1.0, 1.0)).unwrap();
        let shape = space
            .add_shape(
                body,
                Shape::circle(1.0, Vector::new(2.0, 0.0)).unwrap().with_mass(2.0),
            )
            .unwrap();
        assert_eq!(space.body(body).unwrap().mass(), 2.0);
        assert_eq!(space.body(body).unwrap().center_of_gravity(), Vector::new(2.0, 0.0));

        // Mass changes are applied at the next step.
        space.shape_mut(shape).unwrap().set_mass(4.0);
        assert_eq!(space.body(body).unwrap().mass(), 2.0);
        space.step(1.0 / 60.0).unwrap();
        assert_eq!(space.body(body).unwrap().mass(), 4.0);

        space.remove_shape(shape).unwrap();
        assert_eq!(space.body(body).unwrap().mass(), 0.0);
    }

    #[test]
    fn constraints_need_two_bodies() {
        let mut space = Space::new();
        let body = space.add_body(Body::dynamic(1.0, 1.0)).unwrap();
        assert_eq!(
            space
                .add_constraint(Constraint::simple_motor(body, body, 1.0))
                .unwrap_err(),
            PhysicsError::SameBody
        );
    }

    #[test]
    fn changing_body_type_moves_shapes_between_indices() {
        let mut space = Space::new();
        let body = space.add_body(Body::dynamic(1.0, 1.0)).unwrap();
        let shape = space
            .add_shape(body, Shape::circle(1.0, Vector::ZERO).unwrap().with_mass(1.0))
            .unwrap();
        let slot = shape.index().slot();
        assert!(space.dynamic_index.contains(slot));

        space.set_body_type(body, BodyType::Static).unwrap();
        assert!(space.static_index.contains(slot));
        assert!(!space.dynamic_index.contains(slot));
        assert!(space.body(body).unwrap().mass().is_infinite());

        space.set_body_type(body, BodyType::Dynamic).unwrap();
        assert!(space.dynamic_index.contains(slot));
        assert_eq!(space.body(body).unwrap().mass(), 1.0);
    }

    #[test]
    fn iteration_stops_at_the_first_error() {
        let mut space = Space::new();
        for _ in 0..3 {
            space.add_body(Body::dynamic(1.0, 1.0)).unwrap();
        }

        let mut visited = 0;
        let result = space.each_body(|_| {
            visited += 1;
            if visited == 2 { Err("stop") } else { Ok(()) }
        });
        assert_eq!(result, Err("stop"));
        assert_eq!(visited, 2);
    }

    #[test]
    fn spatial_hash_keeps_shapes() {
        let mut space = Space::new();
        let body = space.add_body(Body::dynamic(1.0, 1.0)).unwrap();
        space
            .add_shape(body, Shape::circle(1.0, Vector::ZERO).unwrap())
            .unwrap();

        assert!(space.use_spatial_hash(0.0, 10).is_err());
        space.use_spatial_hash(2.0, 100).unwrap();
        assert_eq!(space.dynamic_index.len(), 1);
    }
}
