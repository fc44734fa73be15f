//! The simulation step.
//!
//! A step runs in this order:
//!
//! 1. Shape mass changes are applied to their bodies.
//! 2. Positions are integrated with the velocities of the previous step.
//! 3. The broad phase finds overlapping bounding boxes, and the narrow phase computes contacts.
//!    Arbiters are created or updated and the `begin` and `pre_solve` callbacks run.
//! 4. Sleeping bodies are woken or put to sleep, and arbiters of separated shapes are cached
//!    or removed, calling `separate`.
//! 5. Contacts and constraints are prepared, velocities are integrated, the impulses of the
//!    previous step are applied again, and the solver runs for the configured iterations.
//! 6. `post_solve` callbacks run, the space is unlocked and post-step callbacks run.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::trace;

use super::{ShapeHandle, Space};
use crate::{
    PhysicsError, Result,
    collision::{
        contact_types::{Arbiter, ArbiterState, ContactManifold},
        hooks::{select_begin, select_post_solve, select_pre_solve, select_separate},
        narrow_phase::collide,
        shape::Shape,
    },
    data_structures::{
        arena::{Arena, ArenaIndex},
        pair_key::PairKey,
    },
    dynamics::{
        joints::{Constraint, ConstraintCallback, ConstraintSolver},
        rigid_body::Body,
    },
    math::*,
};

fn select_constraint_pre_solve(constraint: &mut Constraint) -> &mut Option<ConstraintCallback> {
    &mut constraint.pre_solve
}

fn select_constraint_post_solve(constraint: &mut Constraint) -> &mut Option<ConstraintCallback> {
    &mut constraint.post_solve
}

impl Space {
    /// Advances the simulation by `dt` seconds.
    ///
    /// A fixed time step gives the most stable results. Fails with
    /// [`PhysicsError::InvalidTimeStep`] if `dt` is not positive and finite, and with
    /// [`PhysicsError::Reentrant`] if called from a callback during a step.
    pub fn step(&mut self, dt: Scalar) -> Result<()> {
        if self.locked {
            return Err(PhysicsError::Reentrant);
        }
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(PhysicsError::InvalidTimeStep(dt));
        }

        self.stamp += 1;
        self.previous_dt = self.current_dt;
        self.current_dt = dt;
        self.locked = true;

        self.flush_mass_changes();
        self.advance_arbiter_states();
        self.integrate_positions(dt);

        let pairs = self.find_pairs();
        let manifolds = self.compute_manifolds(&pairs);
        let mut solved = self.update_arbiters(&pairs, manifolds);

        let solved_bodies: Vec<_> = solved
            .iter()
            .filter_map(|key| self.arbiters.get(key))
            .map(|arbiter| (arbiter.body_a, arbiter.body_b))
            .collect();
        self.process_components(dt, &solved_bodies);
        solved.retain(|key| {
            self.arbiters.get(key).is_some_and(|arbiter| {
                self.body_is_awake(arbiter.body_a) || self.body_is_awake(arbiter.body_b)
            })
        });

        self.filter_arbiters();

        let constraints: Vec<ArenaIndex> = self
            .constraints
            .iter()
            .filter(|(_, constraint)| {
                self.body_is_awake(constraint.body_a) || self.body_is_awake(constraint.body_b)
            })
            .map(|(index, _)| index)
            .collect();

        self.pre_step(dt, &solved, &constraints);
        self.integrate_velocities(dt);
        self.solve(dt, &solved, &constraints);
        self.run_post_solve_callbacks(&solved, &constraints);

        trace!(
            stamp = self.stamp,
            pairs = pairs.len(),
            solved = solved.len(),
            constraints = constraints.len(),
            arbiters = self.arbiters.len(),
            "stepped"
        );

        self.locked = false;
        self.run_post_step_callbacks();
        Ok(())
    }

    /// Moves the arbiters of the previous step into the state they start this step in.
    fn advance_arbiter_states(&mut self) {
        for arbiter in self.arbiters.values_mut() {
            arbiter.state = match arbiter.state {
                ArbiterState::FirstCollision | ArbiterState::Ignore if arbiter.begin_accepted => {
                    ArbiterState::Normal
                }
                ArbiterState::Ignore => ArbiterState::FirstCollision,
                state => state,
            };
        }
    }

    fn integrate_positions(&mut self, dt: Scalar) {
        for (_, body) in self.bodies.iter_mut() {
            if !body.body_type.is_static() && body.sleep.group.is_none() {
                body.integrate_position(dt);
            }
        }
    }

    fn integrate_velocities(&mut self, dt: Scalar) {
        let gravity = self.config.gravity;
        let damping = self.config.damping.powf(dt);
        for (_, body) in self.bodies.iter_mut() {
            if !body.body_type.is_static() && body.sleep.group.is_none() {
                body.integrate_velocity(gravity, damping, dt);
            }
        }
    }

    /// Updates the bounding boxes of moving shapes and returns the pairs that should be collided,
    /// ordered by shape kind and slot.
    fn find_pairs(&mut self) -> Vec<(ShapeHandle, ShapeHandle)> {
        for (index, shape) in self.shapes.iter_mut() {
            let Some(body) = shape.body.and_then(|body| self.bodies.get(body.index)) else {
                continue;
            };
            if !body.body_type.is_static() && body.sleep.group.is_none() {
                let bb = shape.update(&body.transform);
                self.dynamic_index.insert(index.slot, bb);
            }
        }

        let mut slots = Vec::new();
        self.dynamic_index.overlapping_pairs(&mut slots);
        for (index, shape) in self.shapes.iter() {
            if shape.body.is_some_and(|body| self.body_is_awake(body)) {
                self.static_index
                    .query(shape.bb, &mut |other| slots.push((index.slot, other)));
            }
        }

        slots
            .into_iter()
            .filter_map(|(a, b)| {
                let a = self.shapes.index_of_slot(a)?;
                let b = self.shapes.index_of_slot(b)?;
                let (shape_a, shape_b) = (&self.shapes[a], &self.shapes[b]);
                if !self.accepts_pair(shape_a, shape_b) {
                    return None;
                }

                let (a, b) = if (shape_a.kind.rank(), a.slot) <= (shape_b.kind.rank(), b.slot) {
                    (a, b)
                } else {
                    (b, a)
                };
                Some((ShapeHandle::new(self.id, a), ShapeHandle::new(self.id, b)))
            })
            .collect()
    }

    /// Returns `false` if the shapes should never collide.
    fn accepts_pair(&self, a: &Shape, b: &Shape) -> bool {
        let (Some(body_a), Some(body_b)) = (a.body, b.body) else {
            return false;
        };
        if body_a == body_b || a.filter.rejects(b.filter) {
            return false;
        }
        if !self.body_is_awake(body_a) && !self.body_is_awake(body_b) {
            return false;
        }

        // Constraints can disable collisions between the bodies they connect.
        !self.bodies[body_a.index].constraints.iter().any(|handle| {
            self.constraints.get(handle.index).is_some_and(|constraint| {
                !constraint.collide_bodies()
                    && (constraint.body_a == body_b || constraint.body_b == body_b)
            })
        })
    }

    fn compute_manifolds(&self, pairs: &[(ShapeHandle, ShapeHandle)]) -> Vec<ContactManifold> {
        let shapes = &self.shapes;
        let collide_pair =
            |&(a, b): &(ShapeHandle, ShapeHandle)| collide(&shapes[a.index].kind, &shapes[b.index].kind);

        #[cfg(feature = "parallel")]
        if let Some(pool) = &self.pool {
            return pool.install(|| pairs.par_iter().map(collide_pair).collect());
        }

        pairs.iter().map(collide_pair).collect()
    }

    /// Creates or updates the arbiters of touching pairs and runs the `begin` and `pre_solve`
    /// callbacks. Returns the arbiters that should be solved.
    fn update_arbiters(
        &mut self,
        pairs: &[(ShapeHandle, ShapeHandle)],
        manifolds: Vec<ContactManifold>,
    ) -> Vec<PairKey> {
        let mut solved = Vec::new();

        for (&(shape_a, shape_b), manifold) in pairs.iter().zip(manifolds) {
            if manifold.is_empty() {
                continue;
            }

            let (a, b) = (&self.shapes[shape_a.index], &self.shapes[shape_b.index]);
            let (Some(body_a), Some(body_b)) = (a.body, b.body) else {
                continue;
            };
            let key = PairKey::new(shape_a.index.slot, shape_b.index.slot);

            let mut arbiter = match self.arbiters.swap_remove(&key) {
                Some(arbiter) if arbiter.shape_a == shape_a && arbiter.shape_b == shape_b => arbiter,
                _ => Arbiter::new(self.id, shape_a, shape_b, body_a, body_b),
            };

            arbiter.update_contacts(
                &manifold,
                self.bodies[body_a.index].p,
                self.bodies[body_b.index].p,
            );

            // Materials are recomputed every step, discarding changes made by callbacks.
            arbiter.restitution = a.elasticity * b.elasticity;
            arbiter.friction = a.friction * b.friction;
            let surface_velocity = b.surface_velocity - a.surface_velocity;
            let n = manifold.normal;
            arbiter.surface_velocity = surface_velocity - n * surface_velocity.dot(n);

            arbiter.type_a = a.collision_type;
            arbiter.type_b = b.collision_type;
            arbiter.sensor = a.sensor || b.sensor;
            arbiter.swapped = self.handlers.primary_swapped(a.collision_type, b.collision_type);
            arbiter.stamp = self.stamp;

            if !arbiter.begin_accepted {
                arbiter.begin_invoked = true;
                let accepted = self.run_filter_callbacks(&mut arbiter, select_begin);
                if accepted && arbiter.state != ArbiterState::Ignore {
                    arbiter.begin_accepted = true;
                } else {
                    arbiter.state = ArbiterState::Ignore;
                }
            }

            if arbiter.state != ArbiterState::Ignore
                && !self.run_filter_callbacks(&mut arbiter, select_pre_solve)
            {
                arbiter.state = ArbiterState::Ignore;
            }

            let both_infinite = self.bodies[body_a.index].mass.is_infinite()
                && self.bodies[body_b.index].mass.is_infinite();
            if arbiter.state != ArbiterState::Ignore && !arbiter.sensor && !both_infinite {
                solved.push(key);
            }

            self.arbiters.insert(key, arbiter);
        }

        solved
    }

    /// Caches the arbiters of shapes that stopped touching, calling `separate`, and removes
    /// arbiters that have been cached for longer than the collision persistence.
    fn filter_arbiters(&mut self) {
        let stamp = self.stamp;
        let persistence = self.config.collision_persistence;
        let keys: Vec<PairKey> = self.arbiters.keys().copied().collect();

        for key in keys {
            let Some(arbiter) = self.arbiters.get(&key) else {
                continue;
            };

            // Arbiters between bodies that can not move are kept as they are.
            if !self.body_is_awake(arbiter.body_a) && !self.body_is_awake(arbiter.body_b) {
                continue;
            }
            let ticks = stamp - arbiter.stamp;
            if ticks == 0 {
                continue;
            }
            let expired = ticks >= persistence;

            if arbiter.state != ArbiterState::Cached {
                let notify = arbiter.begin_invoked;
                if let Some(mut arbiter) = self.arbiters.swap_remove(&key) {
                    arbiter.state = ArbiterState::Cached;
                    if notify {
                        self.run_notify_callbacks(&mut arbiter, select_separate);
                    }
                    if !expired {
                        self.arbiters.insert(key, arbiter);
                    }
                }
            } else if expired {
                self.arbiters.swap_remove(&key);
            }
        }
    }

    fn pre_step(&mut self, dt: Scalar, solved: &[PairKey], constraints: &[ArenaIndex]) {
        let slop = self.config.collision_slop;
        let bias_coef = 1.0 - self.config.collision_bias.powf(dt);
        for_each_arbiter(&mut self.arbiters, &mut self.bodies, solved, |arbiter, a, b| {
            arbiter.pre_step(a, b, dt, slop, bias_coef);
        });

        for &index in constraints {
            self.run_constraint_callback(index, select_constraint_pre_solve);
            for_each_constraint(&mut self.constraints, &mut self.bodies, &[index], |constraint, a, b| {
                let params = constraint.params();
                constraint.kind.pre_step(a, b, &params, dt);
            });
        }
    }

    fn solve(&mut self, dt: Scalar, solved: &[PairKey], constraints: &[ArenaIndex]) {
        let dt_coef = if self.previous_dt == 0.0 {
            0.0
        } else {
            dt / self.previous_dt
        };

        for_each_arbiter(&mut self.arbiters, &mut self.bodies, solved, |arbiter, a, b| {
            arbiter.apply_cached_impulse(a, b, dt_coef);
        });
        for_each_constraint(&mut self.constraints, &mut self.bodies, constraints, |constraint, a, b| {
            constraint.kind.apply_cached_impulse(a, b, dt_coef);
        });

        for _ in 0..self.config.iterations {
            for_each_arbiter(&mut self.arbiters, &mut self.bodies, solved, |arbiter, a, b| {
                arbiter.apply_impulse(a, b);
            });
            for_each_constraint(&mut self.constraints, &mut self.bodies, constraints, |constraint, a, b| {
                let params = constraint.params();
                constraint.kind.apply_impulse(a, b, &params, dt);
            });
        }
    }

    fn run_post_solve_callbacks(&mut self, solved: &[PairKey], constraints: &[ArenaIndex]) {
        for &index in constraints {
            self.run_constraint_callback(index, select_constraint_post_solve);
        }

        for key in solved {
            if let Some(mut arbiter) = self.arbiters.swap_remove(key) {
                self.run_notify_callbacks(&mut arbiter, select_post_solve);
                self.arbiters.insert(*key, arbiter);
            }
        }
    }

    /// Runs a callback of a constraint, taking it out of the constraint for the duration of the call.
    fn run_constraint_callback(
        &mut self,
        index: ArenaIndex,
        select: fn(&mut Constraint) -> &mut Option<ConstraintCallback>,
    ) {
        let Some(constraint) = self.constraints.get_mut(index) else {
            return;
        };
        let Some(handle) = constraint.handle else {
            return;
        };
        let Some(mut callback) = select(constraint).take() else {
            return;
        };

        callback(handle, self);

        if let Some(constraint) = self.constraints.get_mut(index) {
            select(constraint).get_or_insert(callback);
        }
    }
}

fn for_each_arbiter(
    arbiters: &mut indexmap::IndexMap<PairKey, Arbiter>,
    bodies: &mut Arena<Body>,
    keys: &[PairKey],
    mut f: impl FnMut(&mut Arbiter, &mut Body, &mut Body),
) {
    for key in keys {
        let Some(arbiter) = arbiters.get_mut(key) else {
            continue;
        };
        if let Some((a, b)) = bodies.get2_mut(arbiter.body_a.index, arbiter.body_b.index) {
            f(arbiter, a, b);
        }
    }
}

fn for_each_constraint(
    constraints: &mut Arena<Constraint>,
    bodies: &mut Arena<Body>,
    indices: &[ArenaIndex],
    mut f: impl FnMut(&mut Constraint, &mut Body, &mut Body),
) {
    for &index in indices {
        let Some(constraint) = constraints.get_mut(index) else {
            continue;
        };
        if let Some((a, b)) = bodies.get2_mut(constraint.body_a.index, constraint.body_b.index) {
            f(constraint, a, b);
        }
    }
}
