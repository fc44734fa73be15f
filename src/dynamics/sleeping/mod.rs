//! Sleeping and waking of bodies.
//!
//! Every step, the idle time of each awake dynamic body is advanced while its kinetic energy
//! stays below `mass * idle_speed_threshold²`. Awake bodies connected by contacts or constraints
//! form a component, found with union find. Once every body of a component has been idle for
//! longer than the sleep time threshold, the whole component is put to sleep as one
//! [`SleepGroup`].
//!
//! Sleeping bodies keep their shapes in the spatial index, but are skipped by integration and
//! by the narrow phase when the other body is also sleeping or static. Waking any body of a
//! group wakes the whole group.

use crate::{
    PhysicsError, Result,
    dynamics::rigid_body::BodyType,
    math::*,
    space::{BodyHandle, ShapeHandle, Space},
};

/// The sleep state of a [`Body`](crate::dynamics::rigid_body::Body).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct SleepState {
    /// How long the body has been moving slower than the idle speed threshold.
    pub idle_time: Scalar,
    /// The sleep group the body belongs to, or `None` if it is awake.
    pub group: Option<usize>,
}

/// A set of bodies that fell asleep together and wake up together.
#[derive(Clone, Debug, Default)]
pub(crate) struct SleepGroup {
    pub bodies: Vec<BodyHandle>,
}

/// A union find over the awake dynamic bodies of a step.
struct Components {
    parents: Vec<usize>,
}

impl Components {
    fn new(len: usize) -> Self {
        Self {
            parents: (0..len).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parents[i] != i {
            // Path halving
            self.parents[i] = self.parents[self.parents[i]];
            i = self.parents[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a != root_b {
            // Keep the smaller index as the root for a stable grouping order.
            let (root, child) = (root_a.min(root_b), root_a.max(root_b));
            self.parents[child] = root;
        }
    }
}

impl Space {
    /// Returns `true` if sleeping is enabled, which is the case when the sleep time threshold is finite.
    #[inline]
    pub(crate) fn sleeping_enabled(&self) -> bool {
        self.config.sleep_time_threshold.is_finite()
    }

    /// Returns `true` if the body is neither sleeping nor static.
    pub(crate) fn body_is_awake(&self, handle: BodyHandle) -> bool {
        self.bodies
            .get(handle.index)
            .is_some_and(|body| !body.body_type.is_static() && body.sleep.group.is_none())
    }

    /// Wakes up a body and every other body in its sleep group, and resets their idle timers.
    ///
    /// Static bodies are ignored. For waking the bodies touching a static body, use
    /// [`Space::activate_static`].
    pub(crate) fn activate_body(&mut self, handle: BodyHandle) {
        let Some(body) = self.bodies.get_mut(handle.index) else {
            return;
        };
        if body.body_type.is_static() {
            return;
        }

        body.sleep.idle_time = 0.0;
        let Some(group) = body.sleep.group else {
            return;
        };

        if !self.sleep_groups.contains(group) {
            body.sleep.group = None;
            return;
        }

        let group = self.sleep_groups.remove(group);
        tracing::trace!(bodies = group.bodies.len(), "waking sleep group");
        for handle in group.bodies {
            if let Some(body) = self.bodies.get_mut(handle.index) {
                body.sleep.group = None;
                body.sleep.idle_time = 0.0;
            }
        }
    }

    /// Wakes up the body and its sleep group.
    ///
    /// Bodies are also woken up automatically when they are accessed mutably through
    /// [`Space::body_mut`] or when shapes or constraints are attached to them.
    pub fn activate(&mut self, handle: BodyHandle) -> Result<()> {
        self.check_body(handle)?;
        self.activate_body(handle);
        Ok(())
    }

    /// Wakes up every body touching the given static body.
    ///
    /// If `filter` is given, only bodies touching that shape of the static body are woken.
    /// Call this after moving a static body manually.
    pub fn activate_static(&mut self, handle: BodyHandle, filter: Option<ShapeHandle>) -> Result<()> {
        let body = self.check_body(handle)?;
        if !body.body_type.is_static() {
            return Err(PhysicsError::InvalidArgument(
                "activate_static called on a non-static body".to_string(),
            ));
        }

        let touching: Vec<BodyHandle> = self
            .arbiters
            .values()
            .filter(|arbiter| {
                filter.is_none_or(|shape| arbiter.shape_a == shape || arbiter.shape_b == shape)
            })
            .filter_map(|arbiter| {
                if arbiter.body_a == handle {
                    Some(arbiter.body_b)
                } else if arbiter.body_b == handle {
                    Some(arbiter.body_a)
                } else {
                    None
                }
            })
            .collect();

        for other in touching {
            self.activate_body(other);
        }
        Ok(())
    }

    /// Puts a body to sleep immediately in a new sleep group.
    ///
    /// Sleeping must be enabled with a finite sleep time threshold.
    pub fn sleep_body(&mut self, handle: BodyHandle) -> Result<()> {
        self.sleep_body_in_group(handle, None)
    }

    /// Puts a body to sleep in the same sleep group as `group`, which must already be sleeping.
    ///
    /// Bodies in a group wake up together, which is useful for stacks that should stay asleep
    /// until something disturbs them.
    pub fn sleep_body_with_group(&mut self, handle: BodyHandle, group: BodyHandle) -> Result<()> {
        self.sleep_body_in_group(handle, Some(group))
    }

    fn sleep_body_in_group(&mut self, handle: BodyHandle, group: Option<BodyHandle>) -> Result<()> {
        self.check_unlocked()?;
        if !self.sleeping_enabled() {
            return Err(PhysicsError::InvalidArgument(
                "sleeping is disabled because the sleep time threshold is infinite".to_string(),
            ));
        }

        let body = self.check_body(handle)?;
        if body.body_type != BodyType::Dynamic {
            return Err(PhysicsError::InvalidArgument(
                "only dynamic bodies can be put to sleep".to_string(),
            ));
        }
        let current_group = body.sleep.group;

        let target_group = match group {
            Some(group) => {
                let group_body = self.check_body(group)?;
                match group_body.sleep.group {
                    Some(key) => Some(key),
                    None => {
                        return Err(PhysicsError::InvalidArgument(
                            "the group body is not sleeping".to_string(),
                        ));
                    }
                }
            }
            None => None,
        };

        if let Some(current) = current_group {
            return if target_group.is_none_or(|target| target == current) {
                Ok(())
            } else {
                Err(PhysicsError::InvalidArgument(
                    "the body is already sleeping in another group".to_string(),
                ))
            };
        }

        for shape in self.bodies[handle.index].shapes.clone() {
            self.refresh_shape_bb(shape);
        }

        let key = match target_group {
            Some(key) => {
                self.sleep_groups[key].bodies.push(handle);
                key
            }
            None => self.sleep_groups.insert(SleepGroup {
                bodies: vec![handle],
            }),
        };

        let body = &mut self.bodies[handle.index];
        body.sleep.group = Some(key);
        body.sleep.idle_time = 0.0;
        Ok(())
    }

    /// Advances idle timers, wakes bodies touched by awake or kinematic bodies,
    /// and puts components that have been idle long enough to sleep.
    ///
    /// `solved` lists the body pairs of the arbiters that are solved this step.
    pub(crate) fn process_components(&mut self, dt: Scalar, solved: &[(BodyHandle, BodyHandle)]) {
        if !self.sleeping_enabled() {
            return;
        }

        let idle_speed = self.config.idle_speed_threshold;
        let dv_squared = if idle_speed != 0.0 {
            idle_speed * idle_speed
        } else {
            self.config.gravity.length_squared() * dt * dt
        };

        for (_, body) in self.bodies.iter_mut() {
            if body.body_type != BodyType::Dynamic || body.sleep.group.is_some() {
                continue;
            }
            let threshold = if dv_squared != 0.0 {
                body.mass * dv_squared
            } else {
                0.0
            };
            body.sleep.idle_time = if body.kinetic_energy() > threshold {
                0.0
            } else {
                body.sleep.idle_time + dt
            };
        }

        // Touching a kinematic body or an awake body keeps a body awake.
        for &(a, b) in solved {
            let (type_a, type_b) = (self.bodies[a.index].body_type, self.bodies[b.index].body_type);
            if type_b.is_kinematic() || self.bodies[a.index].sleep.group.is_some() {
                self.activate_body(a);
            }
            if type_a.is_kinematic() || self.bodies[b.index].sleep.group.is_some() {
                self.activate_body(b);
            }
        }

        let constrained: Vec<(BodyHandle, BodyHandle)> = self
            .constraints
            .iter()
            .map(|(_, constraint)| (constraint.body_a, constraint.body_b))
            .collect();
        for &(a, b) in &constrained {
            let (Some(body_a), Some(body_b)) =
                (self.bodies.get(a.index), self.bodies.get(b.index))
            else {
                continue;
            };
            let (type_a, type_b) = (body_a.body_type, body_b.body_type);
            let (awake_a, awake_b) = (body_a.sleep.group.is_none(), body_b.sleep.group.is_none());
            if type_b.is_kinematic() || (awake_b && !type_b.is_static() && !awake_a) {
                self.activate_body(a);
            }
            if type_a.is_kinematic() || (awake_a && !type_a.is_static() && !awake_b) {
                self.activate_body(b);
            }
        }

        // Union find over the awake dynamic bodies.
        let awake: Vec<BodyHandle> = self
            .bodies
            .iter()
            .filter(|(_, body)| body.body_type == BodyType::Dynamic && body.sleep.group.is_none())
            .filter_map(|(_, body)| body.handle)
            .collect();
        if awake.is_empty() {
            return;
        }

        let mut node_of = vec![usize::MAX; self.bodies.slot_count()];
        for (node, handle) in awake.iter().enumerate() {
            node_of[handle.index.slot as usize] = node;
        }
        let node = |handle: BodyHandle| {
            node_of
                .get(handle.index.slot as usize)
                .copied()
                .filter(|&node| node != usize::MAX)
        };

        let mut components = Components::new(awake.len());
        for &(a, b) in solved.iter().chain(&constrained) {
            if let (Some(a), Some(b)) = (node(a), node(b)) {
                components.union(a, b);
            }
        }

        let threshold = self.config.sleep_time_threshold;
        let mut groups: Vec<(usize, Vec<BodyHandle>, bool)> = Vec::new();
        let mut group_of_root = vec![usize::MAX; awake.len()];
        for (i, &handle) in awake.iter().enumerate() {
            let root = components.find(i);
            if group_of_root[root] == usize::MAX {
                group_of_root[root] = groups.len();
                groups.push((root, Vec::new(), true));
            }
            let group = &mut groups[group_of_root[root]];
            group.1.push(handle);
            group.2 &= self.bodies[handle.index].sleep.idle_time >= threshold;
        }

        let mut slept = 0;
        for (_, bodies, idle) in groups {
            if !idle {
                continue;
            }
            let key = self.sleep_groups.insert(SleepGroup {
                bodies: bodies.clone(),
            });
            for handle in bodies {
                self.bodies[handle.index].sleep.group = Some(key);
            }
            slept += 1;
        }

        if slept > 0 {
            tracing::trace!(groups = slept, "bodies fell asleep");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    fn sleepy_space() -> Space {
        let mut space = Space::new();
        space.set_sleep_time_threshold(0.5);
        space.set_idle_speed_threshold(0.01);
        space
    }

    #[test]
    fn resting_body_falls_asleep() {
        let mut space = sleepy_space();
        let body = space.add_body(Body::dynamic(1.0, 1.0)).unwrap();
        space
            .add_shape(body, Shape::circle(0.5, Vector::ZERO).unwrap())
            .unwrap();

        for _ in 0..60 {
            space.step(1.0 / 60.0).unwrap();
        }

        assert!(space.body(body).unwrap().is_sleeping());
    }

    #[test]
    fn moving_body_stays_awake() {
        let mut space = sleepy_space();
        let body = space
            .add_body(Body::dynamic(1.0, 1.0).with_velocity(Vector::X))
            .unwrap();

        for _ in 0..60 {
            space.step(1.0 / 60.0).unwrap();
        }

        assert!(!space.body(body).unwrap().is_sleeping());
    }

    #[test]
    fn waking_one_body_wakes_its_group() {
        let mut space = sleepy_space();
        let a = space.add_body(Body::dynamic(1.0, 1.0)).unwrap();
        let b = space.add_body(Body::dynamic(1.0, 1.0)).unwrap();

        space.sleep_body(a).unwrap();
        space.sleep_body_with_group(b, a).unwrap();
        assert!(space.body(b).unwrap().is_sleeping());

        space.activate(a).unwrap();
        assert!(!space.body(a).unwrap().is_sleeping());
        assert!(!space.body(b).unwrap().is_sleeping());
    }

    #[test]
    fn body_mut_wakes_body() {
        let mut space = sleepy_space();
        let body = space.add_body(Body::dynamic(1.0, 1.0)).unwrap();
        space.sleep_body(body).unwrap();

        space.body_mut(body).unwrap().set_velocity(Vector::Y);
        assert!(!space.body(body).unwrap().is_sleeping());
    }

    #[test]
    fn sleeping_requires_a_finite_threshold() {
        let mut space = Space::new();
        let body = space.add_body(Body::dynamic(1.0, 1.0)).unwrap();
        assert!(matches!(
            space.sleep_body(body),
            Err(PhysicsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn group_body_must_be_sleeping() {
        let mut space = sleepy_space();
        let a = space.add_body(Body::dynamic(1.0, 1.0)).unwrap();
        let b = space.add_body(Body::dynamic(1.0, 1.0)).unwrap();
        assert!(space.sleep_body_with_group(b, a).is_err());
    }
}
