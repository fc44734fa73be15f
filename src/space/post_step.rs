//! Callbacks deferred until the end of a step.

use std::collections::VecDeque;

use derive_more::From;

use super::{BodyHandle, ConstraintHandle, ShapeHandle, Space};

/// A callback run once after the current step.
pub type PostStepFn = Box<dyn FnOnce(&mut Space) + Send>;

/// A key that deduplicates post-step callbacks.
///
/// Only the first callback scheduled for a key runs. This is useful when several collision
/// callbacks in the same step may want to remove the same object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, From)]
pub enum PostStepKey {
    /// A key for a body.
    Body(BodyHandle),
    /// A key for a shape.
    Shape(ShapeHandle),
    /// A key for a constraint.
    Constraint(ConstraintHandle),
    /// A user-defined key.
    Custom(u64),
}

struct PostStepCallback {
    key: Option<PostStepKey>,
    callback: PostStepFn,
}

/// A FIFO queue of post-step callbacks.
#[derive(Default)]
pub(crate) struct PostStepQueue {
    callbacks: VecDeque<PostStepCallback>,
}

impl PostStepQueue {
    fn push(&mut self, key: Option<PostStepKey>, callback: PostStepFn) -> bool {
        if key.is_some() && self.callbacks.iter().any(|queued| queued.key == key) {
            return false;
        }
        self.callbacks.push_back(PostStepCallback { key, callback });
        true
    }

    fn pop(&mut self) -> Option<PostStepFn> {
        self.callbacks.pop_front().map(|queued| queued.callback)
    }

    /// Takes the oldest callback scheduled after the first `mark` callbacks.
    fn pop_after(&mut self, mark: usize) -> Option<PostStepFn> {
        self.callbacks.remove(mark).map(|queued| queued.callback)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }
}

impl Space {
    /// Schedules a callback to run once after the current step, when the space is unlocked.
    ///
    /// This is the way to add or remove bodies, shapes and constraints from collision and
    /// constraint callbacks. Callbacks run in the order they were scheduled, and callbacks
    /// scheduled by other post-step callbacks run in the same pass. A callback scheduled
    /// outside of a step runs at the end of the next step, except when it is scheduled by a
    /// `separate` callback of [`Space::remove_shape`] or [`Space::remove_body`], which run it
    /// before returning.
    pub fn add_post_step_callback(&mut self, callback: impl FnOnce(&mut Space) + Send + 'static) {
        self.post_step.push(None, Box::new(callback));
    }

    /// Schedules a callback like [`Space::add_post_step_callback`], unless a callback with the
    /// same key is already scheduled.
    ///
    /// Returns `true` if the callback was scheduled.
    ///
    /// ```
    /// use rigid2d::prelude::*;
    ///
    /// let mut space = Space::new();
    /// let body = space.add_body(Body::dynamic(1.0, 1.0)).unwrap();
    ///
    /// assert!(space.add_post_step_callback_keyed(body, move |space| {
    ///     let _ = space.remove_body(body);
    /// }));
    /// // The body is already being removed.
    /// assert!(!space.add_post_step_callback_keyed(body, move |space| {
    ///     let _ = space.remove_body(body);
    /// }));
    /// ```
    pub fn add_post_step_callback_keyed(
        &mut self,
        key: impl Into<PostStepKey>,
        callback: impl FnOnce(&mut Space) + Send + 'static,
    ) -> bool {
        self.post_step.push(Some(key.into()), Box::new(callback))
    }

    /// The number of post-step callbacks waiting to run.
    pub fn pending_post_step_callbacks(&self) -> usize {
        self.post_step.len()
    }

    /// Runs the queued callbacks, including those scheduled by the callbacks themselves.
    pub(crate) fn run_post_step_callbacks(&mut self) {
        while let Some(callback) = self.post_step.pop() {
            callback(self);
        }
    }

    /// Runs the callbacks scheduled after the queue held `mark` callbacks, leaving older
    /// ones for the next step.
    pub(crate) fn run_post_step_callbacks_after(&mut self, mark: usize) {
        while let Some(callback) = self.post_step.pop_after(mark) {
            callback(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::prelude::*;

    #[test]
    fn callbacks_run_once_in_order() {
        let mut space = Space::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let log = log.clone();
            space.add_post_step_callback(move |_| log.lock().unwrap().push(i));
        }
        assert_eq!(space.pending_post_step_callbacks(), 3);

        space.step(1.0 / 60.0).unwrap();
        space.step(1.0 / 60.0).unwrap();
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn keyed_callbacks_are_deduplicated() {
        let mut space = Space::new();
        let count = Arc::new(Mutex::new(0));

        for _ in 0..2 {
            let count = count.clone();
            space.add_post_step_callback_keyed(7u64, move |_| *count.lock().unwrap() += 1);
        }

        space.step(1.0 / 60.0).unwrap();
        assert_eq!(*count.lock().unwrap(), 1);

        // The key can be used again once the callback has run.
        let again = count.clone();
        assert!(space.add_post_step_callback_keyed(7u64, move |_| *again.lock().unwrap() += 1));
    }

    #[test]
    fn callbacks_may_schedule_more_callbacks() {
        let mut space = Space::new();
        let done = Arc::new(Mutex::new(false));
        let flag = done.clone();

        space.add_post_step_callback(move |space| {
            space.add_post_step_callback(move |_| *flag.lock().unwrap() = true);
        });

        space.step(1.0 / 60.0).unwrap();
        assert!(*done.lock().unwrap());
    }

    #[test]
    fn callbacks_may_step_the_space() {
        let mut space = Space::new();
        let body = space
            .add_body(Body::dynamic(1.0, 1.0).with_velocity(Vector::X))
            .unwrap();

        space.add_post_step_callback(|space| {
            space.step(1.0).unwrap();
        });
        space.step(1.0).unwrap();

        approx::assert_relative_eq!(space.body(body).unwrap().position().x, 2.0);
    }
}
