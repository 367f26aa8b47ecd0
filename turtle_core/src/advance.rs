//! Auto-advance of the open exercise.
//!
//! Exactly one exercise (or none) is "open" for editing. When the open
//! exercise goes from having incomplete sets to being fully completed, the
//! next incomplete exercise after it is opened instead. Transitions are
//! detected by diffing consecutive snapshots, so the state machine works
//! no matter which operation completed the last set.

use crate::progress::{first_incomplete_exercise, is_exercise_complete};
use crate::Workout;
use uuid::Uuid;

/// Compute the next open exercise from two consecutive snapshots
///
/// `previous` is the snapshot the current `open` value was computed
/// against. A `previous` of `None` (or one for a different workout) is an
/// initial load.
pub fn next_open(
    previous: Option<&Workout>,
    current: Option<&Workout>,
    open: Option<Uuid>,
) -> Option<Uuid> {
    let current = current?;

    let initial_load = previous.map_or(true, |p| p.id != current.id);
    if initial_load {
        return match open {
            Some(id) if current.exercise(id).is_some() => Some(id),
            _ => first_incomplete_exercise(current),
        };
    }

    let open_id = open?;
    let Some(index) = current.exercises.iter().position(|e| e.id == open_id) else {
        tracing::debug!("Open exercise {} no longer in workout", open_id);
        return None;
    };

    let was_complete = previous
        .and_then(|p| p.exercise(open_id))
        .map(is_exercise_complete);
    let now_complete = is_exercise_complete(&current.exercises[index]);

    if was_complete == Some(false) && now_complete {
        let next = current.exercises[index + 1..]
            .iter()
            .find(|e| !is_exercise_complete(e))
            .map(|e| e.id);
        tracing::debug!("Exercise {} completed, advancing to {:?}", open_id, next);
        return next;
    }

    Some(open_id)
}

/// Remembers the last snapshot and the open exercise between updates
#[derive(Clone, Debug, Default)]
pub struct AutoAdvance {
    previous: Option<Workout>,
    open: Option<Uuid>,
}

impl AutoAdvance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) -> Option<Uuid> {
        self.open
    }

    /// Feed the latest snapshot and return the open exercise
    ///
    /// An absent workout closes everything and forgets the snapshot.
    pub fn observe(&mut self, current: Option<&Workout>) -> Option<Uuid> {
        self.open = next_open(self.previous.as_ref(), current, self.open);
        self.previous = current.cloned();
        self.open
    }

    /// Pick up where an earlier session left off
    ///
    /// `current` becomes the remembered snapshot, so the next observation
    /// of the same workout is not an initial load and `open` is kept as
    /// given, `None` included.
    pub fn resume(&mut self, current: Option<&Workout>, open: Option<Uuid>) {
        self.previous = current.cloned();
        self.open = open;
    }

    /// Manually open an exercise, or close all with `None`
    pub fn set_open(&mut self, exercise_id: Option<Uuid>) {
        self.open = exercise_id;
    }

    /// Open the exercise, or close it if it is already open
    pub fn toggle(&mut self, exercise_id: Uuid) -> Option<Uuid> {
        self.open = if self.open == Some(exercise_id) {
            None
        } else {
            Some(exercise_id)
        };
        self.open
    }
}
