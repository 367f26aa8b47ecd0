//! Derived session state.
//!
//! Pure functions over a workout snapshot. Nothing here is stored; callers
//! recompute after every mutation.

use crate::{Workout, WorkoutExercise, WorkoutSet};
use std::fmt;
use uuid::Uuid;

/// Position of the set the user should do next, with the sets after it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetProgress {
    /// First incomplete set in array order; `None` once everything is done
    pub current: Option<usize>,
    /// One flag per set: true for sets strictly after `current`
    pub future: Vec<bool>,
}

impl SetProgress {
    pub fn is_current(&self, index: usize) -> bool {
        self.current == Some(index)
    }

    pub fn is_future(&self, index: usize) -> bool {
        self.future.get(index).copied().unwrap_or(false)
    }
}

/// Derive current and future flags for one exercise's sets
pub fn set_progress(sets: &[WorkoutSet]) -> SetProgress {
    let current = current_set_index(sets);
    let future = (0..sets.len())
        .map(|i| matches!(current, Some(c) if i > c))
        .collect();

    SetProgress { current, future }
}

pub fn current_set_index(sets: &[WorkoutSet]) -> Option<usize> {
    sets.iter().position(|s| !s.is_completed)
}

/// Every set completed; an exercise with no sets counts as complete
pub fn is_exercise_complete(exercise: &WorkoutExercise) -> bool {
    exercise.sets.iter().all(|s| s.is_completed)
}

/// First exercise, in order, that still has incomplete sets
pub fn first_incomplete_exercise(workout: &Workout) -> Option<Uuid> {
    workout
        .exercises
        .iter()
        .find(|e| !is_exercise_complete(e))
        .map(|e| e.id)
}

/// Completed sets over total sets across a workout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkoutProgress {
    pub completed: usize,
    pub total: usize,
}

impl WorkoutProgress {
    pub fn of(workout: &Workout) -> Self {
        workout
            .exercises
            .iter()
            .flat_map(|e| &e.sets)
            .fold(Self::default(), |acc, set| Self {
                completed: acc.completed + usize::from(set.is_completed),
                total: acc.total + 1,
            })
    }

    pub fn is_empty(&self) -> bool {
        self.completed == 0
    }
}

impl fmt::Display for WorkoutProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.completed, self.total)
    }
}
