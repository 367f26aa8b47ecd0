//! Active workout session engine.
//!
//! The engine owns at most one in-progress workout. Every operation reads
//! the current workout, validates its inputs, and only then mutates, so a
//! failed operation leaves the workout exactly as it was.
//!
//! Mutators take `&mut self`; callers that need to share an engine across
//! tasks wrap it in a [`SharedEngine`].

use crate::clock::{Clock, SystemClock};
use crate::{
    Error, Exercise, ExercisePlan, RepMeasure, Result, SetDraft, SetUpdate, SyncStatus, Workout,
    WorkoutExercise, WorkoutSet,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Engine handle shared between the controller and its tasks
pub type SharedEngine = Arc<Mutex<SessionEngine>>;

/// Owner of the single active workout
pub struct SessionEngine {
    active: Option<Workout>,
    clock: Arc<dyn Clock>,
}

impl Default for SessionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEngine {
    /// Create an engine with no active workout, stamping wall-clock time
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            active: None,
            clock,
        }
    }

    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    /// The active workout, if any
    pub fn active_workout(&self) -> Option<&Workout> {
        self.active.as_ref()
    }

    /// Owned copy of the active workout for consumers
    pub fn snapshot(&self) -> Option<Workout> {
        self.active.clone()
    }

    /// Reinstate a previously saved active workout
    ///
    /// Orders are re-derived from array position so a hand-edited snapshot
    /// cannot break contiguity.
    pub fn restore(&mut self, mut workout: Workout) -> Result<()> {
        if !workout.is_active() {
            return Err(Error::Validation(format!(
                "workout {} is already finished and cannot be restored as active",
                workout.id
            )));
        }

        reindex(&mut workout.exercises);
        tracing::debug!("Restored active workout {}", workout.id);
        self.active = Some(workout);
        Ok(())
    }

    /// Start a new workout, replacing any workout in progress
    ///
    /// Only fails when the initial set data is invalid, in which case the
    /// previous workout is left in place.
    pub fn start(
        &mut self,
        name: impl Into<String>,
        template_id: Option<String>,
        exercises: Vec<ExercisePlan>,
    ) -> Result<Workout> {
        let now = self.clock.now();

        let exercises = exercises
            .into_iter()
            .enumerate()
            .map(|(order, plan)| build_exercise(plan.exercise, plan.sets, order, now))
            .collect::<Result<Vec<_>>>()?;

        let workout = Workout {
            id: Uuid::new_v4(),
            name: name.into(),
            template_id,
            started_at: now,
            finished_at: None,
            exercises,
            notes: None,
        };

        if let Some(previous) = self.active.replace(workout.clone()) {
            tracing::info!(
                "Discarded in-progress workout {} ({}) in favour of a new one",
                previous.id,
                previous.name
            );
        }

        tracing::info!(
            "Started workout {} ({}) with {} exercises",
            workout.id,
            workout.name,
            workout.exercises.len()
        );
        Ok(workout)
    }

    /// Append an exercise with its initial sets to the active workout
    pub fn add_exercise(
        &mut self,
        exercise: Exercise,
        sets: Vec<SetDraft>,
    ) -> Result<WorkoutExercise> {
        let now = self.clock.now();
        let workout = self.active_mut()?;

        let created = build_exercise(exercise, sets, workout.exercises.len(), now)?;
        workout.exercises.push(created.clone());

        tracing::debug!(
            "Added exercise {} ({}) at position {}",
            created.id,
            created.exercise.name,
            created.order
        );
        Ok(created)
    }

    /// Remove an exercise; removing an absent exercise is not an error
    pub fn remove_exercise(&mut self, exercise_id: Uuid) -> Result<()> {
        let workout = self.active_mut()?;

        let before = workout.exercises.len();
        workout.exercises.retain(|e| e.id != exercise_id);
        reindex(&mut workout.exercises);

        if workout.exercises.len() < before {
            tracing::debug!("Removed exercise {}", exercise_id);
        } else {
            tracing::debug!("Exercise {} already absent, nothing to remove", exercise_id);
        }
        Ok(())
    }

    /// Replace the exercise order with the given id sequence
    ///
    /// Unknown and repeated ids are ignored. Exercises missing from the list
    /// are dropped from the workout.
    pub fn reorder_exercises(&mut self, ordered_ids: &[Uuid]) -> Result<()> {
        let workout = self.active_mut()?;

        let mut remaining = std::mem::take(&mut workout.exercises);
        let mut reordered = Vec::with_capacity(ordered_ids.len());
        for id in ordered_ids {
            if let Some(pos) = remaining.iter().position(|e| e.id == *id) {
                reordered.push(remaining.remove(pos));
            }
        }

        if !remaining.is_empty() {
            tracing::debug!(
                "Reorder dropped {} exercises not present in the new order",
                remaining.len()
            );
        }

        reindex(&mut reordered);
        workout.exercises = reordered;
        Ok(())
    }

    /// Append a set to an exercise of the active workout
    pub fn add_set(&mut self, exercise_id: Uuid, draft: SetDraft) -> Result<WorkoutSet> {
        let now = self.clock.now();
        let workout = self.active_mut()?;
        let exercise = find_exercise_mut(workout, exercise_id)?;

        let set = build_set(&exercise.exercise, draft, now)?;
        exercise.sets.push(set.clone());

        tracing::debug!(
            "Added set {} to exercise {} ({} sets)",
            set.id,
            exercise_id,
            exercise.sets.len()
        );
        Ok(set)
    }

    /// Merge a partial update onto a set
    ///
    /// Never marks the set completed.
    pub fn update_set(
        &mut self,
        exercise_id: Uuid,
        set_id: Uuid,
        update: SetUpdate,
    ) -> Result<WorkoutSet> {
        if let Some(weight) = update.weight {
            validate_weight(weight)?;
        }

        let workout = self.active_mut()?;
        let exercise = find_exercise_mut(workout, exercise_id)?;
        let set = find_set_mut(exercise, set_id)?;

        if let Some(set_type) = update.set_type {
            set.set_type = set_type;
        }
        if let Some(weight) = update.weight {
            set.weight = weight;
        }
        if let Some(value) = update.value {
            set.measure = set.measure.with_value(value);
        }
        set.sync_status = Some(SyncStatus::Synced);

        tracing::debug!("Updated set {} of exercise {}", set_id, exercise_id);
        Ok(set.clone())
    }

    /// Mark a set completed and stamp its completion time
    ///
    /// Completing an already completed set keeps the first timestamp.
    pub fn complete_set(&mut self, exercise_id: Uuid, set_id: Uuid) -> Result<WorkoutSet> {
        let now = self.clock.now();
        let workout = self.active_mut()?;
        let exercise = find_exercise_mut(workout, exercise_id)?;
        let set = find_set_mut(exercise, set_id)?;

        if set.is_completed {
            tracing::debug!("Set {} already completed, keeping first completion", set_id);
            return Ok(set.clone());
        }

        set.is_completed = true;
        set.completed_at = Some(now);
        set.sync_status = Some(SyncStatus::Synced);

        tracing::debug!("Completed set {} of exercise {}", set_id, exercise_id);
        Ok(set.clone())
    }

    /// Remove a set; removing an absent set is not an error
    pub fn remove_set(&mut self, exercise_id: Uuid, set_id: Uuid) -> Result<()> {
        let workout = self.active_mut()?;
        let exercise = find_exercise_mut(workout, exercise_id)?;

        exercise.sets.retain(|s| s.id != set_id);
        tracing::debug!("Removed set {} from exercise {}", set_id, exercise_id);
        Ok(())
    }

    /// Replace the free-text notes of the active workout
    pub fn set_notes(&mut self, notes: Option<String>) -> Result<()> {
        let workout = self.active_mut()?;
        workout.notes = notes.filter(|n| !n.trim().is_empty());
        Ok(())
    }

    /// Finish the active workout and return its historical snapshot
    ///
    /// The snapshot keeps only completed sets, and only exercises that have
    /// at least one of them. The active workout is cleared even when nothing
    /// survives the filter; rejecting empty workouts is the caller's policy.
    pub fn finish_workout(&mut self) -> Result<Workout> {
        let now = self.clock.now();
        let mut workout = self.active.take().ok_or(Error::NoActiveWorkout)?;

        let total_exercises = workout.exercises.len();
        workout.finished_at = Some(now);
        workout.exercises = workout
            .exercises
            .into_iter()
            .filter_map(|mut exercise| {
                exercise.sets.retain(|s| s.is_completed);
                (!exercise.sets.is_empty()).then_some(exercise)
            })
            .collect();
        reindex(&mut workout.exercises);

        tracing::info!(
            "Finished workout {} ({}): kept {} of {} exercises",
            workout.id,
            workout.name,
            workout.exercises.len(),
            total_exercises
        );
        Ok(workout)
    }

    /// Drop the active workout without a snapshot; a no-op when none exists
    pub fn discard_workout(&mut self) {
        match self.active.take() {
            Some(workout) => tracing::info!("Discarded workout {} ({})", workout.id, workout.name),
            None => tracing::debug!("Discard requested with no active workout"),
        }
    }

    fn active_mut(&mut self) -> Result<&mut Workout> {
        self.active.as_mut().ok_or(Error::NoActiveWorkout)
    }
}

fn find_exercise_mut(workout: &mut Workout, exercise_id: Uuid) -> Result<&mut WorkoutExercise> {
    workout
        .exercises
        .iter_mut()
        .find(|e| e.id == exercise_id)
        .ok_or(Error::ExerciseNotFound(exercise_id))
}

fn find_set_mut(exercise: &mut WorkoutExercise, set_id: Uuid) -> Result<&mut WorkoutSet> {
    exercise
        .sets
        .iter_mut()
        .find(|s| s.id == set_id)
        .ok_or(Error::SetNotFound(set_id))
}

fn validate_weight(weight: f64) -> Result<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "weight must be a non-negative number, got {}",
            weight
        )))
    }
}

fn build_set(exercise: &Exercise, draft: SetDraft, now: DateTime<Utc>) -> Result<WorkoutSet> {
    validate_weight(draft.weight)?;

    Ok(WorkoutSet {
        id: Uuid::new_v4(),
        set_type: draft.set_type,
        weight: draft.weight,
        measure: RepMeasure::for_exercise(exercise, draft.value),
        is_completed: draft.is_completed,
        completed_at: draft.is_completed.then_some(now),
        sync_status: Some(SyncStatus::Synced),
    })
}

fn build_exercise(
    exercise: Exercise,
    sets: Vec<SetDraft>,
    order: usize,
    now: DateTime<Utc>,
) -> Result<WorkoutExercise> {
    let sets = sets
        .into_iter()
        .map(|draft| build_set(&exercise, draft, now))
        .collect::<Result<Vec<_>>>()?;

    Ok(WorkoutExercise {
        id: Uuid::new_v4(),
        exercise,
        sets,
        order,
    })
}

fn reindex(exercises: &mut [WorkoutExercise]) {
    for (order, exercise) in exercises.iter_mut().enumerate() {
        exercise.order = order;
    }
}
