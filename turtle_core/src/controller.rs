//! Session controller.
//!
//! The layer a user interface talks to. It wraps the shared engine and the
//! history store, and after every mutation it refreshes its snapshot,
//! feeds the auto-advance state machine and brings the timers in line with
//! whether a workout is active.
//!
//! Policies that are not engine invariants live here: refusing to finish a
//! workout with no completed sets, confirming destructive operations and
//! starting the rest countdown after a set is completed.

use crate::advance::AutoAdvance;
use crate::history::WorkoutHistory;
use crate::progress::WorkoutProgress;
use crate::session::SharedEngine;
use crate::templates::instantiate;
use crate::timer::{SessionTimers, TimerSnapshot};
use crate::{
    Error, Exercise, LastSessionData, Result, SetDraft, SetUpdate, Workout, WorkoutSet,
    WorkoutTemplate,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Asks the user to confirm a destructive operation
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Confirmer that approves everything, for `--yes` style flags
#[derive(Clone, Copy, Debug, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// Result of an operation that needed confirmation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Done,
    Cancelled,
}

pub struct SessionController<H> {
    engine: SharedEngine,
    history: H,
    advance: AutoAdvance,
    timers: SessionTimers,
    snapshot: Option<Workout>,
    default_name: String,
}

impl<H: WorkoutHistory> SessionController<H> {
    pub fn new(engine: SharedEngine, history: H, timers: SessionTimers) -> Self {
        Self {
            engine,
            history,
            advance: AutoAdvance::new(),
            timers,
            snapshot: None,
            default_name: "New Workout".into(),
        }
    }

    /// Name used by [`start_empty`](Self::start_empty) when none is given
    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    pub fn engine(&self) -> SharedEngine {
        SharedEngine::clone(&self.engine)
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    /// Snapshot taken after the last operation
    pub fn workout(&self) -> Option<&Workout> {
        self.snapshot.as_ref()
    }

    /// Exercise currently open for editing
    pub fn open_exercise(&self) -> Option<Uuid> {
        self.advance.open()
    }

    pub fn progress(&self) -> Option<WorkoutProgress> {
        self.snapshot.as_ref().map(WorkoutProgress::of)
    }

    pub fn timers(&self) -> TimerSnapshot {
        self.timers.snapshot()
    }

    pub fn timers_mut(&mut self) -> &mut SessionTimers {
        &mut self.timers
    }

    /// Re-read the engine and update derived state
    pub async fn refresh(&mut self) -> Option<&Workout> {
        let snapshot = self.engine.lock().await.snapshot();
        self.advance.observe(snapshot.as_ref());
        self.timers.sync(snapshot.is_some());
        self.snapshot = snapshot;
        self.snapshot.as_ref()
    }

    /// Reinstate a saved active workout
    pub async fn restore(&mut self, workout: Workout) -> Result<()> {
        self.engine.lock().await.restore(workout)?;
        self.refresh().await;
        Ok(())
    }

    /// Reinstate a saved active workout along with its open exercise
    ///
    /// Unlike [`restore`](Self::restore) this is not an initial load: a
    /// closed exercise list stays closed.
    pub async fn resume(&mut self, workout: Workout, open: Option<Uuid>) -> Result<()> {
        let snapshot = {
            let mut engine = self.engine.lock().await;
            engine.restore(workout)?;
            engine.snapshot()
        };
        self.advance.resume(snapshot.as_ref(), open);
        self.refresh().await;
        Ok(())
    }

    // ========================================================================
    // Workout lifecycle
    // ========================================================================

    pub async fn start_empty(&mut self, name: Option<String>) -> Result<Workout> {
        let name = name.unwrap_or_else(|| self.default_name.clone());
        let workout = self.engine.lock().await.start(name, None, Vec::new())?;
        self.refresh().await;
        Ok(workout)
    }

    pub async fn start_from_template(&mut self, template: &WorkoutTemplate) -> Result<Workout> {
        let plans = instantiate(template);
        let workout = self.engine.lock().await.start(
            template.name.clone(),
            Some(template.id.clone()),
            plans,
        )?;
        info!("Started workout from template {}", template.id);
        self.refresh().await;
        Ok(workout)
    }

    /// Finish the workout and record it in history
    ///
    /// Without `force`, a workout with no completed sets is rejected and
    /// left active.
    ///
    /// If history cannot record it, the workout stays active and the error
    /// is returned.
    pub async fn finish(&mut self, force: bool) -> Result<Workout> {
        let mut engine = self.engine.lock().await;
        let workout = engine.active_workout().ok_or(Error::NoActiveWorkout)?;

        if !force && WorkoutProgress::of(workout).is_empty() {
            return Err(Error::Validation(
                "No sets completed. Complete at least one set before finishing".into(),
            ));
        }

        let unfinished = workout.clone();
        let finished = engine.finish_workout()?;
        let recorded = match self.history.append(finished) {
            Ok(recorded) => Ok(recorded),
            Err(e) => {
                warn!("Could not record workout {}: {}", unfinished.id, e);
                engine.restore(unfinished)?;
                Err(e)
            }
        };
        drop(engine);

        self.refresh().await;
        recorded
    }

    pub async fn discard(&mut self, confirm: &mut dyn Confirm) -> Result<Confirmation> {
        let name = match self.engine.lock().await.active_workout() {
            Some(workout) => workout.name.clone(),
            None => return Ok(Confirmation::Done),
        };

        if !confirm.confirm(&format!("Discard workout '{}'?", name)) {
            debug!("Discard cancelled");
            return Ok(Confirmation::Cancelled);
        }

        self.engine.lock().await.discard_workout();
        self.refresh().await;
        Ok(Confirmation::Done)
    }

    pub async fn set_notes(&mut self, notes: Option<String>) -> Result<()> {
        self.engine.lock().await.set_notes(notes)?;
        self.refresh().await;
        Ok(())
    }

    // ========================================================================
    // Exercises
    // ========================================================================

    pub async fn add_exercise(
        &mut self,
        exercise: Exercise,
        sets: Vec<SetDraft>,
    ) -> Result<Uuid> {
        let created = self.engine.lock().await.add_exercise(exercise, sets)?;
        self.refresh().await;
        Ok(created.id)
    }

    pub async fn remove_exercise(
        &mut self,
        exercise_id: Uuid,
        confirm: &mut dyn Confirm,
    ) -> Result<Confirmation> {
        let name = {
            let engine = self.engine.lock().await;
            let workout = engine.active_workout().ok_or(Error::NoActiveWorkout)?;
            workout.exercise(exercise_id).map(|e| e.exercise.name.clone())
        };

        if let Some(name) = name {
            if !confirm.confirm(&format!("Remove '{}' and all its sets?", name)) {
                return Ok(Confirmation::Cancelled);
            }
        }

        self.engine.lock().await.remove_exercise(exercise_id)?;
        self.refresh().await;
        Ok(Confirmation::Done)
    }

    pub async fn reorder_exercises(&mut self, ordered_ids: &[Uuid]) -> Result<()> {
        self.engine.lock().await.reorder_exercises(ordered_ids)?;
        self.refresh().await;
        Ok(())
    }

    /// Open an exercise, or close it if it is already open
    pub fn toggle_exercise(&mut self, exercise_id: Uuid) -> Option<Uuid> {
        self.advance.toggle(exercise_id)
    }

    // ========================================================================
    // Sets
    // ========================================================================

    /// Append a set copying the type, weight and value of the last one
    pub async fn add_set(&mut self, exercise_id: Uuid) -> Result<WorkoutSet> {
        let set = {
            let mut engine = self.engine.lock().await;
            let workout = engine.active_workout().ok_or(Error::NoActiveWorkout)?;
            let exercise = workout
                .exercise(exercise_id)
                .ok_or(Error::ExerciseNotFound(exercise_id))?;
            let draft = exercise.sets.last().map(SetDraft::like).unwrap_or_default();
            engine.add_set(exercise_id, draft)?
        };

        self.refresh().await;
        Ok(set)
    }

    pub async fn add_set_with(&mut self, exercise_id: Uuid, draft: SetDraft) -> Result<WorkoutSet> {
        let set = self.engine.lock().await.add_set(exercise_id, draft)?;
        self.refresh().await;
        Ok(set)
    }

    pub async fn update_set(
        &mut self,
        exercise_id: Uuid,
        set_id: Uuid,
        update: SetUpdate,
    ) -> Result<WorkoutSet> {
        let set = self
            .engine
            .lock()
            .await
            .update_set(exercise_id, set_id, update)?;
        self.refresh().await;
        Ok(set)
    }

    /// Save the entered values, mark the set done and start resting
    ///
    /// A set that is already completed is returned unchanged and the rest
    /// timer is left alone.
    pub async fn complete_set(
        &mut self,
        exercise_id: Uuid,
        set_id: Uuid,
        entered: SetUpdate,
    ) -> Result<WorkoutSet> {
        let completed = {
            let mut engine = self.engine.lock().await;
            let workout = engine.active_workout().ok_or(Error::NoActiveWorkout)?;
            let exercise = workout
                .exercise(exercise_id)
                .ok_or(Error::ExerciseNotFound(exercise_id))?;
            let set = exercise.set(set_id).ok_or(Error::SetNotFound(set_id))?;

            if set.is_completed {
                debug!("Set {} already completed", set_id);
                return Ok(set.clone());
            }

            if !entered.is_empty() {
                engine.update_set(exercise_id, set_id, entered)?;
            }
            engine.complete_set(exercise_id, set_id)?
        };

        self.refresh().await;
        self.timers.start_rest(None);
        Ok(completed)
    }

    pub async fn remove_set(
        &mut self,
        exercise_id: Uuid,
        set_id: Uuid,
        confirm: &mut dyn Confirm,
    ) -> Result<Confirmation> {
        if !confirm.confirm("Remove this set?") {
            return Ok(Confirmation::Cancelled);
        }

        self.engine.lock().await.remove_set(exercise_id, set_id)?;
        self.refresh().await;
        Ok(Confirmation::Done)
    }

    // ========================================================================
    // Rest timer and history lookups
    // ========================================================================

    pub fn start_rest(&mut self, seconds: Option<u32>) {
        self.timers.start_rest(seconds);
    }

    pub fn stop_rest(&mut self) {
        self.timers.stop_rest();
    }

    pub fn add_rest_time(&mut self, seconds: Option<u32>) {
        self.timers.add_rest_time(seconds);
    }

    /// Sets performed last time for a catalog exercise
    pub fn last_session(&self, exercise_id: &str) -> Result<Option<LastSessionData>> {
        self.history.find_most_recent_containing(exercise_id)
    }
}
