//! Workout history store.
//!
//! Finished workouts are kept newest first. Besides listing, the store
//! answers "what did I do last time" for an exercise, used to show previous
//! weights and reps next to the current sets.

use crate::wal::{read_workouts, remove_workout, JsonlSink, WorkoutSink};
use crate::{Error, LastSessionData, PreviousSet, Result, Workout};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Storage of finished workouts
pub trait WorkoutHistory {
    /// Record a finished workout; it becomes the newest entry
    fn append(&mut self, workout: Workout) -> Result<Workout>;

    /// Every stored workout, newest first
    fn all(&self) -> Result<Vec<Workout>>;

    fn delete(&mut self, workout_id: Uuid) -> Result<()>;

    /// Up to `limit` workouts, newest first (50 when unspecified)
    fn list(&self, limit: Option<usize>) -> Result<Vec<Workout>> {
        let mut workouts = self.all()?;
        workouts.truncate(limit.unwrap_or(DEFAULT_HISTORY_LIMIT));
        Ok(workouts)
    }

    fn get_by_id(&self, workout_id: Uuid) -> Result<Option<Workout>> {
        Ok(self.all()?.into_iter().find(|w| w.id == workout_id))
    }

    fn find_most_recent_containing(&self, exercise_id: &str) -> Result<Option<LastSessionData>> {
        Ok(last_session(&self.all()?, exercise_id))
    }

    /// Last session for each exercise that has one
    fn last_sessions_for(&self, exercise_ids: &[&str]) -> Result<HashMap<String, LastSessionData>> {
        let workouts = self.all()?;
        Ok(exercise_ids
            .iter()
            .filter_map(|id| last_session(&workouts, id).map(|data| (id.to_string(), data)))
            .collect())
    }
}

/// Sets from the newest workout (of `workouts`, newest first) in which the
/// exercise has at least one set
pub fn last_session(workouts: &[Workout], exercise_id: &str) -> Option<LastSessionData> {
    workouts.iter().find_map(|workout| {
        let entry = workout
            .exercises
            .iter()
            .find(|e| e.exercise.id == exercise_id && !e.sets.is_empty())?;

        Some(LastSessionData {
            exercise_id: exercise_id.to_string(),
            sets: entry
                .sets
                .iter()
                .map(|s| PreviousSet {
                    weight: s.weight,
                    measure: s.measure,
                    set_type: s.set_type,
                })
                .collect(),
            performed_at: workout.performed_at(),
        })
    })
}

fn ensure_finished(workout: &Workout) -> Result<()> {
    if workout.is_active() {
        return Err(Error::Validation(format!(
            "workout {} has not been finished",
            workout.id
        )));
    }
    Ok(())
}

// ============================================================================
// In-memory store
// ============================================================================

/// History kept in memory, for tests and embedding
#[derive(Clone, Debug, Default)]
pub struct InMemoryHistory {
    workouts: Vec<Workout>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkoutHistory for InMemoryHistory {
    fn append(&mut self, workout: Workout) -> Result<Workout> {
        ensure_finished(&workout)?;
        self.workouts.insert(0, workout.clone());
        Ok(workout)
    }

    fn all(&self) -> Result<Vec<Workout>> {
        Ok(self.workouts.clone())
    }

    fn delete(&mut self, workout_id: Uuid) -> Result<()> {
        self.workouts.retain(|w| w.id != workout_id);
        Ok(())
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// History persisted as a JSONL log (oldest line first on disk)
#[derive(Clone, Debug)]
pub struct FileHistory {
    sink: JsonlSink,
}

impl FileHistory {
    pub const FILE_NAME: &'static str = "history.jsonl";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            sink: JsonlSink::new(path),
        }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        self.sink.path()
    }
}

impl WorkoutHistory for FileHistory {
    fn append(&mut self, workout: Workout) -> Result<Workout> {
        ensure_finished(&workout)?;
        self.sink.append(&workout)?;
        tracing::info!("Recorded workout {} in history", workout.id);
        Ok(workout)
    }

    fn all(&self) -> Result<Vec<Workout>> {
        let mut workouts = read_workouts(self.path())?;
        workouts.reverse();
        Ok(workouts)
    }

    fn delete(&mut self, workout_id: Uuid) -> Result<()> {
        if remove_workout(self.path(), workout_id)? {
            tracing::info!("Deleted workout {} from history", workout_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::test_exercise;
    use crate::session::SessionEngine;
    use crate::{ExercisePlan, MovementPattern, RepMeasure, SetDraft};

    fn finished(name: &str, plans: Vec<ExercisePlan>) -> Workout {
        let mut engine = SessionEngine::new();
        engine.start(name, None, plans).unwrap();
        engine.finish_workout().unwrap()
    }

    fn squat_plan(weight: f64, done: bool) -> ExercisePlan {
        let draft = SetDraft::working(weight, 5);
        ExercisePlan {
            exercise: test_exercise("preset-back-squat", Some(MovementPattern::Squat)),
            sets: vec![if done { draft.completed() } else { draft }],
        }
    }

    #[test]
    fn test_list_is_newest_first_with_limit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut stores: Vec<Box<dyn WorkoutHistory>> = vec![
            Box::new(InMemoryHistory::new()),
            Box::new(FileHistory::in_dir(temp_dir.path())),
        ];

        for store in stores.iter_mut() {
            for i in 0..3 {
                store.append(finished(&format!("W{}", i), vec![])).unwrap();
            }

            let names: Vec<String> = store.list(None).unwrap().into_iter().map(|w| w.name).collect();
            assert_eq!(names, vec!["W2", "W1", "W0"]);
            assert_eq!(store.list(Some(1)).unwrap()[0].name, "W2");
        }
    }

    #[test]
    fn test_default_limit() {
        let mut store = InMemoryHistory::new();
        let workout = finished("Same", vec![]);
        for _ in 0..(DEFAULT_HISTORY_LIMIT + 5) {
            store.append(workout.clone()).unwrap();
        }
        assert_eq!(store.list(None).unwrap().len(), DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn test_append_rejects_active_workout() {
        let mut engine = SessionEngine::new();
        let active = engine.start("Open", None, vec![]).unwrap();

        let mut store = InMemoryHistory::new();
        assert!(matches!(store.append(active), Err(Error::Validation(_))));
    }

    #[test]
    fn test_most_recent_skips_empty_entries() {
        let mut store = InMemoryHistory::new();
        store.append(finished("Old", vec![squat_plan(100.0, true)])).unwrap();
        // Finished with nothing completed: the exercise is filtered out
        store.append(finished("Skipped", vec![squat_plan(120.0, false)])).unwrap();

        let last = store
            .find_most_recent_containing("preset-back-squat")
            .unwrap()
            .unwrap();
        assert_eq!(last.sets.len(), 1);
        assert_eq!(last.sets[0].weight, 100.0);
        assert_eq!(last.sets[0].measure, RepMeasure::Reps(5));

        let old = &store.list(None).unwrap()[1];
        assert_eq!(last.performed_at, old.finished_at.unwrap());

        assert!(store.find_most_recent_containing("preset-deadlift").unwrap().is_none());
    }

    #[test]
    fn test_last_session_uses_started_at_without_finish() {
        let mut workout = finished("Imported", vec![squat_plan(80.0, true)]);
        workout.finished_at = None;

        let last = last_session(std::slice::from_ref(&workout), "preset-back-squat").unwrap();
        assert_eq!(last.performed_at, workout.started_at);
    }

    #[test]
    fn test_last_sessions_for_many() {
        let mut store = InMemoryHistory::new();
        store.append(finished("Legs", vec![squat_plan(90.0, true)])).unwrap();

        let map = store
            .last_sessions_for(&["preset-back-squat", "preset-plank"])
            .unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("preset-back-squat"));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileHistory::in_dir(temp_dir.path());
        let keep = store.append(finished("Keep", vec![])).unwrap();
        let gone = store.append(finished("Gone", vec![])).unwrap();

        store.delete(gone.id).unwrap();
        store.delete(gone.id).unwrap();

        assert_eq!(store.list(None).unwrap(), vec![keep.clone()]);
        assert!(store.get_by_id(gone.id).unwrap().is_none());
        assert_eq!(store.get_by_id(keep.id).unwrap(), Some(keep));
    }

    #[test]
    fn test_delete_keeps_unreadable_lines() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileHistory::in_dir(temp_dir.path());
        let keep = store.append(finished("Keep", vec![])).unwrap();
        std::fs::write(
            store.path(),
            format!(
                "{}\n{{\"from\":\"a newer version\"}}\n",
                serde_json::to_string(&keep).unwrap()
            ),
        )
        .unwrap();
        let gone = store.append(finished("Gone", vec![])).unwrap();

        store.delete(gone.id).unwrap();

        assert_eq!(store.list(None).unwrap(), vec![keep]);
        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("a newer version"));
    }
}
