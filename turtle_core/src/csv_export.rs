//! CSV export of workout history.
//!
//! Flattens finished workouts into one row per set, oldest workout first,
//! so the file can be opened in a spreadsheet. Each export is a full
//! snapshot of history.

use crate::{Error, Result, Workout};
use std::path::Path;
use tempfile::NamedTempFile;

/// Column names, written by serde from `CsvRow` when there are rows
const HEADERS: [&str; 11] = [
    "workout_id",
    "workout_name",
    "finished_at",
    "exercise_id",
    "exercise_name",
    "set_number",
    "set_type",
    "weight",
    "reps",
    "duration",
    "completed_at",
];

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    workout_id: String,
    workout_name: &'a str,
    finished_at: String,
    exercise_id: &'a str,
    exercise_name: &'a str,
    set_number: usize,
    set_type: &'static str,
    weight: f64,
    reps: Option<u32>,
    duration: Option<u32>,
    completed_at: Option<String>,
}

fn rows(workout: &Workout) -> impl Iterator<Item = CsvRow<'_>> {
    workout.exercises.iter().flat_map(move |exercise| {
        exercise.sets.iter().enumerate().map(move |(i, set)| CsvRow {
            workout_id: workout.id.to_string(),
            workout_name: &workout.name,
            finished_at: workout.performed_at().to_rfc3339(),
            exercise_id: &exercise.exercise.id,
            exercise_name: &exercise.exercise.name,
            set_number: i + 1,
            set_type: set.set_type.as_str(),
            weight: set.weight,
            reps: set.measure.reps(),
            duration: set.measure.duration(),
            completed_at: set.completed_at.map(|t| t.to_rfc3339()),
        })
    })
}

/// Write workouts to a CSV file, replacing any previous export
///
/// The file is built in a temp file next to the target and renamed over
/// it, so readers never see a half-written export. Returns the number of
/// set rows written.
pub fn export_workouts(workouts: &[Workout], csv_path: &Path) -> Result<usize> {
    let parent = match csv_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    let mut writer = csv::Writer::from_writer(temp.as_file());

    let mut count = 0;
    for workout in workouts {
        for row in rows(workout) {
            writer.serialize(row)?;
            count += 1;
        }
    }
    if count == 0 {
        writer.write_record(HEADERS)?;
    }
    writer.flush()?;
    drop(writer);

    temp.as_file().sync_all()?;
    temp.persist(csv_path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Exported {} sets from {} workouts to {:?}", count, workouts.len(), csv_path);
    Ok(count)
}
