//! Append-only log of finished workouts.
//!
//! Each finished workout is one line of a JSONL file, written under an
//! exclusive lock so concurrent CLI invocations cannot interleave lines.

use crate::{Result, Workout};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Destination for finished workouts
pub trait WorkoutSink {
    fn append(&mut self, workout: &Workout) -> Result<()>;
}

/// JSONL-based workout sink with file locking
#[derive(Clone, Debug)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl WorkoutSink for JsonlSink {
    fn append(&mut self, workout: &Workout) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(workout)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.sync_all()?;
        file.unlock()?;

        tracing::debug!("Appended workout {} to {:?}", workout.id, self.path);
        Ok(())
    }
}

/// Read every workout from a log, oldest first
///
/// Lines that fail to parse are skipped with a warning.
pub fn read_workouts(path: &Path) -> Result<Vec<Workout>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut workouts = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Workout>(&line) {
            Ok(workout) => workouts.push(workout),
            Err(e) => {
                tracing::warn!("Failed to parse workout at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} workouts from {:?}", workouts.len(), path);
    Ok(workouts)
}

/// Drop one workout from a log, keeping every other line as written
///
/// Lines that do not parse are carried over untouched. Returns whether the
/// workout was found.
pub fn remove_workout(path: &Path, workout_id: Uuid) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }

    let file = File::open(path)?;
    file.lock_exclusive()?;

    let mut kept = Vec::new();
    let mut removed = false;
    for line_result in BufReader::new(&file).lines() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Workout>(&line) {
            Ok(workout) if workout.id == workout_id => removed = true,
            _ => kept.push(line),
        }
    }

    if removed {
        rewrite_lines(path, &kept)?;
        tracing::debug!("Removed workout {} from {:?}", workout_id, path);
    }
    file.unlock()?;
    Ok(removed)
}

fn rewrite_lines(path: &Path, lines: &[String]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| crate::Error::Other(format!("{:?} has no parent directory", path)))?;

    let temp = tempfile::NamedTempFile::new_in(parent)?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        for line in lines {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| crate::Error::Io(e.error))?;
    Ok(())
}
