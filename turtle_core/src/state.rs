//! JSON state files with file locking.
//!
//! Small documents (the active workout, custom catalog entries) are stored
//! as whole JSON files. Reads take a shared lock and fall back to the
//! default value when the file is unreadable. Writes go through a locked
//! temp file that is fsynced and renamed over the target.

use crate::{Error, Result, Workout};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Load a JSON document under a shared lock
///
/// A missing file yields the default. An unreadable or corrupt file logs a
/// warning and also yields the default.
pub fn load_json_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        tracing::debug!("No file at {:?}, using default", path);
        return Ok(T::default());
    }

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!("Unable to open {:?}: {}. Using default.", path, e);
            return Ok(T::default());
        }
    };

    if let Err(e) = file.lock_shared() {
        tracing::warn!("Unable to lock {:?}: {}. Using default.", path, e);
        return Ok(T::default());
    }

    let mut contents = String::new();
    let mut reader = std::io::BufReader::new(&file);
    if let Err(e) = reader.read_to_string(&mut contents) {
        let _ = file.unlock();
        tracing::warn!("Failed to read {:?}: {}. Using default.", path, e);
        return Ok(T::default());
    }

    file.unlock()?;

    match serde_json::from_str::<T>(&contents) {
        Ok(value) => {
            tracing::debug!("Loaded {:?}", path);
            Ok(value)
        }
        Err(e) => {
            tracing::warn!("Failed to parse {:?}: {}. Using default.", path, e);
            Ok(T::default())
        }
    }
}

/// Atomically replace a JSON document
pub fn save_json_atomic<T>(value: &T, path: &Path) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let parent = path
        .parent()
        .ok_or_else(|| Error::Other(format!("{:?} has no parent directory", path)))?;
    std::fs::create_dir_all(parent)?;

    // Temp file in the same directory so the rename stays on one filesystem
    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Saved {:?}", path);
    Ok(())
}

/// The in-progress workout, persisted between CLI invocations
#[derive(Clone, Debug)]
pub struct ActiveWorkoutFile {
    path: PathBuf,
}

impl ActiveWorkoutFile {
    pub const FILE_NAME: &'static str = "active_workout.json";
    pub const OPEN_FILE_NAME: &'static str = "open_exercise.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved workout, if any; corrupt files read as no workout
    pub fn load(&self) -> Result<Option<Workout>> {
        load_json_or_default(&self.path)
    }

    /// Persist the workout, or remove the file when there is none
    pub fn save(&self, workout: Option<&Workout>) -> Result<()> {
        match workout {
            Some(workout) => save_json_atomic(workout, &self.path),
            None => remove_if_present(&self.path),
        }
    }

    /// Sibling file holding the open exercise
    pub fn open_path(&self) -> PathBuf {
        self.path.with_file_name(Self::OPEN_FILE_NAME)
    }

    pub fn load_open(&self) -> Result<Option<OpenExercise>> {
        load_json_or_default(&self.open_path())
    }

    pub fn save_open(&self, open: Option<&OpenExercise>) -> Result<()> {
        match open {
            Some(open) => save_json_atomic(open, &self.open_path()),
            None => remove_if_present(&self.open_path()),
        }
    }
}

/// The exercise open in a saved workout; `None` means all are closed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenExercise {
    pub workout_id: Uuid,
    pub exercise_id: Option<Uuid>,
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
