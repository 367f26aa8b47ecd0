//! Exercise catalog with the built-in preset library.
//!
//! Presets are built once and cached. User-created exercises live alongside
//! them in an [`InMemoryExerciseCatalog`] and are persisted separately as a
//! JSON file.

use crate::state::{load_json_or_default, save_json_atomic};
use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// Cached preset library - built once and reused across all operations
static PRESET_EXERCISES: Lazy<Vec<Exercise>> = Lazy::new(build_preset_exercises);

/// Get a reference to the cached preset library
pub fn preset_exercises() -> &'static [Exercise] {
    &PRESET_EXERCISES
}

/// Look up a single preset by id
pub fn preset_exercise(id: &str) -> Option<&'static Exercise> {
    PRESET_EXERCISES.iter().find(|e| e.id == id)
}

// ============================================================================
// Filtering
// ============================================================================

/// Exercise query
///
/// Each list is an OR within its category; categories combine with AND. An
/// empty list places no constraint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExerciseFilter {
    pub muscle_groups: Vec<MuscleGroup>,
    pub movement_patterns: Vec<MovementPattern>,
    pub equipment: Vec<Equipment>,
    /// Case-insensitive substring of the name or notes
    pub search: Option<String>,
    pub presets_only: bool,
}

impl ExerciseFilter {
    pub fn matches(&self, exercise: &Exercise) -> bool {
        if !self.muscle_groups.is_empty()
            && !self.muscle_groups.contains(&exercise.primary_muscle_group)
        {
            return false;
        }

        if !self.movement_patterns.is_empty()
            && !exercise
                .movement_pattern
                .is_some_and(|p| self.movement_patterns.contains(&p))
        {
            return false;
        }

        if !self.equipment.is_empty()
            && !exercise.equipment.iter().any(|e| self.equipment.contains(e))
        {
            return false;
        }

        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let in_name = exercise.name.to_lowercase().contains(&needle);
            let in_notes = exercise
                .notes
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&needle));
            if !in_name && !in_notes {
                return false;
            }
        }

        !self.presets_only || exercise.is_preset
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Read and write access to exercise definitions
pub trait ExerciseCatalog {
    fn list(&self, filter: &ExerciseFilter) -> Vec<Exercise>;

    fn get_by_id(&self, id: &str) -> Option<Exercise>;

    /// Add a user exercise; the catalog assigns a `custom-` id
    fn create(&mut self, draft: ExerciseDraft) -> Result<Exercise>;

    fn update(&mut self, exercise: Exercise) -> Result<Exercise>;

    /// Remove an exercise; unknown ids are ignored
    fn delete(&mut self, id: &str) -> Result<()>;
}

/// Catalog held in memory, seeded with the presets
#[derive(Clone, Debug)]
pub struct InMemoryExerciseCatalog {
    exercises: Vec<Exercise>,
}

impl Default for InMemoryExerciseCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryExerciseCatalog {
    pub const CUSTOM_FILE_NAME: &'static str = "custom_exercises.json";

    pub fn new() -> Self {
        Self::with_exercises(preset_exercises().to_vec())
    }

    pub fn with_exercises(exercises: Vec<Exercise>) -> Self {
        Self { exercises }
    }

    /// Presets plus the custom exercises saved at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let custom: Vec<Exercise> = load_json_or_default(path)?;
        tracing::debug!("Loaded {} custom exercises", custom.len());

        let mut catalog = Self::new();
        for exercise in custom {
            catalog.upsert(exercise);
        }
        Ok(catalog)
    }

    /// Persist every non-preset exercise
    pub fn save_custom(&self, path: &Path) -> Result<()> {
        let custom: Vec<&Exercise> = self.exercises.iter().filter(|e| !e.is_preset).collect();
        save_json_atomic(&custom, path)
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    fn upsert(&mut self, exercise: Exercise) {
        match self.exercises.iter_mut().find(|e| e.id == exercise.id) {
            Some(existing) => *existing = exercise,
            None => self.exercises.push(exercise),
        }
    }

    /// Validate the catalog for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for exercise in &self.exercises {
            if exercise.id.is_empty() {
                errors.push(format!("Exercise '{}' has empty ID", exercise.name));
            } else if !seen.insert(exercise.id.as_str()) {
                errors.push(format!("Duplicate exercise ID '{}'", exercise.id));
            }
            if exercise.name.trim().is_empty() {
                errors.push(format!("Exercise '{}' has empty name", exercise.id));
            }
            if exercise.equipment.is_empty() {
                errors.push(format!("Exercise '{}' has no equipment", exercise.id));
            }
            if exercise.is_preset != exercise.id.starts_with("preset-") {
                errors.push(format!(
                    "Exercise '{}' preset flag does not match its ID",
                    exercise.id
                ));
            }
        }

        errors
    }
}

fn validate_fields(name: &str, equipment: &[Equipment]) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation("exercise name must not be empty".into()));
    }
    if equipment.is_empty() {
        return Err(Error::Validation(
            "at least one equipment type is required".into(),
        ));
    }
    Ok(())
}

impl ExerciseCatalog for InMemoryExerciseCatalog {
    fn list(&self, filter: &ExerciseFilter) -> Vec<Exercise> {
        self.exercises
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    fn get_by_id(&self, id: &str) -> Option<Exercise> {
        self.exercises.iter().find(|e| e.id == id).cloned()
    }

    fn create(&mut self, draft: ExerciseDraft) -> Result<Exercise> {
        validate_fields(&draft.name, &draft.equipment)?;

        let exercise = Exercise {
            id: format!("custom-{}", Uuid::new_v4()),
            name: draft.name.trim().to_string(),
            primary_muscle_group: draft.primary_muscle_group,
            primary_muscle: draft.primary_muscle,
            movement_pattern: draft.movement_pattern,
            equipment: draft.equipment,
            difficulty: draft.difficulty,
            notes: draft.notes,
            is_preset: false,
        };
        self.exercises.push(exercise.clone());

        tracing::info!("Created exercise {} ({})", exercise.id, exercise.name);
        Ok(exercise)
    }

    fn update(&mut self, exercise: Exercise) -> Result<Exercise> {
        validate_fields(&exercise.name, &exercise.equipment)?;
        let existing = self
            .exercises
            .iter_mut()
            .find(|e| e.id == exercise.id)
            .ok_or_else(|| Error::NotFound(format!("exercise '{}'", exercise.id)))?;

        *existing = exercise.clone();
        tracing::debug!("Updated exercise {}", exercise.id);
        Ok(exercise)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.exercises.retain(|e| e.id != id);
        Ok(())
    }
}

// ============================================================================
// Presets
// ============================================================================

fn preset(
    slug: &str,
    name: &str,
    group: MuscleGroup,
    muscle: PrimaryMuscle,
    pattern: MovementPattern,
    equipment: &[Equipment],
    notes: &str,
) -> Exercise {
    Exercise {
        id: format!("preset-{}", slug),
        name: name.into(),
        primary_muscle_group: group,
        primary_muscle: Some(muscle),
        movement_pattern: Some(pattern),
        equipment: equipment.to_vec(),
        difficulty: None,
        notes: Some(notes.into()),
        is_preset: true,
    }
}

fn build_preset_exercises() -> Vec<Exercise> {
    use Equipment::*;
    use MovementPattern as P;
    use MuscleGroup as G;
    use PrimaryMuscle as M;

    vec![
        // Legs
        preset(
            "leg-press",
            "Leg Press",
            G::Legs,
            M::Quads,
            P::Squat,
            &[Machine],
            "Feet low on platform for quad focus. Deep range of motion.",
        ),
        preset(
            "high-bar-back-squat",
            "High-Bar Back Squat",
            G::Legs,
            M::Quads,
            P::Squat,
            &[Barbell, Rack],
            "Sit straight down between your heels. Keep the chest up.",
        ),
        preset(
            "hack-squat",
            "Hack Squat",
            G::Legs,
            M::Quads,
            P::Squat,
            &[Machine],
            "Control the negative and sink as deep as mobility allows.",
        ),
        preset(
            "paused-barbell-rdl",
            "Paused Barbell RDL",
            G::Legs,
            M::Hamstrings,
            P::Hinge,
            &[Barbell],
            "Pause for one second just below the knee. Keep the bar close.",
        ),
        preset(
            "barbell-hip-thrust",
            "Barbell Hip Thrust",
            G::Legs,
            M::Glutes,
            P::Hinge,
            &[Barbell],
            "Tuck the chin and squeeze the glutes hard at lockout.",
        ),
        preset(
            "seated-leg-curl",
            "Seated Leg Curl",
            G::Legs,
            M::Hamstrings,
            P::Isolation,
            &[Machine],
            "Lean forward to get a deeper hamstring stretch.",
        ),
        preset(
            "leg-extension",
            "Leg Extension",
            G::Legs,
            M::Quads,
            P::Isolation,
            &[Machine],
            "Set the seat back to bias the rectus femoris.",
        ),
        preset(
            "machine-hip-adduction",
            "Machine Hip Adduction",
            G::Legs,
            M::Glutes,
            P::Isolation,
            &[Machine],
            "Focus on the mind-muscle connection with inner thighs.",
        ),
        preset(
            "standing-calf-raise",
            "Standing Calf Raise",
            G::Legs,
            M::Calves,
            P::Isolation,
            &[Machine],
            "Pause one to two seconds at the bottom. Roll onto the big toe.",
        ),
        // Chest
        preset(
            "low-incline-smith-machine-press",
            "Low Incline Smith Machine Press",
            G::Chest,
            M::Pecs,
            P::HorizontalPush,
            &[Machine],
            "Set bench at ~15 incline. 1s pause on the chest while maintaining tension.",
        ),
        preset(
            "db-bench-press",
            "DB Bench Press",
            G::Chest,
            M::Pecs,
            P::HorizontalPush,
            &[Dumbbell],
            "Tuck the elbows slightly and get a deep stretch at the bottom.",
        ),
        preset(
            "pec-deck",
            "Pec Deck",
            G::Chest,
            M::Pecs,
            P::Isolation,
            &[Machine],
            "Think about squeezing the biceps together.",
        ),
        // Back
        preset(
            "cross-body-lat-pull-around",
            "Cross-Body Lat Pull-Around",
            G::Back,
            M::Lats,
            P::VerticalPull,
            &[Cable],
            "Keep the cable and your wrist aligned in a straight line. Feel a deep lat stretch at the top.",
        ),
        preset(
            "lat-pulldown-wide-grip",
            "Lat Pulldown (Wide Grip)",
            G::Back,
            M::Lats,
            P::VerticalPull,
            &[Cable],
            "Drive the elbows down and in. Avoid leaning back too far.",
        ),
        preset(
            "neutral-grip-pullup",
            "Neutral-Grip Pullup",
            G::Back,
            M::Lats,
            P::VerticalPull,
            &[Bodyweight],
            "Use 3-4s negative. Pull until the chin clears the handles.",
        ),
        preset(
            "chest-supported-machine-row",
            "Chest-Supported Machine Row",
            G::Back,
            M::Rhomboids,
            P::HorizontalPull,
            &[Machine],
            "Flare elbows at 45 deg. Squeeze shoulder blades together.",
        ),
        preset(
            "lying-paused-rope-face-pull",
            "Lying Paused Rope Face Pull",
            G::Back,
            M::RearDelts,
            P::HorizontalPull,
            &[Cable],
            "1-2s pause in the squeeze. Contract rear delts hard.",
        ),
        // Shoulders
        preset(
            "seated-db-shoulder-press",
            "Seated DB Shoulder Press",
            G::Shoulders,
            M::AnteriorDelts,
            P::VerticalPush,
            &[Dumbbell],
            "Rotate dumbbells in on the negative and flare elbows out as you press.",
        ),
        preset(
            "machine-lateral-raise",
            "Machine Lateral Raise",
            G::Shoulders,
            M::LateralDelts,
            P::Isolation,
            &[Machine],
            "Lead with the elbows and keep constant tension.",
        ),
        preset(
            "cable-y-raise",
            "Cable Y-Raise",
            G::Shoulders,
            M::LateralDelts,
            P::Isolation,
            &[Cable],
            "Raise the cables up and out in a Y shape.",
        ),
        // Arms
        preset(
            "bayesian-cable-curl",
            "Bayesian Cable Curl",
            G::Arms,
            M::Biceps,
            P::Isolation,
            &[Cable],
            "Face away from the stack and let the arm drift behind the torso.",
        ),
        preset(
            "hammer-curl",
            "Hammer Curl",
            G::Arms,
            M::Forearms,
            P::Isolation,
            &[Dumbbell],
            "Keep the elbows pinned and curl with a neutral grip.",
        ),
        preset(
            "triceps-pressdown-rope",
            "Triceps Pressdown (Rope)",
            G::Arms,
            M::Triceps,
            P::Isolation,
            &[Cable],
            "Spread the rope apart at the bottom and squeeze.",
        ),
        preset(
            "overhead-cable-triceps-extension-bar",
            "Overhead Cable Triceps Extension (Bar)",
            G::Arms,
            M::Triceps,
            P::Isolation,
            &[Cable],
            "Get a deep stretch behind the head on every rep.",
        ),
        // Core
        preset(
            "llpt-plank",
            "LLPT Plank",
            G::Core,
            M::Abs,
            P::Core,
            &[Bodyweight],
            "Long-lever posterior-tilt plank. Squeeze glutes and quads, elbows under the eyes.",
        ),
        preset(
            "cable-crunch",
            "Cable Crunch",
            G::Core,
            M::Abs,
            P::Core,
            &[Cable],
            "Round the lower back as you crunch down. Hold the squeeze.",
        ),
        preset(
            "roman-chair-leg-raise",
            "Roman Chair Leg Raise",
            G::Core,
            M::Abs,
            P::Core,
            &[Other],
            "Posteriorly tilt the pelvis and hold at the top.",
        ),
    ]
}
