//! Core domain types for Iron Turtle.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercise reference data and its classification enums
//! - Workouts, their exercises and sets
//! - Templates and their default set configuration
//! - Input shapes accepted by the session engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Parse a label such as `working`, `Working` or `full-body` against the
/// canonical SCREAMING_SNAKE_CASE names of an enum.
fn parse_label<T: Copy>(input: &str, all: &[T], name: impl Fn(T) -> &'static str) -> Option<T> {
    let normalized = input.trim().replace(['-', ' '], "_").to_uppercase();
    all.iter().copied().find(|v| name(*v) == normalized)
}

// ============================================================================
// Exercise Classification
// ============================================================================

/// High-level muscle grouping used for display and filtering
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MuscleGroup {
    Legs,
    Chest,
    Back,
    Arms,
    Core,
    Shoulders,
}

impl MuscleGroup {
    pub const ALL: [MuscleGroup; 6] = [
        MuscleGroup::Legs,
        MuscleGroup::Chest,
        MuscleGroup::Back,
        MuscleGroup::Arms,
        MuscleGroup::Core,
        MuscleGroup::Shoulders,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MuscleGroup::Legs => "LEGS",
            MuscleGroup::Chest => "CHEST",
            MuscleGroup::Back => "BACK",
            MuscleGroup::Arms => "ARMS",
            MuscleGroup::Core => "CORE",
            MuscleGroup::Shoulders => "SHOULDERS",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MuscleGroup::Legs => "Legs",
            MuscleGroup::Chest => "Chest",
            MuscleGroup::Back => "Back",
            MuscleGroup::Arms => "Arms",
            MuscleGroup::Core => "Core",
            MuscleGroup::Shoulders => "Shoulders",
        }
    }
}

/// Detailed muscle for deeper filtering
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrimaryMuscle {
    Quads,
    Hamstrings,
    Glutes,
    Calves,
    Pecs,
    Lats,
    Traps,
    Rhomboids,
    Biceps,
    Triceps,
    Forearms,
    AnteriorDelts,
    LateralDelts,
    RearDelts,
    Abs,
    Obliques,
    LowerBack,
}

/// Movement pattern of an exercise
///
/// `Core` exercises are isometric: their sets are measured in seconds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementPattern {
    Squat,
    Hinge,
    HorizontalPush,
    HorizontalPull,
    VerticalPush,
    VerticalPull,
    Isolation,
    Core,
}

impl MovementPattern {
    pub const ALL: [MovementPattern; 8] = [
        MovementPattern::Squat,
        MovementPattern::Hinge,
        MovementPattern::HorizontalPush,
        MovementPattern::HorizontalPull,
        MovementPattern::VerticalPush,
        MovementPattern::VerticalPull,
        MovementPattern::Isolation,
        MovementPattern::Core,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MovementPattern::Squat => "SQUAT",
            MovementPattern::Hinge => "HINGE",
            MovementPattern::HorizontalPush => "HORIZONTAL_PUSH",
            MovementPattern::HorizontalPull => "HORIZONTAL_PULL",
            MovementPattern::VerticalPush => "VERTICAL_PUSH",
            MovementPattern::VerticalPull => "VERTICAL_PULL",
            MovementPattern::Isolation => "ISOLATION",
            MovementPattern::Core => "CORE",
        }
    }
}

/// Equipment types; an exercise may require several
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Equipment {
    Barbell,
    Dumbbell,
    Cable,
    Machine,
    Bodyweight,
    Kettlebell,
    Bands,
    Rack,
    Other,
}

impl Equipment {
    pub const ALL: [Equipment; 9] = [
        Equipment::Barbell,
        Equipment::Dumbbell,
        Equipment::Cable,
        Equipment::Machine,
        Equipment::Bodyweight,
        Equipment::Kettlebell,
        Equipment::Bands,
        Equipment::Rack,
        Equipment::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Equipment::Barbell => "BARBELL",
            Equipment::Dumbbell => "DUMBBELL",
            Equipment::Cable => "CABLE",
            Equipment::Machine => "MACHINE",
            Equipment::Bodyweight => "BODYWEIGHT",
            Equipment::Kettlebell => "KETTLEBELL",
            Equipment::Bands => "BANDS",
            Equipment::Rack => "RACK",
            Equipment::Other => "OTHER",
        }
    }
}

/// Difficulty scale 1-3
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub enum Difficulty {
    Beginner = 1,
    Intermediate = 2,
    Advanced = 3,
}

impl TryFrom<u8> for Difficulty {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Difficulty::Beginner),
            2 => Ok(Difficulty::Intermediate),
            3 => Ok(Difficulty::Advanced),
            other => Err(Error::Validation(format!(
                "difficulty must be between 1 and 3, got {}",
                other
            ))),
        }
    }
}

impl From<Difficulty> for u8 {
    fn from(value: Difficulty) -> Self {
        value as u8
    }
}

/// Kind of set performed
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetType {
    Warmup,
    #[default]
    Working,
    Myorep,
    Failure,
    Amrap,
}

impl SetType {
    pub const ALL: [SetType; 5] = [
        SetType::Warmup,
        SetType::Working,
        SetType::Myorep,
        SetType::Failure,
        SetType::Amrap,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SetType::Warmup => "WARMUP",
            SetType::Working => "WORKING",
            SetType::Myorep => "MYOREP",
            SetType::Failure => "FAILURE",
            SetType::Amrap => "AMRAP",
        }
    }

    /// One-letter badge shown next to a set
    pub fn badge(self) -> char {
        match self {
            SetType::Warmup => 'W',
            SetType::Working => 'R',
            SetType::Myorep => 'M',
            SetType::Failure => 'F',
            SetType::Amrap => 'A',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SetType::Warmup => "Warm-up",
            SetType::Working => "Working",
            SetType::Myorep => "Myo-rep",
            SetType::Failure => "Failure",
            SetType::Amrap => "AMRAP",
        }
    }
}

/// Tags used to categorize templates
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateTag {
    Push,
    Pull,
    Legs,
    Upper,
    Lower,
    FullBody,
    Arms,
    Core,
}

impl TemplateTag {
    pub const ALL: [TemplateTag; 8] = [
        TemplateTag::Push,
        TemplateTag::Pull,
        TemplateTag::Legs,
        TemplateTag::Upper,
        TemplateTag::Lower,
        TemplateTag::FullBody,
        TemplateTag::Arms,
        TemplateTag::Core,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateTag::Push => "PUSH",
            TemplateTag::Pull => "PULL",
            TemplateTag::Legs => "LEGS",
            TemplateTag::Upper => "UPPER",
            TemplateTag::Lower => "LOWER",
            TemplateTag::FullBody => "FULL_BODY",
            TemplateTag::Arms => "ARMS",
            TemplateTag::Core => "CORE",
        }
    }
}

macro_rules! impl_label_parsing {
    ($($ty:ident => $what:literal),* $(,)?) => {
        $(
            impl FromStr for $ty {
                type Err = Error;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    parse_label(s, &$ty::ALL, $ty::as_str)
                        .ok_or_else(|| Error::Validation(format!("unknown {}: {}", $what, s)))
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

impl_label_parsing! {
    MuscleGroup => "muscle group",
    MovementPattern => "movement pattern",
    Equipment => "equipment",
    SetType => "set type",
    TemplateTag => "template tag",
}

// ============================================================================
// Exercise
// ============================================================================

/// An exercise definition from the catalog
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub primary_muscle_group: MuscleGroup,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_muscle: Option<PrimaryMuscle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movement_pattern: Option<MovementPattern>,
    pub equipment: Vec<Equipment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_preset: bool,
}

impl Exercise {
    /// Isometric exercises track duration instead of reps
    pub fn is_isometric(&self) -> bool {
        self.movement_pattern == Some(MovementPattern::Core)
    }
}

/// Data for a new catalog exercise (the catalog assigns the id)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseDraft {
    pub name: String,
    pub primary_muscle_group: MuscleGroup,
    #[serde(default)]
    pub primary_muscle: Option<PrimaryMuscle>,
    #[serde(default)]
    pub movement_pattern: Option<MovementPattern>,
    pub equipment: Vec<Equipment>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub notes: Option<String>,
}

// ============================================================================
// Sets
// ============================================================================

/// How a set's repetitions are measured
///
/// Decided once from the owning exercise when the set is created; updates
/// only ever change the value, never the variant.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RepMeasure {
    Reps(u32),
    /// Seconds held, for isometric exercises
    Duration(u32),
}

impl RepMeasure {
    /// Measure appropriate for the given exercise
    pub fn for_exercise(exercise: &Exercise, value: u32) -> Self {
        if exercise.is_isometric() {
            RepMeasure::Duration(value)
        } else {
            RepMeasure::Reps(value)
        }
    }

    pub fn value(self) -> u32 {
        match self {
            RepMeasure::Reps(v) | RepMeasure::Duration(v) => v,
        }
    }

    /// Same variant carrying a new value
    pub fn with_value(self, value: u32) -> Self {
        match self {
            RepMeasure::Reps(_) => RepMeasure::Reps(value),
            RepMeasure::Duration(_) => RepMeasure::Duration(value),
        }
    }

    pub fn reps(self) -> Option<u32> {
        match self {
            RepMeasure::Reps(v) => Some(v),
            RepMeasure::Duration(_) => None,
        }
    }

    pub fn duration(self) -> Option<u32> {
        match self {
            RepMeasure::Duration(v) => Some(v),
            RepMeasure::Reps(_) => None,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            RepMeasure::Reps(_) => "reps",
            RepMeasure::Duration(_) => "secs",
        }
    }
}

/// Sync state of a set relative to the backing store
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

/// A set within an active or finished workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSet {
    pub id: Uuid,
    pub set_type: SetType,
    pub weight: f64,
    #[serde(flatten)]
    pub measure: RepMeasure,
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_status: Option<SyncStatus>,
}

/// Data for a set about to be created
///
/// `value` becomes reps or seconds depending on the exercise the set is
/// added to.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SetDraft {
    #[serde(default)]
    pub set_type: SetType,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub value: u32,
    #[serde(default)]
    pub is_completed: bool,
}

impl SetDraft {
    pub fn new(set_type: SetType, weight: f64, value: u32) -> Self {
        Self {
            set_type,
            weight,
            value,
            is_completed: false,
        }
    }

    pub fn working(weight: f64, value: u32) -> Self {
        Self::new(SetType::Working, weight, value)
    }

    /// Draft copying the type, weight and value of an existing set
    pub fn like(set: &WorkoutSet) -> Self {
        Self::new(set.set_type, set.weight, set.measure.value())
    }

    pub fn completed(mut self) -> Self {
        self.is_completed = true;
        self
    }
}

/// Partial update applied to an existing set
///
/// Completion is not part of an update; see `SessionEngine::complete_set`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SetUpdate {
    #[serde(default)]
    pub set_type: Option<SetType>,
    #[serde(default)]
    pub weight: Option<f64>,
    /// New reps or seconds, applied to whichever measure the set uses
    #[serde(default)]
    pub value: Option<u32>,
}

impl SetUpdate {
    pub fn set_type(mut self, set_type: SetType) -> Self {
        self.set_type = Some(set_type);
        self
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn value(mut self, value: u32) -> Self {
        self.value = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set_type.is_none() && self.weight.is_none() && self.value.is_none()
    }
}

// ============================================================================
// Workouts
// ============================================================================

/// An exercise within a workout, carrying a snapshot of its definition
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutExercise {
    pub id: Uuid,
    pub exercise: Exercise,
    pub sets: Vec<WorkoutSet>,
    pub order: usize,
}

impl WorkoutExercise {
    pub fn set(&self, set_id: Uuid) -> Option<&WorkoutSet> {
        self.sets.iter().find(|s| s.id == set_id)
    }

    pub fn completed_sets(&self) -> usize {
        self.sets.iter().filter(|s| s.is_completed).count()
    }
}

/// An exercise and its initial sets, used when starting a workout
#[derive(Clone, Debug, PartialEq)]
pub struct ExercisePlan {
    pub exercise: Exercise,
    pub sets: Vec<SetDraft>,
}

/// A workout; active while `finished_at` is absent
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Workout {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub exercises: Vec<WorkoutExercise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Workout {
    pub fn is_active(&self) -> bool {
        self.finished_at.is_none()
    }

    pub fn exercise(&self, exercise_id: Uuid) -> Option<&WorkoutExercise> {
        self.exercises.iter().find(|e| e.id == exercise_id)
    }

    /// When the workout happened, for history ordering
    pub fn performed_at(&self) -> DateTime<Utc> {
        self.finished_at.unwrap_or(self.started_at)
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Target reps for one template set: a fixed count or a range
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RepTarget {
    Fixed(u32),
    Range { min: u32, max: u32 },
}

impl RepTarget {
    /// Value pre-filled into a new set
    pub fn starting_value(self) -> u32 {
        match self {
            RepTarget::Fixed(v) => v,
            RepTarget::Range { min, .. } => min,
        }
    }
}

impl fmt::Display for RepTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepTarget::Fixed(v) => write!(f, "{}", v),
            RepTarget::Range { min, max } => write!(f, "{}-{}", min, max),
        }
    }
}

/// An exercise within a template, with its default set configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TemplateExercise {
    pub exercise_id: String,
    pub exercise: Exercise,
    pub default_sets: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_reps: Vec<RepTarget>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_set_types: Vec<SetType>,
    pub order: usize,
}

/// A reusable workout blueprint
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutTemplate {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<TemplateTag>,
    pub exercises: Vec<TemplateExercise>,
}

/// Data for a new template (the catalog assigns the id)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TemplateDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<TemplateTag>,
    pub exercises: Vec<TemplateExercise>,
}

// ============================================================================
// History Lookups
// ============================================================================

/// A set as it was performed in a previous session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PreviousSet {
    pub weight: f64,
    #[serde(flatten)]
    pub measure: RepMeasure,
    pub set_type: SetType,
}

/// The sets of one exercise from the most recent workout containing it
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LastSessionData {
    pub exercise_id: String,
    pub sets: Vec<PreviousSet>,
    pub performed_at: DateTime<Utc>,
}
