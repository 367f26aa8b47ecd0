//! Workout templates.
//!
//! Templates are blueprints: an ordered list of exercises with default set
//! counts, rep targets and set types. [`instantiate`] expands one into the
//! initial exercises of a new workout.

use crate::catalog::preset_exercise;
use crate::state::{load_json_or_default, save_json_atomic};
use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// Cached sample templates
static SAMPLE_TEMPLATES: Lazy<Vec<WorkoutTemplate>> = Lazy::new(build_sample_templates);

pub fn sample_templates() -> &'static [WorkoutTemplate] {
    &SAMPLE_TEMPLATES
}

/// Template query: tags OR-ed, search on name and description
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TemplateFilter {
    pub tags: Vec<TemplateTag>,
    pub search: Option<String>,
}

impl TemplateFilter {
    pub fn matches(&self, template: &WorkoutTemplate) -> bool {
        if !self.tags.is_empty() && !template.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }

        match self.search.as_deref().filter(|s| !s.is_empty()) {
            Some(search) => {
                let needle = search.to_lowercase();
                template.name.to_lowercase().contains(&needle)
                    || template
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

pub trait TemplateCatalog {
    fn list(&self, filter: &TemplateFilter) -> Vec<WorkoutTemplate>;

    fn get_by_id(&self, id: &str) -> Option<WorkoutTemplate>;

    /// Add a template; the catalog assigns a `template-` id
    fn create(&mut self, draft: TemplateDraft) -> Result<WorkoutTemplate>;

    fn update(&mut self, template: WorkoutTemplate) -> Result<WorkoutTemplate>;

    fn delete(&mut self, id: &str) -> Result<()>;
}

/// Expand a template into the initial exercises of a workout
///
/// Each template exercise yields `default_sets` sets at weight 0. A set's
/// value is its fixed rep target, the lower bound of its range, or 0 when
/// no target is given; its type defaults to WORKING.
pub fn instantiate(template: &WorkoutTemplate) -> Vec<ExercisePlan> {
    let mut exercises: Vec<&TemplateExercise> = template.exercises.iter().collect();
    exercises.sort_by_key(|e| e.order);

    exercises
        .into_iter()
        .map(|entry| {
            let sets = (0..entry.default_sets as usize)
                .map(|i| {
                    let value = entry
                        .default_reps
                        .get(i)
                        .map_or(0, |target| target.starting_value());
                    let set_type = entry.default_set_types.get(i).copied().unwrap_or_default();
                    SetDraft::new(set_type, 0.0, value)
                })
                .collect();

            ExercisePlan {
                exercise: entry.exercise.clone(),
                sets,
            }
        })
        .collect()
}

/// Check a template for internal consistency
///
/// Returns a list of validation errors, or empty Vec if valid.
pub fn validate_template(template: &WorkoutTemplate) -> Vec<String> {
    let mut errors = Vec::new();

    if template.name.trim().is_empty() {
        errors.push(format!("Template '{}' has empty name", template.id));
    }

    let mut orders: Vec<usize> = template.exercises.iter().map(|e| e.order).collect();
    orders.sort_unstable();
    if orders != (0..template.exercises.len()).collect::<Vec<_>>() {
        errors.push(format!(
            "Template '{}' exercise orders are not contiguous from 0",
            template.id
        ));
    }

    for entry in &template.exercises {
        if entry.exercise_id != entry.exercise.id {
            errors.push(format!(
                "Template '{}': exercise_id '{}' does not match embedded exercise '{}'",
                template.id, entry.exercise_id, entry.exercise.id
            ));
        }
        if entry.default_reps.len() > entry.default_sets as usize {
            errors.push(format!(
                "Template '{}': '{}' has more rep targets than sets",
                template.id, entry.exercise_id
            ));
        }
        for target in &entry.default_reps {
            if let RepTarget::Range { min, max } = target {
                if min > max {
                    errors.push(format!(
                        "Template '{}': '{}' rep range {} has min > max",
                        template.id, entry.exercise_id, target
                    ));
                }
            }
        }
    }

    errors
}

/// Template catalog held in memory, seeded with the samples
#[derive(Clone, Debug)]
pub struct InMemoryTemplateCatalog {
    templates: Vec<WorkoutTemplate>,
}

impl Default for InMemoryTemplateCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTemplateCatalog {
    pub const CUSTOM_FILE_NAME: &'static str = "custom_templates.json";

    pub fn new() -> Self {
        Self::with_templates(sample_templates().to_vec())
    }

    pub fn with_templates(templates: Vec<WorkoutTemplate>) -> Self {
        Self { templates }
    }

    /// Samples plus the templates saved at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let custom: Vec<WorkoutTemplate> = load_json_or_default(path)?;
        let mut catalog = Self::new();
        for template in custom {
            match catalog.templates.iter_mut().find(|t| t.id == template.id) {
                Some(existing) => *existing = template,
                None => catalog.templates.push(template),
            }
        }
        Ok(catalog)
    }

    /// Persist every template that is not a built-in sample
    pub fn save_custom(&self, path: &Path) -> Result<()> {
        let samples: HashSet<&str> = sample_templates().iter().map(|t| t.id.as_str()).collect();
        let custom: Vec<&WorkoutTemplate> = self
            .templates
            .iter()
            .filter(|t| !samples.contains(t.id.as_str()))
            .collect();
        save_json_atomic(&custom, path)
    }

    /// Validate every template and check for duplicate ids
    pub fn validate(&self) -> Vec<String> {
        let mut errors: Vec<String> = self.templates.iter().flat_map(validate_template).collect();

        let mut seen = HashSet::new();
        for template in &self.templates {
            if !seen.insert(template.id.as_str()) {
                errors.push(format!("Duplicate template ID '{}'", template.id));
            }
        }
        errors
    }
}

fn reject_invalid(template: &WorkoutTemplate) -> Result<()> {
    let errors = validate_template(template);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors.join("; ")))
    }
}

impl TemplateCatalog for InMemoryTemplateCatalog {
    fn list(&self, filter: &TemplateFilter) -> Vec<WorkoutTemplate> {
        self.templates
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect()
    }

    fn get_by_id(&self, id: &str) -> Option<WorkoutTemplate> {
        self.templates.iter().find(|t| t.id == id).cloned()
    }

    fn create(&mut self, draft: TemplateDraft) -> Result<WorkoutTemplate> {
        let template = WorkoutTemplate {
            id: format!("template-{}", Uuid::new_v4()),
            name: draft.name,
            description: draft.description,
            tags: draft.tags,
            exercises: draft.exercises,
        };
        reject_invalid(&template)?;

        self.templates.push(template.clone());
        tracing::info!("Created template {} ({})", template.id, template.name);
        Ok(template)
    }

    fn update(&mut self, template: WorkoutTemplate) -> Result<WorkoutTemplate> {
        reject_invalid(&template)?;
        let existing = self
            .templates
            .iter_mut()
            .find(|t| t.id == template.id)
            .ok_or_else(|| Error::NotFound(format!("template '{}'", template.id)))?;

        *existing = template.clone();
        Ok(template)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.templates.retain(|t| t.id != id);
        Ok(())
    }
}

// ============================================================================
// Sample templates
// ============================================================================

/// Per-set targets for one template entry
enum Targets {
    Fixed(u32),
    Range(u32, u32),
}

/// Exercise, set count, rep targets and set types of one sample entry
type SampleEntry = (Exercise, u32, Vec<RepTarget>, Vec<SetType>);

fn entry(exercise_id: &str, sets: u32, targets: Targets, warmups: usize) -> Option<SampleEntry> {
    let exercise = preset_exercise(exercise_id)?.clone();
    let target = match targets {
        Targets::Fixed(v) => RepTarget::Fixed(v),
        Targets::Range(min, max) => RepTarget::Range { min, max },
    };
    let set_types = if warmups == 0 {
        Vec::new()
    } else {
        (0..sets as usize)
            .map(|i| if i < warmups { SetType::Warmup } else { SetType::Working })
            .collect()
    };
    Some((exercise, sets, vec![target; sets as usize], set_types))
}

fn template(
    slug: &str,
    name: &str,
    tags: &[TemplateTag],
    entries: Vec<Option<SampleEntry>>,
) -> WorkoutTemplate {
    let exercises = entries
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(order, (exercise, default_sets, default_reps, default_set_types))| {
            TemplateExercise {
                exercise_id: exercise.id.clone(),
                exercise,
                default_sets,
                default_reps,
                default_set_types,
                order,
            }
        })
        .collect();

    WorkoutTemplate {
        id: format!("template-{}", slug),
        name: name.into(),
        description: Some(format!("{} workout", name.split_once(": ").map_or(name, |(_, n)| n))),
        tags: tags.to_vec(),
        exercises,
    }
}

fn build_sample_templates() -> Vec<WorkoutTemplate> {
    use Targets::*;
    use TemplateTag as T;

    vec![
        template(
            "fb-full-body-1",
            "FB: Full Body #1",
            &[T::FullBody],
            vec![
                entry("preset-cross-body-lat-pull-around", 3, Range(10, 12), 0),
                entry("preset-low-incline-smith-machine-press", 3, Range(8, 10), 0),
                entry("preset-machine-hip-adduction", 3, Range(10, 12), 0),
                entry("preset-leg-press", 3, Fixed(8), 0),
                entry("preset-lying-paused-rope-face-pull", 3, Range(10, 12), 0),
            ],
        ),
        template(
            "ppl-push-1",
            "PPL: Push #1",
            &[T::Push, T::Upper],
            vec![
                entry("preset-db-bench-press", 4, Range(6, 8), 1),
                entry("preset-seated-db-shoulder-press", 3, Range(8, 10), 0),
                entry("preset-pec-deck", 2, Range(10, 12), 0),
                entry("preset-machine-lateral-raise", 3, Range(12, 15), 0),
                entry("preset-overhead-cable-triceps-extension-bar", 2, Range(10, 12), 0),
                entry("preset-triceps-pressdown-rope", 2, Range(12, 15), 0),
            ],
        ),
        template(
            "ppl-pull-1",
            "PPL: Pull #1",
            &[T::Pull, T::Upper],
            vec![
                entry("preset-neutral-grip-pullup", 3, Range(6, 8), 0),
                entry("preset-lat-pulldown-wide-grip", 3, Range(10, 12), 0),
                entry("preset-chest-supported-machine-row", 3, Range(8, 10), 0),
                entry("preset-cable-y-raise", 2, Range(12, 15), 0),
                entry("preset-bayesian-cable-curl", 3, Range(10, 12), 0),
                entry("preset-hammer-curl", 2, Range(10, 12), 0),
            ],
        ),
        template(
            "ppl-legs-1",
            "PPL: Legs #1",
            &[T::Legs, T::Lower],
            vec![
                entry("preset-high-bar-back-squat", 4, Fixed(6), 2),
                entry("preset-paused-barbell-rdl", 3, Range(8, 10), 0),
                entry("preset-leg-extension", 3, Range(10, 12), 0),
                entry("preset-seated-leg-curl", 3, Range(10, 12), 0),
                entry("preset-standing-calf-raise", 3, Range(10, 12), 0),
                entry("preset-llpt-plank", 3, Range(30, 45), 0),
            ],
        ),
        template(
            "core-finisher",
            "Core: Finisher",
            &[T::Core],
            vec![
                entry("preset-cable-crunch", 3, Range(10, 12), 0),
                entry("preset-roman-chair-leg-raise", 3, Range(10, 15), 0),
                entry("preset-llpt-plank", 2, Fixed(45), 0),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionEngine;

    #[test]
    fn test_samples_are_valid() {
        let catalog = InMemoryTemplateCatalog::new();
        let errors = catalog.validate();
        assert!(errors.is_empty(), "Template validation errors: {:?}", errors);

        // Every referenced preset resolved
        let full_body = catalog.get_by_id("template-fb-full-body-1").unwrap();
        assert_eq!(full_body.exercises.len(), 5);
        assert_eq!(full_body.description.as_deref(), Some("Full Body #1 workout"));
    }

    #[test]
    fn test_filter_by_tag_and_search() {
        let catalog = InMemoryTemplateCatalog::new();

        let upper = catalog.list(&TemplateFilter {
            tags: vec![TemplateTag::Upper, TemplateTag::Core],
            ..Default::default()
        });
        assert_eq!(upper.len(), 3);

        let search = catalog.list(&TemplateFilter {
            search: Some("legs".into()),
            ..Default::default()
        });
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].id, "template-ppl-legs-1");
    }

    #[test]
    fn test_instantiate_prefills_targets() {
        let legs = InMemoryTemplateCatalog::new()
            .get_by_id("template-ppl-legs-1")
            .unwrap();
        let plans = instantiate(&legs);

        assert_eq!(plans.len(), 6);
        let squat = &plans[0];
        assert_eq!(squat.sets.len(), 4);
        assert_eq!(squat.sets[0].set_type, SetType::Warmup);
        assert_eq!(squat.sets[2].set_type, SetType::Working);
        assert!(squat.sets.iter().all(|s| s.value == 6 && s.weight == 0.0));

        assert_eq!(plans[1].sets[0].value, 8);
    }

    #[test]
    fn test_instantiate_without_targets() {
        let mut template = sample_templates()[0].clone();
        template.exercises[0].default_reps.clear();
        template.exercises[0].default_set_types.clear();

        let plans = instantiate(&template);
        assert!(plans[0]
            .sets
            .iter()
            .all(|s| s.value == 0 && s.set_type == SetType::Working));
    }

    #[test]
    fn test_instantiated_plank_measures_duration() {
        let legs = InMemoryTemplateCatalog::new()
            .get_by_id("template-ppl-legs-1")
            .unwrap();

        let mut engine = SessionEngine::new();
        let workout = engine
            .start(legs.name.clone(), Some(legs.id.clone()), instantiate(&legs))
            .unwrap();

        let plank = workout.exercises.last().unwrap();
        assert_eq!(plank.sets[0].measure, RepMeasure::Duration(30));
        assert_eq!(workout.exercises[0].sets[0].measure, RepMeasure::Reps(6));
    }

    #[test]
    fn test_create_update_delete() {
        let mut catalog = InMemoryTemplateCatalog::new();
        let source = sample_templates()[0].clone();

        let created = catalog
            .create(TemplateDraft {
                name: "My Full Body".into(),
                description: None,
                tags: vec![TemplateTag::FullBody],
                exercises: source.exercises.clone(),
            })
            .unwrap();
        assert!(created.id.starts_with("template-"));

        let mut renamed = created.clone();
        renamed.name = "Renamed".into();
        catalog.update(renamed).unwrap();
        assert_eq!(catalog.get_by_id(&created.id).unwrap().name, "Renamed");

        catalog.delete(&created.id).unwrap();
        assert!(catalog.get_by_id(&created.id).is_none());
    }

    #[test]
    fn test_create_rejects_bad_range() {
        let mut catalog = InMemoryTemplateCatalog::new();
        let mut exercises = sample_templates()[0].exercises.clone();
        exercises[0].default_reps[0] = RepTarget::Range { min: 12, max: 8 };

        let result = catalog.create(TemplateDraft {
            name: "Broken".into(),
            description: None,
            tags: vec![],
            exercises,
        });
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_custom_templates_persist() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(InMemoryTemplateCatalog::CUSTOM_FILE_NAME);

        let mut catalog = InMemoryTemplateCatalog::load(&path).unwrap();
        let created = catalog
            .create(TemplateDraft {
                name: "Quick Core".into(),
                description: Some("ten minutes".into()),
                tags: vec![TemplateTag::Core],
                exercises: vec![],
            })
            .unwrap();
        catalog.save_custom(&path).unwrap();

        let reloaded = InMemoryTemplateCatalog::load(&path).unwrap();
        assert_eq!(reloaded.get_by_id(&created.id), Some(created));
        assert_eq!(reloaded.list(&TemplateFilter::default()).len(), sample_templates().len() + 1);
    }
}
