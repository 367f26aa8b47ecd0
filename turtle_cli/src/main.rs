use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use turtle_core::catalog::{ExerciseCatalog, ExerciseFilter, InMemoryExerciseCatalog};
use turtle_core::progress::{set_progress, WorkoutProgress};
use turtle_core::state::{ActiveWorkoutFile, OpenExercise};
use turtle_core::templates::{InMemoryTemplateCatalog, TemplateCatalog, TemplateFilter};
use turtle_core::timer::format_clock;
use turtle_core::*;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "turtle")]
#[command(about = "Iron Turtle workout tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a workout, empty or from a template
    Start {
        /// Workout name (defaults to the template name or the configured default)
        #[arg(long)]
        name: Option<String>,

        /// Template id to start from
        #[arg(long)]
        template: Option<String>,

        /// Replace an in-progress workout without asking
        #[arg(long)]
        yes: bool,
    },

    /// Show the active workout
    Status,

    /// Add a catalog exercise to the active workout
    AddExercise {
        /// Catalog exercise id, e.g. preset-leg-press
        exercise_id: String,

        /// Number of sets to add (prefilled from the last session)
        #[arg(long, default_value_t = 3)]
        sets: u32,
    },

    /// Open an exercise for editing, or close it if it is open
    Open {
        /// Exercise position (1-based) or id
        exercise: String,
    },

    /// Remove an exercise from the active workout
    RemoveExercise {
        /// Exercise position (1-based) or id
        exercise: String,

        #[arg(long)]
        yes: bool,
    },

    /// Put exercises in a new order; unlisted exercises are dropped
    Reorder {
        /// Exercise positions (1-based) or ids, in the new order
        #[arg(required = true)]
        exercises: Vec<String>,
    },

    /// Add a set, copying the last set unless values are given
    AddSet {
        /// Exercise position (1-based) or id
        exercise: String,

        #[command(flatten)]
        values: SetValues,
    },

    /// Change a set's values
    UpdateSet {
        /// Exercise position (1-based) or id
        exercise: String,

        /// Set position (1-based)
        set: usize,

        #[command(flatten)]
        values: SetValues,
    },

    /// Mark a set completed, optionally saving entered values first
    CompleteSet {
        /// Exercise position (1-based) or id
        exercise: String,

        /// Set position (1-based)
        set: usize,

        #[command(flatten)]
        values: SetValues,

        /// Run the rest countdown in the foreground afterwards
        #[arg(long)]
        rest: bool,
    },

    /// Remove a set
    RemoveSet {
        /// Exercise position (1-based) or id
        exercise: String,

        /// Set position (1-based)
        set: usize,

        #[arg(long)]
        yes: bool,
    },

    /// Replace the workout notes (no text clears them)
    Notes { text: Vec<String> },

    /// Finish the workout and record it in history
    Finish {
        /// Finish even when no set was completed
        #[arg(long)]
        force: bool,
    },

    /// Throw away the active workout
    Discard {
        #[arg(long)]
        yes: bool,
    },

    /// Run a rest countdown in the foreground
    Rest {
        /// Seconds to rest (defaults to the configured rest duration)
        #[arg(long)]
        seconds: Option<u32>,
    },

    /// List catalog exercises
    Exercises {
        #[arg(long = "muscle")]
        muscle_groups: Vec<MuscleGroup>,

        #[arg(long = "pattern")]
        movement_patterns: Vec<MovementPattern>,

        #[arg(long)]
        equipment: Vec<Equipment>,

        /// Case-insensitive search in name and notes
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        presets_only: bool,
    },

    /// Add a custom exercise to the catalog
    CreateExercise {
        name: String,

        #[arg(long = "muscle")]
        muscle_group: MuscleGroup,

        #[arg(long = "pattern")]
        movement_pattern: Option<MovementPattern>,

        #[arg(long)]
        equipment: Vec<Equipment>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List workout templates
    Templates {
        #[arg(long)]
        tag: Vec<TemplateTag>,

        #[arg(long)]
        search: Option<String>,
    },

    /// List finished workouts, newest first
    History {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show the sets from the last session of an exercise
    Last { exercise_id: String },

    /// Write history to a CSV file, one row per set, replacing the file
    Export { path: PathBuf },
}

#[derive(clap::Args, Clone, Copy, Debug, Default)]
struct SetValues {
    #[arg(long)]
    weight: Option<f64>,

    /// Reps, or seconds for isometric exercises
    #[arg(long)]
    reps: Option<u32>,

    #[arg(long = "type")]
    set_type: Option<SetType>,
}

impl SetValues {
    fn to_update(self) -> SetUpdate {
        SetUpdate {
            set_type: self.set_type,
            weight: self.weight,
            value: self.reps,
        }
    }

    fn is_empty(&self) -> bool {
        self.to_update().is_empty()
    }

    /// Overlay the given values onto a base draft
    fn over(self, base: SetDraft) -> SetDraft {
        SetDraft::new(
            self.set_type.unwrap_or(base.set_type),
            self.weight.unwrap_or(base.weight),
            self.reps.unwrap_or(base.value),
        )
    }
}

/// Everything a command needs, loaded from the data directory
struct App {
    config: Config,
    data_dir: PathBuf,
    active_file: ActiveWorkoutFile,
    controller: SessionController<FileHistory>,
}

impl App {
    async fn open(data_dir: PathBuf, config: Config) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)?;

        let engine = SessionEngine::new().into_shared();
        let history = FileHistory::in_dir(&data_dir);
        let timers = SessionTimers::from_config(&config.timers);
        let mut controller = SessionController::new(engine, history, timers)
            .with_default_name(config.session.default_workout_name.clone());

        let active_file = ActiveWorkoutFile::in_dir(&data_dir);
        if let Some(workout) = active_file.load()? {
            let open = active_file
                .load_open()?
                .filter(|open| open.workout_id == workout.id);
            let restored = match open {
                Some(open) => controller.resume(workout, open.exercise_id).await,
                None => controller.restore(workout).await,
            };
            if let Err(e) = restored {
                tracing::warn!("Ignoring saved workout: {}", e);
            }
        }

        Ok(Self {
            config,
            data_dir,
            active_file,
            controller,
        })
    }

    fn save(&self) -> Result<()> {
        let workout = self.controller.workout();
        let open = workout.map(|w| OpenExercise {
            workout_id: w.id,
            exercise_id: self.controller.open_exercise(),
        });
        self.active_file.save(workout)?;
        self.active_file.save_open(open.as_ref())
    }

    fn exercises(&self) -> Result<InMemoryExerciseCatalog> {
        let catalog =
            InMemoryExerciseCatalog::load(&self.data_dir.join(InMemoryExerciseCatalog::CUSTOM_FILE_NAME))?;
        check_catalog(catalog.validate())?;
        Ok(catalog)
    }

    fn templates(&self) -> Result<InMemoryTemplateCatalog> {
        let catalog = InMemoryTemplateCatalog::load(
            &self.data_dir.join(InMemoryTemplateCatalog::CUSTOM_FILE_NAME),
        )?;
        check_catalog(catalog.validate())?;
        Ok(catalog)
    }

    fn active(&self) -> Result<&Workout> {
        self.controller.workout().ok_or(Error::NoActiveWorkout)
    }

    /// Resolve a 1-based position or an id to a workout exercise id
    fn exercise_ref(&self, reference: &str) -> Result<Uuid> {
        let workout = self.active()?;
        if let Ok(position) = reference.parse::<usize>() {
            return position
                .checked_sub(1)
                .and_then(|i| workout.exercises.get(i))
                .map(|e| e.id)
                .ok_or_else(|| Error::Validation(format!("no exercise at position {}", reference)));
        }

        Uuid::parse_str(reference)
            .map_err(|_| Error::Validation(format!("not a position or exercise id: {}", reference)))
    }

    /// Resolve a 1-based set position within an exercise
    fn set_ref(&self, exercise_id: Uuid, position: usize) -> Result<Uuid> {
        let exercise = self
            .active()?
            .exercise(exercise_id)
            .ok_or(Error::ExerciseNotFound(exercise_id))?;

        position
            .checked_sub(1)
            .and_then(|i| exercise.sets.get(i))
            .map(|s| s.id)
            .ok_or_else(|| Error::Validation(format!("no set at position {}", position)))
    }
}

fn check_catalog(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    eprintln!("Catalog validation errors:");
    for error in &errors {
        eprintln!("  - {}", error);
    }
    Err(Error::CatalogValidation("Invalid catalog".into()))
}

/// Asks on stdin; anything but y/yes declines
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(_) => matches!(input.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

fn confirmer(yes: bool) -> Box<dyn Confirm> {
    if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirm)
    }
}

fn report(outcome: Confirmation, done: &str) {
    match outcome {
        Confirmation::Done => println!("✓ {}", done),
        Confirmation::Cancelled => println!("Cancelled."),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    turtle_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());

    let mut app = App::open(data_dir, config).await?;
    run(&mut app, cli.command).await
}

async fn run(app: &mut App, command: Commands) -> Result<()> {
    match command {
        Commands::Start {
            name,
            template,
            yes,
        } => cmd_start(app, name, template, yes).await,
        Commands::Status => cmd_status(app),
        Commands::AddExercise { exercise_id, sets } => {
            cmd_add_exercise(app, &exercise_id, sets).await
        }
        Commands::Open { exercise } => {
            let exercise_id = app.exercise_ref(&exercise)?;
            let name = app
                .active()?
                .exercise(exercise_id)
                .map(|e| e.exercise.name.clone())
                .ok_or(Error::ExerciseNotFound(exercise_id))?;

            let opened = app.controller.toggle_exercise(exercise_id);
            app.save()?;
            if opened.is_some() {
                println!("✓ Opened {}", name);
            } else {
                println!("✓ Closed {}", name);
            }
            Ok(())
        }
        Commands::RemoveExercise { exercise, yes } => {
            let exercise_id = app.exercise_ref(&exercise)?;
            let outcome = app
                .controller
                .remove_exercise(exercise_id, confirmer(yes).as_mut())
                .await?;
            app.save()?;
            report(outcome, "Exercise removed");
            Ok(())
        }
        Commands::Reorder { exercises } => {
            let ids = exercises
                .iter()
                .map(|e| app.exercise_ref(e))
                .collect::<Result<Vec<_>>>()?;
            app.controller.reorder_exercises(&ids).await?;
            app.save()?;
            cmd_status(app)
        }
        Commands::AddSet { exercise, values } => {
            let exercise_id = app.exercise_ref(&exercise)?;
            let set = if values.is_empty() {
                app.controller.add_set(exercise_id).await?
            } else {
                let base = app
                    .active()?
                    .exercise(exercise_id)
                    .and_then(|e| e.sets.last())
                    .map(SetDraft::like)
                    .unwrap_or_default();
                app.controller
                    .add_set_with(exercise_id, values.over(base))
                    .await?
            };
            app.save()?;
            println!("✓ Added set: {}", describe_set(&set));
            Ok(())
        }
        Commands::UpdateSet {
            exercise,
            set,
            values,
        } => {
            let exercise_id = app.exercise_ref(&exercise)?;
            let set_id = app.set_ref(exercise_id, set)?;
            let updated = app
                .controller
                .update_set(exercise_id, set_id, values.to_update())
                .await?;
            app.save()?;
            println!("✓ Updated set {}: {}", set, describe_set(&updated));
            Ok(())
        }
        Commands::CompleteSet {
            exercise,
            set,
            values,
            rest,
        } => {
            let exercise_id = app.exercise_ref(&exercise)?;
            let set_id = app.set_ref(exercise_id, set)?;
            let completed = app
                .controller
                .complete_set(exercise_id, set_id, values.to_update())
                .await?;
            app.save()?;
            println!("✓ Completed set {}: {}", set, describe_set(&completed));
            if let Some(progress) = app.controller.progress() {
                println!("  Progress: {} sets", progress);
            }
            if rest {
                cmd_rest(app, None).await?;
            }
            Ok(())
        }
        Commands::RemoveSet { exercise, set, yes } => {
            let exercise_id = app.exercise_ref(&exercise)?;
            let set_id = app.set_ref(exercise_id, set)?;
            let outcome = app
                .controller
                .remove_set(exercise_id, set_id, confirmer(yes).as_mut())
                .await?;
            app.save()?;
            report(outcome, "Set removed");
            Ok(())
        }
        Commands::Notes { text } => {
            let notes = text.join(" ");
            app.controller
                .set_notes((!notes.trim().is_empty()).then_some(notes))
                .await?;
            app.save()?;
            println!("✓ Notes saved");
            Ok(())
        }
        Commands::Finish { force } => cmd_finish(app, force).await,
        Commands::Discard { yes } => {
            let outcome = app.controller.discard(confirmer(yes).as_mut()).await?;
            app.save()?;
            report(outcome, "Workout discarded");
            Ok(())
        }
        Commands::Rest { seconds } => cmd_rest(app, seconds).await,
        Commands::Exercises {
            muscle_groups,
            movement_patterns,
            equipment,
            search,
            presets_only,
        } => {
            let filter = ExerciseFilter {
                muscle_groups,
                movement_patterns,
                equipment,
                search,
                presets_only,
            };
            cmd_exercises(app, &filter)
        }
        Commands::CreateExercise {
            name,
            muscle_group,
            movement_pattern,
            equipment,
            notes,
        } => {
            let mut catalog = app.exercises()?;
            let created = catalog.create(ExerciseDraft {
                name,
                primary_muscle_group: muscle_group,
                primary_muscle: None,
                movement_pattern,
                equipment,
                difficulty: None,
                notes,
            })?;
            catalog.save_custom(&app.data_dir.join(InMemoryExerciseCatalog::CUSTOM_FILE_NAME))?;
            println!("✓ Created exercise {} ({})", created.name, created.id);
            Ok(())
        }
        Commands::Templates { tag, search } => {
            let filter = TemplateFilter { tags: tag, search };
            cmd_templates(app, &filter)
        }
        Commands::History { limit } => cmd_history(app, limit),
        Commands::Last { exercise_id } => cmd_last(app, &exercise_id),
        Commands::Export { path } => cmd_export(app, &path),
    }
}

async fn cmd_start(
    app: &mut App,
    name: Option<String>,
    template_id: Option<String>,
    yes: bool,
) -> Result<()> {
    if let Some(current) = app.controller.workout() {
        let prompt = format!("Replace in-progress workout '{}'?", current.name);
        if !confirmer(yes).confirm(&prompt) {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let workout = match template_id {
        Some(id) => {
            let mut template = app
                .templates()?
                .get_by_id(&id)
                .ok_or_else(|| Error::NotFound(format!("template '{}'", id)))?;
            if let Some(name) = name {
                template.name = name;
            }
            app.controller.start_from_template(&template).await?
        }
        None => app.controller.start_empty(name).await?,
    };
    app.save()?;

    println!("✓ Started workout '{}'", workout.name);
    if !workout.exercises.is_empty() {
        println!("  {} exercises ready", workout.exercises.len());
    }
    Ok(())
}

async fn cmd_add_exercise(app: &mut App, catalog_id: &str, sets: u32) -> Result<()> {
    app.active()?;
    let exercise = app
        .exercises()?
        .get_by_id(catalog_id)
        .ok_or_else(|| Error::NotFound(format!("exercise '{}'", catalog_id)))?;

    // Prefill from the last session, repeating its final set as needed
    let previous = app.controller.last_session(catalog_id)?;
    let drafts = (0..sets as usize)
        .map(|i| match &previous {
            Some(last) => last
                .sets
                .get(i)
                .or_else(|| last.sets.last())
                .map(|p| SetDraft::new(p.set_type, p.weight, p.measure.value()))
                .unwrap_or_default(),
            None => SetDraft::default(),
        })
        .collect();

    app.controller.add_exercise(exercise.clone(), drafts).await?;
    app.save()?;

    let position = app.active()?.exercises.len();
    println!("✓ Added {} as exercise {}", exercise.name, position);
    if let Some(last) = previous {
        println!(
            "  Prefilled from {}",
            last.performed_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}

fn cmd_status(app: &App) -> Result<()> {
    let Some(workout) = app.controller.workout() else {
        println!("No active workout.");
        return Ok(());
    };

    let elapsed = (chrono::Utc::now() - workout.started_at).num_seconds().max(0) as u64;
    println!("{}", workout.name);
    println!(
        "  Elapsed: {}   Sets: {}",
        format_clock(elapsed),
        WorkoutProgress::of(workout)
    );
    if let Some(notes) = &workout.notes {
        println!("  Notes: {}", notes);
    }

    if workout.exercises.is_empty() {
        println!("\n  No exercises yet. Add one with `turtle add-exercise <id>`.");
        return Ok(());
    }

    let open = app.controller.open_exercise();
    for (i, exercise) in workout.exercises.iter().enumerate() {
        let marker = if open == Some(exercise.id) { '>' } else { ' ' };
        println!(
            "\n{} {}. {} ({}/{})",
            marker,
            i + 1,
            exercise.exercise.name,
            exercise.completed_sets(),
            exercise.sets.len()
        );

        let progress = set_progress(&exercise.sets);
        for (j, set) in exercise.sets.iter().enumerate() {
            let state = if set.is_completed {
                "✓"
            } else if progress.is_current(j) {
                "→"
            } else {
                "·"
            };
            println!("     {} {} {}", state, j + 1, describe_set(set));
        }
    }
    Ok(())
}

async fn cmd_finish(app: &mut App, force: bool) -> Result<()> {
    let finished = app.controller.finish(force).await?;
    app.save()?;

    let sets: usize = finished.exercises.iter().map(|e| e.sets.len()).sum();
    let minutes = finished
        .finished_at
        .map(|end| (end - finished.started_at).num_minutes())
        .unwrap_or(0);
    println!("✓ Workout '{}' saved", finished.name);
    println!(
        "  {} exercises, {} sets, {} min",
        finished.exercises.len(),
        sets,
        minutes
    );
    Ok(())
}

async fn cmd_rest(app: &mut App, seconds: Option<u32>) -> Result<()> {
    let mut updates = app.controller.timers_mut().subscribe();
    app.controller.start_rest(seconds);

    let mut stdout = io::stdout();
    loop {
        let snapshot = *updates.borrow_and_update();
        print!("\rRest: {} ", format_clock(u64::from(snapshot.rest_seconds)));
        stdout.flush()?;

        if !snapshot.rest_running {
            break;
        }
        if updates.changed().await.is_err() {
            break;
        }
    }
    println!("\n✓ Rest over");
    Ok(())
}

fn cmd_exercises(app: &App, filter: &ExerciseFilter) -> Result<()> {
    let exercises = app.exercises()?.list(filter);
    if exercises.is_empty() {
        println!("No exercises match.");
        return Ok(());
    }

    for exercise in exercises {
        let pattern = exercise
            .movement_pattern
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<45} {:<28} {:<10} {}",
            exercise.id,
            exercise.name,
            exercise.primary_muscle_group,
            pattern
        );
    }
    Ok(())
}

fn cmd_templates(app: &App, filter: &TemplateFilter) -> Result<()> {
    let templates = app.templates()?.list(filter);
    if templates.is_empty() {
        println!("No templates match.");
        return Ok(());
    }

    for template in templates {
        let tags: Vec<String> = template.tags.iter().map(|t| t.to_string()).collect();
        println!("{}  {} [{}]", template.id, template.name, tags.join(", "));
        let mut exercises = template.exercises.clone();
        exercises.sort_by_key(|e| e.order);
        for entry in exercises {
            let target = entry
                .default_reps
                .first()
                .map(|t| format!(" x {}", t))
                .unwrap_or_default();
            println!("    {} sets{}  {}", entry.default_sets, target, entry.exercise.name);
        }
    }
    Ok(())
}

fn cmd_history(app: &App, limit: Option<usize>) -> Result<()> {
    let limit = limit.unwrap_or(app.config.session.history_limit);
    let workouts = app.controller.history().list(Some(limit))?;
    if workouts.is_empty() {
        println!("No workouts recorded yet.");
        return Ok(());
    }

    for workout in workouts {
        let sets: usize = workout.exercises.iter().map(|e| e.sets.len()).sum();
        println!(
            "{}  {}  {} exercises, {} sets",
            workout.performed_at().format("%Y-%m-%d %H:%M"),
            workout.name,
            workout.exercises.len(),
            sets
        );
    }
    Ok(())
}

fn cmd_last(app: &App, exercise_id: &str) -> Result<()> {
    match app.controller.last_session(exercise_id)? {
        Some(last) => {
            println!(
                "Last session of {} on {}",
                exercise_id,
                last.performed_at.format("%Y-%m-%d")
            );
            for (i, set) in last.sets.iter().enumerate() {
                println!(
                    "  {} {} {} x {} {}",
                    i + 1,
                    set.set_type.badge(),
                    set.weight,
                    set.measure.value(),
                    set.measure.unit()
                );
            }
        }
        None => println!("No previous session for {}", exercise_id),
    }
    Ok(())
}

fn cmd_export(app: &App, path: &Path) -> Result<()> {
    let mut workouts = app.controller.history().all()?;
    workouts.reverse();

    let count = turtle_core::csv_export::export_workouts(&workouts, path)?;
    println!("✓ Exported {} sets to {}", count, path.display());
    Ok(())
}

fn describe_set(set: &WorkoutSet) -> String {
    format!(
        "{} {} x {} {}",
        set.set_type.badge(),
        set.weight,
        set.measure.value(),
        set.measure.unit()
    )
}
