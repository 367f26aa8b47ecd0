#![forbid(unsafe_code)]

//! Core domain model and session logic for Iron Turtle.
//!
//! This crate provides:
//! - Domain types (exercises, workouts, sets, templates)
//! - The active workout session engine and its derived state
//! - Auto-advance, rest and duration timers, and the session controller
//! - Exercise and template catalogs
//! - Persistence (active snapshot, history log, CSV export)

pub mod types;
pub mod error;
pub mod clock;
pub mod session;
pub mod progress;
pub mod advance;
pub mod timer;
pub mod controller;
pub mod catalog;
pub mod templates;
pub mod history;
pub mod config;
pub mod logging;
pub mod wal;
pub mod state;
pub mod csv_export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{ExerciseCatalog, ExerciseFilter, InMemoryExerciseCatalog};
pub use config::Config;
pub use controller::{AssumeYes, Confirm, Confirmation, SessionController};
pub use history::{FileHistory, InMemoryHistory, WorkoutHistory};
pub use session::{SessionEngine, SharedEngine};
pub use templates::{InMemoryTemplateCatalog, TemplateCatalog, TemplateFilter};
pub use timer::SessionTimers;
