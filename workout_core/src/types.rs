//! Core domain types for the workout tracker.
//!
//! This module defines the fundamental types used throughout the system:
//! - Workout identifiers and kinds
//! - Exercise steps and session definitions
//! - Resumable session progress (the only persisted engine state)
//! - Completed session records for history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque workout identifier
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct WorkoutId(pub u32);

impl fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for WorkoutId {
    fn from(value: u32) -> Self {
        WorkoutId(value)
    }
}

// ============================================================================
// Definition Types
// ============================================================================

/// Layout of a workout
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutKind {
    #[default]
    Simple,
    Circuit,
}

/// Repetition target for a step.
///
/// Stored as a plain integer where `0` means "as many as possible".
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "u32", into = "u32")]
pub enum RepTarget {
    Max,
    Count(u32),
}

impl From<u32> for RepTarget {
    fn from(value: u32) -> Self {
        match value {
            0 => RepTarget::Max,
            n => RepTarget::Count(n),
        }
    }
}

impl From<RepTarget> for u32 {
    fn from(value: RepTarget) -> Self {
        match value {
            RepTarget::Max => 0,
            RepTarget::Count(n) => n,
        }
    }
}

/// One exercise entry in a workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseStep {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub reps: Option<RepTarget>,
    #[serde(default)]
    pub duration_sec: Option<u32>,
    #[serde(default)]
    pub rest_sec: Option<u32>,
    #[serde(default)]
    pub circuit_index: Option<u32>,
    #[serde(default)]
    pub circuit_order: Option<u32>,
}

impl ExerciseStep {
    /// Create a step with only a name; every parameter is absent
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            notes: None,
            sets: None,
            reps: None,
            duration_sec: None,
            rest_sec: None,
            circuit_index: None,
            circuit_order: None,
        }
    }

    /// Number of set-units this step contributes (absent means 1)
    pub fn sets_total(&self) -> u32 {
        self.sets.unwrap_or(1).max(1)
    }

    /// Rest to start after a set of this step, if any
    pub fn rest_after(&self) -> Option<u32> {
        self.rest_sec.filter(|&secs| secs > 0)
    }
}

/// An immutable, ordered workout as supplied by the definition source
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionDefinition {
    pub workout_id: WorkoutId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub kind: WorkoutKind,
    pub steps: Vec<ExerciseStep>,
}

impl SessionDefinition {
    /// Sum of set-units over all steps
    pub fn total_set_units(&self) -> u32 {
        self.steps.iter().map(ExerciseStep::sets_total).sum()
    }

    /// Set-units belonging to the steps before `exercise_index`
    pub fn set_units_before(&self, exercise_index: usize) -> u32 {
        self.steps
            .iter()
            .take(exercise_index)
            .map(ExerciseStep::sets_total)
            .sum()
    }
}

// ============================================================================
// Session Progress
// ============================================================================

/// Resumable progress pointer for the active session.
///
/// This is the complete durable record; rest and elapsed timers are not stored.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionProgress {
    pub workout_id: WorkoutId,
    pub exercise_index: usize,
    pub set_number: u32,
    pub completed: bool,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionProgress {
    /// Fresh progress pointing at the first set of the first exercise
    pub fn new(workout_id: WorkoutId) -> Self {
        Self {
            workout_id,
            exercise_index: 0,
            set_number: 1,
            completed: false,
            started_at: None,
        }
    }

    /// Whether this record still points at a unit of work inside `definition`
    pub fn fits(&self, definition: &SessionDefinition) -> bool {
        if self.workout_id != definition.workout_id || self.completed {
            return false;
        }
        match definition.steps.get(self.exercise_index) {
            Some(step) => self.set_number >= 1 && self.set_number <= step.sets_total(),
            None => false,
        }
    }
}

// ============================================================================
// History Types
// ============================================================================

/// A finished session, appended to the completion log
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompletedSession {
    pub id: Uuid,
    pub workout_id: WorkoutId,
    pub workout_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub sets_completed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_reps_is_max_not_absent() {
        let step: ExerciseStep = serde_json::from_str(r#"{"name":"Pull-up","reps":0}"#).unwrap();
        assert_eq!(step.reps, Some(RepTarget::Max));

        let step: ExerciseStep = serde_json::from_str(r#"{"name":"Pull-up"}"#).unwrap();
        assert_eq!(step.reps, None);

        let step: ExerciseStep = serde_json::from_str(r#"{"name":"Pull-up","reps":8}"#).unwrap();
        assert_eq!(step.reps, Some(RepTarget::Count(8)));
    }

    #[test]
    fn test_sets_default_to_one() {
        let mut step = ExerciseStep::named("Plank");
        assert_eq!(step.sets_total(), 1);
        step.sets = Some(4);
        assert_eq!(step.sets_total(), 4);
    }

    #[test]
    fn test_rest_after_ignores_zero() {
        let mut step = ExerciseStep::named("Squat");
        assert_eq!(step.rest_after(), None);
        step.rest_sec = Some(0);
        assert_eq!(step.rest_after(), None);
        step.rest_sec = Some(45);
        assert_eq!(step.rest_after(), Some(45));
    }

    #[test]
    fn test_progress_started_at_is_epoch_millis() {
        let mut progress = SessionProgress::new(WorkoutId(7));
        progress.started_at = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123);

        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["started_at"], 1_700_000_000_123i64);
        assert_eq!(json["workout_id"], 7);
    }

    #[test]
    fn test_progress_fits_definition() {
        let definition = SessionDefinition {
            workout_id: WorkoutId(1),
            name: "Test".into(),
            description: None,
            kind: WorkoutKind::Simple,
            steps: vec![ExerciseStep {
                sets: Some(2),
                ..ExerciseStep::named("Squat")
            }],
        };

        let mut progress = SessionProgress::new(WorkoutId(1));
        assert!(progress.fits(&definition));

        progress.set_number = 3;
        assert!(!progress.fits(&definition));

        progress.set_number = 1;
        progress.exercise_index = 1;
        assert!(!progress.fits(&definition));

        let other = SessionProgress::new(WorkoutId(2));
        assert!(!other.fits(&definition));
    }
}
