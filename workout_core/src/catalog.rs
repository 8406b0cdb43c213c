//! Workout catalog and session definition source.
//!
//! The engine only needs one operation from the catalog: look up the ordered
//! steps of a workout. The built-in catalog is used unless the data directory
//! holds a `workouts.toml` file.

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Supplier of immutable session definitions
pub trait DefinitionSource {
    /// Load the definition for `workout_id`.
    ///
    /// Not-found and parse failures are reported as `Error::DefinitionLoad`.
    fn load_definition(&self, workout_id: WorkoutId) -> Result<SessionDefinition>;
}

/// The set of workouts available on this device
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub workouts: HashMap<WorkoutId, SessionDefinition>,
}

impl DefinitionSource for Catalog {
    fn load_definition(&self, workout_id: WorkoutId) -> Result<SessionDefinition> {
        self.workouts
            .get(&workout_id)
            .cloned()
            .ok_or_else(|| Error::DefinitionLoad(format!("workout {} not found", workout_id)))
    }
}

/// On-disk catalog layout
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    workouts: Vec<SessionDefinition>,
}

impl Catalog {
    /// Build a catalog from a list of definitions
    pub fn from_definitions(definitions: impl IntoIterator<Item = SessionDefinition>) -> Self {
        Self {
            workouts: definitions
                .into_iter()
                .map(|d| (d.workout_id, d))
                .collect(),
        }
    }

    /// Load a catalog from a TOML file with `[[workouts]]` tables
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let file: CatalogFile = toml::from_str(&contents)?;
        tracing::info!("Loaded {} workouts from {:?}", file.workouts.len(), path);
        Ok(Self::from_definitions(file.workouts))
    }

    /// Catalog from `path` if it exists, otherwise the built-in catalog
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            tracing::debug!("No catalog file at {:?}, using built-in workouts", path);
            Ok(get_default_catalog().clone())
        }
    }

    /// Definitions sorted by id
    pub fn sorted(&self) -> Vec<&SessionDefinition> {
        let mut definitions: Vec<_> = self.workouts.values().collect();
        definitions.sort_by_key(|d| d.workout_id);
        definitions
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (id, def) in &self.workouts {
            if id != &def.workout_id {
                errors.push(format!(
                    "Workout key '{}' doesn't match definition id '{}'",
                    id, def.workout_id
                ));
            }
            if def.name.trim().is_empty() {
                errors.push(format!("Workout '{}' has empty name", id));
            }
            if def.steps.is_empty() {
                errors.push(format!("Workout '{}' has no steps", id));
            }

            for (index, step) in def.steps.iter().enumerate() {
                if step.name.trim().is_empty() {
                    errors.push(format!("Workout '{}': step {} has empty name", id, index + 1));
                }
                if step.sets == Some(0) {
                    errors.push(format!(
                        "Workout '{}': step '{}' has zero sets",
                        id, step.name
                    ));
                }
            }
        }

        errors
    }
}

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

fn step(name: &str, sets: u32, reps: Option<u32>, rest_sec: Option<u32>) -> ExerciseStep {
    ExerciseStep {
        sets: Some(sets),
        reps: reps.map(RepTarget::from),
        rest_sec,
        ..ExerciseStep::named(name)
    }
}

fn circuit(mut steps: Vec<ExerciseStep>) -> Vec<ExerciseStep> {
    for (order, step) in steps.iter_mut().enumerate() {
        step.circuit_index = Some(1);
        step.circuit_order = Some(order as u32 + 1);
    }
    steps
}

/// Builds the built-in catalog of template workouts
pub fn build_default_catalog() -> Catalog {
    let legs = SessionDefinition {
        workout_id: WorkoutId(1),
        name: "Leg Day".into(),
        description: Some("Single-leg strength, isometrics and plyometrics".into()),
        kind: WorkoutKind::Simple,
        steps: vec![
            ExerciseStep {
                description: Some("Squat on one leg".into()),
                notes: Some("Hold a door frame for balance if needed".into()),
                ..step("Pistol squat", 4, Some(10), Some(45))
            },
            ExerciseStep {
                duration_sec: Some(40),
                ..step("Wall sit", 4, None, Some(0))
            },
            step("Jump squat", 4, Some(15), Some(60)),
        ],
    };

    let back = SessionDefinition {
        workout_id: WorkoutId(2),
        name: "Back Day".into(),
        description: Some("Vertical and horizontal pulling".into()),
        kind: WorkoutKind::Simple,
        steps: vec![
            step("Pronated pull-up", 4, Some(10), Some(105)),
            ExerciseStep {
                notes: Some("As many clean reps as possible".into()),
                ..step("Australian row (wide grip)", 4, Some(0), Some(105))
            },
            step("Hanging knee raise", 3, Some(12), Some(105)),
        ],
    };

    let push = SessionDefinition {
        workout_id: WorkoutId(3),
        name: "Push-up Circuit".into(),
        description: Some("Home push-up routine, one round per set".into()),
        kind: WorkoutKind::Circuit,
        steps: circuit(vec![
            step("Classic push-up", 3, Some(12), Some(30)),
            step("Diamond push-up", 3, Some(12), Some(30)),
            step("Alternating archer push-up", 3, Some(10), Some(30)),
            step("Shoulder-tap push-up", 3, Some(12), Some(30)),
            step("Explosive push-up", 3, Some(10), Some(30)),
            step("Sphinx triceps extension", 3, Some(15), Some(120)),
        ]),
    };

    Catalog::from_definitions([legs, back, push])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.workouts.len(), 3);
    }

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_load_definition_not_found() {
        let catalog = build_default_catalog();
        let result = catalog.load_definition(WorkoutId(999));
        assert!(matches!(result, Err(Error::DefinitionLoad(_))));
    }

    #[test]
    fn test_max_reps_step_in_default_catalog() {
        let back = get_default_catalog().load_definition(WorkoutId(2)).unwrap();
        assert_eq!(back.steps[1].reps, Some(RepTarget::Max));
    }

    #[test]
    fn test_circuit_order_assigned() {
        let push = get_default_catalog().load_definition(WorkoutId(3)).unwrap();
        assert_eq!(push.kind, WorkoutKind::Circuit);
        let orders: Vec<_> = push.steps.iter().filter_map(|s| s.circuit_order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("workouts.toml");
        std::fs::write(
            &path,
            r#"
[[workouts]]
workout_id = 10
name = "Quick"

[[workouts.steps]]
name = "Burpee"
sets = 2
reps = 0
rest_sec = 30

[[workouts.steps]]
name = "Plank"
duration_sec = 60
"#,
        )
        .unwrap();

        let catalog = Catalog::load_from(&path).unwrap();
        let quick = catalog.load_definition(WorkoutId(10)).unwrap();
        assert_eq!(quick.kind, WorkoutKind::Simple);
        assert_eq!(quick.steps.len(), 2);
        assert_eq!(quick.steps[0].reps, Some(RepTarget::Max));
        assert_eq!(quick.steps[1].sets_total(), 1);
        assert!(catalog.validate().is_empty());
    }

    #[test]
    fn test_load_or_default_falls_back() {
        let temp_dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::load_or_default(&temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(catalog.workouts.len(), 3);
    }

    #[test]
    fn test_validate_flags_problems() {
        let catalog = Catalog::from_definitions([SessionDefinition {
            workout_id: WorkoutId(4),
            name: " ".into(),
            description: None,
            kind: WorkoutKind::Simple,
            steps: vec![],
        }]);
        let errors = catalog.validate();
        assert_eq!(errors.len(), 2);

        let catalog = Catalog::from_definitions([SessionDefinition {
            workout_id: WorkoutId(5),
            name: "Bad sets".into(),
            description: None,
            kind: WorkoutKind::Simple,
            steps: vec![ExerciseStep {
                sets: Some(0),
                ..ExerciseStep::named("Row")
            }],
        }]);
        assert!(catalog.validate()[0].contains("zero sets"));
    }
}
