//! Display labels derived from session state.

use crate::{ExerciseStep, RepTarget};
use std::fmt;

/// Format seconds as `MM:SS`; minutes keep growing past 59
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

impl fmt::Display for RepTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepTarget::Max => write!(f, "max reps"),
            RepTarget::Count(n) => write!(f, "{} reps", n),
        }
    }
}

/// `Set 2/4`
pub fn set_label(set_number: u32, sets_total: u32) -> String {
    format!("Set {}/{}", set_number, sets_total)
}

/// `Exercise 1/6` from a zero-based index
pub fn exercise_label(exercise_index: usize, exercise_count: usize) -> String {
    format!("Exercise {}/{}", exercise_index + 1, exercise_count)
}

/// Whole-number percent for progress bars
pub fn rounded_percent(percent: f64) -> u8 {
    percent.round().clamp(0.0, 100.0) as u8
}

/// Parameters of a step in display order: sets, reps, duration, rest.
///
/// Absent parameters are skipped; zero rest is not shown.
pub fn step_parameters(step: &ExerciseStep) -> Vec<String> {
    let mut parts = Vec::new();
    if let Some(sets) = step.sets {
        parts.push(format!("{} sets", sets));
    }
    if let Some(reps) = step.reps {
        parts.push(reps.to_string());
    }
    if let Some(duration) = step.duration_sec {
        parts.push(format!("{}s", duration));
    }
    if let Some(rest) = step.rest_after() {
        parts.push(format!("rest {}s", rest));
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(105), "01:45");
        assert_eq!(format_clock(3725), "62:05");
    }

    #[test]
    fn test_rep_target_display() {
        assert_eq!(RepTarget::Max.to_string(), "max reps");
        assert_eq!(RepTarget::Count(12).to_string(), "12 reps");
    }

    #[test]
    fn test_step_parameters() {
        let step = ExerciseStep {
            sets: Some(4),
            reps: Some(RepTarget::Max),
            rest_sec: Some(105),
            ..ExerciseStep::named("Row")
        };
        assert_eq!(step_parameters(&step), vec!["4 sets", "max reps", "rest 105s"]);

        let step = ExerciseStep {
            duration_sec: Some(40),
            rest_sec: Some(0),
            ..ExerciseStep::named("Wall sit")
        };
        assert_eq!(step_parameters(&step), vec!["40s"]);
    }

    #[test]
    fn test_labels() {
        assert_eq!(set_label(2, 4), "Set 2/4");
        assert_eq!(exercise_label(0, 6), "Exercise 1/6");
        assert_eq!(rounded_percent(66.666), 67);
        assert_eq!(rounded_percent(100.0), 100);
    }
}
