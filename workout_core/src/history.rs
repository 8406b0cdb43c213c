//! Completion history loading.
//!
//! Merges the live WAL and the CSV archive into one newest-first list.

use crate::{CompletedSession, Result, WorkoutId};
use chrono::{DateTime, Duration, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// CSV row format for reading archived sessions
#[derive(Debug, Deserialize)]
struct CsvRow {
    id: String,
    workout_id: u32,
    workout_name: String,
    started_at: String,
    completed_at: String,
    duration: u64,
    sets_completed: u32,
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| crate::Error::Other(format!("Invalid date: {}", e)))
}

impl TryFrom<CsvRow> for CompletedSession {
    type Error = crate::Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| crate::Error::Other(format!("Invalid UUID: {}", e)))?;

        Ok(CompletedSession {
            id,
            workout_id: WorkoutId(row.workout_id),
            workout_name: row.workout_name,
            started_at: parse_timestamp(&row.started_at)?,
            completed_at: parse_timestamp(&row.completed_at)?,
            duration_seconds: row.duration,
            sets_completed: row.sets_completed,
        })
    }
}

/// Load sessions completed in the last N days from both WAL and CSV
///
/// Returns sessions sorted by completed_at (newest first), deduplicated by id.
pub fn load_recent_sessions(
    wal_path: &Path,
    csv_path: &Path,
    days: i64,
) -> Result<Vec<CompletedSession>> {
    let cutoff = Utc::now() - Duration::days(days);
    let mut sessions = Vec::new();
    let mut seen_ids = HashSet::new();

    for session in crate::wal::read_sessions(wal_path)? {
        if session.completed_at >= cutoff && seen_ids.insert(session.id) {
            sessions.push(session);
        }
    }
    tracing::debug!("Loaded {} sessions from WAL", sessions.len());

    if csv_path.exists() {
        let mut csv_count = 0;
        for session in load_sessions_from_csv(csv_path)? {
            if session.completed_at >= cutoff && seen_ids.insert(session.id) {
                sessions.push(session);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} sessions from CSV", csv_count);
    }

    sessions.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    tracing::info!(
        "Loaded {} total sessions from last {} days",
        sessions.len(),
        days
    );

    Ok(sessions)
}

fn load_sessions_from_csv(path: &Path) -> Result<Vec<CompletedSession>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut sessions = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => match CompletedSession::try_from(row) {
                Ok(session) => sessions.push(session),
                Err(e) => tracing::warn!("Failed to parse CSV row: {}", e),
            },
            Err(e) => tracing::warn!("Failed to deserialize CSV row: {}", e),
        }
    }

    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{test_session, JsonlSink, SessionSink};

    #[test]
    fn test_load_recent_sessions_from_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("sessions.wal");
        let csv_path = temp_dir.path().join("sessions.csv");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&test_session(1, 60 * 24)).unwrap();
        sink.append(&test_session(2, 60 * 24 * 3)).unwrap();
        sink.append(&test_session(3, 60 * 24 * 10)).unwrap(); // Too old

        let sessions = load_recent_sessions(&wal_path, &csv_path, 7).unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn test_deduplication_across_wal_and_csv() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("sessions.wal");
        let csv_path = temp_dir.path().join("sessions.csv");

        let session = test_session(1, 10);
        let session_id = session.id;
        JsonlSink::new(&wal_path).append(&session).unwrap();
        crate::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        // Same record back in a fresh WAL
        JsonlSink::new(&wal_path).append(&session).unwrap();

        let sessions = load_recent_sessions(&wal_path, &csv_path, 7).unwrap();
        let count = sessions.iter().filter(|s| s.id == session_id).count();
        assert_eq!(count, 1);
        assert_eq!(sessions[0].workout_name, "Workout 1");
    }

    #[test]
    fn test_sessions_sorted_newest_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("sessions.wal");
        let csv_path = temp_dir.path().join("sessions.csv");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&test_session(1, 600)).unwrap();
        sink.append(&test_session(2, 5)).unwrap();

        let sessions = load_recent_sessions(&wal_path, &csv_path, 7).unwrap();
        assert_eq!(sessions[0].workout_id, WorkoutId(2));
        assert_eq!(sessions[1].workout_id, WorkoutId(1));
    }

    #[test]
    fn test_csv_only_history() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("sessions.wal");
        let csv_path = temp_dir.path().join("sessions.csv");

        JsonlSink::new(&wal_path).append(&test_session(4, 30)).unwrap();
        crate::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        let sessions = load_recent_sessions(&wal_path, &csv_path, 7).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].duration_seconds, 1800);
        assert_eq!(sessions[0].sets_completed, 12);
    }
}
