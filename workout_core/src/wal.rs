//! Completion log.
//!
//! Every finished workout becomes one JSON object per line in
//! `wal/completed_sessions.wal`. Appends take an exclusive `fs2` lock and
//! readers a shared one, so a rollup never sees half a record.

use crate::{CompletedSession, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Destination for finished-session records; the engine writes one per completed workout
pub trait SessionSink {
    fn append(&mut self, session: &CompletedSession) -> Result<()>;
}

/// Appends records to a JSON Lines file
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// The file and its directory are created on first append
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl SessionSink for JsonlSink {
    fn append(&mut self, session: &CompletedSession) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(session)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended completed session {} to WAL", session.id);
        Ok(())
    }
}

/// Every parseable record in the log, in append order. A missing log is empty.
pub fn read_sessions(path: &Path) -> Result<Vec<CompletedSession>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut sessions = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<CompletedSession>(&line) {
            Ok(session) => sessions.push(session),
            Err(e) => {
                // Keep reading; one torn line must not hide the rest of the history
                tracing::warn!("Failed to parse session at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} sessions from WAL", sessions.len());
    Ok(sessions)
}

#[cfg(test)]
pub(crate) fn test_session(workout: u32, minutes_ago: i64) -> CompletedSession {
    use chrono::{Duration, Utc};

    let completed_at = Utc::now() - Duration::minutes(minutes_ago);
    CompletedSession {
        id: uuid::Uuid::new_v4(),
        workout_id: crate::WorkoutId(workout),
        workout_name: format!("Workout {}", workout),
        started_at: completed_at - Duration::minutes(30),
        completed_at,
        duration_seconds: 1800,
        sets_completed: 12,
    }
}
