//! Moves the completion log into `sessions.csv`.
//!
//! The CSV is the long-term history archive. The log is only renamed once the
//! rows it produced are on disk.

use crate::{CompletedSession, Result};
use std::fs::OpenOptions;
use std::path::Path;

/// Archive row; timestamps as RFC 3339, duration in seconds
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    workout_id: u32,
    workout_name: String,
    started_at: String,
    completed_at: String,
    duration: u64,
    sets_completed: u32,
}

impl From<&CompletedSession> for CsvRow {
    fn from(session: &CompletedSession) -> Self {
        CsvRow {
            id: session.id.to_string(),
            workout_id: session.workout_id.0,
            workout_name: session.workout_name.clone(),
            started_at: session.started_at.to_rfc3339(),
            completed_at: session.completed_at.to_rfc3339(),
            duration: session.duration_seconds,
            sets_completed: session.sets_completed,
        }
    }
}

/// Append every logged session to the CSV archive, then retire the log.
///
/// A new archive gets a header row. The CSV is synced before the log is renamed
/// to `*.wal.processed`, so a crash in between duplicates rows rather than losing
/// them (history loading deduplicates by id). Returns the number of rows written;
/// an empty log is left in place.
pub fn wal_to_csv_and_archive(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let sessions = crate::wal::read_sessions(wal_path)?;

    if sessions.is_empty() {
        tracing::info!("No sessions in WAL to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Only a brand-new file gets the header row
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for session in &sessions {
        writer.serialize(CsvRow::from(session))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} sessions to CSV", sessions.len());

    // CSV is durable, now archive the WAL
    let processed_path = wal_path.with_extension("wal.processed");
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!("Archived WAL to {:?}", processed_path);

    Ok(sessions.len())
}

/// Delete retired `*.processed` logs in `dir`, returning how many were removed
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed WAL: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }

    Ok(count)
}
