//! Resumable session progress persistence.
//!
//! One durable slot per device holds the active session's progress. The record
//! carries its `workout_id`, and loading for a different workout yields nothing.

use crate::{Error, Result, SessionProgress, WorkoutId};
use fs2::FileExt;
use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::NamedTempFile;

/// Storage for the single active-session slot.
///
/// All operations are synchronous and idempotent.
pub trait ProgressStore {
    /// Overwrite the slot with `progress`
    fn save(&mut self, progress: &SessionProgress) -> Result<()>;

    /// Stored progress for `workout_id`, or None if the slot is empty or
    /// belongs to another workout
    fn load(&self, workout_id: WorkoutId) -> Result<Option<SessionProgress>>;

    /// Remove the slot
    fn clear(&mut self) -> Result<()>;
}

// ============================================================================
// File-backed store
// ============================================================================

/// JSON slot file with file locking and atomic replacement
#[derive(Clone, Debug)]
pub struct FileProgressStore {
    path: PathBuf,
}

impl FileProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read whatever record the slot holds, regardless of workout.
    ///
    /// Unreadable or corrupted slots are logged and reported as empty.
    pub fn peek(&self) -> Option<SessionProgress> {
        let path = &self.path;
        if !path.exists() {
            return None;
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open progress file {:?}: {}. Ignoring it.", path, e);
                return None;
            }
        };

        // Acquire shared lock for reading
        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock progress file {:?}: {}. Ignoring it.", path, e);
            return None;
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        let read = reader.read_to_string(&mut contents);
        let _ = file.unlock();
        if let Err(e) = read {
            tracing::warn!("Failed to read progress file {:?}: {}. Ignoring it.", path, e);
            return None;
        }

        match serde_json::from_str::<SessionProgress>(&contents) {
            Ok(progress) => Some(progress),
            Err(e) => {
                tracing::warn!("Failed to parse progress file {:?}: {}. Ignoring it.", path, e);
                None
            }
        }
    }
}

impl ProgressStore for FileProgressStore {
    fn save(&mut self, progress: &SessionProgress) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::Other("progress path missing parent".into()))?;
        std::fs::create_dir_all(parent)?;

        // Unique temp file in the same directory so the rename is atomic
        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(progress)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!(
            "Saved progress for workout {} at exercise {} set {}",
            progress.workout_id,
            progress.exercise_index,
            progress.set_number
        );
        Ok(())
    }

    fn load(&self, workout_id: WorkoutId) -> Result<Option<SessionProgress>> {
        match self.peek() {
            Some(progress) if progress.workout_id == workout_id => {
                tracing::debug!("Loaded progress for workout {} from {:?}", workout_id, self.path);
                Ok(Some(progress))
            }
            Some(progress) => {
                tracing::info!(
                    "Discarding stored progress for workout {} (opening workout {})",
                    progress.workout_id,
                    workout_id
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn clear(&mut self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("Cleared progress file {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// In-process slot. Clones share the same slot, so a caller can keep a handle
/// while the engine owns another.
#[derive(Clone, Debug, Default)]
pub struct MemoryProgressStore {
    slot: Rc<RefCell<Option<SessionProgress>>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current slot contents regardless of workout
    pub fn peek(&self) -> Option<SessionProgress> {
        self.slot.borrow().clone()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn save(&mut self, progress: &SessionProgress) -> Result<()> {
        *self.slot.borrow_mut() = Some(progress.clone());
        Ok(())
    }

    fn load(&self, workout_id: WorkoutId) -> Result<Option<SessionProgress>> {
        Ok(self
            .slot
            .borrow()
            .as_ref()
            .filter(|p| p.workout_id == workout_id)
            .cloned())
    }

    fn clear(&mut self) -> Result<()> {
        *self.slot.borrow_mut() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn progress(workout: u32, exercise_index: usize, set_number: u32) -> SessionProgress {
        SessionProgress {
            workout_id: WorkoutId(workout),
            exercise_index,
            set_number,
            completed: false,
            started_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileProgressStore::new(temp_dir.path().join("active_session.json"));

        let saved = progress(3, 2, 4);
        store.save(&saved).unwrap();

        let loaded = store.load(WorkoutId(3)).unwrap().unwrap();
        assert_eq!(
            (loaded.exercise_index, loaded.set_number, loaded.completed),
            (saved.exercise_index, saved.set_number, saved.completed)
        );
        assert_eq!(
            loaded.started_at.map(|t| t.timestamp_millis()),
            saved.started_at.map(|t| t.timestamp_millis())
        );
    }

    #[test]
    fn test_load_other_workout_returns_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileProgressStore::new(temp_dir.path().join("active_session.json"));

        store.save(&progress(3, 0, 1)).unwrap();
        assert!(store.load(WorkoutId(4)).unwrap().is_none());
        // Stale record is left for the next save to overwrite
        assert!(store.peek().is_some());
    }

    #[test]
    fn test_load_nonexistent_returns_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileProgressStore::new(temp_dir.path().join("nested/missing.json"));
        assert!(store.load(WorkoutId(1)).unwrap().is_none());
    }

    #[test]
    fn test_corrupted_slot_is_no_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("active_session.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        let store = FileProgressStore::new(&path);
        assert!(store.load(WorkoutId(1)).unwrap().is_none());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("active_session.json");
        let mut store = FileProgressStore::new(&path);

        store.save(&progress(1, 0, 1)).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();

        assert!(!path.exists());
        assert!(store.load(WorkoutId(1)).unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites_single_slot() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileProgressStore::new(temp_dir.path().join("active_session.json"));

        store.save(&progress(1, 0, 1)).unwrap();
        store.save(&progress(2, 1, 2)).unwrap();
        store.save(&progress(2, 1, 2)).unwrap();

        assert!(store.load(WorkoutId(1)).unwrap().is_none());
        assert_eq!(store.load(WorkoutId(2)).unwrap().unwrap().set_number, 2);
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileProgressStore::new(temp_dir.path().join("active_session.json"));
        store.save(&progress(1, 0, 1)).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "active_session.json")
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only active_session.json, found extras: {:?}",
            extras
        );
    }

    #[test]
    fn test_memory_store_shares_slot_between_clones() {
        let handle = MemoryProgressStore::new();
        let mut owned = handle.clone();

        owned.save(&progress(5, 1, 1)).unwrap();
        assert_eq!(handle.load(WorkoutId(5)).unwrap().unwrap().exercise_index, 1);
        assert!(handle.load(WorkoutId(6)).unwrap().is_none());

        owned.clear().unwrap();
        assert!(handle.peek().is_none());
    }
}
