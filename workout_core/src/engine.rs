//! Interactive session engine.
//!
//! The engine is the single authority over a live session's progress. It
//! owns the rest and elapsed timers and the wake-lock coordinator, and every
//! mutation goes through one of its commands:
//!
//! - `Summary` → `Executing` on `start`
//! - `Executing`/`Resting` → next unit on `complete_set`, resting when the
//!   step defines rest, `Done` after the last set
//! - `Resting` → `Executing` on `reset_rest` (a countdown reaching zero does
//!   not move on by itself)
//! - any live state → `Closed` on a confirmed quit
//!
//! Commands take `&mut self`, so they can never interleave. Each command
//! writes the next progress record before committing it in memory; a failed
//! write leaves the engine untouched.

use crate::catalog::DefinitionSource;
use crate::store::ProgressStore;
use crate::wake_lock::{Visibility, WakeLockCoordinator};
use crate::wal::SessionSink;
use crate::{
    Clock, CompletedSession, ElapsedTimer, Error, ExerciseStep, RepTarget, RestTimer, Result,
    SessionDefinition, SessionProgress, WorkoutId,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Engine lifecycle states
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Pre-session overview
    Summary,
    /// A set is in progress
    Executing,
    /// Rest window after a completed set
    Resting,
    /// Every set finished
    Done,
    /// Quit confirmed; the engine accepts no further commands
    Closed,
}

impl SessionState {
    /// Whether the user is mid-workout (wake lock wanted)
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Executing | SessionState::Resting)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Summary => "summary",
            SessionState::Executing => "executing",
            SessionState::Resting => "resting",
            SessionState::Done => "done",
            SessionState::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// What manual navigation does with the destination step's rest
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationRest {
    /// Arm a paused rest window of the destination's `rest_sec`
    #[default]
    StartPaused,
    /// Always land in execution with no rest
    Inactive,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EngineOptions {
    pub navigation_rest: NavigationRest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Outcome of the first step of quitting
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuitRequest {
    /// The caller must confirm (or cancel) before anything is cleared
    ConfirmationRequired,
    /// The session was already finished; it is closed now
    Closed,
}

/// Upcoming step, shown under the current one
#[derive(Clone, Debug, PartialEq)]
pub struct StepPreview {
    pub exercise_index: usize,
    pub name: String,
    pub sets_total: u32,
    pub reps: Option<RepTarget>,
    pub duration_sec: Option<u32>,
}

/// Read-only view for the rendering surface
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub workout_id: WorkoutId,
    pub workout_name: String,
    pub exercise_index: usize,
    pub exercise_count: usize,
    pub current_step: Option<ExerciseStep>,
    pub set_number: u32,
    pub sets_total: u32,
    pub rest_remaining: Option<u32>,
    pub rest_running: bool,
    pub elapsed_sec: u64,
    pub progress_percent: f64,
    pub next_step_preview: Option<StepPreview>,
    pub quit_pending: bool,
}

pub struct SessionEngine {
    definition: SessionDefinition,
    progress: SessionProgress,
    state: SessionState,
    quit_pending: bool,
    rest: RestTimer,
    elapsed: ElapsedTimer,
    store: Box<dyn ProgressStore>,
    history: Option<Box<dyn SessionSink>>,
    wake_lock: WakeLockCoordinator,
    clock: Clock,
    options: EngineOptions,
}

impl SessionEngine {
    /// Load the definition for `workout_id` and resume or initialize progress.
    ///
    /// A stored, started record for the same workout resumes straight into
    /// `Executing`; anything else starts at `Summary`. A definition that cannot be loaded
    /// (or has no steps) is returned as `Error::DefinitionLoad`.
    pub fn open<S>(source: &S, workout_id: WorkoutId, store: Box<dyn ProgressStore>) -> Result<Self>
    where
        S: DefinitionSource + ?Sized,
    {
        let definition = source.load_definition(workout_id).map_err(|e| match e {
            Error::DefinitionLoad(_) => e,
            other => Error::DefinitionLoad(other.to_string()),
        })?;

        if definition.workout_id != workout_id {
            return Err(Error::DefinitionLoad(format!(
                "requested workout {} but source returned {}",
                workout_id, definition.workout_id
            )));
        }
        if definition.steps.is_empty() {
            return Err(Error::DefinitionLoad(format!(
                "workout {} has no steps",
                workout_id
            )));
        }

        let stored = match store.load(workout_id) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Unable to read stored progress: {}. Starting fresh.", e);
                None
            }
        };

        let mut engine = Self {
            progress: SessionProgress::new(workout_id),
            definition,
            state: SessionState::Summary,
            quit_pending: false,
            rest: RestTimer::new(),
            elapsed: ElapsedTimer::new(),
            store,
            history: None,
            wake_lock: WakeLockCoordinator::noop(),
            clock: Clock::default(),
            options: EngineOptions::default(),
        };

        match stored {
            Some(progress) if progress.fits(&engine.definition) => {
                tracing::info!(
                    "Resuming workout {} at exercise {} set {}",
                    workout_id,
                    progress.exercise_index + 1,
                    progress.set_number
                );
                // A record that was never started keeps its position; `start` stamps it
                engine.state = match progress.started_at {
                    Some(started_at) => {
                        engine.elapsed = ElapsedTimer::resumed(started_at);
                        SessionState::Executing
                    }
                    None => SessionState::Summary,
                };
                engine.progress = progress;
            }
            Some(progress) => {
                tracing::info!(
                    "Stored progress (exercise {}, set {}) no longer fits workout {}, discarding",
                    progress.exercise_index + 1,
                    progress.set_number,
                    workout_id
                );
            }
            None => tracing::debug!("No stored progress for workout {}", workout_id),
        }

        Ok(engine)
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Record finished sessions into `sink`
    pub fn with_history(mut self, sink: Box<dyn SessionSink>) -> Self {
        self.history = Some(sink);
        self
    }

    /// Attach a wake-lock coordinator; it is synced with the current state immediately
    pub fn with_wake_lock(mut self, coordinator: WakeLockCoordinator) -> Self {
        self.wake_lock = coordinator;
        self.wake_lock.sync(self.state.is_active());
        self
    }

    // ------------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn definition(&self) -> &SessionDefinition {
        &self.definition
    }

    pub fn progress(&self) -> &SessionProgress {
        &self.progress
    }

    pub fn is_quit_pending(&self) -> bool {
        self.quit_pending
    }

    pub fn wake_lock_held(&self) -> bool {
        self.wake_lock.is_held()
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    pub fn elapsed_sec(&self) -> u64 {
        self.elapsed.elapsed_sec(self.clock.now())
    }

    fn current_step(&self) -> &ExerciseStep {
        &self.definition.steps[self.progress.exercise_index]
    }

    /// Share of set-units finished before the current position, in percent
    pub fn progress_percent(&self) -> f64 {
        if matches!(self.state, SessionState::Done) || self.progress.completed {
            return 100.0;
        }
        let total = self.definition.total_set_units();
        if total == 0 {
            return 0.0;
        }
        let done = self.definition.set_units_before(self.progress.exercise_index)
            + self.progress.set_number.saturating_sub(1);
        (f64::from(done) / f64::from(total) * 100.0).clamp(0.0, 100.0)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let finished = matches!(self.state, SessionState::Done | SessionState::Closed);
        let step = self.current_step();

        let next_step_preview = if finished {
            None
        } else {
            let index = self.progress.exercise_index + 1;
            self.definition.steps.get(index).map(|next| StepPreview {
                exercise_index: index,
                name: next.name.clone(),
                sets_total: next.sets_total(),
                reps: next.reps,
                duration_sec: next.duration_sec,
            })
        };

        SessionSnapshot {
            state: self.state,
            workout_id: self.definition.workout_id,
            workout_name: self.definition.name.clone(),
            exercise_index: self.progress.exercise_index,
            exercise_count: self.definition.steps.len(),
            current_step: (!finished).then(|| step.clone()),
            set_number: self.progress.set_number,
            sets_total: step.sets_total(),
            rest_remaining: self.rest.remaining_sec(),
            rest_running: self.rest.is_running(),
            elapsed_sec: self.elapsed_sec(),
            progress_percent: self.progress_percent(),
            next_step_preview,
            quit_pending: self.quit_pending,
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Leave the summary and begin (or continue) executing
    pub fn start(&mut self) -> Result<()> {
        self.ensure("start", &[SessionState::Summary])?;

        let mut elapsed = match self.progress.started_at {
            Some(started_at) => ElapsedTimer::resumed(started_at),
            None => self.elapsed.clone(),
        };
        let started_at = elapsed.start(self.clock.now());

        let mut next = self.progress.clone();
        next.started_at = Some(started_at);
        self.persist(next)?;

        self.elapsed = elapsed;
        self.transition(SessionState::Executing);
        Ok(())
    }

    /// Finish the current set and advance to the next unit of work.
    ///
    /// Returns the state after the advance.
    pub fn complete_set(&mut self) -> Result<SessionState> {
        self.ensure("complete_set", &[SessionState::Executing, SessionState::Resting])?;

        let index = self.progress.exercise_index;
        let step = self.current_step();
        let mut next = self.progress.clone();

        let rest = if next.set_number < step.sets_total() {
            next.set_number += 1;
            step.rest_after()
        } else if let Some(next_step) = self.definition.steps.get(index + 1) {
            next.exercise_index = index + 1;
            next.set_number = 1;
            next_step.rest_after()
        } else {
            self.finish()?;
            return Ok(self.state);
        };

        self.persist(next)?;

        match rest {
            Some(seconds) => {
                self.rest.start(seconds);
                self.transition(SessionState::Resting);
            }
            None => {
                self.cancel_rest();
                self.transition(SessionState::Executing);
            }
        }

        tracing::debug!(
            "Advanced to exercise {} set {}",
            self.progress.exercise_index + 1,
            self.progress.set_number
        );
        Ok(self.state)
    }

    /// Move to the previous or next exercise without completing anything.
    ///
    /// Returns false when already at the first/last exercise (nothing changes).
    pub fn navigate(&mut self, direction: Direction) -> Result<bool> {
        self.ensure("navigate", &[SessionState::Executing, SessionState::Resting])?;

        let index = self.progress.exercise_index;
        let target = match direction {
            Direction::Previous => index.checked_sub(1),
            Direction::Next => Some(index + 1).filter(|&i| i < self.definition.steps.len()),
        };
        let Some(target) = target else {
            tracing::debug!("Navigation {:?} ignored at exercise {}", direction, index + 1);
            return Ok(false);
        };

        let mut next = self.progress.clone();
        next.exercise_index = target;
        next.set_number = 1;
        self.persist(next)?;

        self.cancel_rest();
        let destination_rest = self.definition.steps[target].rest_after();
        match (self.options.navigation_rest, destination_rest) {
            (NavigationRest::StartPaused, Some(seconds)) => {
                self.rest.start_paused(seconds);
                self.transition(SessionState::Resting);
            }
            _ => self.transition(SessionState::Executing),
        }

        Ok(true)
    }

    /// Pause or resume the rest countdown
    pub fn toggle_rest(&mut self) -> Result<()> {
        self.ensure("toggle_rest", &[SessionState::Executing, SessionState::Resting])?;
        self.rest.toggle();
        Ok(())
    }

    /// Add `seconds` to the rest countdown, arming it if inactive
    pub fn extend_rest(&mut self, seconds: u32) -> Result<()> {
        self.ensure("extend_rest", &[SessionState::Executing, SessionState::Resting])?;
        self.rest.extend(seconds);
        Ok(())
    }

    /// Drop the rest countdown and return to execution
    pub fn reset_rest(&mut self) -> Result<()> {
        self.ensure("reset_rest", &[SessionState::Executing, SessionState::Resting])?;
        self.cancel_rest();
        self.transition(SessionState::Executing);
        Ok(())
    }

    /// Go back to the overview without losing the position
    pub fn review_summary(&mut self) -> Result<()> {
        self.ensure("review_summary", &[SessionState::Executing, SessionState::Resting])?;
        self.cancel_rest();
        self.transition(SessionState::Summary);
        Ok(())
    }

    /// First step of quitting. Nothing is cleared until `confirm_quit`.
    pub fn request_quit(&mut self) -> Result<QuitRequest> {
        if self.state == SessionState::Closed {
            return Err(self.invalid("request_quit"));
        }
        if self.state == SessionState::Done {
            self.store.clear()?;
            self.transition(SessionState::Closed);
            return Ok(QuitRequest::Closed);
        }
        self.quit_pending = true;
        Ok(QuitRequest::ConfirmationRequired)
    }

    pub fn cancel_quit(&mut self) -> Result<()> {
        if !self.quit_pending {
            return Err(self.invalid("cancel_quit"));
        }
        self.quit_pending = false;
        Ok(())
    }

    /// Abandon the session: clear stored progress and stop all timers
    pub fn confirm_quit(&mut self) -> Result<()> {
        if !self.quit_pending {
            return Err(self.invalid("confirm_quit"));
        }
        self.store.clear()?;
        self.quit_pending = false;
        self.cancel_rest();
        self.transition(SessionState::Closed);
        tracing::info!("Quit workout {}", self.definition.workout_id);
        Ok(())
    }

    /// One-second host tick. Returns true when the rest countdown just reached zero.
    pub fn tick(&mut self) -> bool {
        if matches!(self.state, SessionState::Closed | SessionState::Done) {
            return false;
        }
        let finished = self.rest.tick();
        if finished {
            tracing::debug!("Rest finished at exercise {}", self.progress.exercise_index + 1);
        }
        finished
    }

    pub fn on_visibility(&mut self, visibility: Visibility) {
        self.wake_lock.on_visibility(visibility);
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn invalid(&self, command: &'static str) -> Error {
        let state = if self.quit_pending {
            format!("{} (quit pending)", self.state)
        } else {
            self.state.to_string()
        };
        tracing::error!("Rejected command '{}' in state {}", command, state);
        Error::InvalidCommand { command, state }
    }

    fn ensure(&self, command: &'static str, allowed: &[SessionState]) -> Result<()> {
        if self.quit_pending || !allowed.contains(&self.state) {
            return Err(self.invalid(command));
        }
        Ok(())
    }

    fn cancel_rest(&mut self) {
        if self.rest.is_active() {
            tracing::debug!(
                "Rest window cancelled at exercise {}",
                self.progress.exercise_index + 1
            );
        }
        self.rest.reset();
    }

    fn persist(&mut self, next: SessionProgress) -> Result<()> {
        self.store.save(&next)?;
        self.progress = next;
        Ok(())
    }

    fn transition(&mut self, state: SessionState) {
        if self.state != state {
            tracing::debug!("Session state {} -> {}", self.state, state);
        }
        self.state = state;
        self.wake_lock.sync(state.is_active());
    }

    fn finish(&mut self) -> Result<()> {
        self.store.clear()?;

        let now = self.clock.now();
        let record = CompletedSession {
            id: Uuid::new_v4(),
            workout_id: self.definition.workout_id,
            workout_name: self.definition.name.clone(),
            started_at: self.elapsed.started_at().unwrap_or(now),
            completed_at: now,
            duration_seconds: self.elapsed.elapsed_sec(now),
            sets_completed: self.definition.total_set_units(),
        };

        if let Some(sink) = self.history.as_mut() {
            if let Err(e) = sink.append(&record) {
                tracing::error!("Failed to record completed session {}: {}", record.id, e);
            }
        }

        self.progress.completed = true;
        self.cancel_rest();
        self.transition(SessionState::Done);

        tracing::info!(
            "Completed workout {} in {} seconds",
            self.definition.workout_id,
            record.duration_seconds
        );
        Ok(())
    }
}
