#![forbid(unsafe_code)]

//! Core domain model and session engine for the workout tracker.
//!
//! This crate provides:
//! - Domain types (workouts, exercise steps, session progress)
//! - Catalog management (session definition source)
//! - Interactive session engine (state machine, rest and elapsed timers)
//! - Wake-lock coordination
//! - Persistence (resumable progress slot, completion WAL, CSV rollup)

pub mod types;
pub mod error;
pub mod clock;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod store;
pub mod rest_timer;
pub mod elapsed;
pub mod wake_lock;
pub mod display;
pub mod wal;
pub mod csv_rollup;
pub mod history;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use clock::Clock;
pub use catalog::{build_default_catalog, get_default_catalog, DefinitionSource};
pub use config::Config;
pub use store::{FileProgressStore, MemoryProgressStore, ProgressStore};
pub use rest_timer::RestTimer;
pub use elapsed::ElapsedTimer;
pub use wake_lock::{CommandWakeLock, NoopWakeLock, Visibility, WakeLock, WakeLockCoordinator};
pub use wal::{JsonlSink, SessionSink};
pub use history::load_recent_sessions;
pub use engine::{
    Direction, EngineOptions, NavigationRest, QuitRequest, SessionEngine, SessionSnapshot,
    SessionState, StepPreview,
};
