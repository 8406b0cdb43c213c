use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use workout_core::catalog::Catalog;
use workout_core::display::{
    exercise_label, format_clock, rounded_percent, set_label, step_parameters,
};
use workout_core::*;

#[cfg(unix)]
use signal_hook::consts::{SIGCONT, SIGTSTP};
#[cfg(unix)]
use signal_hook::iterator::Signals;

#[derive(Parser)]
#[command(name = "workout")]
#[command(about = "Interactive workout session tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available workouts (default)
    List,

    /// Show the steps of a workout
    Show {
        /// Workout id
        id: u32,
    },

    /// Run a workout session, resuming saved progress if any
    Run {
        /// Workout id
        id: u32,

        /// Auto-complete (for testing) - complete every set without prompting
        #[arg(long)]
        auto_complete: bool,
    },

    /// Show saved progress for a workout
    Status {
        /// Workout id
        id: u32,
    },

    /// Discard saved session progress
    Discard,

    /// Show recently completed sessions
    History {
        /// How many days back to look
        #[arg(long, default_value_t = 7)]
        days: i64,
    },

    /// Roll up WAL sessions to CSV
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

fn main() -> Result<()> {
    workout_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Some(Commands::List) | None => cmd_list(&data_dir),
        Some(Commands::Show { id }) => cmd_show(&data_dir, id),
        Some(Commands::Run { id, auto_complete }) => cmd_run(&data_dir, id, auto_complete, &config),
        Some(Commands::Status { id }) => cmd_status(&data_dir, id),
        Some(Commands::Discard) => cmd_discard(&data_dir),
        Some(Commands::History { days }) => cmd_history(&data_dir, days),
        Some(Commands::Rollup { cleanup }) => cmd_rollup(&data_dir, cleanup),
    }
}

fn load_catalog(data_dir: &Path) -> Result<Catalog> {
    let catalog = Catalog::load_or_default(&Config::catalog_path(data_dir))?;
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }
    Ok(catalog)
}

fn cmd_list(data_dir: &Path) -> Result<()> {
    let catalog = load_catalog(data_dir)?;

    for definition in catalog.sorted() {
        println!(
            "{:>3}  {} ({} exercises, {} sets)",
            definition.workout_id,
            definition.name,
            definition.steps.len(),
            definition.total_set_units()
        );
    }

    Ok(())
}

fn cmd_show(data_dir: &Path, id: u32) -> Result<()> {
    let catalog = load_catalog(data_dir)?;
    let definition = catalog.load_definition(WorkoutId(id))?;
    print_overview(&definition);
    Ok(())
}

fn cmd_run(data_dir: &Path, id: u32, auto_complete: bool, config: &Config) -> Result<()> {
    let catalog = load_catalog(data_dir)?;

    let store = FileProgressStore::new(Config::progress_path(data_dir));
    let sink = JsonlSink::new(Config::wal_path(data_dir));
    let wake_lock = if auto_complete {
        WakeLockCoordinator::noop()
    } else {
        build_wake_lock(config)
    };

    let mut engine = SessionEngine::open(&catalog, WorkoutId(id), Box::new(store))?
        .with_options(config.engine_options())
        .with_history(Box::new(sink))
        .with_wake_lock(wake_lock);

    if engine.state() == SessionState::Executing {
        let snapshot = engine.snapshot();
        println!(
            "Resuming at {}, {}",
            exercise_label(snapshot.exercise_index, snapshot.exercise_count),
            set_label(snapshot.set_number, snapshot.sets_total)
        );
    }

    if auto_complete {
        run_auto(&mut engine)
    } else {
        run_interactive(&mut engine, config.session.rest_extend_seconds)
    }
}

fn build_wake_lock(config: &Config) -> WakeLockCoordinator {
    if !config.wake_lock.enabled {
        return WakeLockCoordinator::noop();
    }

    let provider = match &config.wake_lock.command {
        Some(command) => match CommandWakeLock::from_command_line(command) {
            Ok(provider) => provider,
            Err(e) => {
                tracing::warn!("Ignoring wake lock command: {}", e);
                return WakeLockCoordinator::noop();
            }
        },
        None => CommandWakeLock::systemd_inhibit(),
    };

    WakeLockCoordinator::new(Box::new(provider))
}

fn run_auto(engine: &mut SessionEngine) -> Result<()> {
    if engine.state() == SessionState::Summary {
        engine.start()?;
    }

    while engine.state() != SessionState::Done {
        engine.complete_set()?;
    }

    render(engine);
    Ok(())
}

enum Event {
    Tick,
    Input(String),
    Visibility(Visibility),
    InputClosed,
}

fn run_interactive(engine: &mut SessionEngine, extend_seconds: u32) -> Result<()> {
    let (tx, rx) = mpsc::channel();

    let ticker = tx.clone();
    let visibility_tx = tx.clone();
    thread::spawn(move || loop {
        thread::sleep(Duration::from_secs(1));
        if ticker.send(Event::Tick).is_err() {
            break;
        }
    });

    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(Event::Input(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(Event::InputClosed);
    });

    spawn_visibility_watcher(visibility_tx)?;

    render(engine);
    print_keys();

    for event in rx {
        match event {
            Event::Tick => {
                if engine.tick() {
                    println!();
                    println!("  Rest over. Press Enter when the next set is done.");
                } else {
                    print_rest_line(&engine.snapshot())?;
                }
            }
            Event::Input(line) => {
                match handle_input(engine, line.trim(), extend_seconds) {
                    Ok(()) => {}
                    Err(e @ Error::InvalidCommand { .. }) => println!("  {}", e),
                    Err(e) => return Err(e),
                }

                match engine.state() {
                    SessionState::Closed => {
                        println!("Session closed.");
                        break;
                    }
                    SessionState::Done => {
                        render(engine);
                        engine.request_quit()?;
                        break;
                    }
                    _ if engine.is_quit_pending() => {}
                    _ => render(engine),
                }
            }
            Event::Visibility(visibility) => engine.on_visibility(visibility),
            Event::InputClosed => {
                println!("Input closed. Progress is saved.");
                break;
            }
        }
    }

    Ok(())
}

fn handle_input(engine: &mut SessionEngine, input: &str, extend_seconds: u32) -> Result<()> {
    if engine.is_quit_pending() {
        return match input {
            "y" | "yes" => {
                engine.confirm_quit()?;
                println!("✓ Progress discarded");
                Ok(())
            }
            _ => engine.cancel_quit(),
        };
    }

    match input {
        "" if engine.state() == SessionState::Summary => engine.start(),
        "" => engine.complete_set().map(|_| ()),
        "p" => {
            if !engine.navigate(Direction::Previous)? {
                println!("  Already at the first exercise");
            }
            Ok(())
        }
        "n" => {
            if !engine.navigate(Direction::Next)? {
                println!("  Already at the last exercise");
            }
            Ok(())
        }
        "t" => engine.toggle_rest(),
        "+" => engine.extend_rest(extend_seconds),
        "r" => engine.reset_rest(),
        "s" => engine.review_summary(),
        "q" => {
            if engine.request_quit()? == QuitRequest::ConfirmationRequired {
                println!("Quit and discard saved progress? [y/N]");
            }
            Ok(())
        }
        "h" | "?" => {
            print_keys();
            Ok(())
        }
        other => {
            println!("  Unknown key '{}' (h for help)", other);
            Ok(())
        }
    }
}

fn print_keys() {
    println!("─────────────────────────────────────────");
    println!("Enter  start / set done     p / n  previous / next exercise");
    println!("t      pause/resume rest    +      extend rest");
    println!("r      skip rest            s      summary");
    println!("q      quit                 h      help");
}

fn print_overview(definition: &SessionDefinition) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", definition.name);
    println!("╰─────────────────────────────────────────╯");

    if let Some(ref description) = definition.description {
        println!("  {}", description);
    }
    if definition.kind == WorkoutKind::Circuit {
        println!("  Circuit");
    }
    println!();

    for (i, step) in definition.steps.iter().enumerate() {
        let parameters = step_parameters(step);
        if parameters.is_empty() {
            println!("  {}. {}", i + 1, step.name);
        } else {
            println!("  {}. {}: {}", i + 1, step.name, parameters.join(", "));
        }
        if let Some(ref notes) = step.notes {
            println!("     ℹ {}", notes);
        }
    }

    println!();
}

fn render(engine: &SessionEngine) {
    let snapshot = engine.snapshot();

    match snapshot.state {
        SessionState::Summary => {
            print_overview(engine.definition());
            if engine.progress().started_at.is_some() {
                println!(
                    "Paused at {}, {}. Press Enter to continue.",
                    exercise_label(snapshot.exercise_index, snapshot.exercise_count),
                    set_label(snapshot.set_number, snapshot.sets_total)
                );
            } else {
                println!("Press Enter to start.");
            }
        }
        SessionState::Executing | SessionState::Resting => {
            println!();
            println!(
                "{}  │  {}  │  {}  │  {}%  │  {}",
                snapshot.workout_name,
                exercise_label(snapshot.exercise_index, snapshot.exercise_count),
                set_label(snapshot.set_number, snapshot.sets_total),
                rounded_percent(snapshot.progress_percent),
                format_clock(snapshot.elapsed_sec)
            );

            if let Some(ref step) = snapshot.current_step {
                println!("  → {}", step.name);
                let parameters = step_parameters(step);
                if !parameters.is_empty() {
                    println!("    {}", parameters.join(", "));
                }
                if let Some(ref description) = step.description {
                    println!("    {}", description);
                }
            }

            if let Some(remaining) = snapshot.rest_remaining {
                println!("  {}", rest_label(remaining, snapshot.rest_running));
            }

            if let Some(ref next) = snapshot.next_step_preview {
                println!("  Next: {}", next.name);
            }
        }
        SessionState::Done => {
            println!();
            println!(
                "✓ Session complete: {} in {}",
                snapshot.workout_name,
                format_clock(snapshot.elapsed_sec)
            );
        }
        SessionState::Closed => {}
    }
}

fn rest_label(remaining: u32, running: bool) -> String {
    let clock = format_clock(u64::from(remaining));
    if running {
        format!("Rest {}", clock)
    } else {
        format!("Rest {} (paused)", clock)
    }
}

/// Live countdown line; none while paused or while the quit prompt is open
fn rest_status_line(snapshot: &SessionSnapshot) -> Option<String> {
    if snapshot.quit_pending || !snapshot.rest_running {
        return None;
    }
    snapshot
        .rest_remaining
        .map(|remaining| rest_label(remaining, true))
}

fn print_rest_line(snapshot: &SessionSnapshot) -> Result<()> {
    if let Some(line) = rest_status_line(snapshot) {
        print!("\r  {}   ", line);
        io::stdout().flush()?;
    }
    Ok(())
}

/// Terminal suspend (Ctrl-Z) hides the session, `fg` shows it again
#[cfg(unix)]
fn visibility_for_signal(signal: i32) -> Option<Visibility> {
    match signal {
        SIGTSTP => Some(Visibility::Hidden),
        SIGCONT => Some(Visibility::Visible),
        _ => None,
    }
}

#[cfg(unix)]
fn spawn_visibility_watcher(tx: mpsc::Sender<Event>) -> Result<()> {
    let mut signals = Signals::new([SIGTSTP, SIGCONT])?;

    thread::spawn(move || {
        for signal in signals.forever() {
            if let Some(visibility) = visibility_for_signal(signal) {
                if tx.send(Event::Visibility(visibility)).is_err() {
                    break;
                }
            }
            // Handling SIGTSTP replaces the stop, so stop explicitly
            if signal == SIGTSTP {
                if let Err(e) = signal_hook::low_level::emulate_default_handler(SIGTSTP) {
                    tracing::warn!("Failed to suspend: {}", e);
                }
            }
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn spawn_visibility_watcher(_tx: mpsc::Sender<Event>) -> Result<()> {
    Ok(())
}

fn cmd_status(data_dir: &Path, id: u32) -> Result<()> {
    let store = FileProgressStore::new(Config::progress_path(data_dir));

    let Some(progress) = store.load(WorkoutId(id))? else {
        match store.peek() {
            Some(other) => println!(
                "No saved progress for workout {} (saved progress belongs to workout {})",
                id, other.workout_id
            ),
            None => println!("No saved progress"),
        }
        return Ok(());
    };

    let catalog = load_catalog(data_dir)?;
    match catalog.load_definition(WorkoutId(id)) {
        Ok(definition) if progress.fits(&definition) => {
            let step = &definition.steps[progress.exercise_index];
            println!("{}", definition.name);
            println!(
                "  {}, {}: {}",
                exercise_label(progress.exercise_index, definition.steps.len()),
                set_label(progress.set_number, step.sets_total()),
                step.name
            );
        }
        Ok(_) => println!("Saved progress no longer matches workout {}", id),
        Err(e) => println!("Saved progress for unknown workout {}: {}", id, e),
    }

    if let Some(started_at) = progress.started_at {
        println!(
            "  Started {}",
            started_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

fn cmd_discard(data_dir: &Path) -> Result<()> {
    let mut store = FileProgressStore::new(Config::progress_path(data_dir));

    if !store.path().exists() {
        println!("No saved progress");
        return Ok(());
    }

    store.clear()?;
    println!("✓ Discarded saved progress");
    Ok(())
}

fn cmd_history(data_dir: &Path, days: i64) -> Result<()> {
    let sessions = load_recent_sessions(
        &Config::wal_path(data_dir),
        &Config::csv_path(data_dir),
        days,
    )?;

    if sessions.is_empty() {
        println!("No sessions in the last {} days", days);
        return Ok(());
    }

    for session in sessions {
        println!(
            "{}  {}  {}  {} sets",
            session
                .completed_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M"),
            session.workout_name,
            format_clock(session.duration_seconds),
            session.sets_completed
        );
    }

    Ok(())
}

fn cmd_rollup(data_dir: &Path, cleanup: bool) -> Result<()> {
    let wal_dir = Config::wal_dir(data_dir);
    let wal_path = Config::wal_path(data_dir);
    let csv_path = Config::csv_path(data_dir);

    if !wal_path.exists() {
        println!("No WAL file found - nothing to roll up.");
        return Ok(());
    }

    let count = workout_core::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path)?;

    println!("✓ Rolled up {} sessions to CSV", count);
    println!("  CSV: {}", csv_path.display());

    if cleanup {
        let cleaned = workout_core::csv_rollup::cleanup_processed_wals(&wal_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed WAL files", cleaned);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resting_engine() -> SessionEngine {
        let mut engine = SessionEngine::open(
            get_default_catalog(),
            WorkoutId(1),
            Box::new(MemoryProgressStore::new()),
        )
        .unwrap();
        engine.start().unwrap();
        engine.complete_set().unwrap();
        engine
    }

    #[test]
    fn test_rest_line_while_running() {
        let engine = resting_engine();
        assert_eq!(
            rest_status_line(&engine.snapshot()),
            Some("Rest 00:45".to_string())
        );
    }

    #[test]
    fn test_rest_line_hidden_during_quit_prompt() {
        let mut engine = resting_engine();

        engine.request_quit().unwrap();
        assert_eq!(rest_status_line(&engine.snapshot()), None);

        engine.cancel_quit().unwrap();
        assert!(rest_status_line(&engine.snapshot()).is_some());
    }

    #[test]
    fn test_rest_line_hidden_while_paused() {
        let mut engine = resting_engine();
        engine.toggle_rest().unwrap();
        assert_eq!(rest_status_line(&engine.snapshot()), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_suspend_signals_map_to_visibility() {
        assert_eq!(visibility_for_signal(SIGTSTP), Some(Visibility::Hidden));
        assert_eq!(visibility_for_signal(SIGCONT), Some(Visibility::Visible));
        assert_eq!(visibility_for_signal(signal_hook::consts::SIGINT), None);
    }
}
