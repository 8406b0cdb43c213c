//! Screen wake-lock coordination.
//!
//! Holding a wake lock is a convenience: every failure is logged and swallowed,
//! and no engine command ever fails because of it.

use crate::{Error, Result};
use std::process::{Child, Command, Stdio};

/// Host page/process visibility as reported by the rendering surface
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Platform capability that keeps the display awake while held
pub trait WakeLock {
    fn acquire(&mut self) -> Result<()>;
    fn release(&mut self) -> Result<()>;
}

/// Fallback for hosts without the capability
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopWakeLock;

impl WakeLock for NoopWakeLock {
    fn acquire(&mut self) -> Result<()> {
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Wake lock held by keeping an inhibitor process alive.
///
/// The default program is `systemd-inhibit`, which blocks idle and sleep for as
/// long as its child runs.
#[derive(Debug)]
pub struct CommandWakeLock {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
}

impl CommandWakeLock {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            child: None,
        }
    }

    /// `systemd-inhibit --what=idle:sleep --why=... sleep infinity`
    pub fn systemd_inhibit() -> Self {
        Self::new(
            "systemd-inhibit",
            vec![
                "--what=idle:sleep".into(),
                "--who=workout".into(),
                "--why=Workout session in progress".into(),
                "sleep".into(),
                "infinity".into(),
            ],
        )
    }

    /// Build from a command line such as `"systemd-inhibit --what=idle sleep infinity"`
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| Error::Config("wake lock command is empty".into()))?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn is_held(&self) -> bool {
        self.child.is_some()
    }
}

impl WakeLock for CommandWakeLock {
    fn acquire(&mut self) -> Result<()> {
        if let Some(child) = self.child.as_mut() {
            match child.try_wait() {
                Ok(None) => return Ok(()),
                // Inhibitor went away (killed by the host); spawn a fresh one
                _ => self.child = None,
            }
        }

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::WakeLock(format!("failed to spawn {}: {}", self.program, e)))?;

        tracing::debug!("Wake lock inhibitor started (pid {})", child.id());
        self.child = Some(child);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            let pid = child.id();
            if let Err(e) = child.kill() {
                // Already exited is fine
                if e.kind() != std::io::ErrorKind::InvalidInput {
                    return Err(Error::WakeLock(format!("failed to stop inhibitor {}: {}", pid, e)));
                }
            }
            let _ = child.wait();
            tracing::debug!("Wake lock inhibitor stopped (pid {})", pid);
        }
        Ok(())
    }
}

impl Drop for CommandWakeLock {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

/// Tracks whether the lock should be held and reconciles the provider with it
pub struct WakeLockCoordinator {
    provider: Box<dyn WakeLock>,
    /// Lock confirmed held from the host's point of view
    held: bool,
    /// Provider acquired and not yet released; survives a hidden transition
    acquired: bool,
    session_active: bool,
}

impl WakeLockCoordinator {
    pub fn new(provider: Box<dyn WakeLock>) -> Self {
        Self {
            provider,
            held: false,
            acquired: false,
            session_active: false,
        }
    }

    /// Coordinator with the no-op provider
    pub fn noop() -> Self {
        Self::new(Box::new(NoopWakeLock))
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Observe a lifecycle transition: `active` is true while executing or resting
    pub fn sync(&mut self, active: bool) {
        self.session_active = active;
        if active {
            self.acquire();
        } else {
            self.release();
        }
    }

    /// Observe a visibility change from the host.
    ///
    /// Hosts may drop the lock themselves when backgrounded, so a hidden
    /// transition stops counting the lock as held and a visible one re-acquires
    /// it mid-session. The provider is still released when the session ends.
    /// Hosts that can be backgrounded must forward these events.
    pub fn on_visibility(&mut self, visibility: Visibility) {
        match visibility {
            Visibility::Hidden => {
                if self.held {
                    tracing::debug!("Host hidden, assuming wake lock was released");
                }
                self.held = false;
            }
            Visibility::Visible => {
                if self.session_active && !self.held {
                    tracing::info!("Host visible again mid-session, re-acquiring wake lock");
                    self.acquire();
                }
            }
        }
    }

    fn acquire(&mut self) {
        if self.held {
            return;
        }
        match self.provider.acquire() {
            Ok(()) => {
                self.held = true;
                self.acquired = true;
                tracing::info!("Wake lock acquired");
            }
            Err(e) => tracing::warn!("Wake lock unavailable: {}", e),
        }
    }

    fn release(&mut self) {
        self.held = false;
        if !self.acquired {
            return;
        }
        self.acquired = false;
        match self.provider.release() {
            Ok(()) => tracing::info!("Wake lock released"),
            Err(e) => tracing::warn!("Failed to release wake lock: {}", e),
        }
    }
}

impl Drop for WakeLockCoordinator {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Provider that records calls and can be told to fail
    #[derive(Clone, Default)]
    pub struct RecordingWakeLock {
        pub log: Rc<RefCell<Vec<&'static str>>>,
        pub fail_acquire: Rc<RefCell<bool>>,
    }

    impl RecordingWakeLock {
        pub fn calls(&self) -> Vec<&'static str> {
            self.log.borrow().clone()
        }
    }

    impl WakeLock for RecordingWakeLock {
        fn acquire(&mut self) -> Result<()> {
            self.log.borrow_mut().push("acquire");
            if *self.fail_acquire.borrow() {
                return Err(Error::WakeLock("denied".into()));
            }
            Ok(())
        }

        fn release(&mut self) -> Result<()> {
            self.log.borrow_mut().push("release");
            Ok(())
        }
    }
}
