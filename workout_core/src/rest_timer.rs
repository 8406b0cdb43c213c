//! Rest countdown between sets and exercises.
//!
//! The timer is driven by one tick per second from the host. It floors at zero
//! and never changes the engine state on its own.

/// Countdown state for the current rest window
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestTimer {
    remaining_sec: Option<u32>,
    running: bool,
}

impl RestTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a running countdown of `seconds`
    pub fn start(&mut self, seconds: u32) {
        self.remaining_sec = Some(seconds);
        self.running = true;
    }

    /// Arm a countdown of `seconds` without running it
    pub fn start_paused(&mut self, seconds: u32) {
        self.remaining_sec = Some(seconds);
        self.running = false;
    }

    /// Pause or resume. Has no effect while inactive.
    pub fn toggle(&mut self) {
        if self.remaining_sec.is_some() {
            self.running = !self.running;
        }
    }

    /// Add `seconds`, arming the timer at `seconds` if it was inactive
    pub fn extend(&mut self, seconds: u32) {
        self.remaining_sec = Some(match self.remaining_sec {
            Some(remaining) => remaining.saturating_add(seconds),
            None => seconds,
        });
    }

    /// Return to the inactive state
    pub fn reset(&mut self) {
        self.remaining_sec = None;
        self.running = false;
    }

    /// Advance the countdown by one second.
    ///
    /// Returns true only on the tick that brings the countdown to zero.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        match self.remaining_sec {
            Some(remaining) if remaining > 0 => {
                let next = remaining - 1;
                self.remaining_sec = Some(next);
                next == 0
            }
            _ => false,
        }
    }

    pub fn remaining_sec(&self) -> Option<u32> {
        self.remaining_sec
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_active(&self) -> bool {
        self.remaining_sec.is_some()
    }
}
