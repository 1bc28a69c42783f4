use std::io::Write;
use std::time::Duration;

use tokio::time::Instant;

use crate::models::{FocusNotice, FocusSignal};

/// Advisory shown when the participant tries to leave a running test.
pub const EXIT_ADVISORY: &str =
    "Test hali tugamagan. Chiqsangiz, javoblaringiz saqlanmaydi. Chiqish uchun yana Ctrl+C bosing.";

/// Second exit attempt inside this window counts as a confirmed departure.
const LEAVE_CONFIRM_WINDOW: Duration = Duration::from_secs(5);

const FOCUS_REPORTING_ON: &[u8] = b"\x1b[?1004h";
const FOCUS_REPORTING_OFF: &[u8] = b"\x1b[?1004l";

/// Watches visibility loss and exit attempts while a test is running.
///
/// The monitor only classifies signals. Counting violations stays with the
/// session state machine.
#[derive(Debug)]
pub struct FocusMonitor {
    terminal_reporting: bool,
    armed: bool,
    last_exit_attempt: Option<Instant>,
}

impl FocusMonitor {
    /// Monitor that toggles xterm focus reporting on the controlling terminal.
    pub fn terminal() -> Self {
        Self::new(true)
    }

    /// Monitor without terminal side effects; signals are fed in directly.
    pub fn headless() -> Self {
        Self::new(false)
    }

    fn new(terminal_reporting: bool) -> Self {
        Self {
            terminal_reporting,
            armed: false,
            last_exit_attempt: None,
        }
    }

    pub fn arm(&mut self) {
        if self.armed {
            return;
        }
        self.armed = true;
        self.last_exit_attempt = None;
        self.write_terminal(FOCUS_REPORTING_ON);
        tracing::debug!("Focus monitor armed");
    }

    /// Stops observation. Idempotent.
    pub fn disarm(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        self.last_exit_attempt = None;
        self.write_terminal(FOCUS_REPORTING_OFF);
        tracing::debug!("Focus monitor disarmed");
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn observe(&mut self, signal: FocusSignal) -> Option<FocusNotice> {
        if !self.armed {
            return None;
        }

        match signal {
            FocusSignal::VisibilityLost => Some(FocusNotice::Violation),
            FocusSignal::VisibilityRestored => None,
            FocusSignal::UnloadAttempt => {
                let now = Instant::now();
                let confirmed = self
                    .last_exit_attempt
                    .is_some_and(|previous| now.duration_since(previous) <= LEAVE_CONFIRM_WINDOW);
                self.last_exit_attempt = Some(now);

                if confirmed {
                    Some(FocusNotice::LeaveConfirmed)
                } else {
                    Some(FocusNotice::ExitDeterred {
                        advisory: EXIT_ADVISORY,
                    })
                }
            }
        }
    }

    fn write_terminal(&self, sequence: &[u8]) {
        if !self.terminal_reporting {
            return;
        }
        let mut stdout = std::io::stdout();
        if let Err(e) = stdout.write_all(sequence).and_then(|_| stdout.flush()) {
            tracing::warn!("Failed to toggle terminal focus reporting: {}", e);
        }
    }
}

impl Drop for FocusMonitor {
    fn drop(&mut self) {
        self.disarm();
    }
}
