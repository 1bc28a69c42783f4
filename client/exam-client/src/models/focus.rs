use serde::{Deserialize, Serialize};

/// Raw observation coming from the terminal or the interrupt handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusSignal {
    VisibilityLost,
    VisibilityRestored,
    UnloadAttempt,
}

/// What the focus monitor wants the user to see after a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusNotice {
    /// Focus was lost while armed; counts as one violation.
    Violation,
    /// First exit attempt; the advisory is shown and the session goes on.
    ExitDeterred { advisory: &'static str },
    /// Repeated exit attempt inside the confirmation window.
    LeaveConfirmed,
}
