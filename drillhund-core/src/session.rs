//! ## drillhund-core::session
//! **Drill session state machine**
//!
//! Three states: `InProgress` (initial) and the two terminal outcomes `Win`
//! and `Lose`. Transitions happen only on an explicit status signal from an
//! update; once a terminal state is reached the machine absorbs every further
//! signal until the whole session is reset.

use serde::Serialize;
use tracing::debug;

use crate::events::StatusSignal;

pub const DEFAULT_WIN_MESSAGE: &str = "Well done. You contained the incident.";
pub const DEFAULT_LOSE_MESSAGE: &str = "The drill is over. Try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    InProgress,
    Win,
    Lose,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Win | SessionStatus::Lose)
    }
}

/// What a status signal did to the machine. `Finished` tells the caller to
/// cancel all pending deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Unchanged,
    Continued,
    Finished(SessionStatus),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    status: SessionStatus,
    message: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Back to `InProgress` with no message. Only a full session reset (new
    /// snapshot or teardown) may leave a terminal state.
    pub fn reset(&mut self) {
        self.status = SessionStatus::InProgress;
        self.message = None;
    }

    /// Applies one per-update status signal. An absent signal changes
    /// nothing; signals arriving after win/lose are dropped.
    pub fn apply(&mut self, signal: Option<StatusSignal>, message: Option<&str>) -> SessionOutcome {
        let Some(signal) = signal else {
            return SessionOutcome::Unchanged;
        };

        if self.status.is_terminal() {
            debug!(?signal, status = ?self.status, "ignoring status signal in terminal state");
            return SessionOutcome::Unchanged;
        }

        match signal {
            StatusSignal::Continue => {
                self.message = message.map(str::to_string);
                SessionOutcome::Continued
            }
            StatusSignal::Win => {
                self.status = SessionStatus::Win;
                self.message = Some(message.unwrap_or(DEFAULT_WIN_MESSAGE).to_string());
                SessionOutcome::Finished(SessionStatus::Win)
            }
            StatusSignal::Lose => {
                self.status = SessionStatus::Lose;
                self.message = Some(message.unwrap_or(DEFAULT_LOSE_MESSAGE).to_string());
                SessionOutcome::Finished(SessionStatus::Lose)
            }
        }
    }
}
