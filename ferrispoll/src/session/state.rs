//! Session lifecycle states.

use std::fmt;

use serde::Serialize;

/// Where an interactive session is in its lifecycle.
///
/// ```text
/// Disconnected ─► Authenticating ─► Ready ⇄ Executing
///                                     │
///                                     ▼
///                                  Draining ─► Closed
///
/// any non-terminal state ─► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No connection yet.
    Disconnected,
    /// Connecting, logging in, opening the shell and bootstrapping the terminal.
    Authenticating,
    /// Idle at the prompt, ready for the next command.
    Ready,
    /// A command has been sent and its output is being collected.
    Executing,
    /// Tearing down the shell and connection.
    Draining,
    /// Torn down.
    Closed,
    /// Unusable after an error.
    Failed,
}

impl SessionState {
    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Authenticating => "authenticating",
            SessionState::Ready => "ready",
            SessionState::Executing => "executing",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
