//! Connection lifecycle state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle state of a [`ConnectionManager`](crate::ConnectionManager).
///
/// Only the worker thread advances the state, except for the
/// `Standby -> Waiting` step taken by `start_connection` and the final reset to
/// `Standby` taken by `stop_connection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No worker running.
    Standby,
    /// Worker is searching for the daemon.
    Waiting,
    /// A session was acquired; the run-loop has not been entered yet.
    Connected,
    /// Worker is inside the session's blocking run-loop.
    Running,
    /// `stop_connection` is tearing the worker down.
    Stopping,
    /// Reserved for hosts that render a label while preparing a start.
    /// The manager itself goes straight from `Standby` to `Waiting`.
    Starting,
}

impl ConnectionState {
    /// Stable lowercase name, used for log fields and status output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standby => "standby",
            Self::Waiting => "waiting",
            Self::Connected => "connected",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Starting => "starting",
        }
    }

    /// True for every state except `Standby`.
    pub fn is_active(self) -> bool {
        self != Self::Standby
    }

    /// True while a session exists (`Connected` or `Running`).
    pub fn has_session(self) -> bool {
        matches!(self, Self::Connected | Self::Running)
    }

    /// Label for a connect/disconnect toggle button.
    pub fn toggle_label(self) -> &'static str {
        if self.is_active() {
            "close"
        } else {
            "connect"
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Standby
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a manager, suitable for status output.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub state: ConnectionState,
    /// A session is live.
    pub connected: bool,
    /// The retry loop is looking for the daemon.
    pub searching: bool,
    /// When the current state was entered
    pub since: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_standby() {
        assert_eq!(ConnectionState::default(), ConnectionState::Standby);
        assert!(!ConnectionState::Standby.is_active());
    }

    #[test]
    fn test_toggle_label() {
        assert_eq!(ConnectionState::Standby.toggle_label(), "connect");
        assert_eq!(ConnectionState::Waiting.toggle_label(), "close");
        assert_eq!(ConnectionState::Running.toggle_label(), "close");
    }

    #[test]
    fn test_has_session() {
        assert!(ConnectionState::Connected.has_session());
        assert!(ConnectionState::Running.has_session());
        assert!(!ConnectionState::Waiting.has_session());
        assert!(!ConnectionState::Stopping.has_session());
    }

    #[test]
    fn test_serializes_snake_case() {
        let json = serde_json::to_string(&ConnectionState::Running).unwrap();
        assert_eq!(json, "\"running\"");
        assert_eq!(ConnectionState::Waiting.to_string(), "waiting");
    }
}
