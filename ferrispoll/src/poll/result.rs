//! Poll outcomes and cycle reports.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use super::plan::CommandKey;
use crate::error::{Error, ErrorKind};
use crate::parse::ParsedRecord;
use crate::session::SessionState;

/// Device-level outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOutcome {
    /// Every command produced output.
    Success,
    /// The session survived but at least one command failed.
    Partial,
    /// The session could not be established or broke mid-poll.
    Failed,
}

/// Per-command status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    /// Output parsed.
    Ok,
    /// Output arrived but nothing could be extracted.
    Degraded,
    /// No output within the settle window.
    Timeout,
    /// Only the echo and prompt came back.
    Empty,
    /// The device reported an error.
    Rejected,
}

impl CommandStatus {
    /// Whether this status makes the device partial.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            CommandStatus::Timeout | CommandStatus::Empty | CommandStatus::Rejected
        )
    }

    /// Error classification, for statuses that have one.
    pub fn error_kind(self) -> Option<ErrorKind> {
        match self {
            CommandStatus::Ok => None,
            CommandStatus::Degraded | CommandStatus::Empty => Some(ErrorKind::ParseError),
            CommandStatus::Timeout => Some(ErrorKind::CommandTimeoutError),
            CommandStatus::Rejected => Some(ErrorKind::ProtocolError),
        }
    }
}

/// Result of one command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    #[serde(flatten)]
    pub key: CommandKey,

    /// Command text as sent.
    pub command: String,

    pub status: CommandStatus,

    pub record: ParsedRecord,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Set when the reading could not be stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink_error: Option<String>,

    pub elapsed_ms: u64,
}

/// Why a device failed.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceFailure {
    pub reason: ErrorKind,

    /// Furthest session state reached.
    pub reached: SessionState,

    pub message: String,
}

/// Outcome of polling one device for one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct PollResult {
    pub device_id: String,
    pub hostname: String,
    pub outcome: DeviceOutcome,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<DeviceFailure>,

    pub commands: Vec<CommandResult>,

    /// Set when closing the session failed; does not change the outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teardown_error: Option<String>,

    pub duration_ms: u64,
}

impl PollResult {
    /// A device that failed before any command ran.
    pub fn failed(
        device_id: impl Into<String>,
        hostname: impl Into<String>,
        reason: ErrorKind,
        reached: SessionState,
        message: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            hostname: hostname.into(),
            outcome: DeviceOutcome::Failed,
            failure: Some(DeviceFailure {
                reason,
                reached,
                message: message.into(),
            }),
            commands: vec![],
            teardown_error: None,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    /// Look up one command's result.
    pub fn command(&self, parameter: &str, interface: Option<&str>) -> Option<&CommandResult> {
        self.commands
            .iter()
            .find(|c| c.key.parameter == parameter && c.key.interface.as_deref() == interface)
    }
}

/// Aggregate of one poll cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,

    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,

    pub results: Vec<PollResult>,

    /// Devices that were still running when the cycle was stopped.
    pub cancelled: usize,
}

fn as_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

impl CycleReport {
    fn count(&self, outcome: DeviceOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(DeviceOutcome::Success)
    }

    pub fn partial(&self) -> usize {
        self.count(DeviceOutcome::Partial)
    }

    pub fn failed(&self) -> usize {
        self.count(DeviceOutcome::Failed)
    }

    /// Result for one device.
    pub fn device(&self, device_id: &str) -> Option<&PollResult> {
        self.results.iter().find(|r| r.device_id == device_id)
    }

    /// `{success, data, error, duration_ms}` document for callers that
    /// trigger a cycle over a request/response boundary.
    pub fn to_document(&self) -> serde_json::Value {
        let failed = self.failed();
        let error = match (failed, self.cancelled) {
            (0, 0) => None,
            (f, 0) => Some(format!("{} of {} devices failed", f, self.results.len())),
            (f, c) => Some(format!(
                "{} devices failed, {} cancelled before completion",
                f, c
            )),
        };

        json!({
            "success": error.is_none(),
            "data": {
                "started_at": self.started_at,
                "summary": {
                    "devices": self.results.len(),
                    "success": self.succeeded(),
                    "partial": self.partial(),
                    "failed": failed,
                    "cancelled": self.cancelled,
                },
                "devices": self.results,
            },
            "error": error,
            "duration_ms": self.duration.as_millis() as u64,
        })
    }
}

/// Document for a cycle that could not run at all.
pub fn error_document(error: &Error, elapsed: Duration) -> serde_json::Value {
    json!({
        "success": false,
        "data": null,
        "error": {
            "kind": error.kind(),
            "message": error.to_string(),
        },
        "duration_ms": elapsed.as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, outcome: DeviceOutcome) -> PollResult {
        PollResult {
            device_id: id.into(),
            hostname: id.into(),
            outcome,
            failure: None,
            commands: vec![],
            teardown_error: None,
            duration_ms: 1,
        }
    }

    #[test]
    fn test_document_shape() {
        let report = CycleReport {
            started_at: Utc::now(),
            duration: Duration::from_millis(1234),
            results: vec![
                result("r1", DeviceOutcome::Success),
                result("r2", DeviceOutcome::Partial),
            ],
            cancelled: 0,
        };

        let doc = report.to_document();
        assert_eq!(doc["success"], true);
        assert_eq!(doc["error"], serde_json::Value::Null);
        assert_eq!(doc["duration_ms"], 1234);
        assert_eq!(doc["data"]["summary"]["partial"], 1);
        assert_eq!(doc["data"]["devices"][1]["outcome"], "partial");
    }

    #[test]
    fn test_document_reports_failures() {
        let failed = PollResult::failed(
            "r3",
            "core-3",
            ErrorKind::AuthenticationError,
            SessionState::Authenticating,
            "Authentication failed for user 'admin'",
            Duration::from_millis(5),
        );
        let report = CycleReport {
            started_at: Utc::now(),
            duration: Duration::from_millis(10),
            results: vec![result("r1", DeviceOutcome::Success), failed],
            cancelled: 0,
        };

        let doc = report.to_document();
        assert_eq!(doc["success"], false);
        assert_eq!(doc["error"], "1 of 2 devices failed");
        let device = &doc["data"]["devices"][1];
        assert_eq!(device["failure"]["reason"], "AuthenticationError");
        assert_eq!(device["failure"]["reached"], "authenticating");
    }

    #[test]
    fn test_error_document() {
        let error: Error = crate::error::ConfigError::UnknownFamily { name: "x".into() }.into();
        let doc = error_document(&error, Duration::from_millis(3));
        assert_eq!(doc["success"], false);
        assert_eq!(doc["error"]["kind"], "ConfigurationError");
    }
}
