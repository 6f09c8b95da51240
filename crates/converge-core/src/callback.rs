//! Status callback message shape
//!
//! An external orchestrator reports long-running reconciliation outcomes with these
//! messages. Only the wire shape lives here; delivery is somebody else's job.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reported state of a reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackStatus {
    NotStarted,
    Error,
    Running,
    Success,
    Failed,
}

impl CallbackStatus {
    /// Whether no further updates are expected after this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for CallbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "notstarted",
            Self::Error => "error",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Body of a status callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackMessage {
    pub status: CallbackStatus,
    /// Empty unless the status carries an error
    #[serde(default)]
    pub error: String,
}

impl CallbackMessage {
    pub fn new(status: CallbackStatus) -> Self {
        Self {
            status,
            error: String::new(),
        }
    }

    pub fn with_error(status: CallbackStatus, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }
}

/// Identifiers a callback is keyed by
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackKey {
    pub operation_id: String,
    pub correlation_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_value(CallbackStatus::NotStarted).unwrap(),
            json!("notstarted")
        );
        assert_eq!(CallbackStatus::NotStarted.to_string(), "notstarted");
        assert_eq!(CallbackStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_message_shape() {
        let message = CallbackMessage::with_error(CallbackStatus::Error, "timeout");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"status": "error", "error": "timeout"})
        );

        let parsed: CallbackMessage = serde_json::from_str(r#"{"status":"running"}"#).unwrap();
        assert_eq!(parsed, CallbackMessage::new(CallbackStatus::Running));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(CallbackStatus::Success.is_terminal());
        assert!(CallbackStatus::Failed.is_terminal());
        assert!(!CallbackStatus::Error.is_terminal());
        assert!(!CallbackStatus::Running.is_terminal());
    }
}
