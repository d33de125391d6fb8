//! # Agent Workspace Errors
//!
//! Error taxonomy for the spreadsheet-backed agent workspace.
//!
//! Two layers:
//! - [`RemoteError`]: a failure reported by the remote spreadsheet service,
//!   carrying enough shape (status code, transport code, retry hint) for the
//!   execution wrapper to classify it as transient or terminal.
//! - [`WorkspaceError`]: what callers of the engine see. Every variant exposes
//!   a short remediation hint through [`WorkspaceError::remediation`], kept
//!   separate from the diagnostic `Display` message.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

/// Status codes the remote service uses for conditions that clear up on their
/// own (timeouts, throttling, upstream hiccups).
pub const TRANSIENT_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Transport-level error codes treated as transient.
pub const TRANSIENT_TRANSPORT_CODES: [&str; 8] = [
    "ECONNRESET",
    "ETIMEDOUT",
    "ECONNREFUSED",
    "ECONNABORTED",
    "EPIPE",
    "ENOTFOUND",
    "EAI_AGAIN",
    "ENETUNREACH"
];

static EMBEDDED_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([1-5][0-9]{2})\b").expect("status pattern is valid"));

pub type RemoteResult<T> = Result<T, RemoteError>;

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Failure reported by the remote spreadsheet service or the transport under
/// it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RemoteError {
    #[error("Remote service returned {code} {status}: {message}")]
    Status {
        code: u16,
        status: String,
        message: String,
        retry_after: Option<Duration>
    },

    #[error("Transport failure {code}: {message}")]
    Transport { code: String, message: String },

    #[error("Unexpected response from remote service: {reason}")]
    Decode { reason: String }
}

impl RemoteError {
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            status: String::new(),
            message: message.into(),
            retry_after: None
        }
    }

    pub fn transport(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            code: code.into(),
            message: message.into()
        }
    }

    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into()
        }
    }

    /// Attaches an explicit retry-after hint to a status failure. Other
    /// variants are returned unchanged.
    pub fn with_retry_after(self, hint: Duration) -> Self {
        match self {
            Self::Status {
                code,
                status,
                message,
                ..
            } => Self::Status {
                code,
                status,
                message,
                retry_after: Some(hint)
            },
            other => other
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self.status_code(), Some(401 | 403))
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    pub fn is_bad_request(&self) -> bool {
        self.status_code() == Some(400)
    }

    /// Transient failures are worth another attempt: a transient status, a
    /// known transport code, or a transient status code mentioned in the
    /// message text.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { code, message, .. } => {
                TRANSIENT_STATUS_CODES.contains(code) || mentions_transient_status(message)
            }
            Self::Transport { code, message } => {
                TRANSIENT_TRANSPORT_CODES.contains(&code.as_str())
                    || mentions_transient_status(message)
            }
            Self::Decode { reason } => mentions_transient_status(reason)
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status { retry_after, .. } => *retry_after,
            _ => None
        }
    }
}

fn mentions_transient_status(text: &str) -> bool {
    EMBEDDED_STATUS.captures_iter(text).any(|caps| {
        caps[1]
            .parse::<u16>()
            .is_ok_and(|code| TRANSIENT_STATUS_CODES.contains(&code))
    })
}

/// Errors surfaced by the workspace engine.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Invalid input: {field} reason: {reason}")]
    Validation { field: String, reason: String },

    #[error("Workspace {workspace_id} is not reachable: {reason}")]
    Permission {
        workspace_id: String,
        reason: String
    },

    #[error(
        "Network failure during {operation} after {attempts}/{max_attempts} attempts: {reason}"
    )]
    Network {
        operation: String,
        attempts: u32,
        max_attempts: u32,
        reason: String
    },

    #[error("File store sheet {sheet} is structurally incompatible: {reason}")]
    StructuralIncompatibility {
        sheet: String,
        reason: String,
        choices: Vec<String>
    },

    #[error("Task not found: {step}")]
    TaskNotFound { step: String },

    #[error("Remote service error: {0}")]
    Remote(#[from] RemoteError)
}

impl WorkspaceError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into()
        }
    }

    /// Stable, low-cardinality name of the error kind for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Permission { .. } => "permission",
            Self::Network { .. } => "network",
            Self::StructuralIncompatibility { .. } => "structural_incompatibility",
            Self::TaskNotFound { .. } => "task_not_found",
            Self::Remote(_) => "remote"
        }
    }

    /// Short hint telling the user what to do next.
    pub fn remediation(&self) -> String {
        match self {
            Self::Validation { field, .. } => {
                format!("Correct the '{field}' value and retry the operation")
            }
            Self::Permission { .. } => "Share the spreadsheet with the account the client \
                                        authenticates as, and check the workspace id"
                .to_string(),
            Self::Network { .. } => "Check connectivity to the spreadsheet service and retry; \
                                     raise retry.max_attempts to extend the budget"
                .to_string(),
            Self::StructuralIncompatibility { choices, .. } => {
                format!("Choose one: {}", choices.join("; "))
            }
            Self::TaskNotFound { .. } => {
                "Read the plan to list valid step ids (for example 1.1)".to_string()
            }
            Self::Remote(remote) => match remote.status_code() {
                Some(401 | 403) => "Check the access token and the spreadsheet sharing settings"
                    .to_string(),
                Some(404) => "Check the workspace id and the configured sheet names".to_string(),
                Some(429) => "Wait before retrying; the service is throttling requests".to_string(),
                _ => "Inspect the service message; the request was not retried".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses_are_retryable() {
        for code in TRANSIENT_STATUS_CODES {
            assert!(RemoteError::status(code, "boom").is_retryable(), "{code}");
        }
        assert!(!RemoteError::status(400, "bad range").is_retryable());
        assert!(!RemoteError::status(403, "forbidden").is_retryable());
        assert!(!RemoteError::status(404, "missing").is_retryable());
    }

    #[test]
    fn test_transport_codes() {
        assert!(RemoteError::transport("ECONNRESET", "socket hang up").is_retryable());
        assert!(RemoteError::transport("ETIMEDOUT", "deadline").is_retryable());
        assert!(!RemoteError::transport("EINVAL", "bad argument").is_retryable());
    }

    #[test]
    fn test_embedded_status_in_message() {
        assert!(RemoteError::decode("upstream answered 503 Service Unavailable").is_retryable());
        assert!(RemoteError::status(400, "proxy said 502").is_retryable());
        assert!(!RemoteError::decode("row 1500 out of range").is_retryable());
        assert!(!RemoteError::decode("got 404").is_retryable());
    }

    #[test]
    fn test_retry_after_only_on_status() {
        let err = RemoteError::status(429, "slow down").with_retry_after(Duration::from_secs(7));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));

        let err = RemoteError::transport("ECONNRESET", "reset")
            .with_retry_after(Duration::from_secs(7));
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_remediation_differs_from_message() {
        let errors = vec![
            WorkspaceError::validation("step", "empty"),
            WorkspaceError::Permission {
                workspace_id: "abc".to_string(),
                reason: "403".to_string()
            },
            WorkspaceError::Network {
                operation: "values.get".to_string(),
                attempts: 5,
                max_attempts: 5,
                reason: "reset".to_string()
            },
            WorkspaceError::StructuralIncompatibility {
                sheet: "AGENT_FILES".to_string(),
                reason: "extra columns".to_string(),
                choices: vec!["rename the sheet".to_string(), "clear column M".to_string()]
            },
            WorkspaceError::TaskNotFound {
                step: "9.9".to_string()
            },
            WorkspaceError::Remote(RemoteError::status(404, "not found")),
        ];

        for err in errors {
            let hint = err.remediation();
            assert!(!hint.is_empty());
            assert_ne!(hint, err.to_string());
        }
    }

    #[test]
    fn test_structural_remediation_lists_choices() {
        let err = WorkspaceError::StructuralIncompatibility {
            sheet: "AGENT_FILES".to_string(),
            reason: "extra data".to_string(),
            choices: vec!["rename the sheet".to_string(), "use another sheet".to_string()]
        };
        assert_eq!(
            err.remediation(),
            "Choose one: rename the sheet; use another sheet"
        );
        assert_eq!(err.kind(), "structural_incompatibility");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            WorkspaceError::TaskNotFound {
                step: "2.3".to_string()
            }
            .to_string(),
            "Task not found: 2.3"
        );
        assert_eq!(
            WorkspaceError::validation("file", "must not be empty").to_string(),
            "Invalid input: file reason: must not be empty"
        );
    }
}
