//! # Configuration Structures
//!
//! This module defines the configuration structures for the agent workspace
//! engine.
//!
//! All configuration structures:
//! - Use `serde` for serialization/deserialization
//! - Use `validator` for input validation
//! - Default every field so a partial file or environment is enough

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Top-level configuration for an attached workspace.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Aggregates the remote service connection, the sheet names the engine owns,
/// the retry budget of the execution wrapper and plan editing rules.
///
/// ## Usage
/// ```rust,no_run
/// use config::WorkspaceConfig;
///
/// let config = WorkspaceConfig::default();
/// assert_eq!(config.sheets.files_sheet, "AGENT_FILES");
/// ```
///
/// ## Fields
/// - `service`: Remote spreadsheet service connection
/// - `sheets`: Names of the structural sheets
/// - `retry`: Execution wrapper retry budget
/// - `plan`: Plan state machine settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
pub struct WorkspaceConfig {
    /// Remote spreadsheet service connection
    #[serde(default)]
    #[validate(nested)]
    pub service: ServiceConfig,

    /// Structural sheet names
    #[serde(default)]
    #[validate(nested)]
    pub sheets: SheetLayoutConfig,

    /// Execution wrapper retry budget
    #[serde(default)]
    #[validate(nested)]
    pub retry: RetryConfig,

    /// Plan state machine settings
    #[serde(default)]
    #[validate(nested)]
    pub plan: PlanConfig
}

/// Remote spreadsheet service connection.
///
/// ## Fields
/// - `base_url`: Service endpoint (default: "https://sheets.googleapis.com")
/// - `timeout_seconds`: Per-request timeout (default: 30, range: 1-300)
/// - `access_token`: Bearer token; normally injected from the environment and
///   never written back to files
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    #[validate(length(min = 1, max = 2048))]
    pub base_url: String,

    #[serde(default = "default_timeout_seconds")]
    #[validate(range(min = 1, max = 300))]
    pub timeout_seconds: u64,

    #[serde(default, skip_serializing)]
    pub access_token: Option<String>
}

fn default_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            access_token: None
        }
    }
}

/// Names of the sheets the engine creates and owns inside a workspace.
///
/// ## Fields
/// - `base_sheet`: Holds the system-context and plan markers (default:
///   "AGENT_BASE")
/// - `files_sheet`: Holds the virtual file store (default: "AGENT_FILES")
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[validate(schema(function = "validate_distinct_sheets"))]
pub struct SheetLayoutConfig {
    #[serde(default = "default_base_sheet")]
    #[validate(length(min = 1, max = 100))]
    pub base_sheet: String,

    #[serde(default = "default_files_sheet")]
    #[validate(length(min = 1, max = 100))]
    pub files_sheet: String
}

fn default_base_sheet() -> String {
    "AGENT_BASE".to_string()
}

fn default_files_sheet() -> String {
    "AGENT_FILES".to_string()
}

fn validate_distinct_sheets(value: &SheetLayoutConfig) -> Result<(), validator::ValidationError> {
    if value.base_sheet == value.files_sheet {
        return Err(validator::ValidationError::new(
            "base_sheet and files_sheet must differ"
        ));
    }
    Ok(())
}

impl Default for SheetLayoutConfig {
    fn default() -> Self {
        Self {
            base_sheet: default_base_sheet(),
            files_sheet: default_files_sheet()
        }
    }
}

/// Retry budget of the execution wrapper.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Controls how transient remote failures are retried. The delay before the
/// next attempt is `min(max_delay_ms, base_delay_ms * 2^attempt)` plus up to
/// `jitter_ratio` of that value.
///
/// ## Fields
/// - `max_attempts`: Total attempts including the first (default: 5, range: 1-20)
/// - `base_delay_ms`: First backoff delay (default: 500)
/// - `max_delay_ms`: Backoff cap (default: 30000)
/// - `jitter_ratio`: Random extra delay as a share of the computed delay
///   (default: 0.1, range: 0.0-1.0)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[validate(schema(function = "validate_delay_bounds"))]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    #[validate(range(min = 1, max = 20))]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    #[validate(range(min = 1, max = 60000))]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    #[validate(range(min = 1, max = 600000))]
    pub max_delay_ms: u64,

    #[serde(default = "default_jitter_ratio")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub jitter_ratio: f64
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_jitter_ratio() -> f64 {
    0.1
}

fn validate_delay_bounds(value: &RetryConfig) -> Result<(), validator::ValidationError> {
    if value.max_delay_ms < value.base_delay_ms {
        return Err(validator::ValidationError::new(
            "max_delay_ms must be at least base_delay_ms"
        ));
    }
    Ok(())
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ratio: default_jitter_ratio()
        }
    }
}

/// Plan state machine settings.
///
/// ## Fields
/// - `strict_transitions`: Reject status changes outside the canonical
///   lifecycle instead of only logging them (default: false)
/// - `max_document_chars`: Largest plan body the engine will write; the
///   service stores the plan in a single cell (default: 50000)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct PlanConfig {
    #[serde(default)]
    pub strict_transitions: bool,

    #[serde(default = "default_max_document_chars")]
    #[validate(range(min = 256, max = 50000))]
    pub max_document_chars: usize
}

fn default_max_document_chars() -> usize {
    50000
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            strict_transitions: false,
            max_document_chars: default_max_document_chars()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WorkspaceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sheets.base_sheet, "AGENT_BASE");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.plan.max_document_chars, 50000);
    }

    #[test]
    fn test_retry_delay_bounds() {
        let mut config = WorkspaceConfig::default();
        config.retry.base_delay_ms = 5000;
        config.retry.max_delay_ms = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_jitter_ratio_range() {
        let mut config = WorkspaceConfig::default();
        config.retry.jitter_ratio = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sheet_names_must_differ() {
        let mut config = WorkspaceConfig::default();
        config.sheets.files_sheet = config.sheets.base_sheet.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_access_token_not_serialized() {
        let mut config = WorkspaceConfig::default();
        config.service.access_token = Some("secret".to_string());
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("secret"));
    }
}
