//! # Configuration Validation
//!
//! Provides validation for all configuration structures using the `validator` crate.

use crate::config::WorkspaceConfig;
use validator::Validate;

/// Validate configuration structure.
///
/// # M-CANONICAL-DOCS
///
/// ## Validation Rules
/// ### Service
/// - `base_url`: 1-2048 characters
/// - `timeout_seconds`: 1-300
///
/// ### Sheets
/// - `base_sheet`, `files_sheet`: 1-100 characters, distinct
///
/// ### Retry
/// - `max_attempts`: 1-20
/// - `base_delay_ms`: 1-60000, not above `max_delay_ms`
/// - `jitter_ratio`: 0.0-1.0
///
/// ### Plan
/// - `max_document_chars`: 256-50000
pub fn validate(config: &WorkspaceConfig) -> Result<(), validator::ValidationErrors> {
    config.validate()
}
