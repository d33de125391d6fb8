//! # Configuration Precedence
//!
//! Merges configuration from multiple sources with precedence rules.
//!
//! # Precedence Order
//! 1. Environment variables (highest priority)
//! 2. Configuration file
//! 3. Default values (lowest priority)

use crate::config::{PlanConfig, RetryConfig, ServiceConfig, SheetLayoutConfig, WorkspaceConfig};
use crate::file_loader::{ConfigFileError, load_from_file};
use crate::loader::load_from_env;
use std::path::Path;
use validator::Validate;

/// Failure while assembling the effective configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error(transparent)]
    File(#[from] ConfigFileError),

    #[error("Environment error: {0}")]
    Env(String),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors)
}

/// Merge configuration sources with precedence.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Fields in an override that differ from the built-in default replace the
/// base value. String fields are overridden, not concatenated. Every applied
/// override is logged with its source name; secrets are masked.
pub fn merge_configs(
    defaults: WorkspaceConfig,
    file_config: Option<WorkspaceConfig>,
    file_source_name: &str,
    env_config: WorkspaceConfig,
    env_source_name: &str
) -> WorkspaceConfig {
    let mut config = defaults;

    if let Some(file_config) = file_config {
        config = merge_with_logging(config, file_config, file_source_name);
    }
    merge_with_logging(config, env_config, env_source_name)
}

/// Build the effective configuration: defaults, then the optional file, then
/// the environment. The result is validated.
pub fn load_config(path: Option<&Path>) -> Result<WorkspaceConfig, ConfigLoadError> {
    let from_file = path.map(load_from_file).transpose()?;
    let from_env = load_from_env().map_err(|e| ConfigLoadError::Env(e.to_string()))?;

    let config = merge_configs(
        WorkspaceConfig::default(),
        from_file,
        "file",
        from_env,
        "env"
    );
    config.validate()?;
    Ok(config)
}

fn merge_with_logging(
    mut base: WorkspaceConfig,
    override_config: WorkspaceConfig,
    source_name: &str
) -> WorkspaceConfig {
    let mut changes = Vec::new();

    merge_service(&mut base.service, &override_config.service, &mut changes);
    merge_sheets(&mut base.sheets, &override_config.sheets, &mut changes);
    merge_retry(&mut base.retry, &override_config.retry, &mut changes);
    merge_plan(&mut base.plan, &override_config.plan, &mut changes);

    if !changes.is_empty() {
        tracing::info!("Configuration from {}: {:?}", source_name, changes);
    }

    base
}

fn merge_service(base: &mut ServiceConfig, over: &ServiceConfig, changes: &mut Vec<String>) {
    let defaults = ServiceConfig::default();
    if over.base_url != defaults.base_url && over.base_url != base.base_url {
        changes.push(format!("service.base_url = {}", over.base_url));
        base.base_url.clone_from(&over.base_url);
    }
    if over.timeout_seconds != defaults.timeout_seconds
        && over.timeout_seconds != base.timeout_seconds
    {
        changes.push(format!("service.timeout_seconds = {}", over.timeout_seconds));
        base.timeout_seconds = over.timeout_seconds;
    }
    if over.access_token.is_some() && over.access_token != base.access_token {
        changes.push("service.access_token = ***".to_string());
        base.access_token.clone_from(&over.access_token);
    }
}

fn merge_sheets(
    base: &mut SheetLayoutConfig,
    over: &SheetLayoutConfig,
    changes: &mut Vec<String>
) {
    let defaults = SheetLayoutConfig::default();
    if over.base_sheet != defaults.base_sheet && over.base_sheet != base.base_sheet {
        changes.push(format!("sheets.base_sheet = {}", over.base_sheet));
        base.base_sheet.clone_from(&over.base_sheet);
    }
    if over.files_sheet != defaults.files_sheet && over.files_sheet != base.files_sheet {
        changes.push(format!("sheets.files_sheet = {}", over.files_sheet));
        base.files_sheet.clone_from(&over.files_sheet);
    }
}

fn merge_retry(base: &mut RetryConfig, over: &RetryConfig, changes: &mut Vec<String>) {
    let defaults = RetryConfig::default();
    if over.max_attempts != defaults.max_attempts && over.max_attempts != base.max_attempts {
        changes.push(format!("retry.max_attempts = {}", over.max_attempts));
        base.max_attempts = over.max_attempts;
    }
    if over.base_delay_ms != defaults.base_delay_ms && over.base_delay_ms != base.base_delay_ms {
        changes.push(format!("retry.base_delay_ms = {}", over.base_delay_ms));
        base.base_delay_ms = over.base_delay_ms;
    }
    if over.max_delay_ms != defaults.max_delay_ms && over.max_delay_ms != base.max_delay_ms {
        changes.push(format!("retry.max_delay_ms = {}", over.max_delay_ms));
        base.max_delay_ms = over.max_delay_ms;
    }
    if over.jitter_ratio != defaults.jitter_ratio && over.jitter_ratio != base.jitter_ratio {
        changes.push(format!("retry.jitter_ratio = {}", over.jitter_ratio));
        base.jitter_ratio = over.jitter_ratio;
    }
}

fn merge_plan(base: &mut PlanConfig, over: &PlanConfig, changes: &mut Vec<String>) {
    let defaults = PlanConfig::default();
    if over.strict_transitions != defaults.strict_transitions
        && over.strict_transitions != base.strict_transitions
    {
        changes.push(format!(
            "plan.strict_transitions = {}",
            over.strict_transitions
        ));
        base.strict_transitions = over.strict_transitions;
    }
    if over.max_document_chars != defaults.max_document_chars
        && over.max_document_chars != base.max_document_chars
    {
        changes.push(format!(
            "plan.max_document_chars = {}",
            over.max_document_chars
        ));
        base.max_document_chars = over.max_document_chars;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_file() {
        let mut file = WorkspaceConfig::default();
        file.retry.max_attempts = 3;
        file.sheets.files_sheet = "FILES_FROM_FILE".to_string();

        let mut env = WorkspaceConfig::default();
        env.retry.max_attempts = 7;

        let merged = merge_configs(WorkspaceConfig::default(), Some(file), "file", env, "env");
        assert_eq!(merged.retry.max_attempts, 7);
        assert_eq!(merged.sheets.files_sheet, "FILES_FROM_FILE");
    }

    #[test]
    fn test_default_env_does_not_reset_file_values() {
        let mut file = WorkspaceConfig::default();
        file.plan.strict_transitions = true;

        let merged = merge_configs(
            WorkspaceConfig::default(),
            Some(file),
            "file",
            WorkspaceConfig::default(),
            "env"
        );
        assert!(merged.plan.strict_transitions);
    }

    #[test]
    fn test_token_override() {
        let mut env = WorkspaceConfig::default();
        env.service.access_token = Some("tok".to_string());

        let merged = merge_configs(WorkspaceConfig::default(), None, "file", env, "env");
        assert_eq!(merged.service.access_token.as_deref(), Some("tok"));
    }
}
