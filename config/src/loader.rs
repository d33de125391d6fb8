//! # Environment Variable Loader
//!
//! Loads configuration from environment variables following 12-factor app
//! principles.
//!
//! # Naming Convention
//! Every variable is prefixed with `AW_` (agent workspace).

use crate::config::{PlanConfig, RetryConfig, ServiceConfig, SheetLayoutConfig, WorkspaceConfig};
use std::env;

/// Load configuration from environment variables.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Environment variables override default values; unset variables keep the
/// default. A variable that is set but cannot be parsed is an error rather
/// than silently ignored.
///
/// ## Environment Variables
/// ### Service
/// - `AW_BASE_URL`: Service endpoint (default: "https://sheets.googleapis.com")
/// - `AW_TIMEOUT_SECONDS`: Request timeout in seconds (default: 30)
/// - `AW_ACCESS_TOKEN`: Bearer token (optional)
///
/// ### Sheets
/// - `AW_BASE_SHEET`: Marker sheet name (default: "AGENT_BASE")
/// - `AW_FILES_SHEET`: File store sheet name (default: "AGENT_FILES")
///
/// ### Retry
/// - `AW_RETRY_MAX_ATTEMPTS` (default: 5)
/// - `AW_RETRY_BASE_DELAY_MS` (default: 500)
/// - `AW_RETRY_MAX_DELAY_MS` (default: 30000)
/// - `AW_RETRY_JITTER_RATIO` (default: 0.1)
///
/// ### Plan
/// - `AW_PLAN_STRICT_TRANSITIONS` (true/false, default: false)
/// - `AW_PLAN_MAX_DOCUMENT_CHARS` (default: 50000)
pub fn load_from_env() -> Result<WorkspaceConfig, Box<dyn std::error::Error>> {
    Ok(WorkspaceConfig {
        service: load_service_from_env()?,
        sheets: load_sheets_from_env(),
        retry: load_retry_from_env()?,
        plan: load_plan_from_env()?
    })
}

fn load_service_from_env() -> Result<ServiceConfig, Box<dyn std::error::Error>> {
    let defaults = ServiceConfig::default();
    Ok(ServiceConfig {
        base_url: env::var("AW_BASE_URL").unwrap_or(defaults.base_url),
        timeout_seconds: parse_env("AW_TIMEOUT_SECONDS")?.unwrap_or(defaults.timeout_seconds),
        access_token: env::var("AW_ACCESS_TOKEN").ok()
    })
}

fn load_sheets_from_env() -> SheetLayoutConfig {
    let defaults = SheetLayoutConfig::default();
    SheetLayoutConfig {
        base_sheet: env::var("AW_BASE_SHEET").unwrap_or(defaults.base_sheet),
        files_sheet: env::var("AW_FILES_SHEET").unwrap_or(defaults.files_sheet)
    }
}

fn load_retry_from_env() -> Result<RetryConfig, Box<dyn std::error::Error>> {
    let defaults = RetryConfig::default();
    Ok(RetryConfig {
        max_attempts: parse_env("AW_RETRY_MAX_ATTEMPTS")?.unwrap_or(defaults.max_attempts),
        base_delay_ms: parse_env("AW_RETRY_BASE_DELAY_MS")?.unwrap_or(defaults.base_delay_ms),
        max_delay_ms: parse_env("AW_RETRY_MAX_DELAY_MS")?.unwrap_or(defaults.max_delay_ms),
        jitter_ratio: parse_env("AW_RETRY_JITTER_RATIO")?.unwrap_or(defaults.jitter_ratio)
    })
}

fn load_plan_from_env() -> Result<PlanConfig, Box<dyn std::error::Error>> {
    let defaults = PlanConfig::default();
    Ok(PlanConfig {
        strict_transitions: parse_env("AW_PLAN_STRICT_TRANSITIONS")?
            .unwrap_or(defaults.strict_transitions),
        max_document_chars: parse_env("AW_PLAN_MAX_DOCUMENT_CHARS")?
            .unwrap_or(defaults.max_document_chars)
    })
}

fn parse_env<T>(key: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static
{
    match env::var(key) {
        Ok(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("{key}: {e}").into()),
        Err(_) => Ok(None)
    }
}
