//! # Configuration System
//!
//! Centralized configuration management for the agent workspace engine.
//!
//! This crate provides:
//! - Configuration structures for the service seam, sheet names, retry budget
//!   and plan rules
//! - Environment variable loading (12-factor app principles)
//! - Configuration file loading (TOML/YAML)
//! - Configuration precedence (env > file > defaults)
//! - Configuration validation

pub mod config;
pub mod file_loader;
pub mod loader;
pub mod precedence;
pub mod validation;

pub use config::{PlanConfig, RetryConfig, ServiceConfig, SheetLayoutConfig, WorkspaceConfig};
pub use file_loader::{ConfigFileError, load_from_file, load_from_toml, load_from_yaml};
pub use loader::load_from_env;
pub use precedence::{ConfigLoadError, load_config, merge_configs};
pub use validation::validate;
