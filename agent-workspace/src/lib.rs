//! # Agent Workspace
//!
//! Turns a spreadsheet into a workspace an autonomous agent can resume from:
//! a markdown plan whose task status lives in the text, and a store of named
//! markdown files with metadata.
//!
//! ```rust,no_run
//! use agent_workspace::{AgentWorkspace, PhaseSpec, TaskUpdate};
//! use config::WorkspaceConfig;
//! use sheets::HttpSheetsClient;
//! use std::sync::Arc;
//!
//! # async fn run() -> errors::WorkspaceResult<()> {
//! let config = WorkspaceConfig::default();
//! let client = HttpSheetsClient::from_config(&config.service)?;
//! let ws = AgentWorkspace::attach(Arc::new(client), "spreadsheet-id", config).await?;
//!
//! ws.plan()
//!     .create_plan("Importer", "Load the records", &[PhaseSpec::new("Prepare", ["Collect samples"])])
//!     .await?;
//! ws.plan().update_task("1.1", TaskUpdate::doing()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Concurrent writers are not coordinated: the last write to the plan wins.

pub mod bootstrap;
pub mod files;
pub mod handle;
pub mod plan;
pub mod retry;
pub mod telemetry;

pub use bootstrap::{DEFAULT_SYSTEM_CONTEXT, PLAN_SENTINEL, SYSTEM_CONTEXT_SENTINEL};
pub use errors::{WorkspaceError, WorkspaceResult};
pub use files::{FileStatus, FileStore, Layout, VirtualFile};
pub use handle::AgentWorkspace;
pub use plan::{Phase, PhaseSpec, Plan, PlanEngine, PlanProgress, Task, TaskStatus, TaskUpdate};
pub use retry::{Executor, RetryPolicy};
