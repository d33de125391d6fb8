use crate::bootstrap::{self, SYSTEM_CONTEXT_ROW, SYSTEM_CONTEXT_SENTINEL};
use crate::files::{FileStore, Layout};
use crate::plan::PlanEngine;
use crate::retry::{Executor, RetryPolicy};
use config::WorkspaceConfig;
use errors::{WorkspaceError, WorkspaceResult};
use parking_lot::RwLock;
use sheets::{Dimension, SheetsService, SpreadsheetMeta, ValueInputOption, ValueRange, a1};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// An attached workspace.
///
/// Caches the sheet ids and the file-store layout it resolves. The caches are
/// never invalidated: structural changes made by another process become
/// visible only to a newly attached handle.
pub struct AgentWorkspace {
    service: Arc<dyn SheetsService>,
    workspace_id: String,
    config: WorkspaceConfig,
    executor: Executor,
    sheet_ids: RwLock<HashMap<String, i64>>,
    layout: OnceCell<Layout>
}

impl AgentWorkspace {
    /// Attaches to `workspace_id`, creating any missing structure.
    ///
    /// Fails with [`WorkspaceError::Permission`] when the workspace does not
    /// exist or is not shared with the caller, and with
    /// [`WorkspaceError::StructuralIncompatibility`] when the file store
    /// cannot be repaired safely. Attaching to an initialized workspace only
    /// reads.
    pub async fn attach(
        service: Arc<dyn SheetsService>,
        workspace_id: impl Into<String>,
        config: WorkspaceConfig
    ) -> WorkspaceResult<Self> {
        config::validate(&config)
            .map_err(|e| WorkspaceError::validation("config", e.to_string()))?;

        let workspace = Self {
            executor: Executor::new(RetryPolicy::from(&config.retry)),
            service,
            workspace_id: workspace_id.into(),
            config,
            sheet_ids: RwLock::new(HashMap::new()),
            layout: OnceCell::new()
        };
        bootstrap::run(&workspace).await?;
        Ok(workspace)
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn plan(&self) -> PlanEngine<'_> {
        PlanEngine::new(self)
    }

    pub fn files(&self) -> FileStore<'_> {
        FileStore::new(self)
    }

    /// Layout of the file store, detected and repaired on first use.
    pub async fn layout(&self) -> WorkspaceResult<Layout> {
        self.layout
            .get_or_try_init(|| crate::files::repair::ensure_file_store(self))
            .await
            .copied()
    }

    pub async fn get_system_context(&self) -> WorkspaceResult<Option<String>> {
        let range = a1::range(
            self.base_sheet(),
            (SYSTEM_CONTEXT_ROW, 0),
            (SYSTEM_CONTEXT_ROW, 1)
        );
        let values = self
            .read_range("system_context.read", &range, Dimension::Rows)
            .await?;
        if values.get(0, 0) != SYSTEM_CONTEXT_SENTINEL {
            return Ok(None);
        }
        Ok(Some(values.get(0, 1).to_string()))
    }

    pub async fn set_system_context(&self, text: &str) -> WorkspaceResult<()> {
        let data = ValueRange::new(
            a1::range(
                self.base_sheet(),
                (SYSTEM_CONTEXT_ROW, 0),
                (SYSTEM_CONTEXT_ROW, 1)
            ),
            Dimension::Rows,
            vec![vec![SYSTEM_CONTEXT_SENTINEL.to_string(), text.to_string()]]
        );
        self.write_range("system_context.write", data, ValueInputOption::Raw)
            .await
    }

    pub(crate) fn service(&self) -> &dyn SheetsService {
        self.service.as_ref()
    }

    pub(crate) fn executor(&self) -> &Executor {
        &self.executor
    }

    pub(crate) fn base_sheet(&self) -> &str {
        &self.config.sheets.base_sheet
    }

    pub(crate) fn files_sheet(&self) -> &str {
        &self.config.sheets.files_sheet
    }

    pub(crate) async fn metadata(&self) -> WorkspaceResult<SpreadsheetMeta> {
        let meta = self
            .executor
            .run("spreadsheet.get", || {
                self.service.get_spreadsheet(&self.workspace_id)
            })
            .await?;
        self.remember_sheets(&meta);
        Ok(meta)
    }

    pub(crate) fn remember_sheets(&self, meta: &SpreadsheetMeta) {
        let mut ids = self.sheet_ids.write();
        for sheet in &meta.sheets {
            ids.insert(sheet.title.clone(), sheet.sheet_id);
        }
    }

    pub(crate) fn remember_sheet(&self, title: &str, sheet_id: i64) {
        self.sheet_ids.write().insert(title.to_string(), sheet_id);
    }

    /// Numeric id of a sheet, resolved once per handle.
    pub(crate) async fn sheet_id(&self, title: &str) -> WorkspaceResult<i64> {
        if let Some(id) = self.sheet_ids.read().get(title) {
            return Ok(*id);
        }
        self.metadata()
            .await?
            .sheet(title)
            .map(|s| s.sheet_id)
            .ok_or_else(|| WorkspaceError::validation("sheet", format!("sheet {title} does not exist")))
    }

    pub(crate) async fn read_range(
        &self,
        operation: &'static str,
        range: &str,
        major: Dimension
    ) -> WorkspaceResult<ValueRange> {
        self.executor
            .run(operation, || {
                self.service.get_values(&self.workspace_id, range, major)
            })
            .await
    }

    pub(crate) async fn write_range(
        &self,
        operation: &'static str,
        data: ValueRange,
        input: ValueInputOption
    ) -> WorkspaceResult<()> {
        self.executor
            .run(operation, || {
                self.service
                    .update_values(&self.workspace_id, data.clone(), input)
            })
            .await
    }

    pub(crate) async fn write_ranges(
        &self,
        operation: &'static str,
        data: Vec<ValueRange>,
        input: ValueInputOption
    ) -> WorkspaceResult<()> {
        self.executor
            .run(operation, || {
                self.service
                    .batch_update_values(&self.workspace_id, data.clone(), input)
            })
            .await
    }
}
