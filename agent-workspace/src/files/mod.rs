//! # Virtual File Store
//!
//! Named markdown documents with twelve metadata fields, stored one per
//! column (or, in legacy workspaces, one per row) of the file store sheet.
//! `PLAN.md` keeps a metadata slot like any other file but its content always
//! comes from the plan engine.

mod layout;
mod model;
pub(crate) mod repair;

pub use layout::Layout;
pub use model::{
    AGENTS_FILE, FIELD_COUNT, FIELD_LABELS, FileStatus, PLAN_FILE, RESERVED_FILES, VirtualFile,
    content_hash, context_length, is_reserved,
};

use crate::handle::AgentWorkspace;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use errors::{WorkspaceError, WorkspaceResult};
use layout::Grid;
use model::{field, split_list, validate_name};
use sheets::{Dimension, ValueInputOption, ValueRange, a1, user_entered_text};
use tracing::{debug, info, warn};

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Cells of one slot in field order. `content_cell` is written as given.
pub(crate) fn encode(layout: Layout, file: &VirtualFile, content_cell: String) -> Vec<String> {
    let mut cells = vec![String::new(); FIELD_COUNT];
    cells[field::FILE] = user_entered_text(&file.file);
    cells[field::DESCRIPTION] = user_entered_text(&file.description);
    cells[field::TAGS] = user_entered_text(&file.tags.join(","));
    cells[field::PATH] = user_entered_text(&file.path.clone().unwrap_or_else(|| file.default_path()));
    cells[field::CREATED_AT] = user_entered_text(&timestamp(file.created_at));
    cells[field::UPDATED_AT] = user_entered_text(&timestamp(file.updated_at));
    cells[field::STATUS] = file.status.unwrap_or_default().as_str().to_string();
    cells[field::DEPENDENCIES] = user_entered_text(&file.dependencies.join(","));
    cells[field::CONTEXT_LENGTH] = layout.length_formula();
    cells[field::MAX_CONTEXT] = file.max_context.map(|m| m.to_string()).unwrap_or_default();
    cells[field::CONTENT_HASH] = layout.hash_formula();
    cells[field::CONTENT] = content_cell;
    cells
}

/// Builds a file from its slot. Derived fields are recomputed from the
/// content rather than taken from the formula cells.
fn decode(grid: &Grid, slot: usize) -> VirtualFile {
    let cell = |index| grid.cell(slot, index);
    let content = cell(field::CONTENT).to_string();
    let name = cell(field::FILE).to_string();

    let status = match cell(field::STATUS).trim() {
        "" => FileStatus::Active,
        text => text.parse().unwrap_or_else(|_| {
            debug!(file = %name, status = text, "Unknown file status, reading as active");
            FileStatus::Active
        })
    };
    let path = match cell(field::PATH).trim() {
        "" => format!("/{name}"),
        text => text.to_string()
    };

    VirtualFile {
        description: cell(field::DESCRIPTION).to_string(),
        tags: split_list(cell(field::TAGS)),
        path: Some(path),
        created_at: parse_timestamp(cell(field::CREATED_AT)),
        updated_at: parse_timestamp(cell(field::UPDATED_AT)),
        status: Some(status),
        dependencies: split_list(cell(field::DEPENDENCIES)),
        context_length: context_length(&content),
        max_context: cell(field::MAX_CONTEXT).trim().parse().ok(),
        content_hash: content_hash(&content),
        content,
        file: name
    }
}

fn validate_list(field: &str, items: &[String]) -> WorkspaceResult<()> {
    for item in items {
        if item.trim().is_empty() || item.contains(',') || item.contains('\n') {
            return Err(WorkspaceError::validation(
                field,
                format!("'{item}' must be non-empty, without commas or line breaks")
            ));
        }
    }
    Ok(())
}

/// Reads the whole file store sheet in layout-major order.
pub(crate) async fn read_grid(ws: &AgentWorkspace, layout: Layout) -> WorkspaceResult<Grid> {
    let range = a1::whole_sheet(ws.files_sheet());
    let values = ws
        .read_range("files.read", &range, layout.major())
        .await?;
    Ok(Grid::new(values.values))
}

/// Writes all fields of `slot` in one batched update, growing the grid
/// first when the slot lies past its edge. `grid` is updated to match.
pub(crate) async fn write_slot(
    ws: &AgentWorkspace,
    layout: Layout,
    grid: &mut Grid,
    slot: usize,
    cells: Vec<String>
) -> WorkspaceResult<()> {
    let sheet = ws.files_sheet();
    let is_new = slot >= grid.lines.len();

    match layout {
        Layout::Rows if is_new => {
            let range = a1::cell(sheet, 0, 0);
            let rows = vec![cells.clone()];
            ws.executor()
                .run("files.append", || {
                    ws.service().append_values(
                        ws.workspace_id(),
                        &range,
                        rows.clone(),
                        ValueInputOption::UserEntered
                    )
                })
                .await?;
        }
        _ => {
            if layout == Layout::Columns && is_new {
                ensure_columns(ws, slot + 1).await?;
            }
            let data = ValueRange::new(
                layout.slot_range(sheet, slot),
                layout.major(),
                vec![cells.clone()]
            );
            ws.write_ranges("files.write", vec![data], ValueInputOption::UserEntered)
                .await?;
        }
    }

    if grid.lines.len() <= slot {
        grid.lines.resize_with(slot + 1, Vec::new);
    }
    grid.lines[slot] = cells;
    Ok(())
}

/// Grows the file store sheet to at least `columns` columns.
pub(crate) async fn ensure_columns(ws: &AgentWorkspace, columns: usize) -> WorkspaceResult<()> {
    let sheet = ws.files_sheet();
    let meta = ws.metadata().await?;
    let Some(props) = meta.sheet(sheet) else {
        return Err(WorkspaceError::validation(
            "sheet",
            format!("sheet {sheet} does not exist")
        ));
    };
    if props.column_count >= columns {
        return Ok(());
    }

    let missing = columns - props.column_count;
    let sheet_id = props.sheet_id;
    ws.executor()
        .run("files.grow", || {
            ws.service()
                .append_dimension(ws.workspace_id(), sheet_id, Dimension::Columns, missing)
        })
        .await?;
    debug!(sheet, added = missing, "Grew file store grid");
    Ok(())
}

/// File operations on an attached workspace.
pub struct FileStore<'a> {
    ws: &'a AgentWorkspace
}

impl<'a> FileStore<'a> {
    pub(crate) fn new(ws: &'a AgentWorkspace) -> Self {
        Self { ws }
    }

    fn plan_formula(&self) -> String {
        format!("={}", self.ws.plan().body_cell())
    }

    /// All files in slot order. `PLAN.md` carries the current plan text.
    pub async fn list_files(&self) -> WorkspaceResult<Vec<VirtualFile>> {
        let layout = self.ws.layout().await?;
        let grid = read_grid(self.ws, layout).await?;

        let mut files = Vec::new();
        for (slot, name) in grid.file_slots() {
            let mut file = decode(&grid, slot);
            if name == PLAN_FILE {
                self.with_plan_content(&mut file).await?;
            }
            files.push(file);
        }
        Ok(files)
    }

    pub async fn read_file(&self, name: &str) -> WorkspaceResult<Option<VirtualFile>> {
        if name.trim().is_empty() {
            return Ok(None);
        }
        let layout = self.ws.layout().await?;
        let grid = read_grid(self.ws, layout).await?;
        let slot = grid.find(name);

        if name == PLAN_FILE {
            let Some(raw) = self.ws.plan().get_raw().await? else {
                return Ok(slot.map(|slot| decode(&grid, slot)).map(|mut file| {
                    file.content.clear();
                    file.context_length = 0;
                    file.content_hash.clear();
                    file
                }));
            };
            let mut file = slot
                .map(|slot| decode(&grid, slot))
                .unwrap_or_else(|| VirtualFile::new(PLAN_FILE, ""));
            set_content(&mut file, raw);
            return Ok(Some(file));
        }

        Ok(slot.map(|slot| decode(&grid, slot)))
    }

    pub async fn file_exists(&self, name: &str) -> WorkspaceResult<bool> {
        if name == PLAN_FILE && self.ws.plan().get_raw().await?.is_some() {
            return Ok(true);
        }
        let layout = self.ws.layout().await?;
        Ok(read_grid(self.ws, layout).await?.find(name).is_some())
    }

    /// Creates or updates a file and returns it as stored.
    ///
    /// The creation timestamp of an existing file is kept; `updated_at` is
    /// set to now and never precedes it. Writing `PLAN.md` replaces the plan
    /// text through the plan engine.
    pub async fn write_file(&self, file: VirtualFile) -> WorkspaceResult<VirtualFile> {
        validate_name(&file.file)?;
        validate_list("tags", &file.tags)?;
        validate_list("dependencies", &file.dependencies)?;
        if let Some(path) = &file.path {
            if path.contains('\n') {
                return Err(WorkspaceError::validation("path", "must be a single line"));
            }
        }
        if file.exceeds_max_context() {
            warn!(
                file = %file.file,
                length = context_length(&file.content),
                max_context = file.max_context,
                "File content exceeds its max_context"
            );
        }

        let is_plan = file.file == PLAN_FILE;
        if is_plan {
            self.ws.plan().set_raw(&file.content).await?;
        }

        let layout = self.ws.layout().await?;
        let mut grid = read_grid(self.ws, layout).await?;
        let existing = grid.find(&file.file);

        let created_at = existing
            .and_then(|slot| parse_timestamp(grid.cell(slot, field::CREATED_AT)))
            .or(file.created_at)
            .unwrap_or_else(now);
        let stored = VirtualFile {
            path: Some(file.path.clone().unwrap_or_else(|| file.default_path())),
            status: Some(file.status.unwrap_or_default()),
            created_at: Some(created_at),
            updated_at: Some(now().max(created_at)),
            context_length: context_length(&file.content),
            content_hash: content_hash(&file.content),
            ..file
        };

        let content_cell = if is_plan {
            self.plan_formula()
        } else {
            user_entered_text(&stored.content)
        };
        let slot = existing.unwrap_or_else(|| grid.free_slot());
        write_slot(
            self.ws,
            layout,
            &mut grid,
            slot,
            encode(layout, &stored, content_cell)
        )
        .await?;

        info!(
            file = %stored.file,
            slot,
            created = existing.is_none(),
            "File written"
        );
        Ok(stored)
    }

    /// Removes the row or column holding `name`. Returns whether a file was
    /// removed. Reserved files are refused before any remote call.
    pub async fn delete_file(&self, name: &str) -> WorkspaceResult<bool> {
        if is_reserved(name) {
            return Err(WorkspaceError::validation(
                "file",
                format!("{name} is reserved and cannot be deleted")
            ));
        }
        validate_name(name)?;

        let layout = self.ws.layout().await?;
        let grid = read_grid(self.ws, layout).await?;
        let Some(slot) = grid.find(name) else {
            return Ok(false);
        };

        let sheet_id = self.ws.sheet_id(self.ws.files_sheet()).await?;
        self.ws
            .executor()
            .run("files.delete", || {
                self.ws.service().delete_dimension(
                    self.ws.workspace_id(),
                    sheet_id,
                    layout.major(),
                    slot,
                    slot + 1
                )
            })
            .await?;
        info!(file = name, slot, "File deleted");
        Ok(true)
    }

    async fn with_plan_content(&self, file: &mut VirtualFile) -> WorkspaceResult<()> {
        let raw = self.ws.plan().get_raw().await?.unwrap_or_default();
        set_content(file, raw);
        Ok(())
    }
}

fn set_content(file: &mut VirtualFile, content: String) {
    file.context_length = context_length(&content);
    file.content_hash = content_hash(&content);
    file.content = content;
}
