//! File store self-repair.
//!
//! Runs once per handle: detects the layout, initialises an empty sheet,
//! rewrites drifted labels when that is safe and seeds the guaranteed files.
//! Anything that would overwrite data outside the expected schema is refused.

use super::layout::{Grid, Layout, detect};
use super::model::{AGENTS_FILE, FIELD_COUNT, FIELD_LABELS, PLAN_FILE, VirtualFile};
use super::{encode, ensure_columns, now, write_slot};
use crate::bootstrap::DEFAULT_SYSTEM_CONTEXT;
use crate::handle::AgentWorkspace;
use errors::{WorkspaceError, WorkspaceResult};
use sheets::{ValueInputOption, ValueRange, a1, user_entered_text};
use tracing::{info, warn};

fn transpose(rows: &[Vec<String>]) -> Vec<Vec<String>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    (0..width)
        .map(|c| {
            rows.iter()
                .map(|r| r.get(c).cloned().unwrap_or_default())
                .collect()
        })
        .collect()
}

/// Non-empty cells past the twelfth field of any slot.
fn cells_beyond_schema(grid: &Grid) -> usize {
    grid.lines
        .iter()
        .map(|line| {
            line.iter()
                .skip(FIELD_COUNT)
                .filter(|c| !c.trim().is_empty())
                .count()
        })
        .sum()
}

fn labels_match(grid: &Grid) -> bool {
    FIELD_LABELS
        .iter()
        .enumerate()
        .all(|(i, label)| grid.cell(0, i) == *label)
}

fn incompatible(sheet: &str, layout: Layout, extra: usize) -> WorkspaceError {
    let edge = match layout {
        Layout::Columns => "row 12",
        Layout::Rows => "column L"
    };
    WorkspaceError::StructuralIncompatibility {
        sheet: sheet.to_string(),
        reason: format!(
            "labels do not match the {FIELD_COUNT}-field schema and {extra} non-empty cells lie beyond {edge}"
        ),
        choices: vec![
            format!("rename or move the '{sheet}' sheet so a fresh file store is created"),
            "set sheets.files_sheet to an unused sheet name".to_string(),
            format!("move the data beyond {edge} out of '{sheet}' and attach again"),
        ]
    }
}

async fn seed_content(ws: &AgentWorkspace, name: &str) -> WorkspaceResult<(VirtualFile, String)> {
    let stamp = Some(now());
    let (description, tags, content_cell, content) = if name == PLAN_FILE {
        let plan = ws.plan();
        let content = plan.get_raw().await?.unwrap_or_default();
        (
            "Execution plan",
            "plan",
            format!("={}", plan.body_cell()),
            content
        )
    } else {
        let content = ws
            .get_system_context()
            .await?
            .unwrap_or_else(|| DEFAULT_SYSTEM_CONTEXT.to_string());
        (
            "System context",
            "system",
            user_entered_text(&content),
            content
        )
    };

    let file = VirtualFile {
        created_at: stamp,
        updated_at: stamp,
        ..VirtualFile::new(name, content)
            .with_description(description)
            .with_tags([tags])
    };
    Ok((file, content_cell))
}

pub(crate) async fn ensure_file_store(ws: &AgentWorkspace) -> WorkspaceResult<Layout> {
    let sheet = ws.files_sheet();
    let rows = ws
        .read_range(
            "files.inspect",
            &a1::whole_sheet(sheet),
            sheets::Dimension::Rows
        )
        .await?
        .values;
    let layout = detect(&rows);

    let fresh = rows.iter().all(|r| r.iter().all(|c| c.trim().is_empty()));
    if fresh {
        initialize(ws, layout).await?;
        return Ok(layout);
    }

    let mut grid = Grid::new(match layout {
        Layout::Columns => transpose(&rows),
        Layout::Rows => rows
    });

    if !labels_match(&grid) {
        let extra = cells_beyond_schema(&grid);
        if extra > 0 {
            warn!(sheet, ?layout, extra, "File store layout is incompatible, leaving it untouched");
            return Err(incompatible(sheet, layout, extra));
        }

        let labels: Vec<String> = FIELD_LABELS.iter().map(|l| (*l).to_string()).collect();
        let data = ValueRange::new(layout.slot_range(sheet, 0), layout.major(), vec![labels.clone()]);
        ws.write_range("files.repair", data, ValueInputOption::Raw)
            .await?;
        if let Some(line) = grid.lines.first_mut() {
            *line = labels;
        }
        info!(sheet, ?layout, "Repaired file store labels");
    }

    for name in [AGENTS_FILE, PLAN_FILE] {
        if grid.find(name).is_some() {
            continue;
        }
        let (file, content_cell) = seed_content(ws, name).await?;
        let slot = grid.free_slot();
        write_slot(ws, layout, &mut grid, slot, encode(layout, &file, content_cell)).await?;
        info!(sheet, file = name, slot, "Seeded guaranteed file");
    }

    Ok(layout)
}

/// Labels, `AGENTS.md` and `PLAN.md` in the first three slots, written in
/// one call.
async fn initialize(ws: &AgentWorkspace, layout: Layout) -> WorkspaceResult<()> {
    let sheet = ws.files_sheet();
    ensure_columns(ws, 3).await?;

    let mut lines = vec![FIELD_LABELS.iter().map(|l| user_entered_text(l)).collect::<Vec<_>>()];
    for name in [AGENTS_FILE, PLAN_FILE] {
        let (file, content_cell) = seed_content(ws, name).await?;
        lines.push(encode(layout, &file, content_cell));
    }

    let range = a1::range(
        sheet,
        (0, 0),
        layout.position(lines.len() - 1, FIELD_COUNT - 1)
    );
    ws.write_ranges(
        "files.init",
        vec![ValueRange::new(range, layout.major(), lines)],
        ValueInputOption::UserEntered
    )
    .await?;
    info!(sheet, ?layout, "Initialized file store");
    Ok(())
}
