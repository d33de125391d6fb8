//! # Workspace Bootstrapper
//!
//! Makes sure the base sheet, its two markers and the file store exist
//! before any plan or file operation runs. Each marker is checked by reading
//! one cell and comparing it to an exact sentinel; a present marker is never
//! rewritten, so a second attach only reads.

use crate::handle::AgentWorkspace;
use crate::plan::starter_plan;
use errors::{RemoteError, WorkspaceError, WorkspaceResult};
use sheets::{Dimension, ValueInputOption, ValueRange, a1};
use tracing::{debug, info};

pub const SYSTEM_CONTEXT_SENTINEL: &str = "[[AGENT_SYSTEM_CONTEXT]]";
pub const PLAN_SENTINEL: &str = "[[AGENT_PLAN]]";

/// 0-based rows of the marker/body pairs in the base sheet.
pub(crate) const SYSTEM_CONTEXT_ROW: usize = 0;
pub(crate) const PLAN_ROW: usize = 1;

pub const DEFAULT_SYSTEM_CONTEXT: &str = "You are an autonomous agent working in this workspace.\n\
Keep PLAN.md current: mark a task doing before you start it and done when it is finished.\n\
Record blockers and questions for a human as blocked or review tasks.";

struct Marker {
    name: &'static str,
    row: usize,
    sentinel: &'static str
}

const MARKERS: [Marker; 2] = [
    Marker {
        name: "system_context",
        row: SYSTEM_CONTEXT_ROW,
        sentinel: SYSTEM_CONTEXT_SENTINEL
    },
    Marker {
        name: "plan",
        row: PLAN_ROW,
        sentinel: PLAN_SENTINEL
    }
];

fn permission(workspace_id: &str, err: &RemoteError) -> WorkspaceError {
    WorkspaceError::Permission {
        workspace_id: workspace_id.to_string(),
        reason: err.to_string()
    }
}

pub(crate) async fn run(ws: &AgentWorkspace) -> WorkspaceResult<()> {
    let meta = ws.metadata().await.map_err(|err| match err {
        WorkspaceError::Remote(remote) if remote.is_permission_denied() || remote.is_not_found() => {
            permission(ws.workspace_id(), &remote)
        }
        other => other
    })?;

    for title in [ws.base_sheet(), ws.files_sheet()] {
        if meta.sheet(title).is_some() {
            continue;
        }
        let props = ws
            .executor()
            .run("sheet.add", || ws.service().add_sheet(ws.workspace_id(), title))
            .await?;
        ws.remember_sheet(&props.title, props.sheet_id);
        info!(workspace = ws.workspace_id(), sheet = title, "Created sheet");
    }

    for marker in &MARKERS {
        if marker_present(ws, marker).await? {
            debug!(marker = marker.name, "Marker present");
            continue;
        }
        let body = match marker.row {
            SYSTEM_CONTEXT_ROW => DEFAULT_SYSTEM_CONTEXT.to_string(),
            _ => starter_plan()
        };
        let data = ValueRange::new(
            a1::range(ws.base_sheet(), (marker.row, 0), (marker.row, 1)),
            Dimension::Rows,
            vec![vec![marker.sentinel.to_string(), body]]
        );
        ws.write_range("marker.write", data, ValueInputOption::Raw)
            .await?;
        info!(workspace = ws.workspace_id(), marker = marker.name, "Seeded marker");
    }

    ws.layout().await?;
    Ok(())
}

/// A marker is absent when its cell is empty, holds other text, or cannot be
/// read because nothing was ever written there. Permission failures and
/// exhausted transient failures still propagate.
async fn marker_present(ws: &AgentWorkspace, marker: &Marker) -> WorkspaceResult<bool> {
    let cell = a1::cell(ws.base_sheet(), marker.row, 0);
    match ws.read_range("marker.read", &cell, Dimension::Rows).await {
        Ok(values) => Ok(values.first() == Some(marker.sentinel)),
        Err(WorkspaceError::Remote(remote)) if remote.is_permission_denied() => {
            Err(permission(ws.workspace_id(), &remote))
        }
        Err(WorkspaceError::Remote(remote)) if remote.is_bad_request() || remote.is_not_found() => {
            debug!(marker = marker.name, error = %remote, "Marker cell unreadable, treating as absent");
            Ok(false)
        }
        Err(err) => Err(err)
    }
}
