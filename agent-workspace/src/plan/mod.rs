//! # Plan State Machine
//!
//! One markdown document in the base sheet holds the plan. Task status lives
//! in a single marker character per task line; every mutation parses the
//! current text, changes one line and writes the text back, so all other
//! lines stay byte-identical.

mod model;
mod parse;
mod render;

pub use model::{Phase, PhaseSpec, Plan, PlanProgress, Task, TaskStatus, TaskUpdate};
pub use parse::parse_plan;
pub use render::{render_plan, starter_plan};

use crate::bootstrap::{PLAN_ROW, PLAN_SENTINEL};
use crate::handle::AgentWorkspace;
use chrono::Utc;
use errors::{WorkspaceError, WorkspaceResult};
use sheets::{Dimension, ValueInputOption, ValueRange, a1};
use tracing::{info, warn};

pub(crate) fn single_line(field: &str, value: &str) -> WorkspaceResult<()> {
    if value.trim().is_empty() {
        return Err(WorkspaceError::validation(field, "must not be empty"));
    }
    if value.contains('\n') || value.contains('\r') {
        return Err(WorkspaceError::validation(field, "must be a single line"));
    }
    Ok(())
}

fn optional_single_line(field: &str, value: Option<&str>) -> WorkspaceResult<()> {
    match value {
        Some(text) if text.contains('\n') || text.contains('\r') => {
            Err(WorkspaceError::validation(field, "must be a single line"))
        }
        _ => Ok(())
    }
}

/// A title containing the annotation separator could not be told apart from
/// its blocked reason or review note once annotated.
fn annotatable_title(title: &str) -> WorkspaceResult<()> {
    if title.contains(parse::ANNOTATION_SEPARATOR) {
        return Err(WorkspaceError::validation(
            "step",
            format!(
                "'{}' must not contain '{}'",
                title.trim(),
                parse::ANNOTATION_SEPARATOR
            )
        ));
    }
    Ok(())
}

/// Free text placed inside a section must not open a section or a task.
fn free_text(field: &str, text: &str) -> WorkspaceResult<()> {
    for line in text.lines() {
        if line.trim_start().starts_with('#') || parse::parse_task_line(line).is_some() {
            return Err(WorkspaceError::validation(
                field,
                format!("line '{}' would be read as a heading or task", line.trim())
            ));
        }
    }
    Ok(())
}

/// Plan operations on an attached workspace.
pub struct PlanEngine<'a> {
    ws: &'a AgentWorkspace
}

impl<'a> PlanEngine<'a> {
    pub(crate) fn new(ws: &'a AgentWorkspace) -> Self {
        Self { ws }
    }

    /// A1 address of the cell holding the plan body.
    pub fn body_cell(&self) -> String {
        a1::cell(self.ws.base_sheet(), PLAN_ROW, 1)
    }

    /// Raw plan text, or `None` when the plan marker is absent.
    pub async fn get_raw(&self) -> WorkspaceResult<Option<String>> {
        let range = a1::range(self.ws.base_sheet(), (PLAN_ROW, 0), (PLAN_ROW, 1));
        let values = self
            .ws
            .read_range("plan.read", &range, Dimension::Rows)
            .await?;
        if values.get(0, 0) != PLAN_SENTINEL {
            return Ok(None);
        }
        Ok(Some(values.get(0, 1).to_string()))
    }

    /// Replaces the whole plan text. The marker is rewritten alongside so a
    /// plan written here is always visible to [`PlanEngine::get_raw`].
    pub async fn set_raw(&self, text: &str) -> WorkspaceResult<()> {
        let limit = self.ws.config().plan.max_document_chars;
        let length = text.chars().count();
        if length > limit {
            return Err(WorkspaceError::validation(
                "plan",
                format!("document has {length} characters, the limit is {limit}")
            ));
        }

        let data = ValueRange::new(
            a1::range(self.ws.base_sheet(), (PLAN_ROW, 0), (PLAN_ROW, 1)),
            Dimension::Rows,
            vec![vec![PLAN_SENTINEL.to_string(), text.to_string()]]
        );
        self.ws
            .write_range("plan.write", data, ValueInputOption::Raw)
            .await
    }

    pub async fn get_plan(&self) -> WorkspaceResult<Option<Plan>> {
        Ok(self.get_raw().await?.map(|raw| parse_plan(&raw)))
    }

    /// Replaces the document with a fresh plan. Step ids are numbered from 1
    /// within each phase.
    /// Names and titles are stored trimmed.
    pub async fn create_plan(&self, title: &str, goal: &str, phases: &[PhaseSpec]) -> WorkspaceResult<Plan> {
        single_line("title", title)?;
        free_text("goal", goal)?;
        let mut trimmed = Vec::with_capacity(phases.len());
        for phase in phases {
            single_line("phase", &phase.name)?;
            for step in &phase.steps {
                single_line("step", step)?;
                annotatable_title(step)?;
            }
            trimmed.push(PhaseSpec::new(
                phase.name.trim(),
                phase.steps.iter().map(|s| s.trim())
            ));
        }

        let raw = render_plan(title.trim(), goal.trim(), &trimmed);
        self.set_raw(&raw).await?;
        info!(
            workspace = self.ws.workspace_id(),
            phases = phases.len(),
            "Plan created"
        );
        Ok(parse_plan(&raw))
    }

    /// First todo task in document order. Blocked and review tasks are never
    /// "next".
    pub async fn get_next_task(&self) -> WorkspaceResult<Option<Task>> {
        Ok(self
            .get_plan()
            .await?
            .and_then(|plan| plan.next_task().cloned()))
    }

    pub async fn get_review_tasks(&self) -> WorkspaceResult<Vec<Task>> {
        Ok(self
            .get_plan()
            .await?
            .map(|plan| plan.review_tasks().into_iter().cloned().collect())
            .unwrap_or_default())
    }

    pub async fn get_task(&self, step: &str) -> WorkspaceResult<Option<Task>> {
        Ok(self
            .get_plan()
            .await?
            .and_then(|plan| plan.task(step).cloned()))
    }

    pub async fn progress(&self) -> WorkspaceResult<PlanProgress> {
        Ok(self
            .get_plan()
            .await?
            .map(|plan| plan.progress())
            .unwrap_or_default())
    }

    /// Rewrites the status marker and annotation of the line for `step`.
    ///
    /// Transitions outside the canonical lifecycle are logged, or rejected
    /// when `plan.strict_transitions` is set. Concurrent writers are not
    /// detected; the last write wins.
    pub async fn update_task(&self, step: &str, update: TaskUpdate) -> WorkspaceResult<Task> {
        single_line("step", step)?;
        optional_single_line("reason", update.reason.as_deref())?;
        optional_single_line("note", update.note.as_deref())?;

        let not_found = || WorkspaceError::TaskNotFound {
            step: step.to_string()
        };
        let raw = self.get_raw().await?.ok_or_else(not_found)?;
        let plan = parse_plan(&raw);

        let matches: Vec<&Task> = plan.tasks().filter(|t| t.step == step).collect();
        let current = match matches.as_slice() {
            [] => return Err(not_found()),
            [task] => *task,
            _ => {
                return Err(WorkspaceError::validation(
                    "step",
                    format!("step {step} appears on {} lines", matches.len())
                ));
            }
        };

        if !current.status.can_transition_to(update.status) {
            if self.ws.config().plan.strict_transitions {
                return Err(WorkspaceError::validation(
                    "status",
                    format!(
                        "task {step} cannot move from {} to {}",
                        current.status, update.status
                    )
                ));
            }
            warn!(
                step,
                from = %current.status,
                to = %update.status,
                "Non-canonical task transition"
            );
        }

        let lines = parse::split_lines(&raw);
        let existing = lines
            .get(current.line)
            .and_then(|(line, _)| parse::parse_task_line(line))
            .ok_or_else(not_found)?;
        if matches!(update.status, TaskStatus::Blocked | TaskStatus::Review) {
            annotatable_title(&existing.title)?;
        }

        let completed_on = match update.status {
            TaskStatus::Done => Some(update.completed_on.unwrap_or_else(|| Utc::now().date_naive())),
            _ => None
        };
        let annotation = match update.status {
            TaskStatus::Blocked => update.reason.as_deref(),
            TaskStatus::Review => update.note.as_deref(),
            _ => None
        };

        let line = render::rewrite_task(&existing, update.status, completed_on, annotation);
        let updated = render::replace_line(&raw, current.line, &line);
        if updated != raw {
            self.set_raw(&updated).await?;
        }
        info!(step, status = %update.status, "Task updated");

        parse_plan(&updated)
            .task(step)
            .cloned()
            .ok_or_else(not_found)
    }

    /// Appends `text` to the Notes section, creating the section at the end
    /// of the document when missing. Without a plan, a starter plan is
    /// created first.
    pub async fn append_notes(&self, text: &str) -> WorkspaceResult<()> {
        if text.trim().is_empty() {
            return Err(WorkspaceError::validation("notes", "must not be empty"));
        }
        let raw = match self.get_raw().await? {
            Some(raw) => raw,
            None => starter_plan()
        };
        self.set_raw(&render::append_to_notes(&raw, text)).await
    }
}
