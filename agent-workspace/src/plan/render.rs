//! Plan rendering and line-preserving rewrites.

use super::model::{PhaseSpec, TaskStatus};
use super::parse::{ANNOTATION_SEPARATOR, TaskLine, notes_heading, split_lines};
use chrono::NaiveDate;

pub const DEFAULT_PLAN_TITLE: &str = "Untitled";

pub fn render_plan(title: &str, goal: &str, phases: &[PhaseSpec]) -> String {
    let mut out = format!("# Plan: {title}\n\n## Goal\n");
    if !goal.trim().is_empty() {
        out.push_str(goal.trim_end());
        out.push('\n');
    }
    out.push_str("\n## Analysis\n\n## Open Questions\n");

    for (p, phase) in phases.iter().enumerate() {
        out.push_str(&format!("\n## Phase {}: {}\n", p + 1, phase.name));
        for (t, step) in phase.steps.iter().enumerate() {
            out.push_str(&format!(
                "- [{}] {}.{} {}\n",
                TaskStatus::Todo.marker(),
                p + 1,
                t + 1,
                step
            ));
        }
    }

    out.push_str("\n## Notes\n");
    out
}

/// Starter document written when a workspace has no plan yet.
pub fn starter_plan() -> String {
    render_plan(
        DEFAULT_PLAN_TITLE,
        "Describe what this agent should achieve.",
        &[PhaseSpec::new("Getting started", ["Read AGENTS.md"])]
    )
}

/// Renders a task line. `annotation` is the blocked reason or review note;
/// it is dropped for other statuses.
pub(crate) fn render_task_line(
    indent: &str,
    bullet: &str,
    status: TaskStatus,
    step: &str,
    title: &str,
    completed_on: Option<NaiveDate>,
    annotation: Option<&str>
) -> String {
    let mut line = format!("{indent}{bullet} [{}] {step}", status.marker());
    if !title.is_empty() {
        line.push(' ');
        line.push_str(title);
    }
    match status {
        TaskStatus::Done => {
            if let Some(date) = completed_on {
                line.push_str(&format!(" ({})", date.format("%Y-%m-%d")));
            }
        }
        TaskStatus::Blocked | TaskStatus::Review => {
            if let Some(text) = annotation.filter(|t| !t.is_empty()) {
                line.push_str(ANNOTATION_SEPARATOR);
                line.push_str(text);
            }
        }
        TaskStatus::Todo | TaskStatus::Doing => {}
    }
    line
}

pub(crate) fn rewrite_task(
    existing: &TaskLine<'_>,
    status: TaskStatus,
    completed_on: Option<NaiveDate>,
    annotation: Option<&str>
) -> String {
    render_task_line(
        existing.indent,
        existing.bullet,
        status,
        existing.step,
        &existing.title,
        completed_on,
        annotation
    )
}

/// Replaces the content of line `index`, keeping its terminator and every
/// other line byte-for-byte.
pub(crate) fn replace_line(raw: &str, index: usize, content: &str) -> String {
    let mut out = String::with_capacity(raw.len() + content.len());
    for (i, (line, terminator)) in split_lines(raw).into_iter().enumerate() {
        out.push_str(if i == index { content } else { line });
        out.push_str(terminator);
    }
    out
}

fn newline_style(raw: &str) -> &'static str {
    match split_lines(raw).first() {
        Some((_, "\r\n")) => "\r\n",
        _ => "\n"
    }
}

/// Inserts `text` after the last non-blank line of the Notes section, or adds
/// a Notes section at the end of the document.
pub(crate) fn append_to_notes(raw: &str, text: &str) -> String {
    let nl = newline_style(raw);
    let lines = split_lines(raw);
    let insertion: String = text
        .lines()
        .map(|l| format!("{l}{nl}"))
        .collect();

    let Some(heading) = notes_heading(&lines) else {
        let mut out = raw.to_string();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push_str(nl);
        }
        if !out.is_empty() && !out.ends_with(&format!("{nl}{nl}")) {
            out.push_str(nl);
        }
        out.push_str("## Notes");
        out.push_str(nl);
        out.push_str(&insertion);
        return out;
    };

    let section_end = lines[heading + 1..]
        .iter()
        .position(|(line, _)| line.starts_with("# ") || line.starts_with("## "))
        .map_or(lines.len(), |offset| heading + 1 + offset);
    let after = lines[heading..section_end]
        .iter()
        .rposition(|(line, _)| !line.trim().is_empty())
        .map_or(heading, |offset| heading + offset);

    let mut out = String::with_capacity(raw.len() + insertion.len() + 2);
    for (i, (line, terminator)) in lines.iter().enumerate() {
        out.push_str(line);
        if i == after {
            out.push_str(if terminator.is_empty() { nl } else { terminator });
            out.push_str(&insertion);
        } else {
            out.push_str(terminator);
        }
    }
    out
}
