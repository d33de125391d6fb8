//! Markdown plan parser.
//!
//! Sections are recognised by heading text. Lines that do not match the
//! grammar of their section are skipped, so hand-edited documents degrade to
//! fewer recognised tasks rather than a parse error.

use super::model::{Phase, Plan, Task, TaskStatus};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static TASK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>\s*)(?P<bullet>[-*+])\s+\[(?P<mark>.)\]\s+(?P<step>\d+\.\d+)(?:\s+(?P<rest>.*?))?\s*$")
        .expect("task line pattern is valid")
});

static PHASE_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^##\s+phase\s+(?P<id>\d+)\s*:?\s*(?P<name>.*?)\s*$")
        .expect("phase heading pattern is valid")
});

static DONE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<title>.*?)\s*\((?P<date>\d{4}-\d{2}-\d{2})\)$")
        .expect("completion date pattern is valid")
});

/// Separator between a title and a blocked reason or review note.
pub(crate) const ANNOTATION_SEPARATOR: &str = " - ";

/// Splits text into lines, keeping each line's terminator apart so a
/// rewrite can put it back unchanged.
pub(crate) fn split_lines(raw: &str) -> Vec<(&str, &str)> {
    raw.split_inclusive('\n')
        .map(|line| {
            if let Some(body) = line.strip_suffix("\r\n") {
                (body, "\r\n")
            } else if let Some(body) = line.strip_suffix('\n') {
                (body, "\n")
            } else {
                (line, "")
            }
        })
        .collect()
}

/// A task line broken into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TaskLine<'a> {
    pub indent: &'a str,
    pub bullet: &'a str,
    pub status: TaskStatus,
    pub step: &'a str,
    pub title: String,
    pub completed_on: Option<NaiveDate>,
    pub annotation: Option<String>
}

pub(crate) fn parse_task_line(line: &str) -> Option<TaskLine<'_>> {
    let caps = TASK_LINE.captures(line)?;
    let marker = caps.name("mark")?.as_str().chars().next()?;
    let status = TaskStatus::from_marker(marker)?;
    let rest = caps.name("rest").map_or("", |m| m.as_str());

    let mut title = rest.to_string();
    let mut completed_on = None;
    let mut annotation = None;

    match status {
        TaskStatus::Done => {
            if let Some(date_caps) = DONE_DATE.captures(rest) {
                if let Ok(date) = NaiveDate::parse_from_str(&date_caps["date"], "%Y-%m-%d") {
                    title = date_caps["title"].to_string();
                    completed_on = Some(date);
                }
            }
        }
        TaskStatus::Blocked | TaskStatus::Review => {
            if let Some((head, tail)) = rest.split_once(ANNOTATION_SEPARATOR) {
                title = head.trim_end().to_string();
                let tail = tail.trim();
                if !tail.is_empty() {
                    annotation = Some(tail.to_string());
                }
            }
        }
        TaskStatus::Todo | TaskStatus::Doing => {}
    }

    Some(TaskLine {
        indent: caps.name("indent").map_or("", |m| m.as_str()),
        bullet: caps.name("bullet").map_or("-", |m| m.as_str()),
        status,
        step: caps.name("step")?.as_str(),
        title,
        completed_on,
        annotation
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Goal,
    Analysis,
    OpenQuestions,
    Phase,
    Notes,
    Other
}

fn section_of(heading: &str) -> Section {
    let text = heading.trim_start_matches('#').trim().to_ascii_lowercase();
    match text.as_str() {
        "goal" | "objective" => Section::Goal,
        "analysis" | "context" => Section::Analysis,
        "open questions" | "questions" => Section::OpenQuestions,
        "notes" => Section::Notes,
        _ => Section::Other
    }
}

/// Index of the `## Notes` heading line, if any.
pub(crate) fn notes_heading(lines: &[(&str, &str)]) -> Option<usize> {
    lines
        .iter()
        .position(|(line, _)| line.starts_with("## ") && section_of(line) == Section::Notes)
}

fn block(lines: &[&str]) -> String {
    lines.join("\n").trim().to_string()
}

pub fn parse_plan(raw: &str) -> Plan {
    let mut title = String::new();
    let mut goal = Vec::new();
    let mut analysis = Vec::new();
    let mut notes = Vec::new();
    let mut open_questions = Vec::new();
    let mut phases: Vec<Phase> = Vec::new();
    let mut section = Section::Preamble;

    for (index, (line, _)) in split_lines(raw).into_iter().enumerate() {
        if let Some(heading) = line.strip_prefix("# ") {
            if title.is_empty() {
                let heading = heading.trim();
                title = heading
                    .strip_prefix("Plan:")
                    .map_or(heading, str::trim)
                    .to_string();
            }
            section = Section::Other;
            continue;
        }

        if line.starts_with("## ") {
            if let Some(caps) = PHASE_HEADING.captures(line) {
                let id = caps["id"].parse().unwrap_or(phases.len() as u32 + 1);
                phases.push(Phase {
                    id,
                    name: caps["name"].to_string(),
                    tasks: Vec::new()
                });
                section = Section::Phase;
            } else {
                section = section_of(line);
            }
            continue;
        }

        match section {
            Section::Goal => goal.push(line),
            Section::Analysis => analysis.push(line),
            Section::Notes => notes.push(line),
            Section::OpenQuestions => {
                let item = line.trim_start();
                if let Some(question) = item.strip_prefix("- ").or_else(|| item.strip_prefix("* ")) {
                    if !question.trim().is_empty() {
                        open_questions.push(question.trim().to_string());
                    }
                }
            }
            Section::Phase => {
                if let (Some(task), Some(phase)) = (parse_task_line(line), phases.last_mut()) {
                    let (blocked_reason, review_note) = match task.status {
                        TaskStatus::Blocked => (task.annotation, None),
                        TaskStatus::Review => (None, task.annotation),
                        _ => (None, None)
                    };
                    phase.tasks.push(Task {
                        step: task.step.to_string(),
                        status: task.status,
                        title: task.title,
                        completed_on: task.completed_on,
                        blocked_reason,
                        review_note,
                        line: index
                    });
                }
            }
            Section::Preamble | Section::Other => {}
        }
    }

    Plan {
        title,
        goal: block(&goal),
        analysis: block(&analysis),
        open_questions,
        phases,
        notes: block(&notes),
        raw: raw.to_string()
    }
}
