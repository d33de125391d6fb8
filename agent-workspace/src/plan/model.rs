use chrono::NaiveDate;
use errors::WorkspaceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    Doing,
    Done,
    Blocked,
    Review
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Todo,
        TaskStatus::Doing,
        TaskStatus::Done,
        TaskStatus::Blocked,
        TaskStatus::Review
    ];

    /// Character between the brackets of a task line.
    pub fn marker(self) -> char {
        match self {
            TaskStatus::Todo => ' ',
            TaskStatus::Doing => '/',
            TaskStatus::Done => 'x',
            TaskStatus::Blocked => '!',
            TaskStatus::Review => '?'
        }
    }

    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            ' ' => Some(TaskStatus::Todo),
            '/' => Some(TaskStatus::Doing),
            'x' | 'X' => Some(TaskStatus::Done),
            '!' => Some(TaskStatus::Blocked),
            '?' => Some(TaskStatus::Review),
            _ => None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Doing => "doing",
            TaskStatus::Done => "done",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Review => "review"
        }
    }

    /// Canonical lifecycle: todo -> doing -> {done | blocked | review},
    /// blocked -> doing, review -> doing. Re-applying the current status is
    /// allowed except on done.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, next) {
            (Done, _) => false,
            (a, b) if a == b => true,
            (Todo, Doing) => true,
            (Doing, Done | Blocked | Review) => true,
            (Blocked | Review, Doing) => true,
            _ => false
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = WorkspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                WorkspaceError::validation(
                    "status",
                    format!("unknown task status '{s}', expected todo, doing, done, blocked or review")
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub step: String,
    pub status: TaskStatus,
    pub title: String,
    pub completed_on: Option<NaiveDate>,
    pub blocked_reason: Option<String>,
    pub review_note: Option<String>,
    /// 0-based line index in the raw document.
    #[serde(skip)]
    pub line: usize
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub id: u32,
    pub name: String,
    pub tasks: Vec<Task>
}

/// Parsed view of the plan document. `raw` is authoritative; every other
/// field is derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub title: String,
    pub goal: String,
    pub analysis: String,
    pub open_questions: Vec<String>,
    pub phases: Vec<Phase>,
    pub notes: String,
    pub raw: String
}

impl Plan {
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.phases.iter().flat_map(|p| p.tasks.iter())
    }

    pub fn task(&self, step: &str) -> Option<&Task> {
        self.tasks().find(|t| t.step == step)
    }

    pub fn next_task(&self) -> Option<&Task> {
        self.tasks().find(|t| t.status == TaskStatus::Todo)
    }

    pub fn review_tasks(&self) -> Vec<&Task> {
        self.tasks()
            .filter(|t| t.status == TaskStatus::Review)
            .collect()
    }

    pub fn progress(&self) -> PlanProgress {
        let mut progress = PlanProgress::default();
        for task in self.tasks() {
            match task.status {
                TaskStatus::Todo => progress.todo += 1,
                TaskStatus::Doing => progress.doing += 1,
                TaskStatus::Done => progress.done += 1,
                TaskStatus::Blocked => progress.blocked += 1,
                TaskStatus::Review => progress.review += 1
            }
        }
        progress
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanProgress {
    pub todo: usize,
    pub doing: usize,
    pub done: usize,
    pub blocked: usize,
    pub review: usize
}

impl PlanProgress {
    pub fn total(&self) -> usize {
        self.todo + self.doing + self.done + self.blocked + self.review
    }
}

/// Input for `create_plan`: one phase and its step titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub name: String,
    pub steps: Vec<String>
}

impl PhaseSpec {
    pub fn new(name: impl Into<String>, steps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            steps: steps.into_iter().map(Into::into).collect()
        }
    }
}

/// Requested change to one task line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskUpdate {
    pub status: TaskStatus,
    /// Completion date for done; today (UTC) when unset.
    pub completed_on: Option<NaiveDate>,
    pub reason: Option<String>,
    pub note: Option<String>
}

impl TaskUpdate {
    pub fn to(status: TaskStatus) -> Self {
        Self {
            status,
            completed_on: None,
            reason: None,
            note: None
        }
    }

    pub fn doing() -> Self {
        Self::to(TaskStatus::Doing)
    }

    pub fn done() -> Self {
        Self::to(TaskStatus::Done)
    }

    pub fn done_on(date: NaiveDate) -> Self {
        Self {
            completed_on: Some(date),
            ..Self::to(TaskStatus::Done)
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::to(TaskStatus::Blocked)
        }
    }

    pub fn review(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
            ..Self::to(TaskStatus::Review)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_round_trip() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::from_marker(status.marker()), Some(status));
        }
        assert_eq!(TaskStatus::from_marker('X'), Some(TaskStatus::Done));
        assert_eq!(TaskStatus::from_marker('-'), None);
    }

    #[test]
    fn test_canonical_transitions() {
        use TaskStatus::*;
        assert!(Todo.can_transition_to(Doing));
        assert!(Doing.can_transition_to(Done));
        assert!(Doing.can_transition_to(Blocked));
        assert!(Doing.can_transition_to(Review));
        assert!(Blocked.can_transition_to(Doing));
        assert!(Review.can_transition_to(Doing));

        assert!(!Todo.can_transition_to(Done));
        assert!(!Blocked.can_transition_to(Review));
        assert!(!Done.can_transition_to(Doing));
        assert!(!Done.can_transition_to(Done));
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Review".parse::<TaskStatus>().unwrap(), TaskStatus::Review);
        assert!("finished".parse::<TaskStatus>().is_err());
    }
}
