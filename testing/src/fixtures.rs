//! Workspace fixtures in the physical layouts found in the wild.

use crate::FakeSheets;

pub const BASE_SHEET: &str = "AGENT_BASE";
pub const FILES_SHEET: &str = "AGENT_FILES";

pub const FILE_LABELS: [&str; 12] = [
    "file",
    "description",
    "tags",
    "path",
    "created_at",
    "updated_at",
    "status",
    "dependencies",
    "context_length",
    "max_context",
    "content_hash",
    "content"
];

pub const SAMPLE_PLAN: &str = "# Plan: Ship the importer

## Goal
Import legacy records

## Analysis
Records arrive as CSV exports.

## Phase 1: Prepare
- [x] 1.1 Collect samples (2026-01-04)
- [ ] 1.2 Write parser
- [!] 1.3 Get credentials - waiting on ops

## Phase 2: Load
- [ ] 2.1 Bulk insert

## Notes
- kickoff done
";

fn initialized_base(fake: FakeSheets) -> FakeSheets {
    fake.with_sheet(BASE_SHEET, vec![
        vec!["[[AGENT_SYSTEM_CONTEXT]]", "You are a careful importer agent."],
        vec!["[[AGENT_PLAN]]", SAMPLE_PLAN],
    ])
}

fn notes_file() -> [&'static str; 12] {
    [
        "notes.md",
        "Working notes",
        "notes,scratch",
        "/docs/notes.md",
        "2026-01-02T10:00:00+00:00",
        "2026-01-03T10:00:00+00:00",
        "draft",
        "AGENTS.md",
        "",
        "4000",
        "",
        "# Notes\nfirst entry"
    ]
}

fn agents_file() -> [&'static str; 12] {
    [
        "AGENTS.md",
        "System context",
        "system",
        "/AGENTS.md",
        "2026-01-01T00:00:00+00:00",
        "2026-01-01T00:00:00+00:00",
        "active",
        "",
        "",
        "",
        "",
        "You are a careful importer agent."
    ]
}

fn plan_file() -> [&'static str; 12] {
    [
        "PLAN.md",
        "Execution plan",
        "plan",
        "/PLAN.md",
        "2026-01-01T00:00:00+00:00",
        "2026-01-01T00:00:00+00:00",
        "active",
        "",
        "",
        "",
        "",
        "=AGENT_BASE!B2"
    ]
}

/// Files stored one per column, labels in column A.
pub fn column_layout_workspace() -> FakeSheets {
    let columns = [FILE_LABELS, agents_file(), plan_file(), notes_file()];
    let rows: Vec<Vec<&str>> = (0..12)
        .map(|r| columns.iter().map(|c| c[r]).collect())
        .collect();
    initialized_base(FakeSheets::new()).with_sheet(FILES_SHEET, rows)
}

/// Legacy layout: files stored one per row, labels in row 1.
pub fn row_layout_workspace() -> FakeSheets {
    let rows = vec![
        FILE_LABELS.to_vec(),
        agents_file().to_vec(),
        plan_file().to_vec(),
        notes_file().to_vec(),
    ];
    initialized_base(FakeSheets::new()).with_sheet(FILES_SHEET, rows)
}

/// Row layout whose header does not match and carries data beyond column L.
pub fn incompatible_row_workspace() -> FakeSheets {
    let header = vec![
        "name", "summary", "labels", "location", "created", "modified", "state", "requires",
        "length", "limit", "checksum", "body", "owner", "reviewer",
    ];
    let row = vec![
        "legacy.md", "Old doc", "", "/legacy.md", "", "", "", "", "", "", "", "legacy body",
        "alice", "bob",
    ];
    initialized_base(FakeSheets::new()).with_sheet(FILES_SHEET, vec![header, row])
}

/// Column layout with a drifted label and no data outside the 12 rows.
pub fn drifted_column_workspace() -> FakeSheets {
    let mut labels = FILE_LABELS;
    labels[2] = "Tags ";
    let columns = [labels, agents_file(), plan_file(), notes_file()];
    let rows: Vec<Vec<&str>> = (0..12)
        .map(|r| columns.iter().map(|c| c[r]).collect())
        .collect();
    initialized_base(FakeSheets::new()).with_sheet(FILES_SHEET, rows)
}

/// Column layout with a drifted label and a note typed below row 12 of the
/// last file column.
pub fn incompatible_column_workspace() -> FakeSheets {
    let mut labels = FILE_LABELS;
    labels[2] = "Tags ";
    let columns = [labels, agents_file(), plan_file(), notes_file()];
    let mut rows: Vec<Vec<&str>> = (0..12)
        .map(|r| columns.iter().map(|c| c[r]).collect())
        .collect();
    rows.push(vec!["", "", "", "remember to split this file"]);
    initialized_base(FakeSheets::new()).with_sheet(FILES_SHEET, rows)
}

/// Column layout holding only the guaranteed files in a grid exactly three
/// columns wide, so the next file needs the grid to grow.
pub fn tight_column_workspace() -> FakeSheets {
    let columns = [FILE_LABELS, agents_file(), plan_file()];
    let rows: Vec<Vec<&str>> = (0..12)
        .map(|r| columns.iter().map(|c| c[r]).collect())
        .collect();
    initialized_base(FakeSheets::new()).with_grid(FILES_SHEET, rows, 12, 3)
}

/// Row layout with the labels and one user file but neither guaranteed
/// file.
pub fn row_layout_without_guaranteed_files() -> FakeSheets {
    let rows = vec![FILE_LABELS.to_vec(), notes_file().to_vec()];
    initialized_base(FakeSheets::new()).with_sheet(FILES_SHEET, rows)
}
