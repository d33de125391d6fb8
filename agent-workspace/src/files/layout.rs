//! Physical layouts of the file store sheet.

use super::model::{FIELD_COUNT, FIELD_LABELS, field};
use serde::{Deserialize, Serialize};
use sheets::{Dimension, a1};

/// How files are laid out in the file store sheet. Decided once per handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// Labels in column A, one file per column from column B.
    Columns,
    /// Legacy: labels in row 1, one file per row from row 2.
    Rows
}

impl Layout {
    /// Major dimension in which one slot is one line.
    pub fn major(self) -> Dimension {
        match self {
            Layout::Columns => Dimension::Columns,
            Layout::Rows => Dimension::Rows
        }
    }

    /// 0-based (row, col) of field `index` in slot `slot`. Slot 0 holds the
    /// labels.
    pub fn position(self, slot: usize, index: usize) -> (usize, usize) {
        match self {
            Layout::Columns => (index, slot),
            Layout::Rows => (slot, index)
        }
    }

    /// A1 range covering all fields of one slot.
    pub fn slot_range(self, sheet: &str, slot: usize) -> String {
        a1::range(
            sheet,
            self.position(slot, 0),
            self.position(slot, FIELD_COUNT - 1)
        )
    }

    /// Formula reference to the content cell of the slot the formula sits in.
    fn content_ref(self) -> String {
        match self {
            Layout::Columns => format!(
                "INDIRECT(\"R{}C\"&COLUMN(),FALSE)",
                field::CONTENT + 1
            ),
            Layout::Rows => format!(
                "INDIRECT(\"R\"&ROW()&\"C{}\",FALSE)",
                field::CONTENT + 1
            )
        }
    }

    pub fn length_formula(self) -> String {
        format!("=LEN({})", self.content_ref())
    }

    /// Same value as [`super::model::content_hash`].
    pub fn hash_formula(self) -> String {
        let x = self.content_ref();
        format!(
            "=IF(LEN({x})=0,\"\",DEC2HEX(MOD(SUMPRODUCT(UNICODE(MID({x},SEQUENCE(LEN({x})),1)),SEQUENCE(LEN({x}))),549755813888),10))"
        )
    }
}

/// The whole file store sheet, one line per slot in layout-major order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Grid {
    pub lines: Vec<Vec<String>>
}

impl Grid {
    pub fn new(lines: Vec<Vec<String>>) -> Self {
        Self { lines }
    }

    pub fn cell(&self, slot: usize, index: usize) -> &str {
        self.lines
            .get(slot)
            .and_then(|line| line.get(index))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_blank(&self, slot: usize) -> bool {
        self.lines
            .get(slot)
            .is_none_or(|line| line.iter().all(|c| c.trim().is_empty()))
    }

    /// Slots after the label slot that hold a file, as `(slot, name)`.
    /// Lines whose first cell is a label are skipped.
    pub fn file_slots(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(slot, line)| {
                let name = line.first().map(String::as_str).unwrap_or("");
                (!name.is_empty() && !FIELD_LABELS.contains(&name)).then_some((slot, name))
            })
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.file_slots()
            .find(|(_, file)| *file == name)
            .map(|(slot, _)| slot)
    }

    /// First blank slot after the labels, or the slot past the last line.
    pub fn free_slot(&self) -> usize {
        (1..self.lines.len())
            .find(|&slot| self.is_blank(slot))
            .unwrap_or(self.lines.len().max(1))
    }
}

/// Number of labels matching position by position, ignoring case and
/// surrounding whitespace.
pub(crate) fn label_score(cells: &[&str]) -> usize {
    FIELD_LABELS
        .iter()
        .zip(cells)
        .filter(|(label, cell)| cell.trim().eq_ignore_ascii_case(label))
        .count()
}

/// Picks a layout from a row-major read of the sheet. An empty sheet is
/// fresh and gets the column layout; otherwise the axis with more matching
/// labels wins and ties go to the legacy row layout.
pub(crate) fn detect(rows: &[Vec<String>]) -> Layout {
    if rows.iter().all(|r| r.iter().all(|c| c.trim().is_empty())) {
        return Layout::Columns;
    }

    let column_a: Vec<&str> = (0..FIELD_COUNT)
        .map(|r| {
            rows.get(r)
                .and_then(|row| row.first())
                .map(String::as_str)
                .unwrap_or("")
        })
        .collect();
    let row_1: Vec<&str> = (0..FIELD_COUNT)
        .map(|c| {
            rows.first()
                .and_then(|row| row.get(c))
                .map(String::as_str)
                .unwrap_or("")
        })
        .collect();

    if label_score(&column_a) > label_score(&row_1) {
        Layout::Columns
    } else {
        Layout::Rows
    }
}
