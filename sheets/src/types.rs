use serde::{Deserialize, Serialize};

/// Major axis of a value grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dimension {
    #[default]
    Rows,
    Columns
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Rows => "ROWS",
            Dimension::Columns => "COLUMNS"
        }
    }
}

/// How the service interprets written text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueInputOption {
    /// Stored verbatim.
    Raw,
    /// Parsed as if typed into the UI: formulas evaluate, numbers and dates
    /// are coerced, a leading apostrophe forces text.
    UserEntered
}

impl ValueInputOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueInputOption::Raw => "RAW",
            ValueInputOption::UserEntered => "USER_ENTERED"
        }
    }
}

/// Escapes text written with [`ValueInputOption::UserEntered`] so the service
/// keeps it as literal text.
pub fn user_entered_text(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!("'{value}")
    }
}

/// A rectangular block of formatted cell values.
///
/// `values[major][minor]`: with [`Dimension::Rows`] the outer vector holds
/// rows, with [`Dimension::Columns`] it holds columns. Trailing empty cells
/// and trailing empty vectors may be omitted by the service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub major_dimension: Dimension,
    #[serde(default)]
    pub values: Vec<Vec<String>>
}

impl ValueRange {
    pub fn new(range: impl Into<String>, major_dimension: Dimension, values: Vec<Vec<String>>) -> Self {
        Self {
            range: range.into(),
            major_dimension,
            values
        }
    }

    /// Cell at `major`/`minor`, treating omitted cells as empty.
    pub fn get(&self, major: usize, minor: usize) -> &str {
        self.values
            .get(major)
            .and_then(|line| line.get(minor))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// First cell of the range, if non-empty.
    pub fn first(&self) -> Option<&str> {
        let value = self.get(0, 0);
        (!value.is_empty()).then_some(value)
    }

    pub fn is_empty(&self) -> bool {
        self.values
            .iter()
            .all(|line| line.iter().all(|cell| cell.is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    pub index: usize,
    pub row_count: usize,
    pub column_count: usize
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpreadsheetMeta {
    pub spreadsheet_id: String,
    pub title: String,
    pub sheets: Vec<SheetProperties>
}

impl SpreadsheetMeta {
    pub fn sheet(&self, title: &str) -> Option<&SheetProperties> {
        self.sheets.iter().find(|s| s.title == title)
    }
}
