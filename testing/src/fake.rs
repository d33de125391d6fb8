use async_trait::async_trait;
use errors::{RemoteError, RemoteResult};
use parking_lot::Mutex;
use sheets::a1::{self, A1Range};
use sheets::{
    Dimension, SheetProperties, SheetsService, SpreadsheetMeta, ValueInputOption, ValueRange,
};
use std::collections::{HashMap, VecDeque};

const DEFAULT_ROWS: usize = 1000;
const DEFAULT_COLUMNS: usize = 26;

/// One recorded service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: &'static str,
    pub target: String,
    pub mutating: bool
}

struct FakeSheet {
    props: SheetProperties,
    /// Row-major, ragged.
    cells: Vec<Vec<String>>
}

impl FakeSheet {
    fn get(&self, row: usize, col: usize) -> &str {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn set(&mut self, row: usize, col: usize, value: String) {
        if self.cells.len() <= row {
            self.cells.resize_with(row + 1, Vec::new);
        }
        let line = &mut self.cells[row];
        if line.len() <= col {
            line.resize(col + 1, String::new());
        }
        line[col] = value;
    }

    fn used_rows(&self) -> usize {
        self.cells
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_empty()))
            .map_or(0, |i| i + 1)
    }

    fn used_columns(&self) -> usize {
        self.cells
            .iter()
            .filter_map(|r| r.iter().rposition(|c| !c.is_empty()))
            .max()
            .map_or(0, |i| i + 1)
    }
}

#[derive(Default)]
struct State {
    exists: bool,
    title: String,
    sheets: Vec<FakeSheet>,
    next_sheet_id: i64,
    calls: Vec<Call>,
    queued_failures: HashMap<&'static str, VecDeque<RemoteError>>,
    permanent_failures: HashMap<&'static str, RemoteError>
}

impl State {
    fn sheet(&self, title: &str) -> RemoteResult<&FakeSheet> {
        self.sheets
            .iter()
            .find(|s| s.props.title == title)
            .ok_or_else(|| unable_to_parse(title))
    }

    fn sheet_mut(&mut self, title: &str) -> RemoteResult<&mut FakeSheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.props.title == title)
            .ok_or_else(|| unable_to_parse(title))
    }

    fn sheet_by_id_mut(&mut self, sheet_id: i64) -> RemoteResult<&mut FakeSheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.props.sheet_id == sheet_id)
            .ok_or_else(|| {
                RemoteError::status(400, format!("No grid with id: {sheet_id}"))
            })
    }

    fn record(&mut self, method: &'static str, target: impl Into<String>, mutating: bool) -> RemoteResult<()> {
        self.calls.push(Call {
            method,
            target: target.into(),
            mutating
        });

        if let Some(err) = self
            .queued_failures
            .get_mut(method)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        if let Some(err) = self.permanent_failures.get(method) {
            return Err(err.clone());
        }
        Ok(())
    }

    fn read(&self, range: &str, major: Dimension) -> RemoteResult<ValueRange> {
        let parsed = a1::parse(range).map_err(|e| RemoteError::status(400, e))?;
        let sheet = self.sheet(&parsed.sheet)?;

        let (start, end) = bounds(&parsed, sheet.used_rows(), sheet.used_columns());
        let mut rows: Vec<Vec<String>> = (start.0..end.0)
            .map(|r| (start.1..end.1).map(|c| sheet.get(r, c).to_string()).collect())
            .collect();
        if major == Dimension::Columns {
            rows = transpose(rows);
        }

        Ok(ValueRange::new(range, major, trim(rows)))
    }

    fn write(&mut self, data: &ValueRange, input: ValueInputOption) -> RemoteResult<()> {
        let parsed = a1::parse(&data.range).map_err(|e| RemoteError::status(400, e))?;
        let origin = parsed.start.map_or((0, 0), |c| (c.row, c.col));
        let sheet = self.sheet_mut(&parsed.sheet)?;

        for (major, line) in data.values.iter().enumerate() {
            for (minor, value) in line.iter().enumerate() {
                let (row, col) = match data.major_dimension {
                    Dimension::Rows => (origin.0 + major, origin.1 + minor),
                    Dimension::Columns => (origin.0 + minor, origin.1 + major)
                };
                if row >= sheet.props.row_count || col >= sheet.props.column_count {
                    return Err(RemoteError::status(
                        400,
                        format!(
                            "Range ({}) exceeds grid limits. Max rows: {}, max columns: {}",
                            a1::cell(&sheet.props.title, row, col),
                            sheet.props.row_count,
                            sheet.props.column_count
                        )
                    ));
                }
                sheet.set(row, col, stored_value(value, input));
            }
        }
        Ok(())
    }
}

fn unable_to_parse(range: &str) -> RemoteError {
    RemoteError::status(400, format!("Unable to parse range: {range}"))
}

/// Applies what the service does with user-entered text: a leading apostrophe
/// forces literal text and is not stored. Formulas are kept as written; the
/// fake does not evaluate them.
fn stored_value(value: &str, input: ValueInputOption) -> String {
    match input {
        ValueInputOption::Raw => value.to_string(),
        ValueInputOption::UserEntered => value.strip_prefix('\'').unwrap_or(value).to_string()
    }
}

fn bounds(range: &A1Range, used_rows: usize, used_cols: usize) -> ((usize, usize), (usize, usize)) {
    match (range.start, range.end) {
        (Some(s), Some(e)) => ((s.row, s.col), (e.row + 1, e.col + 1)),
        _ => ((0, 0), (used_rows, used_cols))
    }
}

fn transpose(rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    (0..width)
        .map(|c| {
            rows.iter()
                .map(|r| r.get(c).cloned().unwrap_or_default())
                .collect()
        })
        .collect()
}

/// The service omits trailing empty cells and trailing empty lines.
fn trim(mut lines: Vec<Vec<String>>) -> Vec<Vec<String>> {
    for line in &mut lines {
        while line.last().is_some_and(String::is_empty) {
            line.pop();
        }
    }
    while lines.last().is_some_and(Vec::is_empty) {
        lines.pop();
    }
    lines
}

/// In-memory spreadsheet service.
///
/// Behaves like the remote service for the subset the engine uses: writes
/// outside the grid fail with 400, reads of unknown sheets fail with 400,
/// append grows the grid, structural deletes shift the remaining cells.
pub struct FakeSheets {
    state: Mutex<State>
}

impl Default for FakeSheets {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSheets {
    /// An existing, empty spreadsheet.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                exists: true,
                title: "Agent Workspace".to_string(),
                ..State::default()
            })
        }
    }

    /// A spreadsheet id that resolves to nothing.
    pub fn missing() -> Self {
        let fake = Self::new();
        fake.state.lock().exists = false;
        fake
    }

    /// Adds a sheet with the given row-major contents and a default-sized
    /// grid large enough to hold them.
    pub fn with_sheet(self, title: &str, rows: Vec<Vec<&str>>) -> Self {
        let height = rows.len().max(DEFAULT_ROWS);
        let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(DEFAULT_COLUMNS);
        self.with_grid(title, rows, height, width)
    }

    /// Adds a sheet with an explicit grid size.
    pub fn with_grid(self, title: &str, rows: Vec<Vec<&str>>, row_count: usize, column_count: usize) -> Self {
        {
            let mut state = self.state.lock();
            let sheet_id = state.next_sheet_id;
            state.next_sheet_id += 1;
            let index = state.sheets.len();
            state.sheets.push(FakeSheet {
                props: SheetProperties {
                    sheet_id,
                    title: title.to_string(),
                    index,
                    row_count,
                    column_count
                },
                cells: rows
                    .into_iter()
                    .map(|r| r.into_iter().map(str::to_string).collect())
                    .collect()
            });
        }
        self
    }

    /// The next `method` call fails with `err`. Queued failures are consumed
    /// in order.
    pub fn fail_next(&self, method: &'static str, err: RemoteError) {
        self.state
            .lock()
            .queued_failures
            .entry(method)
            .or_default()
            .push_back(err);
    }

    /// Every `method` call fails with `err`.
    pub fn fail_always(&self, method: &'static str, err: RemoteError) {
        self.state.lock().permanent_failures.insert(method, err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.mutating)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn sheet_titles(&self) -> Vec<String> {
        self.state
            .lock()
            .sheets
            .iter()
            .map(|s| s.props.title.clone())
            .collect()
    }

    /// Stored text of one cell (0-based), empty when unset or the sheet is
    /// unknown.
    pub fn cell(&self, title: &str, row: usize, col: usize) -> String {
        let state = self.state.lock();
        state
            .sheet(title)
            .map(|s| s.get(row, col).to_string())
            .unwrap_or_default()
    }

    /// Out-of-band edit, as a human would make in the spreadsheet UI.
    pub fn set_cell(&self, title: &str, row: usize, col: usize, value: &str) {
        let mut state = self.state.lock();
        if let Ok(sheet) = state.sheet_mut(title) {
            sheet.set(row, col, value.to_string());
        }
    }

    /// Row-major contents with trailing empties trimmed.
    pub fn rows(&self, title: &str) -> Vec<Vec<String>> {
        let state = self.state.lock();
        state
            .sheet(title)
            .map(|s| trim(s.cells.clone()))
            .unwrap_or_default()
    }

    pub fn grid_size(&self, title: &str) -> Option<(usize, usize)> {
        let state = self.state.lock();
        state
            .sheet(title)
            .ok()
            .map(|s| (s.props.row_count, s.props.column_count))
    }
}

#[async_trait]
impl SheetsService for FakeSheets {
    async fn get_spreadsheet(&self, spreadsheet_id: &str) -> RemoteResult<SpreadsheetMeta> {
        let mut state = self.state.lock();
        state.record("get_spreadsheet", spreadsheet_id, false)?;
        if !state.exists {
            return Err(RemoteError::status(
                404,
                format!("Requested entity was not found: {spreadsheet_id}")
            ));
        }
        Ok(SpreadsheetMeta {
            spreadsheet_id: spreadsheet_id.to_string(),
            title: state.title.clone(),
            sheets: state.sheets.iter().map(|s| s.props.clone()).collect()
        })
    }

    async fn get_values(
        &self,
        _spreadsheet_id: &str,
        range: &str,
        major: Dimension
    ) -> RemoteResult<ValueRange> {
        let mut state = self.state.lock();
        state.record("get_values", range, false)?;
        state.read(range, major)
    }

    async fn batch_get_values(
        &self,
        _spreadsheet_id: &str,
        ranges: &[String],
        major: Dimension
    ) -> RemoteResult<Vec<ValueRange>> {
        let mut state = self.state.lock();
        state.record("batch_get_values", ranges.join(","), false)?;
        ranges.iter().map(|r| state.read(r, major)).collect()
    }

    async fn update_values(
        &self,
        _spreadsheet_id: &str,
        data: ValueRange,
        input: ValueInputOption
    ) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.record("update_values", data.range.clone(), true)?;
        state.write(&data, input)
    }

    async fn batch_update_values(
        &self,
        _spreadsheet_id: &str,
        data: Vec<ValueRange>,
        input: ValueInputOption
    ) -> RemoteResult<()> {
        let mut state = self.state.lock();
        let target = data
            .iter()
            .map(|d| d.range.as_str())
            .collect::<Vec<_>>()
            .join(",");
        state.record("batch_update_values", target, true)?;
        for range in &data {
            state.write(range, input)?;
        }
        Ok(())
    }

    async fn append_values(
        &self,
        _spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<String>>,
        input: ValueInputOption
    ) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.record("append_values", range, true)?;

        let parsed = a1::parse(range).map_err(|e| RemoteError::status(400, e))?;
        let first_col = parsed.start.map_or(0, |c| c.col);
        let sheet = state.sheet_mut(&parsed.sheet)?;
        let first_row = sheet.used_rows();

        let needed = first_row + rows.len();
        if needed > sheet.props.row_count {
            sheet.props.row_count = needed;
        }
        for (i, row) in rows.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                sheet.set(first_row + i, first_col + j, stored_value(value, input));
            }
        }
        Ok(())
    }

    async fn clear_values(&self, _spreadsheet_id: &str, range: &str) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.record("clear_values", range, true)?;

        let parsed = a1::parse(range).map_err(|e| RemoteError::status(400, e))?;
        let sheet = state.sheet_mut(&parsed.sheet)?;
        let (start, end) = bounds(&parsed, sheet.used_rows(), sheet.used_columns());
        for row in start.0..end.0 {
            for col in start.1..end.1 {
                if !sheet.get(row, col).is_empty() {
                    sheet.set(row, col, String::new());
                }
            }
        }
        Ok(())
    }

    async fn add_sheet(&self, _spreadsheet_id: &str, title: &str) -> RemoteResult<SheetProperties> {
        let mut state = self.state.lock();
        state.record("add_sheet", title, true)?;

        if state.sheets.iter().any(|s| s.props.title == title) {
            return Err(RemoteError::status(
                400,
                format!("A sheet with the name \"{title}\" already exists")
            ));
        }
        let props = SheetProperties {
            sheet_id: state.next_sheet_id,
            title: title.to_string(),
            index: state.sheets.len(),
            row_count: DEFAULT_ROWS,
            column_count: DEFAULT_COLUMNS
        };
        state.next_sheet_id += 1;
        state.sheets.push(FakeSheet {
            props: props.clone(),
            cells: Vec::new()
        });
        Ok(props)
    }

    async fn delete_dimension(
        &self,
        _spreadsheet_id: &str,
        sheet_id: i64,
        dimension: Dimension,
        start: usize,
        end: usize
    ) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.record(
            "delete_dimension",
            format!("{sheet_id}:{}:{start}-{end}", dimension.as_str()),
            true
        )?;

        let sheet = state.sheet_by_id_mut(sheet_id)?;
        let count = end.saturating_sub(start);
        match dimension {
            Dimension::Rows => {
                if start < sheet.cells.len() {
                    let stop = end.min(sheet.cells.len());
                    sheet.cells.drain(start..stop);
                }
                sheet.props.row_count = sheet.props.row_count.saturating_sub(count);
            }
            Dimension::Columns => {
                for row in &mut sheet.cells {
                    if start < row.len() {
                        let stop = end.min(row.len());
                        row.drain(start..stop);
                    }
                }
                sheet.props.column_count = sheet.props.column_count.saturating_sub(count);
            }
        }
        Ok(())
    }

    async fn append_dimension(
        &self,
        _spreadsheet_id: &str,
        sheet_id: i64,
        dimension: Dimension,
        length: usize
    ) -> RemoteResult<()> {
        let mut state = self.state.lock();
        state.record(
            "append_dimension",
            format!("{sheet_id}:{}:{length}", dimension.as_str()),
            true
        )?;

        let sheet = state.sheet_by_id_mut(sheet_id)?;
        match dimension {
            Dimension::Rows => sheet.props.row_count += length,
            Dimension::Columns => sheet.props.column_count += length
        }
        Ok(())
    }
}
