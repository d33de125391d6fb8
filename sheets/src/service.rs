use crate::types::{Dimension, SheetProperties, SpreadsheetMeta, ValueInputOption, ValueRange};
use async_trait::async_trait;
use errors::RemoteResult;

/// Operations the workspace engine needs from a remote spreadsheet service.
///
/// Implementations report failures as [`errors::RemoteError`] with enough
/// shape for the execution wrapper to classify them; they never retry on
/// their own.
#[async_trait]
pub trait SheetsService: Send + Sync {
    async fn get_spreadsheet(&self, spreadsheet_id: &str) -> RemoteResult<SpreadsheetMeta>;

    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        major: Dimension
    ) -> RemoteResult<ValueRange>;

    async fn batch_get_values(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
        major: Dimension
    ) -> RemoteResult<Vec<ValueRange>>;

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        data: ValueRange,
        input: ValueInputOption
    ) -> RemoteResult<()>;

    async fn batch_update_values(
        &self,
        spreadsheet_id: &str,
        data: Vec<ValueRange>,
        input: ValueInputOption
    ) -> RemoteResult<()>;

    /// Appends rows after the last non-empty row of the table found at
    /// `range`.
    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<String>>,
        input: ValueInputOption
    ) -> RemoteResult<()>;

    async fn clear_values(&self, spreadsheet_id: &str, range: &str) -> RemoteResult<()>;

    async fn add_sheet(&self, spreadsheet_id: &str, title: &str) -> RemoteResult<SheetProperties>;

    /// Removes rows or columns `[start, end)` and shifts the rest.
    async fn delete_dimension(
        &self,
        spreadsheet_id: &str,
        sheet_id: i64,
        dimension: Dimension,
        start: usize,
        end: usize
    ) -> RemoteResult<()>;

    /// Grows the grid by `length` rows or columns.
    async fn append_dimension(
        &self,
        spreadsheet_id: &str,
        sheet_id: i64,
        dimension: Dimension,
        length: usize
    ) -> RemoteResult<()>;
}
