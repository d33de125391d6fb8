//! # Spreadsheet Service
//!
//! The seam between the workspace engine and the remote spreadsheet service:
//! the [`SheetsService`] trait, its value types, A1 notation helpers and a
//! REST implementation.

pub mod a1;
pub mod http;
pub mod service;
pub mod types;

pub use http::{AccessTokenProvider, HttpSheetsClient, StaticToken};
pub use service::SheetsService;
pub use types::{
    Dimension, SheetProperties, SpreadsheetMeta, ValueInputOption, ValueRange, user_entered_text,
};
