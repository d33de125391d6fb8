//! Shared test fixtures for the agent workspace.
//!
//! [`FakeSheets`] is an in-memory [`sheets::SheetsService`] that records every
//! call and can be told to fail. The fixture constructors build it in the
//! physical layouts the file store has to cope with.

mod fake;
mod fixtures;

pub use fake::{Call, FakeSheets};
pub use fixtures::*;
use std::sync::atomic::{AtomicU32, Ordering};

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

pub fn unique_id(prefix: &str) -> String {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}", prefix, id)
}

pub fn unique_workspace_id() -> String {
    unique_id("test-workspace")
}
