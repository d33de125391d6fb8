use agent_workspace::{AgentWorkspace, Layout, PLAN_SENTINEL, SYSTEM_CONTEXT_SENTINEL, WorkspaceError};
use config::WorkspaceConfig;
use errors::RemoteError;
use sheets::SheetsService;
use std::sync::Arc;
use testing::{
    BASE_SHEET, FILE_LABELS, FILES_SHEET, FakeSheets, column_layout_workspace,
    drifted_column_workspace, incompatible_column_workspace, incompatible_row_workspace,
    row_layout_without_guaranteed_files, row_layout_workspace, unique_workspace_id,
};

fn test_config() -> WorkspaceConfig {
    let mut config = WorkspaceConfig::default();
    config.retry.max_attempts = 3;
    config.retry.base_delay_ms = 10;
    config.retry.max_delay_ms = 100;
    config
}

async fn attach(fake: &Arc<FakeSheets>) -> Result<AgentWorkspace, WorkspaceError> {
    let service: Arc<dyn SheetsService> = fake.clone();
    AgentWorkspace::attach(service, unique_workspace_id(), test_config()).await
}

#[tokio::test]
async fn test_fresh_workspace_is_initialized() {
    let fake = Arc::new(FakeSheets::new());
    let ws = attach(&fake).await.unwrap();

    assert_eq!(fake.sheet_titles(), vec![BASE_SHEET, FILES_SHEET]);
    assert_eq!(fake.cell(BASE_SHEET, 0, 0), SYSTEM_CONTEXT_SENTINEL);
    assert_eq!(fake.cell(BASE_SHEET, 1, 0), PLAN_SENTINEL);
    assert!(fake.cell(BASE_SHEET, 1, 1).starts_with("# Plan: "));

    for (row, label) in FILE_LABELS.iter().enumerate() {
        assert_eq!(fake.cell(FILES_SHEET, row, 0), *label);
    }
    assert_eq!(fake.cell(FILES_SHEET, 0, 1), "AGENTS.md");
    assert_eq!(fake.cell(FILES_SHEET, 0, 2), "PLAN.md");
    assert_eq!(fake.cell(FILES_SHEET, 11, 2), "=AGENT_BASE!B2");

    assert_eq!(ws.layout().await.unwrap(), Layout::Columns);
    assert!(ws.plan().get_plan().await.unwrap().is_some());
    let agents = ws.files().read_file("AGENTS.md").await.unwrap().unwrap();
    assert_eq!(
        Some(agents.content),
        ws.get_system_context().await.unwrap()
    );
}

#[tokio::test]
async fn test_second_attach_only_reads() {
    let fake = Arc::new(FakeSheets::new());
    attach(&fake).await.unwrap();
    assert!(!fake.mutating_calls().is_empty());

    fake.clear_calls();
    attach(&fake).await.unwrap();

    assert!(fake.mutating_calls().is_empty(), "{:?}", fake.mutating_calls());
    assert_eq!(fake.calls_to("get_values"), 3);
}

#[tokio::test]
async fn test_initialized_fixture_attach_makes_no_writes() {
    let fake = Arc::new(column_layout_workspace());
    let ws = attach(&fake).await.unwrap();
    assert_eq!(ws.layout().await.unwrap(), Layout::Columns);
    assert!(fake.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_missing_workspace_is_permission_error() {
    let fake = Arc::new(FakeSheets::missing());
    let err = attach(&fake).await.err().unwrap();

    assert!(matches!(err, WorkspaceError::Permission { .. }), "{err:?}");
    assert!(!err.remediation().is_empty());
    assert_eq!(fake.calls_to("get_spreadsheet"), 1);
}

#[tokio::test]
async fn test_forbidden_workspace_is_not_retried() {
    let fake = Arc::new(FakeSheets::new());
    fake.fail_always("get_spreadsheet", RemoteError::status(403, "The caller does not have permission"));

    let err = attach(&fake).await.err().unwrap();
    assert!(matches!(err, WorkspaceError::Permission { .. }));
    assert_eq!(fake.calls_to("get_spreadsheet"), 1);
}

#[tokio::test]
async fn test_unreadable_marker_cell_counts_as_absent() {
    let fake = Arc::new(FakeSheets::new());
    fake.fail_next("get_values", RemoteError::status(400, "Unable to parse range: AGENT_BASE!A1"));

    attach(&fake).await.unwrap();
    assert_eq!(fake.cell(BASE_SHEET, 0, 0), SYSTEM_CONTEXT_SENTINEL);
}

#[tokio::test]
async fn test_forbidden_marker_read_propagates() {
    let fake = Arc::new(column_layout_workspace());
    fake.fail_next("get_values", RemoteError::status(403, "forbidden"));

    let err = attach(&fake).await.err().unwrap();
    assert!(matches!(err, WorkspaceError::Permission { .. }));
    assert!(fake.mutating_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_transient_probe_failure_is_retried() {
    let fake = Arc::new(column_layout_workspace());
    fake.fail_next("get_spreadsheet", RemoteError::status(503, "backend unavailable"));

    attach(&fake).await.unwrap();
    assert_eq!(fake.calls_to("get_spreadsheet"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_service_surfaces_network_error() {
    let fake = Arc::new(FakeSheets::new());
    fake.fail_always("get_spreadsheet", RemoteError::transport("ECONNREFUSED", "connection refused"));

    match attach(&fake).await.err().unwrap() {
        WorkspaceError::Network {
            attempts,
            max_attempts,
            ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(max_attempts, 3);
        }
        other => panic!("unexpected error: {other:?}")
    }
    assert_eq!(fake.calls_to("get_spreadsheet"), 3);
}

#[tokio::test]
async fn test_incompatible_layout_is_refused_without_writes() {
    let fake = Arc::new(incompatible_row_workspace());
    let before = fake.rows(FILES_SHEET);

    let err = attach(&fake).await.err().unwrap();
    match &err {
        WorkspaceError::StructuralIncompatibility { sheet, choices, .. } => {
            assert_eq!(sheet, FILES_SHEET);
            assert!(choices.len() >= 2);
        }
        other => panic!("unexpected error: {other:?}")
    }
    assert!(err.remediation().starts_with("Choose one:"));
    assert!(fake.mutating_calls().is_empty());
    assert_eq!(fake.rows(FILES_SHEET), before);
}

#[tokio::test]
async fn test_column_layout_with_data_below_schema_is_refused() {
    let fake = Arc::new(incompatible_column_workspace());
    let before = fake.rows(FILES_SHEET);

    let err = attach(&fake).await.err().unwrap();
    match &err {
        WorkspaceError::StructuralIncompatibility { sheet, reason, choices } => {
            assert_eq!(sheet, FILES_SHEET);
            assert!(reason.contains("row 12"), "{reason}");
            assert!(reason.contains("1 non-empty cells"), "{reason}");
            assert!(choices.iter().any(|c| c.contains("row 12")));
        }
        other => panic!("unexpected error: {other:?}")
    }
    assert!(fake.mutating_calls().is_empty());
    assert_eq!(fake.rows(FILES_SHEET), before);
    assert_eq!(fake.cell(FILES_SHEET, 2, 0), "Tags ");
}

#[tokio::test]
async fn test_drifted_labels_are_repaired_in_place() {
    let fake = Arc::new(drifted_column_workspace());
    let ws = attach(&fake).await.unwrap();

    assert_eq!(ws.layout().await.unwrap(), Layout::Columns);
    assert_eq!(fake.cell(FILES_SHEET, 2, 0), "tags");
    assert_eq!(fake.cell(FILES_SHEET, 0, 3), "notes.md");

    let mutations = fake.mutating_calls();
    assert_eq!(mutations.len(), 1, "{mutations:?}");
    assert_eq!(mutations[0].method, "update_values");
}

#[tokio::test]
async fn test_row_layout_is_detected() {
    let fake = Arc::new(row_layout_workspace());
    let ws = attach(&fake).await.unwrap();

    assert_eq!(ws.layout().await.unwrap(), Layout::Rows);
    assert!(fake.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_missing_guaranteed_files_are_seeded() {
    let fake = Arc::new(row_layout_without_guaranteed_files());
    let ws = attach(&fake).await.unwrap();

    let rows = fake.rows(FILES_SHEET);
    assert_eq!(rows[1][0], "notes.md");
    assert_eq!(rows[2][0], "AGENTS.md");
    assert_eq!(rows[3][0], "PLAN.md");
    assert_eq!(fake.calls_to("append_values"), 2);

    let files = ws.files().list_files().await.unwrap();
    let names: Vec<_> = files.iter().map(|f| f.file.as_str()).collect();
    assert_eq!(names, vec!["notes.md", "AGENTS.md", "PLAN.md"]);
}
