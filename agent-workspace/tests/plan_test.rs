use agent_workspace::{AgentWorkspace, PhaseSpec, TaskStatus, TaskUpdate, WorkspaceError};
use chrono::{NaiveDate, Utc};
use config::WorkspaceConfig;
use sheets::SheetsService;
use std::sync::Arc;
use testing::{BASE_SHEET, FakeSheets, SAMPLE_PLAN, column_layout_workspace, unique_workspace_id};

async fn attach_with(fake: &Arc<FakeSheets>, config: WorkspaceConfig) -> AgentWorkspace {
    let service: Arc<dyn SheetsService> = fake.clone();
    AgentWorkspace::attach(service, unique_workspace_id(), config)
        .await
        .unwrap()
}

async fn attach(fake: &Arc<FakeSheets>) -> AgentWorkspace {
    attach_with(fake, WorkspaceConfig::default()).await
}

fn changed_lines(before: &str, after: &str) -> Vec<(String, String)> {
    let before: Vec<&str> = before.split('\n').collect();
    let after: Vec<&str> = after.split('\n').collect();
    assert_eq!(before.len(), after.len());
    before
        .iter()
        .zip(&after)
        .filter(|(a, b)| a != b)
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

#[tokio::test]
async fn test_create_then_get_round_trips() {
    let fake = Arc::new(FakeSheets::new());
    let ws = attach(&fake).await;

    ws.plan()
        .create_plan("T", "G", &[PhaseSpec::new("A", ["x", "y"])])
        .await
        .unwrap();
    let plan = ws.plan().get_plan().await.unwrap().unwrap();

    assert_eq!(plan.title, "T");
    assert_eq!(plan.goal, "G");
    assert_eq!(plan.phases.len(), 1);
    assert_eq!(plan.phases[0].id, 1);
    assert_eq!(plan.phases[0].name, "A");
    let tasks: Vec<_> = plan
        .tasks()
        .map(|t| (t.step.as_str(), t.title.as_str(), t.status))
        .collect();
    assert_eq!(tasks, vec![
        ("1.1", "x", TaskStatus::Todo),
        ("1.2", "y", TaskStatus::Todo),
    ]);
}

#[tokio::test]
async fn test_update_changes_exactly_one_line() {
    let fake = Arc::new(column_layout_workspace());
    let ws = attach(&fake).await;

    let before = ws.plan().get_raw().await.unwrap().unwrap();
    ws.plan()
        .update_task("1.2", TaskUpdate::doing())
        .await
        .unwrap();
    let after = ws.plan().get_raw().await.unwrap().unwrap();

    assert_eq!(changed_lines(&before, &after), vec![(
        "- [ ] 1.2 Write parser".to_string(),
        "- [/] 1.2 Write parser".to_string()
    )]);
}

#[tokio::test]
async fn test_crlf_documents_keep_their_line_endings() {
    let fake = Arc::new(column_layout_workspace());
    let ws = attach(&fake).await;
    let crlf = SAMPLE_PLAN.replace('\n', "\r\n");
    ws.plan().set_raw(&crlf).await.unwrap();

    ws.plan()
        .update_task("2.1", TaskUpdate::doing())
        .await
        .unwrap();
    let after = ws.plan().get_raw().await.unwrap().unwrap();

    assert_eq!(after, crlf.replace("- [ ] 2.1 Bulk insert", "- [/] 2.1 Bulk insert"));
}

#[tokio::test]
async fn test_next_task_skips_blocked_and_review() {
    let fake = Arc::new(column_layout_workspace());
    let ws = attach(&fake).await;

    ws.plan()
        .set_raw("# Plan: X\n\n## Phase 1: A\n- [ ] 1.1 first\n- [!] 1.2 second - stuck\n- [ ] 1.3 third\n")
        .await
        .unwrap();
    let next = ws.plan().get_next_task().await.unwrap().unwrap();
    assert_eq!(next.step, "1.1");

    ws.plan()
        .set_raw("# Plan: X\n\n## Phase 1: A\n- [!] 1.1 first - stuck\n- [?] 1.2 second - look\n- [ ] 1.3 third\n")
        .await
        .unwrap();
    let next = ws.plan().get_next_task().await.unwrap().unwrap();
    assert_eq!(next.step, "1.3");

    ws.plan()
        .set_raw("# Plan: X\n\n## Phase 1: A\n- [x] 1.1 first (2026-01-01)\n- [!] 1.2 second\n")
        .await
        .unwrap();
    assert!(ws.plan().get_next_task().await.unwrap().is_none());
}

#[tokio::test]
async fn test_blocked_then_review_scenario() {
    let fake = Arc::new(FakeSheets::new());
    let ws = attach(&fake).await;
    ws.plan()
        .create_plan("T", "G", &[PhaseSpec::new("A", ["x", "y"])])
        .await
        .unwrap();

    ws.plan()
        .update_task("1.1", TaskUpdate::blocked("waiting"))
        .await
        .unwrap();
    assert!(ws.plan().get_review_tasks().await.unwrap().is_empty());
    let blocked = ws.plan().get_task("1.1").await.unwrap().unwrap();
    assert_eq!(blocked.blocked_reason.as_deref(), Some("waiting"));

    ws.plan()
        .update_task("1.1", TaskUpdate::review("check"))
        .await
        .unwrap();
    let review = ws.plan().get_review_tasks().await.unwrap();
    assert_eq!(review.len(), 1);
    assert_eq!(review[0].step, "1.1");
    assert_eq!(review[0].review_note.as_deref(), Some("check"));
    assert_eq!(review[0].blocked_reason, None);
}

#[tokio::test]
async fn test_done_records_completion_date() {
    let fake = Arc::new(column_layout_workspace());
    let ws = attach(&fake).await;

    let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
    let task = ws
        .plan()
        .update_task("1.2", TaskUpdate::done_on(date))
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Done);
    assert_eq!(task.completed_on, Some(date));
    let raw = ws.plan().get_raw().await.unwrap().unwrap();
    assert!(raw.contains("- [x] 1.2 Write parser (2026-02-03)\n"));

    let task = ws
        .plan()
        .update_task("2.1", TaskUpdate::done())
        .await
        .unwrap();
    assert_eq!(task.completed_on, Some(Utc::now().date_naive()));
}

#[tokio::test]
async fn test_resume_clears_annotation() {
    let fake = Arc::new(column_layout_workspace());
    let ws = attach(&fake).await;

    let task = ws
        .plan()
        .update_task("1.3", TaskUpdate::doing())
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Doing);
    assert_eq!(task.title, "Get credentials");
    assert!(
        ws.plan()
            .get_raw()
            .await
            .unwrap()
            .unwrap()
            .contains("- [/] 1.3 Get credentials\n")
    );
}

#[tokio::test]
async fn test_unknown_step_is_task_not_found() {
    let fake = Arc::new(column_layout_workspace());
    let ws = attach(&fake).await;
    fake.clear_calls();

    let err = ws
        .plan()
        .update_task("9.9", TaskUpdate::doing())
        .await
        .unwrap_err();
    match &err {
        WorkspaceError::TaskNotFound { step } => assert_eq!(step, "9.9"),
        other => panic!("unexpected error: {other:?}")
    }
    assert!(fake.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_strict_transitions_reject_skipping_doing() {
    let fake = Arc::new(column_layout_workspace());
    let mut config = WorkspaceConfig::default();
    config.plan.strict_transitions = true;
    let ws = attach_with(&fake, config).await;

    let err = ws
        .plan()
        .update_task("1.2", TaskUpdate::done())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkspaceError::Validation { .. }));

    let err = ws
        .plan()
        .update_task("1.1", TaskUpdate::doing())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkspaceError::Validation { .. }), "done is terminal");

    ws.plan()
        .update_task("1.2", TaskUpdate::doing())
        .await
        .unwrap();
    ws.plan()
        .update_task("1.2", TaskUpdate::review("ready"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_append_notes_extends_existing_section() {
    let fake = Arc::new(column_layout_workspace());
    let ws = attach(&fake).await;

    ws.plan().append_notes("- parser merged").await.unwrap();
    let plan = ws.plan().get_plan().await.unwrap().unwrap();

    assert_eq!(plan.notes, "- kickoff done\n- parser merged");
    assert!(plan.raw.starts_with(SAMPLE_PLAN.trim_end()));
}

#[tokio::test]
async fn test_append_notes_creates_section() {
    let fake = Arc::new(column_layout_workspace());
    let ws = attach(&fake).await;
    ws.plan()
        .set_raw("# Plan: X\n\n## Phase 1: A\n- [ ] 1.1 a\n")
        .await
        .unwrap();

    ws.plan().append_notes("remember the index").await.unwrap();
    assert_eq!(
        ws.plan().get_raw().await.unwrap().unwrap(),
        "# Plan: X\n\n## Phase 1: A\n- [ ] 1.1 a\n\n## Notes\nremember the index\n"
    );
}

#[tokio::test]
async fn test_missing_plan_marker_reads_as_no_plan() {
    let fake = Arc::new(column_layout_workspace());
    let ws = attach(&fake).await;
    fake.set_cell(BASE_SHEET, 1, 0, "");

    assert!(ws.plan().get_plan().await.unwrap().is_none());
    assert!(ws.plan().get_next_task().await.unwrap().is_none());
    assert!(ws.plan().get_review_tasks().await.unwrap().is_empty());
    assert_eq!(ws.plan().progress().await.unwrap().total(), 0);
    assert!(matches!(
        ws.plan().update_task("1.1", TaskUpdate::doing()).await,
        Err(WorkspaceError::TaskNotFound { .. })
    ));
}

#[tokio::test]
async fn test_oversized_plan_is_rejected_before_writing() {
    let fake = Arc::new(FakeSheets::new());
    let mut config = WorkspaceConfig::default();
    config.plan.max_document_chars = 256;
    let ws = attach_with(&fake, config).await;
    fake.clear_calls();

    let goal = "g".repeat(300);
    let err = ws
        .plan()
        .create_plan("T", &goal, &[PhaseSpec::new("A", ["x"])])
        .await
        .unwrap_err();
    assert!(matches!(err, WorkspaceError::Validation { .. }));
    assert!(fake.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_invalid_plan_input_is_rejected() {
    let fake = Arc::new(FakeSheets::new());
    let ws = attach(&fake).await;

    assert!(ws.plan().create_plan("", "G", &[]).await.is_err());
    assert!(
        ws.plan()
            .create_plan("T", "G", &[PhaseSpec::new("A", ["two\nlines"])])
            .await
            .is_err()
    );
    assert!(
        ws.plan()
            .update_task("1.1", TaskUpdate::blocked("multi\nline"))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_progress_counts_statuses() {
    let fake = Arc::new(column_layout_workspace());
    let ws = attach(&fake).await;

    let progress = ws.plan().progress().await.unwrap();
    assert_eq!(progress.done, 1);
    assert_eq!(progress.todo, 2);
    assert_eq!(progress.blocked, 1);
    assert_eq!(progress.total(), 4);
}

#[tokio::test]
async fn test_duplicate_step_ids_are_refused() {
    let fake = Arc::new(column_layout_workspace());
    let ws = attach(&fake).await;
    ws.plan()
        .set_raw("## Phase 1: A\n- [ ] 1.1 a\n- [ ] 1.1 again\n")
        .await
        .unwrap();

    let err = ws
        .plan()
        .update_task("1.1", TaskUpdate::doing())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkspaceError::Validation { .. }));
}

#[tokio::test]
async fn test_plan_serializes_for_tool_output() {
    let fake = Arc::new(column_layout_workspace());
    let ws = attach(&fake).await;

    let plan = ws.plan().get_plan().await.unwrap().unwrap();
    let json = serde_json::to_value(&plan).unwrap();

    assert_eq!(json["title"], "Ship the importer");
    let first = &json["phases"][0]["tasks"][0];
    assert_eq!(first["step"], "1.1");
    assert_eq!(first["status"], "done");
    assert_eq!(first["completed_on"], "2026-01-04");
    assert!(first.get("line").is_none());
    assert_eq!(json["phases"][0]["tasks"][2]["blocked_reason"], "waiting on ops");
}

#[tokio::test]
async fn test_titles_survive_blocking_and_resuming() {
    let fake = Arc::new(FakeSheets::new());
    let ws = attach(&fake).await;

    let err = ws
        .plan()
        .create_plan("T", "G", &[PhaseSpec::new("A", ["Bulk insert - fast path"])])
        .await
        .unwrap_err();
    assert!(matches!(err, WorkspaceError::Validation { .. }));

    ws.plan()
        .create_plan("T", "G", &[PhaseSpec::new("A", ["Bulk insert (fast path)"])])
        .await
        .unwrap();
    ws.plan()
        .update_task("1.1", TaskUpdate::doing())
        .await
        .unwrap();
    let blocked = ws
        .plan()
        .update_task("1.1", TaskUpdate::blocked("quota - retry tomorrow"))
        .await
        .unwrap();
    assert_eq!(blocked.title, "Bulk insert (fast path)");
    assert_eq!(blocked.blocked_reason.as_deref(), Some("quota - retry tomorrow"));

    let resumed = ws
        .plan()
        .update_task("1.1", TaskUpdate::doing())
        .await
        .unwrap();
    assert_eq!(resumed.title, "Bulk insert (fast path)");
    assert!(
        ws.plan()
            .get_raw()
            .await
            .unwrap()
            .unwrap()
            .contains("- [/] 1.1 Bulk insert (fast path)\n")
    );
}

#[tokio::test]
async fn test_hand_written_separator_title_is_not_annotated() {
    let fake = Arc::new(column_layout_workspace());
    let ws = attach(&fake).await;
    let raw = "## Phase 1: A\n- [/] 1.1 Bulk insert - fast path\n";
    ws.plan().set_raw(raw).await.unwrap();
    fake.clear_calls();

    for update in [TaskUpdate::blocked("quota"), TaskUpdate::review("check")] {
        let err = ws.plan().update_task("1.1", update).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::Validation { .. }));
    }
    assert!(fake.mutating_calls().is_empty());
    assert_eq!(ws.plan().get_raw().await.unwrap().as_deref(), Some(raw));
}

#[tokio::test]
async fn test_goal_cannot_inject_phases_or_tasks() {
    let fake = Arc::new(FakeSheets::new());
    let ws = attach(&fake).await;
    fake.clear_calls();

    for goal in [
        "Ship it\n## Phase 1: Old\n- [ ] 1.1 stale",
        "Ship it\n  * [x] 2.1 stale",
        "# Plan: other",
    ] {
        let err = ws
            .plan()
            .create_plan("T", goal, &[PhaseSpec::new("A", ["x"])])
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::Validation { .. }), "{goal}");
    }
    assert!(fake.mutating_calls().is_empty());

    let plan = ws
        .plan()
        .create_plan("T", "Ship it\n- keep the old ids", &[PhaseSpec::new("A", ["x", "y"])])
        .await
        .unwrap();
    let steps: Vec<_> = plan.tasks().map(|t| t.step.as_str()).collect();
    assert_eq!(steps, vec!["1.1", "1.2"]);
    assert_eq!(plan.goal, "Ship it\n- keep the old ids");
}

#[tokio::test]
async fn test_created_plan_matches_what_is_read_back() {
    let fake = Arc::new(FakeSheets::new());
    let ws = attach(&fake).await;

    let created = ws
        .plan()
        .create_plan(" T ", "  G  ", &[PhaseSpec::new(" A ", [" x ", "y  "])])
        .await
        .unwrap();
    let read = ws.plan().get_plan().await.unwrap().unwrap();

    assert_eq!(created, read);
    assert_eq!(read.phases[0].name, "A");
    let titles: Vec<_> = read.tasks().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["x", "y"]);
    assert!(read.raw.contains("- [ ] 1.1 x\n- [ ] 1.2 y\n"));
}
