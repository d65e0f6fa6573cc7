//! Integration tests for NotionService against the in-process fake Notion API.
//!
//! Each test spawns the fake on 127.0.0.1:0 and exercises the client through the
//! full request/response cycle.

use chrono::{DateTime, Utc};
use prlink_core::record::{CreatePrRecord, UpdatePrRecord};
use prlink_core::schema::RecordSchema;
use prlink_core::PrState;
use prlink_service::test_helpers::{spawn_fake_notion, FakeNotion};
use prlink_service::{Lookup, NotionService, RecordService, ServiceError};

const TOKEN: &str = "secret_test";
const PR_DB: &str = "pr-db";
const TASK_DB: &str = "task-db";

async fn setup() -> (FakeNotion, NotionService) {
    let fake = spawn_fake_notion(TOKEN).await;
    let svc = NotionService::new(&fake.base_url, TOKEN.into(), RecordSchema::default());
    (fake, svc)
}

fn pr_input(number: u64) -> CreatePrRecord {
    CreatePrRecord {
        number,
        title: "Add search".into(),
        url: format!("https://github.com/acme/app/pull/{number}"),
        state: PrState::Open,
        author: Some("octocat".into()),
        created_at: Some(
            DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        ),
        task_page_id: None,
    }
}

// ---- PR records ----

#[tokio::test]
async fn create_then_find_round_trips() {
    let (_fake, svc) = setup().await;
    let mut input = pr_input(12);
    input.task_page_id = Some("task-page-1".into());

    let created = svc.create_pr(PR_DB, &input).await.unwrap();
    let fetched = svc.find_pr_by_number(PR_DB, 12).await.found().unwrap();

    assert_eq!(fetched, created);
    assert_eq!(fetched.number, 12);
    assert_eq!(fetched.title, "#12 Add search");
    assert_eq!(fetched.state, Some(PrState::Open));
    assert_eq!(fetched.author.as_deref(), Some("octocat"));
    assert_eq!(fetched.created_at, input.created_at);
    assert_eq!(fetched.related_task_ids, vec!["task-page-1".to_string()]);
    assert!(fetched.url.starts_with("https://www.notion.so/"));
}

#[tokio::test]
async fn find_missing_pr_is_not_found() {
    let (_fake, svc) = setup().await;
    svc.create_pr(PR_DB, &pr_input(1)).await.unwrap();
    assert_eq!(svc.find_pr_by_number(PR_DB, 2).await, Lookup::NotFound);
    // other databases are not searched
    assert_eq!(svc.find_pr_by_number("other-db", 1).await, Lookup::NotFound);
}

#[tokio::test]
async fn find_pr_error_becomes_failed() {
    let (fake, svc) = setup().await;
    fake.state.lock().unwrap().fail_queries = true;
    let lookup = svc.find_pr_by_number(PR_DB, 1).await;
    assert!(matches!(lookup, Lookup::Failed(_)), "got {lookup:?}");
}

#[tokio::test]
async fn bad_token_fails_lookup() {
    let fake = spawn_fake_notion(TOKEN).await;
    let svc = NotionService::new(&fake.base_url, "wrong".into(), RecordSchema::default());
    let lookup = svc.find_pr_by_number(PR_DB, 1).await;
    match lookup {
        Lookup::Failed(reason) => assert!(reason.contains("API token is invalid")),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn create_failure_propagates_api_message() {
    let (fake, svc) = setup().await;
    fake.state.lock().unwrap().fail_writes = true;
    let err = svc.create_pr(PR_DB, &pr_input(3)).await.unwrap_err();
    match err {
        ServiceError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "fake create failure");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn create_rejects_empty_title() {
    let (fake, svc) = setup().await;
    let mut input = pr_input(3);
    input.title = String::new();
    let err = svc.create_pr(PR_DB, &input).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
    assert_eq!(fake.create_count(), 0);
}

#[tokio::test]
async fn update_sets_relation() {
    let (fake, svc) = setup().await;
    let created = svc.create_pr(PR_DB, &pr_input(4)).await.unwrap();
    assert!(created.related_task_ids.is_empty());

    let updated = svc
        .update_pr(&created.id, &UpdatePrRecord::relation("task-page-2"))
        .await
        .unwrap();
    assert!(updated.is_linked_to("task-page-2"));

    // setting it again leaves the same state
    let again = svc
        .update_pr(&created.id, &UpdatePrRecord::relation("task-page-2"))
        .await
        .unwrap();
    assert_eq!(again.related_task_ids, updated.related_task_ids);
    assert_eq!(fake.update_count(), 2);
}

#[tokio::test]
async fn update_unknown_page_is_not_found() {
    let (_fake, svc) = setup().await;
    let err = svc
        .update_pr("missing", &UpdatePrRecord::relation("t"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn find_or_create_is_idempotent() {
    let (fake, svc) = setup().await;
    let first = svc.find_or_create_pr(PR_DB, &pr_input(9)).await.unwrap();
    let second = svc.find_or_create_pr(PR_DB, &pr_input(9)).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(fake.create_count(), 1);
    assert_eq!(fake.update_count(), 0);
    assert_eq!(fake.state.lock().unwrap().pages_in(PR_DB).len(), 1);
}

#[tokio::test]
async fn find_or_create_refreshes_state() {
    let (fake, svc) = setup().await;
    svc.find_or_create_pr(PR_DB, &pr_input(10)).await.unwrap();

    let mut merged = pr_input(10);
    merged.state = PrState::Merged;
    let record = svc.find_or_create_pr(PR_DB, &merged).await.unwrap();

    assert_eq!(record.state, Some(PrState::Merged));
    assert_eq!(fake.create_count(), 1);
    assert_eq!(fake.update_count(), 1);
    let (_, body) = fake.state.lock().unwrap().updates[0].clone();
    let props = body["properties"].as_object().unwrap();
    assert_eq!(props.len(), 1, "only the changed field is sent");
    assert!(props.contains_key("State"));
}

// ---- Task records ----

#[tokio::test]
async fn find_task_by_unique_id() {
    let (fake, svc) = setup().await;
    let page_id = fake.seed_task(TASK_DB, "TASK", 40, "Build search");

    let task = svc
        .find_task_by_identifier(TASK_DB, "TASK-40")
        .await
        .found()
        .unwrap();
    assert_eq!(task.id, page_id);
    assert_eq!(task.title, "Build search");
    assert_eq!(task.identifier.as_deref(), Some("TASK-40"));

    let queries = fake.state.lock().unwrap().queries.clone();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["filter"]["unique_id"]["equals"], 40);
}

#[tokio::test]
async fn find_task_rejects_prefix_collision() {
    let (fake, svc) = setup().await;
    fake.seed_task(TASK_DB, "BUG", 40, "Fix crash");

    let lookup = svc.find_task_by_identifier(TASK_DB, "TASK-40").await;
    assert_eq!(lookup, Lookup::NotFound);
}

#[tokio::test]
async fn find_task_picks_exact_prefix_among_candidates() {
    let (fake, svc) = setup().await;
    fake.seed_task(TASK_DB, "BUG", 40, "Fix crash");
    let wanted = fake.seed_task(TASK_DB, "TASK", 40, "Build search");

    let task = svc
        .find_task_by_identifier(TASK_DB, "TASK-40")
        .await
        .found()
        .unwrap();
    assert_eq!(task.id, wanted);
}

#[tokio::test]
async fn find_task_falls_back_to_text_for_non_numeric_id() {
    let (fake, svc) = setup().await;
    let page_id = fake.seed_text_task(TASK_DB, "DOCS-intro", "Write intro");
    fake.seed_text_task(TASK_DB, "DOCS-intro-2", "Write more");

    let task = svc
        .find_task_by_identifier(TASK_DB, "DOCS-intro")
        .await
        .found()
        .unwrap();
    assert_eq!(task.id, page_id);

    let queries = fake.state.lock().unwrap().queries.clone();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["filter"]["rich_text"]["contains"], "DOCS-intro");
}

#[tokio::test]
async fn find_task_falls_back_when_unique_id_rejected() {
    let (fake, svc) = setup().await;
    fake.state.lock().unwrap().reject_unique_id = true;
    let page_id = fake.seed_text_task(TASK_DB, "TASK-7", "Text id task");
    fake.seed_text_task(TASK_DB, "TASK-70", "Longer id task");

    let task = svc
        .find_task_by_identifier(TASK_DB, "TASK-7")
        .await
        .found()
        .unwrap();
    assert_eq!(task.id, page_id);
    assert_eq!(fake.state.lock().unwrap().queries.len(), 2);
}

#[tokio::test]
async fn find_task_error_becomes_failed() {
    let (fake, svc) = setup().await;
    fake.state.lock().unwrap().fail_queries = true;
    let lookup = svc.find_task_by_identifier(TASK_DB, "TASK-1").await;
    assert!(matches!(lookup, Lookup::Failed(_)));
}
