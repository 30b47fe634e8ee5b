//! End-to-end tests: `BoardStore` over `HttpRemote` against a mock board
//! service.

use std::sync::Arc;

use serde_json::{Value, json};
use taskboard::board::{BoardStore, HttpRemote, SyncStatus};
use taskboard::config::RemoteConfig;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const BASE: &str = "/webhook/board";

fn endpoint(name: &str) -> String {
    format!("{}/{}", BASE, name)
}

async fn mount_board(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(endpoint("projects")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "title": "Launch", "status": "active", "columns": "[]"},
            {"id": 2, "title": "Old", "status": "inactive"}
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(endpoint("tasks/count")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "1": {"total": 2, "byColumn": {"10": 1, "11": 1}, "byPriority": {"high": 1}}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(endpoint("columns")))
        .and(query_param("projectId", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 11, "title": "Done", "position": 1, "completed": "Sim"},
            {"id": 10, "title": "Todo", "position": 0, "completed": "Não"},
            {"id": 12, "title": "", "position": 2}
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(endpoint("tasks")))
        .and(query_param("projectId", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 100,
                "columnId": 10,
                "content": "Write brief",
                "priority": "high",
                "assignee": "Ana",
                "tags": "[{\"id\":\"t1\",\"name\":\"copy\",\"color\":\"#f97316\"}]",
                "position": 0
            },
            {
                "id": 101,
                "column_id": "10",
                "title": "Book venue",
                "tag": "logistics",
                "created_by": "Bruno",
                "position": "1"
            },
            {
                "id": 102,
                "columnId": 11,
                "content": "Kickoff",
                "position": 0
            },
            {"id": 103, "columnId": 99, "content": "Orphan", "position": 0}
        ])))
        .mount(server)
        .await;
}

async fn store_for(server: &MockServer) -> BoardStore {
    let remote = HttpRemote::new(&RemoteConfig {
        base_url: format!("{}{}", server.uri(), BASE),
        timeout_secs: 5,
        token: None,
    })
    .unwrap();
    let store = BoardStore::new(Arc::new(remote), "Ana");
    store.load_projects().await.unwrap();
    store.set_active_project(Some("1")).unwrap();
    store.load_board("1").await.unwrap();
    store
}

async fn posted(server: &MockServer, name: &str) -> Vec<Value> {
    let target = endpoint(name);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r: &&Request| r.url.path() == target)
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

fn ok_mock(name: &str, body: Value) -> Mock {
    Mock::given(method("POST"))
        .and(path(endpoint(name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
}

#[tokio::test]
async fn test_load_normalizes_legacy_shapes() {
    let server = MockServer::start().await;
    mount_board(&server).await;
    let store = store_for(&server).await;

    let state = store.snapshot();
    assert_eq!(state.projects.len(), 1);
    let project = state.project("1").unwrap();
    let columns: Vec<(&str, bool)> = project
        .columns
        .iter()
        .map(|c| (c.id.as_str(), c.is_done))
        .collect();
    assert_eq!(columns, vec![("10", false), ("11", true)]);

    let todo = &project.columns[0];
    assert_eq!(todo.tasks.len(), 2);
    assert_eq!(todo.tasks[0].tags[0].name, "copy");
    assert_eq!(todo.tasks[1].content, "Book venue");
    assert_eq!(todo.tasks[1].tags[0].name, "logistics");
    assert_eq!(todo.tasks[1].assignee, "Bruno");
    assert!(state.find_task("103").is_none());

    let progress = store.project_progress("1").unwrap();
    assert_eq!(progress.percent, 50);
}

#[tokio::test]
async fn test_reload_is_idempotent() {
    let server = MockServer::start().await;
    mount_board(&server).await;
    let store = store_for(&server).await;

    let first = store.snapshot();
    store.load_board("1").await.unwrap();
    assert_eq!(store.snapshot(), first);
}

#[tokio::test]
async fn test_cross_column_move_sends_column_then_positions() {
    let server = MockServer::start().await;
    mount_board(&server).await;
    ok_mock("tasks/update", json!({})).mount(&server).await;
    ok_mock("activity/create", json!({})).mount(&server).await;
    let store = store_for(&server).await;

    store.move_task("100", "102", "10", "11").await.unwrap();

    let updates = posted(&server, "tasks/update").await;
    assert_eq!(updates[0], json!({"id": "100", "columnId": "11"}));
    assert_eq!(
        &updates[1..],
        &[
            json!({"id": "101", "position": 0}),
            json!({"id": "100", "position": 0}),
            json!({"id": "102", "position": 1}),
        ]
    );

    let activity = posted(&server, "activity/create").await;
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0]["description"], "moved task to Done");
    assert_eq!(activity[0]["user"], "Ana");

    let state = store.snapshot();
    let (_, column, task) = state.find_task("100").unwrap();
    assert_eq!(column.id, "11");
    assert_eq!(task.sync_status(), SyncStatus::Synced);
}

#[tokio::test]
async fn test_failed_column_create_keeps_temp_column() {
    let server = MockServer::start().await;
    mount_board(&server).await;
    Mock::given(method("POST"))
        .and(path(endpoint("columns/create")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let store = store_for(&server).await;

    let id = store.add_column().await.unwrap();
    assert!(id.starts_with("temp-"));

    let created = posted(&server, "columns/create").await;
    assert_eq!(created[0]["completed"], "Não");
    assert_eq!(created[0]["position"], 2);
    assert_eq!(created[0]["projectId"], "1");

    let state = store.snapshot();
    let (_, column) = state.find_column(&id).unwrap();
    assert_eq!(column.sync_status(), SyncStatus::Error);
}

#[tokio::test]
async fn test_add_task_replaces_temp_id_and_saves_checklist() {
    let server = MockServer::start().await;
    mount_board(&server).await;
    ok_mock("tasks/create", json!([{"id": 555}]))
        .mount(&server)
        .await;
    ok_mock("tasks/checklist", json!({})).mount(&server).await;
    let store = store_for(&server).await;

    let draft = taskboard::board::TaskDraft {
        content: "Print flyers".into(),
        checklist: vec![taskboard::board::ChecklistItem {
            id: "check-0".into(),
            text: "get quotes".into(),
            completed: false,
        }],
        ..Default::default()
    };
    let id = store.add_task("10", draft).await.unwrap();
    assert_eq!(id, "555");

    let created = posted(&server, "tasks/create").await;
    assert_eq!(created[0]["assignee"], "Ana");
    assert_eq!(created[0]["position"], 2);
    let checklist = posted(&server, "tasks/checklist").await;
    assert_eq!(checklist[0]["taskId"], "555");

    let state = store.snapshot();
    let (_, _, task) = state.find_task("555").unwrap();
    assert_eq!(task.sync_status(), SyncStatus::Synced);
}

#[tokio::test]
async fn test_failed_delete_restores_task_on_refetch() {
    let server = MockServer::start().await;
    mount_board(&server).await;
    Mock::given(method("POST"))
        .and(path(endpoint("tasks/delete")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let store = store_for(&server).await;

    store.delete_task("101").await.unwrap();
    assert!(store.snapshot().find_task("101").is_some());
}
