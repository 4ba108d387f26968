mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{id_of, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_create_and_list_tasks() {
    let app = TestApp::new();
    let (room_id, users) = app.room_with(&["Alex", "Bo"]).await;

    let (status, task) = app
        .post(
            "/api/tasks",
            users[0],
            json!({ "taskName": "Vacuum", "assignedUserId": users[1], "priority": "high" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["title"], "Vacuum");
    assert_eq!(task["auraPoints"], 10);
    assert_eq!(task["priority"], "high");
    assert_eq!(task["completed"], false);
    assert_eq!(task["roomId"], room_id.to_string());

    let (status, tasks) = app.get("/api/tasks", users[1]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tasks.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_task_validation() {
    let app = TestApp::new();
    let (_, users) = app.room_with(&["Alex"]).await;
    let outsider = app.register("Casey").await;

    let (status, _) = app.post("/api/tasks", users[0], json!({ "taskName": " " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/api/tasks", users[0], json!({ "taskName": "Dishes", "auraPoints": -1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/api/tasks", users[0], json!({ "taskName": "Dishes", "assignedUserId": outsider }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/api/tasks", outsider, json!({ "taskName": "Dishes" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_completing_and_reopening_moves_aura() {
    let app = TestApp::new();
    let (_, users) = app.room_with(&["Alex", "Bo"]).await;
    let bo = users[1];

    let (_, task) = app
        .post(
            "/api/tasks",
            users[0],
            json!({ "title": "Trash", "assignedUserId": bo, "auraPoints": 15 }),
        )
        .await;
    let task_id = id_of(&task);

    let (status, done) = app
        .patch(
            "/api/tasks",
            users[0],
            json!({ "taskId": task_id, "updates": { "completed": true } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["completed"], true);
    assert!(done["completedAt"].is_string());
    assert_eq!(app.db.user(bo).aura, 15);

    // Completing again changes nothing.
    app.patch(
        "/api/tasks",
        users[0],
        json!({ "taskId": task_id, "updates": { "completed": true } }),
    )
    .await;
    assert_eq!(app.db.user(bo).aura, 15);

    let (status, reopened) = app
        .patch(
            "/api/tasks",
            bo,
            json!({ "taskId": task_id, "updates": { "completed": false } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(reopened["completedAt"].is_null());
    assert_eq!(app.db.user(bo).aura, 0);
    assert_eq!(app.db.aura_events(bo).len(), 2);
}

#[tokio::test]
async fn test_late_completion_awards_half() {
    let app = TestApp::new();
    let (_, users) = app.room_with(&["Alex"]).await;
    let alex = users[0];
    let yesterday = Utc::now() - Duration::days(1);

    let (_, task) = app
        .post(
            "/api/tasks",
            alex,
            json!({ "taskName": "Laundry", "assignedUserId": alex, "auraPoints": 15, "dueDate": yesterday }),
        )
        .await;
    app.patch(
        "/api/tasks",
        alex,
        json!({ "taskId": id_of(&task), "updates": { "completed": true } }),
    )
    .await;
    assert_eq!(app.db.user(alex).aura, 7);
}

#[tokio::test]
async fn test_unassigned_completion_awards_nothing() {
    let app = TestApp::new();
    let (_, users) = app.room_with(&["Alex"]).await;
    let (_, task) = app.post("/api/tasks", users[0], json!({ "taskName": "Mop" })).await;

    let (status, _) = app
        .patch(
            "/api/tasks",
            users[0],
            json!({ "taskId": id_of(&task), "updates": { "completed": true } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.db.user(users[0]).aura, 0);
    assert!(app.db.aura_events(users[0]).is_empty());
}

#[tokio::test]
async fn test_partial_update_distinguishes_null_from_absent() {
    let app = TestApp::new();
    let (_, users) = app.room_with(&["Alex"]).await;
    let (_, task) = app
        .post(
            "/api/tasks",
            users[0],
            json!({ "taskName": "Fridge", "notes": "top shelf", "assignedUserId": users[0] }),
        )
        .await;
    let task_id = id_of(&task);

    let (_, renamed) = app
        .patch(
            "/api/tasks",
            users[0],
            json!({ "taskId": task_id, "updates": { "title": "Clean fridge" } }),
        )
        .await;
    assert_eq!(renamed["title"], "Clean fridge");
    assert_eq!(renamed["notes"], "top shelf");
    assert_eq!(renamed["assignedUserId"], users[0].to_string());

    let (_, cleared) = app
        .patch(
            "/api/tasks",
            users[0],
            json!({ "taskId": task_id, "updates": { "notes": null, "assignedUserId": null } }),
        )
        .await;
    assert!(cleared["notes"].is_null());
    assert!(cleared["assignedUserId"].is_null());
    assert_eq!(cleared["title"], "Clean fridge");
}

#[tokio::test]
async fn test_delete_task() {
    let app = TestApp::new();
    let (_, users) = app.room_with(&["Alex"]).await;
    let (_, others) = app.room_with(&["Casey"]).await;
    let (_, task) = app.post("/api/tasks", users[0], json!({ "taskName": "Dust" })).await;
    let uri = format!("/api/tasks?taskId={}", id_of(&task));

    let (status, _) = app.delete(&uri, others[0]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, users[0]).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.delete(&uri, users[0]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
