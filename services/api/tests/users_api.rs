mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::GET, "/api/user/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let request = axum::http::Request::builder()
        .uri("/api/user/me")
        .header("Authorization", "Bearer not-a-token")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_user_is_idempotent() {
    let app = TestApp::new();
    let user_id = Uuid::new_v4();
    let body = json!({ "userId": user_id, "email": "alex@dorm.test", "name": "Alex" });

    let (first, created) = app.post("/api/registerUser", user_id, body.clone()).await;
    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(created["name"], "Alex");
    assert_eq!(created["aura"], 0);
    assert!(created["roomId"].is_null());

    let (second, existing) = app.post("/api/registerUser", user_id, body).await;
    assert_eq!(second, StatusCode::OK);
    assert_eq!(existing["id"], created["id"]);
    assert_eq!(app.db.user_count(), 1);
}

#[tokio::test]
async fn test_register_defaults_name_to_email_local_part() {
    let app = TestApp::new();
    let user_id = Uuid::new_v4();
    let (status, user) = app
        .post(
            "/api/registerUser",
            user_id,
            json!({ "userId": user_id, "email": "sam.lee@dorm.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["name"], "sam.lee");
}

#[tokio::test]
async fn test_register_rejects_someone_elses_id() {
    let app = TestApp::new();
    let caller = Uuid::new_v4();
    let (status, _) = app
        .post(
            "/api/registerUser",
            caller,
            json!({ "userId": Uuid::new_v4(), "email": "x@dorm.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.db.user_count(), 0);
}

#[tokio::test]
async fn test_unregistered_caller_is_forbidden() {
    let app = TestApp::new();
    let (status, _) = app.get("/api/user/me", Uuid::new_v4()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_manual_aura_adjustment_is_recorded() {
    let app = TestApp::new();
    let (_, users) = app.room_with(&["Alex", "Bo"]).await;
    let (alex, bo) = (users[0], users[1]);

    let (status, updated) = app
        .patch(
            "/api/user/aura",
            alex,
            json!({ "userId": bo, "auraChange": 5, "reason": "cleaned the fridge" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["aura"], 5);

    let (status, history) = app.get("/api/user/aura", bo).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["reason"], "cleaned the fridge");
    assert_eq!(history[0]["change"], 5);
}

#[tokio::test]
async fn test_aura_adjustment_validation() {
    let app = TestApp::new();
    let (_, users) = app.room_with(&["Alex"]).await;
    let outsider = app.register("Casey").await;

    let (status, _) = app
        .patch("/api/user/aura", users[0], json!({ "userId": users[0], "auraChange": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch("/api/user/aura", users[0], json!({ "userId": outsider, "auraChange": 3 }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.db.user(outsider).aura, 0);
}
