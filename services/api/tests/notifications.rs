mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn admins_broadcast_to_an_audience() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.register("Alice", "alice@example.com").await;
    let carol = app.register("Carol", "carol@example.com").await;
    let bob = app.advisor("Bob", "bob@example.com").await;

    let announcement = json!({
        "title": "Maintenance",
        "message": "The service restarts tonight",
        "audience": "clients"
    });
    let (status, body) = app
        .post("/api/notifications/broadcast", &alice.token, announcement.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "This action requires the admin role");

    let (status, body) = app
        .post(
            "/api/notifications/broadcast",
            &admin.token,
            json!({ "title": "Hi", "message": "There", "audience": "everyone" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, body) = app
        .post("/api/notifications/broadcast", &admin.token, announcement)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], 2);

    let (_, inbox) = app.get("/api/notifications", &alice.token).await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0]["type"], "announcement");
    assert_eq!(inbox[0]["title"], "Maintenance");
    let (_, inbox) = app.get("/api/notifications", &bob.token).await;
    assert!(inbox.as_array().unwrap().is_empty());

    let (_, unread) = app.get("/api/notifications/unread-count", &carol.token).await;
    assert_eq!(unread["count"], 1);
}

#[tokio::test]
async fn inbox_operations_are_owner_scoped() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.register("Alice", "alice@example.com").await;
    let eve = app.register("Eve", "eve@example.com").await;

    for title in ["First", "Second"] {
        let (status, _) = app
            .post(
                "/api/notifications/broadcast",
                &admin.token,
                json!({ "title": title, "message": "Hello", "audience": "all" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, inbox) = app.get("/api/notifications", &alice.token).await;
    let first_id = inbox[1]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .put(&format!("/api/notifications/{}/read", first_id), &eve.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, read) = app
        .put(&format!("/api/notifications/{}/read", first_id), &alice.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["read"], true);

    let (_, unread_only) = app
        .get("/api/notifications?unreadOnly=true", &alice.token)
        .await;
    assert_eq!(unread_only.as_array().unwrap().len(), 1);

    let (_, changed) = app
        .put("/api/notifications/read-all", &alice.token, json!({}))
        .await;
    assert_eq!(changed["count"], 1);

    let (status, _) = app
        .delete(&format!("/api/notifications/{}", first_id), &alice.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, inbox) = app.get("/api/notifications", &alice.token).await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn only_admins_list_accounts() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let alice = app.register("Alice", "alice@example.com").await;
    app.advisor("Bob", "bob@example.com").await;

    let (status, _) = app.get("/api/admin/users", &alice.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = app.get("/api/admin/users", &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 3);

    let (_, advisors) = app.get("/api/admin/users?role=advisor", &admin.token).await;
    assert_eq!(advisors.as_array().unwrap().len(), 1);
    assert_eq!(advisors[0]["name"], "Bob");
}
