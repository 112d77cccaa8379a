mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn client_connects_to_an_advisor() {
    let app = TestApp::spawn().await;
    let alice = app.register("Alice", "alice@example.com").await;
    let bob = app.advisor("Bob", "bob@example.com").await;

    let (status, advisors) = app.get("/api/advisors?specialization=tax", &alice.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(advisors.as_array().unwrap().len(), 1);
    assert_eq!(advisors[0]["id"], bob.id.as_str());

    // Only advisors can be connected to.
    let (status, body) = app
        .post(&format!("/api/advisors/{}/connect", alice.id), &bob.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Advisor not found");

    let connect_uri = format!("/api/advisors/{}/connect", bob.id);
    let (status, request) = app
        .post(&connect_uri, &alice.token, json!({ "message": "Can you help with taxes?" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["status"], "pending");

    let (status, body) = app.post(&connect_uri, &alice.token, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "pending");

    let (status, incoming) = app.get("/api/advisors/requests/incoming", &bob.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(incoming.as_array().unwrap().len(), 1);

    // Clients cannot answer requests addressed to someone else.
    let respond_uri = format!("/api/advisors/requests/{}", request["id"].as_str().unwrap());
    let (status, _) = app
        .put(&respond_uri, &alice.token, json!({ "status": "accepted" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(&respond_uri, &bob.token, json!({ "status": "maybe" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Status must be 'accepted' or 'rejected'");

    let (status, answered) = app
        .put(&respond_uri, &bob.token, json!({ "status": "accepted" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answered["status"], "accepted");

    let (_, me) = app.get("/api/auth/me", &alice.token).await;
    assert_eq!(me["connectedAdvisor"], bob.id.as_str());
    let (status, advisor) = app.get("/api/advisors/my/advisor", &alice.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(advisor["id"], bob.id.as_str());
    let (_, clients) = app.get("/api/advisors/my/clients", &bob.token).await;
    assert_eq!(clients[0]["id"], alice.id.as_str());

    let (_, unread) = app.get("/api/notifications/unread-count", &alice.token).await;
    assert_eq!(unread["count"], 1);

    let (status, _) = app.delete("/api/advisors/my/advisor", &alice.token).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.get("/api/advisors/my/advisor", &alice.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No advisor connected");
}

#[tokio::test]
async fn advice_request_lifecycle() {
    let app = TestApp::spawn().await;
    let alice = app.register("Alice", "alice@example.com").await;
    let bob = app.advisor("Bob", "bob@example.com").await;
    let eve = app.register("Eve", "eve@example.com").await;

    let (status, request) = app
        .post(
            "/api/requests",
            &alice.token,
            json!({ "advisorId": bob.id, "topic": "Retirement", "description": "Where do I start?" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["status"], "Pending");
    let id = request["id"].as_str().unwrap().to_string();

    let (status, _) = app.get(&format!("/api/requests/{}", id), &eve.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The client cannot accept their own request.
    let accept_uri = format!("/api/requests/{}/accept", id);
    let (status, _) = app.put(&accept_uri, &alice.token, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, accepted) = app.put(&accept_uri, &bob.token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "Accepted");

    let (status, _) = app.put(&accept_uri, &bob.token, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The first message starts the work.
    let (status, message) = app
        .post(
            "/api/messages",
            &alice.token,
            json!({ "requestId": id, "content": "Thanks for taking this" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, current) = app.get(&format!("/api/requests/{}", id), &alice.token).await;
    assert_eq!(current["status"], "In Progress");

    let (_, unread) = app.get("/api/messages/unread-count", &bob.token).await;
    assert_eq!(unread["count"], 1);
    let (status, marked) = app
        .put(&format!("/api/messages/request/{}/read", id), &bob.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["count"], 1);

    // Only the sender may edit a message.
    let message_uri = format!("/api/messages/{}", message["id"].as_str().unwrap());
    let (status, _) = app
        .put(&message_uri, &bob.token, json!({ "content": "changed" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, edited) = app
        .put(&message_uri, &alice.token, json!({ "content": "Thank you!" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["content"], "Thank you!");
    assert!(!edited["editedAt"].is_null());

    // Meetings must be in the future.
    let (status, _) = app
        .post(
            "/api/meetings",
            &bob.token,
            json!({ "requestId": id, "dateTime": Utc::now() - Duration::hours(1) }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, meeting) = app
        .post(
            "/api/meetings",
            &bob.token,
            json!({ "requestId": id, "dateTime": Utc::now() + Duration::days(2), "durationMinutes": 45 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(meeting["status"], "Scheduled");
    let (_, meetings) = app.get("/api/meetings", &alice.token).await;
    assert_eq!(meetings.as_array().unwrap().len(), 1);

    // Private notes stay with their author.
    let (status, _) = app
        .post("/api/notes", &bob.token, json!({ "requestId": id, "content": "Risk averse" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, alice_notes) = app.get(&format!("/api/notes/request/{}", id), &alice.token).await;
    assert!(alice_notes.as_array().unwrap().is_empty());
    let (_, bob_notes) = app.get(&format!("/api/notes/request/{}", id), &bob.token).await;
    assert_eq!(bob_notes.as_array().unwrap().len(), 1);

    let (status, closed) = app
        .put(&format!("/api/requests/{}/status", id), &bob.token, json!({ "status": "Closed" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["status"], "Closed");

    let (status, body) = app
        .post("/api/messages", &alice.token, json!({ "requestId": id, "content": "One more thing" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no longer accepts messages"));

    // A closed thread is frozen.
    let (status, _) = app
        .put(&message_uri, &alice.token, json!({ "content": "Edited after closing" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.delete(&message_uri, &alice.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let meeting_uri = format!("/api/meetings/{}", meeting["id"].as_str().unwrap());
    let (status, _) = app
        .put(&meeting_uri, &bob.token, json!({ "dateTime": Utc::now() + Duration::days(3) }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_a_request_hides_it_per_side() {
    let app = TestApp::spawn().await;
    let alice = app.register("Alice", "alice@example.com").await;
    let bob = app.advisor("Bob", "bob@example.com").await;

    let (_, request) = app
        .post(
            "/api/requests",
            &alice.token,
            json!({ "advisorId": bob.id, "topic": "Budgeting", "description": "Monthly plan" }),
        )
        .await;
    let uri = format!("/api/requests/{}", request["id"].as_str().unwrap());

    let (status, body) = app.put(&uri, &alice.token, json!({ "topic": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Topic is required");

    let (status, _) = app.delete(&uri, &alice.token).await;
    assert_eq!(status, StatusCode::OK);
    let (_, mine) = app.get("/api/requests", &alice.token).await;
    assert!(mine.as_array().unwrap().is_empty());
    let (_, theirs) = app.get("/api/requests", &bob.token).await;
    assert_eq!(theirs.as_array().unwrap().len(), 1);

    let (status, _) = app.delete(&uri, &bob.token).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&uri, &bob.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unread_count_skips_requests_deleted_by_the_reader() {
    let app = TestApp::spawn().await;
    let alice = app.register("Alice", "alice@example.com").await;
    let bob = app.advisor("Bob", "bob@example.com").await;

    let (_, request) = app
        .post(
            "/api/requests",
            &alice.token,
            json!({ "advisorId": bob.id, "topic": "Savings", "description": "Emergency fund" }),
        )
        .await;
    let id = request["id"].as_str().unwrap().to_string();
    let (status, _) = app
        .put(&format!("/api/requests/{}/accept", id), &bob.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .post("/api/messages", &alice.token, json!({ "requestId": id, "content": "Hello" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, unread) = app.get("/api/messages/unread-count", &bob.token).await;
    assert_eq!(unread["count"], 1);

    let (status, _) = app.delete(&format!("/api/requests/{}", id), &bob.token).await;
    assert_eq!(status, StatusCode::OK);
    let (_, unread) = app.get("/api/messages/unread-count", &bob.token).await;
    assert_eq!(unread["count"], 0);
}
