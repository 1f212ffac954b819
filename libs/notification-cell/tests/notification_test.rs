use std::collections::HashMap;

use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::models::{NotificationChannel, NotificationError, NotificationType};
use notification_cell::router::notification_routes;
use notification_cell::services::NotificationService;
use shared_models::record::RecordError;
use shared_utils::test_utils::{JwtTestUtils, MockDatabaseResponses, TestConfig, TestUser};

fn push_data(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[tokio::test]
async fn inbox_is_newest_first_and_skips_unknown_types() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/p1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "n1": MockDatabaseResponses::notification_record("n1", "APPOINTMENT_BOOKED", true, 1_000),
            "n2": MockDatabaseResponses::notification_record("n2", "APPOINTMENT_CONFIRMED", false, 3_000),
            "n3": MockDatabaseResponses::notification_record("n3", "SOMETHING_NEW", false, 2_000)
        })))
        .mount(&server)
        .await;

    let state = TestConfig::with_database_url(&server.uri()).to_state();
    let service = NotificationService::new(&state);

    let inbox = service.list("p1", "token").await.unwrap();
    let ids: Vec<&str> = inbox.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["n2", "n1"]);

    assert_eq!(service.unread_count("p1", "token").await.unwrap(), 1);
}

#[tokio::test]
async fn mark_read_patches_the_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/p1/n1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockDatabaseResponses::notification_record(
            "n1",
            "APPOINTMENT_CONFIRMED",
            false,
            1_000,
        )))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/notifications/p1/n1.json"))
        .and(body_partial_json(json!({ "isRead": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "isRead": true })))
        .expect(1)
        .mount(&server)
        .await;

    let state = TestConfig::with_database_url(&server.uri()).to_state();
    let notification = NotificationService::new(&state).mark_read("p1", "n1", "token").await.unwrap();
    assert!(notification.is_read);
}

#[tokio::test]
async fn mark_read_of_missing_notification_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/p1/ghost.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Null))
        .mount(&server)
        .await;

    let state = TestConfig::with_database_url(&server.uri()).to_state();
    let result = NotificationService::new(&state).mark_read("p1", "ghost", "token").await;
    assert_matches!(result, Err(NotificationError::NotFound));
}

#[tokio::test]
async fn push_with_unknown_type_is_rejected_before_writing() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let state = TestConfig::with_database_url(&server.uri()).to_state();
    let result = NotificationService::new(&state)
        .ingest_push("p1", &push_data(&[("type", "appointment_booked")]), "token")
        .await;

    assert_matches!(
        result,
        Err(NotificationError::Decode(RecordError::UnknownVariant { .. }))
    );
}

#[tokio::test]
async fn push_is_stored_and_dispatched() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/notifications/p1/[0-9a-f-]+\.json$"))
        .and(body_partial_json(json!({ "type": "APPOINTMENT_REMINDER", "isRead": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let state = TestConfig::with_database_url(&server.uri()).to_state();
    let dispatched = NotificationService::new(&state)
        .ingest_push(
            "p1",
            &push_data(&[
                ("type", "APPOINTMENT_REMINDER"),
                ("title", "Tomorrow"),
                ("message", "Dr. Zoe at 09:00"),
                ("relatedId", "apt-1"),
            ]),
            "token",
        )
        .await
        .unwrap();

    assert_eq!(dispatched.channel, NotificationChannel::Reminders);
    assert_eq!(dispatched.notification.kind, NotificationType::AppointmentReminder);
    assert_eq!(dispatched.notification.related_id.as_deref(), Some("apt-1"));
}

#[tokio::test]
async fn push_route_rejects_other_recipients() {
    let server = MockServer::start().await;
    let config = TestConfig::with_database_url(&server.uri());
    let patient = TestUser::patient("grace@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);

    let body = json!({ "recipientId": "someone-else", "data": { "type": "GENERAL" } });
    let response = notification_routes(config.to_state())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/push")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn push_route_reports_bad_type_as_bad_request() {
    let server = MockServer::start().await;
    let config = TestConfig::with_database_url(&server.uri());
    let patient = TestUser::patient("grace@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);

    let body = json!({ "data": { "type": "Reminder" } });
    let response = notification_routes(config.to_state())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/push")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn inbox_route_requires_a_token() {
    let server = MockServer::start().await;
    let response = notification_routes(TestConfig::with_database_url(&server.uri()).to_state())
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn inbox_keeps_entries_stored_without_a_type() {
    let server = MockServer::start().await;
    let mut untyped = MockDatabaseResponses::notification_record("n1", "GENERAL", false, 1_000);
    untyped.as_object_mut().unwrap().remove("type");
    Mock::given(method("GET"))
        .and(path("/notifications/p1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "n1": untyped })))
        .mount(&server)
        .await;

    let state = TestConfig::with_database_url(&server.uri()).to_state();
    let inbox = NotificationService::new(&state).list("p1", "token").await.unwrap();

    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].id, "n1");
    assert_eq!(inbox[0].kind, NotificationType::AppointmentBooked);
}
