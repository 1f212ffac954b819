use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_utils::test_utils::{JwtTestUtils, MockDatabaseResponses, TestConfig, TestUser};
use user_cell::models::{UpdateUserRequest, UserError, UserRole};
use user_cell::router::user_routes;
use user_cell::services::UserService;

async fn mount_missing_user(server: &MockServer, uid: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/users/{}.json", uid)))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Null))
        .mount(server)
        .await;
}

async fn mount_put(server: &MockServer, node: &str, body: Value) {
    Mock::given(method("PUT"))
        .and(path(node.to_string()))
        .and(body_partial_json(body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn doctor_signup_creates_both_records() {
    let server = MockServer::start().await;
    mount_missing_user(&server, "doc-9").await;
    mount_put(&server, "/users/doc-9.json", json!({ "uid": "doc-9", "role": "doctor" })).await;
    mount_put(
        &server,
        "/doctors/doc-9.json",
        json!({ "uid": "doc-9", "specialization": "Cardiology", "consultationFee": 80.0, "isAvailable": true }),
    )
    .await;

    let config = TestConfig::with_database_url(&server.uri());
    let doctor = TestUser::with_id("doc-9", "doctor");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None);

    let body = json!({
        "name": "Zoe Quinn",
        "email": "Zoe@Example.com",
        "role": "doctor",
        "specialization": "Cardiology",
        "consultationFee": 80.0
    });
    let response = user_routes(config.to_state())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["user"]["role"], "doctor");
    assert_eq!(body["user"]["email"], "zoe@example.com");
}

#[tokio::test]
async fn patient_signup_creates_patient_profile() {
    let server = MockServer::start().await;
    mount_missing_user(&server, "pat-9").await;
    mount_put(&server, "/users/pat-9.json", json!({ "role": "patient" })).await;
    mount_put(&server, "/patients/pat-9.json", json!({ "uid": "pat-9", "dateOfBirth": "1991-02-03" })).await;

    let state = TestConfig::with_database_url(&server.uri()).to_state();
    let request = serde_json::from_value(json!({
        "name": "Grace",
        "email": "grace@example.com",
        "role": "patient",
        "dateOfBirth": "1991-02-03"
    }))
    .unwrap();

    let user = UserService::new(&state).register("pat-9", request, "token").await.unwrap();
    assert_eq!(user.role, UserRole::Patient);
}

#[tokio::test]
async fn duplicate_signup_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/u1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockDatabaseResponses::user_record("u1", "patient")))
        .mount(&server)
        .await;

    let state = TestConfig::with_database_url(&server.uri()).to_state();
    let request = serde_json::from_value(json!({
        "name": "Grace",
        "email": "grace@example.com",
        "role": "patient"
    }))
    .unwrap();

    let result = UserService::new(&state).register("u1", request, "token").await;
    assert_matches!(result, Err(UserError::AlreadyRegistered(_)));
}

#[tokio::test]
async fn signup_for_someone_else_is_forbidden() {
    let server = MockServer::start().await;
    let config = TestConfig::with_database_url(&server.uri());
    let caller = TestUser::patient("caller@example.com");
    let token = JwtTestUtils::create_test_token(&caller, &config.jwt_secret, None);

    let body = json!({ "uid": "victim", "name": "X", "email": "x@example.com", "role": "patient" });
    let response = user_routes(config.to_state())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
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
async fn update_mirrors_shared_fields_into_role_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/u1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockDatabaseResponses::user_record("u1", "patient")))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/users/u1.json"))
        .and(body_partial_json(json!({ "phone": "+15559999" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/patients/u1.json"))
        .and(body_partial_json(json!({ "phone": "+15559999" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let state = TestConfig::with_database_url(&server.uri()).to_state();
    let request = UpdateUserRequest {
        phone: Some("+15559999".to_string()),
        ..Default::default()
    };
    UserService::new(&state).update_profile("u1", request, "token").await.unwrap();
}

#[tokio::test]
async fn push_token_requires_existing_account() {
    let server = MockServer::start().await;
    mount_missing_user(&server, "ghost").await;

    let state = TestConfig::with_database_url(&server.uri()).to_state();
    let result = UserService::new(&state).register_push_token("ghost", "fcm-1", "token").await;
    assert_matches!(result, Err(UserError::NotFound));
}

#[tokio::test]
async fn push_token_is_patched_onto_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/u1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockDatabaseResponses::user_record("u1", "doctor")))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/users/u1.json"))
        .and(body_partial_json(json!({ "fcmToken": "fcm-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let state = TestConfig::with_database_url(&server.uri()).to_state();
    UserService::new(&state).register_push_token("u1", "fcm-1", "token").await.unwrap();
}
