use axum::{
    body::Body,
    extract::{Extension, Path, State},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::handlers::get_appointment;
use appointment_cell::router::appointment_routes;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockDatabaseResponses, TestConfig, TestUser};

async fn mount_appointment(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/appointments/apt-1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockDatabaseResponses::appointment_record(
            "apt-1", "doc-1", "pat-1", "PENDING",
        )))
        .mount(server)
        .await;
}

#[tokio::test]
async fn strangers_cannot_read_an_appointment() {
    let server = MockServer::start().await;
    mount_appointment(&server).await;

    let state = TestConfig::with_database_url(&server.uri()).to_state();
    let stranger = TestUser::with_id("pat-2", "patient").to_auth_user("token");

    let result = get_appointment(State(state), Extension(stranger), Path("apt-1".to_string())).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn parties_can_read_an_appointment() {
    let server = MockServer::start().await;
    mount_appointment(&server).await;

    let state = TestConfig::with_database_url(&server.uri()).to_state();
    let doctor = TestUser::with_id("doc-1", "doctor").to_auth_user("token");

    let response = get_appointment(State(state), Extension(doctor), Path("apt-1".to_string()))
        .await
        .unwrap();
    assert_eq!(response.0["status"], "PENDING");
    assert_eq!(response.0["patientId"], "pat-1");
}

#[tokio::test]
async fn booking_a_taken_slot_is_a_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slots/doc-1/2030-05-20/slot_1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockDatabaseResponses::slot_record(
            "slot_1",
            "09:00",
            "09:30",
            Some("apt-9"),
        )))
        .mount(&server)
        .await;

    let config = TestConfig::with_database_url(&server.uri());
    let patient = TestUser::with_id("pat-1", "patient");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);

    let body = json!({ "doctorId": "doc-1", "date": "2030-05-20", "slotId": "slot_1" });
    let response = appointment_routes(config.to_state())
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

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().unwrap().contains("slot_1"));
}

#[tokio::test]
async fn patients_cannot_book_for_someone_else() {
    let server = MockServer::start().await;
    let config = TestConfig::with_database_url(&server.uri());
    let patient = TestUser::with_id("pat-1", "patient");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);

    let body = json!({ "doctorId": "doc-1", "patientId": "pat-2", "date": "2030-05-20", "slotId": "slot_1" });
    let response = appointment_routes(config.to_state())
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
async fn unknown_status_filter_is_a_bad_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/appointments.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let config = TestConfig::with_database_url(&server.uri());
    let doctor = TestUser::with_id("doc-1", "doctor");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None);

    let response = appointment_routes(config.to_state())
        .oneshot(
            Request::builder()
                .uri("/doctors/doc-1?status=rescheduled")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unsafe_ids_are_bad_requests() {
    let server = MockServer::start().await;
    let config = TestConfig::with_database_url(&server.uri());
    let admin = TestUser::admin("ops@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, None);
    let app = appointment_routes(config.to_state());

    let body = json!({ "doctorId": "doc-1", "patientId": "pat-1", "date": "2030-05-20", "slotId": "slot_1/isBooked" });
    let response = app
        .clone()
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
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    for uri in ["/patients/pat.1", "/doctors/doc%2F1", "/apt.1"] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }

    assert!(server.received_requests().await.unwrap().is_empty());
}
