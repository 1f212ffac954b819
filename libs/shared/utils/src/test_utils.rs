use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::AppState;
use shared_models::auth::AuthUser;

pub struct TestConfig {
    pub jwt_secret: String,
    pub database_url: String,
    pub database_secret: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            database_url: "http://localhost:9000".to_string(),
            database_secret: String::new(),
        }
    }
}

impl TestConfig {
    /// Points the database client at a mock server.
    pub fn with_database_url(url: &str) -> Self {
        Self {
            database_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_url: self.database_url.clone(),
            database_secret: self.database_secret.clone(),
            auth_jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_state(&self) -> Arc<AppState> {
        Arc::new(AppState::new(self.to_app_config()))
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn with_id(id: &str, role: &str) -> Self {
        Self {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_auth_user(&self, token: &str) -> AuthUser {
        AuthUser {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            token: token.to_string(),
            issued_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Snapshots shaped like what the realtime database returns for each record.
pub struct MockDatabaseResponses;

impl MockDatabaseResponses {
    pub fn user_record(uid: &str, role: &str) -> serde_json::Value {
        json!({
            "uid": uid,
            "name": "Test User",
            "email": format!("{}@example.com", uid),
            "phone": "+15550100",
            "role": role,
            "profileImageUrl": "",
            "fcmToken": "",
            "createdAt": 1_700_000_000_000i64
        })
    }

    pub fn doctor_record(uid: &str, name: &str, fee: f64) -> serde_json::Value {
        json!({
            "uid": uid,
            "name": name,
            "email": format!("{}@example.com", uid),
            "phone": "+15550101",
            "specialization": "General Practice",
            "qualification": "MBBS",
            "experienceYears": 10,
            "consultationFee": fee,
            "about": "Experienced physician",
            "profileImageUrl": "",
            "rating": 4.5,
            "isAvailable": true,
            "createdAt": 1_700_000_000_000i64
        })
    }

    pub fn patient_record(uid: &str, name: &str) -> serde_json::Value {
        json!({
            "uid": uid,
            "name": name,
            "email": format!("{}@example.com", uid),
            "phone": "+15550102",
            "dateOfBirth": "1990-04-12",
            "gender": "Female",
            "bloodGroup": "O+",
            "address": "1 Main Street",
            "emergencyContact": "+15550199",
            "createdAt": 1_700_000_000_000i64
        })
    }

    pub fn slot_record(id: &str, start: &str, end: &str, appointment_id: Option<&str>) -> serde_json::Value {
        json!({
            "id": id,
            "startTime": start,
            "endTime": end,
            "isBooked": appointment_id.is_some(),
            "appointmentId": appointment_id
        })
    }

    pub fn appointment_record(id: &str, doctor_id: &str, patient_id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "doctorId": doctor_id,
            "doctorName": "Dr. Test",
            "patientId": patient_id,
            "patientName": "Test Patient",
            "date": "2030-05-20",
            "startTime": "09:00",
            "endTime": "09:30",
            "fee": 50.0,
            "status": status,
            "symptoms": "Headache",
            "createdAt": 1_700_000_000_000i64,
            "updatedAt": 1_700_000_000_000i64
        })
    }

    pub fn notification_record(id: &str, kind: &str, is_read: bool, timestamp: i64) -> serde_json::Value {
        json!({
            "id": id,
            "title": "Appointment update",
            "message": "Your appointment changed",
            "type": kind,
            "relatedId": null,
            "isRead": is_read,
            "timestamp": timestamp
        })
    }
}
