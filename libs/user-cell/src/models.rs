use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use doctor_cell::models::DoctorError;
use patient_cell::models::PatientError;
use shared_models::record::{read_enum, read_i64, read_string, Record, RecordError, RecordMap, SymbolicEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserRole {
    #[default]
    Patient,
    Doctor,
}

impl SymbolicEnum for UserRole {
    const KIND: &'static str = "user role";
    const VARIANTS: &'static [Self] = &[UserRole::Patient, UserRole::Doctor];

    fn name(&self) -> &'static str {
        match self {
            UserRole::Patient => "patient",
            UserRole::Doctor => "doctor",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for UserRole {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        UserRole::VARIANTS
            .iter()
            .copied()
            .find(|role| role.name().eq_ignore_ascii_case(&raw))
            .ok_or_else(|| serde::de::Error::custom(format!("unknown role '{}'", raw)))
    }
}

/// Account record shared by both roles.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: UserRole,
    pub profile_image_url: String,
    pub fcm_token: String,
    pub created_at: i64,
}

impl User {
    pub const COLLECTION: &'static str = "users";

    pub fn path(uid: &str) -> String {
        format!("{}/{}", Self::COLLECTION, uid)
    }
}

impl Record for User {
    fn key(&self) -> &str {
        &self.uid
    }

    fn to_map(&self) -> RecordMap {
        let mut map = RecordMap::new();
        map.insert("uid".into(), json!(self.uid));
        map.insert("name".into(), json!(self.name));
        map.insert("email".into(), json!(self.email));
        map.insert("phone".into(), json!(self.phone));
        map.insert("role".into(), json!(self.role.name()));
        map.insert("profileImageUrl".into(), json!(self.profile_image_url));
        map.insert("fcmToken".into(), json!(self.fcm_token));
        map.insert("createdAt".into(), json!(self.created_at));
        map
    }

    fn from_map(map: &RecordMap) -> Result<Self, RecordError> {
        Ok(Self {
            uid: read_string(map, "uid").into_inner(),
            name: read_string(map, "name").into_inner(),
            email: read_string(map, "email").into_inner(),
            phone: read_string(map, "phone").into_inner(),
            role: read_enum(map, "role").into_inner(),
            profile_image_url: read_string(map, "profileImageUrl").into_inner(),
            fcm_token: read_string(map, "fcmToken").into_inner(),
            created_at: read_i64(map, "createdAt").into_inner(),
        })
    }
}

// ==============================================================================
// REQUESTS
// ==============================================================================

/// Signup payload. The role-specific fields are used only for the matching
/// role and ignored otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    /// Defaults to the caller's uid.
    pub uid: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub role: UserRole,

    // Doctor
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub experience_years: Option<i64>,
    pub consultation_fee: Option<f64>,

    // Patient
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub profile_image_url: Option<String>,
}

impl UpdateUserRequest {
    pub fn to_patch(&self) -> RecordMap {
        let mut patch = RecordMap::new();
        let fields = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("profileImageUrl", &self.profile_image_url),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                patch.insert(key.into(), json!(value));
            }
        }
        patch
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushTokenRequest {
    pub token: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("User already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        UserError::DatabaseError(err.to_string())
    }
}

impl From<DoctorError> for UserError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::DatabaseError(msg) => UserError::DatabaseError(msg),
            other => UserError::ValidationError(other.to_string()),
        }
    }
}

impl From<PatientError> for UserError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::DatabaseError(msg) => UserError::DatabaseError(msg),
            other => UserError::ValidationError(other.to_string()),
        }
    }
}
