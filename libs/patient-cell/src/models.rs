use serde::{Deserialize, Serialize};
use serde_json::json;

use shared_models::dates::normalize_day;
use shared_models::record::{read_i64, read_string, Record, RecordError, RecordMap};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// `YYYY-MM-DD`, or empty when unknown.
    pub date_of_birth: String,
    pub gender: String,
    pub blood_group: String,
    pub address: String,
    pub emergency_contact: String,
    pub created_at: i64,
}

impl Patient {
    pub const COLLECTION: &'static str = "patients";

    pub fn path(uid: &str) -> String {
        format!("{}/{}", Self::COLLECTION, uid)
    }
}

impl Record for Patient {
    fn key(&self) -> &str {
        &self.uid
    }

    fn to_map(&self) -> RecordMap {
        let mut map = RecordMap::new();
        map.insert("uid".into(), json!(self.uid));
        map.insert("name".into(), json!(self.name));
        map.insert("email".into(), json!(self.email));
        map.insert("phone".into(), json!(self.phone));
        map.insert("dateOfBirth".into(), json!(self.date_of_birth));
        map.insert("gender".into(), json!(self.gender));
        map.insert("bloodGroup".into(), json!(self.blood_group));
        map.insert("address".into(), json!(self.address));
        map.insert("emergencyContact".into(), json!(self.emergency_contact));
        map.insert("createdAt".into(), json!(self.created_at));
        map
    }

    fn from_map(map: &RecordMap) -> Result<Self, RecordError> {
        Ok(Self {
            uid: read_string(map, "uid").into_inner(),
            name: read_string(map, "name").into_inner(),
            email: read_string(map, "email").into_inner(),
            phone: read_string(map, "phone").into_inner(),
            date_of_birth: normalize_day(&read_string(map, "dateOfBirth").into_inner()).into_inner(),
            gender: read_string(map, "gender").into_inner(),
            blood_group: read_string(map, "bloodGroup").into_inner(),
            address: read_string(map, "address").into_inner(),
            emergency_contact: read_string(map, "emergencyContact").into_inner(),
            created_at: read_i64(map, "createdAt").into_inner(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
}

impl UpdatePatientRequest {
    pub fn to_patch(&self) -> RecordMap {
        let mut patch = RecordMap::new();
        let fields = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("dateOfBirth", &self.date_of_birth),
            ("gender", &self.gender),
            ("bloodGroup", &self.blood_group),
            ("address", &self.address),
            ("emergencyContact", &self.emergency_contact),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                patch.insert(key.into(), json!(value));
            }
        }
        patch
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for PatientError {
    fn from(err: anyhow::Error) -> Self {
        PatientError::DatabaseError(err.to_string())
    }
}
