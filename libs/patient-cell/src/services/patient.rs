use serde_json::Value;
use tracing::{debug, info};

use shared_database::{AppState, RealtimeDatabase};
use shared_models::dates::parse_day;
use shared_models::record::Record;
use shared_utils::validation::validate_phone;

use crate::models::{Patient, PatientError, UpdatePatientRequest};

pub struct PatientService {
    db: RealtimeDatabase,
}

impl PatientService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
        }
    }

    pub async fn get_patient(&self, uid: &str, auth_token: &str) -> Result<Patient, PatientError> {
        debug!("Fetching patient profile: {}", uid);

        let node = self
            .db
            .get(&Patient::path(uid), Some(auth_token))
            .await?
            .filter(|node| node.is_object())
            .ok_or(PatientError::NotFound)?;

        Patient::from_value(&node).map_err(|e| PatientError::DatabaseError(e.to_string()))
    }

    pub async fn save_patient(&self, patient: &Patient, auth_token: &str) -> Result<(), PatientError> {
        if patient.uid.is_empty() {
            return Err(PatientError::ValidationError("Patient uid must not be empty".to_string()));
        }
        self.db
            .put(&Patient::path(&patient.uid), Some(auth_token), patient.to_value())
            .await?;
        info!("Patient profile stored: {}", patient.uid);
        Ok(())
    }

    pub async fn update_patient(
        &self,
        uid: &str,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        if let Some(phone) = &request.phone {
            if !validate_phone(phone) {
                return Err(PatientError::ValidationError(format!("Invalid phone number: {}", phone)));
            }
        }
        if let Some(dob) = &request.date_of_birth {
            if parse_day(dob).is_none() {
                return Err(PatientError::ValidationError(format!(
                    "Invalid date of birth: '{}' (expected YYYY-MM-DD)",
                    dob
                )));
            }
        }

        let current = self.get_patient(uid, auth_token).await?;

        let patch = request.to_patch();
        if patch.is_empty() {
            return Ok(current);
        }

        self.db
            .patch(&Patient::path(uid), Some(auth_token), Value::Object(patch))
            .await?;

        info!("Patient profile updated: {}", uid);
        self.get_patient(uid, auth_token).await
    }
}
