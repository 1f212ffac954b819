use serde_json::Value;
use tracing::{debug, info};

use shared_database::{AppState, RealtimeDatabase};
use shared_models::record::{decode_children, Record};
use shared_utils::validation::validate_phone;

use crate::models::{Doctor, DoctorError, DoctorListQuery, UpdateDoctorRequest};

pub struct DoctorService {
    db: RealtimeDatabase,
}

impl DoctorService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
        }
    }

    pub async fn get_doctor(&self, uid: &str, auth_token: &str) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor profile: {}", uid);

        let node = self
            .db
            .get(&Doctor::path(uid), Some(auth_token))
            .await?
            .filter(|node| node.is_object())
            .ok_or(DoctorError::NotFound)?;

        Doctor::from_value(&node).map_err(|e| DoctorError::DatabaseError(e.to_string()))
    }

    /// Writes the full profile, used at signup.
    pub async fn save_doctor(&self, doctor: &Doctor, auth_token: &str) -> Result<(), DoctorError> {
        if doctor.uid.is_empty() {
            return Err(DoctorError::ValidationError("Doctor uid must not be empty".to_string()));
        }
        self.db
            .put(&Doctor::path(&doctor.uid), Some(auth_token), doctor.to_value())
            .await?;
        info!("Doctor profile stored: {}", doctor.uid);
        Ok(())
    }

    pub async fn list_doctors(
        &self,
        query: &DoctorListQuery,
        auth_token: &str,
    ) -> Result<Vec<Doctor>, DoctorError> {
        let children = match &query.specialization {
            Some(specialization) => {
                self.db
                    .query_equal(Doctor::COLLECTION, "specialization", specialization, Some(auth_token))
                    .await?
            }
            None => self.db.children(Doctor::COLLECTION, Some(auth_token)).await?,
        };

        let mut doctors: Vec<Doctor> = decode_children(children);
        if query.available_only == Some(true) {
            doctors.retain(|doctor| doctor.is_available);
        }
        doctors.sort_by(|a, b| a.name.cmp(&b.name));

        debug!("Listed {} doctors", doctors.len());
        Ok(doctors)
    }

    pub async fn update_doctor(
        &self,
        uid: &str,
        request: UpdateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        if let Some(phone) = &request.phone {
            if !validate_phone(phone) {
                return Err(DoctorError::ValidationError(format!("Invalid phone number: {}", phone)));
            }
        }
        if matches!(request.consultation_fee, Some(fee) if !(fee >= 0.0)) {
            return Err(DoctorError::ValidationError("Consultation fee must be non-negative".to_string()));
        }
        if matches!(request.experience_years, Some(years) if years < 0) {
            return Err(DoctorError::ValidationError("Experience must be non-negative".to_string()));
        }

        // Existence check keeps PATCH from creating a stray node.
        let current = self.get_doctor(uid, auth_token).await?;

        let patch = request.to_patch();
        if patch.is_empty() {
            return Ok(current);
        }

        self.db
            .patch(&Doctor::path(uid), Some(auth_token), Value::Object(patch))
            .await?;

        info!("Doctor profile updated: {}", uid);
        self.get_doctor(uid, auth_token).await
    }
}
