use serde_json::{json, Value};
use tracing::{debug, info, warn};

use doctor_cell::models::Doctor;
use doctor_cell::services::DoctorService;
use patient_cell::models::Patient;
use patient_cell::services::PatientService;
use shared_database::{AppState, RealtimeDatabase};
use shared_models::dates::{now_millis, parse_day};
use shared_models::record::Record;
use shared_utils::validation::{validate_email, validate_phone, validate_uid};

use crate::models::{RegisterUserRequest, UpdateUserRequest, User, UserError, UserRole};

pub struct UserService {
    db: RealtimeDatabase,
    doctors: DoctorService,
    patients: PatientService,
}

impl UserService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            doctors: DoctorService::new(state),
            patients: PatientService::new(state),
        }
    }

    /// Creates the account record and the role-specific profile under the
    /// same uid.
    pub async fn register(
        &self,
        uid: &str,
        request: RegisterUserRequest,
        auth_token: &str,
    ) -> Result<User, UserError> {
        validate_registration(uid, &request)?;

        if self.db.get(&User::path(uid), Some(auth_token)).await?.is_some() {
            return Err(UserError::AlreadyRegistered(uid.to_string()));
        }

        let created_at = now_millis();
        let user = User {
            uid: uid.to_string(),
            name: request.name.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            phone: request.phone.clone(),
            role: request.role,
            profile_image_url: String::new(),
            fcm_token: String::new(),
            created_at,
        };

        self.db
            .put(&User::path(uid), Some(auth_token), user.to_value())
            .await?;

        match user.role {
            UserRole::Doctor => {
                let doctor = Doctor {
                    uid: user.uid.clone(),
                    name: user.name.clone(),
                    email: user.email.clone(),
                    phone: user.phone.clone(),
                    specialization: request.specialization.unwrap_or_default(),
                    qualification: request.qualification.unwrap_or_default(),
                    experience_years: request.experience_years.unwrap_or_default(),
                    consultation_fee: request.consultation_fee.unwrap_or_default(),
                    is_available: true,
                    created_at,
                    ..Default::default()
                };
                self.doctors.save_doctor(&doctor, auth_token).await?;
            }
            UserRole::Patient => {
                let patient = Patient {
                    uid: user.uid.clone(),
                    name: user.name.clone(),
                    email: user.email.clone(),
                    phone: user.phone.clone(),
                    date_of_birth: request.date_of_birth.unwrap_or_default(),
                    gender: request.gender.unwrap_or_default(),
                    created_at,
                    ..Default::default()
                };
                self.patients.save_patient(&patient, auth_token).await?;
            }
        }

        info!("Registered {} account {}", user.role, user.uid);
        Ok(user)
    }

    pub async fn get(&self, uid: &str, auth_token: &str) -> Result<User, UserError> {
        debug!("Fetching user: {}", uid);

        let node = self
            .db
            .get(&User::path(uid), Some(auth_token))
            .await?
            .filter(|node| node.is_object())
            .ok_or(UserError::NotFound)?;

        User::from_value(&node).map_err(|e| UserError::DatabaseError(e.to_string()))
    }

    pub async fn update_profile(
        &self,
        uid: &str,
        request: UpdateUserRequest,
        auth_token: &str,
    ) -> Result<User, UserError> {
        if let Some(phone) = &request.phone {
            if !validate_phone(phone) {
                return Err(UserError::ValidationError(format!("Invalid phone number: {}", phone)));
            }
        }
        if matches!(&request.name, Some(name) if name.trim().is_empty()) {
            return Err(UserError::ValidationError("Name must not be empty".to_string()));
        }

        let current = self.get(uid, auth_token).await?;

        let patch = request.to_patch();
        if patch.is_empty() {
            return Ok(current);
        }

        self.db
            .patch(&User::path(uid), Some(auth_token), Value::Object(patch.clone()))
            .await?;

        // Keep the role profile's copy of the shared fields in step.
        let profile_patch: serde_json::Map<String, Value> = patch
            .into_iter()
            .filter(|(key, _)| key == "name" || key == "phone")
            .collect();
        if !profile_patch.is_empty() {
            let profile_path = match current.role {
                UserRole::Doctor => Doctor::path(uid),
                UserRole::Patient => Patient::path(uid),
            };
            if let Err(e) = self
                .db
                .patch(&profile_path, Some(auth_token), Value::Object(profile_patch))
                .await
            {
                warn!("Failed to mirror profile update for {}: {}", uid, e);
            }
        }

        info!("User profile updated: {}", uid);
        self.get(uid, auth_token).await
    }

    pub async fn register_push_token(
        &self,
        uid: &str,
        push_token: &str,
        auth_token: &str,
    ) -> Result<(), UserError> {
        if push_token.trim().is_empty() {
            return Err(UserError::ValidationError("Push token must not be empty".to_string()));
        }

        // Ensures the account exists before writing a partial node.
        self.get(uid, auth_token).await?;

        self.db
            .patch(&User::path(uid), Some(auth_token), json!({ "fcmToken": push_token }))
            .await?;

        debug!("Push token registered for {}", uid);
        Ok(())
    }
}

fn validate_registration(uid: &str, request: &RegisterUserRequest) -> Result<(), UserError> {
    if !validate_uid(uid) {
        return Err(UserError::ValidationError(format!("Invalid uid: '{}'", uid)));
    }
    if request.name.trim().is_empty() {
        return Err(UserError::ValidationError("Name must not be empty".to_string()));
    }
    if !validate_email(request.email.trim()) {
        return Err(UserError::ValidationError(format!("Invalid email: {}", request.email)));
    }
    if !validate_phone(&request.phone) {
        return Err(UserError::ValidationError(format!("Invalid phone number: {}", request.phone)));
    }
    if let Some(dob) = &request.date_of_birth {
        if parse_day(dob).is_none() {
            return Err(UserError::ValidationError(format!(
                "Invalid date of birth: '{}' (expected YYYY-MM-DD)",
                dob
            )));
        }
    }
    if request.consultation_fee.is_some_and(|fee| fee < 0.0) {
        return Err(UserError::ValidationError("Consultation fee must not be negative".to_string()));
    }
    if request.experience_years.is_some_and(|years| years < 0) {
        return Err(UserError::ValidationError("Experience years must not be negative".to_string()));
    }
    Ok(())
}
