use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{PatientError, UpdatePatientRequest};
use crate::services::PatientService;

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppError::NotFound(err.to_string()),
            PatientError::ValidationError(msg) => AppError::ValidationError(msg),
            PatientError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

/// Patients read their own profile; doctors may read any patient they treat.
#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !user.can_act_for(&uid) && !user.is_doctor() {
        return Err(AppError::Forbidden("Not authorized to view this patient".to_string()));
    }

    let service = PatientService::new(&state);

    let patient = service.get_patient(&uid, &user.token).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.can_act_for(&uid) {
        return Err(AppError::Forbidden("Not authorized to modify this patient".to_string()));
    }

    let service = PatientService::new(&state);

    let patient = service.update_patient(&uid, request, &user.token).await?;

    Ok(Json(json!(patient)))
}
