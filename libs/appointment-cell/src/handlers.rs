// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_models::record::SymbolicEnum;

use crate::models::{Appointment, AppointmentError, AppointmentListQuery, AppointmentStatus, BookAppointmentRequest};
use crate::services::AppointmentBookingService;

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound
            | AppointmentError::SlotNotFound
            | AppointmentError::PatientNotFound
            | AppointmentError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::SlotAlreadyBooked(_) | AppointmentError::InvalidStatusTransition { .. } => {
                AppError::Conflict(err.to_string())
            }
            AppointmentError::Unauthorized => AppError::Forbidden(err.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

fn filter_by_status(
    appointments: Vec<Appointment>,
    query: &AppointmentListQuery,
) -> Result<Vec<Appointment>, AppError> {
    match &query.status {
        Some(raw) => {
            let status = AppointmentStatus::from_name(&raw.to_uppercase())?;
            Ok(appointments.into_iter().filter(|a| a.status == status).collect())
        }
        None => Ok(appointments),
    }
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Patients book for themselves; admins may book on behalf of anyone.
    let patient_id = request.patient_id.clone().unwrap_or_else(|| user.id.clone());
    if !user.can_act_for(&patient_id) {
        return Err(AppError::Forbidden("Not authorized to book for this patient".to_string()));
    }

    let service = AppointmentBookingService::new(&state);

    let appointment = service.book_appointment(&patient_id, request, token).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);

    let appointment = service.get_for_user(&appointment_id, &user).await?;

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// STATUS TRANSITIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);

    let appointment = service.confirm_appointment(&appointment_id, &user).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);

    let appointment = service.complete_appointment(&appointment_id, &user).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);

    let appointment = service.cancel_appointment(&appointment_id, &user).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

// ==============================================================================
// LISTINGS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(patient_id): Path<String>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    if !user.can_act_for(&patient_id) {
        return Err(AppError::Forbidden("Not authorized to view these appointments".to_string()));
    }

    let service = AppointmentBookingService::new(&state);

    let appointments = service.get_patient_appointments(&patient_id, &user.token).await?;
    let appointments = filter_by_status(appointments, &query)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(doctor_id): Path<String>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    if !user.can_act_for(&doctor_id) {
        return Err(AppError::Forbidden("Not authorized to view these appointments".to_string()));
    }

    let service = AppointmentBookingService::new(&state);

    let appointments = service.get_doctor_appointments(&doctor_id, &user.token).await?;
    let appointments = filter_by_status(appointments, &query)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}
