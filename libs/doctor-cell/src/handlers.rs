use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::auth::AuthUser;
use shared_models::dates::normalize_day;
use shared_models::error::AppError;

use crate::models::{DoctorError, DoctorListQuery, ScheduleRequest, SlotQuery, UpdateDoctorRequest};
use crate::services::{DoctorService, ScheduleService};

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound | DoctorError::SlotNotFound => AppError::NotFound(err.to_string()),
            DoctorError::SlotAlreadyBooked(_) | DoctorError::DayHasBookings(_) => {
                AppError::Conflict(err.to_string())
            }
            DoctorError::InvalidDate(_) | DoctorError::ValidationError(_) => {
                AppError::ValidationError(err.to_string())
            }
            DoctorError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

fn ensure_self_or_admin(user: &AuthUser, doctor_id: &str) -> Result<(), AppError> {
    if user.can_act_for(doctor_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not authorized to modify this doctor".to_string()))
    }
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let doctors = service.list_doctors(&query, &user.token).await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let doctor = service.get_doctor(&doctor_id, &user.token).await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(doctor_id): Path<String>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_self_or_admin(&user, &doctor_id)?;

    let service = DoctorService::new(&state);

    let doctor = service.update_doctor(&doctor_id, request, &user.token).await?;

    Ok(Json(json!(doctor)))
}

/// Generates the bookable slots of one day. Hours and interval default to
/// the configured working day.
#[axum::debug_handler]
pub async fn setup_schedule(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(doctor_id): Path<String>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_self_or_admin(&user, &doctor_id)?;

    let config = &state.config;
    let start_hour = request.start_hour.unwrap_or(config.workday_start_hour);
    let end_hour = request.end_hour.unwrap_or(config.workday_end_hour);
    let interval = request.interval_minutes.unwrap_or(config.slot_interval_minutes);

    let service = ScheduleService::new(&state);

    let slots = service
        .setup_day(&doctor_id, &request.date, start_hour, end_hour, interval, &user.token)
        .await?;

    Ok(Json(json!({
        "success": true,
        "date": normalize_day(&request.date).into_inner(),
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((doctor_id, date)): Path<(String, String)>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let date = normalize_day(&date)
        .value()
        .ok_or(DoctorError::InvalidDate(date))?;

    let service = ScheduleService::new(&state);

    let slots = if query.available_only.unwrap_or(false) {
        service.available_slots(&doctor_id, &date, &user.token).await?
    } else {
        service.list_slots(&doctor_id, &date, &user.token).await?
    };

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": date,
        "slots": slots,
        "total": slots.len()
    })))
}
