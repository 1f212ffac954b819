use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{PushTokenRequest, RegisterUserRequest, UpdateUserRequest, UserError};
use crate::services::UserService;

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => AppError::NotFound(err.to_string()),
            UserError::AlreadyRegistered(_) => AppError::Conflict(err.to_string()),
            UserError::ValidationError(_) => AppError::ValidationError(err.to_string()),
            UserError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

fn ensure_self_or_admin(user: &AuthUser, uid: &str) -> Result<(), AppError> {
    if user.can_act_for(uid) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not authorized to access this user".to_string()))
    }
}

#[axum::debug_handler]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<Json<Value>, AppError> {
    let uid = request.uid.clone().unwrap_or_else(|| user.id.clone());
    ensure_self_or_admin(&user, &uid)?;

    let service = UserService::new(&state);

    let created = service.register(&uid, request, &user.token).await?;

    Ok(Json(json!({
        "success": true,
        "user": created
    })))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
) -> Result<Json<Value>, AppError> {
    ensure_self_or_admin(&user, &uid)?;

    let service = UserService::new(&state);

    let found = service.get(&uid, &user.token).await?;

    Ok(Json(json!(found)))
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_self_or_admin(&user, &uid)?;

    let service = UserService::new(&state);

    let updated = service.update_profile(&uid, request, &user.token).await?;

    Ok(Json(json!(updated)))
}

#[axum::debug_handler]
pub async fn register_push_token(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(uid): Path<String>,
    Json(request): Json<PushTokenRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_self_or_admin(&user, &uid)?;

    let service = UserService::new(&state);

    service.register_push_token(&uid, &request.token, &user.token).await?;

    Ok(Json(json!({ "success": true })))
}
