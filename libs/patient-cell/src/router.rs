use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{get_patient, update_patient};

pub fn patient_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/{uid}", get(get_patient).put(update_patient))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
