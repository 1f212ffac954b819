use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn user_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handlers::register_user))
        .route("/{uid}", get(handlers::get_user).put(handlers::update_user))
        .route("/{uid}/push-token", put(handlers::register_push_token))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
