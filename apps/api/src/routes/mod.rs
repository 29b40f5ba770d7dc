pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::chat::handlers;
use crate::errors::AppError;
use crate::state::AppState;

async fn invalid_request() -> Result<(), AppError> {
    Err(AppError::Validation("Invalid request".to_string()))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/chat",
            post(handlers::handle_chat).fallback(invalid_request),
        )
        .with_state(state)
}
