//! Rutas de la API
//!
//! Todo lo que cuelga de `/api` pasa por el middleware JWT.

pub mod appointment_routes;
pub mod teacher_routes;

use axum::{middleware::from_fn_with_state, response::Json, routing::get, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::middleware::{auth_middleware, cors_middleware, cors_middleware_with_origins};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/teacher", teacher_routes::create_teacher_router())
        .nest("/appointments", appointment_routes::create_appointment_router())
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let cors = if state.config.is_development() {
        cors_middleware()
    } else {
        cors_middleware_with_origins(&state.config.cors_origins)
    };

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
