use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use uuid::Uuid;

use crate::controllers::appointment_controller::AppointmentController;
use crate::dto::appointment_dto::{
    AppointmentResponse, CreateAppointmentRequest, EditAppointmentRequest,
};
use crate::dto::ApiResponse;
use crate::services::Booker;
use crate::state::AppState;
use crate::utils::errors::AppError;

type AppointmentJson = Result<Json<ApiResponse<AppointmentResponse>>, AppError>;

pub fn create_appointment_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route(
            "/:id",
            get(get_appointment)
                .post(edit_appointment)
                .delete(delete_appointment),
        )
        .route("/:id/approve", post(approve_appointment))
}

async fn list_appointments(
    State(state): State<AppState>,
    Extension(booker): Extension<Booker>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<ApiResponse<Vec<AppointmentResponse>>>, AppError> {
    let controller = AppointmentController::new(state);
    let response = controller
        .list(&booker, &params, Utc::now().naive_utc())
        .await?;
    Ok(Json(response))
}

async fn get_appointment(
    State(state): State<AppState>,
    Extension(booker): Extension<Booker>,
    Path(id): Path<Uuid>,
) -> AppointmentJson {
    let controller = AppointmentController::new(state);
    Ok(Json(controller.get(&booker, id).await?))
}

async fn create_appointment(
    State(state): State<AppState>,
    Extension(booker): Extension<Booker>,
    Json(request): Json<CreateAppointmentRequest>,
) -> AppointmentJson {
    let controller = AppointmentController::new(state);
    let response = controller
        .create(&booker, request, Utc::now().naive_utc())
        .await?;
    Ok(Json(response))
}

async fn edit_appointment(
    State(state): State<AppState>,
    Extension(booker): Extension<Booker>,
    Path(id): Path<Uuid>,
    Json(request): Json<EditAppointmentRequest>,
) -> AppointmentJson {
    let controller = AppointmentController::new(state);
    let response = controller
        .edit(&booker, id, request, Utc::now().naive_utc())
        .await?;
    Ok(Json(response))
}

async fn delete_appointment(
    State(state): State<AppState>,
    Extension(booker): Extension<Booker>,
    Path(id): Path<Uuid>,
) -> AppointmentJson {
    let controller = AppointmentController::new(state);
    Ok(Json(controller.delete(&booker, id).await?))
}

async fn approve_appointment(
    State(state): State<AppState>,
    Extension(booker): Extension<Booker>,
    Path(id): Path<Uuid>,
) -> AppointmentJson {
    let controller = AppointmentController::new(state);
    Ok(Json(controller.approve(booker.as_teacher()?, id).await?))
}
