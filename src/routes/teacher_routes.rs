use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use uuid::Uuid;

use crate::controllers::teacher_controller::TeacherController;
use crate::dto::availability_dto::AvailableHoursRequest;
use crate::dto::work_hours_dto::{ReplaceWorkHoursRequest, WorkDaysQuery};
use crate::dto::ApiResponse;
use crate::models::WorkHours;
use crate::services::Booker;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_teacher_router() -> Router<AppState> {
    Router::new()
        .route("/:teacher_id/available_hours", post(available_hours))
        .route("/work_days", get(work_days).post(replace_work_days))
        .route("/work_days/:id", delete(delete_work_day))
}

async fn available_hours(
    State(state): State<AppState>,
    Extension(booker): Extension<Booker>,
    Path(teacher_id): Path<Uuid>,
    Json(request): Json<AvailableHoursRequest>,
) -> Result<Json<ApiResponse<Vec<[String; 2]>>>, AppError> {
    let controller = TeacherController::new(state);
    let response = controller
        .available_hours(&booker, teacher_id, request, Utc::now().naive_utc())
        .await?;
    Ok(Json(response))
}

async fn work_days(
    State(state): State<AppState>,
    Extension(booker): Extension<Booker>,
    Query(query): Query<WorkDaysQuery>,
) -> Result<Json<ApiResponse<Vec<WorkHours>>>, AppError> {
    let controller = TeacherController::new(state);
    let response = controller.work_days(booker.as_teacher()?, query).await?;
    Ok(Json(response))
}

async fn replace_work_days(
    State(state): State<AppState>,
    Extension(booker): Extension<Booker>,
    Json(request): Json<ReplaceWorkHoursRequest>,
) -> Result<Json<ApiResponse<Vec<WorkHours>>>, AppError> {
    let controller = TeacherController::new(state);
    let response = controller
        .replace_work_days(booker.as_teacher()?, request)
        .await?;
    Ok(Json(response))
}

async fn delete_work_day(
    State(state): State<AppState>,
    Extension(booker): Extension<Booker>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Uuid>>, AppError> {
    let controller = TeacherController::new(state);
    let response = controller.delete_work_day(booker.as_teacher()?, id).await?;
    Ok(Json(response))
}
