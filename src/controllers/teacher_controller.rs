use chrono::NaiveDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::dto::availability_dto::{slots_response, AvailableHoursRequest};
use crate::dto::work_hours_dto::{ReplaceWorkHoursRequest, WorkDaysQuery};
use crate::dto::ApiResponse;
use crate::models::{Teacher, WorkHours};
use crate::services::Booker;
use crate::state::AppState;
use crate::utils::errors::{invalid_request, not_found_error, AppError, AppResult};
use crate::utils::validation::parse_date;

pub struct TeacherController {
    state: AppState,
}

impl TeacherController {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Horas libres de un profesor. Cada usuario solo consulta su propio profesor.
    pub async fn available_hours(
        &self,
        booker: &Booker,
        teacher_id: Uuid,
        request: AvailableHoursRequest,
        now: NaiveDateTime,
    ) -> AppResult<ApiResponse<Vec<[String; 2]>>> {
        let own_teacher = match booker {
            Booker::Student(student) => student.teacher_id,
            Booker::Teacher(teacher) => teacher.id,
        };
        if own_teacher != teacher_id {
            return Err(AppError::Forbidden(
                "Solo se puede consultar el propio profesor".to_string(),
            ));
        }

        request.validate().map_err(AppError::Validation)?;
        let query = request.into_query(teacher_id, booker);
        let slots = self.state.availability().available_hours(&query, now).await?;
        Ok(ApiResponse::success(slots_response(&slots)))
    }

    /// Con `on_date` devuelve las entradas de esa fecha; sin ella, las semanales
    pub async fn work_days(
        &self,
        teacher: &Teacher,
        query: WorkDaysQuery,
    ) -> AppResult<ApiResponse<Vec<WorkHours>>> {
        let hours = match query.on_date.as_deref() {
            Some(raw) => {
                let date = parse_date(Some(raw)).ok_or_else(|| invalid_request("Date is not valid."))?;
                self.state.store.work_hours_on_date(teacher.id, date).await?
            }
            None => self
                .state
                .store
                .list_work_hours(teacher.id)
                .await?
                .into_iter()
                .filter(|h| h.on_date.is_none())
                .collect(),
        };
        Ok(ApiResponse::success(hours))
    }

    pub async fn replace_work_days(
        &self,
        teacher: &Teacher,
        request: ReplaceWorkHoursRequest,
    ) -> AppResult<ApiResponse<Vec<WorkHours>>> {
        request.validate().map_err(AppError::Validation)?;

        let target = request.target()?;
        let hours = self
            .state
            .store
            .replace_work_hours(teacher.id, target, request.into_entries())
            .await?;

        log::info!(
            "🗓️ Horario del profesor {} actualizado para {:?} ({} bloques)",
            teacher.id,
            target,
            hours.len()
        );
        Ok(ApiResponse::success(hours))
    }

    pub async fn delete_work_day(&self, teacher: &Teacher, id: Uuid) -> AppResult<ApiResponse<Uuid>> {
        if !self.state.store.delete_work_hours(teacher.id, id).await? {
            return Err(not_found_error("WorkHours", &id.to_string()));
        }
        Ok(ApiResponse::success_with_message(id, "Work hours deleted".to_string()))
    }
}
