use chrono::NaiveDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::dto::appointment_dto::{
    AppointmentResponse, CreateAppointmentRequest, EditAppointmentRequest,
};
use crate::dto::ApiResponse;
use crate::models::{Appointment, Teacher};
use crate::repositories::AppointmentOwner;
use crate::services::{Booker, BookingService};
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::filters::AppointmentListFilter;

pub struct AppointmentController {
    state: AppState,
    bookings: BookingService,
}

impl AppointmentController {
    pub fn new(state: AppState) -> Self {
        let bookings = state.bookings();
        Self { state, bookings }
    }

    pub async fn list(
        &self,
        booker: &Booker,
        params: &[(String, String)],
        now: NaiveDateTime,
    ) -> AppResult<ApiResponse<Vec<AppointmentResponse>>> {
        let filter = AppointmentListFilter::from_pairs(
            params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )?;
        let owner = match booker {
            Booker::Student(student) => AppointmentOwner::Student(student.id),
            Booker::Teacher(teacher) => AppointmentOwner::Teacher(teacher.id),
        };

        let appointments = self.state.store.list_appointments(owner, &filter, now).await?;
        let mut responses = Vec::with_capacity(appointments.len());
        for appointment in appointments {
            responses.push(self.response(appointment).await?);
        }
        Ok(ApiResponse::success(responses))
    }

    pub async fn get(&self, booker: &Booker, id: Uuid) -> AppResult<ApiResponse<AppointmentResponse>> {
        let appointment = self.bookings.owned_appointment(booker, id).await?;
        Ok(ApiResponse::success(self.response(appointment).await?))
    }

    pub async fn create(
        &self,
        booker: &Booker,
        request: CreateAppointmentRequest,
        now: NaiveDateTime,
    ) -> AppResult<ApiResponse<AppointmentResponse>> {
        request.validate().map_err(AppError::Validation)?;

        let appointment = self
            .bookings
            .create(booker, request.into_booking()?, now)
            .await?;
        Ok(ApiResponse::success(self.response(appointment).await?))
    }

    pub async fn edit(
        &self,
        booker: &Booker,
        id: Uuid,
        request: EditAppointmentRequest,
        now: NaiveDateTime,
    ) -> AppResult<ApiResponse<AppointmentResponse>> {
        request.validate().map_err(AppError::Validation)?;

        let appointment = self
            .bookings
            .edit(booker, id, request.into_edit()?, now)
            .await?;
        Ok(ApiResponse::success(self.response(appointment).await?))
    }

    pub async fn delete(&self, booker: &Booker, id: Uuid) -> AppResult<ApiResponse<AppointmentResponse>> {
        let appointment = self.bookings.delete(booker, id).await?;
        Ok(ApiResponse::success_with_message(
            AppointmentResponse::new(appointment, None),
            "Appointment deleted".to_string(),
        ))
    }

    pub async fn approve(&self, teacher: &Teacher, id: Uuid) -> AppResult<ApiResponse<AppointmentResponse>> {
        let appointment = self.bookings.approve(teacher, id).await?;
        Ok(ApiResponse::success(self.response(appointment).await?))
    }

    async fn response(&self, appointment: Appointment) -> AppResult<AppointmentResponse> {
        let lesson_number = self.bookings.lesson_number(&appointment).await?;
        Ok(AppointmentResponse::new(appointment, lesson_number))
    }
}
