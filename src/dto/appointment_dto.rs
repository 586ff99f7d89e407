use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Appointment, AppointmentType};
use crate::services::{BookingRequest, EditRequest};
use crate::utils::errors::{invalid_request, AppResult};
use crate::utils::validation::{format_datetime, parse_datetime};

fn default_duration_mul() -> f64 {
    1.0
}

fn parse_kind(kind: Option<&str>) -> AppResult<Option<AppointmentType>> {
    match kind {
        None => Ok(None),
        Some(value) => AppointmentType::parse(value)
            .map(Some)
            .ok_or_else(|| invalid_request("Appointment type is not valid.")),
    }
}

// Request para crear una cita
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAppointmentRequest {
    pub date: String,

    #[serde(default = "default_duration_mul")]
    #[validate(range(min = 0.1, max = 10.0))]
    pub duration_mul: f64,

    #[serde(rename = "type")]
    pub kind: Option<String>,

    pub student_id: Option<Uuid>,

    #[validate(range(min = 0))]
    pub price: Option<i32>,

    #[validate(length(max = 1000))]
    pub comments: Option<String>,

    pub meetup_place_id: Option<Uuid>,
    pub dropoff_place_id: Option<Uuid>,
}

impl CreateAppointmentRequest {
    pub fn into_booking(self) -> AppResult<BookingRequest> {
        Ok(BookingRequest {
            date: parse_datetime(&self.date)?,
            duration_mul: self.duration_mul,
            kind: parse_kind(self.kind.as_deref())?,
            student_id: self.student_id,
            price: self.price,
            comments: self.comments,
            meetup_place_id: self.meetup_place_id,
            dropoff_place_id: self.dropoff_place_id,
        })
    }
}

// Request para editar una cita; lo que no llega no cambia
#[derive(Debug, Default, Deserialize, Validate)]
pub struct EditAppointmentRequest {
    pub date: Option<String>,

    #[validate(range(min = 0.1, max = 10.0))]
    pub duration_mul: Option<f64>,

    #[serde(rename = "type")]
    pub kind: Option<String>,

    #[validate(range(min = 0))]
    pub price: Option<i32>,

    #[validate(length(max = 1000))]
    pub comments: Option<String>,

    pub meetup_place_id: Option<Uuid>,
    pub dropoff_place_id: Option<Uuid>,
}

impl EditAppointmentRequest {
    pub fn into_edit(self) -> AppResult<EditRequest> {
        let date = match self.date.as_deref() {
            Some(raw) => Some(parse_datetime(raw)?),
            None => None,
        };

        Ok(EditRequest {
            date,
            duration_mul: self.duration_mul,
            kind: parse_kind(self.kind.as_deref())?,
            price: self.price,
            comments: self.comments,
            meetup_place_id: self.meetup_place_id,
            dropoff_place_id: self.dropoff_place_id,
        })
    }
}

// Response de cita
#[derive(Debug, Serialize)]
pub struct AppointmentResponse {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub student_id: Option<Uuid>,
    pub creator_id: Uuid,
    pub date: String,
    pub duration: i32,
    pub is_approved: bool,
    pub deleted: bool,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
    pub price: Option<i32>,
    pub comments: Option<String>,
    pub meetup_place_id: Option<Uuid>,
    pub dropoff_place_id: Option<Uuid>,
    pub created_at: String,
    /// Número de clase del alumno, solo en clases con alumno
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_number: Option<i64>,
}

impl AppointmentResponse {
    pub fn new(appointment: Appointment, lesson_number: Option<i64>) -> Self {
        Self {
            id: appointment.id,
            teacher_id: appointment.teacher_id,
            student_id: appointment.student_id,
            creator_id: appointment.creator_id,
            date: format_datetime(appointment.date),
            duration: appointment.duration,
            is_approved: appointment.is_approved,
            deleted: appointment.deleted,
            kind: appointment.kind,
            price: appointment.price,
            comments: appointment.comments,
            meetup_place_id: appointment.meetup_place_id,
            dropoff_place_id: appointment.dropoff_place_id,
            created_at: format_datetime(appointment.created_at),
            lesson_number,
        }
    }
}
