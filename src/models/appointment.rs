//! Modelo de Appointment
//!
//! Una clase, examen práctico o examen interno. Ocupa `[date, date + duration)`.
//! Nunca se borra físicamente: se marca `deleted`.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use crate::utils::slots::TimeRange;

/// Tipo de cita - mapea al ENUM appointment_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "appointment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    Lesson,
    Test,
    InnerExam,
}

impl AppointmentType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lesson" => Some(AppointmentType::Lesson),
            "test" => Some(AppointmentType::Test),
            "inner_exam" => Some(AppointmentType::InnerExam),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub teacher_id: Uuid,
    /// `None` = bloque abierto o tiempo personal del profesor
    pub student_id: Option<Uuid>,
    pub creator_id: Uuid,
    pub date: NaiveDateTime,
    /// Minutos
    pub duration: i32,
    pub is_approved: bool,
    pub deleted: bool,
    #[sqlx(rename = "type")]
    pub kind: AppointmentType,
    pub price: Option<i32>,
    pub comments: Option<String>,
    pub meetup_place_id: Option<Uuid>,
    pub dropoff_place_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

impl Appointment {
    pub fn end(&self) -> NaiveDateTime {
        self.date + Duration::minutes(self.duration as i64)
    }

    pub fn interval(&self) -> TimeRange {
        (self.date, self.end())
    }

    pub fn is_open_block(&self) -> bool {
        self.student_id.is_none()
    }

    /// Clase confirmada: aprobada, no borrada y con alumno
    pub fn is_committed(&self) -> bool {
        self.is_approved && !self.deleted && self.student_id.is_some()
    }

    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.date < end && start < self.end()
    }
}

/// Cita validada y lista para insertar
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub teacher_id: Uuid,
    pub student_id: Option<Uuid>,
    pub creator_id: Uuid,
    pub date: NaiveDateTime,
    pub duration: i32,
    pub is_approved: bool,
    pub kind: AppointmentType,
    pub price: Option<i32>,
    pub comments: Option<String>,
    pub meetup_place_id: Option<Uuid>,
    pub dropoff_place_id: Option<Uuid>,
}

impl NewAppointment {
    pub fn into_appointment(self, created_at: NaiveDateTime) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            teacher_id: self.teacher_id,
            student_id: self.student_id,
            creator_id: self.creator_id,
            date: self.date,
            duration: self.duration,
            is_approved: self.is_approved,
            deleted: false,
            kind: self.kind,
            price: self.price,
            comments: self.comments,
            meetup_place_id: self.meetup_place_id,
            dropoff_place_id: self.dropoff_place_id,
            created_at,
        }
    }
}

/// Cambios de una edición. `None` deja el campo como está.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentChanges {
    pub date: Option<NaiveDateTime>,
    pub duration: Option<i32>,
    pub price: Option<i32>,
    pub comments: Option<String>,
    pub meetup_place_id: Option<Uuid>,
    pub dropoff_place_id: Option<Uuid>,
    pub is_approved: Option<bool>,
    pub kind: Option<AppointmentType>,
}

impl AppointmentChanges {
    /// Cero y cadena vacía no sobrescriben nada; los booleanos explícitos sí
    pub fn only_changed(self) -> Self {
        Self {
            duration: self.duration.filter(|d| *d != 0),
            price: self.price.filter(|p| *p != 0),
            comments: self.comments.filter(|c| !c.trim().is_empty()),
            ..self
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, appointment: &mut Appointment) {
        if let Some(date) = self.date {
            appointment.date = date;
        }
        if let Some(duration) = self.duration {
            appointment.duration = duration;
        }
        if let Some(price) = self.price {
            appointment.price = Some(price);
        }
        if let Some(comments) = &self.comments {
            appointment.comments = Some(comments.clone());
        }
        if let Some(place) = self.meetup_place_id {
            appointment.meetup_place_id = Some(place);
        }
        if let Some(place) = self.dropoff_place_id {
            appointment.dropoff_place_id = Some(place);
        }
        if let Some(approved) = self.is_approved {
            appointment.is_approved = approved;
        }
        if let Some(kind) = self.kind {
            appointment.kind = kind;
        }
    }
}
