//! Modelos de Teacher y Student
//!
//! Mapean las tablas teachers y students. El agregado del profesor es dueño
//! de sus horarios y de sus citas.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Profesor de autoescuela
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Teacher {
    pub id: Uuid,
    pub user_id: Uuid,
    pub price: i32,
    /// Duración de una clase en minutos
    pub lesson_duration: i32,
}

/// Alumno asignado a un profesor
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub user_id: Uuid,
    pub teacher_id: Uuid,
    pub price: Option<i32>,
    /// Clases hechas antes de usar la aplicación, introducidas a mano
    pub number_of_old_lessons: i32,
}

/// Situación de un alumno en el momento de pedir disponibilidad
#[derive(Debug, Clone)]
pub struct StudentStanding {
    pub student: Student,
    /// Clases aprobadas ya pasadas más las introducidas a mano
    pub lessons_done: i64,
    /// Citas no borradas del alumno en la semana natural de la fecha pedida
    pub appointments_this_week: i64,
}
