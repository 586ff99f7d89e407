//! Modelo de WorkHours
//!
//! Horario declarado por un profesor, recurrente por día de la semana
//! (0=domingo..6=sábado) o para una fecha concreta. Las entradas de una fecha
//! concreta sustituyen a las recurrentes de ese día.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::slots::TimeRange;
use crate::utils::weekday::domain_weekday;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkHours {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub day: i32,
    pub on_date: Option<NaiveDate>,
    pub from_hour: i32,
    pub from_minutes: i32,
    pub to_hour: i32,
    pub to_minutes: i32,
    pub car_id: Option<Uuid>,
}

/// Datos de una entrada nueva, antes de asignarle id
#[derive(Debug, Clone)]
pub struct NewWorkHours {
    pub from_hour: i32,
    pub from_minutes: i32,
    pub to_hour: i32,
    pub to_minutes: i32,
    pub car_id: Option<Uuid>,
}

/// A qué se aplica un bloque de horario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkHoursTarget {
    Weekday(i32),
    Date(NaiveDate),
}

impl WorkHoursTarget {
    pub fn day(&self) -> i32 {
        match self {
            WorkHoursTarget::Weekday(day) => *day,
            WorkHoursTarget::Date(date) => domain_weekday(*date),
        }
    }

    pub fn on_date(&self) -> Option<NaiveDate> {
        match self {
            WorkHoursTarget::Weekday(_) => None,
            WorkHoursTarget::Date(date) => Some(*date),
        }
    }
}

fn time_of(hour: i32, minute: i32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(u32::try_from(hour).ok()?, u32::try_from(minute).ok()?, 0)
}

impl WorkHours {
    pub fn from_new(teacher_id: Uuid, target: WorkHoursTarget, new: NewWorkHours) -> Self {
        Self {
            id: Uuid::new_v4(),
            teacher_id,
            day: target.day(),
            on_date: target.on_date(),
            from_hour: new.from_hour,
            from_minutes: new.from_minutes,
            to_hour: new.to_hour,
            to_minutes: new.to_minutes,
            car_id: new.car_id,
        }
    }

    pub fn start_time(&self) -> Option<NaiveTime> {
        time_of(self.from_hour, self.from_minutes)
    }

    pub fn end_time(&self) -> Option<NaiveTime> {
        time_of(self.to_hour, self.to_minutes)
    }

    /// Ventana concreta en `date`; `None` si las horas no son válidas o inicio >= fin
    pub fn window_on(&self, date: NaiveDate) -> Option<TimeRange> {
        let start = self.start_time()?;
        let end = self.end_time()?;
        if start >= end {
            return None;
        }
        Some((
            NaiveDateTime::new(date, start),
            NaiveDateTime::new(date, end),
        ))
    }
}
