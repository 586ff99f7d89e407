//! Calculador de disponibilidad
//!
//! Para un profesor y un día: resuelve el horario (el específico de la fecha
//! sustituye al recurrente), toma las citas del día, puntúa las horas, aplica
//! las reglas si hay alumno y genera los huecos libres en orden cronológico.
//! Los bloques abiertos del profesor (citas sin alumno) que aún no han
//! empezado se ofrecen tal cual. Con `only_approved` no ocupan hueco; si uno
//! coincide exactamente con un hueco de la rejilla se ofrece una sola vez.
//!
//! Solo lee. Las carreras se resuelven al reservar.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::config::SchedulingSettings;
use crate::models::{Appointment, StudentStanding, Teacher, WorkHours};
use crate::repositories::ScheduleStore;
use crate::rules::{Blacklist, RequestedPlaces, RuleContext, RuleRegistry, ScheduledLesson};
use crate::services::hour_scores::HourScores;
use crate::utils::errors::{invalid_request, not_found_error, AppResult};
use crate::utils::slots::{slots, TimeRange};
use crate::utils::weekday::{domain_weekday, week_bounds};

/// Parámetros de una consulta de disponibilidad
#[derive(Debug, Clone, Default)]
pub struct AvailabilityQuery {
    pub teacher_id: Uuid,
    /// Sin fecha no hay huecos
    pub date: Option<NaiveDate>,
    pub student_id: Option<Uuid>,
    /// Minutos; por defecto la duración de clase del profesor
    pub duration: Option<i64>,
    /// Solo las clases aprobadas con alumno ocupan hueco
    pub only_approved: bool,
    pub meetup_place_id: Option<Uuid>,
    pub dropoff_place_id: Option<Uuid>,
    /// Cita que no debe contar como ocupada (la que se está editando)
    pub ignore_appointment: Option<Uuid>,
}

impl AvailabilityQuery {
    pub fn new(teacher_id: Uuid, date: NaiveDate) -> Self {
        Self {
            teacher_id,
            date: Some(date),
            ..Default::default()
        }
    }
}

#[derive(Clone)]
pub struct AvailabilityService {
    store: Arc<dyn ScheduleStore>,
    rules: Arc<RuleRegistry>,
    settings: SchedulingSettings,
}

impl AvailabilityService {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        rules: Arc<RuleRegistry>,
        settings: SchedulingSettings,
    ) -> Self {
        Self {
            store,
            rules,
            settings,
        }
    }

    /// Huecos reservables, ordenados por hora de inicio
    pub async fn available_hours(
        &self,
        query: &AvailabilityQuery,
        now: NaiveDateTime,
    ) -> AppResult<Vec<TimeRange>> {
        let Some(date) = query.date else {
            return Ok(Vec::new());
        };

        let teacher = self
            .store
            .find_teacher(query.teacher_id)
            .await?
            .ok_or_else(|| not_found_error("Teacher", &query.teacher_id.to_string()))?;
        let duration = lesson_duration(&teacher, query.duration)?;

        let work_hours = self.resolve_work_hours(teacher.id, date).await?;
        let windows: Vec<TimeRange> = work_hours.iter().filter_map(|w| w.window_on(date)).collect();

        let appointments: Vec<Appointment> = self
            .store
            .appointments_on_date(teacher.id, date)
            .await?
            .into_iter()
            .filter(|a| Some(a.id) != query.ignore_appointment)
            .collect();

        let busy: Vec<TimeRange> = appointments
            .iter()
            .filter(|a| !query.only_approved || a.is_committed())
            .map(Appointment::interval)
            .collect();
        let committed: Vec<&Appointment> =
            appointments.iter().filter(|a| a.is_committed()).collect();
        let approved_taken: Vec<TimeRange> = committed.iter().map(|a| a.interval()).collect();

        let hours = HourScores::build(&windows, &approved_taken, duration);

        let blacklist = match query.student_id {
            Some(student_id) => {
                self.evaluate_rules(query, student_id, date, now, &hours, &committed)
                    .await?
            }
            None => Blacklist::default(),
        };

        let mut available: Vec<TimeRange> = windows
            .iter()
            .flat_map(|&window| slots(window, &busy, duration, &blacklist, Some(now)))
            .collect();

        available.extend(
            appointments
                .iter()
                .filter(|a| a.is_open_block() && a.date > now)
                .map(Appointment::interval),
        );
        available.sort();
        available.dedup();

        log::debug!(
            "📅 {} huecos para el profesor {} el {}",
            available.len(),
            teacher.id,
            date
        );
        Ok(available)
    }

    /// Horario del día: el de la fecha concreta si existe, si no el recurrente
    pub async fn resolve_work_hours(&self, teacher_id: Uuid, date: NaiveDate) -> AppResult<Vec<WorkHours>> {
        let mut hours = self.store.work_hours_on_date(teacher_id, date).await?;
        if hours.is_empty() {
            hours = self
                .store
                .work_hours_on_weekday(teacher_id, domain_weekday(date))
                .await?;
        }
        hours.sort_by_key(|w| (w.from_hour, w.from_minutes));

        log::debug!(
            "🕐 Horario del profesor {} el {}: {:?}",
            teacher_id,
            date,
            hours
                .iter()
                .map(|w| format!(
                    "{:02}:{:02}-{:02}:{:02}",
                    w.from_hour, w.from_minutes, w.to_hour, w.to_minutes
                ))
                .collect::<Vec<_>>()
        );
        Ok(hours)
    }

    pub async fn student_standing(
        &self,
        student_id: Uuid,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> AppResult<StudentStanding> {
        let student = self
            .store
            .find_student(student_id)
            .await?
            .ok_or_else(|| not_found_error("Student", &student_id.to_string()))?;

        let lessons_done = self.store.count_approved_lessons_before(student.id, now).await?
            + student.number_of_old_lessons as i64;
        let (week_start, week_end) = week_bounds(date, self.settings.week_start);
        let appointments_this_week = self
            .store
            .count_student_appointments_between(student.id, week_start, week_end)
            .await?;

        Ok(StudentStanding {
            student,
            lessons_done,
            appointments_this_week,
        })
    }

    async fn evaluate_rules(
        &self,
        query: &AvailabilityQuery,
        student_id: Uuid,
        date: NaiveDate,
        now: NaiveDateTime,
        hours: &HourScores,
        committed: &[&Appointment],
    ) -> AppResult<Blacklist> {
        let standing = self.student_standing(student_id, date, now).await?;
        let places = self.requested_places(query).await?;
        let today_lessons = match places {
            Some(_) => self.scheduled_lessons(committed).await?,
            None => Vec::new(),
        };

        let ctx = RuleContext {
            date,
            student: &standing,
            hours,
            places: places.as_ref(),
            today_lessons: &today_lessons,
        };
        Ok(self.rules.blacklist(&ctx).await)
    }

    /// Solo cuando se piden los dos lugares y ambos existen
    async fn requested_places(&self, query: &AvailabilityQuery) -> AppResult<Option<RequestedPlaces>> {
        let (Some(meetup_id), Some(dropoff_id)) = (query.meetup_place_id, query.dropoff_place_id)
        else {
            return Ok(None);
        };
        let meetup = self.store.find_place(meetup_id).await?;
        let dropoff = self.store.find_place(dropoff_id).await?;
        Ok(meetup
            .zip(dropoff)
            .map(|(meetup, dropoff)| RequestedPlaces { meetup, dropoff }))
    }

    async fn scheduled_lessons(&self, committed: &[&Appointment]) -> AppResult<Vec<ScheduledLesson>> {
        let mut lessons = Vec::with_capacity(committed.len());
        for appointment in committed {
            let meetup = match appointment.meetup_place_id {
                Some(id) => self.store.find_place(id).await?,
                None => None,
            };
            let dropoff = match appointment.dropoff_place_id {
                Some(id) => self.store.find_place(id).await?,
                None => None,
            };
            lessons.push(ScheduledLesson {
                appointment: (*appointment).clone(),
                meetup,
                dropoff,
            });
        }
        Ok(lessons)
    }
}

/// Una clase nunca dura más de un día
pub const MAX_LESSON_MINUTES: i64 = 24 * 60;

/// Duración pedida o la de clase del profesor, entre 1 y `MAX_LESSON_MINUTES`
pub fn lesson_duration(teacher: &Teacher, requested: Option<i64>) -> AppResult<Duration> {
    let minutes = requested.unwrap_or(teacher.lesson_duration as i64);
    if !(1..=MAX_LESSON_MINUTES).contains(&minutes) {
        return Err(invalid_request(
            "Duration must be between 1 and 1440 minutes.",
        ));
    }
    Ok(Duration::minutes(minutes))
}
