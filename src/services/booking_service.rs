//! Validación y escritura de reservas
//!
//! Un alumno solo puede reservar una hora que aparezca tal cual en el
//! recálculo de disponibilidad. Un profesor reserva sin ese recálculo, pero
//! no puede pisar otra cita salvo que sea un examen que desplaza clases
//! futuras. La comprobación final contra carreras ocurre en el almacén,
//! dentro de la misma transacción que inserta o mueve la cita.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentChanges, AppointmentType, NewAppointment, Student, Teacher,
};
use crate::repositories::{OverlapGuard, ScheduleStore};
use crate::services::availability_service::{
    AvailabilityQuery, AvailabilityService, MAX_LESSON_MINUTES,
};
use crate::services::notification_service::{notify_quietly, Notifier};
use crate::utils::errors::{
    invalid_request, not_found_error, slot_unavailable, AppError, AppResult,
};

/// Quién pide la reserva
#[derive(Debug, Clone)]
pub enum Booker {
    Student(Student),
    Teacher(Teacher),
}

impl Booker {
    pub fn user_id(&self) -> Uuid {
        match self {
            Booker::Student(student) => student.user_id,
            Booker::Teacher(teacher) => teacher.user_id,
        }
    }

    pub fn is_teacher(&self) -> bool {
        matches!(self, Booker::Teacher(_))
    }

    /// Operaciones reservadas al profesor
    pub fn as_teacher(&self) -> AppResult<&Teacher> {
        match self {
            Booker::Teacher(teacher) => Ok(teacher),
            Booker::Student(_) => Err(AppError::Forbidden(
                "Solo un profesor puede hacer esto".to_string(),
            )),
        }
    }

    /// La cita es del profesor o del alumno que pide
    pub fn owns(&self, appointment: &Appointment) -> bool {
        match self {
            Booker::Student(student) => appointment.student_id == Some(student.id),
            Booker::Teacher(teacher) => appointment.teacher_id == teacher.id,
        }
    }
}

/// Datos de una reserva nueva
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub date: NaiveDateTime,
    /// Multiplicador de la duración de clase del profesor
    pub duration_mul: f64,
    /// Solo lo decide el profesor; los alumnos siempre reservan clases
    pub kind: Option<AppointmentType>,
    /// Alumno de la cita cuando reserva el profesor; sin alumno es un bloque abierto
    pub student_id: Option<Uuid>,
    pub price: Option<i32>,
    pub comments: Option<String>,
    pub meetup_place_id: Option<Uuid>,
    pub dropoff_place_id: Option<Uuid>,
}

impl BookingRequest {
    pub fn at(date: NaiveDateTime) -> Self {
        Self {
            date,
            duration_mul: 1.0,
            kind: None,
            student_id: None,
            price: None,
            comments: None,
            meetup_place_id: None,
            dropoff_place_id: None,
        }
    }
}

/// Edición: lo que llega vacío no cambia
#[derive(Debug, Clone, Default)]
pub struct EditRequest {
    pub date: Option<NaiveDateTime>,
    pub duration_mul: Option<f64>,
    pub kind: Option<AppointmentType>,
    pub price: Option<i32>,
    pub comments: Option<String>,
    pub meetup_place_id: Option<Uuid>,
    pub dropoff_place_id: Option<Uuid>,
}

/// Resultado de validar una reserva: con quién es y cómo insertarla
#[derive(Debug, Clone)]
pub struct BookingPlan {
    pub teacher: Teacher,
    pub student: Option<Student>,
    pub kind: AppointmentType,
    pub guard: OverlapGuard,
    /// Citas que se borran al insertar: clases bajo un examen o el bloque abierto reservado
    pub displace: Vec<Appointment>,
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn ScheduleStore>,
    availability: AvailabilityService,
    notifier: Arc<dyn Notifier>,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        availability: AvailabilityService,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            availability,
            notifier,
        }
    }

    /// Comprueba que `booker` puede ocupar `[date, date + duration)`.
    ///
    /// `editing` es la cita que se está moviendo: no cuenta como ocupada.
    pub async fn validate_booking(
        &self,
        booker: &Booker,
        date: NaiveDateTime,
        duration: Duration,
        requested: &BookingRequest,
        editing: Option<&Appointment>,
        now: NaiveDateTime,
    ) -> AppResult<BookingPlan> {
        match booker {
            Booker::Student(student) => {
                if date < now {
                    return Err(invalid_request("Date is not valid."));
                }
                let teacher = self.teacher(student.teacher_id).await?;

                let query = AvailabilityQuery {
                    teacher_id: teacher.id,
                    date: Some(date.date()),
                    student_id: Some(student.id),
                    duration: Some(duration.num_minutes()),
                    only_approved: true,
                    meetup_place_id: requested.meetup_place_id,
                    dropoff_place_id: requested.dropoff_place_id,
                    ignore_appointment: editing.map(|a| a.id),
                };
                let available = self.availability.available_hours(&query, now).await?;
                if !available.iter().any(|&(start, _)| start == date) {
                    log::debug!("🚫 {} no está disponible para el alumno {}", date, student.id);
                    return Err(slot_unavailable());
                }

                // reservar un bloque abierto lo ocupa: el bloque desaparece
                let claimed: Vec<Appointment> = self
                    .store
                    .appointments_on_date(teacher.id, date.date())
                    .await?
                    .into_iter()
                    .filter(|a| a.is_open_block() && a.date == date)
                    .collect();

                Ok(BookingPlan {
                    teacher,
                    student: Some(student.clone()),
                    kind: editing.map_or(AppointmentType::Lesson, |a| a.kind),
                    guard: OverlapGuard::CommittedLessons,
                    displace: claimed,
                })
            }
            Booker::Teacher(teacher) => {
                let student_id = requested
                    .student_id
                    .or_else(|| editing.and_then(|a| a.student_id));
                let student = match student_id {
                    Some(id) => Some(self.student_of(teacher, id).await?),
                    None => None,
                };
                let kind = requested
                    .kind
                    .or_else(|| editing.map(|a| a.kind))
                    .unwrap_or(AppointmentType::Lesson);

                let displace = self
                    .handle_teacher_hours(teacher, date, duration, kind, editing, now)
                    .await?;

                Ok(BookingPlan {
                    teacher: teacher.clone(),
                    student,
                    kind,
                    guard: OverlapGuard::AnyAppointment,
                    displace,
                })
            }
        }
    }

    /// Citas que solapan con una reserva del profesor.
    ///
    /// Si hay solape y la reserva es una clase o ya ha pasado, se rechaza.
    /// Un examen futuro desplaza las clases con las que solapa; cualquier
    /// otro tipo de cita solapada lo impide.
    pub async fn handle_teacher_hours(
        &self,
        teacher: &Teacher,
        date: NaiveDateTime,
        duration: Duration,
        kind: AppointmentType,
        editing: Option<&Appointment>,
        now: NaiveDateTime,
    ) -> AppResult<Vec<Appointment>> {
        let end = date + duration;
        let overlapping: Vec<Appointment> = self
            .store
            .appointments_on_date(teacher.id, date.date())
            .await?
            .into_iter()
            .filter(|a| Some(a.id) != editing.map(|e| e.id) && a.overlaps(date, end))
            .collect();

        if overlapping.is_empty() {
            return Ok(overlapping);
        }
        if kind == AppointmentType::Lesson || date < now {
            log::debug!("🚫 {} solapa con {} citas del profesor {}", date, overlapping.len(), teacher.id);
            return Err(slot_unavailable());
        }
        if overlapping.iter().any(|a| a.kind != AppointmentType::Lesson) {
            return Err(slot_unavailable());
        }
        Ok(overlapping)
    }

    pub async fn create(
        &self,
        booker: &Booker,
        request: BookingRequest,
        now: NaiveDateTime,
    ) -> AppResult<Appointment> {
        let teacher = match booker {
            Booker::Student(student) => self.teacher(student.teacher_id).await?,
            Booker::Teacher(teacher) => teacher.clone(),
        };
        let duration = booked_duration(&teacher, request.duration_mul)?;

        let plan = self
            .validate_booking(booker, request.date, duration, &request, None, now)
            .await?;
        self.check_places(
            plan.student.as_ref(),
            [request.meetup_place_id, request.dropoff_place_id],
        )
        .await?;

        let price = request
            .price
            .or_else(|| plan.student.as_ref().and_then(|s| s.price))
            .unwrap_or(plan.teacher.price);

        let new = NewAppointment {
            teacher_id: plan.teacher.id,
            student_id: plan.student.as_ref().map(|s| s.id),
            creator_id: booker.user_id(),
            date: request.date,
            duration: duration.num_minutes() as i32,
            is_approved: booker.is_teacher(),
            kind: plan.kind,
            price: Some(price),
            comments: request.comments.filter(|c| !c.trim().is_empty()),
            meetup_place_id: request.meetup_place_id,
            dropoff_place_id: request.dropoff_place_id,
        };

        let displaced_ids: Vec<Uuid> = plan.displace.iter().map(|a| a.id).collect();
        let appointment = self
            .store
            .insert_appointment(new, &displaced_ids, plan.guard)
            .await?;

        log::info!(
            "✅ Cita {} creada para el profesor {} el {}",
            appointment.id,
            appointment.teacher_id,
            appointment.date
        );

        self.notify_cancelled(&plan.displace).await;
        match (booker, plan.student.as_ref()) {
            (Booker::Student(_), _) => {
                let body = format!(
                    "A student wants to schedule a new lesson at {}.",
                    appointment.date
                );
                self.notify(plan.teacher.user_id, "New Lesson!", &body).await;
            }
            (Booker::Teacher(_), Some(student)) => {
                let body = format!("A new lesson was scheduled at {}.", appointment.date);
                self.notify(student.user_id, "New Lesson!", &body).await;
            }
            (Booker::Teacher(_), None) => {}
        }

        Ok(appointment)
    }

    pub async fn edit(
        &self,
        booker: &Booker,
        id: Uuid,
        request: EditRequest,
        now: NaiveDateTime,
    ) -> AppResult<Appointment> {
        let appointment = self.owned_appointment(booker, id).await?;
        let teacher = self.teacher(appointment.teacher_id).await?;

        let duration = match request.duration_mul {
            Some(mul) => Some(booked_duration(&teacher, mul)?.num_minutes() as i32),
            None => None,
        };
        let date = request.date.filter(|d| *d != appointment.date);
        let duration = duration.filter(|d| *d != appointment.duration);
        let time_changed = date.is_some() || duration.is_some();

        let mut changes = AppointmentChanges {
            date,
            duration,
            price: request.price,
            comments: request.comments,
            meetup_place_id: request
                .meetup_place_id
                .filter(|p| Some(*p) != appointment.meetup_place_id),
            dropoff_place_id: request
                .dropoff_place_id
                .filter(|p| Some(*p) != appointment.dropoff_place_id),
            kind: request
                .kind
                .filter(|k| booker.is_teacher() && *k != appointment.kind),
            ..Default::default()
        }
        .only_changed();

        let mut plan = None;
        if time_changed {
            let new_date = changes.date.unwrap_or(appointment.date);
            let new_duration =
                Duration::minutes(changes.duration.unwrap_or(appointment.duration) as i64);
            let requested = BookingRequest {
                kind: changes.kind,
                meetup_place_id: changes.meetup_place_id.or(appointment.meetup_place_id),
                dropoff_place_id: changes.dropoff_place_id.or(appointment.dropoff_place_id),
                ..BookingRequest::at(new_date)
            };
            plan = Some(
                self.validate_booking(booker, new_date, new_duration, &requested, Some(&appointment), now)
                    .await?,
            );

            // un alumno que mueve su clase necesita otra aprobación
            if !booker.is_teacher() && appointment.is_approved {
                changes.is_approved = Some(false);
            }
        }

        if changes.is_empty() {
            return Ok(appointment);
        }

        let student = match appointment.student_id {
            Some(student_id) => self.store.find_student(student_id).await?,
            None => None,
        };
        self.check_places(
            student.as_ref(),
            [changes.meetup_place_id, changes.dropoff_place_id],
        )
        .await?;

        let updated = match &plan {
            Some(plan) => {
                let displaced_ids: Vec<Uuid> = plan.displace.iter().map(|a| a.id).collect();
                let moved = self
                    .store
                    .reschedule_appointment(id, &changes, &displaced_ids, plan.guard)
                    .await?;
                self.notify_cancelled(&plan.displace).await;
                moved
            }
            None => self.store.update_appointment(id, &changes).await?,
        };
        log::info!("✏️ Cita {} actualizada", updated.id);

        let body = format!("Lesson at {} has been updated.", updated.date);
        if let Some(user_id) = self.counterparty(booker, &updated, &teacher).await? {
            self.notify(user_id, "Lesson Updated", &body).await;
        }
        Ok(updated)
    }

    pub async fn delete(&self, booker: &Booker, id: Uuid) -> AppResult<Appointment> {
        let appointment = self.owned_appointment(booker, id).await?;
        let teacher = self.teacher(appointment.teacher_id).await?;

        let deleted = self
            .store
            .soft_delete_appointments(&[id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| not_found_error("Appointment", &id.to_string()))?;
        log::info!("🗑️ Cita {} borrada", deleted.id);

        let body = format!("Lesson at {} has been cancelled.", deleted.date);
        if let Some(user_id) = self.counterparty(booker, &deleted, &teacher).await? {
            self.notify(user_id, "Lesson Cancelled", &body).await;
        }
        Ok(deleted)
    }

    /// Solo el profesor de la cita puede aprobarla
    pub async fn approve(&self, teacher: &Teacher, id: Uuid) -> AppResult<Appointment> {
        let booker = Booker::Teacher(teacher.clone());
        self.owned_appointment(&booker, id).await?;

        let approved = self.store.approve_appointment(id).await?;
        log::info!("👍 Cita {} aprobada", approved.id);

        if let Some(student_id) = approved.student_id {
            if let Some(student) = self.store.find_student(student_id).await? {
                let body = format!("Lesson at {} has been approved!", approved.date);
                self.notify(student.user_id, "Lesson Approved", &body).await;
            }
        }
        Ok(approved)
    }

    /// Número de clase: aprobadas anteriores + clases previas + 1
    pub async fn lesson_number(&self, appointment: &Appointment) -> AppResult<Option<i64>> {
        let Some(student_id) = appointment.student_id else {
            return Ok(None);
        };
        let Some(student) = self.store.find_student(student_id).await? else {
            return Ok(None);
        };
        let before = self
            .store
            .count_approved_lessons_before(student.id, appointment.date)
            .await?;
        Ok(Some(before + student.number_of_old_lessons as i64 + 1))
    }

    /// Cita visible para `booker`; si no es suya se responde como si no existiera
    pub async fn owned_appointment(&self, booker: &Booker, id: Uuid) -> AppResult<Appointment> {
        self.store
            .find_appointment(id)
            .await?
            .filter(|a| !a.deleted && booker.owns(a))
            .ok_or_else(|| not_found_error("Appointment", &id.to_string()))
    }

    async fn teacher(&self, id: Uuid) -> AppResult<Teacher> {
        self.store
            .find_teacher(id)
            .await?
            .ok_or_else(|| not_found_error("Teacher", &id.to_string()))
    }

    async fn student_of(&self, teacher: &Teacher, id: Uuid) -> AppResult<Student> {
        self.store
            .find_student(id)
            .await?
            .filter(|s| s.teacher_id == teacher.id)
            .ok_or_else(|| invalid_request("Student does not exist."))
    }

    /// Los lugares tienen que existir y, si hay alumno, ser suyos
    async fn check_places(&self, student: Option<&Student>, places: [Option<Uuid>; 2]) -> AppResult<()> {
        for id in places.into_iter().flatten() {
            let place = self
                .store
                .find_place(id)
                .await?
                .ok_or_else(|| not_found_error("Place", &id.to_string()))?;
            if student.map_or(false, |s| s.id != place.student_id) {
                return Err(invalid_request("Place does not belong to the student."));
            }
        }
        Ok(())
    }

    async fn counterparty(
        &self,
        booker: &Booker,
        appointment: &Appointment,
        teacher: &Teacher,
    ) -> AppResult<Option<Uuid>> {
        match booker {
            Booker::Student(_) => Ok(Some(teacher.user_id)),
            Booker::Teacher(_) => match appointment.student_id {
                Some(id) => Ok(self.store.find_student(id).await?.map(|s| s.user_id)),
                None => Ok(None),
            },
        }
    }

    async fn notify_cancelled(&self, lessons: &[Appointment]) {
        for lesson in lessons {
            let Some(student_id) = lesson.student_id else {
                continue;
            };
            match self.store.find_student(student_id).await {
                Ok(Some(student)) => {
                    let body = format!("Lesson at {} has been cancelled.", lesson.date);
                    self.notify(student.user_id, "Lesson Cancelled", &body).await;
                }
                Ok(None) => {}
                Err(e) => log::warn!("⚠️ No se pudo avisar de la cancelación de {}: {}", lesson.id, e),
            }
        }
    }

    async fn notify(&self, user_id: Uuid, title: &str, body: &str) {
        notify_quietly(self.notifier.as_ref(), user_id, title, body).await;
    }
}

/// `round(duration_mul × lesson_duration)` minutos, entre 1 y `MAX_LESSON_MINUTES`
pub fn booked_duration(teacher: &Teacher, duration_mul: f64) -> AppResult<Duration> {
    if !duration_mul.is_finite() || duration_mul <= 0.0 {
        return Err(invalid_request("duration_mul must be a positive number."));
    }
    let minutes = (duration_mul * teacher.lesson_duration as f64).round() as i64;
    if !(1..=MAX_LESSON_MINUTES).contains(&minutes) {
        return Err(AppError::InvalidRequest(format!(
            "A lesson of {} minutes is not valid.",
            minutes
        )));
    }
    Ok(Duration::minutes(minutes))
}
