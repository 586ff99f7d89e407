//! Repositorios
//!
//! `ScheduleStore` es la única puerta al almacenamiento. Hay dos
//! implementaciones: PostgreSQL (producción) y memoria (tests y arranque sin
//! `DATABASE_URL`). Las escrituras con carrera (reservar y aprobar) se
//! resuelven dentro de la propia implementación, en una transacción.

pub mod memory_store;
pub mod postgres_store;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentChanges, AppointmentType, NewAppointment, NewWorkHours, Place,
    Student, Teacher, WorkHours, WorkHoursTarget,
};
use crate::utils::errors::AppResult;
use crate::utils::filters::AppointmentListFilter;

pub use memory_store::MemoryScheduleStore;
pub use postgres_store::PgScheduleStore;

/// Qué citas existentes impiden insertar una nueva en el mismo intervalo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapGuard {
    /// Clases aprobadas con alumno (reservas de alumno)
    CommittedLessons,
    /// Cualquier cita no borrada (reservas del profesor)
    AnyAppointment,
}

impl OverlapGuard {
    pub fn blocks(&self, existing: &Appointment) -> bool {
        if existing.deleted {
            return false;
        }
        match self {
            OverlapGuard::CommittedLessons => existing.is_committed(),
            OverlapGuard::AnyAppointment => true,
        }
    }

    /// Condición SQL equivalente a `blocks`
    pub fn sql_condition(&self) -> &'static str {
        match self {
            OverlapGuard::CommittedLessons => {
                "NOT deleted AND is_approved AND student_id IS NOT NULL"
            }
            OverlapGuard::AnyAppointment => "NOT deleted",
        }
    }
}

/// Dueño de un listado de citas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentOwner {
    Teacher(Uuid),
    Student(Uuid),
}

impl AppointmentOwner {
    pub fn owns(&self, appointment: &Appointment) -> bool {
        match self {
            AppointmentOwner::Teacher(id) => appointment.teacher_id == *id,
            AppointmentOwner::Student(id) => appointment.student_id == Some(*id),
        }
    }
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn find_teacher(&self, id: Uuid) -> AppResult<Option<Teacher>>;

    async fn find_student(&self, id: Uuid) -> AppResult<Option<Student>>;

    async fn find_place(&self, id: Uuid) -> AppResult<Option<Place>>;

    /// Horario específico de `date`
    async fn work_hours_on_date(&self, teacher_id: Uuid, date: NaiveDate) -> AppResult<Vec<WorkHours>>;

    /// Horario recurrente del día `day` (0=domingo)
    async fn work_hours_on_weekday(&self, teacher_id: Uuid, day: i32) -> AppResult<Vec<WorkHours>>;

    async fn list_work_hours(&self, teacher_id: Uuid) -> AppResult<Vec<WorkHours>>;

    /// Sustituye todas las entradas de `target` por `entries`
    async fn replace_work_hours(
        &self,
        teacher_id: Uuid,
        target: WorkHoursTarget,
        entries: Vec<NewWorkHours>,
    ) -> AppResult<Vec<WorkHours>>;

    /// `false` si no existe o no es del profesor
    async fn delete_work_hours(&self, teacher_id: Uuid, id: Uuid) -> AppResult<bool>;

    /// Citas no borradas del profesor en `date`, por hora de inicio
    async fn appointments_on_date(&self, teacher_id: Uuid, date: NaiveDate) -> AppResult<Vec<Appointment>>;

    async fn find_appointment(&self, id: Uuid) -> AppResult<Option<Appointment>>;

    /// Citas no borradas del alumno en `[from, to)`
    async fn count_student_appointments_between(
        &self,
        student_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> AppResult<i64>;

    /// Clases aprobadas y no borradas del alumno que empiezan antes de `before`
    async fn count_approved_lessons_before(&self, student_id: Uuid, before: NaiveDateTime) -> AppResult<i64>;

    /// Inserta `new` en una transacción: borra (soft) `displace`, vuelve a
    /// comprobar el solape según `guard` y solo entonces inserta. Un solape
    /// termina en `SlotUnavailable`.
    async fn insert_appointment(
        &self,
        new: NewAppointment,
        displace: &[Uuid],
        guard: OverlapGuard,
    ) -> AppResult<Appointment>;

    /// Cambios que no mueven la cita en el tiempo
    async fn update_appointment(&self, id: Uuid, changes: &AppointmentChanges) -> AppResult<Appointment>;

    /// Mueve la cita `id` con las mismas garantías que `insert_appointment`:
    /// en una transacción borra (soft) `displace`, comprueba el solape del
    /// nuevo intervalo según `guard` sin contar la propia cita y aplica
    /// `changes`. Un solape termina en `SlotUnavailable` y no borra nada.
    async fn reschedule_appointment(
        &self,
        id: Uuid,
        changes: &AppointmentChanges,
        displace: &[Uuid],
        guard: OverlapGuard,
    ) -> AppResult<Appointment>;

    /// Devuelve las citas que estaban vivas y ahora están borradas
    async fn soft_delete_appointments(&self, ids: &[Uuid]) -> AppResult<Vec<Appointment>>;

    /// Aprueba la cita salvo que otra clase aprobada del profesor empiece a la
    /// misma hora (`ConflictDuringApproval`)
    async fn approve_appointment(&self, id: Uuid) -> AppResult<Appointment>;

    async fn list_appointments(
        &self,
        owner: AppointmentOwner,
        filter: &AppointmentListFilter,
        now: NaiveDateTime,
    ) -> AppResult<Vec<Appointment>>;
}

/// La aprobación solo compite entre clases
pub(crate) fn approval_competes(appointment: &Appointment) -> bool {
    appointment.kind == AppointmentType::Lesson
}

pub(crate) fn approval_conflict_message(appointment: &Appointment) -> String {
    format!(
        "Another approved lesson already starts at {}",
        appointment.date.format("%Y-%m-%d %H:%M")
    )
}
