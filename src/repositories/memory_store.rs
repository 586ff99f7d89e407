//! Almacén en memoria
//!
//! Mismo contrato que `PgScheduleStore`. El lock de escritura es el punto de
//! serialización de reservas y aprobaciones; nunca se mantiene a través de
//! un `.await`.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

use super::{
    approval_competes, approval_conflict_message, AppointmentOwner, OverlapGuard, ScheduleStore,
};
use crate::models::{
    Appointment, AppointmentChanges, AppointmentType, NewAppointment, NewWorkHours, Place,
    Student, Teacher, WorkHours, WorkHoursTarget,
};
use crate::utils::errors::{not_found_error, slot_unavailable, AppError, AppResult};
use crate::utils::filters::AppointmentListFilter;

#[derive(Debug, Default)]
struct Tables {
    teachers: HashMap<Uuid, Teacher>,
    students: HashMap<Uuid, Student>,
    places: HashMap<Uuid, Place>,
    work_hours: Vec<WorkHours>,
    appointments: Vec<Appointment>,
}

#[derive(Debug, Default)]
pub struct MemoryScheduleStore {
    tables: RwLock<Tables>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    // cada operación valida antes de mutar: tras un panic el contenido sigue siendo coherente
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_teacher(&self, teacher: Teacher) -> Teacher {
        self.write().teachers.insert(teacher.id, teacher.clone());
        teacher
    }

    pub fn add_student(&self, student: Student) -> Student {
        self.write().students.insert(student.id, student.clone());
        student
    }

    pub fn add_place(&self, place: Place) -> Place {
        self.write().places.insert(place.id, place.clone());
        place
    }

    pub fn add_work_hours(&self, teacher_id: Uuid, target: WorkHoursTarget, new: NewWorkHours) -> WorkHours {
        let entry = WorkHours::from_new(teacher_id, target, new);
        self.write().work_hours.push(entry.clone());
        entry
    }

    /// Inserta sin comprobaciones; para preparar datos
    pub fn add_appointment(&self, appointment: Appointment) -> Appointment {
        self.write().appointments.push(appointment.clone());
        appointment
    }
}

fn by_start(work_hours: &mut [WorkHours]) {
    work_hours.sort_by_key(|w| (w.from_hour, w.from_minutes));
}

#[async_trait]
impl ScheduleStore for MemoryScheduleStore {
    async fn find_teacher(&self, id: Uuid) -> AppResult<Option<Teacher>> {
        Ok(self.read().teachers.get(&id).cloned())
    }

    async fn find_student(&self, id: Uuid) -> AppResult<Option<Student>> {
        Ok(self.read().students.get(&id).cloned())
    }

    async fn find_place(&self, id: Uuid) -> AppResult<Option<Place>> {
        Ok(self.read().places.get(&id).cloned())
    }

    async fn work_hours_on_date(&self, teacher_id: Uuid, date: NaiveDate) -> AppResult<Vec<WorkHours>> {
        let mut found: Vec<WorkHours> = self
            .read()
            .work_hours
            .iter()
            .filter(|w| w.teacher_id == teacher_id && w.on_date == Some(date))
            .cloned()
            .collect();
        by_start(&mut found);
        Ok(found)
    }

    async fn work_hours_on_weekday(&self, teacher_id: Uuid, day: i32) -> AppResult<Vec<WorkHours>> {
        let mut found: Vec<WorkHours> = self
            .read()
            .work_hours
            .iter()
            .filter(|w| w.teacher_id == teacher_id && w.on_date.is_none() && w.day == day)
            .cloned()
            .collect();
        by_start(&mut found);
        Ok(found)
    }

    async fn list_work_hours(&self, teacher_id: Uuid) -> AppResult<Vec<WorkHours>> {
        let mut found: Vec<WorkHours> = self
            .read()
            .work_hours
            .iter()
            .filter(|w| w.teacher_id == teacher_id)
            .cloned()
            .collect();
        found.sort_by_key(|w| (w.on_date, w.day, w.from_hour, w.from_minutes));
        Ok(found)
    }

    async fn replace_work_hours(
        &self,
        teacher_id: Uuid,
        target: WorkHoursTarget,
        entries: Vec<NewWorkHours>,
    ) -> AppResult<Vec<WorkHours>> {
        let created: Vec<WorkHours> = entries
            .into_iter()
            .map(|new| WorkHours::from_new(teacher_id, target, new))
            .collect();

        let mut tables = self.write();
        tables.work_hours.retain(|w| {
            w.teacher_id != teacher_id
                || match target {
                    WorkHoursTarget::Weekday(day) => w.on_date.is_some() || w.day != day,
                    WorkHoursTarget::Date(date) => w.on_date != Some(date),
                }
        });
        tables.work_hours.extend(created.iter().cloned());
        Ok(created)
    }

    async fn delete_work_hours(&self, teacher_id: Uuid, id: Uuid) -> AppResult<bool> {
        let mut tables = self.write();
        let before = tables.work_hours.len();
        tables
            .work_hours
            .retain(|w| !(w.id == id && w.teacher_id == teacher_id));
        Ok(tables.work_hours.len() < before)
    }

    async fn appointments_on_date(&self, teacher_id: Uuid, date: NaiveDate) -> AppResult<Vec<Appointment>> {
        let mut found: Vec<Appointment> = self
            .read()
            .appointments
            .iter()
            .filter(|a| a.teacher_id == teacher_id && !a.deleted && a.date.date() == date)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.date);
        Ok(found)
    }

    async fn find_appointment(&self, id: Uuid) -> AppResult<Option<Appointment>> {
        Ok(self.read().appointments.iter().find(|a| a.id == id).cloned())
    }

    async fn count_student_appointments_between(
        &self,
        student_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> AppResult<i64> {
        let count = self
            .read()
            .appointments
            .iter()
            .filter(|a| {
                a.student_id == Some(student_id) && !a.deleted && a.date >= from && a.date < to
            })
            .count();
        Ok(count as i64)
    }

    async fn count_approved_lessons_before(&self, student_id: Uuid, before: NaiveDateTime) -> AppResult<i64> {
        let count = self
            .read()
            .appointments
            .iter()
            .filter(|a| {
                a.student_id == Some(student_id)
                    && a.is_approved
                    && !a.deleted
                    && a.kind == AppointmentType::Lesson
                    && a.date < before
            })
            .count();
        Ok(count as i64)
    }

    async fn insert_appointment(
        &self,
        new: NewAppointment,
        displace: &[Uuid],
        guard: OverlapGuard,
    ) -> AppResult<Appointment> {
        let created_at = Utc::now().naive_utc();
        let mut tables = self.write();

        let end = new.date + chrono::Duration::minutes(new.duration as i64);
        let clash = tables.appointments.iter().any(|a| {
            a.teacher_id == new.teacher_id
                && !displace.contains(&a.id)
                && guard.blocks(a)
                && a.overlaps(new.date, end)
        });
        if clash {
            return Err(slot_unavailable());
        }

        for appointment in tables
            .appointments
            .iter_mut()
            .filter(|a| displace.contains(&a.id))
        {
            appointment.deleted = true;
        }

        let appointment = new.into_appointment(created_at);
        tables.appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn update_appointment(&self, id: Uuid, changes: &AppointmentChanges) -> AppResult<Appointment> {
        let mut tables = self.write();
        let appointment = tables
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| not_found_error("Appointment", &id.to_string()))?;
        changes.apply_to(appointment);
        Ok(appointment.clone())
    }

    async fn reschedule_appointment(
        &self,
        id: Uuid,
        changes: &AppointmentChanges,
        displace: &[Uuid],
        guard: OverlapGuard,
    ) -> AppResult<Appointment> {
        let mut tables = self.write();
        let mut moved = tables
            .appointments
            .iter()
            .find(|a| a.id == id && !a.deleted)
            .cloned()
            .ok_or_else(|| not_found_error("Appointment", &id.to_string()))?;
        changes.apply_to(&mut moved);

        let (start, end) = moved.interval();
        let clash = tables.appointments.iter().any(|a| {
            a.id != id
                && a.teacher_id == moved.teacher_id
                && !displace.contains(&a.id)
                && guard.blocks(a)
                && a.overlaps(start, end)
        });
        if clash {
            return Err(slot_unavailable());
        }

        for appointment in tables.appointments.iter_mut() {
            if appointment.id == id {
                *appointment = moved.clone();
            } else if displace.contains(&appointment.id) {
                appointment.deleted = true;
            }
        }
        Ok(moved)
    }

    async fn soft_delete_appointments(&self, ids: &[Uuid]) -> AppResult<Vec<Appointment>> {
        let mut tables = self.write();
        let mut deleted = Vec::new();
        for appointment in tables
            .appointments
            .iter_mut()
            .filter(|a| ids.contains(&a.id) && !a.deleted)
        {
            appointment.deleted = true;
            deleted.push(appointment.clone());
        }
        Ok(deleted)
    }

    async fn approve_appointment(&self, id: Uuid) -> AppResult<Appointment> {
        let mut tables = self.write();
        let target = tables
            .appointments
            .iter()
            .find(|a| a.id == id && !a.deleted)
            .cloned()
            .ok_or_else(|| not_found_error("Appointment", &id.to_string()))?;

        if approval_competes(&target) {
            let conflict = tables.appointments.iter().any(|a| {
                a.id != id
                    && a.teacher_id == target.teacher_id
                    && a.date == target.date
                    && a.is_approved
                    && !a.deleted
                    && approval_competes(a)
            });
            if conflict {
                return Err(AppError::ConflictDuringApproval(approval_conflict_message(&target)));
            }
        }

        let appointment = tables
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| not_found_error("Appointment", &id.to_string()))?;
        appointment.is_approved = true;
        Ok(appointment.clone())
    }

    async fn list_appointments(
        &self,
        owner: AppointmentOwner,
        filter: &AppointmentListFilter,
        now: NaiveDateTime,
    ) -> AppResult<Vec<Appointment>> {
        let mut found: Vec<Appointment> = self
            .read()
            .appointments
            .iter()
            .filter(|a| owner.owns(a) && filter.matches(a, now))
            .cloned()
            .collect();
        filter.sort(&mut found);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 1, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    fn lesson(teacher_id: Uuid, date: NaiveDateTime, approved: bool) -> NewAppointment {
        NewAppointment {
            teacher_id,
            student_id: Some(Uuid::new_v4()),
            creator_id: Uuid::new_v4(),
            date,
            duration: 60,
            is_approved: approved,
            kind: AppointmentType::Lesson,
            price: None,
            comments: None,
            meetup_place_id: None,
            dropoff_place_id: None,
        }
    }

    fn hours(from: i32, to: i32) -> NewWorkHours {
        NewWorkHours {
            from_hour: from,
            from_minutes: 0,
            to_hour: to,
            to_minutes: 0,
            car_id: None,
        }
    }

    #[tokio::test]
    async fn test_recurring_and_specific_hours_are_separate() {
        let store = MemoryScheduleStore::new();
        let teacher = Uuid::new_v4();
        let monday = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
        store.add_work_hours(teacher, WorkHoursTarget::Weekday(1), hours(8, 16));
        store.add_work_hours(teacher, WorkHoursTarget::Date(monday), hours(13, 14));

        let recurring = store.work_hours_on_weekday(teacher, 1).await.unwrap();
        let specific = store.work_hours_on_date(teacher, monday).await.unwrap();
        assert_eq!(recurring.len(), 1);
        assert_eq!(recurring[0].from_hour, 8);
        assert_eq!(specific.len(), 1);
        assert_eq!(specific[0].from_hour, 13);
    }

    #[tokio::test]
    async fn test_replace_only_touches_the_target() {
        let store = MemoryScheduleStore::new();
        let teacher = Uuid::new_v4();
        store.add_work_hours(teacher, WorkHoursTarget::Weekday(1), hours(8, 16));
        store.add_work_hours(teacher, WorkHoursTarget::Weekday(2), hours(8, 16));

        store
            .replace_work_hours(teacher, WorkHoursTarget::Weekday(1), vec![hours(9, 10), hours(11, 12)])
            .await
            .unwrap();

        assert_eq!(store.work_hours_on_weekday(teacher, 1).await.unwrap().len(), 2);
        assert_eq!(store.work_hours_on_weekday(teacher, 2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_overlap_and_keeps_displaced_alive() {
        let store = MemoryScheduleStore::new();
        let teacher = Uuid::new_v4();
        let existing = store
            .insert_appointment(lesson(teacher, at(7, 10), true), &[], OverlapGuard::AnyAppointment)
            .await
            .unwrap();
        let blocker = store.add_appointment(
            lesson(teacher, at(7, 10), false).into_appointment(at(1, 0)),
        );

        // desplazar una de las dos no basta: la otra sigue bloqueando
        let result = store
            .insert_appointment(
                lesson(teacher, at(7, 10), true),
                &[existing.id],
                OverlapGuard::AnyAppointment,
            )
            .await;
        assert!(matches!(result, Err(AppError::SlotUnavailable(_))));
        let untouched = store.find_appointment(existing.id).await.unwrap().unwrap();
        assert!(!untouched.deleted);

        let inserted = store
            .insert_appointment(
                lesson(teacher, at(7, 10), true),
                &[existing.id, blocker.id],
                OverlapGuard::AnyAppointment,
            )
            .await
            .unwrap();
        assert!(!inserted.deleted);
        assert_eq!(store.appointments_on_date(teacher, at(7, 0).date()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reschedule_rejects_overlap_and_keeps_displaced_alive() {
        let store = MemoryScheduleStore::new();
        let teacher = Uuid::new_v4();
        let moving = store.add_appointment(lesson(teacher, at(7, 8), true).into_appointment(at(1, 0)));
        let displaced = store.add_appointment(lesson(teacher, at(7, 10), true).into_appointment(at(1, 0)));
        let mut other = lesson(teacher, at(7, 10), true);
        other.date += chrono::Duration::minutes(20);
        let other = store.add_appointment(other.into_appointment(at(1, 0)));

        let to_ten = AppointmentChanges {
            date: Some(at(7, 10)),
            ..Default::default()
        };

        // 10:00-11:00 pisa también la clase de las 10:20, que no se desplaza
        let result = store
            .reschedule_appointment(moving.id, &to_ten, &[displaced.id], OverlapGuard::AnyAppointment)
            .await;
        assert!(matches!(result, Err(AppError::SlotUnavailable(_))));
        assert!(!store.find_appointment(displaced.id).await.unwrap().unwrap().deleted);
        assert_eq!(store.find_appointment(moving.id).await.unwrap().unwrap().date, at(7, 8));

        let moved = store
            .reschedule_appointment(
                moving.id,
                &to_ten,
                &[displaced.id, other.id],
                OverlapGuard::AnyAppointment,
            )
            .await
            .unwrap();
        assert_eq!(moved.date, at(7, 10));
        assert!(store.find_appointment(displaced.id).await.unwrap().unwrap().deleted);
        assert!(store.find_appointment(other.id).await.unwrap().unwrap().deleted);
    }

    #[tokio::test]
    async fn test_reschedule_does_not_clash_with_itself() {
        let store = MemoryScheduleStore::new();
        let teacher = Uuid::new_v4();
        let booked = store.add_appointment(lesson(teacher, at(7, 10), true).into_appointment(at(1, 0)));

        let later = AppointmentChanges {
            date: Some(at(7, 10) + chrono::Duration::minutes(30)),
            ..Default::default()
        };
        let moved = store
            .reschedule_appointment(booked.id, &later, &[], OverlapGuard::CommittedLessons)
            .await
            .unwrap();
        assert_eq!(moved.date, at(7, 10) + chrono::Duration::minutes(30));
    }

    #[tokio::test]
    async fn test_committed_guard_ignores_pending_requests() {
        let store = MemoryScheduleStore::new();
        let teacher = Uuid::new_v4();
        store
            .insert_appointment(lesson(teacher, at(7, 10), false), &[], OverlapGuard::CommittedLessons)
            .await
            .unwrap();
        assert!(store
            .insert_appointment(lesson(teacher, at(7, 10), false), &[], OverlapGuard::CommittedLessons)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_second_approval_at_same_start_conflicts() {
        let store = MemoryScheduleStore::new();
        let teacher = Uuid::new_v4();
        let first = store.add_appointment(lesson(teacher, at(7, 10), false).into_appointment(at(1, 0)));
        let second = store.add_appointment(lesson(teacher, at(7, 10), false).into_appointment(at(1, 0)));

        assert!(store.approve_appointment(first.id).await.unwrap().is_approved);
        let result = store.approve_appointment(second.id).await;
        assert!(matches!(result, Err(AppError::ConflictDuringApproval(_))));
    }

    #[tokio::test]
    async fn test_lesson_counts() {
        let store = MemoryScheduleStore::new();
        let teacher = Uuid::new_v4();
        let student = Uuid::new_v4();
        for (day, approved) in [(2, true), (3, false), (8, true)] {
            let mut new = lesson(teacher, at(day, 10), approved);
            new.student_id = Some(student);
            store.add_appointment(new.into_appointment(at(1, 0)));
        }

        assert_eq!(store.count_approved_lessons_before(student, at(7, 0)).await.unwrap(), 1);
        assert_eq!(
            store
                .count_student_appointments_between(student, at(1, 0), at(8, 0))
                .await
                .unwrap(),
            2
        );
    }
}
