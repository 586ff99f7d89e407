#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use driving_scheduler::config::SchedulingSettings;
use driving_scheduler::models::{
    Appointment, AppointmentType, NewAppointment, NewWorkHours, Place, Student, Teacher,
    WorkHoursTarget,
};
use driving_scheduler::repositories::MemoryScheduleStore;
use driving_scheduler::rules::RuleRegistry;
use driving_scheduler::services::{AvailabilityService, BookingService, Notifier};

/// 2030-01-07 es lunes
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
}

pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    monday().and_hms_opt(hour, minute, 0).unwrap()
}

pub fn long_ago() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2029, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn hours(from: i32, to: i32) -> NewWorkHours {
    NewWorkHours {
        from_hour: from,
        from_minutes: 0,
        to_hour: to,
        to_minutes: 0,
        car_id: None,
    }
}

/// Guarda las notificaciones enviadas
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(Uuid, String)>>,
}

impl RecordingNotifier {
    pub fn titles_for(&self, user_id: Uuid) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, title)| title.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: Uuid, title: &str, _body: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((user_id, title.to_string()));
        Ok(())
    }
}

pub struct School {
    pub store: Arc<MemoryScheduleStore>,
    pub teacher: Teacher,
    pub student: Student,
    pub notifier: Arc<RecordingNotifier>,
}

impl School {
    /// Profesor con clases de `lesson_duration` minutos y un alumno con
    /// `old_lessons` clases previas
    pub fn new(lesson_duration: i32, old_lessons: i32) -> Self {
        let store = Arc::new(MemoryScheduleStore::new());
        let teacher = store.add_teacher(Teacher {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            price: 100,
            lesson_duration,
        });
        let student = store.add_student(Student {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            teacher_id: teacher.id,
            price: Some(80),
            number_of_old_lessons: old_lessons,
        });
        Self {
            store,
            teacher,
            student,
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    pub fn work_monday(&self, from: i32, to: i32) {
        self.store
            .add_work_hours(self.teacher.id, WorkHoursTarget::Weekday(1), hours(from, to));
    }

    pub fn another_student(&self) -> Student {
        self.store.add_student(Student {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            teacher_id: self.teacher.id,
            price: None,
            number_of_old_lessons: 10,
        })
    }

    pub fn place(&self, student: &Student, latitude: f64) -> Place {
        self.store.add_place(Place {
            id: Uuid::new_v4(),
            student_id: student.id,
            description: format!("lat {}", latitude),
            latitude,
            longitude: 0.0,
        })
    }

    pub fn draft(
        &self,
        student_id: Option<Uuid>,
        date: NaiveDateTime,
        duration: i32,
        approved: bool,
        kind: AppointmentType,
    ) -> NewAppointment {
        NewAppointment {
            teacher_id: self.teacher.id,
            student_id,
            creator_id: self.teacher.user_id,
            date,
            duration,
            is_approved: approved,
            kind,
            price: None,
            comments: None,
            meetup_place_id: None,
            dropoff_place_id: None,
        }
    }

    pub fn add(&self, new: NewAppointment) -> Appointment {
        self.store.add_appointment(new.into_appointment(long_ago()))
    }

    pub fn appointment(
        &self,
        student_id: Option<Uuid>,
        date: NaiveDateTime,
        duration: i32,
        approved: bool,
        kind: AppointmentType,
    ) -> Appointment {
        self.add(self.draft(student_id, date, duration, approved, kind))
    }

    pub fn availability(&self, rules: RuleRegistry) -> AvailabilityService {
        AvailabilityService::new(
            self.store.clone(),
            Arc::new(rules),
            SchedulingSettings::default(),
        )
    }

    pub fn bookings(&self) -> BookingService {
        BookingService::new(
            self.store.clone(),
            self.availability(RuleRegistry::new()),
            self.notifier.clone(),
        )
    }
}
