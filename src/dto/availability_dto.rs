use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::services::{AvailabilityQuery, Booker};
use crate::utils::slots::TimeRange;
use crate::utils::validation::{format_datetime, parse_date};

// Request de horas disponibles de un profesor
#[derive(Debug, Default, Deserialize, Validate)]
pub struct AvailableHoursRequest {
    /// `YYYY-MM-DD`; ausente o ilegible da una lista vacía
    pub date: Option<String>,
    pub student_id: Option<Uuid>,
    /// Minutos
    #[validate(range(min = 1, max = 1440))]
    pub duration: Option<i64>,
    pub meetup_place_id: Option<Uuid>,
    pub dropoff_place_id: Option<Uuid>,
    pub only_approved: Option<bool>,
}

impl AvailableHoursRequest {
    /// Un alumno siempre consulta para sí mismo y solo ve clases aprobadas como ocupadas
    pub fn into_query(self, teacher_id: Uuid, booker: &Booker) -> AvailabilityQuery {
        let (student_id, only_approved) = match booker {
            Booker::Student(student) => (Some(student.id), true),
            Booker::Teacher(_) => (self.student_id, self.only_approved.unwrap_or(false)),
        };

        AvailabilityQuery {
            teacher_id,
            date: parse_date(self.date.as_deref()),
            student_id,
            duration: self.duration,
            only_approved,
            meetup_place_id: self.meetup_place_id,
            dropoff_place_id: self.dropoff_place_id,
            ignore_appointment: None,
        }
    }
}

/// `[[inicio, fin], ...]` en formato de la API
pub fn slots_response(slots: &[TimeRange]) -> Vec<[String; 2]> {
    slots
        .iter()
        .map(|(start, end)| [format_datetime(*start), format_datetime(*end)])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Student, Teacher};

    fn student() -> Student {
        Student {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            price: None,
            number_of_old_lessons: 0,
        }
    }

    #[test]
    fn test_student_query_is_forced() {
        let me = student();
        let request = AvailableHoursRequest {
            date: Some("2030-01-07".to_string()),
            student_id: Some(Uuid::new_v4()),
            only_approved: Some(false),
            ..Default::default()
        };
        let query = request.into_query(me.teacher_id, &Booker::Student(me.clone()));
        assert_eq!(query.student_id, Some(me.id));
        assert!(query.only_approved);
        assert!(query.date.is_some());
    }

    #[test]
    fn test_duration_must_fit_in_a_day() {
        let request = |duration| AvailableHoursRequest {
            duration: Some(duration),
            ..Default::default()
        };
        assert!(request(60).validate().is_ok());
        assert!(request(0).validate().is_err());
        assert!(request(100_000_000_000_000).validate().is_err());
        assert!(AvailableHoursRequest::default().validate().is_ok());
    }

    #[test]
    fn test_teacher_query_keeps_choices_and_bad_date_is_none() {
        let teacher = Teacher {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            price: 100,
            lesson_duration: 40,
        };
        let request = AvailableHoursRequest {
            date: Some("next monday".to_string()),
            ..Default::default()
        };
        let query = request.into_query(teacher.id, &Booker::Teacher(teacher));
        assert_eq!(query.student_id, None);
        assert!(!query.only_approved);
        assert_eq!(query.date, None);
    }
}
