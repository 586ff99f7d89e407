mod common;

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{Duration, Timelike};

use common::{at, hours, long_ago, monday, School};
use driving_scheduler::config::SchedulingSettings;
use driving_scheduler::models::{AppointmentType, Coordinates, NewAppointment, WorkHoursTarget};
use driving_scheduler::rules::{PlaceDistances, RuleRegistry};
use driving_scheduler::services::{AvailabilityQuery, DistanceProvider, TravelEstimate};

fn student_query(school: &School) -> AvailabilityQuery {
    AvailabilityQuery {
        student_id: Some(school.student.id),
        only_approved: true,
        ..AvailabilityQuery::new(school.teacher.id, monday())
    }
}

fn starts(slots: &[(chrono::NaiveDateTime, chrono::NaiveDateTime)]) -> Vec<u32> {
    slots.iter().map(|(start, _)| start.hour()).collect()
}

#[tokio::test]
async fn test_one_taken_slot_in_the_middle() {
    let school = School::new(30, 10);
    school.work_monday(9, 12);
    school.appointment(Some(school.student.id), at(10, 0), 30, true, AppointmentType::Lesson);

    let slots = school
        .availability(RuleRegistry::new())
        .available_hours(&AvailabilityQuery::new(school.teacher.id, monday()), long_ago())
        .await
        .unwrap();

    assert_eq!(slots.len(), 5);
    for (start, end) in &slots {
        assert_eq!(*end - *start, Duration::minutes(30));
        assert!(*end <= at(10, 0) || *start >= at(10, 30));
    }
}

#[tokio::test]
async fn test_date_specific_hours_replace_weekly_hours() {
    let school = School::new(30, 10);
    school.work_monday(8, 16);
    school
        .store
        .add_work_hours(school.teacher.id, WorkHoursTarget::Date(monday()), hours(13, 14));

    let slots = school
        .availability(RuleRegistry::new())
        .available_hours(&AvailabilityQuery::new(school.teacher.id, monday()), long_ago())
        .await
        .unwrap();

    assert_eq!(slots, vec![(at(13, 0), at(13, 30)), (at(13, 30), at(14, 0))]);

    // el lunes siguiente vuelve al horario semanal
    let next = AvailabilityQuery::new(school.teacher.id, monday() + Duration::days(7));
    let weekly = school
        .availability(RuleRegistry::new())
        .available_hours(&next, long_ago())
        .await
        .unwrap();
    assert_eq!(weekly.len(), 16);
}

#[tokio::test]
async fn test_new_student_loses_cold_hours() {
    let school = School::new(60, 0);
    school.work_monday(7, 22);

    let slots = school
        .availability(RuleRegistry::standard(&SchedulingSettings::default(), None))
        .available_hours(&student_query(&school), long_ago())
        .await
        .unwrap();

    assert_eq!(starts(&slots), (11..=20).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_slots_are_never_in_the_past() {
    let school = School::new(30, 10);
    school.work_monday(9, 12);

    let now = at(10, 15);
    let slots = school
        .availability(RuleRegistry::new())
        .available_hours(&student_query(&school), now)
        .await
        .unwrap();

    assert_eq!(
        slots,
        vec![
            (at(10, 30), at(11, 0)),
            (at(11, 0), at(11, 30)),
            (at(11, 30), at(12, 0)),
        ]
    );
}

#[tokio::test]
async fn test_past_open_block_is_not_offered() {
    let school = School::new(45, 10);
    school.work_monday(9, 12);
    school.appointment(None, at(9, 0), 30, true, AppointmentType::Lesson);
    school.appointment(None, at(11, 0), 30, true, AppointmentType::Lesson);

    let slots = school
        .availability(RuleRegistry::new())
        .available_hours(&student_query(&school), at(9, 10))
        .await
        .unwrap();

    assert!(slots.contains(&(at(11, 0), at(11, 30))));
    assert!(!slots.iter().any(|(start, _)| *start == at(9, 0)));
    assert!(slots.windows(2).all(|pair| pair[0].0 <= pair[1].0));
}

#[tokio::test]
async fn test_pending_requests_only_count_for_the_teacher_view() {
    let school = School::new(60, 10);
    school.work_monday(9, 12);
    let other = school.another_student();
    school.appointment(Some(other.id), at(10, 0), 60, false, AppointmentType::Lesson);

    let service = school.availability(RuleRegistry::new());
    let for_student = service
        .available_hours(&student_query(&school), long_ago())
        .await
        .unwrap();
    let for_teacher = service
        .available_hours(&AvailabilityQuery::new(school.teacher.id, monday()), long_ago())
        .await
        .unwrap();

    assert_eq!(starts(&for_student), vec![9, 10, 11]);
    assert_eq!(starts(&for_teacher), vec![9, 11]);
}

#[tokio::test]
async fn test_more_rules_never_add_slots() {
    let school = School::new(60, 6);
    school.work_monday(7, 22);
    school.appointment(Some(school.student.id), at(8, 0), 60, false, AppointmentType::Lesson);
    school.appointment(Some(school.student.id), at(9, 0), 60, false, AppointmentType::Lesson);

    let without = school
        .availability(RuleRegistry::new())
        .available_hours(&student_query(&school), long_ago())
        .await
        .unwrap();
    let with = school
        .availability(RuleRegistry::standard(&SchedulingSettings::default(), None))
        .available_hours(&student_query(&school), long_ago())
        .await
        .unwrap();

    assert!(with.len() < without.len());
    assert!(with.iter().all(|slot| without.contains(slot)));
    // cupo semanal lleno: solo quedan las horas frías
    assert_eq!(starts(&with), vec![7, 8, 9, 10, 21]);
}

/// Distancia = diferencia de latitud en km
struct LatitudeProvider;

#[async_trait]
impl DistanceProvider for LatitudeProvider {
    async fn travel(&self, origin: Coordinates, destination: Coordinates) -> anyhow::Result<TravelEstimate> {
        let meters = (origin.latitude - destination.latitude).abs() * 1000.0;
        Ok(TravelEstimate {
            meters,
            seconds: meters / 20.0,
        })
    }
}

struct DownProvider;

#[async_trait]
impl DistanceProvider for DownProvider {
    async fn travel(&self, _: Coordinates, _: Coordinates) -> anyhow::Result<TravelEstimate> {
        Err(anyhow!("service unavailable"))
    }
}

/// Clase aprobada de 14:00 a 15:00 con recogida en latitud 0 y llegada en latitud 40;
/// el alumno pide recogida y llegada en latitud 0
async fn place_scenario(provider: Arc<dyn DistanceProvider>) -> Vec<u32> {
    let school = School::new(60, 10);
    school.work_monday(9, 20);

    let other = school.another_student();
    let near = school.place(&other, 0.0);
    let far = school.place(&other, 40.0);
    school.add(NewAppointment {
        meetup_place_id: Some(near.id),
        dropoff_place_id: Some(far.id),
        ..school.draft(Some(other.id), at(14, 0), 60, true, AppointmentType::Lesson)
    });

    let mine = school.place(&school.student, 0.0);
    let query = AvailabilityQuery {
        meetup_place_id: Some(mine.id),
        dropoff_place_id: Some(mine.id),
        ..student_query(&school)
    };

    let rules = RuleRegistry::new().with_rule(
        PlaceDistances::new(
            provider,
            &SchedulingSettings::default(),
        ),
    );
    let slots = school
        .availability(rules)
        .available_hours(&query, long_ago())
        .await
        .unwrap();
    starts(&slots)
}

#[tokio::test]
async fn test_far_dropoff_blocks_the_following_start() {
    let hours = place_scenario(Arc::new(LatitudeProvider)).await;
    assert!(!hours.contains(&15));
    assert!(hours.contains(&13));
}

#[tokio::test]
async fn test_distance_outage_degrades_to_no_blacklist() {
    let hours = place_scenario(Arc::new(DownProvider)).await;
    assert!(hours.contains(&15));
    assert!(hours.contains(&13));
}
