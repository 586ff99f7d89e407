use std::collections::BTreeSet;

use async_trait::async_trait;

use super::{LessonRule, RuleContext};

const MAX_LESSONS_DONE: i64 = 5;
const COLD_SCORE: i32 = 3;

/// Alumnos con 5 clases o menos: se vetan las horas con puntuación <= 3
pub struct NewStudents;

impl NewStudents {
    pub fn filter(&self, ctx: &RuleContext<'_>) -> i64 {
        ctx.student.lessons_done
    }
}

#[async_trait]
impl LessonRule for NewStudents {
    fn name(&self) -> &'static str {
        "new_students"
    }

    async fn start_hour_rule(&self, ctx: &RuleContext<'_>) -> BTreeSet<u32> {
        if self.filter(ctx) <= MAX_LESSONS_DONE {
            return ctx.hours.hours_where(|score| score <= COLD_SCORE);
        }
        BTreeSet::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::{context, standing};
    use crate::services::hour_scores::HourScores;

    #[tokio::test]
    async fn test_new_student_avoids_cold_hours() {
        let student = standing(0, 0);
        let hours = HourScores::baseline();
        let blacklist = NewStudents.blacklisted(&context(&student, &hours)).await;
        assert_eq!(blacklist.start_hour, [7, 8, 9, 10, 21, 22].into());
    }

    #[tokio::test]
    async fn test_applies_alongside_weekly_quota() {
        // sin supresión entre reglas: sigue vetando aunque el alumno tenga cupo lleno
        let student = standing(1, 2);
        let hours = HourScores::baseline();
        let blacklist = NewStudents.blacklisted(&context(&student, &hours)).await;
        assert!(!blacklist.start_hour.is_empty());
    }

    #[tokio::test]
    async fn test_experienced_student_is_free() {
        let student = standing(6, 0);
        let hours = HourScores::baseline();
        assert!(NewStudents.blacklisted(&context(&student, &hours)).await.is_empty());
    }
}
