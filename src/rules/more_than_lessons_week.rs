use std::collections::BTreeSet;

use async_trait::async_trait;

use super::{LessonRule, RuleContext};

/// Citas en la semana a partir de las cuales el alumno solo ve horas frías
const WEEKLY_QUOTA: i64 = 2;
const HOT_SCORE: i32 = 4;

/// Si el alumno ya tiene 2 citas esta semana, se vetan las horas con puntuación > 4
pub struct MoreThanLessonsWeek;

impl MoreThanLessonsWeek {
    pub fn filter(&self, ctx: &RuleContext<'_>) -> i64 {
        ctx.student.appointments_this_week
    }
}

#[async_trait]
impl LessonRule for MoreThanLessonsWeek {
    fn name(&self) -> &'static str {
        "more_than_lessons_week"
    }

    async fn start_hour_rule(&self, ctx: &RuleContext<'_>) -> BTreeSet<u32> {
        if self.filter(ctx) >= WEEKLY_QUOTA {
            return ctx.hours.hours_where(|score| score > HOT_SCORE);
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
    async fn test_under_quota_blacklists_nothing() {
        let student = standing(3, 1);
        let hours = HourScores::baseline();
        let blacklist = MoreThanLessonsWeek.blacklisted(&context(&student, &hours)).await;
        assert!(blacklist.is_empty());
    }

    #[tokio::test]
    async fn test_over_quota_keeps_only_cold_hours() {
        let student = standing(3, 2);
        let hours = HourScores::baseline();
        let blacklist = MoreThanLessonsWeek.blacklisted(&context(&student, &hours)).await;

        assert!(blacklist.start_hour.contains(&14));
        assert!(blacklist.start_hour.contains(&11));
        assert!(!blacklist.start_hour.contains(&7));
        assert!(!blacklist.start_hour.contains(&21));
        assert!(blacklist.end_hour.is_empty());
    }
}
