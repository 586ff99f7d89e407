use std::collections::BTreeSet;

use async_trait::async_trait;

use super::{LessonRule, RuleContext};

const REGULAR_RANGE: std::ops::RangeInclusive<i64> = 10..=20;
const HOT_SCORE: i32 = 8;

/// Alumnos con 10-20 clases: se vetan las horas con puntuación > 8
pub struct RegularStudents;

impl RegularStudents {
    pub fn filter(&self, ctx: &RuleContext<'_>) -> i64 {
        ctx.student.lessons_done
    }
}

#[async_trait]
impl LessonRule for RegularStudents {
    fn name(&self) -> &'static str {
        "regular_students"
    }

    async fn start_hour_rule(&self, ctx: &RuleContext<'_>) -> BTreeSet<u32> {
        if REGULAR_RANGE.contains(&self.filter(ctx)) {
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
    async fn test_tier_bounds() {
        let hours = HourScores::baseline();
        for (lessons, expected_empty) in [(9, true), (10, false), (20, false), (21, true)] {
            let student = standing(lessons, 0);
            let blacklist = RegularStudents.blacklisted(&context(&student, &hours)).await;
            assert_eq!(blacklist.is_empty(), expected_empty, "{} lessons", lessons);
        }
    }

    #[tokio::test]
    async fn test_regular_student_loses_peak_hours() {
        let student = standing(15, 0);
        let hours = HourScores::baseline();
        let blacklist = RegularStudents.blacklisted(&context(&student, &hours)).await;
        assert_eq!(blacklist.start_hour, [14, 15, 16].into());
    }
}
