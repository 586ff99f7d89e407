//! Modelo de deseabilidad por hora
//!
//! Tabla fija hora → puntuación base, ajustada en cada petición según lo
//! "lleno" que esté el día. Se copia entera en cada petición: la tabla base
//! nunca se modifica.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use crate::utils::slots::{free_ranges, TimeRange};

/// Primera hora de la tabla (07:00)
pub const FIRST_HOUR: u32 = 7;

/// 07:00 .. 22:00
const BASELINE: [i32; 16] = [1, 2, 3, 3, 5, 7, 8, 9, 9, 9, 8, 8, 7, 5, 3, 1];

const MAX_DECREASE: i32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourScore {
    pub hour: u32,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourScores(Vec<HourScore>);

impl HourScores {
    /// Copia nueva de la tabla base
    pub fn baseline() -> Self {
        Self(
            BASELINE
                .iter()
                .enumerate()
                .map(|(offset, &score)| HourScore {
                    hour: FIRST_HOUR + offset as u32,
                    score,
                })
                .collect(),
        )
    }

    /// Puntuaciones del día a partir de las ventanas de trabajo y de las clases
    /// ya aprobadas.
    ///
    /// Para cada hora de cada rango libre se cuenta cuántas clases caben antes
    /// (`before`) y cuántas más caben después de una que empiece ahí (`after`).
    /// La hora baja `round(before·after / (before+after))`, como mucho 9 y sin
    /// pasar de cero: las horas pegadas a una clase conservan la puntuación y
    /// las aisladas en medio de un hueco grande se enfrían.
    pub fn build(windows: &[TimeRange], approved_taken: &[TimeRange], duration: Duration) -> Self {
        let mut scores = Self::baseline();
        if windows.is_empty() || approved_taken.is_empty() || duration <= Duration::zero() {
            return scores;
        }

        let lesson_minutes = duration.num_minutes();
        for &window in windows {
            for (range_start, range_end) in free_ranges(window, approved_taken) {
                for hour in range_start.hour()..=range_end.hour() {
                    let Some(anchor) = hour_anchor(range_start, hour) else {
                        continue;
                    };
                    if anchor >= range_end {
                        continue;
                    }
                    let fit_after = (range_end - anchor).num_minutes() / lesson_minutes;
                    if fit_after == 0 {
                        continue;
                    }
                    let before = (anchor - range_start).num_minutes() / lesson_minutes;
                    let after = fit_after - 1;
                    if before + after == 0 {
                        continue;
                    }
                    let decrease = ((before * after) as f64 / (before + after) as f64).round() as i32;
                    scores.decrease(hour, decrease.min(MAX_DECREASE));
                }
            }
        }

        log::debug!("🔥 Puntuaciones del día: {:?}", scores.0);
        scores
    }

    pub fn score(&self, hour: u32) -> Option<i32> {
        self.0.iter().find(|h| h.hour == hour).map(|h| h.score)
    }

    /// Horas cuya puntuación cumple `predicate`
    pub fn hours_where(&self, predicate: impl Fn(i32) -> bool) -> BTreeSet<u32> {
        self.0
            .iter()
            .filter(|h| predicate(h.score))
            .map(|h| h.hour)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HourScore> {
        self.0.iter()
    }

    fn decrease(&mut self, hour: u32, by: i32) {
        if let Some(entry) = self.0.iter_mut().find(|h| h.hour == hour) {
            entry.score = (entry.score - by).max(0);
        }
    }
}

/// Inicio efectivo de `hour` dentro de un rango que empieza en `range_start`
fn hour_anchor(range_start: NaiveDateTime, hour: u32) -> Option<NaiveDateTime> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
    Some(NaiveDateTime::new(range_start.date(), time).max(range_start))
}
