//! Conversión de días de la semana
//!
//! El dominio numera los días 0=domingo .. 6=sábado. chrono e ISO usan
//! 1=lunes .. 7=domingo; aquí está la única tabla de conversión.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};

/// ISO 1..=7 (lunes..domingo) → dominio 0..=6 (domingo..sábado)
const ISO_TO_DOMAIN: [i32; 7] = [1, 2, 3, 4, 5, 6, 0];

pub fn domain_weekday_from_iso(iso_weekday: u32) -> Option<i32> {
    match iso_weekday {
        1..=7 => Some(ISO_TO_DOMAIN[(iso_weekday - 1) as usize]),
        _ => None,
    }
}

/// Día del dominio de una fecha del calendario
pub fn domain_weekday(date: NaiveDate) -> i32 {
    ISO_TO_DOMAIN[date.weekday().number_from_monday() as usize - 1]
}

/// Primer día de la semana que contiene `date`
pub fn start_of_week(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset =
        (7 + date.weekday().num_days_from_monday() - week_start.num_days_from_monday()) % 7;
    date - Duration::days(offset as i64)
}

/// Semana natural de `date` como `[primer día 00:00, día siguiente al último 00:00)`
pub fn week_bounds(date: NaiveDate, week_start: Weekday) -> (NaiveDateTime, NaiveDateTime) {
    let first = start_of_week(date, week_start);
    let start = first.and_time(chrono::NaiveTime::MIN);
    (start, start + Duration::days(7))
}
