//! Aritmética de intervalos
//!
//! Funciones puras que convierten una ventana de trabajo y una lista de
//! intervalos ocupados en rangos libres y en huecos reservables de duración fija.

use chrono::{Duration, NaiveDateTime, Timelike};

use crate::rules::Blacklist;

/// Intervalo semiabierto `[inicio, fin)`
pub type TimeRange = (NaiveDateTime, NaiveDateTime);

/// Iterador perezoso sobre los huecos libres de una ventana
#[derive(Debug, Clone)]
pub struct FreeRanges {
    bounds: std::vec::IntoIter<TimeRange>,
    cursor: NaiveDateTime,
}

impl Iterator for FreeRanges {
    type Item = TimeRange;

    fn next(&mut self) -> Option<TimeRange> {
        for (start, end) in self.bounds.by_ref() {
            let gap = (self.cursor, start);
            // los ocupados solapados no deben hacer retroceder el cursor
            self.cursor = self.cursor.max(end);
            if gap.0 < gap.1 {
                return Some(gap);
            }
        }
        None
    }
}

/// Rangos libres de `window` una vez descontados los intervalos ocupados.
///
/// Cada ocupado se recorta a la ventana (uno totalmente fuera queda como un
/// punto en el borde más cercano). La ventana aporta dos centinelas de
/// longitud cero, así que sin ocupados la ventana entera es un único rango.
pub fn free_ranges(window: TimeRange, busy: &[TimeRange]) -> FreeRanges {
    let (lower, upper) = window;
    let clamp = |t: NaiveDateTime| t.clamp(lower, upper.max(lower));

    let mut bounds: Vec<TimeRange> = busy
        .iter()
        .map(|&(start, end)| (clamp(start), clamp(end)))
        .collect();
    bounds.push((lower, lower));
    bounds.push((upper, upper));
    bounds.sort();

    FreeRanges {
        bounds: bounds.into_iter(),
        cursor: lower,
    }
}

/// Huecos de `duration` dentro de la ventana, en orden cronológico.
///
/// Se descarta un hueco si su hora de inicio está en `blacklist.start_hour`,
/// si la hora de su fin está en `blacklist.end_hour`, o si `not_before`
/// está fijado y el hueco empieza antes.
pub fn slots<'a>(
    window: TimeRange,
    busy: &[TimeRange],
    duration: Duration,
    blacklist: &'a Blacklist,
    not_before: Option<NaiveDateTime>,
) -> impl Iterator<Item = TimeRange> + 'a {
    let positive = duration > Duration::zero();

    free_ranges(window, busy)
        .filter(move |_| positive)
        .flat_map(move |(range_start, range_end)| {
            let mut cursor = range_start;
            std::iter::from_fn(move || {
                let end = cursor.checked_add_signed(duration)?;
                if end > range_end {
                    return None;
                }
                let slot = (cursor, end);
                cursor = end;
                Some(slot)
            })
        })
        .filter(move |(start, end)| {
            if not_before.map_or(false, |now| *start < now) {
                return false;
            }
            blacklist.allows(start.hour(), end.hour())
        })
}
