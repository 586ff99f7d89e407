//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! y conversión de fechas de la API.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use validator::ValidationError;

use crate::utils::errors::{invalid_request, AppResult};

/// Formato de día: `2030-01-07`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Formato de hora de cita: `2030-01-07T13:30Z`
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

const DATETIME_FALLBACKS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Día de la petición; `None` si falta o no se puede leer
pub fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value?.trim(), DATE_FORMAT).ok()
}

/// Hora de cita en UTC. Acepta el formato de la API, RFC 3339 y variantes sin zona.
pub fn parse_datetime(value: &str) -> AppResult<NaiveDateTime> {
    let value = value.trim();
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, DATETIME_FORMAT) {
        return Ok(parsed);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.naive_utc());
    }
    DATETIME_FALLBACKS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| invalid_request("Date is not valid."))
}

pub fn format_datetime(value: NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

/// Validar que el inicio de un horario sea anterior al fin
pub fn validate_time_order(
    from_hour: i32,
    from_minutes: i32,
    to_hour: i32,
    to_minutes: i32,
) -> Result<(), ValidationError> {
    if (from_hour, from_minutes) >= (to_hour, to_minutes) {
        let mut error = ValidationError::new("time_order");
        error.add_param("from".into(), &format!("{:02}:{:02}", from_hour, from_minutes));
        error.add_param("to".into(), &format!("{:02}:{:02}", to_hour, to_minutes));
        error.message = Some("There must be a bigger difference between the two times.".into());
        return Err(error);
    }
    Ok(())
}
