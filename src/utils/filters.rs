//! Filtros del listado de citas
//!
//! Cada clave de la query string tiene su variante y cada columna ordenable
//! su comparador. Las claves o valores desconocidos se rechazan aquí, antes
//! de llegar al almacenamiento.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::models::Appointment;
use crate::utils::errors::{AppError, AppResult};

/// Claves aceptadas en `GET /api/appointments`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKey {
    Show,
    Deleted,
    StudentId,
    OrderBy,
}

impl FromStr for FilterKey {
    type Err = AppError;

    fn from_str(key: &str) -> AppResult<Self> {
        match key {
            "show" => Ok(FilterKey::Show),
            "deleted" => Ok(FilterKey::Deleted),
            "student_id" => Ok(FilterKey::StudentId),
            "order_by" => Ok(FilterKey::OrderBy),
            other => Err(AppError::InvalidRequest(format!("Unknown filter '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Show {
    #[default]
    Upcoming,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    Date,
    CreatedAt,
    Duration,
}

impl SortColumn {
    /// Columna SQL; solo sale de esta tabla, nunca de la petición
    pub fn column(&self) -> &'static str {
        match self {
            SortColumn::Date => "date",
            SortColumn::CreatedAt => "created_at",
            SortColumn::Duration => "duration",
        }
    }

    pub fn compare(&self, a: &Appointment, b: &Appointment) -> Ordering {
        match self {
            SortColumn::Date => a.date.cmp(&b.date),
            SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
            SortColumn::Duration => a.duration.cmp(&b.duration),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub column: SortColumn,
    pub descending: bool,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            column: SortColumn::Date,
            descending: true,
        }
    }
}

impl SortOrder {
    pub fn sql(&self) -> String {
        format!(
            "{} {}",
            self.column.column(),
            if self.descending { "DESC" } else { "ASC" }
        )
    }

    pub fn compare(&self, a: &Appointment, b: &Appointment) -> Ordering {
        let ordering = self.column.compare(a, b);
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

impl FromStr for SortOrder {
    type Err = AppError;

    /// `date`, `date asc`, `created_at desc`...
    fn from_str(value: &str) -> AppResult<Self> {
        let mut parts = value.split_whitespace();
        let column = match parts.next() {
            Some("date") => SortColumn::Date,
            Some("created_at") => SortColumn::CreatedAt,
            Some("duration") => SortColumn::Duration,
            _ => return Err(AppError::InvalidRequest(format!("Cannot order by '{}'", value))),
        };
        let descending = match parts.next() {
            None | Some("desc") => true,
            Some("asc") => false,
            Some(other) => {
                return Err(AppError::InvalidRequest(format!("Unknown direction '{}'", other)))
            }
        };
        if parts.next().is_some() {
            return Err(AppError::InvalidRequest(format!("Cannot order by '{}'", value)));
        }
        Ok(Self { column, descending })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentListFilter {
    pub show: Show,
    pub deleted: bool,
    pub student_id: Option<Uuid>,
    pub order: SortOrder,
}

impl AppointmentListFilter {
    pub fn from_pairs<'a, I>(pairs: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut filter = Self::default();
        for (key, value) in pairs {
            match key.parse::<FilterKey>()? {
                FilterKey::Show => {
                    filter.show = match value {
                        "upcoming" => Show::Upcoming,
                        "history" => Show::History,
                        other => {
                            return Err(AppError::InvalidRequest(format!(
                                "Unknown show value '{}'",
                                other
                            )))
                        }
                    }
                }
                FilterKey::Deleted => {
                    filter.deleted = value.parse().map_err(|_| {
                        AppError::InvalidRequest(format!("deleted must be a boolean, got '{}'", value))
                    })?
                }
                FilterKey::StudentId => {
                    filter.student_id = Some(Uuid::parse_str(value).map_err(|_| {
                        AppError::InvalidRequest(format!("Invalid student_id '{}'", value))
                    })?)
                }
                FilterKey::OrderBy => filter.order = value.parse()?,
            }
        }
        Ok(filter)
    }

    pub fn matches(&self, appointment: &Appointment, now: NaiveDateTime) -> bool {
        let in_window = match self.show {
            Show::Upcoming => appointment.date >= now,
            Show::History => appointment.date < now,
        };
        in_window
            && appointment.deleted == self.deleted
            && self
                .student_id
                .map_or(true, |id| appointment.student_id == Some(id))
    }

    pub fn sort(&self, appointments: &mut [Appointment]) {
        appointments.sort_by(|a, b| self.order.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let filter = AppointmentListFilter::from_pairs(std::iter::empty()).unwrap();
        assert_eq!(filter.show, Show::Upcoming);
        assert!(!filter.deleted);
        assert_eq!(filter.order.sql(), "date DESC");
    }

    #[test]
    fn test_known_keys() {
        let student = Uuid::new_v4().to_string();
        let filter = AppointmentListFilter::from_pairs([
            ("show", "history"),
            ("deleted", "true"),
            ("student_id", student.as_str()),
            ("order_by", "created_at asc"),
        ])
        .unwrap();

        assert_eq!(filter.show, Show::History);
        assert!(filter.deleted);
        assert!(filter.student_id.is_some());
        assert_eq!(filter.order.sql(), "created_at ASC");
    }

    #[test]
    fn test_unknown_keys_and_values_are_rejected() {
        assert!(AppointmentListFilter::from_pairs([("price", "10")]).is_err());
        assert!(AppointmentListFilter::from_pairs([("show", "tomorrow")]).is_err());
        assert!(AppointmentListFilter::from_pairs([("order_by", "price")]).is_err());
        assert!(AppointmentListFilter::from_pairs([("order_by", "date sideways")]).is_err());
        assert!(AppointmentListFilter::from_pairs([("order_by", "date; DROP TABLE")]).is_err());
        assert!(AppointmentListFilter::from_pairs([("deleted", "maybe")]).is_err());
    }
}
