use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::{NewWorkHours, WorkHoursTarget};
use crate::utils::errors::{invalid_request, AppResult};
use crate::utils::validation::{parse_date, validate_time_order};

// Un bloque de horario
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_entry_order"))]
pub struct WorkHoursEntry {
    #[validate(range(min = 0, max = 23))]
    pub from_hour: i32,
    #[validate(range(min = 0, max = 59))]
    pub from_minutes: i32,
    #[validate(range(min = 0, max = 23))]
    pub to_hour: i32,
    #[validate(range(min = 0, max = 59))]
    pub to_minutes: i32,
    pub car_id: Option<Uuid>,
}

fn validate_entry_order(entry: &WorkHoursEntry) -> Result<(), ValidationError> {
    validate_time_order(
        entry.from_hour,
        entry.from_minutes,
        entry.to_hour,
        entry.to_minutes,
    )
}

impl From<WorkHoursEntry> for NewWorkHours {
    fn from(entry: WorkHoursEntry) -> Self {
        Self {
            from_hour: entry.from_hour,
            from_minutes: entry.from_minutes,
            to_hour: entry.to_hour,
            to_minutes: entry.to_minutes,
            car_id: entry.car_id,
        }
    }
}

// Request para sustituir el horario de un día de la semana o de una fecha
#[derive(Debug, Deserialize, Validate)]
pub struct ReplaceWorkHoursRequest {
    #[validate(range(min = 0, max = 6))]
    pub day: Option<i32>,
    /// `YYYY-MM-DD`; si llega, tiene prioridad sobre `day`
    pub on_date: Option<String>,
    #[validate]
    pub hours: Vec<WorkHoursEntry>,
}

impl ReplaceWorkHoursRequest {
    pub fn target(&self) -> AppResult<WorkHoursTarget> {
        match (self.on_date.as_deref(), self.day) {
            (Some(raw), _) => parse_date(Some(raw))
                .map(WorkHoursTarget::Date)
                .ok_or_else(|| invalid_request("Date is not valid.")),
            (None, Some(day)) => Ok(WorkHoursTarget::Weekday(day)),
            (None, None) => Err(invalid_request("Either day or on_date is required.")),
        }
    }

    pub fn into_entries(self) -> Vec<NewWorkHours> {
        self.hours.into_iter().map(NewWorkHours::from).collect()
    }
}

// Query de GET work_days
#[derive(Debug, Default, Deserialize)]
pub struct WorkDaysQuery {
    pub on_date: Option<String>,
}
