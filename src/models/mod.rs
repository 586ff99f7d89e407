//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos que mapean al schema PostgreSQL
//! (ver `migrations/`).

pub mod appointment;
pub mod place;
pub mod teacher;
pub mod work_hours;

pub use appointment::{Appointment, AppointmentChanges, AppointmentType, NewAppointment};
pub use place::{Coordinates, Place, PlaceType};
pub use teacher::{Student, StudentStanding, Teacher};
pub use work_hours::{NewWorkHours, WorkHours, WorkHoursTarget};
