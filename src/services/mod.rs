//! Services module
//!
//! Este módulo contiene la lógica de negocio: puntuación de horas, cálculo
//! de disponibilidad, validación de reservas y los colaboradores externos
//! (distancias y notificaciones).

pub mod availability_service;
pub mod booking_service;
pub mod distance_service;
pub mod hour_scores;
pub mod notification_service;

pub use availability_service::{AvailabilityQuery, AvailabilityService};
pub use booking_service::{Booker, BookingRequest, BookingService, EditRequest};
pub use distance_service::{DistanceProvider, MapboxDistanceService, TravelEstimate};
pub use notification_service::{LogNotifier, Notifier};
