//! Controllers de la API
//!
//! Reciben DTOs ya deserializados y delegan en los servicios.

pub mod appointment_controller;
pub mod teacher_controller;
