//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores, validación,
//! JWT, aritmética de huecos y filtros de listados.

pub mod errors;
pub mod filters;
pub mod jwt;
pub mod slots;
pub mod validation;
pub mod weekday;
