//! Backend de agenda de una autoescuela
//!
//! Calcula las horas libres de un profesor, valida reservas de alumnos y
//! profesores y expone todo por una API HTTP con axum.

pub mod config;
pub mod controllers;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod rules;
pub mod services;
pub mod state;
pub mod utils;
