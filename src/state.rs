//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::ScheduleStore;
use crate::rules::RuleRegistry;
use crate::services::{AvailabilityService, BookingService, Notifier};
use crate::utils::jwt::JwtConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ScheduleStore>,
    pub config: EnvironmentConfig,
    pub rules: Arc<RuleRegistry>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        config: EnvironmentConfig,
        rules: RuleRegistry,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            config,
            rules: Arc::new(rules),
            notifier,
        }
    }

    pub fn availability(&self) -> AvailabilityService {
        AvailabilityService::new(
            self.store.clone(),
            self.rules.clone(),
            self.config.scheduling.clone(),
        )
    }

    pub fn bookings(&self) -> BookingService {
        BookingService::new(self.store.clone(), self.availability(), self.notifier.clone())
    }

    pub fn jwt(&self) -> JwtConfig {
        JwtConfig::from(&self.config)
    }
}
