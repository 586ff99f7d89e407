//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y los parámetros del motor
//! de disponibilidad. Los valores que no se pueden interpretar vuelven al
//! valor por defecto con un aviso.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::Weekday;

/// Parámetros del cálculo de huecos y de las reglas
#[derive(Debug, Clone)]
pub struct SchedulingSettings {
    /// Primer día de la semana para el cupo semanal
    pub week_start: Weekday,
    pub max_place_distance_meters: f64,
    pub max_place_duration_seconds: f64,
    pub distance_timeout: Duration,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            week_start: Weekday::Sun,
            max_place_distance_meters: 15_000.0,
            max_place_duration_seconds: 1_200.0,
            distance_timeout: Duration::from_millis(2_000),
        }
    }
}

impl SchedulingSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            week_start: env_or("WEEK_START", defaults.week_start),
            max_place_distance_meters: env_or(
                "MAX_PLACE_DISTANCE_METERS",
                defaults.max_place_distance_meters,
            ),
            max_place_duration_seconds: env_or(
                "MAX_PLACE_DURATION_SECONDS",
                defaults.max_place_duration_seconds,
            ),
            distance_timeout: Duration::from_millis(env_or(
                "DISTANCE_TIMEOUT_MS",
                defaults.distance_timeout.as_millis() as u64,
            )),
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub jwt_secret: String,
    /// Segundos de validez de un token
    pub jwt_expiration: u64,
    pub cors_origins: Vec<String>,
    pub mapbox_token: Option<String>,
    pub scheduling: SchedulingSettings,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            jwt_secret: "change-me".to_string(),
            jwt_expiration: 24 * 60 * 60,
            cors_origins: vec!["http://localhost:5173".to_string()],
            mapbox_token: None,
            scheduling: SchedulingSettings::default(),
        }
    }
}

impl EnvironmentConfig {
    /// Leer la configuración de las variables de entorno
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            port: env_or("PORT", defaults.port),
            host: env::var("HOST").unwrap_or(defaults.host),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                log::warn!("⚠️ JWT_SECRET no definido, usando el secreto de desarrollo");
                defaults.jwt_secret
            }),
            jwt_expiration: env_or("JWT_EXPIRATION", defaults.jwt_expiration),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            mapbox_token: env::var("MAPBOX_TOKEN").ok().filter(|t| !t.is_empty()),
            scheduling: SchedulingSettings::from_env(),
        }
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("⚠️ {}={} no es válido, usando {:?}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
