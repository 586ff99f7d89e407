//! Motor de reglas
//!
//! Cada regla mira el estado del alumno, del profesor y del día y devuelve
//! las horas que veta como inicio o fin de clase. El resultado final es la
//! unión de todas las reglas registradas, sin precedencia entre ellas.
//!
//! El registro se construye una sola vez al arrancar (`RuleRegistry::standard`)
//! y se comparte en solo lectura entre peticiones.

pub mod blacklist;
pub mod more_than_lessons_week;
pub mod new_students;
pub mod place_distance;
pub mod regular_students;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::config::SchedulingSettings;
use crate::models::{Appointment, Place, StudentStanding};
use crate::services::distance_service::DistanceProvider;
use crate::services::hour_scores::HourScores;

pub use blacklist::Blacklist;
pub use more_than_lessons_week::MoreThanLessonsWeek;
pub use new_students::NewStudents;
pub use place_distance::PlaceDistances;
pub use regular_students::RegularStudents;

/// Clase aprobada del día con sus lugares ya resueltos
#[derive(Debug, Clone)]
pub struct ScheduledLesson {
    pub appointment: Appointment,
    pub meetup: Option<Place>,
    pub dropoff: Option<Place>,
}

/// Lugares propuestos para la clase que se quiere reservar
#[derive(Debug, Clone)]
pub struct RequestedPlaces {
    pub meetup: Place,
    pub dropoff: Place,
}

/// Todo lo que una regla puede consultar. Lo prepara el calculador de
/// disponibilidad; las reglas no acceden al almacenamiento.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub date: NaiveDate,
    pub student: &'a StudentStanding,
    pub hours: &'a HourScores,
    pub places: Option<&'a RequestedPlaces>,
    pub today_lessons: &'a [ScheduledLesson],
}

/// Regla de negocio que veta horas. Debe ser total y sin efectos secundarios:
/// ante cualquier fallo devuelve conjuntos vacíos.
#[async_trait]
pub trait LessonRule: Send + Sync {
    fn name(&self) -> &'static str;

    async fn start_hour_rule(&self, _ctx: &RuleContext<'_>) -> BTreeSet<u32> {
        BTreeSet::new()
    }

    async fn end_hour_rule(&self, _ctx: &RuleContext<'_>) -> BTreeSet<u32> {
        BTreeSet::new()
    }

    async fn blacklisted(&self, ctx: &RuleContext<'_>) -> Blacklist {
        Blacklist::new(self.start_hour_rule(ctx).await, self.end_hour_rule(ctx).await)
    }
}

/// Lista inmutable de reglas activas
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<Arc<dyn LessonRule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule<R: LessonRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Reglas de la autoescuela. La de distancias solo se registra si hay
    /// proveedor de distancias configurado.
    pub fn standard(
        settings: &SchedulingSettings,
        distances: Option<Arc<dyn DistanceProvider>>,
    ) -> Self {
        let registry = Self::new()
            .with_rule(MoreThanLessonsWeek)
            .with_rule(NewStudents)
            .with_rule(RegularStudents);

        match distances {
            Some(provider) => registry.with_rule(PlaceDistances::new(provider, settings)),
            None => {
                log::info!("📍 Sin proveedor de distancias: regla PlaceDistances desactivada");
                registry
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Evalúa todas las reglas y une sus listas negras
    pub async fn blacklist(&self, ctx: &RuleContext<'_>) -> Blacklist {
        let results =
            futures::future::join_all(self.rules.iter().map(|rule| rule.blacklisted(ctx))).await;

        let mut merged = Blacklist::default();
        for (rule, blacklist) in self.rules.iter().zip(results) {
            if !blacklist.is_empty() {
                log::debug!(
                    "🚫 Regla {}: inicio {:?}, fin {:?}",
                    rule.name(),
                    blacklist.start_hour,
                    blacklist.end_hour
                );
            }
            merged.merge(blacklist);
        }
        merged
    }
}
