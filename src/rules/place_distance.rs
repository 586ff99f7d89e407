//! Regla de distancia entre lugares
//!
//! Si el lugar propuesto queda lejos (>15 km o >20 min en coche) de una clase
//! vecina del mismo día, se veta la hora frontera de esa clase, pero solo si
//! esa hora ya es deseable (puntuación >= 5).

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Timelike;

use super::{Blacklist, LessonRule, RuleContext, ScheduledLesson};
use crate::config::SchedulingSettings;
use crate::models::{Place, PlaceType};
use crate::services::distance_service::{DistanceProvider, TravelEstimate};

const DESIRABLE_SCORE: i32 = 5;

pub struct PlaceDistances {
    provider: Arc<dyn DistanceProvider>,
    max_distance_meters: f64,
    max_duration_seconds: f64,
    timeout: Duration,
}

impl PlaceDistances {
    pub fn new(provider: Arc<dyn DistanceProvider>, settings: &SchedulingSettings) -> Self {
        Self {
            provider,
            max_distance_meters: settings.max_place_distance_meters,
            max_duration_seconds: settings.max_place_duration_seconds,
            timeout: settings.distance_timeout,
        }
    }

    fn too_far(&self, estimate: TravelEstimate) -> bool {
        estimate.meters >= self.max_distance_meters || estimate.seconds >= self.max_duration_seconds
    }

    async fn travel(&self, origin: &Place, destination: &Place) -> Result<TravelEstimate> {
        tokio::time::timeout(
            self.timeout,
            self.provider
                .travel(origin.coordinates(), destination.coordinates()),
        )
        .await
        .map_err(|_| anyhow!("distance lookup timed out after {:?}", self.timeout))?
    }

    /// Clases de hoy cuyo lugar `place_type` queda lejos del lugar propuesto.
    ///
    /// `Meetup`: de la recogida de la clase existente a la llegada propuesta.
    /// `Dropoff`: de la recogida propuesta a la llegada de la clase existente.
    pub async fn filter<'a>(
        &self,
        ctx: &RuleContext<'a>,
        place_type: PlaceType,
    ) -> Result<Vec<&'a ScheduledLesson>> {
        let Some(requested) = ctx.places else {
            return Ok(Vec::new());
        };

        let pairs: Vec<(&'a ScheduledLesson, &Place, &Place)> = ctx
            .today_lessons
            .iter()
            .filter_map(|lesson| match place_type {
                PlaceType::Meetup => lesson
                    .meetup
                    .as_ref()
                    .map(|origin| (lesson, origin, &requested.dropoff)),
                PlaceType::Dropoff => lesson
                    .dropoff
                    .as_ref()
                    .map(|destination| (lesson, &requested.meetup, destination)),
            })
            .collect();

        let estimates = futures::future::try_join_all(
            pairs
                .iter()
                .map(|(_, origin, destination)| self.travel(origin, destination)),
        )
        .await?;

        Ok(pairs
            .into_iter()
            .zip(estimates)
            .filter(|(_, estimate)| self.too_far(*estimate))
            .map(|((lesson, _, _), _)| lesson)
            .collect())
    }

    /// Horas frontera que ya son deseables
    fn boundary_hours(
        &self,
        ctx: &RuleContext<'_>,
        lessons: &[&ScheduledLesson],
        hour_of: impl Fn(&ScheduledLesson) -> u32,
    ) -> BTreeSet<u32> {
        lessons
            .iter()
            .map(|lesson| hour_of(*lesson))
            .filter(|hour| ctx.hours.score(*hour).map_or(false, |score| score >= DESIRABLE_SCORE))
            .collect()
    }

    /// Veta la hora en que terminan las clases cuya llegada queda lejos de la recogida propuesta
    fn start_hours(&self, ctx: &RuleContext<'_>, far_dropoffs: &[&ScheduledLesson]) -> BTreeSet<u32> {
        self.boundary_hours(ctx, far_dropoffs, |lesson| lesson.appointment.end().hour())
    }

    /// Veta la hora en que empiezan las clases cuya recogida queda lejos de la llegada propuesta
    fn end_hours(&self, ctx: &RuleContext<'_>, far_meetups: &[&ScheduledLesson]) -> BTreeSet<u32> {
        self.boundary_hours(ctx, far_meetups, |lesson| lesson.appointment.date.hour())
    }

    fn degraded(e: anyhow::Error) {
        log::warn!("⚠️ Proveedor de distancias degradado, regla ignorada: {}", e);
    }
}

#[async_trait]
impl LessonRule for PlaceDistances {
    fn name(&self) -> &'static str {
        "place_distances"
    }

    async fn start_hour_rule(&self, ctx: &RuleContext<'_>) -> BTreeSet<u32> {
        match self.filter(ctx, PlaceType::Dropoff).await {
            Ok(far) => self.start_hours(ctx, &far),
            Err(e) => {
                Self::degraded(e);
                BTreeSet::new()
            }
        }
    }

    async fn end_hour_rule(&self, ctx: &RuleContext<'_>) -> BTreeSet<u32> {
        match self.filter(ctx, PlaceType::Meetup).await {
            Ok(far) => self.end_hours(ctx, &far),
            Err(e) => {
                Self::degraded(e);
                BTreeSet::new()
            }
        }
    }

    /// Las dos consultas van juntas: si una falla, la regla entera no veta nada
    async fn blacklisted(&self, ctx: &RuleContext<'_>) -> Blacklist {
        let lookups = futures::future::try_join(
            self.filter(ctx, PlaceType::Dropoff),
            self.filter(ctx, PlaceType::Meetup),
        )
        .await;
        match lookups {
            Ok((far_dropoffs, far_meetups)) => Blacklist::new(
                self.start_hours(ctx, &far_dropoffs),
                self.end_hours(ctx, &far_meetups),
            ),
            Err(e) => {
                Self::degraded(e);
                Blacklist::default()
            }
        }
    }
}
