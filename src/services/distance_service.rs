//! Servicio de distancias entre lugares
//!
//! Consulta la Matrix API de Mapbox para saber cuánto se tarda en coche entre
//! dos puntos. Lo usa la regla `PlaceDistances`; cualquier fallo se trata allí
//! como "la regla no aporta nada".

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::models::Coordinates;

const MAPBOX_MATRIX_URL: &str = "https://api.mapbox.com/directions-matrix/v1/mapbox/driving";

/// Distancia y tiempo de conducción entre dos puntos
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelEstimate {
    pub meters: f64,
    pub seconds: f64,
}

#[async_trait]
pub trait DistanceProvider: Send + Sync {
    async fn travel(&self, origin: Coordinates, destination: Coordinates) -> Result<TravelEstimate>;
}

#[derive(Debug, Deserialize)]
struct MapboxMatrixResponse {
    code: String,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f64>>>>,
    #[serde(default)]
    durations: Option<Vec<Vec<Option<f64>>>>,
    #[serde(default)]
    message: Option<String>,
}

impl MapboxMatrixResponse {
    fn first_cell(matrix: &Option<Vec<Vec<Option<f64>>>>) -> Option<f64> {
        matrix.as_ref()?.first()?.first().copied().flatten()
    }

    fn into_estimate(self) -> Result<TravelEstimate> {
        if self.code != "Ok" {
            return Err(anyhow!(
                "Mapbox matrix error {}: {}",
                self.code,
                self.message.unwrap_or_default()
            ));
        }
        let meters = Self::first_cell(&self.distances)
            .ok_or_else(|| anyhow!("Mapbox matrix response without distance"))?;
        let seconds = Self::first_cell(&self.durations)
            .ok_or_else(|| anyhow!("Mapbox matrix response without duration"))?;
        Ok(TravelEstimate { meters, seconds })
    }
}

pub struct MapboxDistanceService {
    mapbox_token: String,
    base_url: String,
    client: reqwest::Client,
}

impl MapboxDistanceService {
    pub fn new(mapbox_token: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            mapbox_token,
            base_url: MAPBOX_MATRIX_URL.to_string(),
            client,
        })
    }

    fn matrix_url(&self, origin: Coordinates, destination: Coordinates) -> String {
        // Mapbox espera longitud,latitud
        format!(
            "{}/{},{};{},{}?sources=0&destinations=1&annotations=distance,duration&access_token={}",
            self.base_url,
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude,
            self.mapbox_token
        )
    }
}

#[async_trait]
impl DistanceProvider for MapboxDistanceService {
    async fn travel(&self, origin: Coordinates, destination: Coordinates) -> Result<TravelEstimate> {
        log::debug!(
            "🗺️ Distancia ({}, {}) -> ({}, {})",
            origin.latitude,
            origin.longitude,
            destination.latitude,
            destination.longitude
        );

        let response = self
            .client
            .get(self.matrix_url(origin, destination))
            .header("User-Agent", "DrivingScheduler/1.0")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Mapbox matrix failed with status {}: {}", status, error_text));
        }

        let matrix: MapboxMatrixResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse matrix response: {}", e))?;

        matrix.into_estimate()
    }
}
