//! Spatial-temporal feature enrichment
//!
//! Joins one fire observation against the reference layers and the live
//! context of the detection cycle:
//!
//! 1. project the observation onto the layers' plane,
//! 2. nearest lightning strike → `lightning_recent`,
//! 3. nearest population point → `pop_density`,
//! 4. nearest infrastructure point → `infra_density = 1 / (d + 1)`,
//! 5. local hour / weekday from the observation time,
//! 6. weather, sensor and vegetation context copied across.
//!
//! An empty layer leaves its feature unknown. Malformed observation
//! coordinates are rejected before any join.

use super::features::{AttributionFeatureRecord, UNKNOWN};
use super::layers::ReferenceLayers;
use crate::config::EnrichmentConfig;
use crate::core_types::{GeoPoint, SensorReading, VegetationProfile, WeatherSnapshot};
use crate::error::Result;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// One detected ignition point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FireObservation {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl FireObservation {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Live readings from the same detection cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveContext<'a> {
    pub weather: Option<&'a WeatherSnapshot>,
    pub sensor: Option<&'a SensorReading>,
    pub vegetation: Option<&'a VegetationProfile>,
}

/// Distances found by the spatial joins (km), `None` for empty layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinDistances {
    pub lightning_km: Option<f64>,
    pub population_km: Option<f64>,
    pub infrastructure_km: Option<f64>,
}

/// Builds feature records against a shared reference layer set.
#[derive(Debug, Clone)]
pub struct FeatureEnricher {
    layers: Arc<ReferenceLayers>,
    lightning_window_hours: f64,
}

impl FeatureEnricher {
    pub fn new(layers: Arc<ReferenceLayers>, config: &EnrichmentConfig) -> Self {
        Self {
            layers,
            lightning_window_hours: config.lightning_window_hours,
        }
    }

    pub fn layers(&self) -> &Arc<ReferenceLayers> {
        &self.layers
    }

    /// Derive the feature record for `observation`.
    pub fn enrich(
        &self,
        observation: &FireObservation,
        context: &LiveContext<'_>,
    ) -> Result<AttributionFeatureRecord> {
        self.enrich_with_distances(observation, context)
            .map(|(record, _)| record)
    }

    /// Like [`enrich`](Self::enrich), also returning the join distances.
    pub fn enrich_with_distances(
        &self,
        observation: &FireObservation,
        context: &LiveContext<'_>,
    ) -> Result<(AttributionFeatureRecord, JoinDistances)> {
        let location =
            GeoPoint::validated(observation.latitude, observation.longitude, "observation")?;
        let layers = &*self.layers;
        let planar = layers.projection().project(&location);

        let mut record = AttributionFeatureRecord::unknown();
        let mut distances = JoinDistances::default();

        if let Some((strike, distance)) = layers.lightning.nearest(&planar) {
            let elapsed_hours =
                (observation.timestamp - strike.strike_time).num_milliseconds() as f64 / 3.6e6;
            let recent = (0.0..=self.lightning_window_hours).contains(&elapsed_hours);
            record.lightning_recent = if recent { 1.0 } else { 0.0 };
            distances.lightning_km = Some(distance);
        }

        if let Some((point, distance)) = layers.population.nearest(&planar) {
            record.pop_density = point.population;
            distances.population_km = Some(distance);
        }

        if let Some((_, distance)) = layers.infrastructure.nearest(&planar) {
            record.infra_density = 1.0 / (distance + 1.0);
            distances.infrastructure_km = Some(distance);
        }

        let local = observation.timestamp.with_timezone(&layers.local_offset());
        record.hour = f64::from(local.hour());
        record.day_of_week = f64::from(local.weekday().num_days_from_monday());

        if let Some(weather) = context.weather {
            record.temperature = weather.temperature().unwrap_or(UNKNOWN);
            record.humidity = weather.humidity().unwrap_or(UNKNOWN);
            record.wind_speed = weather.wind_speed().unwrap_or(UNKNOWN);
        }

        if let Some(sensor) = context.sensor {
            record.iot_temp = sensor.temperature.unwrap_or(UNKNOWN);
            record.smoke_level = sensor.smoke_level.unwrap_or(UNKNOWN);
            record.flame_detected = if sensor.flame_detected { 1.0 } else { 0.0 };
        }

        if let Some(vegetation) = context.vegetation {
            record.vegetation_influence = vegetation.fire_risk_areas.len() as f64;
        }

        debug!(
            lat = observation.latitude,
            lon = observation.longitude,
            ?distances,
            unknown = record.unknown_features().len(),
            "enriched observation"
        );

        Ok((record, distances))
    }
}

/// One-off enrichment with the default enrichment settings.
///
/// Long-running callers should keep a [`FeatureEnricher`] instead.
pub fn enrich(
    observation: &FireObservation,
    layers: &Arc<ReferenceLayers>,
    context: &LiveContext<'_>,
) -> Result<AttributionFeatureRecord> {
    FeatureEnricher::new(Arc::clone(layers), &EnrichmentConfig::default())
        .enrich(observation, context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::layers::{
        InfrastructurePoint, LightningStrike, PopulationPoint, ReferenceLayerSpec,
    };
    use crate::error::EcoFlareError;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn observed_at() -> DateTime<Utc> {
        // Wednesday 2025-07-16 18:30 UTC
        Utc.with_ymd_and_hms(2025, 7, 16, 18, 30, 0).unwrap()
    }

    fn layers(strike_offset_hours: i64) -> Arc<ReferenceLayers> {
        let spec = ReferenceLayerSpec {
            lightning: vec![
                LightningStrike {
                    latitude: 46.0,
                    longitude: -80.0,
                    strike_time: observed_at() - Duration::hours(strike_offset_hours),
                },
                LightningStrike {
                    latitude: 50.0,
                    longitude: -85.0,
                    strike_time: observed_at() - Duration::hours(1),
                },
            ],
            population: vec![
                PopulationPoint {
                    latitude: 46.05,
                    longitude: -80.0,
                    population: 320.0,
                },
                PopulationPoint {
                    latitude: 48.0,
                    longitude: -80.0,
                    population: 5.0,
                },
            ],
            infrastructure: vec![InfrastructurePoint {
                latitude: 46.0,
                longitude: -80.0,
                kind: Some("substation".into()),
            }],
            utc_offset_hours: -4.0,
        };
        Arc::new(ReferenceLayers::build(spec, 10.0).unwrap())
    }

    fn enricher(strike_offset_hours: i64) -> FeatureEnricher {
        FeatureEnricher::new(layers(strike_offset_hours), &EnrichmentConfig::default())
    }

    #[test]
    fn test_recent_lightning_and_densities() {
        let observation = FireObservation::new(46.0, -80.0, observed_at());
        let (record, distances) = enricher(2)
            .enrich_with_distances(&observation, &LiveContext::default())
            .unwrap();

        assert_eq!(record.lightning_recent, 1.0);
        assert_eq!(record.pop_density, 320.0);
        assert_relative_eq!(record.infra_density, 1.0, epsilon = 1e-9);
        assert_relative_eq!(distances.infrastructure_km.unwrap(), 0.0, epsilon = 1e-9);
        assert!(distances.population_km.unwrap() > 5.0);
    }

    #[test]
    fn test_stale_and_future_lightning_not_recent() {
        let observation = FireObservation::new(46.0, -80.0, observed_at());
        let stale = enricher(7).enrich(&observation, &LiveContext::default()).unwrap();
        assert_eq!(stale.lightning_recent, 0.0);

        let future = enricher(-1).enrich(&observation, &LiveContext::default()).unwrap();
        assert_eq!(future.lightning_recent, 0.0);

        let boundary = enricher(6).enrich(&observation, &LiveContext::default()).unwrap();
        assert_eq!(boundary.lightning_recent, 1.0);
    }

    #[test]
    fn test_temporal_features_use_local_calendar() {
        let observation = FireObservation::new(46.0, -80.0, observed_at());
        let record = enricher(2).enrich(&observation, &LiveContext::default()).unwrap();
        // 18:30 UTC is 14:30 at UTC-4, still Wednesday
        assert_eq!(record.hour, 14.0);
        assert_eq!(record.day_of_week, 2.0);
    }

    #[test]
    fn test_live_context_copied() {
        let weather = WeatherSnapshot::new(33.0, 18.0).with_wind_speed(22.0);
        let sensor = SensorReading::new(41.0, 64.0, true);
        let vegetation = VegetationProfile {
            has_forest: true,
            fire_risk_areas: vec!["forest".into(), "grassland".into()],
            ..VegetationProfile::default()
        };
        let context = LiveContext {
            weather: Some(&weather),
            sensor: Some(&sensor),
            vegetation: Some(&vegetation),
        };

        let observation = FireObservation::new(46.0, -80.0, observed_at());
        let record = enricher(2).enrich(&observation, &context).unwrap();
        assert_eq!(record.temperature, 33.0);
        assert_eq!(record.humidity, 18.0);
        assert_eq!(record.wind_speed, 22.0);
        assert_eq!(record.iot_temp, 41.0);
        assert_eq!(record.smoke_level, 64.0);
        assert_eq!(record.flame_detected, 1.0);
        assert_eq!(record.vegetation_influence, 2.0);
    }

    #[test]
    fn test_partial_sensor_reading_leaves_unknown() {
        let sensor = SensorReading {
            temperature: None,
            ..SensorReading::new(0.0, 75.0, true)
        };
        let context = LiveContext {
            sensor: Some(&sensor),
            ..LiveContext::default()
        };
        let observation = FireObservation::new(46.0, -80.0, observed_at());
        let record = enricher(2).enrich(&observation, &context).unwrap();
        assert!(record.iot_temp.is_nan());
        assert_eq!(record.smoke_level, 75.0);
        assert_eq!(record.flame_detected, 1.0);
    }

    #[test]
    fn test_empty_layers_yield_unknown() {
        let enricher = FeatureEnricher::new(
            Arc::new(ReferenceLayers::empty()),
            &EnrichmentConfig::default(),
        );
        let observation = FireObservation::new(46.0, -80.0, observed_at());
        let record = enricher.enrich(&observation, &LiveContext::default()).unwrap();
        assert!(record.lightning_recent.is_nan());
        assert!(record.pop_density.is_nan());
        assert!(record.infra_density.is_nan());
        assert_eq!(record.hour, 18.0);
    }

    #[test]
    fn test_free_enrich_matches_enricher() {
        let observation = FireObservation::new(46.0, -80.0, observed_at());
        let shared = layers(2);
        let direct = enrich(&observation, &shared, &LiveContext::default()).unwrap();
        let via = enricher(2).enrich(&observation, &LiveContext::default()).unwrap();
        assert_eq!(direct.lightning_recent, via.lightning_recent);
        assert_eq!(direct.pop_density, via.pop_density);
    }

    #[test]
    fn test_invalid_observation_rejected() {
        let observation = FireObservation::new(f64::NAN, -80.0, observed_at());
        let err = enricher(2)
            .enrich(&observation, &LiveContext::default())
            .unwrap_err();
        assert!(matches!(err, EcoFlareError::InvalidGeometry { .. }));
    }
}
